//! src/reader/walk.rs
//!
//! End-to-end dispatch over a backup: one pass, one callback per frame,
//! blobs always consumed so the counter and the file cursor stay in step
//! with each other no matter what the consumer does.

use std::io::{self, Read, Write};

use tracing::trace;

use crate::error::{BackupError, ConsumerError, Result};
use crate::proto::{Attachment, Avatar, Record, SqlStatement};
use crate::reader::backup::BackupReader;

/// Result type for consumer callbacks. Any error aborts the walk; errors
/// that originate in the reader itself (e.g. a blob MAC failure) surface
/// unchanged, everything else is wrapped as
/// [`BackupError::ConsumerAborted`] tagged with the frame kind.
pub type ConsumerResult = std::result::Result<(), ConsumerError>;

/// Receiver for the records of a backup walk.
///
/// Every method has a default body, so a consumer implements only the
/// hooks it cares about. An attachment or avatar hook that does not
/// consume its [`Blob`] is fine: the dispatcher drains the blob itself to
/// keep the stream synchronized.
pub trait Consumer<R: Read> {
    fn on_statement(&mut self, _statement: &SqlStatement) -> ConsumerResult {
        Ok(())
    }

    fn on_attachment(&mut self, _attachment: &Attachment, _blob: &mut Blob<'_, R>) -> ConsumerResult {
        Ok(())
    }

    fn on_avatar(&mut self, _avatar: &Avatar, _blob: &mut Blob<'_, R>) -> ConsumerResult {
        Ok(())
    }
}

/// Handle to the ciphertext blob following an attachment or avatar frame.
///
/// At most one of the consuming methods may be called; the dispatcher
/// discards the blob if the consumer leaves it untouched.
pub struct Blob<'a, R> {
    reader: &'a mut BackupReader<R>,
    length: u32,
    consumed: bool,
}

impl<R: Read> Blob<'_, R> {
    /// Declared plaintext length of the blob.
    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Decrypt with all-or-none delivery: `sink` sees either the complete
    /// verified plaintext or nothing.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.consumed = true;
        self.reader.decrypt_next_blob(self.length, sink)
    }

    /// Decrypt streaming straight into `sink`; on a MAC failure the sink
    /// has already received unverified bytes.
    pub fn write_to_raw<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.consumed = true;
        self.reader.decrypt_next_blob_raw(self.length, sink)
    }

    /// Decrypt and drop the plaintext, advancing the stream.
    pub fn discard(&mut self) -> Result<()> {
        self.consumed = true;
        self.reader.decrypt_next_blob_raw(self.length, &mut io::sink())
    }
}

/// Tallies from a completed walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Frames decoded, terminator included.
    pub frames: u64,
    pub statements: u64,
    pub preferences: u64,
    pub versions: u64,
    pub attachments: u64,
    pub avatars: u64,
    /// Declared bytes of all attachment and avatar blobs.
    pub blob_bytes: u64,
}

impl<R: Read> BackupReader<R> {
    /// Walk the backup to end-of-stream, dispatching each record to
    /// `consumer`. Blobs left unconsumed by the hooks are drained to a
    /// null sink.
    pub fn walk<C: Consumer<R>>(&mut self, consumer: &mut C) -> Result<WalkStats> {
        let mut stats = WalkStats::default();

        while let Some(frame) = self.next_frame()? {
            stats.frames += 1;
            match frame.record() {
                Record::Statement(statement) => {
                    stats.statements += 1;
                    consumer
                        .on_statement(statement)
                        .map_err(|source| aborted("statement", source))?;
                }
                Record::Attachment(attachment) => {
                    stats.attachments += 1;
                    let length = attachment.blob_len();
                    stats.blob_bytes += u64::from(length);
                    let mut blob = Blob {
                        reader: &mut *self,
                        length,
                        consumed: false,
                    };
                    consumer
                        .on_attachment(attachment, &mut blob)
                        .map_err(|source| aborted("attachment", source))?;
                    if !blob.consumed {
                        self.decrypt_next_blob_raw(length, &mut io::sink())?;
                    }
                }
                Record::Avatar(avatar) => {
                    stats.avatars += 1;
                    let length = avatar.blob_len();
                    stats.blob_bytes += u64::from(length);
                    let mut blob = Blob {
                        reader: &mut *self,
                        length,
                        consumed: false,
                    };
                    consumer
                        .on_avatar(avatar, &mut blob)
                        .map_err(|source| aborted("avatar", source))?;
                    if !blob.consumed {
                        self.decrypt_next_blob_raw(length, &mut io::sink())?;
                    }
                }
                Record::Preference(_) => stats.preferences += 1,
                Record::Version(_) => stats.versions += 1,
                record @ (Record::Header(_) | Record::End | Record::Empty) => {
                    trace!(kind = record.kind(), "pass-through frame");
                }
            }
        }

        Ok(stats)
    }
}

/// Stream-level failures keep their own kind even when they bubble up
/// through a callback; only genuine consumer errors get wrapped.
fn aborted(kind: &'static str, source: ConsumerError) -> BackupError {
    match source.downcast::<BackupError>() {
        Ok(err) => *err,
        Err(source) => BackupError::ConsumerAborted { kind, source },
    }
}
