//! src/reader/backup.rs
//!
//! The backup reader: opens the container, parses the plaintext header,
//! derives keys and exposes strictly-forward frame iteration plus blob
//! consumption. The file is one coupled state machine (cursor, counter,
//! MAC), so the reader owns all of it; after any error the stream has no
//! resync point and the reader should be abandoned.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use prost::Message;
use tracing::debug;

use crate::consts::{IV_LEN, MAC_LEN};
use crate::crypto::kdf;
use crate::error::{BackupError, Result};
use crate::proto::BackupFrame;
use crate::reader::blob::BufferedSink;
use crate::reader::frame;
use crate::reader::session::CipherSession;

/// Counts bytes handed out by the underlying source so the reader can
/// bound declared lengths and account for every byte of the file.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Streaming reader over an encrypted backup container.
///
/// Construction parses the header and derives the key material; frames are
/// then produced on demand. When a frame announces an attachment or avatar
/// blob, exactly one of [`decrypt_next_blob`], [`decrypt_next_blob_raw`]
/// must run before the next [`next_frame`] call, or the stream
/// desynchronizes. [`walk`](BackupReader::walk) takes care of that
/// discipline automatically.
///
/// [`decrypt_next_blob`]: BackupReader::decrypt_next_blob
/// [`decrypt_next_blob_raw`]: BackupReader::decrypt_next_blob_raw
/// [`next_frame`]: BackupReader::next_frame
pub struct BackupReader<R> {
    source: CountingReader<R>,
    file_size: u64,
    session: CipherSession,
}

impl<R> std::fmt::Debug for BackupReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupReader")
            .field("file_size", &self.file_size)
            .finish_non_exhaustive()
    }
}

impl BackupReader<BufReader<File>> {
    /// Open a backup file and derive its keys from `password`.
    pub fn open(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        debug!(path = %path.display(), file_size, "opening backup");
        Self::from_source(BufReader::new(file), file_size, password)
    }
}

impl<R: Read> BackupReader<R> {
    /// Construct a reader over any byte source. `file_size` is the total
    /// number of bytes the source will yield; it bounds declared lengths.
    pub fn from_source(source: R, file_size: u64, password: &str) -> Result<Self> {
        let mut source = CountingReader {
            inner: source,
            count: 0,
        };

        let mut prefix = [0u8; 4];
        source.read_exact(&mut prefix)?;
        let header_len = u32::from_be_bytes(prefix);
        if u64::from(header_len) > file_size.saturating_sub(4) {
            return Err(BackupError::LengthConstraint {
                context: "header",
                declared: u64::from(header_len),
                remaining: file_size.saturating_sub(4),
            });
        }

        let mut header_bytes = vec![0u8; header_len as usize];
        source.read_exact(&mut header_bytes)?;
        let frame = BackupFrame::decode(header_bytes.as_slice())
            .map_err(|e| BackupError::BadHeader(e.to_string()))?;
        let header = frame
            .header
            .ok_or_else(|| BackupError::BadHeader("file does not start with a header record".into()))?;

        let iv: [u8; IV_LEN] = header
            .iv
            .as_deref()
            .unwrap_or_default()
            .try_into()
            .map_err(|_| BackupError::MissingIv)?;

        debug!(header_len, salted = header.salt.is_some(), "stretching passphrase");
        let keys = kdf::derive_keys(password, header.salt.as_deref());
        let session = CipherSession::new(&keys, iv);

        Ok(Self {
            source,
            file_size,
            session,
        })
    }

    /// Total size of the backup in bytes, as reported at open time.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes consumed from the source so far, header included.
    pub fn bytes_read(&self) -> u64 {
        self.source.count
    }

    /// Current counter value (the value the next operation will use).
    pub fn counter(&self) -> u32 {
        self.session.counter()
    }

    fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.source.count)
    }

    /// Read, authenticate, decrypt and decode the next frame.
    /// `Ok(None)` means the stream ended cleanly at a frame boundary.
    pub fn next_frame(&mut self) -> Result<Option<BackupFrame>> {
        let remaining = self.remaining();
        frame::read_frame(&mut self.source, &mut self.session, remaining)
    }

    /// Decrypt the blob announced by the previous frame with all-or-none
    /// delivery: plaintext is buffered and only reaches `sink` after the
    /// trailing MAC verifies.
    pub fn decrypt_next_blob<W: Write>(&mut self, length: u32, sink: &mut W) -> Result<()> {
        self.check_blob_len(length)?;
        let mut buffered = BufferedSink::with_capacity(length as usize, sink);
        self.session
            .decrypt_streaming(&mut self.source, length, &mut buffered)?;
        buffered.commit()?;
        Ok(())
    }

    /// Decrypt the blob announced by the previous frame, streaming
    /// plaintext straight into `sink`. On `MacMismatch` the sink has
    /// already received unverified bytes; callers opting in must be
    /// prepared to discard its contents.
    pub fn decrypt_next_blob_raw<W: Write>(&mut self, length: u32, sink: &mut W) -> Result<()> {
        self.check_blob_len(length)?;
        self.session.decrypt_streaming(&mut self.source, length, sink)
    }

    fn check_blob_len(&self, length: u32) -> Result<()> {
        let remaining = self.remaining();
        if length == 0 || u64::from(length) + MAC_LEN as u64 > remaining {
            return Err(BackupError::LengthConstraint {
                context: "blob",
                declared: u64::from(length),
                remaining,
            });
        }
        Ok(())
    }

    /// Release the underlying source. Reading past end-of-stream is
    /// undefined, so this is the expected final call.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
