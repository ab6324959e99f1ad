//! src/reader/frame.rs
//!
//! Framed record codec: length prefix, MAC verification, decryption and
//! protobuf decoding of one record. Blob payloads that follow attachment
//! and avatar descriptors are handled by the session's streaming path, not
//! here.

use std::io::{self, Read};

use prost::Message;
use tracing::trace;

use crate::consts::{MAC_LEN, MIN_FRAME_LEN};
use crate::error::{BackupError, Result};
use crate::proto::BackupFrame;
use crate::reader::session::CipherSession;

/// Read the next frame. `remaining` is the number of bytes left in the
/// file before the length prefix; it bounds the declared length so a
/// corrupt prefix fails fast instead of draining the source.
///
/// Returns `Ok(None)` on clean end-of-stream: exactly zero bytes available
/// at the frame boundary. A partial length prefix is corruption.
pub(crate) fn read_frame<R: Read>(
    source: &mut R,
    session: &mut CipherSession,
    remaining: u64,
) -> Result<Option<BackupFrame>> {
    let mut prefix = [0u8; 4];
    let first = loop {
        match source.read(&mut prefix) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };
    if first == 0 {
        trace!(ops = session.ops(), "end of stream");
        return Ok(None);
    }
    source.read_exact(&mut prefix[first..])?;

    let frame_len = u32::from_be_bytes(prefix);
    if frame_len < MIN_FRAME_LEN || u64::from(frame_len) > remaining.saturating_sub(4) {
        return Err(BackupError::LengthConstraint {
            context: "frame",
            declared: u64::from(frame_len),
            remaining: remaining.saturating_sub(4),
        });
    }

    let mut segment = vec![0u8; frame_len as usize];
    source.read_exact(&mut segment)?;

    let plaintext = session.decrypt_framed(segment)?;
    let frame = BackupFrame::decode(plaintext.as_slice()).map_err(|source| {
        BackupError::BadCiphertext {
            index: session.ops(),
            source,
        }
    })?;
    trace!(
        index = session.ops(),
        len = frame_len - MAC_LEN as u32,
        kind = frame.record().kind(),
        "frame"
    );
    Ok(Some(frame))
}
