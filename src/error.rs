//! # Error Types
//!
//! This module defines the error type used throughout the library.
//! All operations return [`Result<T, BackupError>`](BackupError).

use thiserror::Error;

/// Error returned by a consumer callback; carried inside
/// [`BackupError::ConsumerAborted`].
pub type ConsumerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for all backup reading operations.
///
/// Apart from `ConsumerAborted`, none of these are recoverable: the stream
/// has no resync points, so the reader must be abandoned after any failure.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Underlying read/write failure, including short reads mid-record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header record does not carry an exactly-16-byte IV.
    #[error("backup header carries no 16-byte IV")]
    MissingIv,

    /// The plaintext header bytes are not a valid header record.
    #[error("invalid backup header: {0}")]
    BadHeader(String),

    /// Computed truncated HMAC differs from the on-disk tag. `index` is the
    /// 1-based ordinal of the MAC'd operation (frames and blobs combined).
    #[error("{}", mac_mismatch_msg(.index))]
    MacMismatch { index: u64 },

    /// A record authenticated and decrypted but its plaintext is not a
    /// valid protobuf record.
    #[error("frame {index} decrypted but is not a valid record: {source}")]
    BadCiphertext {
        index: u64,
        #[source]
        source: prost::DecodeError,
    },

    /// A declared length is zero where non-zero is required, or exceeds the
    /// bytes remaining in the file.
    #[error("declared {context} length {declared} is invalid ({remaining} bytes remaining)")]
    LengthConstraint {
        context: &'static str,
        declared: u64,
        remaining: u64,
    },

    /// The 32-bit operation counter would wrap. The format never produces
    /// this many records, so the file is corrupt.
    #[error("operation counter exhausted: backup is corrupt")]
    CounterExhausted,

    /// A consumer callback returned an error; the walk was aborted.
    #[error("{kind} consumer failed: {source}")]
    ConsumerAborted {
        kind: &'static str,
        #[source]
        source: ConsumerError,
    },
}

fn mac_mismatch_msg(index: &u64) -> String {
    if *index == 1 {
        format!("MAC mismatch at frame {index} (wrong password, or the file is corrupt)")
    } else {
        format!("MAC mismatch at frame/blob {index}: backup is corrupt")
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BackupError>;
