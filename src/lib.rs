// src/lib.rs

//! Decrypt, authenticate and export encrypted messenger backup files.
//!
//! The backup is a sequential container of length-prefixed, MAC'd,
//! AES-CTR-encrypted records with raw attachment blobs interleaved between
//! them. [`BackupReader`] is the streaming core; the [`export`] module
//! holds the consumers that project the decoded stream into attachment
//! files, an XML report, CSV or a raw statement dump.

pub mod consts;
pub mod crypto;
pub mod error;
pub mod export;
pub mod proto;
pub mod reader;
pub mod sql;

// High-level API — this is what most users import
pub use error::{BackupError, ConsumerError, Result};
pub use reader::{BackupReader, Blob, BufferedSink, Consumer, ConsumerResult, WalkStats};

// Low-level KDF — public at the root for custom decryption flows
pub use crypto::kdf::{derive_keys, KeyMaterial};
