// src/reader/mod.rs

//! Streaming decryption core.
//!
//! Main entry point: [`BackupReader`] for frame-at-a-time iteration, or
//! [`BackupReader::walk`] with a [`Consumer`] for a full dispatch pass.

pub mod backup;
pub mod blob;
pub(crate) mod frame;
pub mod session;
pub mod walk;

pub use backup::BackupReader;
pub use blob::BufferedSink;
pub use session::CipherSession;
pub use walk::{Blob, Consumer, ConsumerResult, WalkStats};
