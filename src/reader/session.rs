//! src/reader/session.rs
//!
//! The cipher session owns everything the two decryption paths share: the
//! AES key, the keyed HMAC prototype, the 16-byte IV buffer and the 32-bit
//! operation counter seeded from its first 4 bytes. Frames and blobs go
//! through [`CipherSession::decrypt_framed`] and
//! [`CipherSession::decrypt_streaming`]; each calls [`advance`] exactly
//! once, which is what keeps the counter in lockstep with the file.
//!
//! [`advance`]: CipherSession::advance

use std::io::{Read, Write};

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use ctr::Ctr128BE;
use hmac::Mac;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::consts::{ATTACHMENT_CHUNK_SIZE, IV_LEN, KEY_LEN, MAC_LEN};
use crate::crypto::hmac::HmacSha256;
use crate::crypto::kdf::KeyMaterial;
use crate::error::{BackupError, Result};

/// Full-block big-endian counter mode, matching the format's CTR variant.
type Aes256Ctr = Ctr128BE<Aes256>;

pub struct CipherSession {
    cipher_key: [u8; KEY_LEN],
    /// Keyed prototype; cloned per operation so every frame and every blob
    /// gets a fresh MAC domain.
    mac: HmacSha256,
    iv: [u8; IV_LEN],
    counter: u32,
    /// MAC'd operations attempted so far; 1-based ordinal in errors.
    ops: u64,
}

impl CipherSession {
    pub fn new(keys: &KeyMaterial, iv: [u8; IV_LEN]) -> Self {
        let mac = <HmacSha256 as Mac>::new_from_slice(&keys.mac_key)
            .expect("mac_key is always 32 bytes, a valid HMAC-SHA256 key");
        let counter = u32::from_be_bytes(iv[..4].try_into().expect("IV is 16 bytes"));
        Self {
            cipher_key: keys.cipher_key,
            mac,
            iv,
            counter,
            ops: 0,
        }
    }

    /// Current counter value, i.e. the value the next operation will use.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub(crate) fn ops(&self) -> u64 {
        self.ops
    }

    /// Write the counter big-endian into iv[0..4], hand back the snapshot,
    /// then increment. The trailing 12 bytes stay frozen at their header
    /// values for the lifetime of the session.
    fn advance(&mut self) -> Result<[u8; IV_LEN]> {
        self.iv[..4].copy_from_slice(&self.counter.to_be_bytes());
        let snapshot = self.iv;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(BackupError::CounterExhausted)?;
        Ok(snapshot)
    }

    fn verify_tag(computed: &[u8], on_disk: &[u8; MAC_LEN], index: u64) -> Result<()> {
        if bool::from(computed[..MAC_LEN].ct_eq(on_disk)) {
            Ok(())
        } else {
            Err(BackupError::MacMismatch { index })
        }
    }

    /// Authenticate and decrypt one framed segment: ciphertext followed by
    /// the truncated tag. The MAC is checked over the exact on-disk
    /// ciphertext before the counter advances and before anything is
    /// decrypted, so a tampered frame leaves the session untouched.
    ///
    /// Callers must have checked `segment.len() > MAC_LEN`.
    pub fn decrypt_framed(&mut self, mut segment: Vec<u8>) -> Result<Vec<u8>> {
        self.ops += 1;
        let split = segment.len() - MAC_LEN;

        let mut mac = self.mac.clone();
        mac.update(&segment[..split]);
        let computed = mac.finalize().into_bytes();
        let tag: [u8; MAC_LEN] = segment[split..].try_into().expect("split leaves MAC_LEN");
        Self::verify_tag(&computed, &tag, self.ops)?;

        let iv = self.advance()?;
        segment.truncate(split);
        let mut cipher = Aes256Ctr::new((&self.cipher_key).into(), (&iv).into());
        cipher.apply_keystream(&mut segment);
        Ok(segment)
    }

    /// Authenticate and decrypt a raw ciphertext blob of `length` bytes,
    /// streaming plaintext into `sink` chunk by chunk. The MAC covers
    /// `iv || ciphertext` and its tag trails the blob, so plaintext reaches
    /// the sink before verification completes; wrap the sink in
    /// [`BufferedSink`] for all-or-none semantics.
    ///
    /// [`BufferedSink`]: crate::reader::blob::BufferedSink
    pub fn decrypt_streaming<R, W>(&mut self, source: &mut R, length: u32, sink: &mut W) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.ops += 1;
        let index = self.ops;
        let iv = self.advance()?;

        let mut mac = self.mac.clone();
        mac.update(&iv);
        let mut cipher = Aes256Ctr::new((&self.cipher_key).into(), (&iv).into());

        let mut remaining = length as usize;
        let mut chunk = [0u8; ATTACHMENT_CHUNK_SIZE];
        while remaining > 0 {
            let take = remaining.min(ATTACHMENT_CHUNK_SIZE);
            let buf = &mut chunk[..take];
            source.read_exact(buf)?;
            mac.update(buf);
            cipher.apply_keystream(buf);
            sink.write_all(buf)?;
            remaining -= take;
        }

        let mut tag = [0u8; MAC_LEN];
        source.read_exact(&mut tag)?;
        let computed = mac.finalize().into_bytes();
        Self::verify_tag(&computed, &tag, index)
    }
}

impl Drop for CipherSession {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
    }
}
