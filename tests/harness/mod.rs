//! tests/harness/mod.rs
//!
//! Fixture encoder: builds well-formed backup byte streams with the same
//! counter and MAC discipline the reader enforces. Test-only; the crate
//! itself never encrypts.

// Each test binary compiles its own copy and uses a different subset.
#![allow(dead_code)]

use std::ops::Range;
use std::sync::OnceLock;

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use prost::Message;
use sha2::Sha256;

use msgback_rs::consts::{IV_LEN, MAC_LEN};
use msgback_rs::proto::{Attachment, Avatar, BackupFrame, Header, SqlParameter, SqlStatement};
use msgback_rs::{derive_keys, KeyMaterial};

type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Standard fixture password.
pub const PASSWORD: &str = "test";

/// Standard fixture salt: 32 zero bytes.
pub const SALT: [u8; 32] = [0u8; 32];

/// Standard fixture IV: counter seed 1, zero tail.
pub fn fixture_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    iv[..4].copy_from_slice(&1u32.to_be_bytes());
    iv
}

/// The KDF is expensive; every fixture shares one derivation.
pub fn fixture_keys() -> &'static KeyMaterial {
    static KEYS: OnceLock<KeyMaterial> = OnceLock::new();
    KEYS.get_or_init(|| derive_keys(PASSWORD, Some(&SALT[..])))
}

pub struct Encoder {
    keys: KeyMaterial,
    iv: [u8; IV_LEN],
    counter: u32,
    out: Vec<u8>,
}

impl Encoder {
    /// Encoder over the standard fixture keys, header already written.
    pub fn new() -> Self {
        Self::with_keys(fixture_keys().clone(), fixture_iv(), &SALT)
    }

    pub fn with_keys(keys: KeyMaterial, iv: [u8; IV_LEN], salt: &[u8]) -> Self {
        let counter = u32::from_be_bytes(iv[..4].try_into().unwrap());
        let mut encoder = Self {
            keys,
            iv,
            counter,
            out: Vec::new(),
        };

        let header = BackupFrame {
            header: Some(Header {
                iv: Some(iv.to_vec()),
                salt: Some(salt.to_vec()),
            }),
            ..Default::default()
        };
        let encoded = header.encode_to_vec();
        encoder.out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        encoder.out.extend_from_slice(&encoded);
        encoder
    }

    fn advance(&mut self) -> [u8; IV_LEN] {
        self.iv[..4].copy_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;
        self.iv
    }

    fn keyed_mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.keys.mac_key).unwrap()
    }

    /// Encrypt and append one frame. Returns the byte range of its
    /// ciphertext-plus-tag segment within the fixture.
    pub fn push_frame(&mut self, frame: &BackupFrame) -> Range<usize> {
        self.push_raw_frame(frame.encode_to_vec())
    }

    /// Frame with an arbitrary plaintext body; lets tests produce
    /// well-MAC'd frames that are not valid records.
    pub fn push_raw_frame(&mut self, mut body: Vec<u8>) -> Range<usize> {
        let iv = self.advance();
        let mut cipher = Aes256Ctr::new((&self.keys.cipher_key).into(), (&iv).into());
        cipher.apply_keystream(&mut body);

        let mut mac = self.keyed_mac();
        mac.update(&body);
        let tag = mac.finalize().into_bytes();

        self.out
            .extend_from_slice(&((body.len() + MAC_LEN) as u32).to_be_bytes());
        let start = self.out.len();
        self.out.extend_from_slice(&body);
        self.out.extend_from_slice(&tag[..MAC_LEN]);
        start..self.out.len()
    }

    /// Encrypt and append a raw blob (the payload of the preceding
    /// attachment or avatar frame). Returns its byte range.
    pub fn push_blob(&mut self, plaintext: &[u8]) -> Range<usize> {
        let iv = self.advance();
        let mut cipher = Aes256Ctr::new((&self.keys.cipher_key).into(), (&iv).into());
        let mut mac = self.keyed_mac();
        mac.update(&iv);

        let mut body = plaintext.to_vec();
        cipher.apply_keystream(&mut body);
        mac.update(&body);
        let tag = mac.finalize().into_bytes();

        let start = self.out.len();
        self.out.extend_from_slice(&body);
        self.out.extend_from_slice(&tag[..MAC_LEN]);
        start..self.out.len()
    }

    pub fn push_statement(&mut self, sql: &str, parameters: Vec<SqlParameter>) -> Range<usize> {
        self.push_frame(&BackupFrame {
            statement: Some(SqlStatement {
                statement: Some(sql.to_owned()),
                parameters,
            }),
            ..Default::default()
        })
    }

    /// Attachment descriptor frame followed by its encrypted blob.
    pub fn push_attachment(&mut self, id: u64, plaintext: &[u8]) {
        self.push_frame(&BackupFrame {
            attachment: Some(Attachment {
                row_id: Some(id),
                attachment_id: Some(id),
                length: Some(plaintext.len() as u32),
            }),
            ..Default::default()
        });
        self.push_blob(plaintext);
    }

    /// Avatar descriptor frame followed by its encrypted blob.
    pub fn push_avatar(&mut self, name: &str, plaintext: &[u8]) {
        self.push_frame(&BackupFrame {
            avatar: Some(Avatar {
                name: Some(name.to_owned()),
                length: Some(plaintext.len() as u32),
            }),
            ..Default::default()
        });
        self.push_blob(plaintext);
    }

    /// Terminating marker frame every complete backup ends with.
    pub fn push_end(&mut self) -> Range<usize> {
        self.push_frame(&BackupFrame {
            end: Some(true),
            ..Default::default()
        })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

/// Integer parameter literal.
pub fn int_param(value: u64) -> SqlParameter {
    SqlParameter {
        integer_parameter: Some(value),
        ..Default::default()
    }
}

/// String parameter literal.
pub fn string_param(value: &str) -> SqlParameter {
    SqlParameter {
        string_parameter: Some(value.to_owned()),
        ..Default::default()
    }
}
