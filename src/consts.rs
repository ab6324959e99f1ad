// src/consts.rs

/// Truncated HMAC-SHA256 tag length carried after every frame and blob.
pub const MAC_LEN: usize = 10;

/// Smallest legal frame segment: one ciphertext byte plus the tag.
pub const MIN_FRAME_LEN: u32 = MAC_LEN as u32 + 1;

/// AES-CTR initial counter block length.
pub const IV_LEN: usize = 16;

/// Cipher key and MAC key length (AES-256 / HMAC-SHA256).
pub const KEY_LEN: usize = 32;

/// Rounds of the SHA-512 passphrase stretch. Bit-exact for compatibility.
pub const KDF_ITERATIONS: u32 = 250_000;

/// HKDF info string separating the cipher key from the MAC key.
pub const KDF_INFO: &[u8] = b"Backup Export";

/// Chunk size for streaming blob decryption. Larger values trade memory
/// for fewer reads on video-sized attachments.
pub const ATTACHMENT_CHUNK_SIZE: usize = 8192;
