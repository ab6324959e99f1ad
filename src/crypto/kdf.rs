//! src/crypto/kdf.rs
//!
//! Passphrase stretching and key separation.
//!
//! The backup format derives its keys in two steps: an iterated SHA-512
//! stretch of the normalized passphrase (salted once, 250,000 rounds), then
//! an HKDF-SHA256 expansion that splits the result into independent cipher
//! and MAC keys. Every constant here is fixed by the format.

use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::consts::{KDF_INFO, KDF_ITERATIONS, KEY_LEN};

/// The two symmetric keys derived from a passphrase, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pub cipher_key: [u8; KEY_LEN],
    pub mac_key: [u8; KEY_LEN],
}

/// Derive the cipher and MAC keys from a passphrase and the header salt.
///
/// The passphrase is normalized first: surrounding whitespace is trimmed,
/// then every space character is removed. An absent or empty salt skips the
/// initial absorb; everything else is identical.
pub fn derive_keys(password: &str, salt: Option<&[u8]>) -> KeyMaterial {
    let normalized = password.trim().replace(' ', "");
    let input = normalized.as_bytes();

    let mut digest = Sha512::new();
    match salt {
        Some(salt) if !salt.is_empty() => digest.update(salt),
        _ => {}
    }

    // Round 1 runs with the salt prefix still absorbed; finalize_reset
    // returns the digest to its clean initial state for every later round.
    let mut hash = input.to_vec();
    for _ in 0..KDF_ITERATIONS {
        digest.update(&hash);
        digest.update(input);
        hash = digest.finalize_reset().to_vec();
    }

    let mut okm = [0u8; KEY_LEN * 2];
    Hkdf::<Sha256>::new(Some(&[0u8; 32][..]), &hash[..KEY_LEN])
        .expand(KDF_INFO, &mut okm)
        .expect("64 bytes is a valid HKDF-SHA256 output length");
    hash.zeroize();

    let mut keys = KeyMaterial {
        cipher_key: [0u8; KEY_LEN],
        mac_key: [0u8; KEY_LEN],
    };
    keys.cipher_key.copy_from_slice(&okm[..KEY_LEN]);
    keys.mac_key.copy_from_slice(&okm[KEY_LEN..]);
    okm.zeroize();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sensitivity and whitespace-idempotence coverage lives in
    // tests/kdf_tests.rs; only the cheap structural checks are here.

    #[test]
    fn empty_salt_equals_no_salt() {
        let none = derive_keys("hunter2", None);
        let empty = derive_keys("hunter2", Some(&[][..]));
        assert_eq!(none.cipher_key, empty.cipher_key);
        assert_eq!(none.mac_key, empty.mac_key);
    }

    #[test]
    fn cipher_and_mac_keys_differ() {
        let keys = derive_keys("hunter2", Some(&[0u8; 32][..]));
        assert_ne!(keys.cipher_key, keys.mac_key);
    }
}
