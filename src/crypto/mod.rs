//! Cryptographic core: key derivation, key splitting, the four cipher layers,
//! the keyed byte permutation and the pipeline tying them together.
//!
//! Everything here is synchronous and operates on explicit buffers. Key and
//! nonce material is created per call and wiped when it goes out of scope.

pub mod aead;
pub mod cbc_hmac;
pub mod kdf;
pub mod keys;
pub mod pipeline;
pub mod shuffle;

pub use kdf::{
    KdfParams, derive, derive_auth_hash, derive_key_material, generate_salt, verify_auth_hash,
};
pub use keys::KeySlices;
pub use pipeline::{decrypt_payload, encrypt_payload};

use crate::error::{Error, Result};
use zeroize::{Zeroize, Zeroizing};

/// Byte buffer that is wiped when dropped, on every exit path.
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// Length of the per-user KDF salt.
pub const SALT_LEN: usize = 128;
/// Length of the login authentication hash.
pub const AUTH_HASH_LEN: usize = 32;

/// XChaCha20-Poly1305 key.
pub const KEY1_LEN: usize = 32;
/// Threefish-1024 key.
pub const KEY2_LEN: usize = 128;
/// Serpent-256 key.
pub const KEY3_LEN: usize = 32;
/// AES-256 key.
pub const KEY4_LEN: usize = 32;
/// Permutation key. Only the first 4 bytes seed the shuffle.
pub const KEY5_LEN: usize = 128;
/// HMAC-SHA3-512 key for each CBC layer.
pub const HMAC_KEY_LEN: usize = 64;

/// Total key material requested from the KDF for one operation.
pub const DERIVED_KEY_LEN: usize =
    KEY1_LEN + KEY2_LEN + KEY3_LEN + KEY4_LEN + KEY5_LEN + 3 * HMAC_KEY_LEN;

const _: () = assert!(DERIVED_KEY_LEN == 544);

/// XChaCha20 nonce.
pub const NONCE1_LEN: usize = 24;
/// Threefish-1024 IV (one full 1024-bit block).
pub const NONCE2_LEN: usize = 128;
/// Serpent IV.
pub const NONCE3_LEN: usize = 16;
/// AES IV.
pub const NONCE4_LEN: usize = 16;
/// Nonces prepended to the layer-4 output before shuffling.
pub const NONCE_BLOCK_LEN: usize = NONCE1_LEN + NONCE2_LEN + NONCE3_LEN + NONCE4_LEN;

/// HMAC-SHA3-512 tag.
pub const TAG_LEN: usize = 64;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|_| Error::failure("OS random generator unavailable"))
}

/// Best-effort wipe of a sensitive buffer.
pub fn erase(buf: &mut [u8]) {
    buf.zeroize();
}

pub(crate) fn require_non_empty(buf: &[u8], what: &str) -> Result<()> {
    if buf.is_empty() {
        return Err(Error::invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Per-user salts are exactly [`SALT_LEN`] bytes.
pub(crate) fn require_salt(salt: &[u8]) -> Result<()> {
    require_non_empty(salt, "salt")?;
    if salt.len() != SALT_LEN {
        return Err(Error::invalid(format!("salt must be {SALT_LEN} bytes")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_block_matches_layer_sizes() {
        assert_eq!(NONCE_BLOCK_LEN, 184);
    }

    #[test]
    fn erase_clears_every_byte() {
        let mut buf = vec![0xAAu8; 77];
        erase(&mut buf);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn random_fill_differs_between_calls() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        fill_random(&mut a).unwrap();
        fill_random(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
