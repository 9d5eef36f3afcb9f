//! Layer 1: XChaCha20-Poly1305.
//!
//! The Poly1305 tag is appended by the primitive, so this layer needs no
//! separate MAC key.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use tracing::warn;

use super::{KEY1_LEN, NONCE1_LEN, SecretBytes, require_non_empty};
use crate::error::{Error, Result};
use zeroize::Zeroizing;

fn check_key_nonce(key: &[u8], nonce: &[u8]) -> Result<()> {
    require_non_empty(key, "layer 1 key")?;
    require_non_empty(nonce, "layer 1 nonce")?;
    if key.len() != KEY1_LEN {
        return Err(Error::invalid(format!("layer 1 key must be {KEY1_LEN} bytes")));
    }
    if nonce.len() != NONCE1_LEN {
        return Err(Error::invalid(format!(
            "layer 1 nonce must be {NONCE1_LEN} bytes"
        )));
    }
    Ok(())
}

/// Encrypt plaintext; the result carries the 16-byte tag at its end.
pub fn encrypt(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    require_non_empty(plaintext, "layer 1 plaintext")?;
    check_key_nonce(key, nonce)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|_| Error::failure("XChaCha20-Poly1305 encryption failed"))
}

/// Decrypt ciphertext; fails closed if the tag does not verify.
pub fn decrypt(ciphertext: &[u8], key: &[u8], nonce: &[u8]) -> Result<SecretBytes> {
    require_non_empty(ciphertext, "layer 1 ciphertext")?;
    check_key_nonce(key, nonce)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            warn!("layer 1 tag mismatch");
            Error::AuthenticationFailed
        })?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY1_LEN] = [3u8; KEY1_LEN];
    const NONCE: [u8; NONCE1_LEN] = [9u8; NONCE1_LEN];

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let ct = encrypt(b"secret data", &KEY, &NONCE).unwrap();
        assert_eq!(ct.len(), b"secret data".len() + 16);

        let pt = decrypt(&ct, &KEY, &NONCE).unwrap();
        assert_eq!(&pt[..], b"secret data");
    }

    #[test]
    fn flipped_tag_bit_fails_authentication() {
        let mut ct = encrypt(b"secret data", &KEY, &NONCE).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;

        assert_eq!(
            decrypt(&ct, &KEY, &NONCE).unwrap_err(),
            Error::AuthenticationFailed
        );
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let ct = encrypt(b"secret data", &KEY, &NONCE).unwrap();
        let other = [4u8; KEY1_LEN];

        assert_eq!(
            decrypt(&ct, &other, &NONCE).unwrap_err(),
            Error::AuthenticationFailed
        );
    }

    #[test]
    fn empty_or_missized_inputs_are_rejected() {
        assert!(matches!(
            encrypt(b"", &KEY, &NONCE),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            encrypt(b"x", &[], &NONCE),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            encrypt(b"x", &KEY, &NONCE[..12]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            decrypt(&[], &KEY, &NONCE),
            Err(Error::InvalidArgument(_))
        ));
    }
}
