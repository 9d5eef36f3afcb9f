//! Layers 2-4: block cipher in CBC mode with PKCS#7 padding, authenticated
//! by HMAC-SHA3-512 over `iv || ciphertext`.
//!
//! Output layout: `iv || ciphertext || tag[64]`. Decryption verifies the tag
//! before any CBC work is done.

use aes::Aes256;
use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit, block_padding::Pkcs7,
};
use hmac::{Hmac, Mac};
use serpent::Serpent;
use sha3::Sha3_512;
use threefish::Threefish1024;
use tracing::warn;
use zeroize::Zeroizing;

use super::{
    HMAC_KEY_LEN, KEY2_LEN, KEY3_LEN, KEY4_LEN, NONCE2_LEN, NONCE3_LEN, NONCE4_LEN, SecretBytes,
    TAG_LEN, require_non_empty,
};
use crate::error::{Error, Result};

type HmacSha3 = Hmac<Sha3_512>;

/// A block cipher used as one CBC+HMAC layer.
pub trait CbcLayer {
    type Cipher: BlockCipher + BlockEncryptMut + BlockDecryptMut + KeyInit;

    const NAME: &'static str;
    const KEY_LEN: usize;
    /// IV length, always one cipher block.
    const IV_LEN: usize;
}

/// Layer 2: Threefish-1024 (128-byte blocks and keys).
pub struct ThreefishLayer;

impl CbcLayer for ThreefishLayer {
    type Cipher = Threefish1024;
    const NAME: &'static str = "threefish";
    const KEY_LEN: usize = KEY2_LEN;
    const IV_LEN: usize = NONCE2_LEN;
}

/// Layer 3: Serpent with a 256-bit key.
pub struct SerpentLayer;

impl CbcLayer for SerpentLayer {
    type Cipher = Serpent;
    const NAME: &'static str = "serpent";
    const KEY_LEN: usize = KEY3_LEN;
    const IV_LEN: usize = NONCE3_LEN;
}

/// Layer 4: AES-256.
pub struct AesLayer;

impl CbcLayer for AesLayer {
    type Cipher = Aes256;
    const NAME: &'static str = "aes";
    const KEY_LEN: usize = KEY4_LEN;
    const IV_LEN: usize = NONCE4_LEN;
}

fn check_keys<L: CbcLayer>(key: &[u8], hmac_key: &[u8]) -> Result<()> {
    require_non_empty(key, "block cipher key")?;
    require_non_empty(hmac_key, "hmac key")?;
    if key.len() != L::KEY_LEN {
        return Err(Error::invalid(format!(
            "{} key must be {} bytes",
            L::NAME,
            L::KEY_LEN
        )));
    }
    if hmac_key.len() != HMAC_KEY_LEN {
        return Err(Error::invalid(format!(
            "hmac key must be {HMAC_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

fn new_cipher<L: CbcLayer>(key: &[u8]) -> Result<L::Cipher> {
    <L::Cipher as KeyInit>::new_from_slice(key)
        .map_err(|_| Error::invalid(format!("{} rejected key length", L::NAME)))
}

fn new_mac(hmac_key: &[u8]) -> Result<HmacSha3> {
    <HmacSha3 as Mac>::new_from_slice(hmac_key).map_err(|_| Error::invalid("invalid hmac key"))
}

/// HMAC-SHA3-512 over `data`.
pub fn compute_tag(hmac_key: &[u8], data: &[u8]) -> Result<[u8; TAG_LEN]> {
    let mut mac = new_mac(hmac_key)?;
    mac.update(data);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Encrypt `plaintext` under layer `L`, returning `iv || ciphertext || tag`.
pub fn encrypt<L: CbcLayer>(
    plaintext: &[u8],
    key: &[u8],
    iv: &[u8],
    hmac_key: &[u8],
) -> Result<Vec<u8>> {
    require_non_empty(plaintext, "plaintext")?;
    require_non_empty(iv, "iv")?;
    check_keys::<L>(key, hmac_key)?;
    if iv.len() != L::IV_LEN {
        return Err(Error::invalid(format!(
            "{} iv must be {} bytes",
            L::NAME,
            L::IV_LEN
        )));
    }

    let encryptor = cbc::Encryptor::<L::Cipher>::inner_iv_slice_init(new_cipher::<L>(key)?, iv)
        .map_err(|_| Error::invalid(format!("{} rejected iv length", L::NAME)))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(iv.len() + ciphertext.len() + TAG_LEN);
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);

    let tag = compute_tag(hmac_key, &out)?;
    out.extend_from_slice(&tag);

    Ok(out)
}

/// Verify and decrypt an `iv || ciphertext || tag` blob produced by [`encrypt`].
pub fn decrypt<L: CbcLayer>(blob: &[u8], key: &[u8], hmac_key: &[u8]) -> Result<SecretBytes> {
    require_non_empty(blob, "ciphertext")?;
    check_keys::<L>(key, hmac_key)?;
    if blob.len() < L::IV_LEN + TAG_LEN {
        return Err(Error::invalid(format!(
            "{} ciphertext too short: {} bytes",
            L::NAME,
            blob.len()
        )));
    }

    let (body, tag) = blob.split_at(blob.len() - TAG_LEN);

    let mut mac = new_mac(hmac_key)?;
    mac.update(body);
    // constant-time comparison
    mac.verify_slice(tag).map_err(|_| {
        warn!(layer = L::NAME, "hmac mismatch");
        Error::AuthenticationFailed
    })?;

    let (iv, ciphertext) = body.split_at(L::IV_LEN);
    let decryptor = cbc::Decryptor::<L::Cipher>::inner_iv_slice_init(new_cipher::<L>(key)?, iv)
        .map_err(|_| Error::invalid(format!("{} rejected iv length", L::NAME)))?;

    let plaintext = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::PaddingError)?;

    Ok(Zeroizing::new(plaintext))
}
