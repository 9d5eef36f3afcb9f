//! Four-layer encryption pipeline.
//!
//! ```text
//! blob = shuffle(nonce1[24] | nonce2[128] | nonce3[16] | nonce4[16] | L4(L3(L2(L1(pt)))), key5)
//! L1 = XChaCha20-Poly1305, L2 = Threefish-1024, L3 = Serpent, L4 = AES-256
//! ```

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::cbc_hmac::{self, AesLayer, SerpentLayer, ThreefishLayer};
use super::keys::KeySlices;
use super::shuffle::{deshuffle, shuffle};
use super::{
    NONCE_BLOCK_LEN, NONCE1_LEN, NONCE2_LEN, NONCE3_LEN, NONCE4_LEN, SecretBytes, aead,
    fill_random, require_non_empty,
};
use crate::error::{Error, Result};

/// Fresh per-call nonces. Wiped on drop.
struct Nonces {
    n1: Zeroizing<[u8; NONCE1_LEN]>,
    n2: Zeroizing<[u8; NONCE2_LEN]>,
    n3: Zeroizing<[u8; NONCE3_LEN]>,
    n4: Zeroizing<[u8; NONCE4_LEN]>,
}

impl Nonces {
    fn generate() -> Result<Self> {
        let mut nonces = Nonces {
            n1: Zeroizing::new([0u8; NONCE1_LEN]),
            n2: Zeroizing::new([0u8; NONCE2_LEN]),
            n3: Zeroizing::new([0u8; NONCE3_LEN]),
            n4: Zeroizing::new([0u8; NONCE4_LEN]),
        };
        fill_random(&mut nonces.n1[..])?;
        fill_random(&mut nonces.n2[..])?;
        fill_random(&mut nonces.n3[..])?;
        fill_random(&mut nonces.n4[..])?;
        Ok(nonces)
    }
}

fn non_empty_output(out: Vec<u8>, stage: &str) -> Result<Vec<u8>> {
    if out.is_empty() {
        return Err(Error::failure(format!("{stage} produced no output")));
    }
    Ok(out)
}

fn non_empty_secret(out: SecretBytes, stage: &str) -> Result<SecretBytes> {
    if out.is_empty() {
        return Err(Error::failure(format!("{stage} produced no output")));
    }
    Ok(out)
}

/// The prefix copy of a CBC layer's IV must match the IV inside that layer.
fn check_prefix_iv(prefix: &[u8], layer_blob: &[u8], layer: &str) -> Result<()> {
    let embedded = layer_blob.get(..prefix.len()).ok_or_else(|| {
        Error::invalid(format!("{layer} ciphertext shorter than its iv"))
    })?;
    if bool::from(prefix.ct_eq(embedded)) {
        Ok(())
    } else {
        warn!(layer, "nonce prefix does not match layer iv");
        Err(Error::AuthenticationFailed)
    }
}

/// Encrypt `plaintext` through all four layers and shuffle the result.
pub fn encrypt_payload(plaintext: &[u8], keys: &KeySlices) -> Result<Vec<u8>> {
    require_non_empty(plaintext, "plaintext")?;
    let nonces = Nonces::generate()?;

    let l1 = non_empty_output(
        aead::encrypt(plaintext, &keys.key, &nonces.n1[..])?,
        "xchacha20-poly1305",
    )?;
    let l2 = non_empty_output(
        cbc_hmac::encrypt::<ThreefishLayer>(&l1, &keys.key2, &nonces.n2[..], &keys.hmac_key)?,
        "threefish",
    )?;
    let l3 = non_empty_output(
        cbc_hmac::encrypt::<SerpentLayer>(&l2, &keys.key3, &nonces.n3[..], &keys.hmac_key2)?,
        "serpent",
    )?;
    let l4 = non_empty_output(
        cbc_hmac::encrypt::<AesLayer>(&l3, &keys.key4, &nonces.n4[..], &keys.hmac_key3)?,
        "aes",
    )?;

    let mut stream = Vec::with_capacity(NONCE_BLOCK_LEN + l4.len());
    stream.extend_from_slice(&nonces.n1[..]);
    stream.extend_from_slice(&nonces.n2[..]);
    stream.extend_from_slice(&nonces.n3[..]);
    stream.extend_from_slice(&nonces.n4[..]);
    stream.extend_from_slice(&l4);

    let blob = non_empty_output(shuffle(&stream, &keys.key5)?, "shuffle")?;

    debug!(
        plaintext_len = plaintext.len(),
        blob_len = blob.len(),
        "payload encrypted"
    );
    Ok(blob)
}

/// Reverse [`encrypt_payload`]. Fails closed on the first layer that does not
/// authenticate.
pub fn decrypt_payload(blob: &[u8], keys: &KeySlices) -> Result<SecretBytes> {
    require_non_empty(blob, "ciphertext")?;
    if blob.len() <= NONCE_BLOCK_LEN {
        return Err(Error::invalid(format!(
            "ciphertext must be longer than {NONCE_BLOCK_LEN} bytes"
        )));
    }

    let stream = deshuffle(blob, &keys.key5)?;

    let (n1, rest) = stream.split_at(NONCE1_LEN);
    let (n2, rest) = rest.split_at(NONCE2_LEN);
    let (n3, rest) = rest.split_at(NONCE3_LEN);
    let (n4, l4) = rest.split_at(NONCE4_LEN);

    check_prefix_iv(n4, l4, "aes")?;
    let l3 = non_empty_secret(
        cbc_hmac::decrypt::<AesLayer>(l4, &keys.key4, &keys.hmac_key3)?,
        "aes",
    )?;

    check_prefix_iv(n3, &l3, "serpent")?;
    let l2 = non_empty_secret(
        cbc_hmac::decrypt::<SerpentLayer>(&l3, &keys.key3, &keys.hmac_key2)?,
        "serpent",
    )?;

    check_prefix_iv(n2, &l2, "threefish")?;
    let l1 = non_empty_secret(
        cbc_hmac::decrypt::<ThreefishLayer>(&l2, &keys.key2, &keys.hmac_key)?,
        "threefish",
    )?;

    let plaintext = non_empty_secret(aead::decrypt(&l1, &keys.key, n1)?, "xchacha20-poly1305")?;

    debug!(
        blob_len = blob.len(),
        plaintext_len = plaintext.len(),
        "payload decrypted"
    );
    Ok(plaintext)
}
