//! Layered password-based encryption.
//!
//! A password and per-user salt are stretched with Argon2id into 544 bytes of
//! key material, cut into eight keys, and used to encrypt through
//! XChaCha20-Poly1305, Threefish-1024-CBC, Serpent-CBC and AES-256-CBC (each
//! CBC layer authenticated with HMAC-SHA3-512). The nonces and final
//! ciphertext are then byte-shuffled under a separate key.
//!
//! Plaintext is zstd-compressed before encryption; ciphertext is never
//! compressed.

pub mod crypto;
pub mod error;
pub mod format;
mod session;
mod storage;

pub use crate::crypto::{KdfParams, KeySlices, SecretBytes};
pub use crate::error::Error;
pub use crate::format::Container;
pub use crate::session::Session;

use anyhow::Context;
use std::path::Path;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{require_non_empty, require_salt};

/// zstd level used when the caller does not pick one.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

fn session_keys(password: &[u8], salt: &[u8], kdf: KdfParams) -> error::Result<KeySlices> {
    let material = crypto::derive_key_material(password, salt, kdf)?;
    KeySlices::split(&material)
}

/// Compress, then encrypt `plaintext` with keys derived from `password` and
/// `salt`. Returns the bare shuffled blob.
pub fn encrypt_bytes(
    password: &[u8],
    salt: &[u8],
    kdf: KdfParams,
    plaintext: &[u8],
    zstd_level: i32,
) -> error::Result<Vec<u8>> {
    require_non_empty(password, "password")?;
    require_salt(salt)?;
    require_non_empty(plaintext, "plaintext")?;

    let keys = session_keys(password, salt, kdf)?;

    let compressed = Zeroizing::new(
        zstd::encode_all(plaintext, zstd_level)
            .map_err(|e| Error::CryptoFailure(format!("compression failed: {e}")))?,
    );
    debug!(
        plaintext_len = plaintext.len(),
        compressed_len = compressed.len(),
        "compressed plaintext"
    );

    crypto::encrypt_payload(&compressed, &keys)
}

/// Decrypt a blob from [`encrypt_bytes`] and decompress it.
pub fn decrypt_bytes(
    password: &[u8],
    salt: &[u8],
    kdf: KdfParams,
    blob: &[u8],
) -> error::Result<SecretBytes> {
    require_non_empty(password, "password")?;
    require_salt(salt)?;
    require_non_empty(blob, "ciphertext")?;

    let keys = session_keys(password, salt, kdf)?;
    let compressed = crypto::decrypt_payload(blob, &keys)?;

    let plaintext = zstd::decode_all(&compressed[..])
        .map_err(|e| Error::CryptoFailure(format!("decompression failed: {e}")))?;
    if plaintext.is_empty() {
        return Err(Error::CryptoFailure("decrypted payload is empty".into()));
    }
    Ok(Zeroizing::new(plaintext))
}

/// Encrypt the file at `input` into a container at `output`.
pub fn encrypt_file(
    session: &Session,
    input: &Path,
    output: &Path,
    overwrite: bool,
) -> anyhow::Result<()> {
    let plaintext = Zeroizing::new(storage::read(input)?);
    let container = session
        .seal(&plaintext)
        .with_context(|| format!("failed to encrypt {}", input.display()))?;

    let bytes = format::serialize(&container)?;
    storage::write_atomic(output, &bytes, overwrite)?;

    info!(
        user = %session.username(),
        input = %input.display(),
        output = %output.display(),
        "file encrypted"
    );
    Ok(())
}

/// Read and parse a container without decrypting it.
pub fn open_container(input: &Path) -> anyhow::Result<Container> {
    let data = storage::read(input)?;
    format::parse(&data).with_context(|| format!("failed to parse {}", input.display()))
}

/// Decrypt the container at `input` and write the plaintext to `output`.
///
/// The salt and KDF cost are taken from the container header.
pub fn decrypt_file(
    username: &str,
    password: Zeroizing<Vec<u8>>,
    input: &Path,
    output: &Path,
    overwrite: bool,
) -> anyhow::Result<()> {
    let container = open_container(input)?;
    let session = Session::new(username, password, container.salt(), *container.kdf())?;

    let plaintext = session.decrypt(container.blob())?;
    storage::write_atomic(output, &plaintext, overwrite)?;

    info!(
        user = %session.username(),
        input = %input.display(),
        output = %output.display(),
        "file decrypted"
    );
    Ok(())
}
