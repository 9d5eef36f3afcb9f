//! Outer container for encrypted files.
//!
//! The core pipeline produces a bare blob; this module prepends the marker,
//! KDF parameters and salt needed to decrypt it later. Parsing dispatches on
//! the version byte.

use anyhow::{Result, bail};

use crate::KdfParams;

pub mod v1;

/// Magic bytes identifying a layercrypt file ("LCRY").
pub const MAGIC: &[u8; 4] = b"LCRY";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest format version
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;

/// A parsed container: header fields plus the shuffled blob.
#[derive(Debug)]
pub struct Container {
    version: u8,
    kdf: KdfParams,
    salt: Vec<u8>,
    blob: Vec<u8>,
}

impl Container {
    pub fn new(kdf: KdfParams, salt: Vec<u8>, blob: Vec<u8>) -> Self {
        Self {
            version: CURRENT_VERSION,
            kdf,
            salt,
            blob,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The shuffled pipeline output.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

/// Parses container bytes, dispatching on the version byte.
///
/// # Errors
///
/// Returns an error if:
/// - The input is too short
/// - The magic bytes are invalid
/// - The version is unsupported
pub fn parse(data: &[u8]) -> Result<Container> {
    if data.len() < MAGIC_LEN + VER_LEN {
        bail!("file too short");
    }

    if &data[..MAGIC_LEN] != MAGIC {
        bail!("not a layercrypt file");
    }

    let version = data[MAGIC_LEN];

    match version {
        1 => v1::parse(data),
        _ => bail!("unsupported layercrypt version: {version}"),
    }
}

/// Serializes a container to bytes.
///
/// # Errors
///
/// Returns an error if the version is unsupported.
pub fn serialize(file: &Container) -> Result<Vec<u8>> {
    match file.version() {
        1 => v1::serialize(file),
        v => bail!("unsupported layercrypt version: {v}"),
    }
}
