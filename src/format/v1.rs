//! Container format v1.
//!
//! ```text
//! MAGIC (4) | VERSION (1) | MEM_COST (4) | TIME_COST (4) | PARALLELISM (4) | SALT (128) | BLOB
//! ```
//! Integers are little-endian.

use super::{Container, MAGIC};
use crate::{
    KdfParams,
    crypto::{NONCE_BLOCK_LEN, SALT_LEN},
    format::{MAGIC_LEN, VER_LEN},
};
use anyhow::{Context, Result, bail};

/// Format version 1.
pub const VERSION_V1: u8 = 1;

const MEM_LEN: usize = 4;
const TIME_LEN: usize = 4;
const PAR_LEN: usize = 4;

/// Bytes before the blob.
pub const HEADER_LEN: usize = MAGIC_LEN + VER_LEN + MEM_LEN + TIME_LEN + PAR_LEN + SALT_LEN;

fn read_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    let v = u32::from_le_bytes(data[*offset..*offset + 4].try_into()?);
    *offset += 4;
    Ok(v)
}

/// Parses a v1 container.
///
/// # Errors
///
/// Returns an error if the input is too short or has invalid KDF parameters.
pub fn parse(data: &[u8]) -> Result<Container> {
    if data.len() <= HEADER_LEN + NONCE_BLOCK_LEN {
        bail!("file too short for v1");
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let mem_cost = read_u32(data, &mut offset)?;
    let time_cost = read_u32(data, &mut offset)?;
    let parallelism = read_u32(data, &mut offset)?;

    let salt = data[offset..offset + SALT_LEN].to_vec();
    offset += SALT_LEN;

    let blob = data[offset..].to_vec();

    let kdf = KdfParams::new(mem_cost, time_cost, parallelism)
        .context("invalid KDF parameters in header")?;

    Ok(Container::new(kdf, salt, blob))
}

/// Serializes a container to v1 bytes.
///
/// # Errors
///
/// Returns an error if the version is not v1, the salt has the wrong length
/// or the blob is empty.
pub fn serialize(file: &Container) -> Result<Vec<u8>> {
    if file.version() != VERSION_V1 {
        bail!("wrong version for v1 serializer");
    }

    if file.salt().len() != SALT_LEN {
        bail!("invalid salt length for v1");
    }

    if file.blob().is_empty() {
        bail!("refusing to write an empty blob");
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + file.blob().len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V1);

    buf.extend_from_slice(&file.kdf().mem_cost_kib().to_le_bytes());
    buf.extend_from_slice(&file.kdf().time_cost().to_le_bytes());
    buf.extend_from_slice(&file.kdf().parallelism().to_le_bytes());

    buf.extend_from_slice(file.salt());
    buf.extend_from_slice(file.blob());

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_survive_serialization() {
        let file = Container::new(
            KdfParams::new(65536, 3, 2).unwrap(),
            vec![1u8; SALT_LEN],
            vec![2u8; 400],
        );

        let bytes = serialize(&file).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 400);
        assert_eq!(&bytes[..4], b"LCRY");

        let parsed = super::super::parse(&bytes).unwrap();
        assert_eq!(parsed.version(), VERSION_V1);
        assert_eq!(parsed.kdf().mem_cost_kib(), 65536);
        assert_eq!(parsed.kdf().time_cost(), 3);
        assert_eq!(parsed.kdf().parallelism(), 2);
        assert_eq!(parsed.salt(), file.salt());
        assert_eq!(parsed.blob(), file.blob());
    }

    #[test]
    fn wrong_salt_length_is_not_serialized() {
        let file = Container::new(KdfParams::default(), vec![1u8; 16], vec![2u8; 400]);
        assert!(serialize(&file).is_err());
    }

    #[test]
    fn blob_without_payload_is_too_short() {
        let file = Container::new(
            KdfParams::default(),
            vec![1u8; SALT_LEN],
            vec![2u8; NONCE_BLOCK_LEN],
        );
        let bytes = serialize(&file).unwrap();
        assert!(parse(&bytes).is_err());
    }

    #[test]
    fn invalid_kdf_params_are_rejected() {
        let file = Container::new(KdfParams::default(), vec![1u8; SALT_LEN], vec![2u8; 400]);
        let mut bytes = serialize(&file).unwrap();
        // zero time cost
        bytes[9..13].copy_from_slice(&0u32.to_le_bytes());
        assert!(parse(&bytes).is_err());
    }
}
