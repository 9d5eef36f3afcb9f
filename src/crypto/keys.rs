//! Partitioning of derived key material into per-layer keys.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{DERIVED_KEY_LEN, HMAC_KEY_LEN, KEY1_LEN, KEY2_LEN, KEY3_LEN, KEY4_LEN, KEY5_LEN};
use crate::error::{Error, Result};

/// The eight keys used by one pipeline call, in the order they are cut from
/// the derived material. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySlices {
    pub key: [u8; KEY1_LEN],
    pub key2: [u8; KEY2_LEN],
    pub key3: [u8; KEY3_LEN],
    pub key4: [u8; KEY4_LEN],
    pub key5: [u8; KEY5_LEN],
    pub hmac_key: [u8; HMAC_KEY_LEN],
    pub hmac_key2: [u8; HMAC_KEY_LEN],
    pub hmac_key3: [u8; HMAC_KEY_LEN],
}

impl KeySlices {
    /// Cut `material` into contiguous, non-overlapping slices.
    ///
    /// Bytes past `DERIVED_KEY_LEN` are ignored.
    pub fn split(material: &[u8]) -> Result<Self> {
        if material.len() < DERIVED_KEY_LEN {
            return Err(Error::invalid(format!(
                "key material is {} bytes, need {DERIVED_KEY_LEN}",
                material.len()
            )));
        }

        let mut slices = KeySlices {
            key: [0u8; KEY1_LEN],
            key2: [0u8; KEY2_LEN],
            key3: [0u8; KEY3_LEN],
            key4: [0u8; KEY4_LEN],
            key5: [0u8; KEY5_LEN],
            hmac_key: [0u8; HMAC_KEY_LEN],
            hmac_key2: [0u8; HMAC_KEY_LEN],
            hmac_key3: [0u8; HMAC_KEY_LEN],
        };

        let mut offset = 0;
        for dst in [
            &mut slices.key[..],
            &mut slices.key2[..],
            &mut slices.key3[..],
            &mut slices.key4[..],
            &mut slices.key5[..],
            &mut slices.hmac_key[..],
            &mut slices.hmac_key2[..],
            &mut slices.hmac_key3[..],
        ] {
            dst.copy_from_slice(&material[offset..offset + dst.len()]);
            offset += dst.len();
        }
        debug_assert_eq!(offset, DERIVED_KEY_LEN);

        Ok(slices)
    }
}

impl std::fmt::Debug for KeySlices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySlices")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_material() -> Vec<u8> {
        (0..DERIVED_KEY_LEN).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn slices_cover_material_in_order() {
        let material = counting_material();
        let ks = KeySlices::split(&material).unwrap();

        let mut joined = Vec::new();
        joined.extend_from_slice(&ks.key);
        joined.extend_from_slice(&ks.key2);
        joined.extend_from_slice(&ks.key3);
        joined.extend_from_slice(&ks.key4);
        joined.extend_from_slice(&ks.key5);
        joined.extend_from_slice(&ks.hmac_key);
        joined.extend_from_slice(&ks.hmac_key2);
        joined.extend_from_slice(&ks.hmac_key3);

        assert_eq!(joined, material);
    }

    #[test]
    fn slice_boundaries_are_fixed() {
        let material = counting_material();
        let ks = KeySlices::split(&material).unwrap();

        assert_eq!(ks.key[0], material[0]);
        assert_eq!(ks.key2[0], material[32]);
        assert_eq!(ks.key3[0], material[160]);
        assert_eq!(ks.key4[0], material[192]);
        assert_eq!(ks.key5[0], material[224]);
        assert_eq!(ks.hmac_key[0], material[352]);
        assert_eq!(ks.hmac_key2[0], material[416]);
        assert_eq!(ks.hmac_key3[63], material[543]);
    }

    #[test]
    fn short_material_is_rejected() {
        let material = vec![1u8; DERIVED_KEY_LEN - 1];
        assert!(matches!(
            KeySlices::split(&material),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let ks = KeySlices::split(&counting_material()).unwrap();
        assert!(format!("{ks:?}").contains("REDACTED"));
    }
}
