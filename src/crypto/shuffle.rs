//! Keyed byte permutation applied to the final nonce-and-ciphertext stream.
//!
//! A Fisher-Yates shuffle driven by a ChaCha20 PRNG. The PRNG seed is the
//! first four bytes of the permutation key (little-endian), so the effective
//! keyspace is 32 bits. This layer only reorders bytes that are already
//! authenticated; it adds no confidentiality or integrity of its own.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroizing;

use super::require_non_empty;
use crate::error::{Error, Result};

/// Number of key bytes that seed the permutation.
pub const SEED_LEN: usize = 4;

fn seed_from_key(key: &[u8]) -> Result<u64> {
    require_non_empty(key, "permutation key")?;
    let seed: [u8; SEED_LEN] = key
        .get(..SEED_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::invalid(format!("permutation key must be >= {SEED_LEN} bytes")))?;
    Ok(u64::from(u32::from_le_bytes(seed)))
}

/// Swap partners for positions `n-1` down to `1`, in draw order.
///
/// Indices are drawn as `u32` so the sequence is the same on every pointer
/// width.
fn exchanges(n: usize, key: &[u8]) -> Result<Zeroizing<Vec<usize>>> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed_from_key(key)?);
    let mut out = Zeroizing::new(Vec::with_capacity(n.saturating_sub(1)));
    for i in (1..n).rev() {
        let bound = u32::try_from(i)
            .map_err(|_| Error::invalid("buffer too large to permute"))?;
        out.push(rng.gen_range(0..=bound) as usize);
    }
    Ok(out)
}

/// Permute `buffer` under `key`.
pub fn shuffle(buffer: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    require_non_empty(buffer, "buffer")?;
    let n = buffer.len();
    let ex = exchanges(n, key)?;

    let mut out = buffer.to_vec();
    for (k, i) in (1..n).rev().enumerate() {
        out.swap(i, ex[k]);
    }
    Ok(out)
}

/// Undo [`shuffle`] by replaying the same swaps in reverse order.
pub fn deshuffle(buffer: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    require_non_empty(buffer, "buffer")?;
    let n = buffer.len();
    let ex = exchanges(n, key)?;

    let mut out = buffer.to_vec();
    for i in 1..n {
        out.swap(i, ex[n - 1 - i]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn shuffle_reorders_and_deshuffle_restores() {
        let key = [0x10u8, 0x20, 0x30, 0x40, 0x50];
        let data: Vec<u8> = (0..=255u8).collect();

        let shuffled = shuffle(&data, &key).unwrap();
        assert_ne!(shuffled, data);
        assert_eq!(deshuffle(&shuffled, &key).unwrap(), data);
    }

    #[test]
    fn permutation_matches_known_answer() {
        let key = [0x10u8, 0x20, 0x30, 0x40, 0x50];
        let data: Vec<u8> = (0..16).collect();

        assert_eq!(
            shuffle(&data, &key).unwrap(),
            vec![13, 0, 3, 5, 2, 1, 7, 15, 4, 12, 9, 8, 14, 11, 10, 6]
        );
    }

    #[test]
    fn exchange_draws_are_fixed_width() {
        // seed 0x06070809
        let ex = exchanges(10, &[0x09, 0x08, 0x07, 0x06]).unwrap();
        assert_eq!(&ex[..], &[1, 7, 5, 3, 3, 4, 1, 1, 0]);
    }

    #[test]
    fn single_byte_is_unchanged() {
        assert_eq!(shuffle(&[7], &[1, 2, 3, 4]).unwrap(), vec![7]);
        assert_eq!(deshuffle(&[7], &[1, 2, 3, 4]).unwrap(), vec![7]);
    }

    #[test]
    fn only_the_seed_bytes_influence_the_order() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut a = [0u8; 128];
        let mut b = [0xFFu8; 128];
        a[..SEED_LEN].copy_from_slice(&[9, 8, 7, 6]);
        b[..SEED_LEN].copy_from_slice(&[9, 8, 7, 6]);

        assert_eq!(shuffle(&data, &a).unwrap(), shuffle(&data, &b).unwrap());

        b[0] = 10;
        assert_ne!(shuffle(&data, &a).unwrap(), shuffle(&data, &b).unwrap());
    }

    #[test]
    fn empty_buffer_or_short_key_is_rejected() {
        assert!(matches!(
            shuffle(&[], &[1, 2, 3, 4]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(shuffle(&[1, 2], &[]), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            deshuffle(&[1, 2], &[1, 2, 3]),
            Err(Error::InvalidArgument(_))
        ));
    }

    proptest! {
        #[test]
        fn deshuffle_inverts_shuffle(
            data in proptest::collection::vec(any::<u8>(), 1..=2048),
            key in proptest::collection::vec(any::<u8>(), SEED_LEN..=128),
        ) {
            let shuffled = shuffle(&data, &key).unwrap();
            prop_assert_eq!(deshuffle(&shuffled, &key).unwrap(), data);
        }

        #[test]
        fn shuffle_is_a_bijection(
            n in 1usize..=256,
            key in proptest::collection::vec(any::<u8>(), SEED_LEN..=16),
        ) {
            let data: Vec<u8> = (0..n).map(|i| i as u8).collect();
            let mut shuffled = shuffle(&data, &key).unwrap();
            shuffled.sort_unstable();
            prop_assert_eq!(shuffled, data);
        }
    }
}
