use argon2::{Algorithm, Argon2, Params, Version};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{AUTH_HASH_LEN, DERIVED_KEY_LEN, SALT_LEN, SecretBytes, fill_random, require_non_empty};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // default memory cost
            mem_cost_kib: 64 * 1024, // 64 MiB
            // default number of iterations
            time_cost: 3,
            // default number of lanes
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.mem_cost_kib < 8 {
            return Err(Error::invalid("argon2 memory cost too low"));
        }
        if self.time_cost < 1 {
            return Err(Error::invalid("argon2 time cost must be >= 1"));
        }
        if self.parallelism < 1 {
            return Err(Error::invalid("argon2 parallelism must be >= 1"));
        }
        if self.parallelism > Params::MAX_P_COST {
            return Err(Error::invalid(format!(
                "argon2 parallelism must be <= {}",
                Params::MAX_P_COST
            )));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(Error::invalid(
                "argon2 memory cost must be at least 8 * parallelism",
            ));
        }
        Ok(())
    }
}

/// Stretch `password` and `salt` into `output_len` bytes with Argon2id.
///
/// Deterministic for identical inputs and parameters.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    output_len: usize,
    kdf: KdfParams,
) -> Result<SecretBytes> {
    require_non_empty(password, "password")?;
    require_non_empty(salt, "salt")?;
    if salt.len() < argon2::MIN_SALT_LEN {
        return Err(Error::invalid(format!(
            "salt must be at least {} bytes",
            argon2::MIN_SALT_LEN
        )));
    }
    if output_len == 0 {
        return Err(Error::invalid("output length must be > 0"));
    }
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(output_len),
    )
    .map_err(|e| Error::failure(format!("failed to construct Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    debug!(
        output_len,
        mem_cost_kib = kdf.mem_cost_kib,
        time_cost = kdf.time_cost,
        parallelism = kdf.parallelism,
        "deriving key material"
    );

    let mut out = Zeroizing::new(vec![0u8; output_len]);
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| Error::failure(format!("argon2 key derivation failed: {e}")))?;

    Ok(out)
}

/// Derive the full key material for one layered encryption call.
pub fn derive_key_material(password: &[u8], salt: &[u8], kdf: KdfParams) -> Result<SecretBytes> {
    derive(password, salt, DERIVED_KEY_LEN, kdf)
}

/// Derive the hash stored for login verification.
pub fn derive_auth_hash(
    password: &[u8],
    salt: &[u8],
    kdf: KdfParams,
) -> Result<Zeroizing<[u8; AUTH_HASH_LEN]>> {
    let derived = derive(password, salt, AUTH_HASH_LEN, kdf)?;
    let mut hash = Zeroizing::new([0u8; AUTH_HASH_LEN]);
    hash.copy_from_slice(&derived);
    Ok(hash)
}

/// Recompute the login hash and compare it to `expected` in constant time.
pub fn verify_auth_hash(
    password: &[u8],
    salt: &[u8],
    kdf: KdfParams,
    expected: &[u8],
) -> Result<()> {
    if expected.len() != AUTH_HASH_LEN {
        return Err(Error::invalid(format!(
            "stored hash must be {AUTH_HASH_LEN} bytes"
        )));
    }
    let actual = derive_auth_hash(password, salt, kdf)?;
    if bool::from(actual[..].ct_eq(expected)) {
        Ok(())
    } else {
        warn!("login hash mismatch");
        Err(Error::AuthenticationFailed)
    }
}

/// Generate a fresh per-user salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    Ok(salt)
}
