//! Caller-owned login context.
//!
//! A `Session` holds the password and salt for one user between operations.
//! It is never global: the caller creates it, passes it by reference and
//! wipes it with [`Session::zero`] or by dropping it.

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{self, KdfParams, SecretBytes, require_non_empty, require_salt};
use crate::error::{Error, Result};
use crate::format::Container;
use crate::{DEFAULT_ZSTD_LEVEL, decrypt_bytes, encrypt_bytes};

pub struct Session {
    username: String,
    password: Zeroizing<Vec<u8>>,
    salt: Zeroizing<Vec<u8>>,
    kdf: KdfParams,
    zstd_level: i32,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        password: Zeroizing<Vec<u8>>,
        salt: &[u8],
        kdf: KdfParams,
    ) -> Result<Self> {
        require_non_empty(&password, "password")?;
        require_salt(salt)?;
        kdf.validate()?;
        Ok(Self {
            username: username.into(),
            password,
            salt: Zeroizing::new(salt.to_vec()),
            kdf,
            zstd_level: DEFAULT_ZSTD_LEVEL,
        })
    }

    /// Verify `password` against the stored login hash, then open a session.
    pub fn login(
        username: impl Into<String>,
        password: Zeroizing<Vec<u8>>,
        salt: &[u8],
        kdf: KdfParams,
        stored_hash: &[u8],
    ) -> Result<Self> {
        let username = username.into();
        require_salt(salt)?;
        crypto::verify_auth_hash(&password, salt, kdf, stored_hash)?;
        tracing::info!(user = %username, "login verified");
        Self::new(username, password, salt, kdf)
    }

    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// The hash a registration step would store for later [`Session::login`].
    pub fn auth_hash(&self) -> Result<Zeroizing<[u8; crypto::AUTH_HASH_LEN]>> {
        self.ensure_live()?;
        crypto::derive_auth_hash(&self.password, &self.salt, self.kdf)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_live()?;
        encrypt_bytes(&self.password, &self.salt, self.kdf, plaintext, self.zstd_level)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<SecretBytes> {
        self.ensure_live()?;
        decrypt_bytes(&self.password, &self.salt, self.kdf, blob)
    }

    /// Encrypt into a container that records this session's salt and KDF cost.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Container> {
        let blob = self.encrypt(plaintext)?;
        Ok(Container::new(self.kdf, self.salt.to_vec(), blob))
    }

    /// Wipe password and salt. Every later operation fails with
    /// `InvalidArgument`.
    pub fn zero(&mut self) {
        self.password.zeroize();
        self.salt.zeroize();
    }

    pub fn is_zeroed(&self) -> bool {
        self.password.is_empty()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_zeroed() {
            return Err(Error::invalid("session has been zeroed"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SALT_LEN;

    fn fast() -> KdfParams {
        KdfParams::new(8 * 1024, 1, 1).unwrap()
    }

    fn pw(s: &str) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(s.as_bytes().to_vec())
    }

    #[test]
    fn session_roundtrip() {
        let session = Session::new("alice", pw("pw"), &[3u8; SALT_LEN], fast()).unwrap();
        let blob = session.encrypt(b"hello vault").unwrap();
        assert_eq!(&session.decrypt(&blob).unwrap()[..], b"hello vault");
    }

    #[test]
    fn login_requires_matching_hash() {
        let salt = [4u8; SALT_LEN];
        let registered = Session::new("bob", pw("right"), &salt, fast()).unwrap();
        let stored = registered.auth_hash().unwrap();

        let ok = Session::login("bob", pw("right"), &salt, fast(), &stored[..]).unwrap();
        assert_eq!(ok.username(), "bob");

        let err = Session::login("bob", pw("wrong"), &salt, fast(), &stored[..]).unwrap_err();
        assert_eq!(err, Error::AuthenticationFailed);
    }

    #[test]
    fn zeroed_session_refuses_work() {
        let mut session = Session::new("carol", pw("pw"), &[5u8; SALT_LEN], fast()).unwrap();
        session.zero();

        assert!(session.is_zeroed());
        assert!(session.salt().is_empty());
        assert!(matches!(
            session.encrypt(b"data"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            session.decrypt(b"data"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_password_or_salt_is_rejected() {
        assert!(Session::new("dave", pw(""), &[1u8; SALT_LEN], fast()).is_err());
        assert!(Session::new("dave", pw("pw"), &[], fast()).is_err());
    }

    #[test]
    fn salt_must_be_full_length() {
        for len in [4, 16, SALT_LEN - 1, SALT_LEN + 1] {
            assert!(matches!(
                Session::new("dave", pw("pw"), &vec![1u8; len], fast()),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert!(Session::new("dave", pw("pw"), &[1u8; SALT_LEN], fast()).is_ok());
    }

    #[test]
    fn debug_hides_password() {
        let session = Session::new("erin", pw("hunter2"), &[6u8; SALT_LEN], fast()).unwrap();
        let out = format!("{session:?}");
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("hunter2"));
    }
}
