use thiserror::Error;

/// Failures returned by the layered encryption core.
///
/// Every variant is terminal for the call that produced it. Authentication
/// and padding failures must never be retried with the same inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Empty, missing or mis-sized input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An HMAC or AEAD tag did not verify.
    #[error("authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,

    /// CBC plaintext carried malformed PKCS#7 padding.
    #[error("invalid padding")]
    PaddingError,

    /// A primitive or derivation step produced no usable output.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn failure(msg: impl Into<String>) -> Self {
        Error::CryptoFailure(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
