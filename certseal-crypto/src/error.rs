//! Error types for envelope encryption.

use thiserror::Error;

/// Result type for certseal operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while encrypting, wrapping, unwrapping or
/// decrypting, and while loading or generating credentials.
///
/// Messages never carry key bytes, IVs, passphrases or plaintext.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("key wrapping failed: {0}")]
    KeyWrapping(String),

    #[error("key unwrapping failed: {0}")]
    KeyUnwrapping(String),

    #[error("cryptographic operation failed: {0}")]
    Operation(String),

    #[error("passphrase length {required} is below the minimum of {minimum}")]
    Passphrase { required: usize, minimum: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Fieldless discriminant of [`CryptoError`], for callers that branch on
/// the kind of failure rather than its message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CryptoErrorKind {
    Configuration,
    Certificate,
    KeyWrapping,
    KeyUnwrapping,
    Operation,
    Passphrase,
    InvalidArgument,
    Cancelled,
}

impl CryptoError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> CryptoErrorKind {
        match self {
            Self::Configuration(_) => CryptoErrorKind::Configuration,
            Self::Certificate(_) => CryptoErrorKind::Certificate,
            Self::KeyWrapping(_) => CryptoErrorKind::KeyWrapping,
            Self::KeyUnwrapping(_) => CryptoErrorKind::KeyUnwrapping,
            Self::Operation(_) => CryptoErrorKind::Operation,
            Self::Passphrase { .. } => CryptoErrorKind::Passphrase,
            Self::InvalidArgument(_) => CryptoErrorKind::InvalidArgument,
            Self::Cancelled => CryptoErrorKind::Cancelled,
        }
    }

    /// Returns true for failures after which the operation cannot be
    /// resumed or partially recovered.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            CryptoErrorKind::Operation | CryptoErrorKind::KeyUnwrapping
        )
    }
}
