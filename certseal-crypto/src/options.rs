//! Encryption and decryption options with fluent builders.
//!
//! Options are plain serde values so they can live in JSON configuration.
//! A deserialized value never passed through a builder, so every engine
//! entry point calls [`EncryptionOptions::validate`] /
//! [`DecryptionOptions::validate`] again before touching the RNG.

use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symmetric block cipher used for the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetricAlgorithm {
    #[default]
    Aes,
    TripleDes,
}

impl SymmetricAlgorithm {
    /// Block size in bytes; also the IV length.
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Aes => 16,
            Self::TripleDes => 8,
        }
    }

    /// Key sizes in bits accepted for this algorithm.
    #[must_use]
    pub const fn valid_key_sizes(self) -> &'static [u32] {
        match self {
            Self::Aes => &[128, 192, 256],
            Self::TripleDes => &[128, 192],
        }
    }

    /// Key size used when the caller does not pick one.
    #[must_use]
    pub const fn default_key_size(self) -> u32 {
        match self {
            Self::Aes => 256,
            Self::TripleDes => 192,
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes => f.write_str("AES"),
            Self::TripleDes => f.write_str("3DES"),
        }
    }
}

/// Block cipher chaining mode.
///
/// Only CBC and CFB are implemented; the remaining names exist so that
/// configurations naming them fail with a clear error instead of a parse
/// failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherMode {
    #[default]
    Cbc,
    Cfb,
    Ecb,
    Ofb,
    Cts,
}

impl CipherMode {
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Cbc | Self::Cfb)
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cbc => "CBC",
            Self::Cfb => "CFB",
            Self::Ecb => "ECB",
            Self::Ofb => "OFB",
            Self::Cts => "CTS",
        };
        f.write_str(name)
    }
}

/// Which half of the keypair encrypts the key material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyWrapDirection {
    #[default]
    WrapWithPublicKey,
    /// Not supported: rejected by validation.
    WrapWithPrivateKey,
}

/// Which half of the keypair recovers the key material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUnwrapDirection {
    #[default]
    UnwrapWithPrivateKey,
    /// Not supported: rejected by validation.
    UnwrapWithPublicKey,
}

/// RSA padding scheme used to transport the key material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyWrapPadding {
    #[default]
    OaepSha256,
    OaepSha1,
    /// Legacy PKCS#1 v1.5 encryption padding, for interoperability only.
    Pkcs1v15,
}

impl KeyWrapPadding {
    /// Bytes of the modulus consumed by the padding.
    #[must_use]
    pub const fn overhead(self) -> usize {
        match self {
            Self::OaepSha256 => 2 * 32 + 2,
            Self::OaepSha1 => 2 * 20 + 2,
            Self::Pkcs1v15 => 11,
        }
    }

    /// Largest payload a modulus of `modulus_bytes` can carry.
    #[must_use]
    pub const fn max_payload(self, modulus_bytes: usize) -> usize {
        modulus_bytes.saturating_sub(self.overhead())
    }
}

/// A validated `(algorithm, key size, mode)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CipherSpec {
    algorithm: SymmetricAlgorithm,
    key_size_bits: u32,
    mode: CipherMode,
}

impl CipherSpec {
    /// Validates the triple.
    pub fn new(
        algorithm: SymmetricAlgorithm,
        key_size_bits: u32,
        mode: CipherMode,
    ) -> CryptoResult<Self> {
        if !mode.is_supported() {
            return Err(CryptoError::Configuration(format!(
                "cipher mode {mode} is not supported"
            )));
        }
        if !algorithm.valid_key_sizes().contains(&key_size_bits) {
            return Err(CryptoError::Configuration(format!(
                "{key_size_bits}-bit keys are not valid for {algorithm} (expected one of {:?})",
                algorithm.valid_key_sizes()
            )));
        }
        Ok(Self {
            algorithm,
            key_size_bits,
            mode,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn key_size_bits(&self) -> u32 {
        self.key_size_bits
    }

    #[must_use]
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Key length in bytes.
    #[must_use]
    pub fn key_len(&self) -> usize {
        self.key_size_bits as usize / 8
    }

    /// Block (and IV) length in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.algorithm.block_size()
    }
}

impl fmt::Display for CipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.algorithm, self.key_size_bits, self.mode)
    }
}

// ============================================================================
// Encryption options
// ============================================================================

/// Options for [`crate::EnvelopeEncryptionService::encrypt_and_wrap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionOptions {
    algorithm: SymmetricAlgorithm,
    key_size_bits: u32,
    cipher_mode: CipherMode,
    key_wrap_direction: KeyWrapDirection,
    key_wrap_padding: KeyWrapPadding,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        Self {
            algorithm: SymmetricAlgorithm::Aes,
            key_size_bits: 256,
            cipher_mode: CipherMode::Cbc,
            key_wrap_direction: KeyWrapDirection::WrapWithPublicKey,
            key_wrap_padding: KeyWrapPadding::OaepSha256,
        }
    }
}

impl EncryptionOptions {
    #[must_use]
    pub fn builder() -> EncryptionOptionsBuilder {
        EncryptionOptionsBuilder::default()
    }

    /// Checks the options and returns the cipher triple they describe.
    pub fn validate(&self) -> CryptoResult<CipherSpec> {
        if self.key_wrap_direction == KeyWrapDirection::WrapWithPrivateKey {
            return Err(CryptoError::Configuration(
                "wrapping key material with the private key is not supported".to_string(),
            ));
        }
        CipherSpec::new(self.algorithm, self.key_size_bits, self.cipher_mode)
    }

    #[must_use]
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn key_size_bits(&self) -> u32 {
        self.key_size_bits
    }

    #[must_use]
    pub fn cipher_mode(&self) -> CipherMode {
        self.cipher_mode
    }

    #[must_use]
    pub fn key_wrap_direction(&self) -> KeyWrapDirection {
        self.key_wrap_direction
    }

    #[must_use]
    pub fn key_wrap_padding(&self) -> KeyWrapPadding {
        self.key_wrap_padding
    }

    /// Decryption options that mirror these encryption options.
    #[must_use]
    pub fn to_decryption_options(&self) -> DecryptionOptions {
        DecryptionOptions {
            algorithm: self.algorithm,
            key_size_bits: self.key_size_bits,
            cipher_mode: self.cipher_mode,
            key_unwrap_direction: match self.key_wrap_direction {
                KeyWrapDirection::WrapWithPublicKey => KeyUnwrapDirection::UnwrapWithPrivateKey,
                KeyWrapDirection::WrapWithPrivateKey => KeyUnwrapDirection::UnwrapWithPublicKey,
            },
            key_unwrap_padding: self.key_wrap_padding,
        }
    }
}

/// Fluent builder for [`EncryptionOptions`].
///
/// When no key size is set, the algorithm's default applies (AES 256,
/// 3DES 192), so switching algorithm alone yields a valid combination.
#[derive(Clone, Debug, Default)]
pub struct EncryptionOptionsBuilder {
    algorithm: SymmetricAlgorithm,
    key_size_bits: Option<u32>,
    cipher_mode: CipherMode,
    key_wrap_direction: KeyWrapDirection,
    key_wrap_padding: KeyWrapPadding,
}

impl EncryptionOptionsBuilder {
    pub fn set_symmetric_algorithm(&mut self, algorithm: SymmetricAlgorithm) -> &mut Self {
        self.algorithm = algorithm;
        self
    }

    pub fn set_cipher_mode(&mut self, mode: CipherMode) -> &mut Self {
        self.cipher_mode = mode;
        self
    }

    pub fn set_key_size(&mut self, bits: u32) -> &mut Self {
        self.key_size_bits = Some(bits);
        self
    }

    pub fn set_key_wrapping_option(&mut self, direction: KeyWrapDirection) -> &mut Self {
        self.key_wrap_direction = direction;
        self
    }

    pub fn set_key_wrap_padding(&mut self, padding: KeyWrapPadding) -> &mut Self {
        self.key_wrap_padding = padding;
        self
    }

    /// Produces immutable options, failing on an invalid combination.
    pub fn build(&self) -> CryptoResult<EncryptionOptions> {
        let options = EncryptionOptions {
            algorithm: self.algorithm,
            key_size_bits: self
                .key_size_bits
                .unwrap_or_else(|| self.algorithm.default_key_size()),
            cipher_mode: self.cipher_mode,
            key_wrap_direction: self.key_wrap_direction,
            key_wrap_padding: self.key_wrap_padding,
        };
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Decryption options
// ============================================================================

/// Options for [`crate::EnvelopeEncryptionService::unwrap_and_decrypt`].
///
/// Must match the options the envelope was produced with; the envelope
/// does not record them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptionOptions {
    algorithm: SymmetricAlgorithm,
    key_size_bits: u32,
    cipher_mode: CipherMode,
    key_unwrap_direction: KeyUnwrapDirection,
    key_unwrap_padding: KeyWrapPadding,
}

impl Default for DecryptionOptions {
    fn default() -> Self {
        EncryptionOptions::default().to_decryption_options()
    }
}

impl DecryptionOptions {
    #[must_use]
    pub fn builder() -> DecryptionOptionsBuilder {
        DecryptionOptionsBuilder::default()
    }

    /// Checks the options and returns the cipher triple they describe.
    pub fn validate(&self) -> CryptoResult<CipherSpec> {
        if self.key_unwrap_direction == KeyUnwrapDirection::UnwrapWithPublicKey {
            return Err(CryptoError::Configuration(
                "unwrapping key material with the public key is not supported".to_string(),
            ));
        }
        CipherSpec::new(self.algorithm, self.key_size_bits, self.cipher_mode)
    }

    #[must_use]
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn key_size_bits(&self) -> u32 {
        self.key_size_bits
    }

    #[must_use]
    pub fn cipher_mode(&self) -> CipherMode {
        self.cipher_mode
    }

    #[must_use]
    pub fn key_unwrap_direction(&self) -> KeyUnwrapDirection {
        self.key_unwrap_direction
    }

    #[must_use]
    pub fn key_unwrap_padding(&self) -> KeyWrapPadding {
        self.key_unwrap_padding
    }
}

/// Fluent builder for [`DecryptionOptions`].
#[derive(Clone, Debug, Default)]
pub struct DecryptionOptionsBuilder {
    algorithm: SymmetricAlgorithm,
    key_size_bits: Option<u32>,
    cipher_mode: CipherMode,
    key_unwrap_direction: KeyUnwrapDirection,
    key_unwrap_padding: KeyWrapPadding,
}

impl DecryptionOptionsBuilder {
    pub fn set_symmetric_algorithm(&mut self, algorithm: SymmetricAlgorithm) -> &mut Self {
        self.algorithm = algorithm;
        self
    }

    pub fn set_cipher_mode(&mut self, mode: CipherMode) -> &mut Self {
        self.cipher_mode = mode;
        self
    }

    pub fn set_key_size(&mut self, bits: u32) -> &mut Self {
        self.key_size_bits = Some(bits);
        self
    }

    pub fn set_key_unwrapping_option(&mut self, direction: KeyUnwrapDirection) -> &mut Self {
        self.key_unwrap_direction = direction;
        self
    }

    pub fn set_key_unwrap_padding(&mut self, padding: KeyWrapPadding) -> &mut Self {
        self.key_unwrap_padding = padding;
        self
    }

    pub fn build(&self) -> CryptoResult<DecryptionOptions> {
        let options = DecryptionOptions {
            algorithm: self.algorithm,
            key_size_bits: self
                .key_size_bits
                .unwrap_or_else(|| self.algorithm.default_key_size()),
            cipher_mode: self.cipher_mode,
            key_unwrap_direction: self.key_unwrap_direction,
            key_unwrap_padding: self.key_unwrap_padding,
        };
        options.validate()?;
        Ok(options)
    }
}
