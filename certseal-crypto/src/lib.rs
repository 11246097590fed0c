//! Certificate-based envelope encryption.
//!
//! Encrypts arbitrary payloads for the holder of an RSA certificate:
//! - AES (128/192/256) or 3DES (128/192) in CBC or CFB mode, PKCS#7 padded
//! - A fresh key and IV per call, drawn from a CSPRNG
//! - Key and IV wrapped together under the certificate's RSA public key
//!   (OAEP-SHA256 by default)
//! - Key material zeroized as soon as it has been wrapped or used
//!
//! # Architecture
//!
//! ```text
//! encrypt_and_wrap:   options -> SymmetricCipherEngine -> KeyWrappingEngine -> Envelope
//! unwrap_and_decrypt: Envelope -> KeyWrappingEngine -> SymmetricCipherEngine -> plaintext
//! ```
//!
//! The [`Envelope`] is the only value meant to leave the process. It does
//! not describe its own algorithm, so sender and receiver must agree on
//! the options out of band.
//!
//! Also provides random passphrase generation, which shares the same RNG
//! requirements.

mod cancel;
pub mod certificate;
pub mod envelope;
mod error;
mod key;
pub mod options;
pub mod passphrase;
pub mod service;
pub mod symmetric;
pub mod wrapping;

pub use cancel::CancellationFlag;
pub use certificate::Certificate;
pub use envelope::Envelope;
pub use error::{CryptoError, CryptoErrorKind, CryptoResult};
pub use key::KeyMaterial;
pub use options::{
    CipherMode, CipherSpec, DecryptionOptions, DecryptionOptionsBuilder, EncryptionOptions,
    EncryptionOptionsBuilder, KeyUnwrapDirection, KeyWrapDirection, KeyWrapPadding,
    SymmetricAlgorithm,
};
pub use passphrase::{
    CharacterClass, MINIMUM_PASSWORD_LENGTH, PassphraseOptions, PassphraseOptionsBuilder,
    generate_random_passphrase, generate_random_passphrase_with_rng,
};
pub use service::EnvelopeEncryptionService;
pub use symmetric::{CHUNK_SIZE, SymmetricCipherEngine, padded_len};
pub use wrapping::KeyWrappingEngine;

/// Re-exported so callers can build certificates without naming `rsa`
/// in their own manifests.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
