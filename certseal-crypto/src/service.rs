//! Envelope orchestration.
//!
//! Combines the symmetric engine and the key-wrapping engine into
//! `encrypt_and_wrap` / `unwrap_and_decrypt`. Each call is a pure function
//! of its inputs plus fresh entropy; the service holds no per-call state
//! and can be shared across threads.

use crate::cancel::CancellationFlag;
use crate::certificate::Certificate;
use crate::envelope::Envelope;
use crate::error::{CryptoError, CryptoResult};
use crate::options::{
    DecryptionOptions, DecryptionOptionsBuilder, EncryptionOptions, EncryptionOptionsBuilder,
};
use crate::symmetric::SymmetricCipherEngine;
use crate::wrapping::KeyWrappingEngine;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{Span, debug};

/// Encrypts payloads for, and decrypts payloads from, certificate holders.
#[derive(Clone, Debug)]
pub struct EnvelopeEncryptionService {
    cipher: SymmetricCipherEngine,
    wrapping: KeyWrappingEngine,
    span: Span,
}

impl Default for EnvelopeEncryptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeEncryptionService {
    pub fn new() -> Self {
        Self::with_span(tracing::debug_span!("envelope"))
    }

    /// Uses `span` as the parent of every event this service emits.
    pub fn with_span(span: Span) -> Self {
        Self {
            cipher: SymmetricCipherEngine::new(),
            wrapping: KeyWrappingEngine::new(),
            span,
        }
    }

    /// Encrypts `plaintext` for the holder of `certificate`'s private key.
    ///
    /// `configure` adjusts the default options (AES-256-CBC, OAEP-SHA256
    /// wrap with the public key); the result is validated before any
    /// key material is generated.
    pub fn encrypt_and_wrap<F>(
        &self,
        plaintext: &[u8],
        certificate: &Certificate,
        configure: F,
    ) -> CryptoResult<Envelope>
    where
        F: FnOnce(&mut EncryptionOptionsBuilder),
    {
        let mut builder = EncryptionOptions::builder();
        configure(&mut builder);
        let options = builder.build()?;
        self.encrypt_and_wrap_with_options(plaintext, certificate, &options)
    }

    pub fn encrypt_and_wrap_with_options(
        &self,
        plaintext: &[u8],
        certificate: &Certificate,
        options: &EncryptionOptions,
    ) -> CryptoResult<Envelope> {
        self.encrypt_and_wrap_with_rng(
            &mut OsRng,
            plaintext,
            certificate,
            options,
            &CancellationFlag::new(),
        )
    }

    /// Like [`Self::encrypt_and_wrap_with_options`], giving up with
    /// [`CryptoError::Cancelled`] once `cancel` is set. No partial envelope
    /// is ever returned.
    pub fn encrypt_and_wrap_cancellable(
        &self,
        plaintext: &[u8],
        certificate: &Certificate,
        options: &EncryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<Envelope> {
        self.encrypt_and_wrap_with_rng(&mut OsRng, plaintext, certificate, options, cancel)
    }

    pub fn encrypt_and_wrap_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        certificate: &Certificate,
        options: &EncryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<Envelope> {
        let _entered = self.span.enter();
        options.validate()?;
        if certificate.public_key().is_none() {
            return Err(CryptoError::KeyWrapping(format!(
                "certificate {} has no public key",
                certificate.subject()
            )));
        }

        let (material, ciphertext) = self
            .cipher
            .encrypt_with_rng(&mut *rng, plaintext, options, cancel)?;
        // Last point at which cancelling still discards everything.
        cancel.check()?;
        let wrapped_key = self
            .wrapping
            .wrap_key_with_rng(&mut *rng, &material, certificate, options)?;
        drop(material);

        debug!(
            subject = certificate.subject(),
            wrapped_len = wrapped_key.len(),
            ciphertext_len = ciphertext.len(),
            "sealed envelope"
        );
        Ok(Envelope::new(wrapped_key, ciphertext))
    }

    /// Recovers the payload of `envelope` with `certificate`'s private key.
    ///
    /// The options built by `configure` must match those used to encrypt;
    /// a mismatch surfaces as a decryption failure.
    pub fn unwrap_and_decrypt<F>(
        &self,
        envelope: &Envelope,
        certificate: &Certificate,
        configure: F,
    ) -> CryptoResult<Vec<u8>>
    where
        F: FnOnce(&mut DecryptionOptionsBuilder),
    {
        let mut builder = DecryptionOptions::builder();
        configure(&mut builder);
        let options = builder.build()?;
        self.unwrap_and_decrypt_with_options(envelope, certificate, &options)
    }

    pub fn unwrap_and_decrypt_with_options(
        &self,
        envelope: &Envelope,
        certificate: &Certificate,
        options: &DecryptionOptions,
    ) -> CryptoResult<Vec<u8>> {
        let cancel = CancellationFlag::new();
        self.unwrap_and_decrypt_cancellable(envelope, certificate, options, &cancel)
    }

    pub fn unwrap_and_decrypt_cancellable(
        &self,
        envelope: &Envelope,
        certificate: &Certificate,
        options: &DecryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<Vec<u8>> {
        let _entered = self.span.enter();
        options.validate()?;
        if envelope.ciphertext().is_empty() {
            return Err(CryptoError::InvalidArgument(
                "envelope ciphertext is empty".to_string(),
            ));
        }

        let material = self
            .wrapping
            .unwrap_key(envelope.wrapped_key(), certificate, options)?;
        let plaintext = self
            .cipher
            .decrypt_cancellable(envelope.ciphertext(), &material, options, cancel)?;
        drop(material);

        debug!(
            subject = certificate.subject(),
            plaintext_len = plaintext.len(),
            "opened envelope"
        );
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoErrorKind;
    use crate::options::{CipherMode, SymmetricAlgorithm};
    use rsa::RsaPrivateKey;

    fn cert() -> Certificate {
        Certificate::from_private_key("CN=service", RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
    }

    #[test]
    fn configure_closure_reaches_both_halves() {
        let service = EnvelopeEncryptionService::new();
        let cert = cert();
        let envelope = service
            .encrypt_and_wrap(b"hello envelope", &cert, |o| {
                o.set_symmetric_algorithm(SymmetricAlgorithm::TripleDes)
                    .set_cipher_mode(CipherMode::Cfb);
            })
            .unwrap();
        assert_eq!(envelope.ciphertext().len() % 8, 0);

        let plaintext = service
            .unwrap_and_decrypt(&envelope, &cert, |o| {
                o.set_symmetric_algorithm(SymmetricAlgorithm::TripleDes)
                    .set_cipher_mode(CipherMode::Cfb);
            })
            .unwrap();
        assert_eq!(plaintext, b"hello envelope");
    }

    #[test]
    fn invalid_configuration_fails_before_any_work() {
        let service = EnvelopeEncryptionService::new();
        let err = service
            .encrypt_and_wrap(b"x", &cert(), |o| {
                o.set_key_size(100);
            })
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::Configuration);
    }

    #[test]
    fn cancelled_before_start_returns_cancelled() {
        let service = EnvelopeEncryptionService::new();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = service
            .encrypt_and_wrap_cancellable(b"tiny", &cert(), &EncryptionOptions::default(), &cancel)
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::Cancelled);
    }

    #[test]
    fn empty_ciphertext_is_argument_error() {
        let service = EnvelopeEncryptionService::new();
        let cert = cert();
        let envelope = service.encrypt_and_wrap(b"x", &cert, |_| {}).unwrap();
        let (wrapped, _) = envelope.into_parts();
        let err = service
            .unwrap_and_decrypt(&Envelope::new(wrapped, Vec::new()), &cert, |_| {})
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::InvalidArgument);
    }

    #[test]
    fn explicit_span_is_accepted() {
        let service = EnvelopeEncryptionService::with_span(tracing::info_span!("tenant", id = 7));
        let cert = cert();
        let envelope = service.encrypt_and_wrap(b"spanned", &cert, |_| {}).unwrap();
        assert_eq!(
            service.unwrap_and_decrypt(&envelope, &cert, |_| {}).unwrap(),
            b"spanned"
        );
    }
}
