//! RSA transport of symmetric key material.
//!
//! `key || iv` is encrypted as one buffer under the certificate's public
//! key and split again after decryption with the private key.

use crate::certificate::Certificate;
use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyMaterial;
use crate::options::{DecryptionOptions, EncryptionOptions, KeyWrapPadding};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt};
use tracing::{debug, warn};
use zeroize::Zeroizing;

#[derive(Clone, Copy, Debug, Default)]
pub struct KeyWrappingEngine;

impl KeyWrappingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Wraps `material` under the certificate's public key.
    pub fn wrap_key(
        &self,
        material: &KeyMaterial,
        certificate: &Certificate,
        options: &EncryptionOptions,
    ) -> CryptoResult<Vec<u8>> {
        self.wrap_key_with_rng(&mut OsRng, material, certificate, options)
    }

    pub fn wrap_key_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        material: &KeyMaterial,
        certificate: &Certificate,
        options: &EncryptionOptions,
    ) -> CryptoResult<Vec<u8>> {
        options.validate()?;
        let public_key = certificate.public_key().ok_or_else(|| {
            CryptoError::KeyWrapping(format!(
                "certificate {} has no public key",
                certificate.subject()
            ))
        })?;

        let padding = options.key_wrap_padding();
        let payload = material.concat();
        let limit = padding.max_payload(public_key.size());
        if payload.len() > limit {
            return Err(CryptoError::KeyWrapping(format!(
                "{} bytes of key material exceed the {limit}-byte limit \
                 of a {}-bit key with {padding:?}",
                payload.len(),
                public_key.size() * 8
            )));
        }

        let wrapped = match padding {
            KeyWrapPadding::OaepSha256 => {
                public_key.encrypt(rng, Oaep::new::<sha2::Sha256>(), &payload)
            }
            KeyWrapPadding::OaepSha1 => {
                public_key.encrypt(rng, Oaep::new::<sha1::Sha1>(), &payload)
            }
            KeyWrapPadding::Pkcs1v15 => public_key.encrypt(rng, Pkcs1v15Encrypt, &payload),
        }
        .map_err(|e| CryptoError::KeyWrapping(format!("RSA encryption failed: {e}")))?;

        debug!(
            subject = certificate.subject(),
            ?padding,
            wrapped_len = wrapped.len(),
            "wrapped key material"
        );
        Ok(wrapped)
    }

    /// Recovers key material with the certificate's private key.
    ///
    /// The recovered buffer must hold exactly one key of the configured
    /// size followed by one block of IV.
    pub fn unwrap_key(
        &self,
        wrapped: &[u8],
        certificate: &Certificate,
        options: &DecryptionOptions,
    ) -> CryptoResult<KeyMaterial> {
        let spec = options.validate()?;
        if wrapped.is_empty() {
            return Err(CryptoError::InvalidArgument("wrapped key is empty".to_string()));
        }
        let private_key = certificate.private_key().ok_or_else(|| {
            CryptoError::KeyUnwrapping(format!(
                "certificate {} has no private key",
                certificate.subject()
            ))
        })?;

        let padding = options.key_unwrap_padding();
        let recovered = match padding {
            KeyWrapPadding::OaepSha256 => {
                private_key.decrypt_blinded(&mut OsRng, Oaep::new::<sha2::Sha256>(), wrapped)
            }
            KeyWrapPadding::OaepSha1 => {
                private_key.decrypt_blinded(&mut OsRng, Oaep::new::<sha1::Sha1>(), wrapped)
            }
            KeyWrapPadding::Pkcs1v15 => {
                private_key.decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, wrapped)
            }
        }
        .map(Zeroizing::new)
        .map_err(|_| {
            warn!(subject = certificate.subject(), "key unwrapping rejected");
            CryptoError::KeyUnwrapping(
                "RSA decryption failed (wrong key or tampered data)".to_string(),
            )
        })?;

        KeyMaterial::split(&recovered, &spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoErrorKind;
    use crate::options::SymmetricAlgorithm;
    use rsa::RsaPrivateKey;

    fn cert(bits: usize) -> Certificate {
        Certificate::from_private_key("CN=wrap", RsaPrivateKey::new(&mut OsRng, bits).unwrap())
    }

    fn material(options: &EncryptionOptions) -> KeyMaterial {
        KeyMaterial::generate(&mut OsRng, &options.validate().unwrap()).unwrap()
    }

    #[test]
    fn wrap_unwrap_every_padding() {
        let cert = cert(1024);
        for padding in [
            KeyWrapPadding::OaepSha256,
            KeyWrapPadding::OaepSha1,
            KeyWrapPadding::Pkcs1v15,
        ] {
            let opts = EncryptionOptions::builder()
                .set_key_size(128)
                .set_key_wrap_padding(padding)
                .build()
                .unwrap();
            let m = material(&opts);
            let wrapped = KeyWrappingEngine.wrap_key(&m, &cert, &opts).unwrap();
            assert_eq!(wrapped.len(), 128);
            let back = KeyWrappingEngine
                .unwrap_key(&wrapped, &cert, &opts.to_decryption_options())
                .unwrap();
            assert_eq!(back.key(), m.key());
            assert_eq!(back.iv(), m.iv());
        }
    }

    #[test]
    fn public_only_certificate_cannot_unwrap() {
        let cert = cert(1024);
        let opts = EncryptionOptions::default();
        let wrapped = KeyWrappingEngine.wrap_key(&material(&opts), &cert, &opts).unwrap();
        let err = KeyWrappingEngine
            .unwrap_key(&wrapped, &cert.public_only(), &opts.to_decryption_options())
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::KeyUnwrapping);
    }

    #[test]
    fn certificate_without_public_key_cannot_wrap() {
        let empty = Certificate::from_parts("CN=empty", None, None, None).unwrap();
        let opts = EncryptionOptions::default();
        let err = KeyWrappingEngine
            .wrap_key(&material(&opts), &empty, &opts)
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::KeyWrapping);
    }

    #[test]
    fn oversized_payload_rejected_before_rsa() {
        // 512-bit modulus with OAEP-SHA256 carries at most 64 - 66 = 0 bytes.
        let small = cert(512);
        let opts = EncryptionOptions::default();
        let err = KeyWrappingEngine.wrap_key(&material(&opts), &small, &opts).unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::KeyWrapping);
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn size_mismatch_after_unwrap_is_unwrapping_error() {
        let cert = cert(1024);
        let opts = EncryptionOptions::default();
        let wrapped = KeyWrappingEngine.wrap_key(&material(&opts), &cert, &opts).unwrap();
        let dec = crate::DecryptionOptions::builder()
            .set_symmetric_algorithm(SymmetricAlgorithm::TripleDes)
            .build()
            .unwrap();
        let err = KeyWrappingEngine.unwrap_key(&wrapped, &cert, &dec).unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::KeyUnwrapping);
    }

    #[test]
    fn empty_wrapped_key_is_argument_error() {
        let err = KeyWrappingEngine
            .unwrap_key(&[], &cert(1024), &DecryptionOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::InvalidArgument);
    }
}
