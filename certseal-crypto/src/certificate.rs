//! Certificate handle: the RSA keypair (or public half) that key material
//! is wrapped under.
//!
//! Loading and exporting certificates lives in `certseal-pki`; this type
//! is only the in-memory result. Handles are immutable once built and can
//! be shared across threads.

use crate::error::{CryptoError, CryptoResult};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;

/// An X.509-style certificate reduced to what envelope encryption needs.
#[derive(Clone)]
pub struct Certificate {
    subject: String,
    der: Option<Vec<u8>>,
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
}

impl Certificate {
    /// Builds a handle from a private key; the public key is derived.
    pub fn from_private_key(subject: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            subject: subject.into(),
            der: None,
            public_key: Some(private_key.to_public_key()),
            private_key: Some(private_key),
        }
    }

    /// Builds an encrypt-only handle.
    pub fn from_public_key(subject: impl Into<String>, public_key: RsaPublicKey) -> Self {
        Self {
            subject: subject.into(),
            der: None,
            public_key: Some(public_key),
            private_key: None,
        }
    }

    /// Builds a handle from loaded parts.
    ///
    /// When both keys are given they must belong together. When only the
    /// private key is given the public key is derived from it.
    pub fn from_parts(
        subject: impl Into<String>,
        der: Option<Vec<u8>>,
        public_key: Option<RsaPublicKey>,
        private_key: Option<RsaPrivateKey>,
    ) -> CryptoResult<Self> {
        let public_key = match (public_key, &private_key) {
            (Some(public), Some(private)) => {
                if private.to_public_key() != public {
                    return Err(CryptoError::Certificate(
                        "private key does not match the certificate's public key".to_string(),
                    ));
                }
                Some(public)
            }
            (None, Some(private)) => Some(private.to_public_key()),
            (public, None) => public,
        };
        Ok(Self {
            subject: subject.into(),
            der,
            public_key,
            private_key,
        })
    }

    /// A copy without the private key, suitable for handing to senders.
    #[must_use]
    pub fn public_only(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            der: self.der.clone(),
            public_key: self.public_key.clone(),
            private_key: None,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// DER encoding of the X.509 certificate, when the handle was loaded
    /// from one.
    pub fn der(&self) -> Option<&[u8]> {
        self.der.as_deref()
    }

    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public_key.as_ref()
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// RSA modulus size in bits.
    pub fn modulus_bits(&self) -> Option<usize> {
        self.public_key.as_ref().map(|k| k.size() * 8)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("has_der", &self.der.is_some())
            .field("modulus_bits", &self.modulus_bits())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}
