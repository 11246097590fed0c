//! Certificate provider: turns files and byte blobs into certificate handles
//! and writes them back out.
//!
//! The passphrase is requested through a supplier closure that runs only
//! when the input turns out to be protected (a PKCS#12 bundle or PEM with an
//! encrypted key), so callers can defer prompting until it is needed.

use crate::format::{self, CertificateFormat};
use crate::pkcs12;
use certseal_crypto::{Certificate, CryptoError, CryptoResult};
use rand::rngs::OsRng;
use std::path::Path;
use tracing::debug;
use zeroize::Zeroizing;

/// Loads and exports certificates. Stateless; every call yields a fresh
/// handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CertificateProvider;

impl CertificateProvider {
    pub fn new() -> Self {
        Self
    }

    /// Reads a certificate file and loads it.
    ///
    /// # Errors
    ///
    /// `CryptoError::Certificate` when the file cannot be read or decoded,
    /// or when the passphrase does not open it.
    pub fn load_from_file<F, P>(
        &self,
        path: impl AsRef<Path>,
        passphrase: F,
    ) -> CryptoResult<Certificate>
    where
        F: FnOnce() -> P,
        P: Into<Zeroizing<String>>,
    {
        let path = path.as_ref();
        let blob = std::fs::read(path).map_err(|e| {
            CryptoError::Certificate(format!("cannot read {}: {e}", path.display()))
        })?;
        self.load_from_bytes(&blob, passphrase)
    }

    /// Loads a certificate from an in-memory blob in any supported format.
    pub fn load_from_bytes<F, P>(&self, blob: &[u8], passphrase: F) -> CryptoResult<Certificate>
    where
        F: FnOnce() -> P,
        P: Into<Zeroizing<String>>,
    {
        if blob.is_empty() {
            return Err(CryptoError::InvalidArgument(
                "certificate blob is empty".to_string(),
            ));
        }

        let detected = CertificateFormat::detect(blob);
        let cert = match detected {
            CertificateFormat::Pem => format::decode_pem(blob, None)?,
            CertificateFormat::EncryptedPem => {
                let secret: Zeroizing<String> = passphrase().into();
                format::decode_pem(blob, Some(secret.as_str()))?
            }
            CertificateFormat::Der => format::certificate_from_der(blob, None)?,
            CertificateFormat::Pkcs12 => {
                let secret: Zeroizing<String> = passphrase().into();
                pkcs12::decode(blob, &secret)?
            }
        };

        debug!(
            format = ?detected,
            subject = cert.subject(),
            modulus_bits = cert.modulus_bits(),
            has_private_key = cert.has_private_key(),
            "Loaded certificate"
        );
        Ok(cert)
    }

    /// Exports the certificate and its private key as a PKCS#12 bundle in
    /// the OpenSSL 3 default layout (PBES2 with AES-256-CBC, SHA-256 MAC).
    pub fn export_to_bytes(&self, cert: &Certificate, passphrase: &str) -> CryptoResult<Vec<u8>> {
        let bundle = pkcs12::encode(&mut OsRng, cert, passphrase)?;
        debug!(subject = cert.subject(), len = bundle.len(), "Exported PKCS#12 bundle");
        Ok(bundle)
    }

    /// Writes a PKCS#12 bundle to `path`, replacing any existing file.
    pub fn export_to_file(
        &self,
        path: impl AsRef<Path>,
        cert: &Certificate,
        passphrase: &str,
    ) -> CryptoResult<()> {
        let path = path.as_ref();
        let bundle = self.export_to_bytes(cert, passphrase)?;
        std::fs::write(path, &bundle).map_err(|e| {
            CryptoError::Certificate(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// The public certificate as X.509 DER, for handing to senders.
    pub fn export_public_der(&self, cert: &Certificate) -> CryptoResult<Vec<u8>> {
        cert.der().map(<[u8]>::to_vec).ok_or_else(|| {
            CryptoError::Certificate("certificate has no X.509 encoding to export".to_string())
        })
    }
}
