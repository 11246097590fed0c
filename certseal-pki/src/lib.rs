//! Certificate loading and export for certseal.
//!
//! Turns certificate files into [`certseal_crypto::Certificate`] handles:
//! - PKCS#12 bundles (`.pfx`/`.p12`), unlocked with a lazily supplied passphrase;
//!   both the OpenSSL 3 default (PBES2, SHA-256 MAC) and legacy layouts
//! - Bare X.509 DER certificates (public key only)
//! - PEM files holding a certificate and optionally its private key, which
//!   may be an encrypted PKCS#8 block
//!
//! Only RSA subject keys are supported. Nothing is cached; each call
//! returns a fresh, immutable handle.

mod format;
mod pkcs12;
pub mod provider;

pub use format::CertificateFormat;
pub use provider::CertificateProvider;
