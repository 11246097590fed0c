//! Shared test helpers: self-signed RSA certificates built with rcgen.

#![allow(dead_code)]

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use std::sync::LazyLock;

/// A generated identity: certificate encodings plus the private key.
pub struct TestIdentity {
    pub cert_der: Vec<u8>,
    pub cert_pem: String,
    pub key: RsaPrivateKey,
}

impl TestIdentity {
    /// Certificate followed by the PKCS#8 private key, as one PEM file.
    pub fn pem_with_pkcs8_key(&self) -> String {
        let key = self.key.to_pkcs8_pem(LineEnding::LF).unwrap();
        format!("{}{}", self.cert_pem, key.as_str())
    }

    /// Certificate followed by a traditional `RSA PRIVATE KEY` block.
    pub fn pem_with_pkcs1_key(&self) -> String {
        let key = self.key.to_pkcs1_pem(LineEnding::LF).unwrap();
        format!("{}{}", self.cert_pem, key.as_str())
    }
}

/// Self-signs a certificate for a fresh RSA key. rcgen's signer requires
/// at least 2048 bits.
pub fn self_signed(common_name: &str, bits: usize) -> TestIdentity {
    let key = RsaPrivateKey::new(&mut OsRng, bits).unwrap();
    let key_pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();
    let key_pair = rcgen::KeyPair::from_pem(key_pem.as_str()).unwrap();

    let mut params = rcgen::CertificateParams::new(vec!["certseal.test".to_string()]).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, common_name);
    let cert = params.self_signed(&key_pair).unwrap();

    TestIdentity {
        cert_der: cert.der().to_vec(),
        cert_pem: cert.pem(),
        key,
    }
}

/// RSA key generation is slow; most tests share these two.
pub static ALICE: LazyLock<TestIdentity> = LazyLock::new(|| self_signed("alice", 2048));
pub static BOB: LazyLock<TestIdentity> = LazyLock::new(|| self_signed("bob", 2048));

pub fn passphrase(value: &str) -> impl FnOnce() -> String + '_ {
    move || value.to_string()
}
