//! PKCS#12 bundle import and export.
//!
//! Two layouts are read: the legacy one (SHA-1 MAC, PKCS#12 PBE with 3DES
//! or RC2-40) and the PBES2 one OpenSSL 3 writes by default (SHA-256 MAC,
//! PBKDF2-HMAC-SHA256 with AES-256-CBC). Bundles are always written in the
//! PBES2 layout.
//!
//! The `p12` crate supplies the ASN.1 types. Integrity and PBES2 are handled
//! here since `p12` only knows the SHA-1 MAC and the legacy ciphers.

use crate::format::certificate_from_der;
use certseal_crypto::{Certificate, CryptoError, CryptoResult, RsaPrivateKey};
use hmac::{Mac, SimpleHmac};
use p12::{
    AlgorithmIdentifier, CertBag, ContentInfo, DigestInfo, EncryptedContentInfo, EncryptedData,
    EncryptedPrivateKeyInfo, MacData, OtherAlgorithmIdentifier, PFX, PKCS12Attribute, SafeBag,
    SafeBagKind,
};
use pkcs8::der::{Decode, Encode};
use pkcs8::pkcs5::{self, pbes2};
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use sha1::Sha1;
use sha2::digest::crypto_common::BlockSizeUser;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};
use zeroize::Zeroizing;

const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 1];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
const OID_SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];

/// Diversifier for MAC key derivation (RFC 7292, appendix B.3).
const MAC_KEY_ID: u8 = 3;

/// Same iteration count OpenSSL 3 uses for both the MAC and PBKDF2.
const ITERATIONS: u32 = 2048;
const SALT_LEN: usize = 16;
const AES_IV_LEN: usize = 16;

const WRONG_PASSPHRASE: &str = "PKCS#12 integrity check failed (wrong passphrase?)";
const UNDECRYPTABLE: &str = "cannot decrypt PKCS#12 contents (wrong passphrase?)";

/// Top level of a bundle. `p12::PFX::parse` is not used because its
/// content parsers assert on versions and content types in debug builds.
struct Bundle {
    version: u8,
    auth_safe: Content,
    mac_data: Option<MacData>,
}

enum Content {
    Plain(Vec<u8>),
    Encrypted(EncryptedContentInfo),
    Other(ObjectIdentifier),
}

fn parse_bundle(r: BERReader) -> Result<Bundle, ASN1Error> {
    r.read_sequence(|r| {
        let version = r.next().read_u8()?;
        let auth_safe = parse_content(r.next())?;
        let mac_data = r.read_optional(MacData::parse)?;
        Ok(Bundle {
            version,
            auth_safe,
            mac_data,
        })
    })
}

fn parse_content(r: BERReader) -> Result<Content, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        match content_type.components().as_slice() {
            OID_DATA => {
                let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                Ok(Content::Plain(data))
            }
            OID_ENCRYPTED_DATA => r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    if r.next().read_u8()? != 0 {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    let info = r.next().read_sequence(|r| {
                        let inner_type = r.next().read_oid()?;
                        if inner_type.components().as_slice() != OID_DATA {
                            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                        }
                        let content_encryption_algorithm = AlgorithmIdentifier::parse(r.next())?;
                        let encrypted_content = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(EncryptedContentInfo {
                            content_encryption_algorithm,
                            encrypted_content,
                        })
                    })?;
                    Ok(Content::Encrypted(info))
                })
            }),
            _ => {
                r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
                Ok(Content::Other(content_type.clone()))
            }
        }
    })
}

fn malformed(e: ASN1Error) -> CryptoError {
    CryptoError::Certificate(format!("malformed PKCS#12 bundle: {e}"))
}

/// Passwords enter the PKCS#12 KDF as a NUL-terminated big-endian BMPString.
fn bmp_password(passphrase: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(passphrase.len() * 2 + 2));
    for unit in passphrase.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// RFC 7292, appendix B.2.
fn derive_key<D>(
    password: &[u8],
    salt: &[u8],
    id: u8,
    iterations: u32,
    len: usize,
) -> Zeroizing<Vec<u8>>
where
    D: Digest + BlockSizeUser,
{
    let v = D::block_size();
    let mut input = Zeroizing::new(Vec::new());
    for source in [salt, password] {
        if !source.is_empty() {
            input.extend(source.iter().cycle().take(source.len().div_ceil(v) * v));
        }
    }

    let mut out = Zeroizing::new(Vec::with_capacity(len));
    loop {
        let mut hasher = D::new();
        hasher.update(vec![id; v]);
        hasher.update(input.as_slice());
        let mut block = hasher.finalize();
        for _ in 1..iterations {
            block = D::digest(&block);
        }

        let take = block.len().min(len - out.len());
        out.extend_from_slice(&block[..take]);
        if out.len() == len {
            return out;
        }

        // I_j = (I_j + B + 1) mod 2^(8v) for every v-byte block of I.
        let b: Zeroizing<Vec<u8>> =
            Zeroizing::new(block.iter().copied().cycle().take(v).collect());
        for chunk in input.chunks_mut(v) {
            let mut carry = 1u16;
            for (byte, add) in chunk.iter_mut().zip(b.iter()).rev() {
                let sum = u16::from(*byte) + u16::from(*add) + carry;
                *byte = sum.to_be_bytes()[1];
                carry = sum >> 8;
            }
        }
    }
}

fn keyed_mac<D>(password: &[u8], salt: &[u8], iterations: u32) -> CryptoResult<SimpleHmac<D>>
where
    D: Digest + BlockSizeUser,
{
    let key = derive_key::<D>(password, salt, MAC_KEY_ID, iterations, <D as Digest>::output_size());
    <SimpleHmac<D> as Mac>::new_from_slice(&key)
        .map_err(|e| CryptoError::Operation(format!("PKCS#12 MAC key rejected: {e}")))
}

/// Digest behind the bundle's integrity MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacDigest {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl MacDigest {
    fn from_algorithm(algorithm: &AlgorithmIdentifier) -> CryptoResult<Self> {
        match algorithm {
            AlgorithmIdentifier::Sha1 => Ok(Self::Sha1),
            AlgorithmIdentifier::OtherAlg(other) => {
                match other.algorithm_type.components().as_slice() {
                    OID_SHA256 => Ok(Self::Sha256),
                    OID_SHA384 => Ok(Self::Sha384),
                    OID_SHA512 => Ok(Self::Sha512),
                    _ => Err(CryptoError::Certificate(format!(
                        "unsupported PKCS#12 MAC algorithm {}",
                        other.algorithm_type
                    ))),
                }
            }
            _ => Err(CryptoError::Certificate(
                "unsupported PKCS#12 MAC algorithm".to_string(),
            )),
        }
    }

    /// Constant-time comparison against the stored MAC.
    fn verify(self, password: &[u8], mac_data: &MacData, data: &[u8]) -> CryptoResult<bool> {
        fn check<D: Digest + BlockSizeUser>(
            password: &[u8],
            mac_data: &MacData,
            data: &[u8],
        ) -> CryptoResult<bool> {
            let mut mac = keyed_mac::<D>(password, &mac_data.salt, mac_data.iterations)?;
            mac.update(data);
            Ok(mac.verify_slice(&mac_data.mac.digest).is_ok())
        }

        match self {
            Self::Sha1 => check::<Sha1>(password, mac_data, data),
            Self::Sha256 => check::<Sha256>(password, mac_data, data),
            Self::Sha384 => check::<Sha384>(password, mac_data, data),
            Self::Sha512 => check::<Sha512>(password, mac_data, data),
        }
    }
}

/// Decrypts a PBES2 or legacy PKCS#12 PBE payload. PBES2 takes the UTF-8
/// passphrase; the legacy schemes take the BMPString form.
fn decrypt(
    algorithm: &AlgorithmIdentifier,
    ciphertext: &[u8],
    passphrase: &str,
    bmp: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    match algorithm {
        AlgorithmIdentifier::OtherAlg(other)
            if other.algorithm_type.components().as_slice() == OID_PBES2 =>
        {
            let der = yasna::construct_der(|w| algorithm.write(w));
            let scheme = pkcs5::EncryptionScheme::from_der(&der).map_err(|e| {
                CryptoError::Certificate(format!("unsupported PBES2 parameters: {e}"))
            })?;
            scheme
                .decrypt(passphrase, ciphertext)
                .map(Zeroizing::new)
                .map_err(|_| CryptoError::Certificate(UNDECRYPTABLE.to_string()))
        }
        AlgorithmIdentifier::OtherAlg(other) => Err(CryptoError::Certificate(format!(
            "unsupported PKCS#12 encryption algorithm {}",
            other.algorithm_type
        ))),
        legacy => legacy
            .decrypt_pbe(ciphertext, bmp)
            .map(Zeroizing::new)
            .ok_or_else(|| CryptoError::Certificate(UNDECRYPTABLE.to_string())),
    }
}

fn key_from_pkcs8(der: &[u8]) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| CryptoError::Certificate(format!("invalid RSA private key in bundle: {e}")))
}

/// Opens a bundle. The MAC is checked first so a wrong passphrase is
/// reported as such rather than as a decode failure.
pub(crate) fn decode(blob: &[u8], passphrase: &str) -> CryptoResult<Certificate> {
    let bundle = yasna::parse_der(blob, parse_bundle)
        .map_err(|e| CryptoError::Certificate(format!("not a PKCS#12 bundle: {e}")))?;
    if bundle.version != 3 {
        return Err(CryptoError::Certificate(format!(
            "unsupported PKCS#12 version {}",
            bundle.version
        )));
    }
    let auth_safe = match bundle.auth_safe {
        Content::Plain(data) => data,
        _ => {
            return Err(CryptoError::Certificate(
                "unsupported PKCS#12 integrity mode (only password MACs are read)".to_string(),
            ));
        }
    };

    let bmp = bmp_password(passphrase);
    match &bundle.mac_data {
        Some(mac_data) => {
            let digest = MacDigest::from_algorithm(&mac_data.mac.digest_algorithm)?;
            if !digest.verify(&bmp, mac_data, &auth_safe)? {
                return Err(CryptoError::Certificate(WRONG_PASSPHRASE.to_string()));
            }
        }
        None => debug!("PKCS#12 bundle carries no MAC"),
    }

    let contents = yasna::parse_der(&auth_safe, |r| r.collect_sequence_of(parse_content))
        .map_err(malformed)?;

    let mut certs: Vec<(Vec<u8>, Option<Vec<u8>>)> = Vec::new();
    let mut key: Option<(RsaPrivateKey, Option<Vec<u8>>)> = None;
    for content in contents {
        let safe_contents = match content {
            Content::Plain(data) => Zeroizing::new(data),
            Content::Encrypted(info) => decrypt(
                &info.content_encryption_algorithm,
                &info.encrypted_content,
                passphrase,
                &bmp,
            )?,
            Content::Other(content_type) => {
                return Err(CryptoError::Certificate(format!(
                    "unsupported PKCS#12 content type {content_type}"
                )));
            }
        };
        let bags = yasna::parse_der(&safe_contents, |r| r.collect_sequence_of(SafeBag::parse))
            .map_err(malformed)?;

        for bag in bags {
            let local_key_id = bag.local_key_id();
            match bag.bag {
                SafeBagKind::CertBag(CertBag::X509(der)) => certs.push((der, local_key_id)),
                SafeBagKind::Pkcs8ShroudedKeyBag(epki) if key.is_none() => {
                    let der = decrypt(
                        &epki.encryption_algorithm,
                        &epki.encrypted_data,
                        passphrase,
                        &bmp,
                    )?;
                    key = Some((key_from_pkcs8(&der)?, local_key_id));
                }
                SafeBagKind::OtherBagKind(other)
                    if key.is_none() && other.bag_id.components().as_slice() == OID_KEY_BAG =>
                {
                    let der = Zeroizing::new(other.bag_value);
                    key = Some((key_from_pkcs8(&der)?, local_key_id));
                }
                _ => {}
            }
        }
    }

    // The subject certificate is the one sharing the key's localKeyId;
    // without ids, the first certificate.
    let key_id = key.as_ref().and_then(|(_, id)| id.as_deref());
    let position = key_id
        .and_then(|id| certs.iter().position(|(_, cert_id)| cert_id.as_deref() == Some(id)))
        .unwrap_or(0);
    let (cert_der, _) = certs.get(position).ok_or_else(|| {
        CryptoError::Certificate("PKCS#12 bundle holds no X.509 certificate".to_string())
    })?;

    debug!(certificates = certs.len(), has_key = key.is_some(), "Opened PKCS#12 bundle");
    certificate_from_der(cert_der, key.map(|(private_key, _)| private_key))
}

fn fill<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> CryptoResult<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| CryptoError::Operation(format!("random number generator failed: {e}")))
}

/// PBES2 with PBKDF2-HMAC-SHA256 and AES-256-CBC, returned as the `p12`
/// algorithm identifier plus ciphertext.
fn encrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    passphrase: &str,
    plaintext: &[u8],
) -> CryptoResult<(AlgorithmIdentifier, Vec<u8>)> {
    let encryption_failed = |e: pkcs5::Error| {
        CryptoError::Operation(format!("PKCS#12 content encryption failed: {e}"))
    };

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; AES_IV_LEN];
    fill(rng, &mut salt)?;
    fill(rng, &mut iv)?;

    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(ITERATIONS, &salt, &iv)
        .map_err(encryption_failed)?;
    let scheme = pkcs5::EncryptionScheme::from(params);
    let ciphertext = scheme.encrypt(passphrase, plaintext).map_err(encryption_failed)?;

    let scheme_der = scheme
        .to_der()
        .map_err(|e| CryptoError::Operation(format!("cannot encode PBES2 parameters: {e}")))?;
    let algorithm = yasna::parse_der(&scheme_der, AlgorithmIdentifier::parse)
        .map_err(|e| CryptoError::Operation(format!("cannot encode PBES2 parameters: {e}")))?;
    Ok((algorithm, ciphertext))
}

fn safe_contents(bag: &SafeBag) -> Vec<u8> {
    yasna::construct_der(|w| w.write_sequence_of(|w| bag.write(w.next())))
}

/// Serializes a handle as a bundle protected by `passphrase`. The handle
/// must carry both its X.509 encoding and its private key.
///
/// Layout matches `openssl pkcs12 -export` on OpenSSL 3: an encrypted
/// certificate bag, a shrouded key bag, both tagged with the certificate's
/// SHA-1 as localKeyId, and a SHA-256 MAC.
pub(crate) fn encode<R: RngCore + CryptoRng>(
    rng: &mut R,
    cert: &Certificate,
    passphrase: &str,
) -> CryptoResult<Vec<u8>> {
    let der = cert.der().ok_or_else(|| {
        CryptoError::Certificate("certificate has no X.509 encoding to export".to_string())
    })?;
    let key = cert.private_key().ok_or_else(|| {
        CryptoError::Certificate("PKCS#12 export requires the private key".to_string())
    })?;
    let key_der = key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::Certificate(format!("cannot encode private key: {e}")))?;

    let attributes = vec![
        PKCS12Attribute::FriendlyName(cert.subject().to_string()),
        PKCS12Attribute::LocalKeyId(Sha1::digest(der).to_vec()),
    ];

    let cert_bag = SafeBag {
        bag: SafeBagKind::CertBag(CertBag::X509(der.to_vec())),
        attributes: attributes.clone(),
    };
    let (cert_algorithm, encrypted_certs) = encrypt(rng, passphrase, &safe_contents(&cert_bag))?;

    let (key_algorithm, encrypted_key) = encrypt(rng, passphrase, key_der.as_bytes())?;
    let key_bag = SafeBag {
        bag: SafeBagKind::Pkcs8ShroudedKeyBag(EncryptedPrivateKeyInfo {
            encryption_algorithm: key_algorithm,
            encrypted_data: encrypted_key,
        }),
        attributes,
    };

    let contents = [
        ContentInfo::EncryptedData(EncryptedData {
            encrypted_content_info: EncryptedContentInfo {
                content_encryption_algorithm: cert_algorithm,
                encrypted_content: encrypted_certs,
            },
        }),
        ContentInfo::Data(safe_contents(&key_bag)),
    ];
    let auth_safe = yasna::construct_der(|w| {
        w.write_sequence_of(|w| {
            for content in &contents {
                content.write(w.next());
            }
        })
    });

    let mut salt = [0u8; SALT_LEN];
    fill(rng, &mut salt)?;
    let bmp = bmp_password(passphrase);
    let mut mac = keyed_mac::<Sha256>(&bmp, &salt, ITERATIONS)?;
    mac.update(&auth_safe);
    let mac_data = MacData {
        mac: DigestInfo {
            digest_algorithm: AlgorithmIdentifier::OtherAlg(OtherAlgorithmIdentifier {
                algorithm_type: ObjectIdentifier::from_slice(OID_SHA256),
                params: Some(vec![0x05, 0x00]),
            }),
            digest: mac.finalize().into_bytes().to_vec(),
        },
        salt: salt.to_vec(),
        iterations: ITERATIONS,
    };

    let pfx = PFX {
        version: 3,
        auth_safe: ContentInfo::Data(auth_safe),
        mac_data: Some(mac_data),
    };
    Ok(pfx.to_der())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENSSL3_DEFAULT_P12: &[u8] =
        include_bytes!("../tests/fixtures/openssl3-default.p12");

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn bmp_password_is_utf16_be_with_terminator() {
        assert_eq!(bmp_password("pw").as_slice(), &[0, b'p', 0, b'w', 0, 0]);
        assert_eq!(bmp_password("").as_slice(), &[0, 0]);
    }

    // Vectors cross-checked against an independent implementation whose
    // SHA-256 MAC and SHA-1 3DES keys reproduce OpenSSL's output.
    #[test]
    fn key_derivation_spans_several_digest_blocks() {
        let password = bmp_password("pw");
        let salt: Vec<u8> = (0..8).collect();
        assert_eq!(
            hex(&derive_key::<Sha1>(&password, &salt, 1, 1000, 40)),
            "13baef8860acf48cd022a881fc86ff8afa07a3dcde86d78e3a3219f56a40cc467d7b4da51efcd7bf"
        );
        assert_eq!(
            hex(&derive_key::<Sha256>(&password, &salt, 1, 1000, 40)),
            "32cedcb2ca26a4eaf983b7a639a8b07cc3d7b4a12bd19b1e7cc1aec3ec81ca31214d3822ed614653"
        );
        assert_eq!(
            hex(&derive_key::<Sha512>(&password, &salt, 1, 1000, 40)),
            "d689d6c7b55e9000e326c6482417fe4e351da240abc4def02ab90643459230f023f7ef868162e5f0"
        );
    }

    #[test]
    fn key_derivation_accepts_an_empty_salt() {
        assert_eq!(
            hex(&derive_key::<Sha256>(&bmp_password("pw"), &[], MAC_KEY_ID, 1, 32)),
            "b443aef42e87b7e51c3e8179680ad2429c6d30b68905b2d1c4ad622b400d0b13"
        );
    }

    #[test]
    fn mac_digest_is_read_from_the_algorithm_oid() {
        let other = |oid: &[u64]| {
            AlgorithmIdentifier::OtherAlg(OtherAlgorithmIdentifier {
                algorithm_type: ObjectIdentifier::from_slice(oid),
                params: None,
            })
        };
        let sha1 = AlgorithmIdentifier::Sha1;
        assert_eq!(MacDigest::from_algorithm(&sha1).ok(), Some(MacDigest::Sha1));
        assert_eq!(MacDigest::from_algorithm(&other(OID_SHA256)).ok(), Some(MacDigest::Sha256));
        assert_eq!(MacDigest::from_algorithm(&other(OID_SHA512)).ok(), Some(MacDigest::Sha512));

        // MD5 is not accepted.
        let err = MacDigest::from_algorithm(&other(&[1, 2, 840, 113549, 2, 5])).unwrap_err();
        assert!(matches!(err, CryptoError::Certificate(ref m) if m.contains("unsupported")));
    }

    #[test]
    fn unknown_content_encryption_is_reported_as_unsupported() {
        let algorithm = AlgorithmIdentifier::OtherAlg(OtherAlgorithmIdentifier {
            algorithm_type: ObjectIdentifier::from_slice(&[1, 2, 3, 4]),
            params: None,
        });
        let err = decrypt(&algorithm, &[0; 16], "pw", &bmp_password("pw")).unwrap_err();
        assert!(matches!(err, CryptoError::Certificate(ref m) if m.contains("unsupported")));
    }

    #[test]
    fn bundle_without_mac_or_with_other_version_is_handled() {
        let version_two = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u8(2);
                ContentInfo::Data(vec![0x30, 0x00]).write(w.next());
            })
        });
        let err = decode(&version_two, "pw").unwrap_err();
        assert!(matches!(err, CryptoError::Certificate(ref m) if m.contains("version")));

        // No MAC and an empty AuthenticatedSafe: parses, then finds no certificate.
        let unprotected = PFX {
            version: 3,
            auth_safe: ContentInfo::Data(vec![0x30, 0x00]),
            mac_data: None,
        }
        .to_der();
        let err = decode(&unprotected, "pw").unwrap_err();
        assert!(matches!(err, CryptoError::Certificate(ref m) if m.contains("no X.509")));
    }

    #[test]
    fn export_uses_pbes2_and_a_sha256_mac() {
        let cert = decode(OPENSSL3_DEFAULT_P12, "pw").unwrap();
        let bundle = encode(&mut rand::rngs::OsRng, &cert, "new pass").unwrap();

        let parsed = yasna::parse_der(&bundle, parse_bundle).unwrap();
        assert_eq!(parsed.version, 3);
        let mac_data = parsed.mac_data.as_ref().unwrap();
        assert_eq!(
            MacDigest::from_algorithm(&mac_data.mac.digest_algorithm).ok(),
            Some(MacDigest::Sha256)
        );

        let Content::Plain(auth_safe) = parsed.auth_safe else {
            panic!("authSafe must be plain data");
        };
        let contents =
            yasna::parse_der(&auth_safe, |r| r.collect_sequence_of(parse_content)).unwrap();
        let Content::Encrypted(info) = &contents[0] else {
            panic!("certificates must be encrypted");
        };
        assert!(matches!(
            &info.content_encryption_algorithm,
            AlgorithmIdentifier::OtherAlg(other)
                if other.algorithm_type.components().as_slice() == OID_PBES2
        ));

        let reopened = decode(&bundle, "new pass").unwrap();
        assert_eq!(reopened.der(), cert.der());
        assert_eq!(reopened.private_key(), cert.private_key());
        assert!(decode(&bundle, "pw").is_err());
    }

    #[test]
    fn failing_rng_aborts_export() {
        struct BrokenRng;
        impl RngCore for BrokenRng {
            fn next_u32(&mut self) -> u32 {
                0
            }
            fn next_u64(&mut self) -> u64 {
                0
            }
            fn fill_bytes(&mut self, _: &mut [u8]) {
                unreachable!("export must use try_fill_bytes")
            }
            fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), rand::Error> {
                Err(rand::Error::new("entropy source unavailable"))
            }
        }
        impl CryptoRng for BrokenRng {}

        let cert = decode(OPENSSL3_DEFAULT_P12, "pw").unwrap();
        let err = encode(&mut BrokenRng, &cert, "pw").unwrap_err();
        assert!(matches!(err, CryptoError::Operation(_)), "got {err:?}");
    }
}
