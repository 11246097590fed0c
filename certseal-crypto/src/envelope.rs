//! The envelope: RSA-wrapped key material plus the symmetric ciphertext.
//!
//! This is the only value that crosses a trust boundary. For flat byte
//! transports it is framed as
//!
//! ```text
//! [u32 BE wrapped-key length][wrapped key][ciphertext]
//! ```
//!
//! and Base64 of that framing is provided for text transports.

use crate::error::{CryptoError, CryptoResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

const LENGTH_PREFIX: usize = 4;

/// Output of [`crate::EnvelopeEncryptionService::encrypt_and_wrap`].
///
/// Immutable once produced. Does not record the options it was made with;
/// the receiver must know them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    wrapped_key: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(wrapped_key: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            wrapped_key,
            ciphertext,
        }
    }

    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Consumes the envelope, returning `(wrapped_key, ciphertext)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.wrapped_key, self.ciphertext)
    }

    /// Length-prefixed flat encoding.
    pub fn to_bytes(&self) -> CryptoResult<Vec<u8>> {
        let key_len = u32::try_from(self.wrapped_key.len()).map_err(|_| {
            CryptoError::InvalidArgument("wrapped key longer than u32::MAX bytes".to_string())
        })?;
        let mut out =
            Vec::with_capacity(LENGTH_PREFIX + self.wrapped_key.len() + self.ciphertext.len());
        out.extend_from_slice(&key_len.to_be_bytes());
        out.extend_from_slice(&self.wrapped_key);
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parses the encoding produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let (prefix, rest) = bytes.split_first_chunk::<LENGTH_PREFIX>().ok_or_else(|| {
            CryptoError::InvalidArgument(format!(
                "envelope of {} bytes is shorter than its length prefix",
                bytes.len()
            ))
        })?;
        let key_len = u32::from_be_bytes(*prefix) as usize;
        if key_len == 0 {
            return Err(CryptoError::InvalidArgument(
                "envelope has an empty wrapped key".to_string(),
            ));
        }
        if key_len > rest.len() {
            return Err(CryptoError::InvalidArgument(format!(
                "wrapped key length {key_len} exceeds the {} bytes that follow",
                rest.len()
            )));
        }
        let (wrapped_key, ciphertext) = rest.split_at(key_len);
        if ciphertext.is_empty() {
            return Err(CryptoError::InvalidArgument(
                "envelope has no ciphertext".to_string(),
            ));
        }
        Ok(Self::new(wrapped_key.to_vec(), ciphertext.to_vec()))
    }

    pub fn to_base64(&self) -> CryptoResult<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidArgument(format!("invalid base64 envelope: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoErrorKind;

    fn sample() -> Envelope {
        Envelope::new(vec![1, 2, 3], vec![9; 16])
    }

    #[test]
    fn framing_layout() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..7], &[1, 2, 3]);
        assert_eq!(bytes.len(), 4 + 3 + 16);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn base64_roundtrip_tolerates_whitespace() {
        let encoded = format!("{}\n", sample().to_base64().unwrap());
        assert_eq!(Envelope::from_base64(&encoded).unwrap(), sample());
    }

    #[test]
    fn short_buffer_rejected() {
        let err = Envelope::from_bytes(&[0, 0, 1]).unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::InvalidArgument);
    }

    #[test]
    fn oversized_length_prefix_rejected() {
        let err = Envelope::from_bytes(&[0, 0, 1, 0, 7, 7]).unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_parts_rejected() {
        assert!(Envelope::from_bytes(&[0, 0, 0, 0, 1, 2]).is_err());
        assert!(Envelope::from_bytes(&[0, 0, 0, 2, 1, 2]).is_err());
    }

    #[test]
    fn garbage_base64_rejected() {
        let err = Envelope::from_base64("not base64 at all!").unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::InvalidArgument);
    }
}
