//! Ephemeral symmetric key material.

use crate::error::{CryptoError, CryptoResult};
use crate::options::CipherSpec;
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A symmetric key and its IV, generated fresh for one encryption.
///
/// Zeroized on drop. Neither `Clone` nor serializable; the
/// only form that leaves an operation is the RSA-wrapped one.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl KeyMaterial {
    /// Draws a key of `spec.key_len()` bytes and an IV of one block from `rng`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Operation`] when the generator cannot supply bytes.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, spec: &CipherSpec) -> CryptoResult<Self> {
        let mut material = Self {
            key: vec![0u8; spec.key_len()],
            iv: vec![0u8; spec.block_size()],
        };
        rng.try_fill_bytes(&mut material.key)
            .and_then(|()| rng.try_fill_bytes(&mut material.iv))
            .map_err(|e| CryptoError::Operation(format!("random number generator failed: {e}")))?;
        Ok(material)
    }

    /// Builds key material from raw parts, checking both lengths.
    pub fn from_parts(key: &[u8], iv: &[u8], spec: &CipherSpec) -> CryptoResult<Self> {
        if key.len() != spec.key_len() || iv.len() != spec.block_size() {
            return Err(CryptoError::InvalidArgument(format!(
                "{spec} needs a {}-byte key and {}-byte IV, got {} and {}",
                spec.key_len(),
                spec.block_size(),
                key.len(),
                iv.len()
            )));
        }
        Ok(Self {
            key: key.to_vec(),
            iv: iv.to_vec(),
        })
    }

    /// Splits a recovered `key || iv` buffer.
    pub(crate) fn split(buffer: &[u8], spec: &CipherSpec) -> CryptoResult<Self> {
        let expected = spec.key_len() + spec.block_size();
        if buffer.len() != expected {
            return Err(CryptoError::KeyUnwrapping(format!(
                "recovered {} bytes of key material, {spec} needs {expected}",
                buffer.len()
            )));
        }
        let (key, iv) = buffer.split_at(spec.key_len());
        Ok(Self {
            key: key.to_vec(),
            iv: iv.to_vec(),
        })
    }

    /// Concatenates `key || iv` into a buffer that is wiped on drop.
    pub(crate) fn concat(&self) -> Zeroizing<Vec<u8>> {
        let mut buffer = Zeroizing::new(Vec::with_capacity(self.key.len() + self.iv.len()));
        buffer.extend_from_slice(&self.key);
        buffer.extend_from_slice(&self.iv);
        buffer
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &format_args!("<{} bytes redacted>", self.key.len()))
            .field("iv", &format_args!("<{} bytes redacted>", self.iv.len()))
            .finish()
    }
}
