//! Block-cipher encryption of the payload (AES or 3DES, CBC or CFB,
//! PKCS#7 padding).
//!
//! Buffers are processed sequentially in [`CHUNK_SIZE`] slices so a
//! [`CancellationFlag`] can interrupt long passes. Chaining makes every
//! block depend on the previous one, so chunks are never processed in
//! parallel.

use crate::cancel::CancellationFlag;
use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyMaterial;
use crate::options::{
    CipherMode, CipherSpec, DecryptionOptions, EncryptionOptions, SymmetricAlgorithm,
};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::{Pkcs7, RawPadding};
use cbc::cipher::{Block, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::{TdesEde2, TdesEde3};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq, ConstantTimeGreater, ConstantTimeLess};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Bytes processed between cancellation checks. A multiple of every
/// supported block size.
pub const CHUNK_SIZE: usize = 64 * 1024;

const DECRYPT_FAILURE: &str = "decryption failed (wrong key or corrupted data)";

/// Expands to a call of `$run::<mode::$half<Cipher>>(args)` for the cipher
/// named by `$spec`.
macro_rules! with_cipher {
    ($spec:expr, $half:ident, $run:ident($($arg:expr),*)) => {{
        use SymmetricAlgorithm::{Aes, TripleDes};
        match ($spec.algorithm(), $spec.key_size_bits(), $spec.mode()) {
            (Aes, 128, CipherMode::Cbc) => $run::<cbc::$half<Aes128>>($($arg),*),
            (Aes, 192, CipherMode::Cbc) => $run::<cbc::$half<Aes192>>($($arg),*),
            (Aes, 256, CipherMode::Cbc) => $run::<cbc::$half<Aes256>>($($arg),*),
            (TripleDes, 128, CipherMode::Cbc) => $run::<cbc::$half<TdesEde2>>($($arg),*),
            (TripleDes, 192, CipherMode::Cbc) => $run::<cbc::$half<TdesEde3>>($($arg),*),
            (Aes, 128, CipherMode::Cfb) => $run::<cfb_mode::$half<Aes128>>($($arg),*),
            (Aes, 192, CipherMode::Cfb) => $run::<cfb_mode::$half<Aes192>>($($arg),*),
            (Aes, 256, CipherMode::Cfb) => $run::<cfb_mode::$half<Aes256>>($($arg),*),
            (TripleDes, 128, CipherMode::Cfb) => $run::<cfb_mode::$half<TdesEde2>>($($arg),*),
            (TripleDes, 192, CipherMode::Cfb) => $run::<cfb_mode::$half<TdesEde3>>($($arg),*),
            _ => Err(CryptoError::Configuration(format!("no cipher available for {}", $spec))),
        }
    }};
}

/// Length of the ciphertext produced for `plaintext_len` bytes: always
/// rounded up to the next block, with a full block added when aligned.
#[must_use]
pub fn padded_len(plaintext_len: usize, block_size: usize) -> usize {
    (plaintext_len / block_size + 1) * block_size
}

/// Symmetric half of the envelope: key generation plus block encryption.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymmetricCipherEngine;

impl SymmetricCipherEngine {
    pub fn new() -> Self {
        Self
    }

    /// Encrypts `plaintext` under freshly generated key material.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        options: &EncryptionOptions,
    ) -> CryptoResult<(KeyMaterial, Vec<u8>)> {
        self.encrypt_with_rng(&mut OsRng, plaintext, options, &CancellationFlag::new())
    }

    /// Like [`Self::encrypt`], checking `cancel` between chunks.
    pub fn encrypt_cancellable(
        &self,
        plaintext: &[u8],
        options: &EncryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<(KeyMaterial, Vec<u8>)> {
        self.encrypt_with_rng(&mut OsRng, plaintext, options, cancel)
    }

    /// Full form: key and IV are drawn from `rng`.
    ///
    /// Options are validated before the first draw.
    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        options: &EncryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<(KeyMaterial, Vec<u8>)> {
        let spec = options.validate()?;
        let material = KeyMaterial::generate(rng, &spec)?;
        let ciphertext = self.encrypt_with_key(&material, plaintext, &spec, cancel)?;
        debug!(
            cipher = %spec,
            plaintext_len = plaintext.len(),
            ciphertext_len = ciphertext.len(),
            "encrypted payload"
        );
        Ok((material, ciphertext))
    }

    /// Encrypts under caller-supplied key material.
    pub fn encrypt_with_key(
        &self,
        material: &KeyMaterial,
        plaintext: &[u8],
        spec: &CipherSpec,
        cancel: &CancellationFlag,
    ) -> CryptoResult<Vec<u8>> {
        with_cipher!(
            spec,
            Encryptor,
            encrypt_blocks(material.key(), material.iv(), plaintext, cancel)
        )
    }

    /// Decrypts `ciphertext` and strips its padding.
    ///
    /// A ciphertext that is empty, not block-aligned, or whose padding does
    /// not check out fails with [`CryptoError::Operation`]; the causes are
    /// not distinguished.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        material: &KeyMaterial,
        options: &DecryptionOptions,
    ) -> CryptoResult<Vec<u8>> {
        self.decrypt_cancellable(ciphertext, material, options, &CancellationFlag::new())
    }

    pub fn decrypt_cancellable(
        &self,
        ciphertext: &[u8],
        material: &KeyMaterial,
        options: &DecryptionOptions,
        cancel: &CancellationFlag,
    ) -> CryptoResult<Vec<u8>> {
        let spec = options.validate()?;
        if material.key().len() != spec.key_len() || material.iv().len() != spec.block_size() {
            return Err(CryptoError::Operation(format!(
                "key material does not fit {spec}"
            )));
        }
        let mut plaintext = with_cipher!(
            spec,
            Decryptor,
            decrypt_blocks(material.key(), material.iv(), ciphertext, cancel)
        )?;
        debug!(
            cipher = %spec,
            ciphertext_len = ciphertext.len(),
            plaintext_len = plaintext.len(),
            "decrypted payload"
        );
        Ok(std::mem::take(&mut *plaintext))
    }
}

fn encrypt_blocks<E>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    cancel: &CancellationFlag,
) -> CryptoResult<Vec<u8>>
where
    E: KeyIvInit + BlockEncryptMut,
{
    let mut cipher = E::new_from_slices(key, iv)
        .map_err(|_| CryptoError::Operation("invalid key or IV length".to_string()))?;
    let block_size = E::block_size();
    let aligned = plaintext.len() - plaintext.len() % block_size;
    let (body, tail) = plaintext.split_at(aligned);

    let mut out = Vec::with_capacity(padded_len(plaintext.len(), block_size));
    for chunk in body.chunks(CHUNK_SIZE) {
        if let Err(e) = cancel.check() {
            out.zeroize();
            return Err(e);
        }
        for bytes in chunk.chunks_exact(block_size) {
            let mut block = Block::<E>::clone_from_slice(bytes);
            cipher.encrypt_block_mut(&mut block);
            out.extend_from_slice(&block);
        }
    }

    let mut last = Block::<E>::default();
    last[..tail.len()].copy_from_slice(tail);
    Pkcs7::raw_pad(&mut last[..], tail.len());
    cipher.encrypt_block_mut(&mut last);
    out.extend_from_slice(&last);
    last.as_mut_slice().zeroize();

    Ok(out)
}

fn decrypt_blocks<D>(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    cancel: &CancellationFlag,
) -> CryptoResult<Zeroizing<Vec<u8>>>
where
    D: KeyIvInit + BlockDecryptMut,
{
    let block_size = D::block_size();
    let block_len = u8::try_from(block_size)
        .map_err(|_| CryptoError::Operation("unsupported cipher block size".to_string()))?;
    let mut cipher = D::new_from_slices(key, iv)
        .map_err(|_| CryptoError::Operation("invalid key or IV length".to_string()))?;

    // A misaligned tail is not decrypted; it fails below together with the
    // padding check.
    let aligned = ciphertext.len() - ciphertext.len() % block_size;
    let mut out = Zeroizing::new(Vec::with_capacity(aligned));
    for chunk in ciphertext[..aligned].chunks(CHUNK_SIZE) {
        cancel.check()?;
        for bytes in chunk.chunks_exact(block_size) {
            let mut block = Block::<D>::clone_from_slice(bytes);
            cipher.decrypt_block_mut(&mut block);
            out.extend_from_slice(&block);
            block.as_mut_slice().zeroize();
        }
    }

    let mut last = Block::<D>::default();
    if let Some(start) = out.len().checked_sub(block_size) {
        last.copy_from_slice(&out[start..]);
    }
    let (padding_ok, pad_len) = check_padding(&last, block_len);
    last.as_mut_slice().zeroize();

    let well_formed = Choice::from(u8::from(aligned > 0 && aligned == ciphertext.len()));
    if !bool::from(well_formed & padding_ok) {
        return Err(CryptoError::Operation(DECRYPT_FAILURE.to_string()));
    }
    let kept = out.len() - pad_len;
    out.truncate(kept);
    Ok(out)
}

/// Checks PKCS#7 padding on the final block without branching on its
/// contents. Returns the verdict and the padding length the block claims.
fn check_padding(last: &[u8], block_len: u8) -> (Choice, usize) {
    let pad = last.last().copied().unwrap_or(0);
    let mut valid = !pad.ct_eq(&0) & !pad.ct_gt(&block_len);
    for (offset, byte) in (0u8..).zip(last.iter().rev()) {
        let in_padding = offset.ct_lt(&pad);
        valid &= !in_padding | byte.ct_eq(&pad);
    }
    (valid, usize::from(pad))
}
