//! Random passphrase generation.
//!
//! Each character costs two bytes from the RNG: the first picks one of
//! four character classes, the second picks a character within it.

use crate::error::{CryptoError, CryptoResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

/// Shortest passphrase the generator will produce.
pub const MINIMUM_PASSWORD_LENGTH: usize = 8;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NUMERIC: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{}<>?";

/// The four alphabets a passphrase is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterClass {
    Uppercase,
    Lowercase,
    Numeric,
    Special,
}

impl CharacterClass {
    pub const ALL: [Self; 4] = [Self::Uppercase, Self::Lowercase, Self::Numeric, Self::Special];

    #[must_use]
    pub const fn alphabet(self) -> &'static [u8] {
        match self {
            Self::Uppercase => UPPERCASE,
            Self::Lowercase => LOWERCASE,
            Self::Numeric => NUMERIC,
            Self::Special => SPECIAL,
        }
    }

    /// The class `c` belongs to, if any.
    #[must_use]
    pub fn of(c: char) -> Option<Self> {
        let byte = u8::try_from(c).ok()?;
        Self::ALL
            .into_iter()
            .find(|class| class.alphabet().contains(&byte))
    }
}

/// Length and encoding policy for [`generate_random_passphrase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassphraseOptions {
    required_length: usize,
    encode_base64: bool,
}

impl Default for PassphraseOptions {
    fn default() -> Self {
        Self {
            required_length: 16,
            encode_base64: false,
        }
    }
}

impl PassphraseOptions {
    #[must_use]
    pub fn builder() -> PassphraseOptionsBuilder {
        PassphraseOptionsBuilder::default()
    }

    pub fn validate(&self) -> CryptoResult<()> {
        if self.required_length < MINIMUM_PASSWORD_LENGTH {
            return Err(CryptoError::Passphrase {
                required: self.required_length,
                minimum: MINIMUM_PASSWORD_LENGTH,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn required_length(&self) -> usize {
        self.required_length
    }

    #[must_use]
    pub fn encode_base64(&self) -> bool {
        self.encode_base64
    }
}

#[derive(Clone, Debug, Default)]
pub struct PassphraseOptionsBuilder {
    options: PassphraseOptions,
}

impl PassphraseOptionsBuilder {
    pub fn set_required_length(&mut self, length: usize) -> &mut Self {
        self.options.required_length = length;
        self
    }

    /// Base64-encodes the generated passphrase. The result is longer than
    /// `required_length` and no longer limited to the four alphabets.
    pub fn set_encode_base64(&mut self, encode: bool) -> &mut Self {
        self.options.encode_base64 = encode;
        self
    }

    pub fn build(&self) -> CryptoResult<PassphraseOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Generates a passphrase from the operating system's CSPRNG.
pub fn generate_random_passphrase(options: &PassphraseOptions) -> CryptoResult<String> {
    generate_random_passphrase_with_rng(&mut OsRng, options)
}

pub fn generate_random_passphrase_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    options: &PassphraseOptions,
) -> CryptoResult<String> {
    options.validate()?;

    let mut draws = Zeroizing::new(vec![0u8; options.required_length * 2]);
    rng.try_fill_bytes(&mut draws)
        .map_err(|e| CryptoError::Operation(format!("random number generator failed: {e}")))?;

    let mut passphrase = String::with_capacity(options.required_length);
    for pair in draws.chunks_exact(2) {
        let class = CharacterClass::ALL[usize::from(pair[0]) % CharacterClass::ALL.len()];
        let alphabet = class.alphabet();
        passphrase.push(char::from(alphabet[usize::from(pair[1]) % alphabet.len()]));
    }

    if options.encode_base64 {
        let encoded = STANDARD.encode(passphrase.as_bytes());
        passphrase.zeroize();
        return Ok(encoded);
    }
    Ok(passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CryptoErrorKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn below_minimum_is_rejected() {
        let err = PassphraseOptions::builder()
            .set_required_length(6)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), CryptoErrorKind::Passphrase);
    }

    #[test]
    fn minimum_is_accepted() {
        let opts = PassphraseOptions::builder()
            .set_required_length(MINIMUM_PASSWORD_LENGTH)
            .build()
            .unwrap();
        assert_eq!(generate_random_passphrase(&opts).unwrap().len(), 8);
    }

    #[test]
    fn mapping_follows_class_then_index() {
        struct Fixed(Vec<u8>);
        impl RngCore for Fixed {
            fn next_u32(&mut self) -> u32 {
                unimplemented!()
            }
            fn next_u64(&mut self) -> u64 {
                unimplemented!()
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.copy_from_slice(&self.0[..dest.len()]);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }
        impl CryptoRng for Fixed {}

        // (class, index) pairs: upper 0, lower 1, numeric 12 % 10, special 0,
        // then class 4 wraps to upper, index 27 wraps to 1.
        let mut rng = Fixed(vec![0, 0, 1, 1, 2, 12, 3, 0, 4, 27, 5, 25, 6, 9, 7, 20]);
        let opts = PassphraseOptions::builder().set_required_length(8).build().unwrap();
        let p = generate_random_passphrase_with_rng(&mut rng, &opts).unwrap();
        assert_eq!(p, "Ab2!Bz9?");
    }

    #[test]
    fn seeded_csprng_is_deterministic() {
        let opts = PassphraseOptions::default();
        let a = generate_random_passphrase_with_rng(&mut ChaCha20Rng::seed_from_u64(7), &opts)
            .unwrap();
        let b = generate_random_passphrase_with_rng(&mut ChaCha20Rng::seed_from_u64(7), &opts)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn base64_is_post_processing() {
        let opts = PassphraseOptions::builder()
            .set_required_length(12)
            .set_encode_base64(true)
            .build()
            .unwrap();
        let plain = generate_random_passphrase_with_rng(
            &mut ChaCha20Rng::seed_from_u64(1),
            &PassphraseOptions::builder().set_required_length(12).build().unwrap(),
        )
        .unwrap();
        let encoded =
            generate_random_passphrase_with_rng(&mut ChaCha20Rng::seed_from_u64(1), &opts).unwrap();
        assert_eq!(encoded, STANDARD.encode(plain.as_bytes()));
        assert_eq!(encoded.len(), 16);
    }

    #[test]
    fn classify_known_characters() {
        assert_eq!(CharacterClass::of('Q'), Some(CharacterClass::Uppercase));
        assert_eq!(CharacterClass::of('q'), Some(CharacterClass::Lowercase));
        assert_eq!(CharacterClass::of('5'), Some(CharacterClass::Numeric));
        assert_eq!(CharacterClass::of('%'), Some(CharacterClass::Special));
        assert_eq!(CharacterClass::of(' '), None);
        assert_eq!(CharacterClass::of('é'), None);
    }
}
