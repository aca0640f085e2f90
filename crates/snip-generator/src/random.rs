use crate::Generator;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use snip_core::{ShortCode, ShortenerError};

/// Code length used when none is configured.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Draws codes of a fixed length from the 62-symbol alphabet
/// `A-Z a-z 0-9`, each symbol independent and uniform.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new(length: usize) -> Result<Self, ShortenerError> {
        if !(ShortCode::MIN_LENGTH..=ShortCode::MAX_LENGTH).contains(&length) {
            return Err(ShortenerError::InvalidArgument(format!(
                "short code length must be between {} and {}, got {}",
                ShortCode::MIN_LENGTH,
                ShortCode::MAX_LENGTH,
                length
            )));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let code: String = rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
