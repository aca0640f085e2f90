use crate::error::ShortenerError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An identifier for a shortened URL.
///
/// Codes are made of ASCII letters and digits only. Generated codes have a
/// fixed length chosen by the generator; codes arriving from callers are
/// accepted in the range `1..=64` characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Shortest code accepted from callers.
    pub const MIN_LENGTH: usize = 1;
    /// Longest code accepted from callers; generators must stay within it.
    pub const MAX_LENGTH: usize = 64;

    /// Creates a new `ShortCode` after validating the input.
    pub fn new(code: impl Into<String>) -> std::result::Result<Self, ShortenerError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (generators, rows read back from a backend).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> std::result::Result<(), ShortenerError> {
        if code.len() < Self::MIN_LENGTH || code.len() > Self::MAX_LENGTH {
            return Err(ShortenerError::InvalidArgument(format!(
                "short code length must be between {} and {}, got {}",
                Self::MIN_LENGTH,
                Self::MAX_LENGTH,
                code.len()
            )));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShortenerError::InvalidArgument(format!(
                "short code must contain only ascii letters and digits: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes() {
        assert!(ShortCode::new("a").is_ok());
        assert!(ShortCode::new("aB3dE9").is_ok());
        assert!(ShortCode::new("a".repeat(64)).is_ok());
    }

    #[test]
    fn empty_or_too_long() {
        assert!(ShortCode::new("").is_err());
        assert!(ShortCode::new("a".repeat(65)).is_err());
    }

    #[test]
    fn invalid_characters() {
        assert!(ShortCode::new("abc def").is_err());
        assert!(ShortCode::new("abc/def").is_err());
        assert!(ShortCode::new("abc-def").is_err());
        assert!(ShortCode::new("favicon.ico").is_err());
    }

    #[test]
    fn display() {
        let code = ShortCode::new("aB3dE9").unwrap();
        assert_eq!(code.to_string(), "aB3dE9");
    }

    #[test]
    fn to_url() {
        let code = ShortCode::new("abc123").unwrap();
        assert_eq!(
            code.to_url("http://localhost:5001"),
            "http://localhost:5001/abc123"
        );
        assert_eq!(
            code.to_url("http://localhost:5001/"),
            "http://localhost:5001/abc123"
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let code = ShortCode::new_unchecked("aB3dE9");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"aB3dE9\"");
    }
}
