use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use sweeper_common::diagnostic::{Diagnosable, Error};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Digest '{0}' is missing the algorithm prefix")]
    MissingAlgorithm(String),
    #[error("Unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("Digest '{0}' has an invalid encoded part")]
    InvalidEncoding(String),
}

impl Diagnosable for DigestError {
    fn code(&self) -> String {
        match self {
            Self::MissingAlgorithm(_) => "DIGEST_MISSING_ALGORITHM".to_string(),
            Self::UnsupportedAlgorithm(_) => "DIGEST_UNSUPPORTED_ALGORITHM".to_string(),
            Self::InvalidEncoding(_) => "DIGEST_INVALID_ENCODING".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnsupportedAlgorithm(_) => Some("Only sha256 and sha512 digests are supported".to_string()),
            _ => Some("Digests look like sha256:<64 lowercase hex chars>".to_string()),
        }
    }
}

/// Content-addressed manifest identifier, e.g. `sha256:e3b0…`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let Some((algorithm, encoded)) = s.split_once(':') else {
            return Err(Error::new(DigestError::MissingAlgorithm(s.clone())));
        };

        let expected_len = match algorithm {
            "sha256" => 64,
            "sha512" => 128,
            other => return Err(Error::new(DigestError::UnsupportedAlgorithm(other.to_string()))),
        };

        let lower_hex = encoded
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if encoded.len() != expected_len || !lower_hex {
            return Err(Error::new(DigestError::InvalidEncoding(s.clone())));
        }

        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map_or("", |(algorithm, _)| algorithm)
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
