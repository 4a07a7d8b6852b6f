use semver::Version;
use std::fmt;

/// Tags starting with this prefix carry a semantic version.
pub const VERSION_TAG_PREFIX: &str = "version-";

/// Structured view of an image tag.
///
/// Parsed once when an image is ingested so the retention filter never
/// has to look at tag strings again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTag {
    Untagged,
    /// Any tag that is not a well-formed `version-` tag. Never deleted.
    Pinned(String),
    Versioned { tag: String, version: Version },
}

impl ImageTag {
    /// A `version-` tag whose suffix is not valid semver is pinned rather
    /// than guessed at. One leading `v` or `=` on the suffix is accepted,
    /// as npm-style versions allow it.
    pub fn parse(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::Untagged;
        };

        match tag.strip_prefix(VERSION_TAG_PREFIX) {
            Some(suffix) => match Version::parse(suffix.strip_prefix(|c: char| c == 'v' || c == '=').unwrap_or(suffix)) {
                Ok(version) => Self::Versioned {
                    tag: tag.to_string(),
                    version,
                },
                Err(e) => {
                    tracing::warn!(tag, error = %e, "Unparsable version tag, pinning image");
                    Self::Pinned(tag.to_string())
                }
            },
            None => Self::Pinned(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Untagged => None,
            Self::Pinned(tag) | Self::Versioned { tag, .. } => Some(tag),
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Versioned { version, .. } => Some(version),
            _ => None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        !matches!(self, Self::Versioned { .. })
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(tag) => write!(f, "{}", tag),
            None => write!(f, "<untagged>"),
        }
    }
}
