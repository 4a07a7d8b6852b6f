pub mod digest;
pub mod repository;
pub mod tag;

pub use digest::{Digest, DigestError};
pub use repository::{RepositoryName, RepositoryNameError};
pub use tag::ImageTag;

/// A single manifest in a repository, as seen through one of its tags.
///
/// The same digest may show up several times in a listing, once per tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub digest: Digest,
    pub tag: ImageTag,
}

impl Image {
    pub fn new(digest: Digest, tag: Option<&str>) -> Self {
        Self {
            digest,
            tag: ImageTag::parse(tag),
        }
    }

    pub fn untagged(digest: Digest) -> Self {
        Self {
            digest,
            tag: ImageTag::Untagged,
        }
    }
}
