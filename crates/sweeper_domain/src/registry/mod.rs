use crate::image::{Digest, Image, RepositoryName};
use crate::Result;
use async_trait::async_trait;

/// Read side of a registry: what exists and which images each repository holds.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<RepositoryName>>;

    /// Lists every image in `repository`, one entry per tag.
    async fn list_images(&self, repository: &RepositoryName) -> Result<Vec<Image>>;
}

/// Write side of a registry. Deletions are irreversible.
#[async_trait]
pub trait ImageDeleter: Send + Sync {
    /// Deletes `digests` from `repository` and returns how many were removed.
    /// Callers never pass an empty slice.
    async fn delete_images(&self, repository: &RepositoryName, digests: &[Digest]) -> Result<usize>;
}
