use async_trait::async_trait;
use sweeper_domain::{Digest, ImageDeleter, RepositoryName};
use tracing::info;

/// Deleter that only logs. Reports every digest as deleted so a dry run
/// produces the same summary a real run would.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDeleter;

#[async_trait]
impl ImageDeleter for DryRunDeleter {
    async fn delete_images(&self, repository: &RepositoryName, digests: &[Digest]) -> sweeper_common::Result<usize> {
        for digest in digests {
            info!(repository = %repository, digest = %digest, "Would delete image");
        }
        Ok(digests.len())
    }
}
