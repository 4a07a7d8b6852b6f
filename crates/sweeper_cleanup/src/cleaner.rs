use crate::error::CleanupError;
use crate::report::{RepositoryOutcome, RepositoryReport, Summary};
use futures::{stream, StreamExt};
use std::num::NonZeroUsize;
use std::sync::Arc;
use sweeper_domain::retention::compute_deletable;
use sweeper_domain::{Digest, ImageDeleter, ImageRegistry, RepositoryName};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Drives one cleanup run: list repositories, then list, filter and delete
/// per repository, all repositories at once.
///
/// A failing repository never stops its siblings. Every pipeline returns
/// its own [`RepositoryReport`] and the counts are folded after the join.
pub struct Cleaner {
    registry: Arc<dyn ImageRegistry>,
    deleter: Arc<dyn ImageDeleter>,
    concurrency: Option<NonZeroUsize>,
}

impl Cleaner {
    pub fn new(registry: Arc<dyn ImageRegistry>, deleter: Arc<dyn ImageDeleter>) -> Self {
        Self {
            registry,
            deleter,
            concurrency: None,
        }
    }

    /// Caps how many repositories are processed at the same time.
    /// Without a cap every repository starts immediately.
    pub fn with_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    /// Runs the cleanup and fails if any repository failed.
    ///
    /// Deletions that succeeded before the failure are not rolled back.
    pub async fn run(&self) -> Result<Summary, CleanupError> {
        let (summary, reports) = self.run_detailed().await?;

        let repositories: Vec<RepositoryName> = reports
            .into_iter()
            .filter(RepositoryReport::is_errored)
            .map(|report| report.repository)
            .collect();

        if repositories.is_empty() {
            Ok(summary)
        } else {
            Err(CleanupError::Aggregate {
                failed: repositories.len(),
                repositories,
                summary,
            })
        }
    }

    /// Runs the cleanup and returns every repository's report. Only a
    /// failure to list repositories is an error here.
    pub async fn run_detailed(&self) -> Result<(Summary, Vec<RepositoryReport>), CleanupError> {
        let span = info_span!("cleanup_run", run_id = %Uuid::new_v4());

        async move {
            info!("Starting cleanup");
            let repositories = self
                .registry
                .list_repositories()
                .await
                .map_err(CleanupError::ListRepositories)?;

            let limit = self
                .concurrency
                .map_or(repositories.len(), NonZeroUsize::get)
                .max(1);

            let reports: Vec<RepositoryReport> = stream::iter(repositories)
                .map(|repository| self.clean_repository(repository))
                .buffer_unordered(limit)
                .collect()
                .await;

            let summary = Summary::from_reports(&reports);
            info!(
                cleaned = summary.cleaned,
                skipped = summary.skipped,
                errored = summary.errored,
                total = summary.total,
                "{}",
                summary
            );
            Ok::<_, CleanupError>((summary, reports))
        }
        .instrument(span)
        .await
    }

    async fn clean_repository(&self, repository: RepositoryName) -> RepositoryReport {
        let span = info_span!("repository", name = %repository);

        let outcome = match self.prune(&repository).instrument(span).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(repository = %repository, code = e.code(), "Cleanup error: {}", e);
                RepositoryOutcome::Errored(e)
            }
        };

        RepositoryReport { repository, outcome }
    }

    async fn prune(&self, repository: &RepositoryName) -> sweeper_common::Result<RepositoryOutcome> {
        let images = self.registry.list_images(repository).await?;
        let deletable = compute_deletable(&images);

        if deletable.is_empty() {
            info!(repository = %repository, images = images.len(), "Nothing to delete");
            return Ok(RepositoryOutcome::Skipped);
        }

        let digests: Vec<Digest> = deletable.into_iter().map(|image| image.digest).collect();
        let deleted = self.deleter.delete_images(repository, &digests).await?;

        info!(repository = %repository, deleted, "Deleted {} old images", deleted);
        Ok(RepositoryOutcome::Cleaned { deleted })
    }
}
