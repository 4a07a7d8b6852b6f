use crate::report::Summary;
use sweeper_common::diagnostic::{Diagnosable, Error};
use sweeper_domain::RepositoryName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// The repository list could not be fetched; nothing was attempted.
    #[error("Failed to list repositories: {0}")]
    ListRepositories(#[source] Error),
    /// Every repository was attempted and `failed` of them errored.
    /// Deletions in the other repositories have already happened.
    #[error("{failed} errors occurred!")]
    Aggregate {
        failed: usize,
        repositories: Vec<RepositoryName>,
        summary: Summary,
    },
}

impl CleanupError {
    /// Number of repositories this error stands for, if the run got that far.
    pub fn failed_count(&self) -> Option<usize> {
        match self {
            Self::ListRepositories(_) => None,
            Self::Aggregate { failed, .. } => Some(*failed),
        }
    }
}

impl Diagnosable for CleanupError {
    fn code(&self) -> String {
        match self {
            Self::ListRepositories(_) => "CLEANUP_LIST_REPOSITORIES_FAILED".to_string(),
            Self::Aggregate { .. } => "CLEANUP_REPOSITORIES_FAILED".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::ListRepositories(source) => source
                .suggestion()
                .map(str::to_string)
                .or_else(|| Some("Check registry connectivity and catalog permissions".to_string())),
            Self::Aggregate { repositories, .. } => {
                let names: Vec<&str> = repositories.iter().map(RepositoryName::as_str).collect();
                Some(format!("See the log for causes; failed: {}", names.join(", ")))
            }
        }
    }
}
