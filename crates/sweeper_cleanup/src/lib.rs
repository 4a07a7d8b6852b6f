//! Cleanup run across every repository of a registry.

pub mod cleaner;
pub mod dry_run;
pub mod error;
pub mod report;

pub use cleaner::Cleaner;
pub use dry_run::DryRunDeleter;
pub use error::CleanupError;
pub use report::{RepositoryOutcome, RepositoryReport, Summary};
