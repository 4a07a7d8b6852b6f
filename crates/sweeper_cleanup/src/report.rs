use std::fmt;
use sweeper_common::diagnostic::Error;
use sweeper_domain::RepositoryName;

/// What happened to one repository during a run.
#[derive(Debug)]
pub enum RepositoryOutcome {
    Cleaned { deleted: usize },
    /// Nothing was eligible for deletion.
    Skipped,
    Errored(Error),
}

#[derive(Debug)]
pub struct RepositoryReport {
    pub repository: RepositoryName,
    pub outcome: RepositoryOutcome,
}

impl RepositoryReport {
    pub fn is_errored(&self) -> bool {
        matches!(self.outcome, RepositoryOutcome::Errored(_))
    }
}

/// Counts for a whole run. `deleted` is the number of images removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub cleaned: usize,
    pub skipped: usize,
    pub errored: usize,
    pub total: usize,
    pub deleted: usize,
}

impl Summary {
    pub fn from_reports(reports: &[RepositoryReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.total += 1;
            match &report.outcome {
                RepositoryOutcome::Cleaned { deleted } => {
                    summary.cleaned += 1;
                    summary.deleted += deleted;
                }
                RepositoryOutcome::Skipped => summary.skipped += 1,
                RepositoryOutcome::Errored(_) => summary.errored += 1,
            }
            summary
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories cleaned up; {} skipped out of {} ({} images deleted, {} errors)",
            self.cleaned, self.skipped, self.total, self.deleted, self.errored
        )
    }
}
