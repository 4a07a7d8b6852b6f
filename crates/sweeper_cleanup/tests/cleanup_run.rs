use async_trait::async_trait;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sweeper_cleanup::{Cleaner, CleanupError, DryRunDeleter, RepositoryOutcome, Summary};
use sweeper_common::diagnostic::{Diagnosable, Error};
use sweeper_domain::{Digest, Image, ImageDeleter, ImageRegistry, RepositoryName};
use tokio::sync::Barrier;

#[derive(Debug, thiserror::Error)]
#[error("injected registry failure")]
struct InjectedFailure;

impl Diagnosable for InjectedFailure {
    fn code(&self) -> String {
        "TEST_INJECTED".to_string()
    }
    fn suggestion(&self) -> Option<String> {
        None
    }
}

enum Listing {
    Images(Vec<Image>),
    Fail,
}

#[derive(Default)]
struct FakeRegistry {
    fail_catalog: bool,
    repositories: Vec<(String, Listing)>,
    barrier: Option<Barrier>,
    list_images_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRegistry {
    fn with(repositories: Vec<(&str, Listing)>) -> Self {
        Self {
            repositories: repositories
                .into_iter()
                .map(|(name, listing)| (name.to_string(), listing))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageRegistry for FakeRegistry {
    async fn list_repositories(&self) -> sweeper_common::Result<Vec<RepositoryName>> {
        if self.fail_catalog {
            return Err(Error::new(InjectedFailure));
        }
        self.repositories
            .iter()
            .map(|(name, _)| RepositoryName::new(name.clone()))
            .collect()
    }

    async fn list_images(&self, repository: &RepositoryName) -> sweeper_common::Result<Vec<Image>> {
        self.list_images_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        match &self.barrier {
            Some(barrier) => {
                barrier.wait().await;
            }
            None => tokio::time::sleep(Duration::from_millis(5)).await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let listing = self
            .repositories
            .iter()
            .find(|(name, _)| name == repository.as_str())
            .map(|(_, listing)| listing);

        match listing {
            Some(Listing::Images(images)) => Ok(images.clone()),
            _ => Err(Error::new(InjectedFailure)),
        }
    }
}

#[derive(Default)]
struct RecordingDeleter {
    fail_for: HashSet<String>,
    calls: Mutex<Vec<(String, Vec<Digest>)>>,
}

impl RecordingDeleter {
    fn calls(&self) -> Vec<(String, Vec<Digest>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageDeleter for RecordingDeleter {
    async fn delete_images(&self, repository: &RepositoryName, digests: &[Digest]) -> sweeper_common::Result<usize> {
        assert!(!digests.is_empty(), "deleter called with nothing to delete");
        if self.fail_for.contains(repository.as_str()) {
            return Err(Error::new(InjectedFailure));
        }
        self.calls
            .lock()
            .unwrap()
            .push((repository.to_string(), digests.to_vec()));
        Ok(digests.len())
    }
}

fn digest(n: u32) -> Digest {
    Digest::new(format!("sha256:{:064x}", n)).unwrap()
}

/// `latest` plus `count` ascending version tags starting at digest `base`.
fn repo_images(base: u32, count: u32) -> Vec<Image> {
    let mut images = vec![Image::new(digest(base + 10_000), Some("latest"))];
    for patch in 0..count {
        images.push(Image::new(digest(base + patch), Some(&format!("version-1.0.{}", patch))));
    }
    images
}

fn cleaner(registry: Arc<FakeRegistry>, deleter: Arc<RecordingDeleter>) -> Cleaner {
    Cleaner::new(registry, deleter)
}

#[tokio::test]
async fn test_all_repositories_cleaned() {
    let registry = Arc::new(FakeRegistry::with(vec![
        ("a", Listing::Images(repo_images(0, 26))),
        ("b", Listing::Images(repo_images(100, 22))),
    ]));
    let deleter = Arc::new(RecordingDeleter::default());

    let summary = cleaner(registry, deleter.clone()).run().await.unwrap();

    assert_eq!(
        summary,
        Summary { cleaned: 2, skipped: 0, errored: 0, total: 2, deleted: 8 }
    );

    let mut calls = deleter.calls();
    calls.sort_by(|x, y| x.0.cmp(&y.0));
    let a: HashSet<Digest> = calls[0].1.iter().cloned().collect();
    assert_eq!(calls[0].0, "a");
    assert_eq!(a, (0..6).map(digest).collect());
    assert_eq!(calls[1].0, "b");
    assert_eq!(calls[1].1.len(), 2);
}

#[tokio::test]
async fn test_empty_repository_is_skipped_without_delete() {
    let registry = Arc::new(FakeRegistry::with(vec![
        ("empty", Listing::Images(vec![])),
        ("few", Listing::Images(repo_images(0, 5))),
    ]));
    let deleter = Arc::new(RecordingDeleter::default());

    let summary = cleaner(registry, deleter.clone()).run().await.unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.cleaned, 0);
    assert_eq!(summary.total, 2);
    assert!(deleter.calls().is_empty());
}

#[tokio::test]
async fn test_list_images_failure_is_isolated() {
    let registry = Arc::new(FakeRegistry::with(vec![
        ("ok-1", Listing::Images(repo_images(0, 21))),
        ("broken", Listing::Fail),
        ("ok-2", Listing::Images(repo_images(100, 23))),
    ]));
    let deleter = Arc::new(RecordingDeleter::default());

    let err = cleaner(registry, deleter.clone()).run().await.unwrap_err();

    match err {
        CleanupError::Aggregate { failed, repositories, summary } => {
            assert_eq!(failed, 1);
            assert_eq!(repositories, vec![RepositoryName::new("broken").unwrap()]);
            assert_eq!(summary.errored, 1);
            assert_eq!(summary.cleaned, 2);
            assert_eq!(summary.total, 3);
        }
        other => panic!("expected aggregate error, got {other:?}"),
    }

    // Successful repositories were still pruned.
    let cleaned: HashSet<String> = deleter.calls().into_iter().map(|(name, _)| name).collect();
    assert_eq!(cleaned, HashSet::from(["ok-1".to_string(), "ok-2".to_string()]));
}

#[tokio::test]
async fn test_delete_failure_counts_as_errored() {
    let registry = Arc::new(FakeRegistry::with(vec![
        ("a", Listing::Images(repo_images(0, 25))),
        ("b", Listing::Images(repo_images(100, 25))),
    ]));
    let deleter = Arc::new(RecordingDeleter {
        fail_for: HashSet::from(["b".to_string()]),
        ..Default::default()
    });

    let err = cleaner(registry, deleter.clone()).run().await.unwrap_err();

    assert_eq!(err.failed_count(), Some(1));
    assert_eq!(err.to_string(), "1 errors occurred!");
    assert_eq!(deleter.calls().len(), 1);
}

#[tokio::test]
async fn test_list_repositories_failure_is_fatal() {
    let registry = Arc::new(FakeRegistry {
        fail_catalog: true,
        ..FakeRegistry::with(vec![("a", Listing::Images(repo_images(0, 30)))])
    });
    let deleter = Arc::new(RecordingDeleter::default());

    let err = cleaner(registry.clone(), deleter.clone()).run().await.unwrap_err();

    assert!(matches!(err, CleanupError::ListRepositories(_)));
    assert_eq!(err.failed_count(), None);
    assert_eq!(registry.list_images_calls.load(Ordering::SeqCst), 0);
    assert!(deleter.calls().is_empty());
}

#[tokio::test]
async fn test_no_repositories() {
    let registry = Arc::new(FakeRegistry::default());
    let deleter = Arc::new(RecordingDeleter::default());

    let summary = cleaner(registry, deleter).run().await.unwrap();

    assert_eq!(summary, Summary::default());
}

#[tokio::test]
async fn test_run_detailed_reports_each_repository() {
    let registry = Arc::new(FakeRegistry::with(vec![
        ("cleaned", Listing::Images(repo_images(0, 24))),
        ("skipped", Listing::Images(repo_images(100, 3))),
        ("errored", Listing::Fail),
    ]));
    let deleter = Arc::new(RecordingDeleter::default());

    let (summary, reports) = cleaner(registry, deleter).run_detailed().await.unwrap();

    assert_eq!(summary.total, 3);
    for report in &reports {
        match (report.repository.as_str(), &report.outcome) {
            ("cleaned", RepositoryOutcome::Cleaned { deleted }) => assert_eq!(*deleted, 4),
            ("skipped", RepositoryOutcome::Skipped) => {}
            ("errored", RepositoryOutcome::Errored(e)) => assert_eq!(e.code(), "TEST_INJECTED"),
            (name, outcome) => panic!("unexpected outcome for {name}: {outcome:?}"),
        }
    }
}

#[tokio::test]
async fn test_repositories_run_concurrently() {
    // Each list_images call blocks until all of them have started.
    let names: Vec<String> = (0..8).map(|i| format!("repo-{i}")).collect();
    let registry = Arc::new(FakeRegistry {
        barrier: Some(Barrier::new(names.len())),
        ..FakeRegistry::with(
            names
                .iter()
                .map(|name| (name.as_str(), Listing::Images(vec![])))
                .collect(),
        )
    });
    let deleter = Arc::new(RecordingDeleter::default());

    let summary = tokio::time::timeout(Duration::from_secs(5), cleaner(registry.clone(), deleter).run())
        .await
        .expect("repositories were not processed concurrently")
        .unwrap();

    assert_eq!(summary.skipped, 8);
    assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_concurrency_cap_bounds_in_flight() {
    let names: Vec<String> = (0..10).map(|i| format!("repo-{i}")).collect();
    let registry = Arc::new(FakeRegistry::with(
        names
            .iter()
            .map(|name| (name.as_str(), Listing::Images(repo_images(0, 21))))
            .collect(),
    ));
    let deleter = Arc::new(RecordingDeleter::default());

    let summary = cleaner(registry.clone(), deleter)
        .with_concurrency(NonZeroUsize::new(3).unwrap())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.cleaned, 10);
    assert!(registry.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_dry_run_reports_without_deleting() {
    let registry = Arc::new(FakeRegistry::with(vec![("a", Listing::Images(repo_images(0, 26)))]));

    let summary = Cleaner::new(registry, Arc::new(DryRunDeleter)).run().await.unwrap();

    assert_eq!(summary.cleaned, 1);
    assert_eq!(summary.deleted, 6);
}
