use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use sweeper_cleanup::{Cleaner, CleanupError, DryRunDeleter, Summary};
use sweeper_common::diagnostic::Diagnosable;
use sweeper_common::telemetry;
use sweeper_domain::ImageDeleter;
use sweeper_infra_registry::RegistryClient;
use tracing::{error, info};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    telemetry::init_tracing("sweeper", &config.log)?;

    let client = Arc::new(
        RegistryClient::new(&config.registry_url, config.credentials())
            .context("Failed to create registry client")?,
    );
    info!(registry = client.registry_url(), dry_run = config.dry_run, "Registry client ready");

    let deleter: Arc<dyn ImageDeleter> = if config.dry_run {
        Arc::new(DryRunDeleter)
    } else {
        client.clone()
    };

    let mut cleaner = Cleaner::new(client, deleter);
    if let Some(limit) = config.concurrency {
        cleaner = cleaner.with_concurrency(limit);
    }

    match run_bounded(&cleaner, config.timeout()).await {
        Ok(summary) => {
            info!("Cleanup successful");
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<CleanupError>() {
                Some(cause) => error!(code = %cause.code(), suggestion = ?cause.suggestion(), "Cleanup failed: {}", cause),
                None => error!("Cleanup failed: {}", e),
            }
            Err(e.context("Cleanup failed"))
        }
    }
}

/// Runs the cleaner, giving up once `timeout` elapses.
async fn run_bounded(cleaner: &Cleaner, timeout: Option<Duration>) -> anyhow::Result<Summary> {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, cleaner.run())
            .await
            .map_err(|_| anyhow::anyhow!("run exceeded {}s", limit.as_secs_f64()))?,
        None => cleaner.run().await,
    };
    Ok(result?)
}
