use clap::Parser;
use std::num::NonZeroUsize;
use std::time::Duration;
use sweeper_infra_registry::Credentials;

/// Prunes old `version-` tagged images from every repository of a registry,
/// keeping the newest 20 versions and every other tag.
#[derive(Debug, Parser)]
#[command(name = "sweeper", version, about)]
pub struct Config {
    /// Base URL of the registry, e.g. https://registry.example.com
    #[arg(long, env = "SWEEPER_REGISTRY_URL")]
    pub registry_url: String,

    #[arg(long, env = "SWEEPER_USERNAME", requires = "password")]
    pub username: Option<String>,

    #[arg(long, env = "SWEEPER_PASSWORD", requires = "username", hide_env_values = true)]
    pub password: Option<String>,

    /// Maximum number of repositories processed at once (default: all)
    #[arg(long, env = "SWEEPER_CONCURRENCY")]
    pub concurrency: Option<NonZeroUsize>,

    /// Abort the whole run after this many seconds
    #[arg(long, env = "SWEEPER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log what would be deleted without deleting anything
    #[arg(long, env = "SWEEPER_DRY_RUN")]
    pub dry_run: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "SWEEPER_LOG", default_value = "info")]
    pub log: String,
}

impl Config {
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
