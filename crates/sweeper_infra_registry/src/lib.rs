//! OCI Distribution API adapter for the cleanup job.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod error;

pub use auth::Credentials;
pub use client::RegistryClient;
pub use error::RegistryError;
