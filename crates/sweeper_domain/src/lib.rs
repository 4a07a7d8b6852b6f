//! Domain model for registry image retention.
//!
//! Images are parsed once at ingestion into structured tags, the
//! retention filter works on those, and the collaborator traits describe
//! what the cleanup run needs from a registry.

pub mod image;
pub mod registry;
pub mod retention;

pub use sweeper_common::Result;

pub use image::{Digest, Image, ImageTag, RepositoryName};
pub use registry::{ImageDeleter, ImageRegistry};
