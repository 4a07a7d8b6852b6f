//! Retention filter.
//!
//! Decides which images of a single repository may be deleted:
//!
//! - untagged images and images with any non-`version-` tag are pinned
//! - of the `version-` tagged images, the [`RETAINED_VERSIONS`] highest by
//!   semver precedence are kept
//! - everything else is deletable
//!
//! Membership is decided by digest, so one pinning tag protects a digest
//! even when the same digest also carries an old version tag.

use std::collections::HashSet;

use crate::image::{Digest, Image};

pub use crate::image::tag::VERSION_TAG_PREFIX;

/// How many of the newest version-tagged images survive a cleanup.
pub const RETAINED_VERSIONS: usize = 20;

/// Returns the images of one repository that are eligible for deletion.
///
/// Pure and deterministic in membership. Each digest appears at most once
/// in the result; the order of the result carries no meaning.
pub fn compute_deletable(images: &[Image]) -> Vec<Image> {
    let pinned: HashSet<&Digest> = images
        .iter()
        .filter(|image| image.tag.is_pinned())
        .map(|image| &image.digest)
        .collect();

    let mut versioned: Vec<&Image> = images
        .iter()
        .filter(|image| !image.tag.is_pinned())
        .collect();
    versioned.sort_by(|a, b| a.tag.version().cmp(&b.tag.version()));

    let keep_from = versioned.len().saturating_sub(RETAINED_VERSIONS);
    let retained: HashSet<&Digest> = versioned[keep_from..]
        .iter()
        .map(|image| &image.digest)
        .collect();

    let mut seen = HashSet::new();
    images
        .iter()
        .filter(|image| !pinned.contains(&image.digest) && !retained.contains(&image.digest))
        .filter(|image| seen.insert(&image.digest))
        .cloned()
        .collect()
}
