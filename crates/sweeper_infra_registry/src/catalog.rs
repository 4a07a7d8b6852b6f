use serde::Deserialize;

/// Page size requested from paginated endpoints.
pub const PAGE_SIZE: usize = 100;

/// Media types accepted when resolving a tag to its manifest digest.
pub const MANIFEST_MEDIA_TYPES: &[&str] = &[
    "application/vnd.oci.image.index.v1+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.docker.distribution.manifest.v2+json",
];

pub const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Body of `GET /v2/_catalog`.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Body of `GET /v2/<name>/tags/list`.
#[derive(Debug, Deserialize)]
pub struct TagList {
    pub name: String,
    // Registries send `null` for repositories without tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Extracts the `rel="next"` target from an RFC 5988 `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
