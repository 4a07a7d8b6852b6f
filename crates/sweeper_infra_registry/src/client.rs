use crate::auth::{Authenticator, Authorization, Challenge, Credentials};
use crate::catalog::{self, Catalog, TagList, CONTENT_DIGEST_HEADER, MANIFEST_MEDIA_TYPES, PAGE_SIZE};
use crate::error::RegistryError;
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use sweeper_common::diagnostic::Error;
use sweeper_domain::{Digest, Image, ImageDeleter, ImageRegistry, RepositoryName};
use tracing::debug;

// Tag -> digest lookups in flight per repository.
const TAG_LOOKUP_CONCURRENCY: usize = 8;

/// Client for a registry speaking the OCI Distribution API.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    authenticator: Arc<Authenticator>,
    registry_url: String,
}

impl RegistryClient {
    pub fn new(registry_url: &str, credentials: Option<Credentials>) -> Result<Self, RegistryError> {
        let parsed = Url::parse(registry_url)
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", registry_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(registry_url.to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("sweeper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client: client.clone(),
            authenticator: Arc::new(Authenticator::new(client, credentials)),
            registry_url: registry_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Sends a request for `resource`, attaching whatever authorization
    /// the registry accepted for it before. A 401 is answered once.
    async fn send(&self, method: Method, url: &str, accept: &[&str], resource: &str) -> Result<Response, RegistryError> {
        let preauthorized = self.authenticator.preauthorize(resource).await?;
        let resp = self.dispatch(method.clone(), url, accept, preauthorized.as_ref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let header = resp
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::AuthenticationFailed(format!("{} answered 401 without a challenge", url)))?;
        let challenge = Challenge::parse(header)?;

        if preauthorized.is_some() {
            debug!(resource, "Stored authorization refused, answering challenge");
            self.authenticator.invalidate(resource, &challenge).await;
        }
        let authorization = self.authenticator.authorize(resource, &challenge).await?;

        let resp = self.dispatch(method, url, accept, Some(&authorization)).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.authenticator.invalidate(resource, &challenge).await;
            return Err(RegistryError::AuthenticationFailed(format!("credentials rejected for {}", url)));
        }
        Ok(resp)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        accept: &[&str],
        authorization: Option<&Authorization>,
    ) -> Result<Response, RegistryError> {
        let request = self.request(method, url, accept);
        let request = match authorization {
            Some(authorization) => authorization.apply(request),
            None => request,
        };
        Ok(request.send().await?)
    }

    fn request(&self, method: Method, url: &str, accept: &[&str]) -> RequestBuilder {
        let request = self.client.request(method, url);
        if accept.is_empty() {
            request
        } else {
            request.header(header::ACCEPT, accept.join(", "))
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.registry_url, path)
        } else {
            format!("{}/{}", self.registry_url, path)
        }
    }

    /// GETs every page of a paginated endpoint.
    async fn get_pages<T: DeserializeOwned>(&self, first: String, resource: &str) -> Result<Vec<T>, RegistryError> {
        let mut pages = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let resp = self.send(Method::GET, &url, &[], resource).await?;
            if !resp.status().is_success() {
                return Err(RegistryError::UnexpectedStatus { status: resp.status(), url });
            }

            next = resp
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(catalog::next_link)
                .map(|link| self.url(&link));

            pages.push(resp.json::<T>().await?);
        }

        Ok(pages)
    }

    pub async fn catalog(&self) -> Result<Vec<String>, RegistryError> {
        let first = self.url(&format!("/v2/_catalog?n={}", PAGE_SIZE));
        let pages: Vec<Catalog> = self.get_pages(first, "catalog").await?;
        Ok(pages.into_iter().flat_map(|page| page.repositories).collect())
    }

    pub async fn tags(&self, repo: &str) -> Result<Vec<String>, RegistryError> {
        let first = self.url(&format!("/v2/{}/tags/list?n={}", repo, PAGE_SIZE));
        let pages: Vec<TagList> = self.get_pages(first, &pull_resource(repo)).await?;
        Ok(pages.into_iter().flat_map(|page| page.tags.unwrap_or_default()).collect())
    }

    /// Resolves `tag` to its manifest digest. `None` if the tag vanished
    /// since it was listed.
    pub async fn resolve_digest(&self, repo: &str, tag: &str) -> Result<Option<Digest>, RegistryError> {
        let url = self.url(&format!("/v2/{}/manifests/{}", repo, tag));
        let resp = self.send(Method::HEAD, &url, MANIFEST_MEDIA_TYPES, &pull_resource(repo)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(repository = repo, tag, "Tag disappeared before its digest was resolved");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(RegistryError::UnexpectedStatus { status: resp.status(), url });
        }

        let value = resp
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::MissingDigest(format!("{}:{}", repo, tag)))?;

        Digest::new(value)
            .map(Some)
            .map_err(|e| RegistryError::InvalidDigest(e.to_string()))
    }

    /// Deletes one manifest. Returns `false` if it was already gone.
    pub async fn delete_manifest(&self, repo: &str, digest: &Digest) -> Result<bool, RegistryError> {
        let url = self.url(&format!("/v2/{}/manifests/{}", repo, digest));
        let resp = self.send(Method::DELETE, &url, &[], &format!("{}:delete", repo)).await?;

        match resp.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RegistryError::UnexpectedStatus { status, url }),
        }
    }
}

// Reads of one repository share a challenge scope; deletes get their own.
fn pull_resource(repo: &str) -> String {
    format!("{}:pull", repo)
}

#[async_trait]
impl ImageRegistry for RegistryClient {
    async fn list_repositories(&self) -> sweeper_common::Result<Vec<RepositoryName>> {
        let names = self.catalog().await.map_err(Error::new)?;
        names.into_iter().map(RepositoryName::new).collect()
    }

    async fn list_images(&self, repository: &RepositoryName) -> sweeper_common::Result<Vec<Image>> {
        let repo = repository.as_str();
        let tags = self.tags(repo).await.map_err(Error::new)?;

        let resolved: Vec<Option<(String, Digest)>> = stream::iter(tags)
            .map(|tag| async move {
                let digest = self.resolve_digest(repo, &tag).await?;
                Ok::<_, RegistryError>(digest.map(|d| (tag, d)))
            })
            .buffered(TAG_LOOKUP_CONCURRENCY)
            .try_collect()
            .await
            .map_err(Error::new)?;

        Ok(resolved
            .into_iter()
            .flatten()
            .map(|(tag, digest)| Image::new(digest, Some(&tag)))
            .collect())
    }
}

#[async_trait]
impl ImageDeleter for RegistryClient {
    async fn delete_images(&self, repository: &RepositoryName, digests: &[Digest]) -> sweeper_common::Result<usize> {
        let mut deleted = 0;
        for digest in digests {
            if self.delete_manifest(repository.as_str(), digest).await.map_err(Error::new)? {
                deleted += 1;
            } else {
                debug!(repository = %repository, digest = %digest, "Manifest already gone");
            }
        }
        Ok(deleted)
    }
}
