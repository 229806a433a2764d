//! Docker registry digest lookups
//!
//! Performs the anonymous-pull token handshake against the registry auth
//! endpoint, fetches the manifest list for a `{repository, tag}` pair, and
//! picks the digest of the entry matching the target platform out of the
//! returned manifest array.

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Accept header value requesting a manifest list rather than a single
/// image manifest
const MANIFEST_LIST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Client for reading per-platform image digests from a Docker registry
///
/// Holds the registry endpoint, the token-auth endpoint and the service
/// name used in the token request scope. `new()` points at Docker Hub.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Registry base URL (e.g. "https://registry-1.docker.io")
    registry_url: String,
    /// Token auth endpoint (e.g. "https://auth.docker.io/token")
    auth_url: String,
    /// Service name passed in the token request
    service: String,
    /// HTTP client instance
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ManifestList {
    #[serde(default)]
    manifests: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    digest: String,
    platform: Platform,
}

#[derive(Debug, Deserialize)]
struct Platform {
    architecture: String,
    os: String,
}

impl RegistryClient {
    /// Creates a client pointed at Docker Hub
    pub fn new() -> Self {
        Self::with_endpoints(
            "https://registry-1.docker.io",
            "https://auth.docker.io/token",
            "registry.docker.io",
        )
    }

    /// Creates a client for a custom registry / auth endpoint pair
    pub fn with_endpoints(
        registry_url: impl Into<String>,
        auth_url: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            auth_url: auth_url.into(),
            service: service.into(),
            client: Client::new(),
        }
    }

    /// Replaces the underlying HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Get the registry base URL
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Fetches the manifest-list digest for `{repository}:{tag}` on the
    /// given architecture. The os is always `linux`.
    ///
    /// Returns `Ok(None)` when the manifest list has no entry for the
    /// target platform. That is a "no signal" outcome, not an error;
    /// callers must not treat it as a change or persist it.
    pub async fn manifest_digest(
        &self,
        repository: &str,
        tag: &str,
        architecture: &str,
    ) -> Result<Option<String>> {
        let token = self.pull_token(repository).await?;

        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, repository, tag);
        debug!("fetching manifest list from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, MANIFEST_LIST_MEDIA_TYPE)
            .send()
            .await?;

        let manifest_list: ManifestList = self.read_json(response).await?;

        let digest = digest_for_platform(manifest_list, architecture);
        if digest.is_none() {
            debug!(
                "no manifest entry for architecture {} in {}:{}",
                architecture, repository, tag
            );
        }

        Ok(digest)
    }

    /// Exchanges the repository pull scope for an anonymous bearer token
    async fn pull_token(&self, repository: &str) -> Result<String> {
        let scope = format!("repository:{}:pull", repository);

        let response = self
            .client
            .get(&self.auth_url)
            .query(&[("service", self.service.as_str()), ("scope", scope.as_str())])
            .send()
            .await?;

        let token: TokenResponse = self.read_json(response).await?;
        Ok(token.token)
    }

    /// Checks the status code and deserializes the JSON body
    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("failed to parse JSON response: {}", e)))
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Filters the manifest array for the entry matching `{architecture, linux}`
fn digest_for_platform(list: ManifestList, architecture: &str) -> Option<String> {
    list.manifests
        .into_iter()
        .find(|entry| entry.platform.architecture == architecture && entry.platform.os == "linux")
        .map(|entry| entry.digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest_list() -> ManifestList {
        serde_json::from_str(
            r#"{
                "manifests": [
                    {
                        "digest": "sha256:amd64digest",
                        "platform": { "architecture": "amd64", "os": "linux" }
                    },
                    {
                        "digest": "sha256:arm64digest",
                        "platform": { "architecture": "arm64", "os": "linux" }
                    },
                    {
                        "digest": "sha256:windowsdigest",
                        "platform": { "architecture": "amd64", "os": "windows" }
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_digest_for_matching_platform() {
        let digest = digest_for_platform(sample_manifest_list(), "arm64");
        assert_eq!(digest.as_deref(), Some("sha256:arm64digest"));
    }

    #[test]
    fn test_non_linux_entries_are_skipped() {
        // The windows amd64 entry comes after the linux one and must never win
        let digest = digest_for_platform(sample_manifest_list(), "amd64");
        assert_eq!(digest.as_deref(), Some("sha256:amd64digest"));
    }

    #[test]
    fn test_missing_platform_is_none() {
        assert_eq!(digest_for_platform(sample_manifest_list(), "s390x"), None);
    }

    #[test]
    fn test_empty_manifest_array_is_none() {
        let list: ManifestList = serde_json::from_str("{}").unwrap();
        assert_eq!(digest_for_platform(list, "amd64"), None);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = RegistryClient::with_endpoints(
            "https://registry.example.com/",
            "https://auth.example.com/token",
            "registry.example.com",
        );
        assert_eq!(client.registry_url(), "https://registry.example.com");
    }
}
