//! Watcher configuration
//!
//! The watcher is driven by small YAML documents, one per monitored signal:
//! a digest-check config, a hash-check config, and an optional repository
//! list referenced by either. The repository list gates the build pipeline;
//! when the reference is absent the run ends after persisting the marker.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use digestwatch_core::repo::RepoSpec;

/// Configuration for the registry-digest strategy
#[derive(Debug, Clone, Deserialize)]
pub struct DigestCheckConfig {
    /// Where the last seen digest is persisted
    pub digest_file_path: PathBuf,

    /// Registry repository to watch (e.g. "library/tomcat")
    pub repository: String,

    /// Tag whose manifest list is inspected
    pub tag: String,

    /// Architecture the digest is taken for; the os is always linux
    pub target_architecture: String,

    /// Email envelope for change notifications
    pub sender: String,
    pub recipient: String,
    pub subject: String,

    /// Webhook URL called (GET) when a change is detected
    pub notification_key: String,

    /// Path to a repository-list document; absent disables the pipeline
    #[serde(default)]
    pub repositories_file: Option<PathBuf>,

    /// When true, per-repository build failures make the process exit
    /// non-zero after all repositories have been attempted
    #[serde(default)]
    pub fail_on_pipeline_error: bool,
}

/// Configuration for the URL-hash strategy
#[derive(Debug, Clone, Deserialize)]
pub struct HashCheckConfig {
    /// URL whose trimmed body is the marker
    pub hash_url: String,

    /// Where the last seen hash is persisted
    pub hash_file_path: PathBuf,

    /// Path to a repository-list document; absent disables the pipeline
    #[serde(default)]
    pub repositories_file: Option<PathBuf>,

    /// When true, per-repository build failures make the process exit
    /// non-zero after all repositories have been attempted
    #[serde(default)]
    pub fail_on_pipeline_error: bool,
}

/// The repository-list document
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryList {
    pub repositories: Vec<RepoSpec>,
}

impl DigestCheckConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.repository.is_empty() {
            anyhow::bail!("repository cannot be empty");
        }

        if self.tag.is_empty() {
            anyhow::bail!("tag cannot be empty");
        }

        if self.target_architecture.is_empty() {
            anyhow::bail!("target_architecture cannot be empty");
        }

        if !self.notification_key.starts_with("http://")
            && !self.notification_key.starts_with("https://")
        {
            anyhow::bail!("notification_key must be an http:// or https:// URL");
        }

        Ok(())
    }
}

impl HashCheckConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.hash_url.starts_with("http://") && !self.hash_url.starts_with("https://") {
            anyhow::bail!("hash_url must start with http:// or https://");
        }

        Ok(())
    }
}

/// Loads and validates a digest-check configuration
pub fn load_digest_config(path: &Path) -> Result<DigestCheckConfig> {
    let config: DigestCheckConfig = load_yaml(path)?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates a hash-check configuration
pub fn load_hash_config(path: &Path) -> Result<HashCheckConfig> {
    let config: HashCheckConfig = load_yaml(path)?;
    config.validate()?;
    Ok(config)
}

/// Loads the repository list referenced by a check configuration
pub fn load_repositories(path: &Path) -> Result<Vec<RepoSpec>> {
    let list: RepositoryList = load_yaml(path)?;
    Ok(list.repositories)
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;

    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse configuration file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digest_config() {
        let config: DigestCheckConfig = serde_yaml::from_str(
            r#"
            digest_file_path: /var/lib/digestwatch/tomcat.digest
            repository: library/tomcat
            tag: latest
            target_architecture: amd64
            sender: watcher@example.com
            recipient: ops@example.com
            subject: tomcat image updated
            notification_key: https://hooks.example.com/trigger/abc
            repositories_file: repos.yml
            "#,
        )
        .unwrap();

        assert_eq!(config.repository, "library/tomcat");
        assert_eq!(config.repositories_file, Some(PathBuf::from("repos.yml")));
        assert!(!config.fail_on_pipeline_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_digest_config_without_repository_list() {
        let config: DigestCheckConfig = serde_yaml::from_str(
            r#"
            digest_file_path: /tmp/d.txt
            repository: library/tomcat
            tag: latest
            target_architecture: arm64
            sender: a@example.com
            recipient: b@example.com
            subject: update
            notification_key: https://hooks.example.com/k
            "#,
        )
        .unwrap();

        assert_eq!(config.repositories_file, None);
    }

    #[test]
    fn test_digest_config_validation() {
        let mut config: DigestCheckConfig = serde_yaml::from_str(
            r#"
            digest_file_path: /tmp/d.txt
            repository: library/tomcat
            tag: latest
            target_architecture: amd64
            sender: a@example.com
            recipient: b@example.com
            subject: update
            notification_key: https://hooks.example.com/k
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());

        config.repository = String::new();
        assert!(config.validate().is_err());

        config.repository = "library/tomcat".to_string();
        config.notification_key = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_hash_config() {
        let config: HashCheckConfig = serde_yaml::from_str(
            r#"
            hash_url: https://snapshots.example.com/latest.sha256
            hash_file_path: /tmp/h.txt
            "#,
        )
        .unwrap();

        assert_eq!(config.hash_url, "https://snapshots.example.com/latest.sha256");
        assert_eq!(config.repositories_file, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hash_config_rejects_bad_url() {
        let config: HashCheckConfig = serde_yaml::from_str(
            r#"
            hash_url: ftp://snapshots.example.com/latest.sha256
            hash_file_path: /tmp/h.txt
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_repository_list() {
        let list: RepositoryList = serde_yaml::from_str(
            r#"
            repositories:
              - url: https://github.com/Acme/Widget.git
                branches: [main, dev]
              - url: https://github.com/acme/gadget.git
                branches: [main]
                image_name: acme/custom
                dockerfile_path: docker/Dockerfile.prod
            "#,
        )
        .unwrap();

        assert_eq!(list.repositories.len(), 2);
        assert_eq!(list.repositories[0].branches, vec!["main", "dev"]);
        assert_eq!(list.repositories[0].image_name, None);
        assert_eq!(
            list.repositories[1].dockerfile_path.as_deref(),
            Some("docker/Dockerfile.prod")
        );
    }
}
