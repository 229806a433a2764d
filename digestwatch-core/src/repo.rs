//! Repository specs

use serde::{Deserialize, Serialize};

/// One repository entry from the repository-list document.
///
/// Read-only for the duration of a pipeline run. Repositories are processed
/// in the order they appear, and branches within a repository likewise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSpec {
    /// Clone URL of the repository
    pub url: String,
    /// Branches to build; the branch name doubles as the image tag
    pub branches: Vec<String>,
    /// Replaces the derived `{namespace}/{name}` image name
    #[serde(default)]
    pub image_name: Option<String>,
    /// Dockerfile path relative to the clone root
    #[serde(default)]
    pub dockerfile_path: Option<String>,
}
