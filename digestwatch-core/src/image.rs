//! Image references
//!
//! Derives the `{namespace}/{name}:{branch}` identifier a built image is
//! pushed under. The branch name doubles as the tag, so distinct branches
//! never collide in the registry namespace.

use std::fmt;

/// Splits a repository URL into its case-folded `(namespace, name)` pair.
///
/// The name is the last path segment minus a `.git` suffix; the namespace
/// is the second-to-last segment. Returns `None` when the URL has fewer
/// than two usable segments.
pub fn repo_slug(repo_url: &str) -> Option<(String, String)> {
    let mut segments = repo_url.trim_end_matches('/').rsplit('/');
    let name = segments.next()?.trim_end_matches(".git").to_lowercase();
    let namespace = segments.next()?.to_lowercase();

    if name.is_empty() || namespace.is_empty() {
        return None;
    }

    Some((namespace, name))
}

/// A fully derived image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// `{namespace}/{name}` portion, or the configured override verbatim
    pub name: String,
    /// Tag, always the branch being built
    pub tag: String,
}

impl ImageRef {
    /// Derives the reference for one branch of a repository.
    ///
    /// An `image_name` override replaces the derived `{namespace}/{name}`
    /// portion entirely; the branch always remains the tag.
    pub fn derive(repo_url: &str, branch: &str, image_name: Option<&str>) -> Option<Self> {
        let name = match image_name {
            Some(name) => name.to_string(),
            None => {
                let (namespace, name) = repo_slug(repo_url)?;
                format!("{namespace}/{name}")
            }
        };

        Some(Self {
            name,
            tag: branch.to_string(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
