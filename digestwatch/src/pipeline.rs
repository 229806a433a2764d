//! Build pipeline
//!
//! Drives clone / checkout / build / push across a list of repositories.
//! Failures are contained at the repository boundary: one bad repository
//! lands in the run summary with its cause and the loop moves on to the
//! next. Each repository's working clone lives under a run-unique root and
//! is removed on every exit path, success or failure.
//!
//! Everything runs one repository at a time; builds and pushes are
//! disk-bound and share the local Docker daemon, so serializing avoids
//! contention without any locking.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use digestwatch_core::image::{self, ImageRef};
use digestwatch_core::repo::RepoSpec;

/// External tools the pipeline drives
///
/// Every method is a blocking call backed by a subprocess in production.
pub trait Toolchain {
    /// Clones `url` into `target`, creating the directory
    fn clone_repo(&self, url: &str, target: &Path) -> Result<()>;

    /// Checks out `branch` in the clone at `target`
    fn checkout(&self, target: &Path, branch: &str) -> Result<()>;

    /// Builds `image` from the clone at `target`, optionally from a
    /// Dockerfile at `dockerfile` relative to the clone root
    fn build_image(&self, image: &str, target: &Path, dockerfile: Option<&Path>) -> Result<()>;

    /// Pushes `image` to the registry
    fn push_image(&self, image: &str) -> Result<()>;

    /// Removes unreferenced local image data to reclaim disk space
    fn prune(&self) -> Result<()>;
}

/// Toolchain backed by the git and docker binaries
pub struct StandardToolchain;

impl StandardToolchain {
    /// Runs a command, logging captured output and failing with the stderr
    /// tail when the exit status is non-zero
    fn run(mut command: Command) -> Result<()> {
        let rendered = format!("{:?}", command);
        debug!("running {}", rendered);

        let output = command
            .output()
            .with_context(|| format!("failed to execute {}", rendered))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            debug!("stdout: {}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            anyhow::bail!("{} exited with {}: {}", rendered, output.status, stderr.trim());
        }

        Ok(())
    }
}

impl Toolchain for StandardToolchain {
    fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg(url).arg(target);
        Self::run(cmd)
    }

    fn checkout(&self, target: &Path, branch: &str) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(target).arg("checkout").arg(branch);
        Self::run(cmd)
    }

    fn build_image(&self, image: &str, target: &Path, dockerfile: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new("docker");
        cmd.arg("build").arg("-t").arg(image);
        if let Some(dockerfile) = dockerfile {
            cmd.arg("-f").arg(target.join(dockerfile));
        }
        cmd.arg(target);
        Self::run(cmd)
    }

    fn push_image(&self, image: &str) -> Result<()> {
        let mut cmd = Command::new("docker");
        cmd.arg("push").arg(image);
        Self::run(cmd)
    }

    fn prune(&self) -> Result<()> {
        let mut cmd = Command::new("docker");
        cmd.arg("system").arg("prune").arg("-af");
        Self::run(cmd)
    }
}

/// Why one repository failed
///
/// Every variant ends processing of that repository only; the run continues
/// with the next one. Already-pushed images of earlier branches are not
/// rolled back.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("repository URL {0} has no derivable image name")]
    InvalidUrl(String),

    #[error("clone failed: {0:#}")]
    Clone(#[source] anyhow::Error),

    #[error("checkout of {branch} failed: {source:#}")]
    Checkout {
        branch: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build of {image} failed: {source:#}")]
    Build {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("push of {image} failed: {source:#}")]
    Push {
        image: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of one repository
#[derive(Debug)]
pub struct RepoReport {
    pub url: String,
    /// Image references pushed before the repository finished or failed
    pub pushed: Vec<String>,
    pub error: Option<PipelineError>,
}

/// Outcome of a whole pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<RepoReport>,
}

impl RunSummary {
    pub fn failed_repos(&self) -> usize {
        self.reports.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_repos() > 0
    }
}

/// One pipeline run over a repository list
///
/// The working root is unique to this instance, so overlapping runs (which
/// the scheduler is expected to prevent anyway) cannot collide on clone
/// paths.
pub struct BuildPipeline<T: Toolchain> {
    toolchain: T,
    work_root: PathBuf,
}

impl BuildPipeline<StandardToolchain> {
    /// Creates a pipeline using the git and docker binaries, rooted under
    /// the system temp directory
    pub fn new() -> Self {
        Self::with_toolchain(StandardToolchain, std::env::temp_dir())
    }
}

impl<T: Toolchain> BuildPipeline<T> {
    /// Creates a pipeline with an explicit toolchain and a parent directory
    /// for the run's working root
    pub fn with_toolchain(toolchain: T, parent: impl Into<PathBuf>) -> Self {
        let work_root = parent.into().join(format!("digestwatch-{}", Uuid::new_v4()));
        Self { toolchain, work_root }
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Processes every repository in the given order.
    ///
    /// Fails only when the global docker prune or working-root creation
    /// fails, before any repository work has been risked. Per-repository
    /// failures land in the summary, never in the return value.
    pub fn run(&self, repos: &[RepoSpec]) -> Result<RunSummary> {
        info!("pruning unreferenced image data");
        self.toolchain.prune().context("docker prune failed")?;

        std::fs::create_dir_all(&self.work_root).with_context(|| {
            format!("failed to create working root {}", self.work_root.display())
        })?;

        let mut summary = RunSummary::default();

        for repo in repos {
            info!("cloning {}", repo.url);

            let mut pushed = Vec::new();
            let error = match self.process_repository(repo, &mut pushed) {
                Ok(()) => {
                    info!("repository {} done, {} image(s) pushed", repo.url, pushed.len());
                    None
                }
                Err(e) => {
                    error!("repository {} failed: {}", repo.url, e);
                    Some(e)
                }
            };

            summary.reports.push(RepoReport {
                url: repo.url.clone(),
                pushed,
                error,
            });
        }

        // Clone directories are removed per repository; the root itself is
        // empty by now.
        if let Err(e) = std::fs::remove_dir_all(&self.work_root) {
            warn!(
                "failed to remove working root {}: {}",
                self.work_root.display(),
                e
            );
        }

        Ok(summary)
    }

    /// Clone, then checkout / build / push each branch in order.
    ///
    /// The first failing branch ends this repository; the clone directory
    /// is removed by the guard on every path out of here.
    fn process_repository(
        &self,
        repo: &RepoSpec,
        pushed: &mut Vec<String>,
    ) -> std::result::Result<(), PipelineError> {
        let (_, name) = image::repo_slug(&repo.url)
            .ok_or_else(|| PipelineError::InvalidUrl(repo.url.clone()))?;

        let clone = CloneDir::new(self.work_root.join(name));

        self.toolchain
            .clone_repo(&repo.url, clone.path())
            .map_err(PipelineError::Clone)?;

        for branch in &repo.branches {
            info!("processing {} branch {}", repo.url, branch);

            self.toolchain
                .checkout(clone.path(), branch)
                .map_err(|e| PipelineError::Checkout {
                    branch: branch.clone(),
                    source: e,
                })?;

            let image = ImageRef::derive(&repo.url, branch, repo.image_name.as_deref())
                .ok_or_else(|| PipelineError::InvalidUrl(repo.url.clone()))?
                .to_string();

            let dockerfile = repo.dockerfile_path.as_deref().map(Path::new);
            self.toolchain
                .build_image(&image, clone.path(), dockerfile)
                .map_err(|e| PipelineError::Build {
                    image: image.clone(),
                    source: e,
                })?;

            self.toolchain
                .push_image(&image)
                .map_err(|e| PipelineError::Push {
                    image: image.clone(),
                    source: e,
                })?;

            pushed.push(image);
        }

        Ok(())
    }
}

/// Working clone directory, removed on drop
///
/// Removal failures are logged, never silently dropped, and never block the
/// next repository.
struct CloneDir {
    path: PathBuf,
}

impl CloneDir {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CloneDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }

        debug!("removing working clone {}", self.path.display());
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("failed to remove working clone {}: {}", self.path.display(), e);
        }
    }
}
