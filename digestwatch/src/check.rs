//! Check orchestration
//!
//! One linear pass per invocation: fetch the upstream marker, compare it to
//! the stored one, and on change persist the marker, notify, and run the
//! build pipeline. A failed fetch aborts the run with stored state
//! untouched; a quiet "no change" run does nothing further.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use digestwatch_client::{RegistryClient, hash};
use digestwatch_core::marker;

use crate::config::{self, DigestCheckConfig, HashCheckConfig};
use crate::pipeline::BuildPipeline;
use crate::{notify, state};

/// Runs the registry-digest strategy once.
pub async fn check_digest(config: &DigestCheckConfig) -> Result<()> {
    let registry = RegistryClient::new();
    let fetched = registry
        .manifest_digest(&config.repository, &config.tag, &config.target_architecture)
        .await
        .context("failed to fetch manifest digest")?;

    // "No matching platform" is a no-signal outcome, never a change and
    // never persisted.
    let Some(fetched) = fetched else {
        info!(
            "no manifest entry for architecture {} in {}:{}, nothing to do",
            config.target_architecture, config.repository, config.tag
        );
        return Ok(());
    };

    if !detect_and_store(&config.digest_file_path, &fetched)? {
        info!("digests are the same, no update needed");
        return Ok(());
    }

    let body = change_message("digest", &fetched);
    info!("{}", body);
    info!("updated digest in {}", config.digest_file_path.display());

    let http = reqwest::Client::new();
    notify::send_webhook(&http, &config.notification_key).await;
    notify::send_email(&config.recipient, &config.sender, &config.subject, &body);

    run_pipeline(
        config.repositories_file.as_deref(),
        config.fail_on_pipeline_error,
    )
}

/// Runs the URL-hash strategy once.
pub async fn check_hash(config: &HashCheckConfig) -> Result<()> {
    let http = reqwest::Client::new();
    let fetched = hash::fetch_marker(&http, &config.hash_url)
        .await
        .context("failed to fetch hash")?;

    if !detect_and_store(&config.hash_file_path, &fetched)? {
        info!("no new hash, no update needed");
        return Ok(());
    }

    info!("{}", change_message("hash", &fetched));

    run_pipeline(
        config.repositories_file.as_deref(),
        config.fail_on_pipeline_error,
    )
}

/// Reads stored state, decides whether `fetched` is new, and persists it
/// when it is. Returns whether a change was detected.
fn detect_and_store(path: &Path, fetched: &str) -> Result<bool> {
    let stored = state::read_marker(path)?;

    if !marker::changed(stored.as_deref(), Some(fetched)) {
        return Ok(false);
    }

    state::write_marker(path, fetched)?;
    Ok(true)
}

/// Invokes the build pipeline when a repository list is configured.
fn run_pipeline(repositories_file: Option<&Path>, fail_on_error: bool) -> Result<()> {
    let Some(path) = repositories_file else {
        info!("no repository list configured, skipping builds");
        return Ok(());
    };

    let repos = config::load_repositories(path)?;
    info!("building images for {} repository(ies)", repos.len());

    let pipeline = BuildPipeline::new();
    let summary = pipeline.run(&repos)?;

    if summary.has_failures() {
        let failed = summary.failed_repos();
        let total = summary.reports.len();

        if fail_on_error {
            anyhow::bail!("{} of {} repositories failed", failed, total);
        }
        warn!("{} of {} repositories failed, see log for causes", failed, total);
    }

    Ok(())
}

fn change_message(kind: &str, fetched: &str) -> String {
    format!(
        "New {} found: {} at {}",
        kind,
        fetched,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}
