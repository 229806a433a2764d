//! Plain-text hash endpoints
//!
//! The URL-hash strategy: a single GET whose trimmed body is the marker.

use reqwest::Client;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Fetches the published hash, returning the trimmed response body.
///
/// Fails on any non-success status; the caller aborts the run in that case
/// and leaves stored state untouched.
pub async fn fetch_marker(client: &Client, url: &str) -> Result<String> {
    debug!("fetching hash from {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    Ok(body.trim().to_string())
}
