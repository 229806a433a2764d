//! Change notifications
//!
//! Fired once per detected change, before the build pipeline runs. Both
//! channels are fire-and-forget: a failed notification is logged at warn
//! and the run continues.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, warn};

const SENDMAIL: &str = "/usr/sbin/sendmail";

/// Calls the configured webhook URL.
pub async fn send_webhook(client: &Client, url: &str) {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            info!("webhook notification delivered");
        }
        Ok(response) => {
            warn!("webhook returned status {}", response.status());
        }
        Err(e) => {
            warn!("webhook notification failed: {}", e);
        }
    }
}

/// Hands a minimal RFC-822-style message to the local sendmail binary.
pub fn send_email(recipient: &str, sender: &str, subject: &str, body: &str) {
    let message = format_message(recipient, sender, subject, body);

    if let Err(e) = pipe_to_sendmail(recipient, &message) {
        warn!("email notification failed: {:#}", e);
    } else {
        info!("email notification sent to {}", recipient);
    }
}

/// From/To/Subject headers, blank line, body
fn format_message(recipient: &str, sender: &str, subject: &str, body: &str) -> String {
    format!("From: {sender}\nTo: {recipient}\nSubject: {subject}\n\n{body}")
}

fn pipe_to_sendmail(recipient: &str, message: &str) -> Result<()> {
    let mut child = Command::new(SENDMAIL)
        .arg(recipient)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {}", SENDMAIL))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(message.as_bytes())
            .context("failed to write message to sendmail stdin")?;
    }

    let status = child.wait().context("failed to wait for sendmail")?;
    if !status.success() {
        anyhow::bail!("sendmail exited with {}", status);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_format() {
        let message = format_message(
            "ops@example.com",
            "watcher@example.com",
            "image updated",
            "New digest found: sha256:abc",
        );

        assert_eq!(
            message,
            "From: watcher@example.com\nTo: ops@example.com\nSubject: image updated\n\nNew digest found: sha256:abc"
        );
    }

    #[test]
    fn test_headers_are_separated_from_body_by_blank_line() {
        let message = format_message("a@x", "b@x", "s", "body");
        assert!(message.contains("\n\nbody"));
    }
}
