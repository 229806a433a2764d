//! Durable marker state
//!
//! One marker per monitored signal, stored as a plain-text UTF-8 file with
//! no trailing metadata. A missing file is the expected first-run
//! condition, not an error. Writes are synced to disk before returning so a
//! kill after the run cannot lose the marker.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Reads the stored marker, `None` if the file does not exist.
pub fn read_marker(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("failed to read state file {}", path.display()))
        }
    }
}

/// Overwrites the state file with the new marker and syncs it to disk.
///
/// A failure here is fatal to the run: continuing without durable state
/// would re-trigger the pipeline on the next invocation.
pub fn write_marker(path: &Path, marker: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create state file {}", path.display()))?;

    file.write_all(marker.as_bytes())
        .with_context(|| format!("failed to write state file {}", path.display()))?;

    file.sync_all()
        .with_context(|| format!("failed to sync state file {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marker.txt");

        write_marker(&path, "sha256:abc123").unwrap();
        assert_eq!(read_marker(&path).unwrap().as_deref(), Some("sha256:abc123"));
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");

        assert_eq!(read_marker(&path).unwrap(), None);
    }

    #[test]
    fn test_write_overwrites_previous_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marker.txt");

        write_marker(&path, "sha256:old-and-much-longer-than-the-next").unwrap();
        write_marker(&path, "sha256:new").unwrap();

        assert_eq!(read_marker(&path).unwrap().as_deref(), Some("sha256:new"));
    }

    #[test]
    fn test_read_trims_surrounding_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marker.txt");

        std::fs::write(&path, "abc123\n").unwrap();
        assert_eq!(read_marker(&path).unwrap().as_deref(), Some("abc123"));
    }
}
