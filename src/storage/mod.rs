//! Crash-safe JSON snapshots of the registries.
//!
//! Writes go to a temporary file beside the target which is then atomically
//! renamed over it, so a crash mid-save leaves the previous snapshot intact.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize `value` and atomically replace the file at `path` with it.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create state directory {}", parent.display()))?;

    let json = serde_json::to_string_pretty(value).context("failed to serialize state")?;

    // Temp file must live on the same filesystem as the target for the
    // final rename to be atomic.
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(json.as_bytes())
        .context("failed to write state snapshot")?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Load a previously saved snapshot. A missing file is `Ok(None)`; an
/// unreadable or unparsable file is an error for the caller to log.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AlertRegistry, AlertState, AlertUpdate, Severity};
    use tempfile::TempDir;

    fn sample_registry() -> AlertRegistry {
        let mut registry = AlertRegistry::new();
        registry.upsert(
            "rule@x",
            "UPS-9",
            AlertUpdate {
                state: AlertState::from("ACTIVE".to_string()),
                severity: Severity::Critical,
                description: String::new(),
                source_time: 1_000,
                wants_email: false,
                wants_sms: true,
            },
            100,
        );
        registry
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.json");

        let registry = sample_registry();
        save_json(&path, &registry.snapshot()).unwrap();

        let records = load_json(&path).unwrap().unwrap();
        let restored = AlertRegistry::from_records(records);
        assert_eq!(restored.snapshot(), registry.snapshot());

        // zero counters, empty description and the wants flags all survive
        let record = restored.get("rule@x", "UPS-9").unwrap();
        assert_eq!(record.last_email_notification, 0);
        assert_eq!(record.last_sms_notification, 0);
        assert_eq!(record.description, "");
        assert!(record.wants_sms && !record.wants_email);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.json");

        save_json(&path, &vec!["old"]).unwrap();
        save_json(&path, &vec!["new"]).unwrap();

        let contents: Vec<String> = load_json(&path).unwrap().unwrap();
        assert_eq!(contents, vec!["new"]);
        // no stray temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Vec<String>> = load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded: Result<Option<Vec<String>>> = load_json(&path);
        assert!(loaded.is_err());
    }
}
