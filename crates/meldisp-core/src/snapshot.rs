//! Import snapshot digest and change detection.
//!
//! The only state that survives between imports is a single SHA-256
//! digest of the normalized row set, kept under the platform config dir.
//! It answers one question at the next import: anything new since last
//! time?

use crate::report::WorkOrderRow;
use log::debug;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaStatus {
    /// No prior snapshot recorded.
    New,
    Unchanged,
    Changed,
}

impl DeltaStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeltaStatus::New => "NEW",
            DeltaStatus::Unchanged => "0",
            DeltaStatus::Changed => "!",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            DeltaStatus::New => "First import",
            DeltaStatus::Unchanged => "No change since last import",
            DeltaStatus::Changed => "Row set changed since last import",
        }
    }
}

/// Deterministic digest of the row set: `tail|wo|ata|desc|due` per row,
/// sorted, newline-joined, SHA-256 hex. Row order in the CSV does not
/// affect the digest.
pub fn snapshot_digest(rows: &[WorkOrderRow]) -> String {
    let mut parts: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "{}|{}|{}|{}|{}",
                r.tail, r.wo, r.ata, r.description, r.due
            )
        })
        .collect();
    parts.sort();
    let blob = parts.join("\n");

    let mut hasher = Sha256::new();
    hasher.update(blob.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Persists the last import digest. All IO failures degrade silently:
/// change detection is a convenience, never a gate.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let path = directories::ProjectDirs::from("org", "mcc-tools", "meldisp")
            .map(|dirs| dirs.config_dir().join("last_snapshot"))
            .unwrap_or_else(|| PathBuf::from("last_snapshot"));
        Self { path }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Compares the digest against the stored one and records the new
    /// digest for the next import.
    pub fn compute_delta(&self, digest: &str) -> DeltaStatus {
        let previous = std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string());

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, digest) {
            debug!(
                "Snapshot store not writable — path={} error={}",
                self.path.display(),
                e
            );
        }

        match previous {
            None => DeltaStatus::New,
            Some(prev) if prev == digest => DeltaStatus::Unchanged,
            Some(_) => DeltaStatus::Changed,
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(tail: &str, wo: &str) -> WorkOrderRow {
        WorkOrderRow {
            tail: tail.into(),
            wo: wo.into(),
            ..WorkOrderRow::default()
        }
    }

    #[test]
    fn test_digest_order_independent() {
        let a = snapshot_digest(&[row("HA-LXA", "1"), row("HA-LXB", "2")]);
        let b = snapshot_digest(&[row("HA-LXB", "2"), row("HA-LXA", "1")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = snapshot_digest(&[row("HA-LXA", "1")]);
        let b = snapshot_digest(&[row("HA-LXA", "2")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_delta_lifecycle() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::at(dir.path().join("snap"));

        assert_eq!(store.compute_delta("abc"), DeltaStatus::New);
        assert_eq!(store.compute_delta("abc"), DeltaStatus::Unchanged);
        assert_eq!(store.compute_delta("def"), DeltaStatus::Changed);
        assert_eq!(store.compute_delta("def"), DeltaStatus::Unchanged);
    }
}
