//! Append-only per-phase document history.
//!
//! Each save appends one immutable JSON snapshot named
//! `<sequence>-<snapshot-id>.json`. Sequence numbers are monotonically
//! increasing per phase directory; listing is newest first.

use crate::phase::Phase;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One immutable saved version of a phase document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub id: SnapshotId,
    pub sequence: u64,
    pub phase: Phase,
    pub content: String,
    /// Lowercase hex SHA-256 of `content`.
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

impl HistorySnapshot {
    fn file_name(&self) -> String {
        snapshot_file_name(self.sequence, self.id)
    }
}

pub fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

fn snapshot_file_name(sequence: u64, id: SnapshotId) -> String {
    format!("{:06}-{}.json", sequence, id)
}

/// Sequence number and id encoded in a snapshot file name.
fn parse_file_name(name: &str) -> Option<(u64, SnapshotId)> {
    let stem = name.strip_suffix(".json")?;
    let (seq, id) = stem.split_once('-')?;
    Some((seq.parse().ok()?, id.parse().ok()?))
}

/// Snapshot files in `dir` as (sequence, id, path), unordered. A missing
/// directory has no history.
fn entries(dir: &Path) -> Result<Vec<(u64, SnapshotId, PathBuf)>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read history directory: {}", dir.display()))
        }
    };
    let mut out = Vec::new();
    for entry in read {
        let entry = entry?;
        let name = entry.file_name();
        if let Some((seq, id)) = name.to_str().and_then(parse_file_name) {
            out.push((seq, id, entry.path()));
        }
    }
    Ok(out)
}

fn read_snapshot(path: &Path) -> Result<HistorySnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: HistorySnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    if content_digest(&snapshot.content) != snapshot.digest {
        anyhow::bail!("Snapshot digest mismatch: {}", path.display());
    }
    Ok(snapshot)
}

/// Append a new snapshot of `content` and return it.
pub fn append(dir: &Path, phase: Phase, content: &str) -> Result<HistorySnapshot> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;
    let sequence = entries(dir)?
        .iter()
        .map(|(seq, _, _)| *seq)
        .max()
        .unwrap_or(0)
        + 1;
    let snapshot = HistorySnapshot {
        id: SnapshotId::new(),
        sequence,
        phase,
        content: content.to_string(),
        digest: content_digest(content),
        created_at: Utc::now(),
    };
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
    super::paths::atomic_write(&dir.join(snapshot.file_name()), json.as_bytes())?;
    Ok(snapshot)
}

/// All snapshots, newest first.
pub fn list(dir: &Path) -> Result<Vec<HistorySnapshot>> {
    let mut found = entries(dir)?;
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.iter().map(|(_, _, path)| read_snapshot(path)).collect()
}

pub fn load(dir: &Path, id: SnapshotId) -> Result<Option<HistorySnapshot>> {
    match entries(dir)?.into_iter().find(|(_, sid, _)| *sid == id) {
        Some((_, _, path)) => read_snapshot(&path).map(Some),
        None => Ok(None),
    }
}

/// Delete one snapshot. Returns whether it existed.
pub fn delete(dir: &Path, id: SnapshotId) -> Result<bool> {
    match entries(dir)?.into_iter().find(|(_, sid, _)| *sid == id) {
        Some((_, _, path)) => {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete snapshot: {}", path.display()))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Delete all but the newest `keep_latest` snapshots. Returns the number removed.
pub fn prune(dir: &Path, keep_latest: usize) -> Result<usize> {
    let mut found = entries(dir)?;
    found.sort_by(|a, b| b.0.cmp(&a.0));
    let mut removed = 0;
    for (_, _, path) in found.iter().skip(keep_latest) {
        fs::remove_file(path)
            .with_context(|| format!("Failed to prune snapshot: {}", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
