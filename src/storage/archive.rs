//! Archiving of completed workflows and the pipe-delimited audit log.
//!
//! The audit trail is read from the active directory first, so a corrupt
//! history aborts the archive before anything moves. The directory then goes
//! to `archive/.staging-<id>`, then to its final `archive/<id>-<timestamp>`
//! location, and only then is the audit log appended. [`recover_interrupted`]
//! moves any staging directory left by a crash back to the active area, so a
//! workflow is either fully active or fully archived.

use super::descriptor::WorkflowDescriptor;
use super::history;
use super::paths::{history_dir_in, move_dir, StorePaths, DESCRIPTOR_FILE, STAGING_PREFIX};
use crate::domain::{Workflow, WorkflowId, WorkflowStatus};
use crate::phase::Phase;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EVENT_DOCUMENT_SAVED: &str = "DOCUMENT_SAVED";
pub const EVENT_WORKFLOW_ARCHIVED: &str = "WORKFLOW_ARCHIVED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub archive_path: PathBuf,
    pub audit_log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedWorkflow {
    pub workflow_id: WorkflowId,
    pub title: String,
    pub path: PathBuf,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub workflow_id: WorkflowId,
    pub event: &'static str,
    pub phase: Option<Phase>,
    pub detail: String,
}

impl AuditEntry {
    /// `<rfc3339>|<workflow-id>|<EVENT>|<phase-key or ->|<detail>`
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.timestamp.to_rfc3339(),
            self.workflow_id,
            self.event,
            self.phase.map(|p| p.key()).unwrap_or("-"),
            self.detail.replace(['|', '\n', '\r'], " ")
        )
    }
}

pub fn archive(paths: &StorePaths, workflow: &Workflow) -> Result<ArchiveRecord> {
    if workflow.status != WorkflowStatus::Completed {
        anyhow::bail!(
            "Workflow {} is {}; only completed workflows can be archived",
            workflow.id,
            workflow.status.label()
        );
    }
    let active = paths.workflow_dir(workflow.id);
    if !active.join(DESCRIPTOR_FILE).exists() {
        anyhow::bail!("Workflow {} has no active directory to archive", workflow.id);
    }
    let staging = paths.staging_dir(workflow.id);
    if staging.exists() {
        anyhow::bail!(
            "An archive of workflow {} is already in progress: {}",
            workflow.id,
            staging.display()
        );
    }
    fs::create_dir_all(paths.archive_dir()).with_context(|| {
        format!(
            "Failed to create archive directory: {}",
            paths.archive_dir().display()
        )
    })?;

    let archived_at = Utc::now();
    let stamp = archived_at.format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let target = paths.archived_workflow_dir(workflow.id, &stamp);

    let mut entries = saved_events(&active, workflow.id)?;
    entries.push(AuditEntry {
        timestamp: archived_at,
        workflow_id: workflow.id,
        event: EVENT_WORKFLOW_ARCHIVED,
        phase: None,
        detail: format!("archived to {}", target.display()),
    });

    move_dir(&active, &staging)?;
    if let Err(e) = move_dir(&staging, &target) {
        if let Err(restore_err) = move_dir(&staging, &active) {
            tracing::error!(
                workflow_id = %workflow.id,
                error = %restore_err,
                "failed to restore workflow after interrupted archive"
            );
        }
        return Err(e.context(format!("Failed to archive workflow {}", workflow.id)));
    }

    let audit_log_path = paths.audit_log_path();
    append_audit(&audit_log_path, &entries)?;

    tracing::info!(
        workflow_id = %workflow.id,
        archive = %target.display(),
        events = entries.len(),
        "workflow archived"
    );

    Ok(ArchiveRecord {
        archive_path: target,
        audit_log_path,
    })
}

/// One DOCUMENT_SAVED entry per history snapshot, oldest first.
fn saved_events(workflow_dir: &Path, id: WorkflowId) -> Result<Vec<AuditEntry>> {
    let mut snapshots = Vec::new();
    for phase in Phase::ALL {
        snapshots.extend(history::list(&history_dir_in(workflow_dir, phase))?);
    }
    snapshots.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.phase.cmp(&b.phase))
            .then(a.sequence.cmp(&b.sequence))
    });
    Ok(snapshots
        .into_iter()
        .map(|snap| AuditEntry {
            timestamp: snap.created_at,
            workflow_id: id,
            event: EVENT_DOCUMENT_SAVED,
            phase: Some(snap.phase),
            detail: format!(
                "snapshot={} sequence={} sha256={}",
                snap.id, snap.sequence, snap.digest
            ),
        })
        .collect())
}

fn append_audit(path: &Path, entries: &[AuditEntry]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock audit log: {}", path.display()))?;

    let mut buf = String::new();
    for entry in entries {
        buf.push_str(&entry.to_line());
        buf.push('\n');
    }
    file.write_all(buf.as_bytes())
        .with_context(|| format!("Failed to write audit log: {}", path.display()))?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

/// Move staging directories left by an interrupted archive back to the active
/// area. Returns the recovered workflow ids.
pub fn recover_interrupted(paths: &StorePaths) -> Result<Vec<WorkflowId>> {
    let archive_dir = paths.archive_dir();
    let read = match fs::read_dir(&archive_dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to read archive directory: {}", archive_dir.display())
            })
        }
    };

    let mut recovered = Vec::new();
    for entry in read {
        let entry = entry?;
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_prefix(STAGING_PREFIX))
            .and_then(|n| WorkflowId::from_string(n).ok())
        else {
            continue;
        };
        let active = paths.workflow_dir(id);
        if active.exists() {
            tracing::warn!(
                workflow_id = %id,
                staging = %entry.path().display(),
                "staging directory found but workflow is still active; leaving it in place"
            );
            continue;
        }
        fs::create_dir_all(paths.workflows_dir())?;
        move_dir(&entry.path(), &active)?;
        tracing::warn!(workflow_id = %id, "recovered workflow from interrupted archive");
        recovered.push(id);
    }
    Ok(recovered)
}

/// Archived workflow directories, ordered by directory name.
pub fn list_archived(paths: &StorePaths) -> Result<Vec<ArchivedWorkflow>> {
    let archive_dir = paths.archive_dir();
    let read = match fs::read_dir(&archive_dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to read archive directory: {}", archive_dir.display())
            })
        }
    };

    let mut archived = Vec::new();
    for entry in read {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_dir() {
            continue;
        }
        let descriptor_path = path.join(DESCRIPTOR_FILE);
        let descriptor: WorkflowDescriptor = match fs::read_to_string(&descriptor_path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(anyhow::Error::from))
        {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %descriptor_path.display(), error = %e, "skipping unreadable archive");
                continue;
            }
        };
        archived.push(ArchivedWorkflow {
            workflow_id: descriptor.workflow_id,
            title: descriptor.workflow_title,
            path,
        });
    }
    archived.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(archived)
}

#[cfg(test)]
#[path = "tests/archive_tests.rs"]
mod tests;
