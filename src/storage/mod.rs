//! Filesystem persistence for workflows, documents, history and archives.
//!
//! [`WorkflowStore`] is the only component that touches the store root. All
//! writes of single files go through temp-file-plus-rename; a document save
//! appends its history snapshot first and removes it again if the phase file
//! cannot be written.

pub mod archive;
pub mod descriptor;
pub mod history;
pub mod paths;

pub use archive::{ArchiveRecord, ArchivedWorkflow};
pub use history::{HistorySnapshot, SnapshotId};
pub use paths::StorePaths;

use crate::domain::{Document, Workflow, WorkflowId, WorkflowSummary};
use crate::phase::Phase;
use anyhow::{Context, Result};
use descriptor::WorkflowDescriptor;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkflowStore {
    paths: StorePaths,
}

impl WorkflowStore {
    /// Open (creating if needed) the store at `root` and recover any archive
    /// interrupted by a crash.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = StorePaths::new(root);
        paths.ensure_layout()?;
        let recovered = archive::recover_interrupted(&paths)?;
        if !recovered.is_empty() {
            tracing::warn!(count = recovered.len(), "recovered interrupted archives");
        }
        tracing::debug!(root = %paths.root().display(), "workflow store opened");
        Ok(Self { paths })
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn exists(&self, id: WorkflowId) -> bool {
        self.paths.descriptor_path(id).is_file()
    }

    /// Write the descriptor. Document bodies are written by [`Self::save_document`].
    pub fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        let dir = self.paths.workflow_dir(workflow.id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create workflow directory: {}", dir.display()))?;
        let descriptor = WorkflowDescriptor::from_workflow(workflow);
        let json = serde_json::to_string_pretty(&descriptor)
            .context("Failed to serialize workflow descriptor")?;
        paths::atomic_write(&self.paths.descriptor_path(workflow.id), json.as_bytes())
    }

    /// Load a workflow, or `None` if no active workflow has this id.
    pub fn load_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>> {
        let Some(descriptor) = self.read_descriptor(id)? else {
            return Ok(None);
        };
        let workflow = descriptor.into_workflow(|phase| {
            let path = self.paths.phase_file(id, phase);
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read phase document: {}", path.display()))
        })?;
        Ok(Some(workflow))
    }

    fn read_descriptor(&self, id: WorkflowId) -> Result<Option<WorkflowDescriptor>> {
        let path = self.paths.descriptor_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read descriptor: {}", path.display()))
            }
        };
        let descriptor = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse descriptor: {}", path.display()))?;
        Ok(Some(descriptor))
    }

    /// Summaries of every active workflow, most recently updated first.
    /// Unreadable entries are skipped with a warning.
    pub fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let dir = self.paths.workflows_dir();
        let read = match fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read workflows directory: {}", dir.display()))
            }
        };

        let mut summaries = Vec::new();
        for entry in read {
            let entry = entry?;
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| WorkflowId::from_string(name).ok())
            else {
                continue;
            };
            match self.load_workflow(id) {
                Ok(Some(workflow)) => summaries.push(workflow.summary()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(workflow_id = %id, error = %format!("{:#}", e), "skipping unreadable workflow");
                }
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Remove an active workflow and all its history. Returns whether it existed.
    pub fn delete_workflow(&self, id: WorkflowId) -> Result<bool> {
        let dir = self.paths.workflow_dir(id);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to delete workflow directory: {}", dir.display()))?;
        Ok(true)
    }

    /// Append a history snapshot, then overwrite the phase file. If the phase
    /// file write fails the snapshot is removed again.
    pub fn save_document(&self, workflow_id: WorkflowId, doc: &Document) -> Result<HistorySnapshot> {
        if !self.exists(workflow_id) {
            anyhow::bail!("Workflow {} does not exist", workflow_id);
        }
        let history_dir = self.paths.history_dir(workflow_id, doc.phase);
        let snapshot = history::append(&history_dir, doc.phase, &doc.content)?;

        let phase_file = self.paths.phase_file(workflow_id, doc.phase);
        if let Err(e) = paths::atomic_write(&phase_file, doc.content.as_bytes()) {
            if let Err(rollback) = history::delete(&history_dir, snapshot.id) {
                tracing::error!(
                    workflow_id = %workflow_id,
                    phase = doc.phase.key(),
                    error = %rollback,
                    "failed to roll back history snapshot"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            workflow_id = %workflow_id,
            phase = doc.phase.key(),
            sequence = snapshot.sequence,
            "document saved"
        );
        Ok(snapshot)
    }

    /// Current content of a phase document, or `None` if never saved.
    pub fn load_document(&self, workflow_id: WorkflowId, phase: Phase) -> Result<Option<String>> {
        let path = self.paths.phase_file(workflow_id, phase);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read phase document: {}", path.display()))
            }
        }
    }

    pub fn list_document_history(
        &self,
        workflow_id: WorkflowId,
        phase: Phase,
    ) -> Result<Vec<HistorySnapshot>> {
        history::list(&self.paths.history_dir(workflow_id, phase))
    }

    pub fn load_document_snapshot(
        &self,
        workflow_id: WorkflowId,
        phase: Phase,
        snapshot_id: SnapshotId,
    ) -> Result<Option<HistorySnapshot>> {
        history::load(&self.paths.history_dir(workflow_id, phase), snapshot_id)
    }

    pub fn delete_document_snapshot(
        &self,
        workflow_id: WorkflowId,
        phase: Phase,
        snapshot_id: SnapshotId,
    ) -> Result<bool> {
        history::delete(&self.paths.history_dir(workflow_id, phase), snapshot_id)
    }

    pub fn prune_document_history(
        &self,
        workflow_id: WorkflowId,
        phase: Phase,
        keep_latest: usize,
    ) -> Result<usize> {
        let removed = history::prune(&self.paths.history_dir(workflow_id, phase), keep_latest)?;
        if removed > 0 {
            tracing::debug!(workflow_id = %workflow_id, phase = phase.key(), removed, "history pruned");
        }
        Ok(removed)
    }

    /// Move a completed workflow into the archive and write its audit trail.
    pub fn archive_workflow(&self, workflow: &Workflow) -> Result<ArchiveRecord> {
        archive::archive(&self.paths, workflow)
    }

    pub fn list_archived(&self) -> Result<Vec<ArchivedWorkflow>> {
        archive::list_archived(&self.paths)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
