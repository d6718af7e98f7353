use super::{ensure_editable, EngineResult, SpecEngine};
use crate::domain::{Document, WorkflowId};
use crate::error::{InternalContext, SpecError};
use crate::phase::Phase;
use crate::storage::{HistorySnapshot, SnapshotId};
use crate::validator::validate;

impl SpecEngine {
    /// Replace a phase document with user-edited content. The content is
    /// re-validated and the previous version stays in history.
    pub async fn update_document(
        &self,
        id: WorkflowId,
        phase: Phase,
        content: &str,
    ) -> EngineResult<Document> {
        let _guard = self.inner.locks.acquire(id).await;
        self.replace_document(id, phase, content, "update_document")
            .await
    }

    /// Make a history snapshot's content current again, saved as a new version.
    pub async fn restore_document_snapshot(
        &self,
        id: WorkflowId,
        phase: Phase,
        snapshot_id: SnapshotId,
    ) -> EngineResult<Document> {
        let _guard = self.inner.locks.acquire(id).await;
        let snapshot = self.document_snapshot(id, phase, snapshot_id).await?;
        let document = self
            .replace_document(id, phase, &snapshot.content, "restore_document_snapshot")
            .await?;
        tracing::info!(
            workflow_id = %id,
            phase = phase.key(),
            snapshot = %snapshot_id,
            sequence = snapshot.sequence,
            "snapshot restored"
        );
        Ok(document)
    }

    /// Snapshots for one phase, newest first.
    pub async fn document_history(
        &self,
        id: WorkflowId,
        phase: Phase,
    ) -> EngineResult<Vec<HistorySnapshot>> {
        self.load_workflow(id).await?;
        self.inner
            .store
            .list_document_history(id, phase)
            .internal(id, Some(phase), "list_document_history")
    }

    pub async fn document_snapshot(
        &self,
        id: WorkflowId,
        phase: Phase,
        snapshot_id: SnapshotId,
    ) -> EngineResult<HistorySnapshot> {
        self.inner
            .store
            .load_document_snapshot(id, phase, snapshot_id)
            .internal(id, Some(phase), "load_document_snapshot")?
            .ok_or_else(|| {
                SpecError::not_found(format!("snapshot {} of {} ({})", snapshot_id, id, phase.key()))
            })
    }

    pub async fn delete_document_snapshot(
        &self,
        id: WorkflowId,
        phase: Phase,
        snapshot_id: SnapshotId,
    ) -> EngineResult<()> {
        let _guard = self.inner.locks.acquire(id).await;
        let workflow = self.load_workflow(id).await?;
        ensure_editable(&workflow, "delete history")?;

        let deleted = self
            .inner
            .store
            .delete_document_snapshot(id, phase, snapshot_id)
            .internal(id, Some(phase), "delete_document_snapshot")?;
        if !deleted {
            return Err(SpecError::not_found(format!(
                "snapshot {} of {} ({})",
                snapshot_id,
                id,
                phase.key()
            )));
        }
        tracing::info!(workflow_id = %id, phase = phase.key(), snapshot = %snapshot_id, "snapshot deleted");
        Ok(())
    }

    /// Keep only the newest `keep_latest` snapshots. Returns how many were removed.
    pub async fn prune_document_history(
        &self,
        id: WorkflowId,
        phase: Phase,
        keep_latest: usize,
    ) -> EngineResult<usize> {
        if keep_latest == 0 {
            return Err(SpecError::InvalidInput(
                "keep_latest must be at least 1".into(),
            ));
        }
        let _guard = self.inner.locks.acquire(id).await;
        let workflow = self.load_workflow(id).await?;
        ensure_editable(&workflow, "prune history")?;

        self.inner
            .store
            .prune_document_history(id, phase, keep_latest)
            .internal(id, Some(phase), "prune_document_history")
    }

    /// Shared by edit and restore. The caller holds the workflow lock.
    async fn replace_document(
        &self,
        id: WorkflowId,
        phase: Phase,
        content: &str,
        operation: &'static str,
    ) -> EngineResult<Document> {
        let mut workflow = self.load_workflow(id).await?;
        ensure_editable(&workflow, "edit a document")?;
        if phase > workflow.current_phase {
            return Err(SpecError::guard(format!(
                "Cannot edit {}: workflow is still at {}",
                phase.display_name(),
                workflow.current_phase.display_name()
            )));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(SpecError::InvalidInput(
                "document content must not be empty".into(),
            ));
        }

        let validation = validate(phase, content);
        let mut document = Document::new(phase, content.to_string(), Some(validation));
        if let Some(existing) = workflow.document(phase) {
            document.metadata = existing.metadata.clone();
        }

        self.inner
            .store
            .save_document(id, &document)
            .internal(id, Some(phase), operation)?;
        workflow.documents.insert(phase, document.clone());
        workflow.touch();
        self.inner
            .store
            .save_workflow(&workflow)
            .internal(id, Some(phase), operation)?;
        self.auto_prune(id, phase);

        tracing::info!(
            workflow_id = %id,
            phase = phase.key(),
            valid = document.is_valid(),
            operation,
            "document replaced"
        );
        Ok(document)
    }
}
