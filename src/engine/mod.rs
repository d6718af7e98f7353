//! Workflow lifecycle: SPECIFY → DESIGN → IMPLEMENT → COMPLETED.
//!
//! [`SpecEngine`] is the public entry point. It owns phase transitions,
//! persists generated documents through [`WorkflowStore`], and serializes
//! every mutating operation per workflow id.
//!
//! - `generation.rs`: streaming, cancellable phase generation
//! - `documents.rs`: user edits, history and rollback
//! - `events.rs`: progress events sent during generation
//! - `locks.rs`: per-workflow async mutexes

mod documents;
pub mod events;
mod generation;
mod locks;

pub use events::GenerationEvent;
pub use generation::GenerationHandle;

use crate::config::SpecflowConfig;
use crate::delta::{self, SpecDelta};
use crate::domain::{ChangeIntent, Workflow, WorkflowId, WorkflowStatus, WorkflowSummary};
use crate::error::{InternalContext, SpecError};
use crate::generator::{GenerationOptions, Generator};
use crate::llm::LlmProvider;
use crate::phase::Phase;
use crate::storage::{ArchiveRecord, ArchivedWorkflow, WorkflowStore};
use locks::WorkflowLocks;
use std::sync::Arc;

pub type EngineResult<T> = Result<T, SpecError>;

/// Engine behavior that comes from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub generation: GenerationOptions,
    /// Prune each phase's history to this many snapshots after every save.
    pub history_keep_latest: Option<usize>,
    pub max_clarification_questions: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&SpecflowConfig::default())
    }
}

impl From<&SpecflowConfig> for EngineSettings {
    fn from(config: &SpecflowConfig) -> Self {
        Self {
            generation: config.generation.options(),
            history_keep_latest: config.history.keep_latest,
            max_clarification_questions: config.generation.max_clarification_questions,
        }
    }
}

struct EngineInner {
    store: WorkflowStore,
    generator: Generator,
    settings: EngineSettings,
    locks: WorkflowLocks,
}

/// Cheap to clone; clones share the store, provider and locks.
#[derive(Clone)]
pub struct SpecEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SpecEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecEngine")
            .field("root", &self.inner.store.root())
            .field("generator", &self.inner.generator)
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl SpecEngine {
    pub fn new(store: WorkflowStore, provider: Arc<dyn LlmProvider>, settings: EngineSettings) -> Self {
        let generator = Generator::new(provider, settings.generation.clone());
        Self {
            inner: Arc::new(EngineInner {
                store,
                generator,
                settings,
                locks: WorkflowLocks::default(),
            }),
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.inner.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub async fn create_workflow(
        &self,
        title: &str,
        description: &str,
        change_intent: Option<ChangeIntent>,
        baseline_workflow_id: Option<WorkflowId>,
    ) -> EngineResult<Workflow> {
        if title.trim().is_empty() {
            return Err(SpecError::InvalidInput("workflow title must not be empty".into()));
        }
        if description.trim().is_empty() {
            return Err(SpecError::InvalidInput(
                "workflow description must not be empty".into(),
            ));
        }
        match (change_intent, baseline_workflow_id) {
            (Some(ChangeIntent::Incremental), None) => {
                return Err(SpecError::InvalidInput(
                    "an incremental workflow requires a baseline workflow id".into(),
                ));
            }
            (Some(ChangeIntent::Incremental), Some(baseline)) => {
                if !self.inner.store.exists(baseline) {
                    return Err(SpecError::InvalidInput(format!(
                        "baseline workflow {} does not exist",
                        baseline
                    )));
                }
            }
            (_, Some(_)) => {
                return Err(SpecError::InvalidInput(
                    "a baseline workflow only applies to incremental changes".into(),
                ));
            }
            (_, None) => {}
        }

        let workflow = Workflow::new(title, description, change_intent, baseline_workflow_id);
        self.inner
            .store
            .save_workflow(&workflow)
            .internal(workflow.id, None, "create_workflow")?;

        tracing::info!(
            workflow_id = %workflow.id,
            title = %workflow.title,
            intent = ?workflow.change_intent,
            "workflow created"
        );
        Ok(workflow)
    }

    pub async fn list_workflows(&self) -> EngineResult<Vec<WorkflowSummary>> {
        self.inner
            .store
            .list_workflows()
            .map_err(|e| SpecError::storage("list_workflows", format!("{:#}", e)))
    }

    pub async fn load_workflow(&self, id: WorkflowId) -> EngineResult<Workflow> {
        self.inner
            .store
            .load_workflow(id)
            .internal(id, None, "load_workflow")?
            .ok_or_else(|| SpecError::not_found(format!("workflow {}", id)))
    }

    /// Advance to the next phase once the current document exists and is valid.
    pub async fn proceed_to_next_phase(&self, id: WorkflowId) -> EngineResult<Workflow> {
        let _guard = self.inner.locks.acquire(id).await;
        let mut workflow = self.load_workflow(id).await?;
        let phase = workflow.current_phase;

        if workflow.is_completed() {
            return Err(SpecError::cannot_proceed("workflow is already completed"));
        }
        ensure_current_document_valid(&workflow).map_err(SpecError::cannot_proceed)?;
        let Some(next) = phase.next() else {
            return Err(SpecError::cannot_proceed(format!(
                "{} is the final phase; complete the workflow instead",
                phase.display_name()
            )));
        };

        workflow.current_phase = next;
        workflow.touch();
        self.inner
            .store
            .save_workflow(&workflow)
            .internal(id, Some(next), "proceed_to_next_phase")?;

        tracing::info!(workflow_id = %id, from = phase.key(), to = next.key(), "phase advanced");
        Ok(workflow)
    }

    /// Mark the workflow completed. Requires a valid Implementation Plan.
    pub async fn complete_workflow(&self, id: WorkflowId) -> EngineResult<Workflow> {
        let _guard = self.inner.locks.acquire(id).await;
        let mut workflow = self.load_workflow(id).await?;

        if workflow.is_completed() {
            return Err(SpecError::guard("Workflow is already completed"));
        }
        if workflow.current_phase != Phase::Implement {
            return Err(SpecError::guard(format!(
                "Cannot complete workflow: current phase is {}, expected {}",
                workflow.current_phase.display_name(),
                Phase::Implement.display_name()
            )));
        }
        ensure_current_document_valid(&workflow)
            .map_err(|reason| SpecError::guard(format!("Cannot complete workflow: {}", reason)))?;

        workflow.status = WorkflowStatus::Completed;
        workflow.touch();
        self.inner
            .store
            .save_workflow(&workflow)
            .internal(id, Some(Phase::Implement), "complete_workflow")?;

        tracing::info!(workflow_id = %id, "workflow completed");
        Ok(workflow)
    }

    /// Move a completed workflow into the archive.
    pub async fn archive_workflow(&self, id: WorkflowId) -> EngineResult<ArchiveRecord> {
        let guard = self.inner.locks.acquire(id).await;
        let workflow = self.load_workflow(id).await?;
        if workflow.status != WorkflowStatus::Completed {
            return Err(SpecError::storage(
                "archive_workflow",
                format!(
                    "only completed workflows can be archived (workflow {} is {})",
                    id,
                    workflow.status.label()
                ),
            ));
        }

        let record = self
            .inner
            .store
            .archive_workflow(&workflow)
            .map_err(|e| SpecError::storage("archive_workflow", format!("{:#}", e)))?;
        drop(guard);
        self.inner.locks.forget(id).await;

        tracing::info!(
            workflow_id = %id,
            archive = %record.archive_path.display(),
            "workflow archived"
        );
        Ok(record)
    }

    pub async fn list_archived(&self) -> EngineResult<Vec<ArchivedWorkflow>> {
        self.inner
            .store
            .list_archived()
            .map_err(|e| SpecError::storage("list_archived", format!("{:#}", e)))
    }

    /// Remove an active workflow and its history.
    pub async fn delete_workflow(&self, id: WorkflowId) -> EngineResult<()> {
        let guard = self.inner.locks.acquire(id).await;
        let existed = self
            .inner
            .store
            .delete_workflow(id)
            .internal(id, None, "delete_workflow")?;
        drop(guard);
        self.inner.locks.forget(id).await;

        if !existed {
            return Err(SpecError::not_found(format!("workflow {}", id)));
        }
        tracing::info!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    pub async fn compare_workflows(
        &self,
        baseline_id: WorkflowId,
        target_id: WorkflowId,
    ) -> EngineResult<SpecDelta> {
        let baseline = self.load_workflow(baseline_id).await?;
        let target = self.load_workflow(target_id).await?;
        Ok(compare_logged(&baseline, &target))
    }

    /// Compare a workflow against the baseline it was created from.
    pub async fn compare_with_baseline(&self, id: WorkflowId) -> EngineResult<SpecDelta> {
        let target = self.load_workflow(id).await?;
        let Some(baseline_id) = target.baseline_workflow_id else {
            return Err(SpecError::InvalidInput(format!(
                "workflow {} has no baseline workflow",
                id
            )));
        };
        let baseline = self.load_workflow(baseline_id).await?;
        Ok(compare_logged(&baseline, &target))
    }

    /// Apply the configured history limit for one phase.
    fn auto_prune(&self, id: WorkflowId, phase: Phase) {
        let Some(keep) = self.inner.settings.history_keep_latest else {
            return;
        };
        if let Err(e) = self.inner.store.prune_document_history(id, phase, keep) {
            tracing::warn!(
                workflow_id = %id,
                phase = phase.key(),
                error = %format!("{:#}", e),
                "automatic history prune failed"
            );
        }
    }
}

fn compare_logged(baseline: &Workflow, target: &Workflow) -> SpecDelta {
    let delta = delta::compare_workflows(baseline, target);
    tracing::debug!(
        baseline = %baseline.id,
        target = %target.id,
        changed = ?delta.changed_phases(),
        "workflows compared"
    );
    delta
}

/// Why the current phase's document does not allow moving on, if it doesn't.
fn ensure_current_document_valid(workflow: &Workflow) -> Result<(), String> {
    let phase = workflow.current_phase;
    match workflow.current_document() {
        None => Err(format!(
            "{} document has not been generated",
            phase.display_name()
        )),
        Some(doc) if doc.validation.is_none() => Err(format!(
            "{} document has not been validated",
            phase.display_name()
        )),
        Some(doc) if !doc.is_valid() => Err(format!(
            "{} document is invalid: {}",
            phase.display_name(),
            doc.validation_errors().join("; ")
        )),
        Some(_) => Ok(()),
    }
}

/// Completed workflows only accept archiving.
fn ensure_editable(workflow: &Workflow, action: &str) -> EngineResult<()> {
    if workflow.is_completed() {
        return Err(SpecError::guard(format!(
            "Cannot {}: workflow {} is completed and read-only",
            action, workflow.id
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
