//! Error types returned across the public engine boundary.
//!
//! Internal helpers use `anyhow::Result`; the engine maps them into
//! [`SpecError`] so callers can branch on the failure kind.

use crate::domain::WorkflowId;
use crate::phase::Phase;
use thiserror::Error;

/// Message prefix shared by every phase-advance guard failure.
pub const CANNOT_PROCEED: &str = "Cannot proceed to next phase";

#[derive(Debug, Error)]
pub enum SpecError {
    /// Caller-supplied input was rejected before any state changed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{what} not found")]
    NotFound { what: String },

    /// A phase transition or lifecycle precondition was not met.
    #[error("{message}")]
    TransitionGuard { message: String },

    /// The model call failed or produced unusable content. Nothing was persisted.
    #[error("generation failed for {phase}: {reason}")]
    Generation { phase: Phase, reason: String },

    /// Generation was cancelled. The workflow is unchanged.
    #[error("generation cancelled for workflow {workflow_id} ({phase})")]
    Cancelled { workflow_id: WorkflowId, phase: Phase },

    #[error("storage failure during {operation}: {message}")]
    Storage { operation: String, message: String },

    /// Unexpected failure (I/O, serialization) with full operation context.
    #[error("{operation} failed for workflow {workflow_id}{}: {source:#}", phase_suffix(.phase))]
    Internal {
        workflow_id: WorkflowId,
        phase: Option<Phase>,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

fn phase_suffix(phase: &Option<Phase>) -> String {
    phase.map(|p| format!(" ({})", p.key())).unwrap_or_default()
}

impl SpecError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn guard(message: impl Into<String>) -> Self {
        Self::TransitionGuard {
            message: message.into(),
        }
    }

    /// Guard failure for `proceed_to_next_phase`, always carrying [`CANNOT_PROCEED`].
    pub fn cannot_proceed(reason: impl std::fmt::Display) -> Self {
        Self::guard(format!("{}: {}", CANNOT_PROCEED, reason))
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn internal(
        workflow_id: WorkflowId,
        phase: Option<Phase>,
        operation: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self::Internal {
            workflow_id,
            phase,
            operation,
            source,
        }
    }

    /// True for failures a caller may fix and retry (as opposed to fatal ones).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

/// Attaches workflow context to internal `anyhow` failures.
pub trait InternalContext<T> {
    fn internal(
        self,
        workflow_id: WorkflowId,
        phase: Option<Phase>,
        operation: &'static str,
    ) -> Result<T, SpecError>;
}

impl<T> InternalContext<T> for anyhow::Result<T> {
    fn internal(
        self,
        workflow_id: WorkflowId,
        phase: Option<Phase>,
        operation: &'static str,
    ) -> Result<T, SpecError> {
        self.map_err(|source| SpecError::internal(workflow_id, phase, operation, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_cannot_proceed_message_contains_guard_text() {
        let err = SpecError::cannot_proceed("requirements document is missing");
        let message = err.to_string();
        assert!(message.contains("Cannot proceed to next phase"));
        assert!(message.contains("requirements document is missing"));
    }

    #[test]
    fn test_internal_error_carries_context() {
        let id = WorkflowId::new();
        let result: anyhow::Result<()> = Err(anyhow!("disk full"));
        let err = result
            .internal(id, Some(Phase::Design), "save_document")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("save_document"));
        assert!(message.contains(&id.to_string()));
        assert!(message.contains("(design)"));
        assert!(message.contains("disk full"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_guard_errors_are_recoverable() {
        assert!(SpecError::guard("nope").is_recoverable());
        assert!(SpecError::not_found("workflow x").is_recoverable());
    }
}
