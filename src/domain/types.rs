//! Strongly typed domain primitives for the specification workflow.
//!
//! These newtypes and enums are shared by the generator, storage, delta and
//! engine layers. `Workflow` is the aggregate root; `Document` is immutable
//! once produced.

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a workflow. Also the name of its storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    /// Creates a new random workflow ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a workflow ID from a string.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkflowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// Unique identifier for a generated document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a workflow. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    InProgress,
    Completed,
}

impl WorkflowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "in progress",
            WorkflowStatus::Completed => "completed",
        }
    }
}

/// Whether a workflow starts from scratch or extends a baseline workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeIntent {
    Fresh,
    Incremental,
}

impl FromStr for ChangeIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(ChangeIntent::Fresh),
            "incremental" => Ok(ChangeIntent::Incremental),
            other => Err(format!(
                "unknown change intent '{}' (expected fresh or incremental)",
                other
            )),
        }
    }
}

/// Outcome of structural validation. Recomputed on every content change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Builds a result from diagnostics; no errors means valid.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn passed() -> Self {
        Self::from_errors(Vec::new())
    }
}

/// Document-level metadata, distinct from the owning workflow's title/description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub description: Option<String>,
}

/// Markdown artifact for one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub phase: Phase,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub validation: Option<ValidationResult>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document with a fresh id; the title defaults to the phase display name.
    pub fn new(phase: Phase, content: String, validation: Option<ValidationResult>) -> Self {
        Self {
            id: DocumentId::new(),
            phase,
            content,
            metadata: DocumentMetadata {
                title: phase.display_name().to_string(),
                description: None,
            },
            validation,
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// True only when validation ran and passed.
    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.valid)
    }

    /// Validation errors, empty when the document is valid or unvalidated.
    pub fn validation_errors(&self) -> &[String] {
        self.validation
            .as_ref()
            .map(|v| v.errors.as_slice())
            .unwrap_or_default()
    }
}

/// Aggregate root tracking one specification effort.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: WorkflowId,
    pub current_phase: Phase,
    pub documents: BTreeMap<Phase, Document>,
    pub status: WorkflowStatus,
    pub title: String,
    pub description: String,
    pub change_intent: Option<ChangeIntent>,
    pub baseline_workflow_id: Option<WorkflowId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a workflow at the first phase with no documents.
    pub fn new(
        title: &str,
        description: &str,
        change_intent: Option<ChangeIntent>,
        baseline_workflow_id: Option<WorkflowId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            current_phase: Phase::Specify,
            documents: BTreeMap::new(),
            status: WorkflowStatus::InProgress,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            change_intent,
            baseline_workflow_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn document(&self, phase: Phase) -> Option<&Document> {
        self.documents.get(&phase)
    }

    pub fn current_document(&self) -> Option<&Document> {
        self.document(self.current_phase)
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    /// Sets the updated_at timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            current_phase: self.current_phase,
            change_intent: self.change_intent,
            updated_at: self.updated_at,
        }
    }
}

/// Listing view of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub title: String,
    pub status: WorkflowStatus,
    pub current_phase: Phase,
    pub change_intent: Option<ChangeIntent>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
