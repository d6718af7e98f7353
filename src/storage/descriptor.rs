//! The `workflow.json` descriptor.
//!
//! Workflow-level fields are prefixed `workflow_` and document-level fields
//! `document_`, so a workflow's title can never be read back as a document's
//! title (or the reverse). Document bodies live in the phase markdown files.
//! The stored validation result is informational: loading always re-validates
//! the body actually on disk.

use crate::domain::{
    ChangeIntent, Document, DocumentId, DocumentMetadata, ValidationResult, Workflow, WorkflowId,
    WorkflowStatus,
};
use crate::phase::Phase;
use crate::validator::validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub document_id: DocumentId,
    pub document_title: String,
    #[serde(default)]
    pub document_description: Option<String>,
    #[serde(default)]
    pub validation: Option<ValidationResult>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    pub workflow_id: WorkflowId,
    pub workflow_title: String,
    pub workflow_description: String,
    pub status: WorkflowStatus,
    pub current_phase: Phase,
    #[serde(default)]
    pub change_intent: Option<ChangeIntent>,
    #[serde(default)]
    pub baseline_workflow_id: Option<WorkflowId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub documents: BTreeMap<Phase, DocumentEntry>,
}

impl WorkflowDescriptor {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let documents = workflow
            .documents
            .iter()
            .map(|(phase, doc)| {
                (
                    *phase,
                    DocumentEntry {
                        document_id: doc.id,
                        document_title: doc.metadata.title.clone(),
                        document_description: doc.metadata.description.clone(),
                        validation: doc.validation.clone(),
                        created_at: doc.created_at,
                    },
                )
            })
            .collect();
        Self {
            workflow_id: workflow.id,
            workflow_title: workflow.title.clone(),
            workflow_description: workflow.description.clone(),
            status: workflow.status,
            current_phase: workflow.current_phase,
            change_intent: workflow.change_intent,
            baseline_workflow_id: workflow.baseline_workflow_id,
            created_at: workflow.created_at,
            updated_at: workflow.updated_at,
            documents,
        }
    }

    /// Rebuild the aggregate, reading each document body through `content_for`
    /// and validating it afresh.
    pub fn into_workflow<F>(self, mut content_for: F) -> anyhow::Result<Workflow>
    where
        F: FnMut(Phase) -> anyhow::Result<String>,
    {
        let mut documents = BTreeMap::new();
        for (phase, entry) in self.documents {
            let content = content_for(phase)?;
            let validation = Some(validate(phase, &content));
            documents.insert(
                phase,
                Document {
                    id: entry.document_id,
                    phase,
                    content,
                    metadata: DocumentMetadata {
                        title: entry.document_title,
                        description: entry.document_description,
                    },
                    validation,
                    created_at: entry.created_at,
                },
            );
        }
        Ok(Workflow {
            id: self.workflow_id,
            current_phase: self.current_phase,
            documents,
            status: self.status,
            title: self.workflow_title,
            description: self.workflow_description,
            change_intent: self.change_intent,
            baseline_workflow_id: self.baseline_workflow_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
