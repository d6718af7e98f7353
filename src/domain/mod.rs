//! Domain model for specification workflows.
//!
//! - **Types** (`types.rs`): identifiers, `Document`, `Workflow`, validation results
//!
//! Phase ordering lives in [`crate::phase`]; persistence lives in [`crate::storage`].

pub mod types;

pub use types::{
    ChangeIntent, Document, DocumentId, DocumentMetadata, ValidationResult, Workflow, WorkflowId,
    WorkflowStatus, WorkflowSummary,
};
