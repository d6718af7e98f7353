use crate::domain::{DocumentId, WorkflowId};
use crate::phase::Phase;
use crate::storage::SnapshotId;
use tokio::sync::mpsc;

/// Progress reported while a phase document is generated.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Started {
        workflow_id: WorkflowId,
        phase: Phase,
    },
    /// Raw model output as it streams in, before sanitizing.
    Chunk { text: String },
    Validated {
        phase: Phase,
        valid: bool,
        errors: Vec<String>,
    },
    Saved {
        phase: Phase,
        document_id: DocumentId,
        snapshot_id: SnapshotId,
    },
    Completed {
        workflow_id: WorkflowId,
        phase: Phase,
        valid: bool,
    },
    Failed { phase: Phase, reason: String },
    Cancelled { phase: Phase },
}

impl GenerationEvent {
    /// True for the last event a generation emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Completed { .. }
                | GenerationEvent::Failed { .. }
                | GenerationEvent::Cancelled { .. }
        )
    }
}

/// Optional event channel. Sends after the receiver is gone are dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<GenerationEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::UnboundedSender<GenerationEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, event: GenerationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
