use super::events::{EventSink, GenerationEvent};
use super::{ensure_editable, EngineResult, SpecEngine};
use crate::domain::{ChangeIntent, Document, Workflow, WorkflowId};
use crate::error::{InternalContext, SpecError};
use crate::generator::{GenerationContext, GenerationOutcome};
use crate::phase::Phase;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A generation running on its own task.
#[derive(Debug)]
pub struct GenerationHandle {
    workflow_id: WorkflowId,
    pub events: mpsc::UnboundedReceiver<GenerationEvent>,
    cancel: watch::Sender<bool>,
    join: JoinHandle<EngineResult<Document>>,
}

impl GenerationHandle {
    /// Request cancellation. The workflow is left as it was before the call.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the generation to finish, dropping any unread events.
    pub async fn wait(self) -> EngineResult<Document> {
        let workflow_id = self.workflow_id;
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(SpecError::internal(
                workflow_id,
                None,
                "generate_current_phase",
                anyhow::anyhow!("generation task failed: {}", e),
            )),
        }
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

/// Resolves once the switch flips to `true`; never if the sender goes away first.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl SpecEngine {
    /// Generate, validate and persist the current phase's document.
    ///
    /// Progress goes to `events` when given. Flipping `cancel` to `true`
    /// stops the model call; nothing is persisted once cancellation is
    /// observed. An existing document for the phase is replaced and its
    /// previous content remains in history. The phase does not advance.
    pub async fn generate_current_phase(
        &self,
        id: WorkflowId,
        user_input: &str,
        events: Option<mpsc::UnboundedSender<GenerationEvent>>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> EngineResult<Document> {
        let sink = EventSink::new(events);
        let _guard = self.inner.locks.acquire(id).await;
        let mut workflow = self.load_workflow(id).await?;
        ensure_editable(&workflow, "generate a document")?;
        let phase = workflow.current_phase;

        sink.send(GenerationEvent::Started {
            workflow_id: id,
            phase,
        });
        tracing::info!(workflow_id = %id, phase = phase.key(), "generation started");

        let context = self.generation_context(&workflow, phase);

        let mut on_delta = {
            let sink = sink.clone();
            move |delta: &str| {
                sink.send(GenerationEvent::Chunk {
                    text: delta.to_string(),
                })
            }
        };
        let generation = self
            .inner
            .generator
            .generate(phase, user_input, &context, &mut on_delta);

        let outcome = match cancel.clone() {
            Some(rx) => tokio::select! {
                outcome = generation => Some(outcome),
                _ = cancelled(rx) => None,
            },
            None => Some(generation.await),
        };

        let document = match outcome {
            None => return Err(self.cancelled_generation(&sink, id, phase)),
            Some(GenerationOutcome::Failure(reason)) => {
                sink.send(GenerationEvent::Failed {
                    phase,
                    reason: reason.clone(),
                });
                tracing::warn!(workflow_id = %id, phase = phase.key(), reason = %reason, "generation failed");
                return Err(SpecError::Generation { phase, reason });
            }
            Some(GenerationOutcome::Success(document)) => document,
        };

        sink.send(GenerationEvent::Validated {
            phase,
            valid: document.is_valid(),
            errors: document.validation_errors().to_vec(),
        });

        if is_cancelled(cancel.as_ref()) {
            return Err(self.cancelled_generation(&sink, id, phase));
        }

        let snapshot = self
            .inner
            .store
            .save_document(id, &document)
            .internal(id, Some(phase), "save_document")?;
        workflow.documents.insert(phase, document.clone());
        workflow.touch();
        self.inner
            .store
            .save_workflow(&workflow)
            .internal(id, Some(phase), "save_workflow")?;
        self.auto_prune(id, phase);

        sink.send(GenerationEvent::Saved {
            phase,
            document_id: document.id,
            snapshot_id: snapshot.id,
        });
        sink.send(GenerationEvent::Completed {
            workflow_id: id,
            phase,
            valid: document.is_valid(),
        });
        tracing::info!(
            workflow_id = %id,
            phase = phase.key(),
            valid = document.is_valid(),
            sequence = snapshot.sequence,
            "generation finished"
        );
        Ok(document)
    }

    /// Run [`Self::generate_current_phase`] on a spawned task.
    pub fn start_generation(&self, id: WorkflowId, user_input: impl Into<String>) -> GenerationHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let engine = self.clone();
        let user_input = user_input.into();

        let join = tokio::spawn(async move {
            engine
                .generate_current_phase(id, &user_input, Some(events_tx), Some(cancel_rx))
                .await
        });

        GenerationHandle {
            workflow_id: id,
            events: events_rx,
            cancel: cancel_tx,
            join,
        }
    }

    /// Ask the model which questions should be answered before generating
    /// the current phase. Nothing is persisted.
    pub async fn clarification_questions(
        &self,
        id: WorkflowId,
        user_input: &str,
        max_questions: Option<usize>,
    ) -> EngineResult<Vec<String>> {
        let workflow = self.load_workflow(id).await?;
        let phase = workflow.current_phase;
        let max = max_questions.unwrap_or(self.inner.settings.max_clarification_questions);
        if max == 0 {
            return Err(SpecError::InvalidInput(
                "max_questions must be at least 1".into(),
            ));
        }

        let context = self.generation_context(&workflow, phase);
        let questions = self
            .inner
            .generator
            .clarification_questions(phase, user_input, &context, max)
            .await
            .map_err(|e| SpecError::Generation {
                phase,
                reason: format!("{:#}", e),
            })?;

        tracing::debug!(workflow_id = %id, phase = phase.key(), count = questions.len(), "clarification questions");
        Ok(questions)
    }

    /// Upstream documents plus, for incremental workflows, the baseline's
    /// document for the same phase.
    fn generation_context(&self, workflow: &Workflow, phase: Phase) -> GenerationContext {
        let baseline = match (workflow.change_intent, workflow.baseline_workflow_id) {
            (Some(ChangeIntent::Incremental), Some(baseline_id)) => {
                match self.inner.store.load_workflow(baseline_id) {
                    Ok(Some(baseline)) => baseline.document(phase).cloned(),
                    Ok(None) => {
                        tracing::warn!(
                            workflow_id = %workflow.id,
                            baseline_id = %baseline_id,
                            "baseline workflow is no longer active; generating without it"
                        );
                        None
                    }
                    Err(e) => {
                        tracing::warn!(
                            workflow_id = %workflow.id,
                            baseline_id = %baseline_id,
                            error = %format!("{:#}", e),
                            "failed to load baseline workflow"
                        );
                        None
                    }
                }
            }
            _ => None,
        };
        GenerationContext::for_phase(workflow, phase, baseline.as_ref())
    }

    fn cancelled_generation(&self, sink: &EventSink, id: WorkflowId, phase: Phase) -> SpecError {
        sink.send(GenerationEvent::Cancelled { phase });
        tracing::info!(workflow_id = %id, phase = phase.key(), "generation cancelled");
        SpecError::Cancelled {
            workflow_id: id,
            phase,
        }
    }
}
