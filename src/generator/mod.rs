//! Phase document generation.
//!
//! Pipeline: build prompt → invoke the provider (streamed) → sanitize →
//! design-phase resilience → validate → wrap into a [`Document`]. The
//! generator never persists anything; the engine owns that.

pub mod clarification;
pub mod prompts;
pub mod resilience;

pub use clarification::extract_clarification_questions;

use crate::domain::{Document, Workflow};
use crate::llm::{collect_text, LlmChunk, LlmProvider, LlmRequest};
use crate::phase::Phase;
use crate::sanitizer::sanitize;
use crate::validator::validate;
use anyhow::Result;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-request model options. Unset fields are left to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Appended to every prompt as an extra constraint.
    #[serde(default)]
    pub extra_instructions: Option<String>,
}

/// Everything the prompt needs to know about the owning workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    pub workflow_title: String,
    pub workflow_description: String,
    /// Upstream documents already produced, in phase order.
    pub upstream: Vec<(Phase, String)>,
    /// The baseline workflow's document for the same phase (incremental intent).
    pub baseline: Option<String>,
}

impl GenerationContext {
    pub fn for_phase(workflow: &Workflow, phase: Phase, baseline: Option<&Document>) -> Self {
        let upstream = phase
            .upstream()
            .iter()
            .filter_map(|p| workflow.document(*p).map(|doc| (*p, doc.content.clone())))
            .collect();
        Self {
            workflow_title: workflow.title.clone(),
            workflow_description: workflow.description.clone(),
            upstream,
            baseline: baseline.map(|doc| doc.content.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A document was produced. It may still carry validation errors.
    Success(Document),
    Failure(String),
}

#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Generator {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    fn request(&self, prompt: String) -> LlmRequest {
        LlmRequest {
            prompt,
            model: self.options.model.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }

    /// Generate `phase`'s document, reporting each streamed delta to `on_delta`.
    pub async fn generate(
        &self,
        phase: Phase,
        instruction: &str,
        context: &GenerationContext,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> GenerationOutcome {
        let prompt = prompts::build_phase_prompt(phase, instruction, context, &self.options);
        let request = self.request(prompt);

        tracing::debug!(
            phase = phase.key(),
            provider = self.provider.name(),
            prompt_chars = request.prompt.len(),
            "invoking provider"
        );

        let mut raw = String::new();
        let mut chunks = self.provider.generate_stream(&request);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(LlmChunk::Delta(delta)) => {
                    on_delta(&delta);
                    raw.push_str(&delta);
                }
                Ok(LlmChunk::Done) => break,
                Err(e) => {
                    tracing::warn!(phase = phase.key(), error = %format!("{:#}", e), "provider failed");
                    return GenerationOutcome::Failure(format!("{:#}", e));
                }
            }
        }

        Self::finalize(phase, &raw)
    }

    /// Turn raw model output into a validated document.
    pub fn finalize(phase: Phase, raw: &str) -> GenerationOutcome {
        let mut content = sanitize(raw);
        if content.is_empty() {
            return GenerationOutcome::Failure(
                "model returned no usable markdown content".to_string(),
            );
        }
        if phase == Phase::Design {
            content = resilience::ensure_design_sections(&content);
        }
        let validation = validate(phase, &content);
        if !validation.valid {
            tracing::info!(
                phase = phase.key(),
                errors = ?validation.errors,
                "generated document failed validation"
            );
        }
        GenerationOutcome::Success(Document::new(phase, content, Some(validation)))
    }

    /// Ask the provider for open questions about `phase` and extract them.
    pub async fn clarification_questions(
        &self,
        phase: Phase,
        instruction: &str,
        context: &GenerationContext,
        max_questions: usize,
    ) -> Result<Vec<String>> {
        let prompt =
            prompts::build_clarification_prompt(phase, instruction, context, max_questions);
        let request = self.request(prompt);
        let raw = collect_text(self.provider.generate_stream(&request)).await?;
        Ok(extract_clarification_questions(&raw, max_questions))
    }
}

#[cfg(test)]
#[path = "tests/generator_tests.rs"]
mod tests;
