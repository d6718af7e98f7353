//! XML-sectioned prompt construction for phase generation and clarification.
//!
//! Prompts are assembled with [`PromptBuilder`] so every request carries the
//! same section order: phase, instructions, context, documents, constraints,
//! output format.

use super::{GenerationContext, GenerationOptions};
use crate::phase::Phase;

/// Wraps content in an XML tag with the given name.
pub fn xml_tag(name: &str, content: &str) -> String {
    format!("<{}>{}</{}>", name, content, name)
}

/// Wraps multi-line content in a tag without escaping it.
pub fn xml_tag_raw(name: &str, content: &str) -> String {
    format!("<{}>\n{}\n</{}>", name, content.trim(), name)
}

/// Escapes XML special characters in short user-supplied values.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Default)]
pub struct PromptBuilder {
    phase: Option<String>,
    instructions: Option<String>,
    context: Vec<(String, String)>,
    documents: Vec<(String, String)>,
    constraints: Vec<String>,
    output_format: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.phase = Some(phase.to_string());
        self
    }

    pub fn instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    /// Adds a short escaped value (title, description, user request).
    pub fn context(mut self, label: &str, value: &str) -> Self {
        if !value.trim().is_empty() {
            self.context.push((label.to_string(), xml_escape(value.trim())));
        }
        self
    }

    /// Adds a full markdown document, embedded raw.
    pub fn document(mut self, label: &str, markdown: &str) -> Self {
        self.documents.push((label.to_string(), markdown.to_string()));
        self
    }

    pub fn constraint(mut self, constraint: &str) -> Self {
        self.constraints.push(constraint.to_string());
        self
    }

    pub fn output_format(mut self, format: &str) -> Self {
        self.output_format = Some(format.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut sections = Vec::new();

        if let Some(phase) = &self.phase {
            sections.push(xml_tag("phase", phase));
        }
        if let Some(instructions) = &self.instructions {
            sections.push(xml_tag_raw("instructions", instructions));
        }
        if !self.context.is_empty() {
            let body: Vec<String> = self
                .context
                .iter()
                .map(|(label, value)| xml_tag(label, value))
                .collect();
            sections.push(xml_tag_raw("context", &body.join("\n")));
        }
        for (label, markdown) in &self.documents {
            sections.push(xml_tag_raw(label, markdown));
        }
        if !self.constraints.is_empty() {
            let body = self
                .constraints
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(xml_tag_raw("constraints", &body));
        }
        if let Some(format) = &self.output_format {
            sections.push(xml_tag_raw("output-format", format));
        }

        format!("<user-prompt>\n{}\n</user-prompt>", sections.join("\n"))
    }
}

/// Required level-2 headings per phase, in the order the document should use.
pub fn required_headings(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Specify => &[
            "Functional Requirements",
            "Non-Functional Requirements",
            "User Scenarios",
        ],
        Phase::Design => &["Architecture", "Technology Choices", "Data Model"],
        Phase::Implement => &["Task List", "Implementation Steps", "Test Plan"],
    }
}

fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Specify => {
            "Write the requirements document for the feature described in the context. \
Capture what the system must do, the quality constraints it must meet, and the \
scenarios users will walk through. Do not design the solution yet."
        }
        Phase::Design => {
            "Write the technical design for the requirements document provided below. \
Describe the component architecture, justify the technology choices, and define \
the data model. Stay consistent with every stated requirement."
        }
        Phase::Implement => {
            "Write the implementation plan for the design provided below. Break the work \
into concrete tasks, order them into implementation steps, and describe how each \
part will be tested."
        }
    }
}

fn upstream_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Specify => "requirements-document",
        Phase::Design => "design-document",
        Phase::Implement => "implementation-plan",
    }
}

fn output_format(phase: Phase) -> String {
    let headings = required_headings(phase)
        .iter()
        .map(|h| format!("## {}", h))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "A single markdown document starting with a level-1 title, containing at least \
these sections:\n{}",
        headings
    )
}

/// Prompt for generating `phase`'s document.
pub fn build_phase_prompt(
    phase: Phase,
    instruction: &str,
    context: &GenerationContext,
    options: &GenerationOptions,
) -> String {
    let mut builder = PromptBuilder::new()
        .phase(phase.key())
        .instructions(phase_instructions(phase))
        .context("workflow-title", &context.workflow_title)
        .context("workflow-description", &context.workflow_description)
        .context("user-request", instruction);

    for (upstream, markdown) in &context.upstream {
        builder = builder.document(upstream_label(*upstream), markdown);
    }

    if let Some(baseline) = &context.baseline {
        builder = builder
            .document("baseline-document", baseline)
            .constraint(
                "This is an incremental change. Keep everything from the baseline document \
that still applies and clearly mark what is added, changed or removed",
            );
    }

    builder = builder
        .constraint("Respond with the markdown document only, without commentary before or after it")
        .constraint("Do not call tools and do not wrap the document in JSON")
        .constraint("Use the exact section headings listed in the output format");

    if let Some(extra) = options
        .extra_instructions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        builder = builder.constraint(extra.trim());
    }

    builder.output_format(&output_format(phase)).build()
}

/// Prompt asking for open questions before `phase` is generated.
pub fn build_clarification_prompt(
    phase: Phase,
    instruction: &str,
    context: &GenerationContext,
    max_questions: usize,
) -> String {
    let mut builder = PromptBuilder::new()
        .phase(phase.key())
        .instructions(&format!(
            "Before the {} document is written, list the questions whose answers would most \
change it. Ask about ambiguities and missing decisions only.",
            phase.display_name()
        ))
        .context("workflow-title", &context.workflow_title)
        .context("workflow-description", &context.workflow_description)
        .context("user-request", instruction);

    for (upstream, markdown) in &context.upstream {
        builder = builder.document(upstream_label(*upstream), markdown);
    }

    builder
        .constraint(&format!("Ask at most {} questions", max_questions))
        .output_format("## Clarification Questions\n1. <question>?\n2. <question>?")
        .build()
}

#[cfg(test)]
#[path = "tests/prompts_tests.rs"]
mod tests;
