//! Recovery for design documents that omit required sections.
//!
//! Models regularly produce a usable design that simply forgets one of the
//! mandatory headings. Instead of failing the whole generation, a minimal
//! placeholder section is appended for each heading that is absent.

use crate::phase::Phase;
use crate::validator::missing_topics;

/// Append a placeholder section for every design topic the content does not cover.
/// Returns the content unchanged when nothing is missing.
pub fn ensure_design_sections(content: &str) -> String {
    let missing = missing_topics(Phase::Design, content);
    if missing.is_empty() {
        return content.to_string();
    }

    tracing::warn!(
        missing = ?missing,
        "design output lacks required sections; adding placeholders"
    );

    let mut out = content.trim_end().to_string();
    for topic in missing {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&placeholder_section(topic));
    }
    out
}

fn placeholder_section(topic: &str) -> String {
    format!(
        "## {}\n\nTODO: the generated design did not cover {}. Fill this section in before proceeding.",
        topic,
        topic.to_lowercase()
    )
}
