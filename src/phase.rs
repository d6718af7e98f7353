//! The three workflow phases and their canonical artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered workflow phase. Declaration order is the natural phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Specify,
    Design,
    Implement,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Specify, Phase::Design, Phase::Implement];

    /// Human-readable phase name, also the default document title.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Specify => "Requirements",
            Phase::Design => "Design",
            Phase::Implement => "Implementation Plan",
        }
    }

    /// Stable lowercase key used in descriptors, history directories and CLI args.
    pub fn key(&self) -> &'static str {
        match self {
            Phase::Specify => "specify",
            Phase::Design => "design",
            Phase::Implement => "implement",
        }
    }

    /// Canonical markdown file name for the phase output.
    pub fn file_name(&self) -> &'static str {
        match self {
            Phase::Specify => "requirements.md",
            Phase::Design => "design.md",
            Phase::Implement => "tasks.md",
        }
    }

    /// The phase that follows this one, or `None` after the terminal phase.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Specify => Some(Phase::Design),
            Phase::Design => Some(Phase::Implement),
            Phase::Implement => None,
        }
    }

    /// Phases that must be produced before this one, in order.
    pub fn upstream(&self) -> &'static [Phase] {
        match self {
            Phase::Specify => &[],
            Phase::Design => &[Phase::Specify],
            Phase::Implement => &[Phase::Specify, Phase::Design],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "specify" | "requirements" | "spec" => Ok(Phase::Specify),
            "design" => Ok(Phase::Design),
            "implement" | "implementation" | "tasks" => Ok(Phase::Implement),
            other => Err(format!(
                "unknown phase '{}' (expected specify, design or implement)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_and_next() {
        assert!(Phase::Specify < Phase::Design);
        assert!(Phase::Design < Phase::Implement);
        assert_eq!(Phase::Specify.next(), Some(Phase::Design));
        assert_eq!(Phase::Design.next(), Some(Phase::Implement));
        assert_eq!(Phase::Implement.next(), None);
    }

    #[test]
    fn test_canonical_file_names() {
        assert_eq!(Phase::Specify.file_name(), "requirements.md");
        assert_eq!(Phase::Design.file_name(), "design.md");
        assert_eq!(Phase::Implement.file_name(), "tasks.md");
    }

    #[test]
    fn test_from_str_accepts_aliases() {
        assert_eq!("Specify".parse::<Phase>().unwrap(), Phase::Specify);
        assert_eq!("requirements".parse::<Phase>().unwrap(), Phase::Specify);
        assert_eq!("tasks".parse::<Phase>().unwrap(), Phase::Implement);
        assert!("review".parse::<Phase>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&Phase::Implement).unwrap();
        assert_eq!(json, "\"implement\"");
        let back: Phase = serde_json::from_str("\"design\"").unwrap();
        assert_eq!(back, Phase::Design);
    }

    #[test]
    fn test_upstream_phases() {
        assert!(Phase::Specify.upstream().is_empty());
        assert_eq!(Phase::Implement.upstream(), &[Phase::Specify, Phase::Design]);
    }
}
