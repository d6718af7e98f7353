//! Phase-by-phase comparison of two workflows.

use crate::domain::{Workflow, WorkflowId};
use crate::phase::Phase;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaStatus {
    Added,
    Modified,
    Removed,
    Unchanged,
}

impl fmt::Display for DeltaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeltaStatus::Added => "ADDED",
            DeltaStatus::Modified => "MODIFIED",
            DeltaStatus::Removed => "REMOVED",
            DeltaStatus::Unchanged => "UNCHANGED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseDelta {
    pub phase: Phase,
    pub status: DeltaStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecDelta {
    pub baseline_workflow_id: WorkflowId,
    pub target_workflow_id: WorkflowId,
    /// Ordered by phase.
    pub phases: Vec<PhaseDelta>,
}

impl SpecDelta {
    pub fn has_changes(&self) -> bool {
        self.phases
            .iter()
            .any(|d| d.status != DeltaStatus::Unchanged)
    }

    pub fn changed_phases(&self) -> Vec<Phase> {
        self.phases
            .iter()
            .filter(|d| d.status != DeltaStatus::Unchanged)
            .map(|d| d.phase)
            .collect()
    }
}

/// CRLF becomes LF and trailing newlines are ignored.
fn normalize(content: &str) -> String {
    content.replace("\r\n", "\n").trim_end_matches('\n').to_string()
}

/// Compare the documents of `baseline` and `target`. Pure; no I/O.
pub fn compare_workflows(baseline: &Workflow, target: &Workflow) -> SpecDelta {
    let phases = Phase::ALL
        .iter()
        .filter_map(|phase| {
            let status = match (baseline.document(*phase), target.document(*phase)) {
                (None, None) => return None,
                (None, Some(_)) => DeltaStatus::Added,
                (Some(_), None) => DeltaStatus::Removed,
                (Some(a), Some(b)) if normalize(&a.content) == normalize(&b.content) => {
                    DeltaStatus::Unchanged
                }
                (Some(_), Some(_)) => DeltaStatus::Modified,
            };
            Some(PhaseDelta {
                phase: *phase,
                status,
            })
        })
        .collect();

    SpecDelta {
        baseline_workflow_id: baseline.id,
        target_workflow_id: target.id,
        phases,
    }
}

#[cfg(test)]
#[path = "tests/delta_tests.rs"]
mod tests;
