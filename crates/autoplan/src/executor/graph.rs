use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::plan::{ParsedStep, StepId};

/// A group of steps whose dependencies are all satisfied by earlier levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLevel {
    /// 1-based for display.
    pub index: usize,
    pub step_ids: Vec<StepId>,
    /// Set when the steps could not be ordered (cycle or reference to a
    /// step that never runs) and were grouped together as a last resort.
    pub fallback: bool,
}

impl ExecutionLevel {
    pub fn len(&self) -> usize {
        self.step_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_ids.is_empty()
    }
}

/// Group steps into ordered levels.
///
/// Each level holds every remaining step whose dependencies completed in an
/// earlier level, in input order. When no remaining step is ready, the rest
/// are emitted as one final level flagged as `fallback`.
pub fn execution_levels(steps: &[ParsedStep]) -> Vec<ExecutionLevel> {
    let mut levels = Vec::new();
    let mut completed: BTreeSet<StepId> = BTreeSet::new();
    let mut remaining: Vec<&ParsedStep> = steps.iter().collect();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&ParsedStep>, Vec<&ParsedStep>) = remaining
            .into_iter()
            .partition(|step| step.dependencies.iter().all(|dep| completed.contains(dep)));

        if ready.is_empty() {
            let step_ids: Vec<StepId> = blocked.iter().map(|step| step.id).collect();
            tracing::warn!(
                "unresolvable dependencies among steps {:?}; running them as one level",
                step_ids
            );
            levels.push(ExecutionLevel {
                index: levels.len() + 1,
                step_ids,
                fallback: true,
            });
            break;
        }

        completed.extend(ready.iter().map(|step| step.id));
        levels.push(ExecutionLevel {
            index: levels.len() + 1,
            step_ids: ready.iter().map(|step| step.id).collect(),
            fallback: false,
        });
        remaining = blocked;
    }

    levels
}
