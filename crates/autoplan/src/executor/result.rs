use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::plan::{ParsedStep, StepId};
use crate::tools::StepResult;

use super::graph::ExecutionLevel;

/// Aggregate outcome of one plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanExecutionResult {
    /// Steps that were submitted, in step-id order.
    pub steps: Vec<ParsedStep>,
    /// One record per step that ran, in step-id order. Shorter than
    /// `steps` only when execution was cancelled.
    pub results: Vec<StepResult>,
    /// Output text of every step that succeeded.
    pub outputs: HashMap<StepId, String>,
    pub levels: Vec<ExecutionLevel>,
    pub duration_ms: u64,
    /// True iff every submitted step ran and succeeded.
    pub success: bool,
}

impl PlanExecutionResult {
    pub fn empty() -> Self {
        Self {
            steps: Vec::new(),
            results: Vec::new(),
            outputs: HashMap::new(),
            levels: Vec::new(),
            duration_ms: 0,
            success: true,
        }
    }

    pub fn result(&self, id: StepId) -> Option<&StepResult> {
        self.results.iter().find(|result| result.id == id)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|result| !result.success)
    }

    /// Output of the highest-numbered step that ran, if it produced any.
    pub fn last_output(&self) -> Option<&str> {
        self.results
            .last()
            .map(|result| result.output.as_str())
            .filter(|output| !output.trim().is_empty())
    }

    /// Render the execution trace the joinner reads: each call followed by
    /// its observation, in step-id order.
    pub fn observations(&self) -> String {
        let mut blocks = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let observation = match self.result(step.id) {
                Some(result) if result.success => result.output.clone(),
                Some(result) => format!(
                    "Error: {}",
                    result.error.as_deref().unwrap_or("unknown failure")
                ),
                None => "Error: step did not run".to_string(),
            };
            blocks.push(format!("{step}\nObservation: {observation}"));
        }
        blocks.join("\n")
    }
}
