use serde::Serialize;

use crate::orchestrator::JoinDecision;
use crate::tools::{StepResult, ToolId};

/// Progress notifications for a run, published on the [`crate::bus::Bus`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        run_id: String,
        query: String,
    },
    ToolsSelected {
        run_id: String,
        tools: Vec<ToolId>,
        /// True when the selector matched nothing and all enabled tools were offered.
        fallback: bool,
    },
    PlanParsed {
        run_id: String,
        attempt: usize,
        steps: usize,
        valid: bool,
    },
    StepFinished {
        run_id: String,
        step: StepResult,
    },
    Decision {
        run_id: String,
        attempt: usize,
        decision: JoinDecision,
    },
    Finished {
        run_id: String,
        success: bool,
        replans: usize,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::Started { run_id, .. }
            | RunEvent::ToolsSelected { run_id, .. }
            | RunEvent::PlanParsed { run_id, .. }
            | RunEvent::StepFinished { run_id, .. }
            | RunEvent::Decision { run_id, .. }
            | RunEvent::Finished { run_id, .. } => run_id,
        }
    }
}
