use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::executor::PlanExecutionResult;
use crate::plan::ParseResult;
use crate::tools::ToolId;

use super::joinner::JoinDecision;

/// One end-user query submitted to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub query: String,
    /// Facts supplied by collaborating modules, rendered into the planner prompt.
    #[serde(default)]
    pub context: Vec<String>,
    /// "Now" as seen by the planner when resolving relative dates.
    #[serde(default)]
    pub reference_time: Option<NaiveDateTime>,
}

impl RunRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, fact: impl Into<String>) -> Self {
        self.context.push(fact.into());
        self
    }

    pub fn with_reference_time(mut self, reference_time: NaiveDateTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The joinner accepted an answer.
    Answered,
    /// The replan budget ran out.
    Exhausted,
}

/// One planning attempt within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAttempt {
    /// 1-based.
    pub attempt: usize,
    pub user_prompt: String,
    pub planner_output: String,
    pub parse: ParseResult,
    /// Absent when the plan was rejected before execution.
    pub execution: Option<PlanExecutionResult>,
    pub joinner_output: Option<String>,
    pub decision: Option<JoinDecision>,
}

/// Archived outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub query: String,
    pub selected_tools: Vec<ToolId>,
    /// True when the selector matched nothing and every enabled tool was offered.
    pub tools_fallback: bool,
    pub system_prompt: String,
    pub attempts: Vec<PlanAttempt>,
    pub answer: String,
    pub success: bool,
    pub finish_reason: FinishReason,
    pub replans: usize,
    pub duration_ms: u64,
    pub started_at: String,
}

impl RunRecord {
    pub fn last_attempt(&self) -> Option<&PlanAttempt> {
        self.attempts.last()
    }

    /// Most recent execution, skipping attempts whose plan was rejected.
    pub fn last_execution(&self) -> Option<&PlanExecutionResult> {
        self.attempts
            .iter()
            .rev()
            .find_map(|attempt| attempt.execution.as_ref())
    }
}
