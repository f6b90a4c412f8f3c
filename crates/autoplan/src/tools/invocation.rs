//! Per-step execution records.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::plan::StepId;
use crate::utils::time::duration_ms;

/// Outcome of executing one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub id: StepId,
    pub tool_name: String,
    pub success: bool,
    /// Tool output; empty on failure.
    pub output: String,
    /// Failure description, present iff `success` is false.
    pub error: Option<String>,
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn succeeded(
        id: StepId,
        tool_name: impl Into<String>,
        output: String,
        started_at: SystemTime,
        ended_at: SystemTime,
    ) -> Self {
        Self {
            id,
            tool_name: tool_name.into(),
            success: true,
            output,
            error: None,
            started_at,
            ended_at,
            duration_ms: elapsed_ms(started_at, ended_at),
        }
    }

    pub fn failed(
        id: StepId,
        tool_name: impl Into<String>,
        error: String,
        started_at: SystemTime,
        ended_at: SystemTime,
    ) -> Self {
        Self {
            id,
            tool_name: tool_name.into(),
            success: false,
            output: String::new(),
            error: Some(error),
            started_at,
            ended_at,
            duration_ms: elapsed_ms(started_at, ended_at),
        }
    }
}

fn elapsed_ms(started_at: SystemTime, ended_at: SystemTime) -> u64 {
    ended_at
        .duration_since(started_at)
        .map(duration_ms)
        .unwrap_or(0)
}
