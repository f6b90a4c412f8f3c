//! Planner/executor/joinner loop with bounded replanning.

mod engine;
mod examples;
mod handle;
mod history;
mod joinner;
mod prompt;
mod record;

pub use engine::Orchestrator;
pub use examples::{matching_examples, WorkedExample, WORKED_EXAMPLES};
pub use handle::RunHandle;
pub use history::RunHistory;
pub use joinner::{parse_join_decision, JoinDecision};
pub use record::{FinishReason, PlanAttempt, RunRecord, RunRequest};
