//! Dependency-aware, level-parallel execution of parsed plans.

mod graph;
mod result;
mod runner;

pub use graph::{execution_levels, ExecutionLevel};
pub use result::PlanExecutionResult;
pub use runner::TaskExecutor;
