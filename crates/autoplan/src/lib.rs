pub mod error;
pub mod config;
pub mod utils;
pub mod bus;
pub mod event;

pub mod tools;
pub mod selector;
pub mod plan;
pub mod executor;
pub mod llm;
pub mod orchestrator;

pub use crate::bus::Bus;
pub use crate::config::EngineConfig;
pub use crate::event::RunEvent;
pub use crate::error::{CoreError, CoreResult};
pub use crate::executor::{PlanExecutionResult, TaskExecutor};
pub use crate::llm::{LlmProvider, OpenAiCompatibleProvider};
pub use crate::orchestrator::{Orchestrator, RunHandle, RunRecord, RunRequest};
pub use crate::plan::{parse, ArgValue, ParseResult, ParsedStep};
pub use crate::selector::ToolSelector;
pub use crate::tools::{Tool, ToolCatalog, ToolId};
