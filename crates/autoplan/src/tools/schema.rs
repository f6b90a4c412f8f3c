//! Executable tool contract and catalog entries.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::plan::ArgValue;

use super::id::ToolId;

/// Failure reported for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The tool rejected its arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),
    /// No registered tool has this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The tool is registered but currently disabled.
    #[error("tool disabled: {0}")]
    Disabled(String),
}

/// A side-effecting action the planner can call.
///
/// Arguments arrive fully resolved: back-references have already been
/// replaced by the referenced step's output.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn call(&self, args: Vec<ArgValue>) -> Result<String, ToolError>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>;

struct FnTool {
    execute: Box<dyn Fn(Vec<ArgValue>) -> ToolFuture + Send + Sync>,
}

#[async_trait]
impl Tool for FnTool {
    async fn call(&self, args: Vec<ArgValue>) -> Result<String, ToolError> {
        (self.execute)(args).await
    }
}

/// Wrap an async closure as a [`Tool`].
pub fn tool_fn<F, Fut>(execute: F) -> Arc<dyn Tool>
where
    F: Fn(Vec<ArgValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    Arc::new(FnTool {
        execute: Box::new(move |args| Box::pin(execute(args))),
    })
}

/// Registered tool: identity, prompt text, and behavior. Immutable once built.
#[derive(Clone)]
pub struct ToolEntry {
    pub id: ToolId,
    /// Signature and guidelines shown to the planner.
    pub prompt: String,
    pub tool: Arc<dyn Tool>,
}

impl ToolEntry {
    /// Entry using the built-in signature text for `id`.
    pub fn new(id: ToolId, tool: Arc<dyn Tool>) -> Self {
        Self {
            id,
            prompt: id.signature().to_string(),
            tool,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("id", &self.id)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}
