//! Tool catalog: identifiers, executable contract, and the shared registry.

pub mod id;
pub mod invocation;
pub mod registry;
pub mod schema;

pub use id::{ToolId, UnknownToolName, JOIN_TOOL_NAME};
pub use invocation::StepResult;
pub use registry::{CatalogError, ToolCatalog, ToolSnapshot};
pub use schema::{tool_fn, Tool, ToolEntry, ToolError};
