//! Plan DSL: argument values, parsed steps, parser and formatter.

pub mod format;
pub mod parser;
pub mod types;
pub mod value;

pub use format::format_plan;
pub use parser::parse;
pub use types::{ParseResult, ParsedStep, StepId, END_OF_PLAN};
pub use value::ArgValue;
