//! Keyword relevance filter that narrows the tools offered to the planner.

mod profile;
mod scorer;

pub use profile::SelectorProfile;
pub use scorer::{ToolScore, ToolSelector};
