use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tools::JOIN_TOOL_NAME;

use super::value::ArgValue;

/// Step identifier as written by the planner. Opaque; never renumbered.
pub type StepId = u32;

/// Literal the planner appends after its last step.
pub const END_OF_PLAN: &str = "<END_OF_PLAN>";

/// One tool call parsed from a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStep {
    pub id: StepId,
    pub tool_name: String,
    pub args: Vec<ArgValue>,
    /// Rationale lines that preceded this step, joined by newlines.
    pub thought: Option<String>,
    /// Ids referenced anywhere in `args`.
    pub dependencies: BTreeSet<StepId>,
}

impl ParsedStep {
    pub fn new(id: StepId, tool_name: impl Into<String>, args: Vec<ArgValue>) -> Self {
        let tool_name = tool_name.into();
        let (args, dependencies) = if tool_name == JOIN_TOOL_NAME {
            (Vec::new(), BTreeSet::new())
        } else {
            let mut dependencies = BTreeSet::new();
            for arg in &args {
                arg.collect_references(&mut dependencies);
            }
            (args, dependencies)
        };
        Self {
            id,
            tool_name,
            args,
            thought: None,
            dependencies,
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    /// Whether this is the terminal synchronization step.
    pub fn is_terminal(&self) -> bool {
        self.tool_name == JOIN_TOOL_NAME
    }
}

impl fmt::Display for ParsedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.tool_name)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// Everything recovered from one planner output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub steps: Vec<ParsedStep>,
    pub rationales: Vec<String>,
    pub has_terminator: bool,
    pub errors: Vec<String>,
}

impl ParseResult {
    /// At least one step, terminator present, no recorded errors.
    pub fn is_valid(&self) -> bool {
        !self.steps.is_empty() && self.has_terminator && self.errors.is_empty()
    }

    pub fn has_join(&self) -> bool {
        self.steps.iter().any(ParsedStep::is_terminal)
    }

    /// Steps that are submitted to the executor.
    pub fn executable_steps(&self) -> impl Iterator<Item = &ParsedStep> {
        self.steps.iter().filter(|step| !step.is_terminal())
    }

    /// Human-readable reasons the plan cannot be executed.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = self.errors.clone();
        if !self.has_terminator {
            problems.push(format!("missing {END_OF_PLAN} marker"));
        }
        if self.steps.is_empty() {
            problems.push("no steps were parsed".to_string());
        }
        problems
    }
}
