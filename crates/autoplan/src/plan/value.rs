use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::StepId;

/// A single argument in a plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ArgValue>),
    /// Back-reference to the output of another step.
    Ref(StepId),
}

impl ArgValue {
    /// Substitute step outputs for back-references, recursively.
    ///
    /// A reference whose target produced no output resolves to an empty string.
    pub fn resolve(&self, outputs: &HashMap<StepId, String>) -> ArgValue {
        match self {
            ArgValue::Ref(id) => ArgValue::Str(outputs.get(id).cloned().unwrap_or_default()),
            ArgValue::List(items) => {
                ArgValue::List(items.iter().map(|item| item.resolve(outputs)).collect())
            }
            other => other.clone(),
        }
    }

    pub fn collect_references(&self, into: &mut BTreeSet<StepId>) {
        match self {
            ArgValue::Ref(id) => {
                into.insert(*id);
            }
            ArgValue::List(items) => {
                for item in items {
                    item.collect_references(into);
                }
            }
            _ => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Plain text form handed to tools that only want strings.
    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Str(value) => value.clone(),
            ArgValue::Int(value) => value.to_string(),
            ArgValue::Float(value) => value.to_string(),
            ArgValue::Bool(value) => value.to_string(),
            ArgValue::Null => String::new(),
            ArgValue::List(items) => items
                .iter()
                .map(ArgValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            ArgValue::Ref(id) => format!("${id}"),
        }
    }
}

/// Renders the value in plan DSL syntax.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(value) => {
                f.write_str("\"")?;
                for ch in value.chars() {
                    match ch {
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            ArgValue::Int(value) => write!(f, "{value}"),
            // Debug keeps a fractional part so the token reads back as a float.
            ArgValue::Float(value) => write!(f, "{value:?}"),
            ArgValue::Bool(true) => f.write_str("True"),
            ArgValue::Bool(false) => f.write_str("False"),
            ArgValue::Null => f.write_str("None"),
            ArgValue::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ArgValue::Ref(id) => write!(f, "${id}"),
        }
    }
}
