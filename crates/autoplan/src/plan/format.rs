use super::types::{ParsedStep, END_OF_PLAN};

/// Render steps back into plan text that [`super::parse`] reads identically.
pub fn format_plan(steps: &[ParsedStep]) -> String {
    let mut lines = Vec::with_capacity(steps.len());
    for step in steps {
        if let Some(thought) = &step.thought {
            for line in thought.lines() {
                lines.push(format!("Thought: {line}"));
            }
        }
        lines.push(format!("{}. {step}", step.id));
    }
    let mut text = lines.join("\n");
    text.push_str(END_OF_PLAN);
    text
}
