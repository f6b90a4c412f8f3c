use crate::plan::END_OF_PLAN;
use crate::tools::{ToolEntry, JOIN_TOOL_NAME};

use super::examples::WorkedExample;
use super::record::RunRequest;

const PLANNER_RULES: &str = "Guidelines:
 - Each action above lists its input and output types. Follow them exactly.
 - Every action in the plan must be one of the actions above. Never invent new actions.
 - Each action has a unique integer ID, strictly increasing from 1.
 - An input is either a constant or the output of an earlier action. Refer to an earlier output as $id.
 - Maximize parallelism: only make an action depend on another when it needs that output.
 - Always call join() as the last action, then write <END_OF_PLAN>.
 - Do not add comments or explanations to the plan. A line starting with 'Thought:' may precede an action.
 - Write dates as 'YYYY-MM-DD HH:MM:SS'.
 - Fill in every argument, including optional ones. Use an empty string or empty list when there is no value.
 - If the query cannot be handled with these actions, call join() directly.";

const JOINNER_INSTRUCTIONS: &str = "You are given a question and the observations from executing a plan for it.
Decide whether the observations answer the question.

Respond with a single 'Thought:' line explaining your reasoning, then exactly one action:
 - Action: Finish(<answer>) when the task is complete. <answer> is the final reply to the user.
 - Action: Replan(<reason>) when the observations are insufficient or a step failed in a way a new plan could fix.

Do not output anything after the action.";

/// System prompt for the planner: selected tool signatures, worked
/// examples and authoring rules.
pub fn planner_system_prompt(tools: &[&ToolEntry], examples: &[&WorkedExample]) -> String {
    let mut prompt = format!(
        "Given a user query, create a plan to solve it with as much parallelism as possible. \
         Each plan step is one of the following {} actions:\n",
        tools.len() + 1
    );
    for (index, entry) in tools.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", index + 1, entry.prompt));
    }
    prompt.push_str(&format!(
        "{}. {JOIN_TOOL_NAME}() -> str\n - Collects the results of the previous actions and decides whether to answer or plan again.\n - It must always be the last action.\n\n",
        tools.len() + 1
    ));
    prompt.push_str(PLANNER_RULES);

    if !examples.is_empty() {
        prompt.push_str("\n\nHere are some examples:\n");
        for example in examples {
            prompt.push_str(&format!("\nQuestion: {}\n{}\n", example.query, example.plan));
        }
    }
    prompt
}

/// User prompt for one planning attempt. `replan_context` carries what went
/// wrong with the previous attempt.
pub fn planner_user_prompt(request: &RunRequest, replan_context: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(reference_time) = request.reference_time {
        prompt.push_str(&format!(
            "Current date and time: {}\n",
            reference_time.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if !request.context.is_empty() {
        prompt.push_str("Context:\n");
        for fact in &request.context {
            prompt.push_str(&format!(" - {fact}\n"));
        }
    }
    if !prompt.is_empty() {
        prompt.push('\n');
    }
    prompt.push_str(&format!("Question: {}", request.query));

    if let Some(context) = replan_context {
        prompt.push_str(&format!(
            "\n\nThe previous attempt did not complete the task.\n{context}\n\n\
             Write a new plan that uses this information. Do not repeat actions that already succeeded \
             unless their output is needed again. End with join() and {END_OF_PLAN}."
        ));
    }
    prompt
}

pub fn joinner_system_prompt() -> &'static str {
    JOINNER_INSTRUCTIONS
}

pub fn joinner_user_prompt(query: &str, observations: &str) -> String {
    format!("Question: {query}\n\n{observations}\n")
}

/// Replan context for a plan that could not be parsed.
pub fn invalid_plan_context(planner_output: &str, problems: &[String]) -> String {
    let mut context = String::from("The previous plan was rejected:\n");
    for problem in problems {
        context.push_str(&format!(" - {problem}\n"));
    }
    if !planner_output.trim().is_empty() {
        context.push_str(&format!("Previous plan:\n{}", planner_output.trim()));
    }
    context.trim_end().to_string()
}

/// Replan context carrying the previous execution trace.
pub fn observation_context(observations: &str, rationale: Option<&str>) -> String {
    let mut context = format!("Previous plan and observations:\n{observations}");
    if let Some(rationale) = rationale {
        context.push_str(&format!("\nReason for replanning: {rationale}"));
    }
    context
}
