//! Lenient parsing of the joinner's `Finish(...)` / `Replan` directive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JoinDecision {
    Finish {
        answer: String,
        thought: Option<String>,
    },
    Replan {
        rationale: Option<String>,
    },
}

impl JoinDecision {
    pub fn is_finish(&self) -> bool {
        matches!(self, JoinDecision::Finish { .. })
    }
}

const REPLAN: &str = "replan";
const FINISH: &str = "finish(";

/// Offsets of `needle` in `haystack` on word boundaries, ignoring ASCII
/// case. `needle` must be lowercase.
fn word_offsets(haystack: &str, needle: &str) -> Vec<usize> {
    let lower = haystack.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut offsets = Vec::new();
    let mut from = 0;
    while let Some(offset) = lower[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            offsets.push(start);
        }
        from = end;
    }
    offsets
}

fn is_thought_line(line: &str) -> bool {
    line.trim_start()
        .get(..8)
        .is_some_and(|head| head.eq_ignore_ascii_case("thought:"))
}

/// Byte range of a `Finish(...)` directive, through its last `)`.
fn finish_span(text: &str) -> Option<(usize, usize)> {
    let start = text.to_ascii_lowercase().find(FINISH)?;
    let end = text[start..]
        .rfind(')')
        .map(|close| start + close + 1)
        .unwrap_or(text.len());
    Some((start, end))
}

/// Offset of the first `Replan` that acts as a directive.
///
/// Mentions inside `Thought:` lines never count. A mention that leads its
/// line, optionally after `Action:`, always counts; any other mention counts
/// only outside the finish answer.
fn replan_directive(text: &str) -> Option<usize> {
    let finish = finish_span(text);
    word_offsets(text, REPLAN).into_iter().find(|&offset| {
        let line_start = text[..offset].rfind('\n').map_or(0, |newline| newline + 1);
        if is_thought_line(&text[line_start..]) {
            return false;
        }
        let lead = text[line_start..offset].trim();
        let leads_line = lead.is_empty() || lead.eq_ignore_ascii_case("action:");
        let in_answer = finish.is_some_and(|(start, end)| offset > start && offset < end);
        leads_line || !in_answer
    })
}

fn thought_of(text: &str) -> Option<String> {
    let thoughts: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let head = line.get(..8)?;
            head.eq_ignore_ascii_case("thought:")
                .then(|| line[8..].trim())
        })
        .filter(|thought| !thought.is_empty())
        .collect();
    if thoughts.is_empty() {
        None
    } else {
        Some(thoughts.join(" "))
    }
}

/// Parenthesized text right after a directive, up to the last `)` or the end.
fn parenthesized(rest: &str) -> Option<&str> {
    let inner = rest.strip_prefix('(')?;
    let inner = match inner.rfind(')') {
        Some(close) => &inner[..close],
        None => inner,
    };
    Some(inner.trim())
}

/// Interpret joinner output.
///
/// A `Replan` directive wins over `Finish`; the word in a thought or inside
/// the finish answer is not a directive. The finish answer spans from
/// `Finish(` to the last `)` in the text. Output matching neither becomes a
/// finish answer verbatim.
pub fn parse_join_decision(text: &str) -> JoinDecision {
    let thought = thought_of(text);

    if let Some(start) = replan_directive(text) {
        let rest = text[start + REPLAN.len()..].trim_start();
        let rationale = parenthesized(rest)
            .filter(|inner| !inner.is_empty())
            .map(str::to_string)
            .or(thought);
        return JoinDecision::Replan { rationale };
    }

    let lower = text.to_ascii_lowercase();
    if let Some(start) = lower.find(FINISH) {
        let rest = &text[start + FINISH.len() - 1..];
        let answer = parenthesized(rest).unwrap_or_default().to_string();
        return JoinDecision::Finish { answer, thought };
    }

    JoinDecision::Finish {
        answer: text.trim().to_string(),
        thought: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_with_thought() {
        assert_eq!(
            parse_join_decision("Thought: done.\nAction: Finish(Task completed!)"),
            JoinDecision::Finish {
                answer: "Task completed!".to_string(),
                thought: Some("done.".to_string()),
            }
        );
    }

    #[test]
    fn bare_replan_has_no_rationale() {
        assert_eq!(
            parse_join_decision("Action: Replan"),
            JoinDecision::Replan { rationale: None }
        );
    }

    #[test]
    fn replan_rationale_from_parentheses_or_thought() {
        assert_eq!(
            parse_join_decision("Action: Replan(the SMS failed)"),
            JoinDecision::Replan {
                rationale: Some("the SMS failed".to_string())
            }
        );
        assert_eq!(
            parse_join_decision("Thought: the phone lookup returned nothing.\nAction: replan"),
            JoinDecision::Replan {
                rationale: Some("the phone lookup returned nothing.".to_string())
            }
        );
    }

    #[test]
    fn replan_takes_precedence() {
        let decision = parse_join_decision("Action: Finish(partial)\nAction: Replan");
        assert!(!decision.is_finish());
    }

    #[test]
    fn replan_mentioned_in_thought_is_ignored() {
        assert_eq!(
            parse_join_decision(
                "Thought: All steps succeeded, no need to replan.\nAction: Finish(Message sent to John)"
            ),
            JoinDecision::Finish {
                answer: "Message sent to John".to_string(),
                thought: Some("All steps succeeded, no need to replan.".to_string()),
            }
        );
    }

    #[test]
    fn replan_inside_answer_is_ignored() {
        assert!(parse_join_decision("Action: Finish(Sent, no replan required)").is_finish());
    }

    #[test]
    fn replan_after_finish_still_wins() {
        assert_eq!(
            parse_join_decision("Action: Finish(partial)\nAction: Replan(the SMS bounced)"),
            JoinDecision::Replan {
                rationale: Some("the SMS bounced".to_string())
            }
        );
    }

    #[test]
    fn replanning_is_not_a_directive() {
        let decision = parse_join_decision("Action: Finish(no replanning needed)");
        assert_eq!(
            decision,
            JoinDecision::Finish {
                answer: "no replanning needed".to_string(),
                thought: None,
            }
        );
    }

    #[test]
    fn finish_is_greedy_and_case_insensitive() {
        assert_eq!(
            parse_join_decision("action: FINISH(Call (555) 0100 now)"),
            JoinDecision::Finish {
                answer: "Call (555) 0100 now".to_string(),
                thought: None,
            }
        );
    }

    #[test]
    fn unclosed_finish_runs_to_end() {
        assert_eq!(
            parse_join_decision("Action: Finish(Sent the message"),
            JoinDecision::Finish {
                answer: "Sent the message".to_string(),
                thought: None,
            }
        );
    }

    #[test]
    fn unrecognized_output_is_the_answer() {
        assert_eq!(
            parse_join_decision("  The meeting is booked for 3pm.\n"),
            JoinDecision::Finish {
                answer: "The meeting is booked for 3pm.".to_string(),
                thought: None,
            }
        );
    }
}
