//! Parser for the numbered-step plan language emitted by the planner model.
//!
//! ```text
//! Thought: look up the number first.
//! 1. get_phone_number("John")
//! 2. send_sms([$1], "Meeting at 3pm")
//! 3. join()<END_OF_PLAN>
//! ```
//!
//! Malformed lines become entries in [`ParseResult::errors`]; the rest of the
//! plan is still returned.

use std::collections::HashSet;

use super::types::{ParseResult, ParsedStep, StepId, END_OF_PLAN};
use super::value::ArgValue;

const THOUGHT_PREFIX: &str = "Thought:";

pub fn parse(text: &str) -> ParseResult {
    let mut result = ParseResult::default();

    let body = match text.find(END_OF_PLAN) {
        Some(index) => {
            result.has_terminator = true;
            &text[..index]
        }
        None => text,
    };

    let mut pending_thoughts: Vec<String> = Vec::new();
    let mut seen_ids: HashSet<StepId> = HashSet::new();

    for raw_line in logical_lines(body) {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(thought) = line.strip_prefix(THOUGHT_PREFIX) {
            let thought = thought.trim().to_string();
            result.rationales.push(thought.clone());
            pending_thoughts.push(thought);
            continue;
        }

        if !is_step_start(line) {
            tracing::debug!("ignoring non-step plan line: {line}");
            continue;
        }

        match parse_step(line) {
            Ok(mut step) => {
                if !seen_ids.insert(step.id) {
                    result
                        .errors
                        .push(format!("duplicate step id {}: `{line}`", step.id));
                    continue;
                }
                if !pending_thoughts.is_empty() {
                    step.thought = Some(pending_thoughts.join("\n"));
                    pending_thoughts.clear();
                }
                result.steps.push(step);
            }
            Err(error) => result.errors.push(format!("{error}: `{line}`")),
        }
    }

    result
}

fn is_step_start(text: &str) -> bool {
    text.trim_start().starts_with(|c: char| c.is_ascii_digit())
}

/// Split on newlines that are not inside a quoted argument of a step line.
fn logical_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_step = is_step_start(text);

    for (index, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '\n' => {
                lines.push(&text[start..index]);
                start = index + 1;
                in_step = is_step_start(&text[start..]);
            }
            '"' | '\'' if in_step => quote = Some(ch),
            _ => {}
        }
    }

    if start < text.len() {
        let rest = &text[start..];
        if quote.is_some() {
            // An unclosed quote must not swallow the rest of the plan.
            lines.extend(rest.split('\n'));
        } else {
            lines.push(rest);
        }
    }

    lines
}

fn parse_step(line: &str) -> Result<ParsedStep, String> {
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    let id: StepId = line[..digits_end]
        .parse()
        .map_err(|_| "invalid step id".to_string())?;

    let rest = line[digits_end..]
        .strip_prefix('.')
        .ok_or_else(|| "expected `.` after step id".to_string())?
        .trim_start();

    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err("expected tool name".to_string());
    }

    let call = rest[name_end..]
        .strip_prefix('(')
        .ok_or_else(|| format!("expected `(` after `{name}`"))?;
    let close = find_closing_paren(call)?;
    let tail = call[close + 1..].trim();
    if !tail.is_empty() {
        return Err(format!("unexpected text after call `{tail}`"));
    }

    let args = parse_args(&call[..close])?;
    Ok(ParsedStep::new(id, name, args))
}

/// Index of the `)` closing an argument list, skipping quoted and nested text.
fn find_closing_paren(text: &str) -> Result<usize, String> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' if depth == 0 => return Ok(index),
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    if quote.is_some() {
        Err("unterminated string".to_string())
    } else {
        Err("missing closing `)`".to_string())
    }
}

fn parse_args(text: &str) -> Result<Vec<ArgValue>, String> {
    split_top_level(text)?
        .into_iter()
        .map(classify)
        .collect()
}

/// Split on commas outside quotes and brackets; tokens come back trimmed.
fn split_top_level(text: &str) -> Result<Vec<&str>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced brackets".to_string())?;
            }
            ',' if depth == 0 => {
                tokens.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    if depth != 0 {
        return Err("unbalanced brackets".to_string());
    }
    tokens.push(text[start..].trim());

    // Tolerate a single trailing comma.
    if tokens.len() > 1 && tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    if tokens.iter().any(|token| token.is_empty()) {
        return Err("empty argument".to_string());
    }
    Ok(tokens)
}

fn classify(token: &str) -> Result<ArgValue, String> {
    if let Some(id) = parse_reference(token) {
        return Ok(ArgValue::Ref(id));
    }

    match token {
        "None" | "null" | "nil" => return Ok(ArgValue::Null),
        "True" | "true" => return Ok(ArgValue::Bool(true)),
        "False" | "false" => return Ok(ArgValue::Bool(false)),
        _ => {}
    }

    if let Some(open) = token.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return parse_quoted(token, open).map(ArgValue::Str);
    }

    if let Some(inner) = token.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated list `{token}`"))?;
        return parse_args(inner).map(ArgValue::List);
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(ArgValue::Int(value));
    }
    if token.contains(|c: char| c.is_ascii_digit()) {
        if let Ok(value) = token.parse::<f64>() {
            if value.is_finite() {
                return Ok(ArgValue::Float(value));
            }
        }
    }

    Ok(ArgValue::Str(token.to_string()))
}

/// `$3` or `${3}`.
fn parse_reference(token: &str) -> Option<StepId> {
    let rest = token.strip_prefix('$')?;
    let digits = rest
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(rest);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_quoted(token: &str, open: char) -> Result<String, String> {
    let mut value = String::new();
    let mut chars = token.char_indices().skip(1);

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\'')) => value.push('\''),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c if c == open => {
                let tail = token[index + c.len_utf8()..].trim();
                if !tail.is_empty() {
                    return Err(format!("unexpected text after string `{tail}`"));
                }
                return Ok(value);
            }
            other => value.push(other),
        }
    }

    Err(format!("unterminated string `{token}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::format_plan;
    use std::collections::BTreeSet;

    #[test]
    fn parses_sms_plan() {
        let text = "1. get_phone_number(\"John\")\n2. send_sms([$1], \"Meeting at 3pm\")\nThought: Message sent.\n3. join()<END_OF_PLAN>";
        let result = parse(text);

        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.steps[1].dependencies, BTreeSet::from([1]));
        assert!(result.steps[2].is_terminal());
        assert_eq!(result.steps[2].thought.as_deref(), Some("Message sent."));
        assert_eq!(result.rationales, vec!["Message sent.".to_string()]);
        assert!(result.has_terminator);
        assert!(result.is_valid());
    }

    #[test]
    fn quoted_newline_does_not_split_step() {
        let text = "1. create_note(\"Groceries\", \"milk\neggs\", \"Notes\")\n2. join()\n<END_OF_PLAN>";
        let result = parse(text);

        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert_eq!(
            result.steps[0].args[1],
            ArgValue::Str("milk\neggs".to_string())
        );
    }

    #[test]
    fn classifies_every_token_kind() {
        let text = r#"1. create_reminder($2, ${3}, None, null, nil, True, false, 'it\'s', [1, "a", [$4]], 42, -7, 2.5, 1e3, tomorrow)
<END_OF_PLAN>"#;
        let result = parse(text);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);

        assert_eq!(
            result.steps[0].args,
            vec![
                ArgValue::Ref(2),
                ArgValue::Ref(3),
                ArgValue::Null,
                ArgValue::Null,
                ArgValue::Null,
                ArgValue::Bool(true),
                ArgValue::Bool(false),
                ArgValue::Str("it's".to_string()),
                ArgValue::List(vec![
                    ArgValue::Int(1),
                    ArgValue::Str("a".to_string()),
                    ArgValue::List(vec![ArgValue::Ref(4)]),
                ]),
                ArgValue::Int(42),
                ArgValue::Int(-7),
                ArgValue::Float(2.5),
                ArgValue::Float(1000.0),
                ArgValue::Str("tomorrow".to_string()),
            ]
        );
        assert_eq!(result.steps[0].dependencies, BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn unescapes_string_escapes() {
        let result = parse(r#"1. create_note("a\"b", "tab\there", "back\\slash", "cr\rlf")<END_OF_PLAN>"#);
        assert_eq!(
            result.steps[0].args,
            vec![
                ArgValue::Str("a\"b".to_string()),
                ArgValue::Str("tab\there".to_string()),
                ArgValue::Str("back\\slash".to_string()),
                ArgValue::Str("cr\rlf".to_string()),
            ]
        );
    }

    #[test]
    fn commas_inside_quotes_and_lists_do_not_split() {
        let result = parse(r#"1. send_sms(["a, b", "c"], "hi, there")<END_OF_PLAN>"#);
        assert_eq!(result.steps[0].args.len(), 2);
        assert_eq!(
            result.steps[0].args[1],
            ArgValue::Str("hi, there".to_string())
        );
    }

    #[test]
    fn whitespace_around_tokens_is_trimmed() {
        let result = parse("1. open_note(   \"Todo\"  ,   \"Work\"   )<END_OF_PLAN>");
        assert_eq!(
            result.steps[0].args,
            vec![
                ArgValue::Str("Todo".to_string()),
                ArgValue::Str("Work".to_string())
            ]
        );
    }

    #[test]
    fn empty_argument_list_yields_no_arguments() {
        let result = parse("1. join(  )<END_OF_PLAN>");
        assert!(result.is_valid());
        assert!(result.steps[0].args.is_empty());
    }

    #[test]
    fn unknown_tools_are_accepted_at_parse_time() {
        let result = parse("1. launch_rocket(\"moon\")\n2. join()<END_OF_PLAN>");
        assert!(result.is_valid());
        assert_eq!(result.steps[0].tool_name, "launch_rocket");
    }

    #[test]
    fn missing_terminator_invalidates_plan() {
        let result = parse("1. get_phone_number(\"John\")\n2. join()");
        assert_eq!(result.steps.len(), 2);
        assert!(!result.has_terminator);
        assert!(!result.is_valid());
    }

    #[test]
    fn malformed_step_is_recorded_and_rest_survives() {
        let text = "1. get_phone_number(\"John\"\n2. get_email_address(\"Jane\")\n3 join()\n4. join()<END_OF_PLAN>";
        let result = parse(text);

        let ids: Vec<StepId> = result.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(result.errors.len(), 2);
        assert!(!result.is_valid());
    }

    #[test]
    fn unclosed_quote_does_not_swallow_later_steps() {
        let text = "1. create_note(\"oops)\n2. open_note(\"Todo\", \"Work\")\n3. join()<END_OF_PLAN>";
        let result = parse(text);

        assert_eq!(result.errors.len(), 1);
        let ids: Vec<StepId> = result.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn apostrophes_in_thoughts_are_not_quotes() {
        let text = "Thought: I'll look up John's number.\n1. get_phone_number(\"John\")\nThought: Now we're done.\n2. join()<END_OF_PLAN>";
        let result = parse(text);

        assert!(result.is_valid());
        assert_eq!(
            result.steps[0].thought.as_deref(),
            Some("I'll look up John's number.")
        );
        assert_eq!(result.rationales.len(), 2);
    }

    #[test]
    fn consecutive_thoughts_attach_together() {
        let text = "Thought: first\nThought: second\n1. open_note(\"a\", \"b\")<END_OF_PLAN>";
        let result = parse(text);
        assert_eq!(result.steps[0].thought.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let result = parse("1. open_note(\"a\", \"b\")\n1. open_note(\"c\", \"d\")<END_OF_PLAN>");
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn trailing_text_after_call_is_an_error() {
        let result = parse("1. open_note(\"a\", \"b\") please<END_OF_PLAN>");
        assert!(result.steps.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn commentary_lines_are_skipped() {
        let result = parse("Here is the plan:\n1. open_note(\"a\", \"b\")\n2. join()<END_OF_PLAN>");
        assert!(result.is_valid());
        assert_eq!(result.steps.len(), 2);
    }

    #[test]
    fn text_after_terminator_is_ignored() {
        let result = parse("1. join()<END_OF_PLAN>\n2. open_note(\"a\", \"b\")");
        assert_eq!(result.steps.len(), 1);
    }

    #[test]
    fn empty_text_is_invalid() {
        let result = parse("");
        assert!(result.steps.is_empty());
        assert!(!result.is_valid());
    }

    #[test]
    fn reference_forms() {
        assert_eq!(parse_reference("$12"), Some(12));
        assert_eq!(parse_reference("${7}"), Some(7));
        assert_eq!(parse_reference("$"), None);
        assert_eq!(parse_reference("${x}"), None);
        assert_eq!(parse_reference("$1.output"), None);
    }

    #[test]
    fn overflowing_floats_stay_text() {
        assert_eq!(classify("1e999"), Ok(ArgValue::Str("1e999".to_string())));
        assert_eq!(classify("-1e999"), Ok(ArgValue::Str("-1e999".to_string())));

        let result = parse("1. create_note(1e999)<END_OF_PLAN>");
        let again = parse(&format_plan(&result.steps));
        assert_eq!(again.steps[0].args, result.steps[0].args);
    }

    #[test]
    fn stray_closing_bracket_is_an_error() {
        let result = parse("1. send_sms(\"a\"], \"b\")<END_OF_PLAN>");
        assert_eq!(result.errors.len(), 1);
    }
}
