//! Parsing of raw model output into the next agent action.
//!
//! The model is instructed to reply with a single JSON object of the shape
//! `{"action": <tool name | "Final Answer">, "action_input": ...}`, usually
//! wrapped in a Markdown code fence. Model output is arbitrary text though,
//! so parsing is tolerant about fences and surrounding prose, and everything
//! that does not resolve to one of the two action shapes is a [`ParseError`]
//! value handed back to the loop — never a panic, never a third action state.

use serde_json::Value;
use thiserror::Error;

/// The model's parsed intent for one step.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    /// Invoke a tool with raw (not yet validated) arguments.
    ToolCall { name: String, arguments: Value },
    /// The run is done; return this text to the caller.
    FinalAnswer { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJson,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("JSON object is not an action: {0}")]
    NotAnAction(String),
}

/// Parse raw model output into an [`AgentAction`].
pub fn parse_action(raw: &str) -> Result<AgentAction, ParseError> {
    let json_text = extract_json_object(raw).ok_or(ParseError::NoJson)?;
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(ParseError::NotAnAction("not a JSON object".into()));
    };
    let Some(action) = object.get("action").and_then(Value::as_str) else {
        return Err(ParseError::NotAnAction(
            "missing string field 'action'".into(),
        ));
    };

    let input = object.get("action_input").cloned().unwrap_or(Value::Null);

    if is_final_answer(action) {
        let text = match input {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => serde_json::to_string(&other)
                .map_err(|e| ParseError::InvalidJson(e.to_string()))?,
        };
        return Ok(AgentAction::FinalAnswer { text });
    }

    Ok(AgentAction::ToolCall {
        name: action.to_string(),
        arguments: input,
    })
}

fn is_final_answer(action: &str) -> bool {
    action.eq_ignore_ascii_case("final answer") || action.eq_ignore_ascii_case("final_answer")
}

/// Find the first balanced JSON object in the text.
///
/// Prefers the body of a ```` ```json ```` fence when one exists; otherwise
/// scans from the first `{`, tracking string literals and escapes so braces
/// inside strings do not end the object early.
fn extract_json_object(raw: &str) -> Option<&str> {
    let candidate = fenced_body(raw).unwrap_or(raw);

    let start = candidate.find('{')?;
    let bytes = candidate.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn fenced_body(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    // Skip the info string ("json", "JSON", or nothing) up to the newline.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_call_in_json_fence() {
        let raw = "```json\n{\"action\": \"FindHCPs\", \"action_input\": {\"specialty\": \"cardiologists\", \"location\": \"Berlin\"}}\n```";
        let action = parse_action(raw).unwrap();
        assert_eq!(
            action,
            AgentAction::ToolCall {
                name: "FindHCPs".into(),
                arguments: json!({"specialty": "cardiologists", "location": "Berlin"}),
            }
        );
    }

    #[test]
    fn parses_final_answer() {
        let raw = r#"{"action": "Final Answer", "action_input": "Here are the results."}"#;
        assert_eq!(
            parse_action(raw).unwrap(),
            AgentAction::FinalAnswer {
                text: "Here are the results.".into()
            }
        );
    }

    #[test]
    fn final_answer_is_case_and_separator_insensitive() {
        for action in ["final answer", "Final Answer", "final_answer"] {
            let raw = format!(r#"{{"action": "{action}", "action_input": "ok"}}"#);
            assert!(matches!(
                parse_action(&raw).unwrap(),
                AgentAction::FinalAnswer { .. }
            ));
        }
    }

    #[test]
    fn parses_object_embedded_in_prose() {
        let raw = "Sure, I'll look that up.\n{\"action\": \"SearchMedicalLiterature\", \"action_input\": {\"query\": \"PCSK9 {inhibitors}\"}}\nDone.";
        let action = parse_action(raw).unwrap();
        match action {
            AgentAction::ToolCall { name, arguments } => {
                assert_eq!(name, "SearchMedicalLiterature");
                assert_eq!(arguments["query"], "PCSK9 {inhibitors}");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn missing_action_input_defaults_to_null() {
        let raw = r#"{"action": "GetOutreachCandidates"}"#;
        assert_eq!(
            parse_action(raw).unwrap(),
            AgentAction::ToolCall {
                name: "GetOutreachCandidates".into(),
                arguments: Value::Null,
            }
        );
    }

    #[test]
    fn plain_text_is_a_parse_error() {
        assert_eq!(parse_action("not an action"), Err(ParseError::NoJson));
    }

    #[test]
    fn object_without_action_field_is_not_an_action() {
        let raw = r#"{"tool": "FindHCPs"}"#;
        assert!(matches!(
            parse_action(raw),
            Err(ParseError::NotAnAction(_))
        ));
    }

    #[test]
    fn truncated_json_is_invalid_not_a_panic() {
        let raw = r#"{"action": "FindHCPs", "action_input": {"specialty": "#;
        assert_eq!(parse_action(raw), Err(ParseError::NoJson));
    }

    #[test]
    fn non_string_final_answer_is_serialized() {
        let raw = r#"{"action": "Final Answer", "action_input": {"summary": "3 HCPs found"}}"#;
        match parse_action(raw).unwrap() {
            AgentAction::FinalAnswer { text } => assert!(text.contains("3 HCPs found")),
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
