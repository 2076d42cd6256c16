//! Argument validation and tool dispatch.

use super::{ArgSpec, ArgType, ToolArgs, ToolError, ToolRegistry, ToolResult, ToolSpec};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatches model-requested tool calls against the registry.
///
/// Every failure mode — unknown tool, bad arguments, handler error — is
/// converted into a `ToolResult { ok: false, .. }` so a single misbehaving
/// call never aborts the run. Exactly one dispatch happens per requested
/// call; there is no retry or deduplication here.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Invoke a tool by name with raw JSON arguments from the model.
    pub async fn invoke(&self, name: &str, raw_arguments: &Value) -> ToolResult {
        let tool = match self.registry.get(name) {
            Ok(tool) => tool,
            Err(err) => {
                warn!(tool = name, "model requested unknown tool");
                return err.into();
            }
        };

        let args = match validate_args(&tool.spec, raw_arguments) {
            Ok(args) => args,
            Err(err) => {
                debug!(tool = name, error = %err, "argument validation failed");
                return err.into();
            }
        };

        match tool.handler().call(args).await {
            Ok(value) => ToolResult::success(value),
            Err(err) => {
                warn!(tool = name, error = %err, "tool execution failed");
                err.into()
            }
        }
    }
}

/// Validate raw arguments against a spec, producing coerced [`ToolArgs`].
///
/// Required fields must be present and coercible to their declared type;
/// optional fields fall back to their default when absent; unknown extra
/// fields are dropped rather than rejected (the model may over-specify).
pub fn validate_args(spec: &ToolSpec, raw: &Value) -> Result<ToolArgs, ToolError> {
    let empty = Map::new();
    let object = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ToolError::invalid_argument(
                &spec.name,
                format!("expected an argument object, got {}", value_kind(other)),
            ));
        }
    };

    let mut validated = Map::new();
    for arg in &spec.args {
        match object.get(&arg.name) {
            Some(value) => {
                validated.insert(arg.name.clone(), coerce(arg, value)?);
            }
            None if arg.required => {
                return Err(ToolError::invalid_argument(
                    &arg.name,
                    "missing required argument",
                ));
            }
            None => {
                if let Some(default) = &arg.default {
                    validated.insert(arg.name.clone(), default.clone());
                }
            }
        }
    }

    Ok(ToolArgs::from_map(validated))
}

fn coerce(arg: &ArgSpec, value: &Value) -> Result<Value, ToolError> {
    let coerced = match (arg.ty, value) {
        (ArgType::String, Value::String(s)) => Some(Value::String(s.clone())),
        (ArgType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ArgType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (ArgType::Integer, Value::Number(n)) => n.as_i64().map(Value::from),
        (ArgType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (ArgType::Boolean, Value::Bool(b)) => Some(Value::Bool(*b)),
        (ArgType::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        // Null for an optional argument means "not provided".
        (_, Value::Null) if !arg.required => return Ok(Value::Null),
        _ => None,
    };

    coerced.ok_or_else(|| {
        ToolError::invalid_argument(
            &arg.name,
            format!("expected {}, got {}", arg.ty, value_kind(value)),
        )
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
