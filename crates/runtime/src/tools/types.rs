//! Tool-related types.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The semantic type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Integer,
    Boolean,
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// Declaration of one tool argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
    pub required: bool,
    /// Substituted when an optional argument is absent.
    pub default: Option<Value>,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A tool definition exposed to the model.
///
/// Created once at startup; the argument list is ordered and rendered into
/// the model context in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }
}

/// Validated, type-coerced arguments handed to a tool handler.
///
/// Required fields declared in the matching [`ToolSpec`] are guaranteed to
/// be present with their declared type.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A required string argument.
    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name)
            .ok_or_else(|| ToolError::invalid_argument(name, "missing string argument"))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A required integer argument.
    pub fn int(&self, name: &str) -> Result<i64, ToolError> {
        self.opt_int(name)
            .ok_or_else(|| ToolError::invalid_argument(name, "missing integer argument"))
    }

    pub fn opt_int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }
}

/// The outcome of one tool dispatch, fed back into the conversation.
///
/// Validation and execution failures land here as `ok: false` rather than
/// propagating; the model sees the error text and gets a chance to recover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(value: Value) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error: Some(message.into()),
        }
    }

    /// Render the result as the observation text shown to the model.
    pub fn render(&self) -> String {
        match (&self.value, &self.error) {
            (Some(value), _) if self.ok => {
                serde_json::to_string(value).unwrap_or_else(|_| "null".into())
            }
            (_, Some(error)) => format!("Error: {error}"),
            _ => "null".into(),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.to_string())
    }
}
