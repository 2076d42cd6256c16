//! Tool registry with stable registration order.

use super::{ToolArgs, ToolError, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for tool implementations.
///
/// Handlers receive validated, type-coerced arguments and return a JSON
/// value. This is the boundary between the model loop and side effects.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError>;
}

/// A tool specification bound to its implementation.
pub struct RegisteredTool {
    pub spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }
}

// The handler is a trait object, so Debug is written by hand.
impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// The fixed set of tools available to the agent.
///
/// Tools are registered once at startup. `list()` returns them in
/// registration order, and that order is what gets rendered into the model
/// context, so it must be deterministic across runs.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails with [`ToolError::Duplicate`] if the name is
    /// taken; the registry is unchanged by a failed call.
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        if self.index.contains_key(&spec.name) {
            return Err(ToolError::Duplicate(spec.name.clone()));
        }
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Get a tool by name, or fail with [`ToolError::NotFound`].
    pub fn get(&self, name: &str) -> Result<&RegisteredTool, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All registered tools, in registration order.
    pub fn list(&self) -> &[RegisteredTool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgSpec, ArgType};
    use serde_json::json;

    struct NullHandler;

    #[async_trait]
    impl ToolHandler for NullHandler {
        async fn call(&self, _args: ToolArgs) -> Result<Value, ToolError> {
            Ok(json!(null))
        }
    }

    fn spec(name: &str) -> ToolSpec {
        ToolSpec::new(name, "test tool").arg(ArgSpec::optional("x", ArgType::String))
    }

    #[test]
    fn get_returns_registered_spec() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("alpha"), Arc::new(NullHandler)).unwrap();
        let tool = registry.get("alpha").unwrap();
        assert_eq!(tool.spec.name, "alpha");
        assert_eq!(tool.spec.args.len(), 1);
    }

    #[test]
    fn get_unknown_name_fails() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.get("missing").unwrap_err(),
            ToolError::NotFound("missing".into())
        );
    }

    #[test]
    fn duplicate_registration_fails_and_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("alpha"), Arc::new(NullHandler)).unwrap();
        let err = registry
            .register(spec("alpha"), Arc::new(NullHandler))
            .unwrap_err();
        assert_eq!(err, ToolError::Duplicate("alpha".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registered_tool_debug_names_the_spec() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("alpha"), Arc::new(NullHandler)).unwrap();
        let rendered = format!("{:?}", registry.get("alpha").unwrap());
        assert!(rendered.contains("alpha"));
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(spec(name), Arc::new(NullHandler)).unwrap();
        }
        let names: Vec<&str> = registry.list().iter().map(|t| t.spec.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
