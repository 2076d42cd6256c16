//! System prompt and tool catalog rendering.

use crate::tools::ToolRegistry;
use std::fmt::Write;

const PERSONA: &str = "You are Nova, a specialized AI assistant for pharmaceutical sales and marketing teams. \
You help users discover healthcare professionals (HCPs), research relevant medical content, \
and generate personalized outreach materials.";

const FORMAT_INSTRUCTIONS: &str = "Respond with a single JSON object inside a ```json code fence. \
To call a tool: {\"action\": \"<tool name>\", \"action_input\": {<arguments>}}. \
To answer the user directly: {\"action\": \"Final Answer\", \"action_input\": \"<your answer>\"}. \
Use exactly one action per response.";

/// Reminder appended to the conversation after unparseable model output.
pub const FORMAT_REMINDER: &str = "Your previous reply was not a valid action. \
Reply with exactly one JSON object: {\"action\": \"<tool name>\", \"action_input\": {<arguments>}} \
to call a tool, or {\"action\": \"Final Answer\", \"action_input\": \"<text>\"} to answer.";

/// Render the full system prompt: persona, tool catalog, format contract.
///
/// The catalog lists tools in registration order so the model context is
/// byte-identical across runs with the same registry.
pub fn render_system(registry: &ToolRegistry) -> String {
    let mut out = String::from(PERSONA);

    out.push_str("\n\nAvailable tools:\n");
    for tool in registry.list() {
        let _ = writeln!(out, "- {}: {}", tool.spec.name, tool.spec.description);
        for arg in &tool.spec.args {
            let requirement = if arg.required {
                "required".to_string()
            } else if let Some(default) = &arg.default {
                format!("optional, default {default}")
            } else {
                "optional".to_string()
            };
            let _ = writeln!(out, "    {} ({}, {})", arg.name, arg.ty, requirement);
        }
    }

    out.push('\n');
    out.push_str(FORMAT_INSTRUCTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgSpec, ArgType, ToolArgs, ToolError, ToolHandler, ToolSpec};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct NullHandler;

    #[async_trait]
    impl ToolHandler for NullHandler {
        async fn call(&self, _args: ToolArgs) -> Result<Value, ToolError> {
            Ok(json!(null))
        }
    }

    #[test]
    fn catalog_follows_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["Zeta", "Alpha"] {
            registry
                .register(ToolSpec::new(name, "does a thing"), Arc::new(NullHandler))
                .unwrap();
        }
        let rendered = render_system(&registry);
        let zeta = rendered.find("Zeta").unwrap();
        let alpha = rendered.find("Alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn catalog_is_deterministic() {
        let build = || {
            let mut registry = ToolRegistry::new();
            registry
                .register(
                    ToolSpec::new("FindHCPs", "Find HCPs.")
                        .arg(ArgSpec::required("specialty", ArgType::String))
                        .arg(
                            ArgSpec::optional("location", ArgType::String)
                                .with_default(json!("")),
                        ),
                    Arc::new(NullHandler),
                )
                .unwrap();
            render_system(&registry)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn catalog_describes_argument_requirements() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("RecordContact", "Mark an HCP as contacted.")
                    .arg(ArgSpec::required("hcp_id", ArgType::Integer)),
                Arc::new(NullHandler),
            )
            .unwrap();
        let rendered = render_system(&registry);
        assert!(rendered.contains("hcp_id (integer, required)"));
    }
}
