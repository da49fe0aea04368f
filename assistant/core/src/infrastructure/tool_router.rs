// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Tool Router: name → tool registry for the assistant agent.
//
// Agent → ToolRouter → AssistantTool
//         ↓ (parses arguments, records metrics, logs)
//
// Failures never abort a run. The router turns them into text the model can
// read and react to.

use metrics::{counter, histogram};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::domain::llm::{ToolCall, ToolDefinition};
use crate::domain::tool::{AssistantTool, ToolError};

/// Outcome of one dispatched call, ready to go back to the model
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

#[derive(Default, Clone)]
pub struct ToolRouter {
    tools: BTreeMap<String, Arc<dyn AssistantTool>>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name
    pub fn register(&mut self, tool: Arc<dyn AssistantTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn AssistantTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function definitions offered to the model, in name order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Invoke a tool with already-parsed arguments
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;
        tool.invoke(arguments).await
    }

    /// Execute a model-issued call. Never fails: errors become tool output.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolInvocation {
        let started = Instant::now();

        let result = match parse_arguments(&call.name, &call.arguments) {
            Ok(arguments) => self.call_tool(&call.name, arguments).await,
            Err(e) => Err(e),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let tool_label = if self.tools.contains_key(&call.name) {
            call.name.clone()
        } else {
            "unknown".to_string()
        };
        counter!("wardrobe_tool_invocations_total", "tool" => tool_label.clone()).increment(1);
        histogram!("wardrobe_tool_duration_seconds", "tool" => tool_label.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(output) => {
                debug!(tool = %call.name, duration_ms, "tool call succeeded");
                ToolInvocation {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output,
                    is_error: false,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                counter!("wardrobe_tool_errors_total", "tool" => tool_label).increment(1);
                ToolInvocation {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output: format!("Error: {}", e),
                    is_error: true,
                    duration_ms,
                }
            }
        }
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("arguments are not valid JSON: {}", e),
    })?;
    if !value.is_object() {
        return Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: "arguments must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl AssistantTool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }

        async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
            arguments["text"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ToolError::InvalidArguments {
                    tool: "echo".into(),
                    reason: "text is required".into(),
                })
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let router = ToolRouter::new().with_tool(Arc::new(Echo));
        let result = router.dispatch(&call("echo", r#"{"text":"hi"}"#)).await;
        assert!(!result.is_error);
        assert_eq!(result.output, "hi");
        assert_eq!(result.call_id, "call_1");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let router = ToolRouter::new();
        let result = router.dispatch(&call("nope", "{}")).await;
        assert!(result.is_error);
        assert_eq!(result.output, "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_dispatch_malformed_arguments() {
        let router = ToolRouter::new().with_tool(Arc::new(Echo));
        let result = router.dispatch(&call("echo", "{not json")).await;
        assert!(result.is_error);
        assert!(result.output.contains("not valid JSON"));

        let result = router.dispatch(&call("echo", "[1,2]")).await;
        assert!(result.is_error);
    }

    #[test]
    fn test_definitions() {
        let router = ToolRouter::new().with_tool(Arc::new(Echo));
        let defs = router.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"][0], "text");
    }
}
