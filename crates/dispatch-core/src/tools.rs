use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A tool invocation requested by the LLM.
///
/// `arguments` is the raw JSON text as emitted by the model; streaming
/// providers deliver it in fragments, so it is only parseable once the
/// assistant turn has completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// A tool made available to the LLM, in the function-calling wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Seam between the dispatch loop and the remote tool backend.
///
/// The production implementation is the MCP session; tests substitute fakes.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Invoke a remote tool with parsed arguments and return its rendered
    /// text output.
    async fn dispatch(&self, name: &str, args: Value) -> Result<String>;

    /// Snapshot of the tools currently available to the LLM.
    fn available_tools(&self) -> Vec<ToolSchema>;
}
