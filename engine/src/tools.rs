use log::{debug, warn};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::model::{FunctionCall, FunctionResponse};

pub mod reference_lookup;
pub use reference_lookup::ReferenceLookup;

/// What the model is told about a local tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("invalid arguments for `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// A capability the model can invoke in the middle of a request. Runs in
/// process and synchronously.
pub trait LocalTool: Send + Sync {
    fn declaration(&self) -> ToolDeclaration;
    fn call(&self, args: &serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

#[derive(Default)]
pub struct ToolBox {
    tools: Vec<Box<dyn LocalTool>>,
}

impl ToolBox {
    pub fn with(mut self, tool: impl LocalTool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    pub fn call(&self, call: &FunctionCall) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.declaration().name == call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        tool.call(&call.args)
    }

    /// Answers a model function call. Failures are reported back to the model
    /// as an `error` payload so the request can still finish.
    pub fn respond(&self, call: &FunctionCall) -> FunctionResponse {
        debug!("tool call {}: {}", call.name, call.args);
        let response = match self.call(call) {
            Ok(output) => output,
            Err(e) => {
                warn!("tool call failed: {e}");
                json!({ "error": e.to_string() })
            }
        };

        FunctionResponse {
            name: call.name.clone(),
            response,
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_tool_is_answered_with_error_payload() {
        let tools = ToolBox::default().with(ReferenceLookup);
        let resp = tools.respond(&FunctionCall {
            name: "webBrowser".into(),
            args: json!({}),
        });
        assert_eq!(resp.name, "webBrowser");
        assert_eq!(resp.response, json!({"error": "unknown tool `webBrowser`"}));
    }

    #[test]
    fn declarations_list_every_tool() {
        let tools = ToolBox::default().with(ReferenceLookup);
        let names: Vec<_> = tools.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![reference_lookup::TOOL_NAME.to_string()]);
    }
}
