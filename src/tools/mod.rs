//! Tool definitions the agent can call.
//!
//! Every tool advertises a JSON schema and executes against the workspace
//! directory. A fresh [`ToolRegistry`] is built for each run so the in-progress
//! deck is never shared between runs.

mod presentation;
mod web;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{FunctionDefinition, ToolDefinition};

pub use presentation::{
    AddImageToSlide, AddShapeToSlide, AddSlide, CreatePresentation, DeckSession, SavePresentation,
};
pub use web::{fetch_image, SearchImage};

/// Tool name whose invocation ends the agent loop.
pub const SAVE_PRESENTATION: &str = "save_presentation";

/// Why a tool call did not produce output.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The call itself was unusable (bad arguments, wrong order, unreachable
    /// image). Reported back to the model as the tool result.
    #[error("{0}")]
    Rejected(String),

    /// The tool could not perform its side effect. Aborts the run.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ToolError {
    pub fn rejected(message: impl Into<String>) -> Self {
        ToolError::Rejected(message.into())
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value, workspace: &Path) -> Result<String, ToolError>;
}

/// Name and description, used for prompts and logs.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Ordered set of tools available to one run.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The presentation toolkit, backed by a new empty deck session.
    pub fn presentation(http: reqwest::Client, pexels_api_key: Option<String>) -> Self {
        let session = DeckSession::default();
        let mut registry = Self::empty();
        registry.register(Arc::new(CreatePresentation::new(session.clone())));
        registry.register(Arc::new(AddSlide::new(session.clone())));
        registry.register(Arc::new(SearchImage::new(http.clone(), pexels_api_key)));
        registry.register(Arc::new(AddImageToSlide::new(session.clone(), http)));
        registry.register(Arc::new(AddShapeToSlide::new(session.clone())));
        registry.register(Arc::new(SavePresentation::new(session)));
        registry
    }

    /// Add a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.ordered()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Schemas in the chat-completions `tools` format.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        self.ordered()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        workspace: &Path,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::rejected(format!("Unknown tool: {}", name)))?;
        tool.execute(args, workspace).await
    }

    fn ordered(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }
}

/// Required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args[key]
        .as_str()
        .ok_or_else(|| ToolError::rejected(format!("Missing '{}' argument", key)))
}
