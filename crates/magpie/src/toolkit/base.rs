use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Core trait that defines a bundle of tools an AI agent can operate
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Get the name of the toolkit
    fn name(&self) -> &str;

    /// Get the toolkit description
    fn description(&self) -> &str;

    /// Get instructions on how the tools should be used
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters
    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>>;
}
