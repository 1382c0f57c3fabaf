use async_trait::async_trait;
use indoc::indoc;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::toolkit::base::Toolkit;
use crate::tools::{calc, web};

/// Toolkit exposing web search, URL fetching and arithmetic to the agent
pub struct ResearchToolkit {
    client: Client,
    tools: Vec<Tool>,
}

impl ResearchToolkit {
    pub fn new() -> Self {
        let search_tool = Tool::new(
            "search",
            "Search the web for information",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                }
            }),
        );

        let fetch_tool = Tool::new(
            "fetch_url",
            "Fetch the textual content of a URL",
            json!({
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": {
                        "type": "string",
                        "format": "uri",
                        "description": "The URL to fetch"
                    }
                }
            }),
        );

        let calculate_tool = Tool::new(
            "calculate",
            "Safely evaluate a math expression",
            json!({
                "type": "object",
                "required": ["expression"],
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The arithmetic expression to evaluate"
                    }
                }
            }),
        );

        Self {
            client: Client::new(),
            tools: vec![search_tool, fetch_tool, calculate_tool],
        }
    }

    async fn search(&self, arguments: &Value) -> AgentResult<Vec<Content>> {
        let query = string_param(arguments, "query")?;
        let result = web::search(&self.client, &query).await;
        to_content(&result)
    }

    async fn fetch_url(&self, arguments: &Value) -> AgentResult<Vec<Content>> {
        let url = string_param(arguments, "url")?;
        let result = web::fetch_url(&self.client, &url).await;
        to_content(&result)
    }

    async fn calculate(&self, arguments: &Value) -> AgentResult<Vec<Content>> {
        let expression = string_param(arguments, "expression")?;
        let result = calc::calculate(&expression)?;
        to_content(&result)
    }
}

impl Default for ResearchToolkit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolkit for ResearchToolkit {
    fn name(&self) -> &str {
        "research"
    }

    fn description(&self) -> &str {
        "A toolkit that provides web search, URL fetching and arithmetic evaluation"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Use the provided tools to research questions and compute answers:
            - search looks a query up on the web and returns a short summary
            - fetch_url downloads a URL and returns a textual preview of it
            - calculate evaluates an arithmetic expression exactly

            Prefer calculate over doing arithmetic yourself, and cite fetched
            URLs when you rely on their content.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        match tool_call.name.as_str() {
            "search" => self.search(&tool_call.arguments).await,
            "fetch_url" => self.fetch_url(&tool_call.arguments).await,
            "calculate" => self.calculate(&tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

fn string_param(arguments: &Value, name: &str) -> AgentResult<String> {
    arguments
        .get(name)
        .and_then(|value| value.as_str())
        .map(String::from)
        .ok_or_else(|| AgentError::InvalidParameters(format!("missing string parameter '{}'", name)))
}

// Tool results cross the provider boundary as JSON text
fn to_content<T: Serialize>(result: &T) -> AgentResult<Vec<Content>> {
    let text =
        serde_json::to_string(result).map_err(|e| AgentError::ExecutionError(e.to_string()))?;
    Ok(vec![Content::text(text)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_advertises_three_tools() {
        let toolkit = ResearchToolkit::new();
        let names: Vec<&str> = toolkit.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "fetch_url", "calculate"]);
    }

    #[tokio::test]
    async fn test_calculate_returns_json_content() {
        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("calculate", json!({"expression": "(2+3)*5"}));

        let content = toolkit.call(call).await.unwrap();
        assert_eq!(content.len(), 1);

        let result: Value = serde_json::from_str(content[0].as_text().unwrap()).unwrap();
        assert_eq!(result["value"], json!(25.0));
    }

    #[tokio::test]
    async fn test_calculate_propagates_parse_errors() {
        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("calculate", json!({"expression": "2 +"}));

        let error = toolkit.call(call).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidExpression(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected() {
        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("rm_rf", json!({}));

        let error = toolkit.call(call).await.unwrap_err();
        assert!(matches!(error, AgentError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_rejected() {
        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("search", json!({}));

        let error = toolkit.call(call).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_non_string_parameter_is_rejected() {
        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("calculate", json!({"expression": 42}));

        let error = toolkit.call(call).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_fetch_url_round_trips_preview_as_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<title>Docs</title><body>Content here</body>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let toolkit = ResearchToolkit::new();
        let call = ToolCall::new("fetch_url", json!({"url": mock_server.uri()}));

        let content = toolkit.call(call).await.unwrap();
        let result: Value = serde_json::from_str(content[0].as_text().unwrap()).unwrap();
        assert_eq!(result["title"], json!("Docs"));
        assert_eq!(result["preview"], json!("Docs Content here"));
    }
}
