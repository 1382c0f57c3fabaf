use reqwest::Client;

use crate::errors::AgentResult;
use crate::tools::calc;
use crate::tools::web::{self, FetchPreview, SearchResult};

const EMPTY_REPLY: &str =
    "Provide a question. Without OPENAI_API_KEY, a simple offline toolkit is used.";

const UNRECOGNIZED_REPLY: &str = "Offline mode: prefix with search:, fetch:, or calc: for basic tools. To enable full agentic reasoning, set OPENAI_API_KEY.";

/// The command forms recognized by the offline agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Search(String),
    Fetch(String),
    Calc(String),
    Unrecognized,
}

/// Classify raw input text into an offline command.
///
/// Prefix matching is case insensitive and the argument is whatever
/// follows the prefix, trimmed.
pub fn classify(input: &str) -> Command {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    if let Some(rest) = strip_prefix_ignore_case(trimmed, "search:") {
        return Command::Search(rest.trim().to_string());
    }
    if let Some(rest) = strip_prefix_ignore_case(trimmed, "fetch:") {
        return Command::Fetch(rest.trim().to_string());
    }
    if let Some(rest) = strip_prefix_ignore_case(trimmed, "calc:") {
        return Command::Calc(rest.trim().to_string());
    }

    Command::Unrecognized
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Rule-based agent used when no completion credential is configured
pub struct FallbackAgent {
    client: Client,
}

impl FallbackAgent {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Produce the offline reply for the given input text.
    ///
    /// Search and fetch failures degrade to fixed text inside the tools;
    /// only a calculation error surfaces as an Err to the caller.
    pub async fn respond(&self, input: &str) -> AgentResult<String> {
        match classify(input) {
            Command::Empty => Ok(EMPTY_REPLY.to_string()),
            Command::Search(query) => {
                let result = web::search(&self.client, &query).await;
                Ok(format_search(&query, &result))
            }
            Command::Fetch(url) => {
                let result = web::fetch_url(&self.client, &url).await;
                Ok(format_fetch(&result))
            }
            Command::Calc(expression) => {
                let result = calc::calculate(&expression)?;
                Ok(format!("result: {}", result.value))
            }
            Command::Unrecognized => Ok(UNRECOGNIZED_REPLY.to_string()),
        }
    }
}

impl Default for FallbackAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn format_search(query: &str, result: &SearchResult) -> String {
    format!("search results for \"{}\":\n{}", query, result.summary)
}

fn format_fetch(result: &FetchPreview) -> String {
    let title = match result.title.as_deref() {
        Some(title) if !title.is_empty() => title,
        _ => "Untitled",
    };
    format!("fetched: {}\n\n{}", title, result.preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(
            classify("search: rust borrow checker"),
            Command::Search("rust borrow checker".to_string())
        );
        assert_eq!(
            classify("fetch: https://example.com"),
            Command::Fetch("https://example.com".to_string())
        );
        assert_eq!(classify("calc: (2+3)*5"), Command::Calc("(2+3)*5".to_string()));
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("SEARCH: cats"), Command::Search("cats".to_string()));
        assert_eq!(
            classify("Fetch:https://example.com"),
            Command::Fetch("https://example.com".to_string())
        );
        assert_eq!(classify("CALC: 1+1"), Command::Calc("1+1".to_string()));
    }

    #[test]
    fn test_classify_requires_the_full_prefix() {
        assert_eq!(classify("searching: for meaning"), Command::Unrecognized);
        assert_eq!(classify("calculate 2+2"), Command::Unrecognized);
        assert_eq!(classify("what is rust?"), Command::Unrecognized);
    }

    #[test]
    fn test_classify_blank_input() {
        assert_eq!(classify(""), Command::Empty);
        assert_eq!(classify("   \n  "), Command::Empty);
    }

    #[test]
    fn test_classify_trims_the_argument() {
        assert_eq!(classify("  calc:   1 + 1  "), Command::Calc("1 + 1".to_string()));
    }

    #[tokio::test]
    async fn test_respond_empty_input() {
        let agent = FallbackAgent::new();
        let reply = agent.respond("").await.unwrap();
        assert_eq!(
            reply,
            "Provide a question. Without OPENAI_API_KEY, a simple offline toolkit is used."
        );
    }

    #[tokio::test]
    async fn test_respond_unrecognized_input() {
        let agent = FallbackAgent::new();
        let reply = agent.respond("tell me a joke").await.unwrap();
        assert!(reply.starts_with("Offline mode: prefix with search:, fetch:, or calc:"));
        assert!(reply.contains("set OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_respond_calc() {
        let agent = FallbackAgent::new();
        let reply = agent.respond("calc: (2+3)*5").await.unwrap();
        assert_eq!(reply, "result: 25");

        let reply = agent.respond("calc: 7/2").await.unwrap();
        assert_eq!(reply, "result: 3.5");
    }

    #[tokio::test]
    async fn test_respond_calc_error_surfaces() {
        let agent = FallbackAgent::new();
        let error = agent.respond("calc: 1/0").await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidExpression(_)));
    }

    #[tokio::test]
    async fn test_respond_fetch_formats_preview() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<title>Example</title><body>Hi</body>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let agent = FallbackAgent::new();
        let reply = agent
            .respond(&format!("fetch: {}", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(reply, "fetched: Example\n\nExample Hi");
    }

    #[tokio::test]
    async fn test_respond_fetch_untitled() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<body>plain page</body>", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let agent = FallbackAgent::new();
        let reply = agent
            .respond(&format!("fetch: {}", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(reply, "fetched: Untitled\n\nplain page");
    }

    #[tokio::test]
    async fn test_respond_fetch_failure_degrades() {
        let agent = FallbackAgent::new();
        let reply = agent.respond("fetch: http://127.0.0.1:9").await.unwrap();
        assert_eq!(reply, "fetched: Error\n\nFailed to fetch url");
    }

    #[test]
    fn test_format_search_quotes_the_query() {
        let result = SearchResult {
            summary: "a summary".to_string(),
            sources: Vec::new(),
        };
        assert_eq!(
            format_search("cats", &result),
            "search results for \"cats\":\na summary"
        );
    }

    #[test]
    fn test_format_fetch_empty_title_is_untitled() {
        let result = FetchPreview {
            title: Some(String::new()),
            preview: "content".to_string(),
        };
        assert_eq!(format_fetch(&result), "fetched: Untitled\n\ncontent");
    }
}
