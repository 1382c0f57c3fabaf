use regex::Regex;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// User agent sent with every outbound tool request
pub const TOOL_USER_AGENT: &str = "AgenticBot/1.0";

const SEARCH_ENDPOINT: &str = "https://duckduckgo.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub summary: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub preview: String,
}

/// Search the web through the DuckDuckGo instant answer endpoint.
///
/// Request failures never propagate, they degrade to a fixed
/// "Search failed" summary so the caller always has text to show.
pub async fn search(client: &Client, query: &str) -> SearchResult {
    search_at(client, SEARCH_ENDPOINT, query).await
}

pub(crate) async fn search_at(client: &Client, endpoint: &str, query: &str) -> SearchResult {
    let url = format!(
        "{}/?q={}&format=json&no_redirect=1&no_html=1",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(query)
    );

    match request_text(client, &url).await {
        Ok(body) => {
            let mut summary = truncate_chars(&collapse_whitespace(&body), 500);
            if summary.is_empty() {
                summary = "No summary available".to_string();
            }
            SearchResult {
                summary,
                sources: vec![Source {
                    title: "DuckDuckGo search".to_string(),
                    url,
                }],
            }
        }
        Err(_) => SearchResult {
            summary: "Search failed".to_string(),
            sources: Vec::new(),
        },
    }
}

/// Fetch a URL and reduce the response to a short textual preview.
///
/// Like search, any failure degrades to a fixed error preview rather
/// than returning an Err.
pub async fn fetch_url(client: &Client, url: &str) -> FetchPreview {
    match try_fetch(client, url).await {
        Ok(preview) => preview,
        Err(_) => FetchPreview {
            title: Some("Error".to_string()),
            preview: "Failed to fetch url".to_string(),
        },
    }
}

async fn try_fetch(client: &Client, url: &str) -> anyhow::Result<FetchPreview> {
    let response = client
        .get(url)
        .header(USER_AGENT, TOOL_USER_AGENT)
        .send()
        .await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let body = response.text().await?;

    if content_type.contains("text/html") {
        return Ok(preview_html(&body));
    }

    if content_type.contains("application/json") {
        let json: serde_json::Value = serde_json::from_str(&body)?;
        return Ok(FetchPreview {
            title: Some("JSON".to_string()),
            preview: truncate_chars(&serde_json::to_string_pretty(&json)?, 800),
        });
    }

    Ok(FetchPreview {
        title: Some("Content".to_string()),
        preview: truncate_chars(&body, 800),
    })
}

fn preview_html(html: &str) -> FetchPreview {
    let title = Regex::new(r"(?i)<title>(.*?)</title>")
        .unwrap()
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string());

    let stripped = Regex::new(r"(?is)<script.*?</script>")
        .unwrap()
        .replace_all(html, " ");
    let stripped = Regex::new(r"(?is)<style.*?</style>")
        .unwrap()
        .replace_all(&stripped, " ");
    let stripped = Regex::new(r"<[^>]+>").unwrap().replace_all(&stripped, " ");

    let preview = truncate_chars(&collapse_whitespace(&stripped), 600)
        .trim()
        .to_string();

    FetchPreview { title, preview }
}

async fn request_text(client: &Client, url: &str) -> reqwest::Result<String> {
    client
        .get(url)
        .header(USER_AGENT, TOOL_USER_AGENT)
        .send()
        .await?
        .text()
        .await
}

fn collapse_whitespace(s: &str) -> String {
    Regex::new(r"\s+").unwrap().replace_all(s, " ").to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
