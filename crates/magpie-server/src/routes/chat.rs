use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::{
    extract::State,
    http::{self, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use magpie::{
    agent::Agent,
    fallback::FallbackAgent,
    models::content::Content,
    models::message::{Message, MessageContent},
    models::role::Role,
    models::tool::ToolCall,
    providers::configs::OpenAiProviderConfig,
    providers::openai::OpenAiProvider,
    toolkit::research::ResearchToolkit,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

use crate::state::{AppState, Dispatch};

// Types matching the incoming useChat JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, rename = "toolInvocations")]
    tool_invocations: Vec<ToolInvocation>,
}

#[derive(Debug, Deserialize)]
struct ToolInvocation {
    state: String,
    #[serde(rename = "toolCallId")]
    tool_call_id: String,
    #[serde(rename = "toolName")]
    tool_name: String,
    args: Value,
    result: Option<Vec<Content>>,
}

// Custom SSE response type that implements the Vercel AI SDK data stream protocol
struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .header("x-vercel-ai-data-stream", "v1")
            .body(body)
            .unwrap()
    }
}

// Protocol-specific message formatting for the data stream protocol
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        // Text messages start with "0:"
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::new());
        format!("0:{}\n", encoded_text)
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        // Tool calls start with "9:"
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args
        });
        format!("9:{}\n", tool_call)
    }

    fn format_tool_response(id: &str, result: &Vec<Content>) -> String {
        // Tool responses start with "a:"
        let response = json!({
            "toolCallId": id,
            "result": result,
        });
        format!("a:{}\n", response)
    }

    fn format_finish(reason: &str) -> String {
        // Finish messages start with "d:"
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": 0,
                "completionTokens": 0
            }
        });
        format!("d:{}\n", finish)
    }
}

// Convert incoming useChat messages to the internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for msg in incoming {
        match msg.role.as_str() {
            "user" => {
                messages.push(Message::user().with_text(msg.content));
            }
            "system" => {
                messages.push(Message::system().with_text(msg.content));
            }
            "assistant" => {
                // Completed tool invocations replay as a request and response pair
                // preceding the assistant text they produced
                for tool in msg.tool_invocations {
                    if tool.state == "result" {
                        let tool_call = ToolCall::new(tool.tool_name, tool.args);
                        messages.push(
                            Message::assistant()
                                .with_tool_request(tool.tool_call_id.clone(), Ok(tool_call)),
                        );

                        if let Some(result) = tool.result {
                            messages.push(
                                Message::user().with_tool_response(tool.tool_call_id, Ok(result)),
                            );
                        }
                    }
                }

                if !msg.content.is_empty() {
                    messages.push(Message::assistant().with_text(msg.content));
                }
            }
            _ => {
                tracing::warn!("unknown role: {}", msg.role);
            }
        }
    }

    messages
}

async fn stream_message(
    message: Message,
    tx: &mpsc::Sender<String>,
) -> Result<(), mpsc::error::SendError<String>> {
    match message.role {
        Role::User => {
            // Tool responses arrive as user messages
            for content in message.content {
                if let MessageContent::ToolResponse(response) = content {
                    match response.tool_result {
                        Ok(result) => {
                            tx.send(ProtocolFormatter::format_tool_response(
                                &response.id,
                                &result,
                            ))
                            .await?;
                        }
                        Err(err) => {
                            // Send an error result so the interface can display it
                            tx.send(ProtocolFormatter::format_tool_response(
                                &response.id,
                                &vec![Content::text(format!("Error {}", err))],
                            ))
                            .await?;
                        }
                    }
                }
            }
        }
        Role::Assistant => {
            for content in message.content {
                match content {
                    MessageContent::ToolRequest(request) => match request.tool_call {
                        Ok(tool_call) => {
                            tx.send(ProtocolFormatter::format_tool_call(
                                &request.id,
                                &tool_call.name,
                                &tool_call.arguments,
                            ))
                            .await?;
                        }
                        Err(_) => {
                            // An invalid call still enters the stream so the following
                            // tool result frame has a call to pair with
                            tx.send(ProtocolFormatter::format_tool_call(
                                &request.id,
                                "invalid name",
                                &json!({}),
                            ))
                            .await?;
                        }
                    },
                    MessageContent::Text(text) => {
                        // Send each line separately, the protocol keeps the newline
                        for line in text.text.lines() {
                            let modified_line = format!("{}\n", line);
                            tx.send(ProtocolFormatter::format_text(&modified_line))
                                .await?;
                        }
                    }
                    MessageContent::ToolResponse(_) => {
                        // Tool responses arrive on user messages
                    }
                }
            }
        }
        Role::System => {
            // The agent never yields system messages
        }
    }
    Ok(())
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, StatusCode> {
    match state.dispatch {
        Dispatch::Augmented(config) => augmented_reply(config, request),
        Dispatch::Fallback => fallback_reply(request).await,
    }
}

fn augmented_reply(
    config: OpenAiProviderConfig,
    request: ChatRequest,
) -> Result<Response, StatusCode> {
    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    let provider = OpenAiProvider::new(config).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let agent = Agent::new(Box::new(provider), Box::new(ResearchToolkit::new()));

    // Convert incoming messages
    let messages = convert_messages(request.messages);

    // Spawn task to handle streaming
    tokio::spawn(async move {
        let mut stream = match agent.reply(&messages).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to start reply stream: {}", e);
                let _ = tx.send(ProtocolFormatter::format_finish("error")).await;
                return;
            }
        };

        let mut finish_reason = "stop";
        loop {
            tokio::select! {
                response = timeout(Duration::from_millis(500), stream.next()) => {
                    match response {
                        Ok(Some(Ok(message))) => {
                            if let Err(e) = stream_message(message, &tx).await {
                                tracing::error!("Error sending message through channel: {}", e);
                                break;
                            }
                        }
                        Ok(Some(Err(e))) => {
                            tracing::error!("Error processing message: {}", e);
                            finish_reason = "error";
                            break;
                        }
                        Ok(None) => {
                            break;
                        }
                        Err(_) => { // Heartbeat, used to detect disconnected clients
                            if tx.is_closed() {
                                break;
                            }
                            continue;
                        }
                    }
                }
            }
        }

        // Send finish message
        let _ = tx.send(ProtocolFormatter::format_finish(finish_reason)).await;
    });

    Ok(SseResponse::new(stream).into_response())
}

async fn fallback_reply(request: ChatRequest) -> Result<Response, StatusCode> {
    let input = request
        .messages
        .last()
        .map(|msg| msg.content.clone())
        .unwrap_or_default();

    let reply = FallbackAgent::new().respond(&input).await.map_err(|e| {
        tracing::error!("Fallback dispatch failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        StatusCode::OK,
        [(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        reply,
    )
        .into_response())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
