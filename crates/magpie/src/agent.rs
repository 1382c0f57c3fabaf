use anyhow::Result;
use futures::stream::BoxStream;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::ToolCall;
use crate::providers::base::Provider;
use crate::toolkit::base::Toolkit;

/// Agent drives a completion provider through rounds of tool use
pub struct Agent {
    provider: Box<dyn Provider>,
    toolkit: Box<dyn Toolkit>,
}

impl Agent {
    /// Create a new Agent with the given provider and toolkit
    pub fn new(provider: Box<dyn Provider>, toolkit: Box<dyn Toolkit>) -> Self {
        Self { provider, toolkit }
    }

    fn get_system_prompt(&self) -> String {
        format!(
            "You are a helpful assistant with access to the {} toolkit: {}\n\n{}",
            self.toolkit.name(),
            self.toolkit.description(),
            self.toolkit.instructions()
        )
    }

    async fn dispatch_tool_call(
        &self,
        tool_call: AgentResult<ToolCall>,
    ) -> AgentResult<Vec<Content>> {
        self.toolkit.call(tool_call?).await
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and any tool responses.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<Message>>> {
        let mut messages = messages.to_vec();
        let tools = self.toolkit.tools().to_vec();
        let system_prompt = self.get_system_prompt();

        Ok(Box::pin(async_stream::try_stream! {
            loop {
                // Get completion from provider
                let (response, _usage) = self.provider.complete(
                    &system_prompt,
                    &messages,
                    &tools,
                ).await?;

                // Yield the assistant's response
                yield response.clone();

                // This ensures the above message is flushed before the following
                // potentially long-running tool calls start processing
                tokio::task::yield_now().await;

                // First collect any tool requests
                let tool_requests: Vec<&ToolRequest> = response.content
                    .iter()
                    .filter_map(|content| content.as_tool_request())
                    .collect();

                if tool_requests.is_empty() {
                    // No more tool calls, end the reply loop
                    break;
                }

                // Then dispatch each in parallel
                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                    .collect();

                // Process all the futures in parallel but wait until all are finished
                let outputs = futures::future::join_all(futures).await;

                // Combine the responses into one message using the original request IDs
                let mut message_tool_response = Message::user();
                for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                    message_tool_response = message_tool_response.with_tool_response(
                        request.id.clone(),
                        output,
                    );
                }

                yield message_tool_response.clone();

                // Extend the transcript before the next completion round
                messages.push(response);
                messages.push(message_tool_response);
            }
        }))
    }
}
