//! Tool call execution
//!
//! Turns the pending tool calls of an assistant message into tool-result
//! messages, one per call and in call order.

use agent_llm::Message;
use agent_tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Event handler for tool execution events
///
/// Implement this trait to receive callbacks while tools run, useful for
/// streaming tool call status to a front-end.
#[async_trait]
pub trait ToolEventHandler: Send + Sync {
    /// Called when a tool execution starts
    async fn on_tool_start(&self, _id: &str, _name: &str, _input: &Value) {}

    /// Called when a tool execution completes
    async fn on_tool_done(&self, _id: &str, _name: &str, _output: &str, _duration_ms: u64) {}
}

/// No-op event handler for when events are not needed
pub struct NoOpEventHandler;

#[async_trait]
impl ToolEventHandler for NoOpEventHandler {}

/// Dispatches tool calls against a registry
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    event_handler: Option<Arc<dyn ToolEventHandler>>,
}

impl ToolExecutor {
    /// Create an executor over `registry`
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            event_handler: None,
        }
    }

    /// Set the event handler for receiving execution events
    pub fn with_event_handler(mut self, handler: Arc<dyn ToolEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Registry the executor dispatches to
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute every tool call carried by `message`
    ///
    /// Calls run sequentially. Each yields exactly one tool-result message
    /// answering the call's id; failures are error-flagged results, never
    /// `Err`.
    pub async fn execute(&self, message: &Message) -> Vec<Message> {
        let calls = message.tool_calls();
        info!(tool_count = calls.len(), "Starting tool execution");

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let input_preview: String = call.arguments.to_string().chars().take(500).collect();
            info!(
                tool_name = %call.name,
                tool_id = %call.id,
                input_preview = %input_preview,
                "Executing tool"
            );

            if let Some(handler) = &self.event_handler {
                handler.on_tool_start(&call.id, &call.name, &call.arguments).await;
            }

            let start_time = Instant::now();
            let output = self.registry.dispatch(&call.name, call.arguments).await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            debug!(
                tool_name = %call.name,
                duration_ms,
                result_length = output.len(),
                "Tool execution finished"
            );

            if let Some(handler) = &self.event_handler {
                handler
                    .on_tool_done(&call.id, &call.name, &output, duration_ms)
                    .await;
            }

            results.push(if output.starts_with("Error: ") {
                Message::tool_error(call.id, output)
            } else {
                Message::tool_result(call.id, output)
            });
        }

        results
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("registry", &self.registry)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}
