//! HuggingFace inference router provider
//!
//! The router exposes an OpenAI-compatible chat completions endpoint in
//! front of hosted open-weight models. Many of those chat templates ignore
//! or reject a dedicated system turn, so handles built on this provider
//! declare `system_role: false` and callers fold instructions into the
//! conversation before invoking.
//! See: https://huggingface.co/docs/inference-providers
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::{HuggingFaceConfig, HuggingFaceProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = HuggingFaceProvider::with_config(HuggingFaceConfig::new("hf_token"))?;
//! let request = CompletionRequest::builder("meta-llama/Meta-Llama-3-8B-Instruct")
//!     .add_message(Message::user("Hello!"))
//!     .max_tokens(512)
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.text_content());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

const ROUTER_URL: &str = "https://router.huggingface.co/v1";

/// Router credentials and transport settings
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_token: String,
    /// Root of the OpenAI-compatible API, without `/chat/completions`
    pub api_base: String,
    pub timeout_secs: u64,
}

impl HuggingFaceConfig {
    /// Public router with a two minute transport timeout
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_base: ROUTER_URL.to_string(),
            timeout_secs: 120,
        }
    }

    #[must_use]
    pub fn with_api_base(self, api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_timeout(self, timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..self
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

pub struct HuggingFaceProvider {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceProvider {
    /// Fails on a blank token without touching the network
    pub fn with_config(config: HuggingFaceConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "HUGGINGFACEHUB_API_TOKEN is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HuggingFaceConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for HuggingFaceProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: request.messages.into_iter().flat_map(convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(status_error(status.as_u16(), body, request.model));
        }

        let ChatResponse { choices, usage } = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("router reply is not chat JSON: {e}")))?;
        let Some(choice) = choices.into_iter().next() else {
            return Err(LLMError::UnexpectedResponse("router reply has no choices".to_string()));
        };

        let usage = usage.unwrap_or_default();
        let finish_reason = choice.finish_reason.unwrap_or_default();
        debug!(
            finish_reason = %finish_reason,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Router answered"
        );

        let message = parse_response_message(choice.message)?;
        let stop_reason = if message.has_tool_calls() {
            StopReason::ToolUse
        } else {
            map_stop_reason(&finish_reason)
        };

        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

fn status_error(status: u16, body: String, model: String) -> LLMError {
    match status {
        401 | 403 => LLMError::AuthenticationFailed,
        404 => LLMError::ModelNotFound(model),
        429 => LLMError::RateLimitExceeded(body),
        400 | 422 => LLMError::InvalidRequest(body),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ChatResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ChatResponseFunctionCall {
    name: String,
    /// Usually a JSON-encoded string; some backends return an object
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// One domain message as router turns
///
/// Tool results become separate `tool` turns after the text and calls of
/// the same message.
fn convert_message(msg: Message) -> Vec<ChatMessage> {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let blocks = match msg.content {
        Some(MessageContent::Blocks(blocks)) => blocks,
        Some(MessageContent::Text(text)) => return vec![ChatMessage::text(role, text)],
        None => return vec![ChatMessage::text(role, String::new())],
    };

    let mut lead = ChatMessage::text(role, String::new());
    let mut texts: Vec<String> = Vec::new();
    let mut calls: Vec<ChatToolCall> = Vec::new();
    let mut results: Vec<ChatMessage> = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => calls.push(ChatToolCall {
                id,
                tool_type: "function",
                function: ChatFunctionCall {
                    name,
                    arguments: input.to_string(),
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => results.push(ChatMessage {
                tool_call_id: Some(tool_use_id),
                ..ChatMessage::text("tool", content)
            }),
        }
    }

    if texts.is_empty() && calls.is_empty() {
        return results;
    }
    lead.content = texts.join("\n");
    lead.tool_calls = (!calls.is_empty()).then_some(calls);

    let mut turns = Vec::with_capacity(results.len() + 1);
    turns.push(lead);
    turns.extend(results);
    turns
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|tool| ChatTool {
            tool_type: "function",
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Arguments arrive as a JSON string on most backends and as an object on a few
fn decode_arguments(arguments: Value) -> Result<Value> {
    match arguments {
        Value::Null => Ok(json!({})),
        Value::String(raw) if raw.trim().is_empty() => Ok(json!({})),
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| LLMError::UnexpectedResponse(format!("tool arguments are not JSON: {e}"))),
        other => Ok(other),
    }
}

fn parse_response_message(msg: ChatResponseMessage) -> Result<Message> {
    let text = msg.content.filter(|c| !c.is_empty());
    let mut blocks: Vec<ContentBlock> = text.map(|text| ContentBlock::Text { text }).into_iter().collect();

    for call in msg.tool_calls.unwrap_or_default() {
        blocks.push(ContentBlock::ToolUse {
            id: call
                .id
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
            name: call.function.name,
            input: decode_arguments(call.function.arguments)?,
        });
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }
    Ok(Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(blocks)),
    })
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" | "eos_token" | "" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        other => {
            debug!(finish_reason = other, "Treating unknown finish reason as end of turn");
            StopReason::EndTurn
        }
    }
}
