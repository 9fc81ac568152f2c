//! Google Gemini provider implementation
//!
//! Talks to the `generateContent` REST endpoint. Gemini supports native
//! function calling and a separate `systemInstruction`, so handles built on
//! this provider report full native capabilities.
//! See: https://ai.google.dev/api/generate-content
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::{GeminiConfig, GeminiProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = GeminiProvider::with_config(GeminiConfig::new("api-key"))?;
//! let request = CompletionRequest::builder("gemini-1.5-flash")
//!     .add_message(Message::system("You are a credit analyst."))
//!     .add_message(Message::user("Summarize the liquidity of company 7."))
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
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Key and transport settings for the Generative Language API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Sent as `x-goog-api-key`
    pub api_key: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Public v1beta endpoint with a one minute transport timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: GEMINI_API_BASE.to_string(),
            timeout_secs: 60,
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
}

pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Fails on a blank key without touching the network
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError("GOOGLE_API_KEY is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        let body = build_request(request);

        let response = self
            .client
            .post(self.endpoint(&model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_response(gemini_response)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn build_request(request: CompletionRequest) -> GeminiRequest {
    let (system, contents) = convert_messages(request.messages);

    GeminiRequest {
        contents,
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part {
                text: Some(text),
                ..Part::default()
            }],
        }),
        tools: request.tools.as_deref().map(convert_tools),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

/// Split system instructions from the turn list
///
/// System messages are joined into the `systemInstruction`. Adjacent turns
/// with the same role are coalesced, since Gemini expects user and model
/// turns to alternate; this also groups consecutive tool results into one
/// user turn answering the preceding function calls.
fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<Content>) {
    let mut system_parts = Vec::new();
    let mut contents: Vec<Content> = Vec::new();
    let mut call_names: HashMap<String, String> = HashMap::new();

    for msg in messages {
        let (role, parts) = match msg.role {
            Role::System => {
                let text = msg.text_content();
                if !text.is_empty() {
                    system_parts.push(text);
                }
                continue;
            }
            Role::User => (
                "user",
                vec![Part {
                    text: Some(msg.text_content()),
                    ..Part::default()
                }],
            ),
            Role::Assistant => ("model", assistant_parts(msg.content, &mut call_names)),
            Role::Tool => ("user", tool_result_parts(msg.content, &call_names)),
        };

        if let Some(previous) = contents
            .last_mut()
            .filter(|c| c.role.as_deref() == Some(role))
        {
            previous.parts.extend(parts);
        } else {
            contents.push(Content {
                role: Some(role.to_string()),
                parts,
            });
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system, contents)
}

fn assistant_parts(
    content: Option<MessageContent>,
    call_names: &mut HashMap<String, String>,
) -> Vec<Part> {
    let mut parts = Vec::new();
    match content {
        Some(MessageContent::Text(text)) => parts.push(Part {
            text: Some(text),
            ..Part::default()
        }),
        Some(MessageContent::Blocks(blocks)) => {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } if !text.is_empty() => parts.push(Part {
                        text: Some(text),
                        ..Part::default()
                    }),
                    ContentBlock::ToolUse { id, name, input } => {
                        call_names.insert(id.clone(), name.clone());
                        parts.push(Part {
                            function_call: Some(FunctionCall {
                                id: Some(id),
                                name,
                                args: input,
                            }),
                            ..Part::default()
                        });
                    }
                    _ => {}
                }
            }
        }
        None => {}
    }

    if parts.is_empty() {
        parts.push(Part {
            text: Some(String::new()),
            ..Part::default()
        });
    }
    parts
}

fn tool_result_parts(
    content: Option<MessageContent>,
    call_names: &HashMap<String, String>,
) -> Vec<Part> {
    let Some(MessageContent::Blocks(blocks)) = content else {
        return Vec::new();
    };

    blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                let name = call_names
                    .get(&tool_use_id)
                    .cloned()
                    .unwrap_or_else(|| tool_use_id.clone());
                Some(Part {
                    function_response: Some(FunctionResponse {
                        name,
                        response: json!({ "content": content }),
                    }),
                    ..Part::default()
                })
            }
            _ => None,
        })
        .collect()
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<GeminiTool> {
    vec![GeminiTool {
        function_declarations: tools
            .iter()
            .map(|tool| FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: to_gemini_schema(&tool.input_schema),
            })
            .collect(),
    }]
}

/// Convert a JSON schema into Gemini's OpenAPI subset
///
/// Type names are upper-cased and keywords Gemini rejects are dropped.
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut converted = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "$schema" | "additionalProperties" | "default" | "title" => {}
                    "type" => {
                        let upper = value
                            .as_str()
                            .map_or_else(|| value.clone(), |t| Value::String(t.to_uppercase()));
                        converted.insert(key.clone(), upper);
                    }
                    _ => {
                        converted.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

fn parse_response(response: GeminiResponse) -> Result<CompletionResponse> {
    let usage = response.usage_metadata.unwrap_or_default();
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        let feedback = response
            .prompt_feedback
            .map(|f| f.to_string())
            .unwrap_or_default();
        LLMError::UnexpectedResponse(format!("No candidates in response {feedback}"))
    })?;

    let mut blocks = Vec::new();
    let mut tool_call_count = 0;
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            if !text.is_empty() {
                blocks.push(ContentBlock::Text { text });
            }
        }
        if let Some(call) = part.function_call {
            tool_call_count += 1;
            blocks.push(ContentBlock::ToolUse {
                id: call
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.name,
                input: if call.args.is_null() { json!({}) } else { call.args },
            });
        }
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    debug!(
        finish_reason = %finish_reason,
        tool_calls = tool_call_count,
        "Received Gemini response"
    );

    Ok(CompletionResponse {
        message: Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        },
        stop_reason: map_stop_reason(&finish_reason, tool_call_count > 0),
        usage: TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        },
    })
}

fn map_stop_reason(reason: &str, has_tool_calls: bool) -> StopReason {
    if has_tool_calls {
        return StopReason::ToolUse;
    }
    match reason {
        "MAX_TOKENS" => StopReason::MaxTokens,
        "STOP" | "" => StopReason::EndTurn,
        other => {
            debug!("Gemini finished with reason {}", other);
            StopReason::EndTurn
        }
    }
}
