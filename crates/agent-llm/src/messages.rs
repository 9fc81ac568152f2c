//! Message types for LLM communication
//!
//! A conversation is an ordered list of [`Message`]s. Each message has one of
//! four roles (system, user, assistant, tool) and either plain text or a list
//! of [`ContentBlock`]s. Assistant messages carry tool calls as
//! [`ContentBlock::ToolUse`] blocks; tool messages answer exactly one call
//! through [`ContentBlock::ToolResult`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Instructions, and the fallback notices inserted into a run
    System,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// A call the model asks the runtime to perform
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The runtime's answer to the `ToolUse` with the same id
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Readable text of the block; tool uses have none
    fn readable(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::ToolResult { content, .. } => Some(content),
            Self::ToolUse { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    fn plain(role: Role, text: String) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text)),
        }
    }

    fn from_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Blocks(blocks)),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text.into())
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text.into())
    }

    /// Assistant turn requesting `calls`; an empty `text` adds no text block
    pub fn assistant_with_tool_calls(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let text = text.into();
        let lead = (!text.is_empty()).then(|| ContentBlock::Text { text });
        let uses = calls.into_iter().map(|call| ContentBlock::ToolUse {
            id: call.id,
            name: call.name,
            input: call.arguments,
        });
        Self::from_blocks(Role::Assistant, lead.into_iter().chain(uses).collect())
    }

    pub fn tool_result(tool_use_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self::answer(tool_use_id.into(), result.into(), None)
    }

    /// Tool answer marked as failed
    pub fn tool_error(tool_use_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::answer(tool_use_id.into(), error.into(), Some(true))
    }

    fn answer(tool_use_id: String, content: String, is_error: Option<bool>) -> Self {
        Self::from_blocks(
            Role::Tool,
            vec![ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }],
        )
    }

    fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks,
            _ => &[],
        }
    }

    /// First readable text
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(MessageContent::Text(text)) => Some(text),
            _ => self.blocks().iter().find_map(ContentBlock::readable),
        }
    }

    /// Every readable text, newline separated
    pub fn text_content(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(text)) => text.clone(),
            _ => self
                .blocks()
                .iter()
                .filter_map(ContentBlock::readable)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Copy with the readable payload replaced by `text`
    ///
    /// A tool answer keeps its call id and an assistant turn keeps its
    /// tool uses.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        let text = text.into();
        let Some(MessageContent::Blocks(blocks)) = &self.content else {
            return Self::plain(self.role, text);
        };

        let mut blocks = blocks.clone();
        let answer = blocks
            .iter_mut()
            .rev()
            .find(|b| matches!(b, ContentBlock::ToolResult { .. }));
        if let Some(ContentBlock::ToolResult { content, .. }) = answer {
            *content = text;
        } else {
            blocks.retain(|b| !matches!(b, ContentBlock::Text { .. }));
            blocks.insert(0, ContentBlock::Text { text });
        }
        Self::from_blocks(self.role, blocks)
    }

    /// Requested calls in the order the model listed them
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.blocks()
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Id of the call this message answers
    pub fn tool_result_id(&self) -> Option<&str> {
        self.blocks().iter().find_map(|b| match b {
            ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        })
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}
