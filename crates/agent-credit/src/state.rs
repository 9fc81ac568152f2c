//! Conversation state shared by every node

use agent_core::State;
use agent_llm::Message;

/// Ordered message history of one assessment
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    /// Every message so far, append-only
    pub messages: Vec<Message>,
    /// Company under assessment
    pub company_id: String,
}

impl ConversationState {
    /// Start a conversation with the opening request
    pub fn new(company_id: impl Into<String>, request: Message) -> Self {
        Self {
            messages: vec![request],
            company_id: company_id.into(),
        }
    }

    /// Most recent message
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether the most recent message asks for tools
    pub fn has_pending_tool_calls(&self) -> bool {
        self.last_message().is_some_and(Message::has_tool_calls)
    }

    /// Number of fallback and failure notices in the history
    pub fn system_notices(&self) -> usize {
        self.messages.iter().filter(|m| m.is_system()).count()
    }
}

impl State for ConversationState {
    type Update = Vec<Message>;

    fn apply(&mut self, update: Vec<Message>) {
        self.messages.extend(update);
    }
}
