//! Session types

use serde::{Deserialize, Serialize};

use crate::config::Llm;

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire value used by the chat service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "usuario",
            Self::Assistant => "IA",
        }
    }
}

// Anything that is not the user's own turn is shown as the assistant
impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "usuario" {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Single conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "contenido")]
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    /// Label shown next to the message
    pub fn label(&self) -> &'static str {
        match self.role {
            Role::User => "Tú",
            Role::Assistant => "IA",
        }
    }
}

/// Conversation entries, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the history loaded from the service, keeping its order
    pub fn from_initial(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Record a completed exchange at the front.
    ///
    /// Afterwards the history reads `[answer, question, ...older]`.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.insert(0, Message::user(question));
        self.messages.insert(0, Message::assistant(answer));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Active chat session
#[derive(Debug, Clone)]
pub struct Session {
    user_name: String,
    thread_id: String,
    llm: Llm,
    history: ConversationHistory,
}

impl Session {
    pub(crate) fn new(
        user_name: impl Into<String>,
        thread_id: impl Into<String>,
        llm: Llm,
        history: ConversationHistory,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            thread_id: thread_id.into(),
            llm,
            history,
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Thread identifier assigned by the service; fixed for the session
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn llm(&self) -> Llm {
        self.llm
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }
}
