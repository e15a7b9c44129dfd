//! Chat service contract
//!
//! The remote service owns threads, message generation and stored history.
//! The client only sees three request/response operations.

mod client;
mod types;

pub use client::HttpChatService;
pub use types::*;

use async_trait::async_trait;

use crate::Result;
use crate::config::Llm;
use crate::session::Message;

/// Remote chat service used by the session controller
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create or resume the thread for a user; returns its identifier
    async fn start_chat(&self, user_name: &str, llm: Llm) -> Result<String>;

    /// Send a question and return the generated answer
    async fn send_message(&self, user_name: &str, question: &str, llm: Llm) -> Result<String>;

    /// Stored history for a user/model pair, in the order the service keeps it
    async fn fetch_history(&self, user_name: &str, llm: Llm) -> Result<Vec<Message>>;
}
