//! Session management module
//!
//! Session state, conversation history and the controller driving them.

mod controller;
mod types;

pub use controller::{FetchedHistory, SessionController, SessionStarted};
pub use types::{ConversationHistory, Message, Role, Session};
