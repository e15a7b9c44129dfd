//! historia-core: chat-historia client library
//!
//! チャットサービスとの通信、セッション状態管理、
//! 設定読み込みのコア機能を提供します。
//!
//! ## Usage
//!
//! ```rust,ignore
//! use historia_core::{Config, HttpChatService, Llm, SessionController};
//!
//! let config = Config::load()?;
//! let service = HttpChatService::new(&config.api)?;
//! let mut controller = SessionController::new(service);
//!
//! controller.start_session("Ana", Llm::OpenAi).await?;
//! if let Some(answer) = controller.send_message("¿cómo estás?").await? {
//!     println!("{}", answer);
//! }
//! controller.end_session();
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ChatService, HttpChatService};
pub use config::{ApiConfig, ChatConfig, Config, Llm};
pub use error::{Error, Operation, Result};
pub use session::{
    ConversationHistory, FetchedHistory, Message, Role, Session, SessionController, SessionStarted,
};
