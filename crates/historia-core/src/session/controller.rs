//! Session controller
//!
//! Owns the single session of a client and mediates every call to the
//! chat service:
//!
//! ```text
//! [LOGGED_OUT] --start_session ok--> [ACTIVE]
//! [ACTIVE]     --send_message-----> [ACTIVE]
//! [ACTIVE]     --end_session------> [LOGGED_OUT]
//! ```

use tracing::{debug, info, warn};

use crate::api::ChatService;
use crate::config::Llm;
use crate::session::{ConversationHistory, Message, Session};
use crate::{Error, Result};

/// Outcome of a successful `start_session`
#[derive(Debug)]
pub struct SessionStarted {
    pub thread_id: String,
    /// Set when the initial history could not be loaded.
    /// The session is active regardless.
    pub history_error: Option<Error>,
}

/// Stored history as loaded by `fetch_history`
#[derive(Debug, Default)]
pub struct FetchedHistory {
    /// Messages most recent first; empty when loading failed
    pub messages: Vec<Message>,
    /// `Error::HistoryUnavailable` when loading failed
    pub error: Option<Error>,
}

/// Client-side session state machine
pub struct SessionController<S> {
    service: S,
    session: Option<Session>,
}

impl<S: ChatService> SessionController<S> {
    /// Create a logged-out controller
    pub fn new(service: S) -> Self {
        Self {
            service,
            session: None,
        }
    }

    /// Underlying chat service
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Conversation history of the active session, most recent first
    pub fn history(&self) -> Option<&ConversationHistory> {
        self.session.as_ref().map(Session::history)
    }

    /// Start or resume the thread for `user_name` and load its history.
    ///
    /// Whether the service resumes an existing thread or creates a new one
    /// is up to the service; the returned identifier is used as is.
    pub async fn start_session(&mut self, user_name: &str, llm: Llm) -> Result<SessionStarted> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(Error::Validation(
                "El nombre de usuario no puede estar vacío".to_string(),
            ));
        }
        if let Some(session) = &self.session {
            return Err(Error::SessionActive(session.user_name().to_string()));
        }

        let thread_id = self.service.start_chat(user_name, llm).await?;

        let FetchedHistory {
            messages: history,
            error: history_error,
        } = self.fetch_history(user_name, llm).await;

        info!(
            "Session active for {} (thread {}, {} history entries)",
            user_name,
            thread_id,
            history.len()
        );

        self.session = Some(Session::new(
            user_name,
            thread_id.clone(),
            llm,
            ConversationHistory::from_initial(history),
        ));

        Ok(SessionStarted {
            thread_id,
            history_error,
        })
    }

    /// Send a question in the active session.
    ///
    /// Whitespace-only input is ignored and yields `Ok(None)` without
    /// contacting the service. On success the exchange is recorded at the
    /// front of the history; on failure the history is left untouched.
    pub async fn send_message(&mut self, question: &str) -> Result<Option<String>> {
        let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;

        if question.trim().is_empty() {
            debug!("Ignoring empty question");
            return Ok(None);
        }

        let answer = self
            .service
            .send_message(session.user_name(), question, session.llm())
            .await?;

        session.history_mut().record_exchange(question, answer.clone());
        debug!(
            "Recorded exchange for {} ({} entries)",
            session.user_name(),
            session.history().len()
        );

        Ok(Some(answer))
    }

    /// Stored history for a user/model pair.
    ///
    /// Failures are logged and produce an empty list, with the cause kept
    /// as `Error::HistoryUnavailable`.
    pub async fn fetch_history(&self, user_name: &str, llm: Llm) -> FetchedHistory {
        match self.service.fetch_history(user_name, llm).await {
            Ok(messages) => FetchedHistory {
                messages,
                error: None,
            },
            Err(e) => {
                warn!("History unavailable for {}: {}", user_name, e);
                let detail = e.detail().map(str::to_string).unwrap_or_else(|| e.to_string());
                FetchedHistory {
                    messages: Vec::new(),
                    error: Some(Error::HistoryUnavailable(detail)),
                }
            }
        }
    }

    /// Log out locally. The service is not notified.
    pub fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Session ended for {}", session.user_name());
        }
    }
}
