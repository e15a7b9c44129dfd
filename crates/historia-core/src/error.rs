//! Error types for historia-core

use thiserror::Error;

/// Main error type for historia-core
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any remote call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// The chat service answered with a failure, a malformed body,
    /// or could not be reached in time
    #[error("Error al {operation}: {detail}")]
    Remote {
        operation: Operation,
        detail: String,
    },

    /// History could not be loaded; the session continues without it
    #[error("Error al obtener el historial: {0}")]
    HistoryUnavailable(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Session already active for user: {0}")]
    SessionActive(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn remote(operation: Operation, detail: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            detail: detail.into(),
        }
    }

    /// Raw detail text for remote failures, as given by the service
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Remote { detail, .. } | Self::HistoryUnavailable(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}

/// Remote operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StartChat,
    SendMessage,
    FetchHistory,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::StartChat => "iniciar el chat",
            Self::SendMessage => "enviar el mensaje",
            Self::FetchHistory => "obtener el historial",
        };
        f.write_str(text)
    }
}

/// Result type alias for historia-core
pub type Result<T> = std::result::Result<T, Error>;
