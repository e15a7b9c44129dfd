//! Chat service wire types

use serde::{Deserialize, Serialize};

use crate::config::Llm;
use crate::session::Message;

/// Body for `/chat-historia/iniciar` and `/chat-historia/historial`
#[derive(Debug, Clone, Serialize)]
pub struct UserRequest<'a> {
    #[serde(rename = "usuario")]
    pub user_name: &'a str,
    pub llm: Llm,
}

/// Body for `/chat-historia/enviar-mensaje`
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    #[serde(rename = "usuario")]
    pub user_name: &'a str,
    #[serde(rename = "pregunta")]
    pub question: &'a str,
    pub llm: Llm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartChatResponse {
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(rename = "respuesta")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(rename = "historial", default)]
    pub history: Vec<Message>,
}
