//! Chat service HTTP client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, Llm};
use crate::error::{Error, Operation, Result};
use crate::session::Message;

use super::ChatService;
use super::types::*;

/// HTTP client for the chat-historia API
#[derive(Clone)]
pub struct HttpChatService {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl HttpChatService {
    /// Create a new client from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();

        info!("Chat service client initialized for: {}", base_url);

        Ok(Self {
            client,
            api_key: config.key.clone(),
            base_url,
            timeout,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, operation: Operation) -> String {
        let path = match operation {
            Operation::StartChat => "iniciar",
            Operation::SendMessage => "enviar-mensaje",
            Operation::FetchHistory => "historial",
        };
        format!("{}/chat-historia/{}", self.base_url, path)
    }

    /// POST a JSON body and decode a 200 response
    async fn post<B, R>(&self, operation: Operation, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(operation);

        debug!("Sending request to chat service: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        if status != StatusCode::OK {
            warn!("Chat service error ({}): {} - {}", operation, status, text);
            return Err(Error::remote(operation, text));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::remote(
                operation,
                format!("Failed to parse response: {} - {}", e, text),
            )
        })
    }

    fn transport_error(&self, operation: Operation, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            warn!("Chat service request timed out ({})", operation);
            Error::remote(
                operation,
                format!("request timed out after {}s", self.timeout.as_secs()),
            )
        } else {
            warn!("Chat service request failed ({}): {}", operation, e);
            Error::remote(operation, format!("HTTP request failed: {}", e))
        }
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn start_chat(&self, user_name: &str, llm: Llm) -> Result<String> {
        let body = UserRequest { user_name, llm };
        let response: StartChatResponse = self.post(Operation::StartChat, &body).await?;

        match response.thread_id {
            Some(thread_id) if !thread_id.is_empty() => {
                info!("Chat started for {} (thread {})", user_name, thread_id);
                Ok(thread_id)
            }
            _ => Err(Error::remote(
                Operation::StartChat,
                "response did not include a thread_id",
            )),
        }
    }

    async fn send_message(&self, user_name: &str, question: &str, llm: Llm) -> Result<String> {
        let body = SendMessageRequest {
            user_name,
            question,
            llm,
        };
        let response: SendMessageResponse = self.post(Operation::SendMessage, &body).await?;

        match response.answer {
            Some(answer) if !answer.is_empty() => Ok(answer),
            _ => Err(Error::remote(
                Operation::SendMessage,
                "response did not include a respuesta",
            )),
        }
    }

    async fn fetch_history(&self, user_name: &str, llm: Llm) -> Result<Vec<Message>> {
        let body = UserRequest { user_name, llm };
        let response: HistoryResponse = self.post(Operation::FetchHistory, &body).await?;

        debug!("Fetched {} history entries for {}", response.history.len(), user_name);
        Ok(response.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> HttpChatService {
        HttpChatService::new(&ApiConfig {
            url: format!("{}/dev/", server.uri()),
            key: "test-key".to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let service = HttpChatService::new(&ApiConfig {
            url: "https://example.com/dev///".to_string(),
            key: "k".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(service.base_url(), "https://example.com/dev");
        assert_eq!(
            service.endpoint(Operation::SendMessage),
            "https://example.com/dev/chat-historia/enviar-mensaje"
        );
    }

    #[tokio::test]
    async fn test_start_chat_sends_user_and_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/iniciar"))
            .and(header("x-api-key", "test-key"))
            .and(body_json(json!({"usuario": "Ana", "llm": "OpenAI"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"thread_id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;

        let thread_id = service_for(&server)
            .start_chat("Ana", Llm::OpenAi)
            .await
            .unwrap();
        assert_eq!(thread_id, "t1");
    }

    #[tokio::test]
    async fn test_start_chat_missing_thread_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/iniciar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .start_chat("Ana", Llm::OpenAi)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Remote {
                operation: Operation::StartChat,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_200_carries_raw_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/enviar-mensaje"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal server error"))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .send_message("Ana", "hola", Llm::DeepSeek)
            .await
            .unwrap_err();
        assert_eq!(err.detail(), Some("Internal server error"));
    }

    #[tokio::test]
    async fn test_send_message_returns_answer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/enviar-mensaje"))
            .and(body_json(
                json!({"usuario": "Ana", "pregunta": "¿cómo estás?", "llm": "DeepSeek"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"respuesta": "bien"})))
            .mount(&server)
            .await;

        let answer = service_for(&server)
            .send_message("Ana", "¿cómo estás?", Llm::DeepSeek)
            .await
            .unwrap();
        assert_eq!(answer, "bien");
    }

    #[tokio::test]
    async fn test_malformed_body_is_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/enviar-mensaje"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .send_message("Ana", "hola", Llm::OpenAi)
            .await
            .unwrap_err();
        let detail = err.detail().unwrap();
        assert!(detail.starts_with("Failed to parse response"));
        assert!(detail.ends_with("not json"));
    }

    #[tokio::test]
    async fn test_fetch_history_keeps_service_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/historial"))
            .and(body_json(json!({"usuario": "Ana", "llm": "OpenAI"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "historial": [
                    {"rol": "IA", "contenido": "bien"},
                    {"rol": "usuario", "contenido": "hola"}
                ]
            })))
            .mount(&server)
            .await;

        let history = service_for(&server)
            .fetch_history("Ana", Llm::OpenAi)
            .await
            .unwrap();
        assert_eq!(
            history,
            vec![Message::assistant("bien"), Message::user("hola")]
        );
    }

    #[tokio::test]
    async fn test_timeout_is_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dev/chat-historia/enviar-mensaje"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"respuesta": "tarde"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = service_for(&server)
            .send_message("Ana", "hola", Llm::OpenAi)
            .await
            .unwrap_err();
        assert_eq!(err.detail(), Some("request timed out after 1s"));
    }
}
