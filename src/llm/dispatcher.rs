//! Single-turn queries against a chat-completions endpoint.

use crate::config::LlmConfig;
use crate::error::{QueryError, Result};
use crate::llm::types::{ChatMessage, ChatRequest, ChatResponse};

use anyhow::Context as _;

/// Prepended to every question, separated by `": "`.
pub const INSTRUCTION_PREFIX: &str = "Reply in plain text only, with no markdown, markup or \
     formatting of any kind. Keep the whole answer under 250 characters and be as concise as \
     possible";

/// Returned when the provider answers without any choices.
pub const EMPTY_RESPONSE_TEXT: &str = "No response received.";

/// `Ok(text)` on success, otherwise the classified failure.
pub type QueryOutcome = std::result::Result<String, QueryError>;

/// Sends payloads to the configured text-generation endpoint.
pub struct QueryDispatcher {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl QueryDispatcher {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request body for one question.
    pub fn build_request(&self, payload: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: format!("{INSTRUCTION_PREFIX}: {payload}"),
            }],
        }
    }

    /// Ask one question. Makes exactly one attempt.
    pub async fn ask(&self, payload: &str) -> QueryOutcome {
        let request = self.build_request(payload);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|error| QueryError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            QueryError::Transport(format!("failed to read response body: {error}"))
        })?;

        tracing::debug!(%status, model = %self.model, "text-generation response received");

        interpret_response(&body)
    }
}

/// Map a raw response body onto a query outcome.
pub fn interpret_response(body: &str) -> QueryOutcome {
    let mut response: ChatResponse =
        serde_json::from_str(body).map_err(|_| QueryError::Protocol(body.to_string()))?;

    if let Some(error) = response.error.take() {
        return Err(QueryError::Upstream(error.message.unwrap_or_default()));
    }

    Ok(response
        .first_content()
        .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    use axum::Router;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Captured {
        authorization: Option<String>,
        content_type: Option<String>,
        body: Option<serde_json::Value>,
    }

    type Shared = Arc<Mutex<Captured>>;

    /// Serve `reply` for every POST and record what was received.
    async fn spawn_endpoint(reply: &'static str) -> (String, Shared) {
        let captured = Shared::default();
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(captured): State<Shared>, headers: HeaderMap, body: String| async move {
                        let mut captured = captured.lock().expect("capture lock poisoned");
                        captured.authorization = headers
                            .get("authorization")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        captured.content_type = headers
                            .get("content-type")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        captured.body = serde_json::from_str(&body).ok();
                        reply
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let address = listener.local_addr().expect("listener has address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (format!("http://{address}/v1/chat/completions"), captured)
    }

    fn dispatcher_for(api_url: String) -> QueryDispatcher {
        QueryDispatcher::new(&LlmConfig {
            api_key: "sk-test".into(),
            api_url,
            model: "gpt-3.5-turbo".into(),
            request_timeout: Duration::from_secs(5),
        })
        .expect("dispatcher should build")
    }

    #[test]
    fn first_choice_is_the_answer() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Paris"}},
            {"message":{"role":"assistant","content":"Lyon"}}]}"#;
        assert_eq!(interpret_response(body), Ok("Paris".to_string()));
    }

    #[test]
    fn empty_choices_fall_back_to_placeholder() {
        let outcome = interpret_response(r#"{"choices":[],"error":null}"#);
        assert_eq!(outcome, Ok(EMPTY_RESPONSE_TEXT.to_string()));
    }

    #[test]
    fn error_object_is_upstream_failure() {
        let error = interpret_response(r#"{"error":{"message":"rate limited"}}"#)
            .expect_err("error object must fail");
        assert_eq!(error, QueryError::Upstream("rate limited".into()));
        assert_eq!(error.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn full_error_object_is_accepted() {
        let body = r#"{"error":{"message":"bad key","type":"invalid_request_error",
            "param":null,"code":"invalid_api_key"}}"#;
        let error = interpret_response(body).expect_err("error object must fail");
        assert_eq!(error.detail(), "bad key");
    }

    #[test]
    fn content_only_message_is_accepted() {
        let outcome = interpret_response(r#"{"choices":[{"message":{"content":"hi"}}]}"#);
        assert_eq!(outcome, Ok("hi".to_string()));
    }

    #[test]
    fn null_or_missing_choices_fall_back_to_placeholder() {
        for body in [r#"{"choices":null}"#, r#"{}"#, r#"{"choices":null,"error":null}"#] {
            assert_eq!(
                interpret_response(body),
                Ok(EMPTY_RESPONSE_TEXT.to_string()),
                "body: {body}"
            );
        }
    }

    #[test]
    fn null_content_is_empty_text() {
        let outcome = interpret_response(r#"{"choices":[{"message":{"content":null}}]}"#);
        assert_eq!(outcome, Ok(String::new()));
        let outcome = interpret_response(r#"{"choices":[{"message":null}]}"#);
        assert_eq!(outcome, Ok(String::new()));
    }

    #[test]
    fn error_without_message_is_still_upstream() {
        let error = interpret_response(r#"{"error":{"message":null,"type":"server_error"}}"#)
            .expect_err("error object must fail");
        assert_eq!(error, QueryError::Upstream(String::new()));
    }

    #[test]
    fn unparseable_body_is_protocol_failure_with_raw_body() {
        let error = interpret_response("<html>bad gateway</html>").expect_err("must fail");
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert_eq!(error.detail(), "<html>bad gateway</html>");
    }

    #[test]
    fn request_prefixes_instruction() {
        let dispatcher = dispatcher_for("http://127.0.0.1:9/unused".into());
        let request = serde_json::to_value(dispatcher.build_request("why is the sky blue?"))
            .expect("request serializes");

        assert_eq!(request["model"], "gpt-3.5-turbo");
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(
            request["messages"][0]["content"],
            format!("{INSTRUCTION_PREFIX}: why is the sky blue?")
        );
        assert_eq!(request["messages"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn ask_sends_bearer_json_request() {
        let (url, captured) = spawn_endpoint(
            r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#,
        )
        .await;
        let dispatcher = dispatcher_for(url);

        let outcome = dispatcher.ask("meaning of life").await;
        assert_eq!(outcome, Ok("42".to_string()));

        let captured = captured.lock().expect("capture lock poisoned");
        assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test"));
        assert_eq!(captured.content_type.as_deref(), Some("application/json"));
        let body = captured.body.as_ref().expect("body should be JSON");
        assert_eq!(
            body["messages"][0]["content"],
            format!("{INSTRUCTION_PREFIX}: meaning of life")
        );
    }

    #[tokio::test]
    async fn ask_surfaces_upstream_error() {
        let (url, _captured) = spawn_endpoint(r#"{"error":{"message":"rate limited"}}"#).await;
        let outcome = dispatcher_for(url).ask("hello").await;
        assert_eq!(outcome, Err(QueryError::Upstream("rate limited".into())));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let address = listener.local_addr().expect("listener has address");
        drop(listener);

        let outcome = dispatcher_for(format!("http://{address}/v1/chat/completions"))
            .ask("hello")
            .await;
        let error = outcome.expect_err("closed port must fail");
        assert_eq!(error.kind(), ErrorKind::Transport);
    }
}
