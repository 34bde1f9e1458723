//! Gemini `generateContent` adapter.
//!
//! Auth is an API key passed as a query parameter (`key={api_key}`); the
//! request body is the ordered turn list as `contents`, the reply is the
//! first candidate's text parts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use chat_relay_core::{CompletionBackend, CompletionError, Role, Turn};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; never logged.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Bound on the whole request round trip.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Config with defaults for everything except the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Completion backend talking to the Gemini API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from config.
    ///
    /// # Errors
    /// Returns `CompletionError::Transport` if the HTTP client cannot be
    /// constructed.
    pub fn from_config(config: GeminiConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key,
            model: config.model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, turns: &[Turn]) -> Result<String, CompletionError> {
        tracing::debug!(model = %self.model, turns = turns.len(), "requesting completion");

        let response = self
            .http
            .post(self.generate_url())
            .json(&build_body(turns))
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        extract_reply(&body)
    }
}

fn build_body(turns: &[Turn]) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|turn| {
            json!({
                "role": wire_role(turn.role),
                "parts": [{"text": turn.text}],
            })
        })
        .collect();
    json!({ "contents": contents })
}

/// Gemini knows only `user` and `model`; the system instruction rides as a
/// leading user content.
const fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System | Role::User => "user",
        Role::Model => "model",
    }
}

fn extract_reply(body: &Value) -> Result<String, CompletionError> {
    let parts = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or(CompletionError::EmptyResponse)?;

    let mut reply = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            reply.push_str(text);
        }
    }

    if reply.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(reply)
}

fn classify_status(status: StatusCode, body: &str) -> CompletionError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return CompletionError::Auth(format!("HTTP {status}"));
    }
    // Gemini reports a bad key as a 400 with this marker in the error body.
    if status == StatusCode::BAD_REQUEST && body.contains("API_KEY_INVALID") {
        return CompletionError::Auth("API key rejected".to_string());
    }

    let detail: String = body.chars().take(200).collect();
    CompletionError::Transport(format!("HTTP {status}: {detail}"))
}
