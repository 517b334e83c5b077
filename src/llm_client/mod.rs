//! Client for the external code-generation service
//!
//! Sends one chat-completion request per document and normalizes the
//! handful of response layouts providers use into a single code string.

use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::CompilerConfig;
use crate::error::{CompilerError, Result};

pub mod types;

pub use types::{ChatMessage, ChatRequest, CompilationRequest, ResponseShape};

const REFERER: &str = "https://github.com/KaiStephens/aiCompiler";
const TITLE: &str = "AI GPT Compiler";

/// Client for the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct LlmClient {
    http_client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder
            .build()
            .map_err(|e| CompilerError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.api_endpoint.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the service for `language` code implementing `instructions`.
    ///
    /// One attempt, no retries. Returns the trimmed code on success.
    pub async fn compile(&self, instructions: &str, language: &str) -> Result<String> {
        let request = CompilationRequest::new(instructions, language);
        info!(language, model = %self.model, "Compiling");

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| CompilerError::InvalidConfig("API key is not a valid header value".to_string()))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert("HTTP-Referer", header::HeaderValue::from_static(REFERER));
        headers.insert("X-Title", header::HeaderValue::from_static(TITLE));

        let response = self
            .http_client
            .post(&self.endpoint)
            .headers(headers)
            .json(&request.to_chat_request(&self.model))
            .send()
            .await
            .map_err(|e| CompilerError::Service {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CompilerError::Service {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        if !status.is_success() {
            return Err(CompilerError::Service {
                status: Some(status.as_u16()),
                body,
            });
        }

        extract_code(&body)
    }
}

/// Pull the generated code out of a raw response body.
pub fn extract_code(body: &str) -> Result<String> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| CompilerError::ResponseShape(format!("response is not JSON ({})", e)))?;

    let shape = ResponseShape::detect(&payload)
        .ok_or_else(|| CompilerError::ResponseShape(summarize_keys(&payload)))?;
    debug!(?shape, "Matched response shape");

    let code = shape.into_text().trim().to_string();
    if code.is_empty() {
        return Err(CompilerError::EmptyArtifact);
    }
    info!(chars = code.len(), "Generated code");
    Ok(code)
}

fn summarize_keys(payload: &Value) -> String {
    match payload.as_object() {
        Some(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("top-level keys [{}]", keys.join(", "))
        }
        None => "payload is not an object".to_string(),
    }
}
