//! Process-wide settings, assembled once at startup and passed down by
//! reference to the client, pipeline and watch loop.

use crate::error::{CompilerError, Result};

pub const DEFAULT_MODEL: &str = "anthropic/claude-3-opus-20240229";
pub const DEFAULT_LANGUAGE: &str = "javascript";
pub const DEFAULT_API_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DOCUMENT_EXTENSION: &str = "gpt";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for compiling documents
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// API key for the generation service
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Target language when a document has no `@language`
    pub default_language: String,
    /// Chat completions endpoint
    pub api_endpoint: String,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout_seconds: Option<u64>,
    /// Extension (without the dot) of instruction documents
    pub document_extension: String,
    /// Upper bound on compilations running at once in watch mode
    pub max_concurrent: usize,
}

impl CompilerConfig {
    /// Build a config with the given key and every other field defaulted.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout_seconds: None,
            document_extension: DOCUMENT_EXTENSION.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Recognized variables:
    ///
    /// * `OPENROUTER_API_KEY` (required)
    /// * `AI_MODEL`
    /// * `DEFAULT_OUTPUT_LANG`
    /// * `GPT_COMPILER_API_URL`
    /// * `GPT_COMPILER_TIMEOUT_SECS`
    /// * `GPT_COMPILER_MAX_CONCURRENT`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENROUTER_API_KEY").ok_or_else(|| {
            CompilerError::MissingCredential("OPENROUTER_API_KEY is not set".to_string())
        })?;

        let mut config = Self::new(api_key);

        if let Some(model) = get("AI_MODEL") {
            config.model = model;
        }
        if let Some(language) = get("DEFAULT_OUTPUT_LANG") {
            config.default_language = language;
        }
        if let Some(endpoint) = get("GPT_COMPILER_API_URL") {
            config.api_endpoint = endpoint;
        }
        if let Some(timeout) = get("GPT_COMPILER_TIMEOUT_SECS") {
            let seconds = timeout.parse::<u64>().map_err(|_| {
                CompilerError::InvalidConfig(format!(
                    "GPT_COMPILER_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    timeout
                ))
            })?;
            config.timeout_seconds = Some(seconds);
        }
        if let Some(limit) = get("GPT_COMPILER_MAX_CONCURRENT") {
            config.max_concurrent = match limit.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(CompilerError::InvalidConfig(format!(
                        "GPT_COMPILER_MAX_CONCURRENT must be a positive integer, got '{}'",
                        limit
                    )))
                }
            };
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    /// True when `path` carries the document extension.
    pub fn is_document(&self, path: &std::path::Path) -> bool {
        crate::watch_loop::is_document(path, &self.document_extension)
    }
}
