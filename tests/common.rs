use std::sync::Arc;

use gpt_compiler::{CompilerConfig, LlmClient, Pipeline};
use serde_json::json;

pub const API_KEY: &str = "sk-test";
pub const ENDPOINT_PATH: &str = "/api/v1/chat/completions";

pub fn config_for(server: &mockito::ServerGuard) -> CompilerConfig {
    CompilerConfig::new(API_KEY).with_api_endpoint(format!("{}{}", server.url(), ENDPOINT_PATH))
}

pub fn client_for(server: &mockito::ServerGuard) -> LlmClient {
    LlmClient::new(&config_for(server)).expect("client")
}

pub fn pipeline_for(server: &mockito::ServerGuard) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(&config_for(server)).expect("pipeline"))
}

/// A chat-completions body whose first choice carries `content`.
pub fn choices_body(content: &str) -> String {
    json!({
        "id": "gen-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}
