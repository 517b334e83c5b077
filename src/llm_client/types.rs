use serde::Serialize;
use serde_json::Value;

// Chat completion request structures
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// What the client asks the service to do for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationRequest {
    pub instructions: String,
    pub target_language: String,
}

impl CompilationRequest {
    pub fn new(instructions: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            target_language: target_language.into(),
        }
    }

    pub fn system_prompt(&self) -> String {
        let language = &self.target_language;
        format!(
            "You are an expert programmer specializing in {language}. \
             Your task is to convert English instructions into well-structured, efficient, \
             and commented {language} code. \
             Only respond with the code - no explanations, no markdown formatting."
        )
    }

    pub fn to_chat_request(&self, model: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(self.instructions.clone()),
            ],
        }
    }
}

/// The response layouts the client knows how to read, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"choices": [{"message": {"content": ...}}]}`
    Choices(String),
    /// `{"output": {"content": ...}}`
    OutputContent(String),
    /// `{"content": ...}`
    Content(String),
}

impl ResponseShape {
    /// Match a decoded payload against each shape. The first match wins.
    ///
    /// A non-empty `choices` list always claims the payload; a first choice
    /// with no message content yields an empty string so the caller reports
    /// an empty artifact instead of a shape mismatch.
    pub fn detect(payload: &Value) -> Option<Self> {
        if let Some(first) = payload.get("choices").and_then(Value::as_array).and_then(|c| c.first()) {
            return match first.get("message").and_then(|m| m.get("content")) {
                Some(Value::String(text)) => Some(ResponseShape::Choices(text.clone())),
                None | Some(Value::Null) => Some(ResponseShape::Choices(String::new())),
                Some(_) => None,
            };
        }

        if let Some(text) = payload
            .get("output")
            .and_then(|o| o.get("content"))
            .and_then(Value::as_str)
        {
            return Some(ResponseShape::OutputContent(text.to_string()));
        }

        payload
            .get("content")
            .and_then(Value::as_str)
            .map(|text| ResponseShape::Content(text.to_string()))
    }

    pub fn into_text(self) -> String {
        match self {
            ResponseShape::Choices(text)
            | ResponseShape::OutputContent(text)
            | ResponseShape::Content(text) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choices_shape() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "print(1)"}}]});
        assert_eq!(ResponseShape::detect(&payload), Some(ResponseShape::Choices("print(1)".to_string())));
    }

    #[test]
    fn test_choices_take_priority() {
        let payload = json!({
            "choices": [{"message": {"content": "first"}}],
            "output": {"content": "second"},
            "content": "third"
        });
        assert_eq!(ResponseShape::detect(&payload).unwrap().into_text(), "first");
    }

    #[test]
    fn test_empty_choices_fall_through() {
        let payload = json!({"choices": [], "output": {"content": "second"}});
        assert_eq!(ResponseShape::detect(&payload), Some(ResponseShape::OutputContent("second".to_string())));
    }

    #[test]
    fn test_choice_without_content_is_empty() {
        let payload = json!({"choices": [{"finish_reason": "length"}]});
        assert_eq!(ResponseShape::detect(&payload), Some(ResponseShape::Choices(String::new())));
    }

    #[test]
    fn test_top_level_content() {
        let payload = json!({"content": "fn main() {}"});
        assert_eq!(ResponseShape::detect(&payload), Some(ResponseShape::Content("fn main() {}".to_string())));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(ResponseShape::detect(&json!({"result": "x"})), None);
        assert_eq!(ResponseShape::detect(&json!({"content": 42})), None);
        assert_eq!(ResponseShape::detect(&json!("just a string")), None);
    }

    #[test]
    fn test_chat_request_messages() {
        let request = CompilationRequest::new("Print hello", "python").to_chat_request("some/model");
        assert_eq!(request.model, "some/model");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("python"));
        assert_eq!(request.messages[1], ChatMessage::user("Print hello"));
    }
}
