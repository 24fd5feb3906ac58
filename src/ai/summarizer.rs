use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const CLAUDE_MODEL: &str = "claude-3-haiku-20240307";

/// Opaque text-generation capability behind the summary gateway and the
/// assistant.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Multi-turn completion under a system prompt. Generators without
    /// native chat support get the conversation flattened into one prompt.
    async fn chat(
        &self,
        system: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        let mut prompt = format!("{system}\n\n");
        for message in messages {
            prompt.push_str(&format!("{}: {}\n\n", message.role, message.content));
        }
        self.generate(prompt.trim_end(), max_tokens).await
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

pub struct ClaudeClient {
    client: Client,
    api_key: String,
}

impl ClaudeClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }

    async fn send(&self, request: MessageRequest) -> Result<String> {
        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let text = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ClaudeApi("empty completion".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        self.send(MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens,
            system: None,
            messages: vec![ChatMessage::user(prompt)],
        })
        .await
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String> {
        self.send(MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens,
            system: Some(system.to_string()),
            messages: messages.to_vec(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_response_blocks() {
        let body = r#"{"content":[{"type":"text","text":"Short summary."}]}"#;
        let parsed: MessageResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content[0].text.as_deref(), Some("Short summary."));
    }

    #[test]
    fn request_serializes_model_and_tokens() {
        let request = MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens: 300,
            system: None,
            messages: vec![ChatMessage::user("hi")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn chat_request_carries_system_prompt() {
        let request = MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens: 1024,
            system: Some("You are helpful.".to_string()),
            messages: vec![ChatMessage::user("hi")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "You are helpful.");
    }

    struct Recorder;

    #[async_trait]
    impl TextGenerator for Recorder {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn default_chat_flattens_conversation() {
        let messages = [
            ChatMessage::user("Best Dialga counter?"),
            ChatMessage {
                role: "assistant".to_string(),
                content: "Dialga.".to_string(),
            },
        ];
        let prompt = Recorder.chat("Be brief.", &messages, 100).await.unwrap();
        assert_eq!(
            prompt,
            "Be brief.\n\nuser: Best Dialga counter?\n\nassistant: Dialga."
        );
    }
}
