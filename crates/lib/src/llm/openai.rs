//! OpenAI chat-completions client (https://api.openai.com/v1 by default).
//! Non-streaming only: POST /chat/completions, first choice wins.

use crate::config::OpenAiConfig;
use crate::llm::{ChatMessage, CompletionBackend, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&OpenAiConfig> for CompletionParams {
    fn from(config: &OpenAiConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Client for an OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    params: CompletionParams,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, api_key: String, params: CompletionParams) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            params,
            client: reqwest::Client::new(),
        }
    }

    /// POST /chat/completions — one choice, no stop sequence.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.params.model,
            messages,
            max_tokens: self.params.max_tokens,
            n: 1,
            stop: None,
            temperature: self.params.temperature,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: ChatCompletionResponse = res.json().await?;
        first_choice_text(data)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        self.chat(messages).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    n: u32,
    /// Serialized as `null`; the API treats that as "no stop sequence".
    stop: Option<Vec<String>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

fn first_choice_text(data: ChatCompletionResponse) -> Result<String, LlmError> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Api("response contained no choices".to_string()))?;
    Ok(choice.message.and_then(|m| m.content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn params() -> CompletionParams {
        CompletionParams::from(&OpenAiConfig::default())
    }

    #[tokio::test]
    async fn chat_sends_fixed_sampling_and_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "gpt-4",
                "messages": [
                    { "role": "user", "content": "How do I make hummus?" },
                    { "role": "system", "content": "be a chef" }
                ],
                "max_tokens": 1000,
                "n": 1,
                "stop": null,
                "temperature": 0.5
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [
                        { "index": 0, "message": { "role": "assistant", "content": "Blend chickpeas." } },
                        { "index": 1, "message": { "role": "assistant", "content": "ignored" } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OpenAiClient::new(Some(server.url()), "sk-test".to_string(), params());
        let text = client
            .chat(vec![
                ChatMessage::user("How do I make hummus?"),
                ChatMessage::system("be a chef"),
            ])
            .await
            .unwrap();

        assert_eq!(text, "Blend chickpeas.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let client = OpenAiClient::new(Some(format!("{}/", server.url())), "bad".to_string(), params());
        let err = client.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();
        match err {
            LlmError::Api(msg) => {
                assert!(msg.starts_with("401"));
                assert!(msg.contains("invalid api key"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn empty_choices_is_api_error() {
        let data: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_choice_text(data), Err(LlmError::Api(_))));
    }

    #[test]
    fn null_content_becomes_empty_text() {
        let data: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
                .unwrap();
        assert_eq!(first_choice_text(data).unwrap(), "");
    }
}
