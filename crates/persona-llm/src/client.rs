//! OpenAI-compatible HTTP client
//!
//! Works against any endpoint implementing the `/chat/completions` and
//! `/embeddings` contract (OpenAI, Azure-style proxies, Ollama, vLLM).

use crate::error::{LlmError, LlmResult};
use crate::message::{ChatMessage, ChatResponse, ResponseFormat, Usage};
use crate::LlmClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Model used for chat completions
    pub chat_model: String,

    /// Model used for embeddings
    pub embedding_model: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default models and endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Override the endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the chat model
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Override the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible chat and embedding client
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
}

impl Client {
    /// Build a client from explicit configuration
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::configuration("api key must not be empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::http("build_client", e))?;

        Ok(Self { config, http })
    }

    /// Build a client from environment variables (loads `.env` first)
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_BASE_URL`,
    /// `PERSONA_CHAT_MODEL` and `PERSONA_EMBEDDING_MODEL`.
    pub fn from_env() -> LlmResult<Self> {
        dotenv::dotenv().ok();

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::configuration("OPENAI_API_KEY is not set"))?;

        let mut config = ClientConfig::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(model) = std::env::var("PERSONA_CHAT_MODEL") {
            config = config.with_chat_model(model);
        }
        if let Ok(model) = std::env::var("PERSONA_EMBEDDING_MODEL") {
            config = config.with_embedding_model(model);
        }

        Self::new(config)
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Embed a batch of texts, one vector per input in input order
    pub async fn embeddings(&self, input: Vec<String>) -> LlmResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.base_url);
        let expected = input.len();
        let body = serde_json::json!({
            "model": self.config.embedding_model,
            "input": input,
        });

        let response: EmbeddingsWire = self.post_json("embeddings", &url, &body).await?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.len() != expected {
            return Err(LlmError::invalid_response(format!(
                "expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn build_chat_body(&self, messages: &[ChatMessage], format: ResponseFormat) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": messages,
        });

        if format == ResponseFormat::JsonObject {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        body
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &Value,
    ) -> LlmResult<T> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::http(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::api(status.as_u16(), message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LlmError::invalid_response(format!("{operation}: {e}")))
    }
}

#[async_trait::async_trait]
impl LlmClient for Client {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        format: ResponseFormat,
    ) -> LlmResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_chat_body(&messages, format);

        debug!(
            model = %self.config.chat_model,
            message_count = messages.len(),
            json_mode = format == ResponseFormat::JsonObject,
            "Sending chat completion"
        );

        let wire: ChatCompletionWire = self.post_json("chat_completion", &url, &body).await?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response("response contained no choices"))?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: wire.model.unwrap_or_else(|| self.config.chat_model.clone()),
            finish_reason: choice.finish_reason,
            usage: wire.usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionWire {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChoiceWire>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceWire {
    message: ChoiceMessageWire,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessageWire {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsWire {
    data: Vec<EmbeddingWire>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingWire {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let err = Client::new(ClientConfig::new("  ")).unwrap_err();
        assert!(matches!(err, LlmError::Configuration { .. }));
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let client = Client::new(ClientConfig::new("sk-test")).unwrap();
        let messages = vec![ChatMessage::system("classify")];

        let body = client.build_chat_body(&messages, ResponseFormat::JsonObject);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["model"], "gpt-4o-mini");

        let body = client.build_chat_body(&messages, ResponseFormat::Text);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_unreachable_backend_is_retryable_http_error() {
        let client = Client::new(
            ClientConfig::new("sk-test")
                .with_base_url("http://127.0.0.1:1")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = tokio_test::block_on(
            client.chat_completion(vec![ChatMessage::user("hi")], ResponseFormat::Text),
        );
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, LlmError::Http { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig::new("sk-test").with_base_url("http://localhost:11434/v1/");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
    }
}
