//! OpenAI-compatible chat-completions backend.

use super::{ChatRequest, ChatResponse, LlmBackend, Role, Usage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
// Low temperature keeps the action JSON stable.
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Builder for creating an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackendBuilder {
    /// Create a new builder with an API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Point at a different chat-completions endpoint (proxies, compatible
    /// providers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens for responses.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build the backend.
    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// OpenAI-compatible chat-completions backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Create a builder for the backend.
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(api_key, model)
    }

    /// Create a backend with the default model from the OPENAI_API_KEY
    /// environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::builder(api_key, DEFAULT_MODEL).build())
    }

    fn role_to_api_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({})", self.model)
    }
}

impl LlmBackend for OpenAiBackend {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse> {
        let mut api_messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            api_messages.push(ApiMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        api_messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: Self::role_to_api_str(m.role),
            content: m.content.clone(),
        }));

        let api_request = ApiRequest {
            model: self.model.clone(),
            messages: api_messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(e.to_string()))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Api("response contained no message content".into()))?;

        let usage = api_response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let backend = OpenAiBackend::builder("key", "gpt-4o").build();
        assert_eq!(backend.model, "gpt-4o");
        assert_eq!(backend.base_url, OPENAI_API_URL);
        assert_eq!(backend.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn builder_overrides() {
        let backend = OpenAiBackend::builder("key", "gpt-4o")
            .base_url("http://localhost:8000/v1/chat/completions")
            .temperature(0.0)
            .max_tokens(512)
            .build();
        assert_eq!(backend.base_url, "http://localhost:8000/v1/chat/completions");
        assert_eq!(backend.max_tokens, 512);
    }
}
