// Chat-completion client
//
// One blocking POST per call to {base_url}/v1/chat/completions. No retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use alchemist_config::ai::{AIConfigStatus, ResolvedAIConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    #[error("AI not configured: {0}")]
    NotConfigured(String),
    #[error("API key not configured")]
    MissingKey,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("no response from AI")]
    EmptyResponse,
    #[error("failed to parse AI response: {0}")]
    Parse(String),
    #[error("{0}")]
    InvalidInput(String),
}

/// One chat turn: a system prompt, a user prompt and a sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// The seam to the language-model service.
pub trait Completion {
    /// Returns the trimmed text of the first choice. Blank text is
    /// `AiError::EmptyResponse`.
    fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

// ============================================================================
// OpenAI API types
// ============================================================================

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: [OpenAIMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

pub struct OpenAIClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client from resolved configuration. Fails before any network
    /// traffic when AI is disabled or no key is available.
    pub fn from_config(config: &ResolvedAIConfig) -> Result<Self, AiError> {
        match config.status {
            AIConfigStatus::Disabled => {
                return Err(AiError::NotConfigured("AI is disabled".to_string()));
            }
            AIConfigStatus::MissingKey => return Err(AiError::MissingKey),
            AIConfigStatus::Ready => {}
        }
        let api_key = config.api_key.as_deref().ok_or(AiError::MissingKey)?;
        Self::new(&config.base_url, api_key, config.model.clone(), config.timeout)
    }
}

impl Completion for OpenAIClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        let body = OpenAIRequest {
            model: &self.model,
            messages: [
                OpenAIMessage { role: "system", content: &request.system },
                OpenAIMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
        };

        log::debug!(
            "POST {} model={} temperature={} prompt_chars={}",
            self.endpoint,
            self.model,
            request.temperature,
            request.user.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            let message = match serde_json::from_str::<OpenAIError>(&error_text) {
                Ok(error) => error.error.message,
                Err(_) => error_text,
            };
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_body: OpenAIResponse = response
            .json()
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        log::debug!("completion returned {} chars", content.len());
        Ok(content)
    }
}
