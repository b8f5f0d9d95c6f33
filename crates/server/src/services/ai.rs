//! Chat-completion client that walks an ordered list of models until one of
//! them gives a usable answer.

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Smallest and fastest first
pub const DEFAULT_MODELS: &[&str] = &[
    "meta-llama/llama-3.2-3b-instruct:free",
    "google/gemma-3-4b-it:free",
    "qwen/qwen3-4b:free",
    "mistralai/mistral-small-3.1-24b-instruct:free",
    "meta-llama/llama-3.3-70b-instruct:free",
];

/// Answers must be longer than this many characters
const MIN_ANSWER_CHARS: usize = 5;

pub const UNCONFIGURED_MESSAGE: &str =
    "API key not set. Please add OPENROUTER_API_KEY to your environment.";
pub const EXHAUSTED_MESSAGE: &str =
    "All AI models are currently unavailable. Please try again in a moment.";

/// Why a single model attempt was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Timeout,
    Transport(String),
    Status(u16),
    Malformed(String),
    TooShort(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: String,
    pub failure: AttemptFailure,
}

/// Outcome of walking the model list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Answered { model: String, text: String },
    /// No API key is configured, nothing was sent
    Unconfigured,
    /// Every model failed, in order
    Exhausted(Vec<Attempt>),
}

impl Completion {
    /// The answer, or the human-readable failure message
    pub fn into_text(self) -> String {
        match self {
            Self::Answered { text, .. } => text,
            Self::Unconfigured => UNCONFIGURED_MESSAGE.to_string(),
            Self::Exhausted(_) => EXHAUSTED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct AiGateway {
    client: Client,
    config: AiConfig,
}

impl AiGateway {
    pub fn new(config: AiConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Tries each configured model in order and returns the first usable answer
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Completion {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Completion::Unconfigured;
        };

        let mut attempts = Vec::with_capacity(self.config.models.len());

        for model in &self.config.models {
            match self.attempt(api_key, model, prompt, max_tokens).await {
                Ok(text) => {
                    tracing::debug!(model = %model, failed = attempts.len(), "AI answer received");
                    return Completion::Answered {
                        model: model.clone(),
                        text,
                    };
                }
                Err(failure) => {
                    tracing::warn!(model = %model, ?failure, "AI model attempt failed");
                    attempts.push(Attempt {
                        model: model.clone(),
                        failure,
                    });
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "every AI model failed");
        Completion::Exhausted(attempts)
    }

    async fn attempt(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AttemptFailure> {
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header(header::REFERER, &self.config.referer)
            .header("X-Title", "StudyHub")
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(classify)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AttemptFailure::Malformed("no choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| AttemptFailure::Malformed("choice has no content".to_string()))?;

        let length = content.chars().count();
        if length <= MIN_ANSWER_CHARS {
            return Err(AttemptFailure::TooShort(length));
        }

        Ok(content)
    }
}

fn classify(error: reqwest::Error) -> AttemptFailure {
    if error.is_timeout() {
        AttemptFailure::Timeout
    } else if error.is_decode() {
        AttemptFailure::Malformed(error.to_string())
    } else if let Some(status) = error.status().filter(|s| *s != StatusCode::OK) {
        AttemptFailure::Status(status.as_u16())
    } else {
        AttemptFailure::Transport(error.to_string())
    }
}
