//! Chat-completion backends used to write scripts.
//!
//! Each provider turns a prompt into raw response text; parsing the text
//! into a script is the caller's job.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::GenerationError;
use crate::models::ScriptSource;

const SYSTEM_PROMPT: &str = "You are a professional podcast script writer. Always respond with valid JSON.";

/// Error bodies are cut to this many characters before logging.
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gemini" => Some(ProviderKind::Gemini),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    pub fn source(self) -> ScriptSource {
        match self {
            ProviderKind::Gemini => ScriptSource::Gemini,
            ProviderKind::OpenAi => ScriptSource::OpenAi,
        }
    }

    fn api_key_env(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-pro",
            ProviderKind::OpenAi => "gpt-3.5-turbo",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }
}

pub struct AiProvider {
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    max_output_tokens: u32,
    client: Client,
}

impl AiProvider {
    /// Build a provider from config. Returns `None` when no API key resolves.
    pub fn from_config(kind: ProviderKind, config: &AiConfig, client: Client) -> Option<Self> {
        let section = match kind {
            ProviderKind::Gemini => &config.gemini,
            ProviderKind::OpenAi => &config.openai,
        };

        let api_key = section
            .api_key
            .clone()
            .or_else(|| std::env::var(kind.api_key_env()).ok())
            .filter(|k| !k.trim().is_empty())?;

        Some(Self {
            kind,
            api_key,
            model: section.model.clone().unwrap_or_else(|| kind.default_model().to_string()),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the model's text.
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(provider = self.kind.name(), model = %self.model, prompt_chars = prompt.len(), "calling AI provider");

        let text = match self.kind {
            ProviderKind::Gemini => self.complete_gemini(prompt).await?,
            ProviderKind::OpenAi => self.complete_openai(prompt).await?,
        };

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                provider: self.kind.name(),
            });
        }
        Ok(text)
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let response = self.ensure_success(response).await?;
        let body: GeminiResponse = response.json().await.map_err(|e| self.http_error(e))?;

        let text = body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let response = self.ensure_success(response).await?;
        let body: ChatResponse = response.json().await.map_err(|e| self.http_error(e))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn ensure_success(&self, response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GenerationError::Api {
            provider: self.kind.name(),
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }

    fn http_error(&self, source: reqwest::Error) -> GenerationError {
        GenerationError::Http {
            provider: self.kind.name(),
            source,
        }
    }
}

/// Build every configured provider that has an API key, in configured order.
pub fn build_providers(config: &AiConfig) -> Result<Vec<AiProvider>> {
    let timeout: Duration = humantime::parse_duration(&config.timeout).context("parsing ai timeout")?;
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("podscript/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building AI HTTP client")?;

    let mut providers = Vec::new();
    for name in &config.providers {
        let kind = ProviderKind::parse(name).ok_or_else(|| anyhow::anyhow!("unknown ai provider '{name}'"))?;
        match AiProvider::from_config(kind, config, client.clone()) {
            Some(provider) => {
                info!(provider = kind.name(), model = %provider.model(), "AI provider enabled");
                providers.push(provider);
            }
            None => {
                info!(
                    provider = kind.name(),
                    env = kind.api_key_env(),
                    "AI provider skipped, no API key configured"
                );
            }
        }
    }
    Ok(providers)
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
