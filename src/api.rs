use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::chat::{assemble_context, ConversationTurn, SYSTEM_PROMPT_TEMPLATE};
use crate::config::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Groq,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Groq => "groq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            "google" | "gemini" => Some(ProviderKind::Google),
            "groq" => Some(ProviderKind::Groq),
            _ => None,
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::Anthropic => "claude-3-sonnet-20240229",
            ProviderKind::Google => "gemini-pro",
            ProviderKind::Groq => "llama-3.1-8b-instant",
        }
    }

    pub fn wire(&self) -> Wire {
        match self {
            ProviderKind::OpenAi | ProviderKind::Groq => Wire::OpenAiChat,
            ProviderKind::Anthropic => Wire::AnthropicMessages,
            ProviderKind::Google => Wire::GeminiGenerate,
        }
    }

    fn default_endpoint(&self, model: &str) -> String {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
            ProviderKind::Google => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
            ),
            ProviderKind::Groq => "https://api.groq.com/openai/v1/chat/completions".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire protocol spoken by a provider. Each variant owns the payload shape
/// and reply parsing for its endpoint family; the engine dispatches through
/// one `send` path instead of branching on provider names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    OpenAiChat,
    AnthropicMessages,
    GeminiGenerate,
}

impl Wire {
    pub fn build_payload(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Value {
        match self {
            Wire::OpenAiChat => {
                let request = ChatRequest {
                    model: model.to_string(),
                    messages: messages.to_vec(),
                    max_tokens,
                    temperature,
                };
                serde_json::to_value(request).unwrap_or_default()
            }
            Wire::AnthropicMessages => {
                // Anthropic takes the system prompt as a top-level field.
                let system: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == "system")
                    .map(|m| m.content.as_str())
                    .collect();
                let turns: Vec<Value> = messages
                    .iter()
                    .filter(|m| m.role != "system")
                    .map(|m| json!({ "role": m.role, "content": m.content }))
                    .collect();
                json!({
                    "model": model,
                    "system": system.join("\n"),
                    "messages": turns,
                    "max_tokens": max_tokens,
                    "temperature": temperature,
                })
            }
            Wire::GeminiGenerate => {
                let system: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == "system")
                    .map(|m| m.content.as_str())
                    .collect();
                let contents: Vec<Value> = messages
                    .iter()
                    .filter(|m| m.role != "system")
                    .map(|m| {
                        let role = if m.role == "assistant" { "model" } else { "user" };
                        json!({ "role": role, "parts": [{ "text": m.content }] })
                    })
                    .collect();
                json!({
                    "systemInstruction": { "parts": [{ "text": system.join("\n") }] },
                    "contents": contents,
                    "generationConfig": {
                        "maxOutputTokens": max_tokens,
                        "temperature": temperature,
                    },
                })
            }
        }
    }

    pub fn parse_reply(&self, body: Value) -> Result<String> {
        match self {
            Wire::OpenAiChat => {
                let response: ChatResponse = serde_json::from_value(body)?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| anyhow!("no choices in response"))
            }
            Wire::AnthropicMessages => body["content"][0]["text"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("could not parse Anthropic response")),
            Wire::GeminiGenerate => body["candidates"][0]["content"]["parts"][0]["text"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("could not parse Gemini response")),
        }
    }
}

/// One configured backend. Immutable after startup; the credential is read
/// from the environment exactly once when the registry is built.
#[derive(Debug, Clone)]
pub struct Provider {
    pub kind: ProviderKind,
    pub wire: Wire,
    pub model: String,
    pub endpoint: String,
    api_key: String,
}

impl Provider {
    pub fn new(kind: ProviderKind, model: String, endpoint: Option<String>, api_key: String) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| kind.default_endpoint(&model));
        Self {
            kind,
            wire: kind.wire(),
            model,
            endpoint,
            api_key,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Ordered set of configured backends plus the user's single preference.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
    preferred: Option<ProviderKind>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Provider>, preferred: Option<ProviderKind>) -> Self {
        Self {
            providers,
            preferred,
        }
    }

    /// Builds the registry from config overrides and environment
    /// credentials, in the fixed provider order.
    pub fn from_config(config: &Config) -> Self {
        let providers = ProviderKind::ALL
            .iter()
            .map(|&kind| {
                let overrides = match kind {
                    ProviderKind::OpenAi => &config.providers.openai,
                    ProviderKind::Anthropic => &config.providers.anthropic,
                    ProviderKind::Google => &config.providers.google,
                    ProviderKind::Groq => &config.providers.groq,
                };
                let model = overrides
                    .model
                    .clone()
                    .unwrap_or_else(|| kind.default_model().to_string());
                let api_key = std::env::var(kind.env_key()).unwrap_or_default();
                Provider::new(kind, model, overrides.endpoint.clone(), api_key)
            })
            .collect();

        let preferred = ProviderKind::from_name(&config.preferred_provider);
        if preferred.is_none() {
            tracing::warn!(
                "unknown preferred provider '{}', using registry order",
                config.preferred_provider
            );
        }
        Self::new(providers, preferred)
    }

    /// Selection policy: the preferred provider if credentialed, otherwise
    /// the first credentialed provider in registry order.
    pub fn select(&self) -> Option<&Provider> {
        if let Some(kind) = self.preferred {
            if let Some(provider) = self
                .providers
                .iter()
                .find(|p| p.kind == kind && p.has_credentials())
            {
                return Some(provider);
            }
        }
        self.providers.iter().find(|p| p.has_credentials())
    }

    pub fn credentialed(&self) -> Vec<ProviderKind> {
        self.providers
            .iter()
            .filter(|p| p.has_credentials())
            .map(|p| p.kind)
            .collect()
    }

    pub fn statuses(&self) -> Vec<(ProviderKind, bool)> {
        self.providers
            .iter()
            .map(|p| (p.kind, p.has_credentials()))
            .collect()
    }
}

/// Either the provider's normalized reply text or a displayable failure.
/// Never partially filled; failures never escape as panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Reply(String),
    Failed {
        provider: Option<ProviderKind>,
        reason: String,
    },
}

pub struct ResponseEngine {
    client: Client,
    registry: ProviderRegistry,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseEngine {
    pub fn new(registry: ProviderRegistry, config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("codemaster/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            registry,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// One provider call for one turn. Selects a backend, sends the
    /// assembled context, normalizes the reply. A single attempt: transport
    /// or API errors degrade to `Failed` without trying another provider.
    pub async fn respond(&self, input: &str, history: &[ConversationTurn]) -> CompletionResult {
        let provider = match self.registry.select() {
            Some(provider) => provider,
            None => {
                return CompletionResult::Failed {
                    provider: None,
                    reason: "No AI providers configured. Set OPENAI_API_KEY, \
                             ANTHROPIC_API_KEY, GOOGLE_API_KEY or GROQ_API_KEY."
                        .to_string(),
                }
            }
        };

        let messages = assemble_context(SYSTEM_PROMPT_TEMPLATE, history, input);
        tracing::debug!(provider = provider.kind.name(), model = %provider.model, "sending completion request");

        match self.send(provider, &messages).await {
            Ok(text) => CompletionResult::Reply(text),
            Err(err) => {
                tracing::warn!(provider = provider.kind.name(), "request failed: {err:#}");
                CompletionResult::Failed {
                    provider: Some(provider.kind),
                    reason: format!("{} request failed: {err:#}", provider.kind),
                }
            }
        }
    }

    async fn send(&self, provider: &Provider, messages: &[ChatMessage]) -> Result<String> {
        let payload =
            provider
                .wire
                .build_payload(&provider.model, messages, self.max_tokens, self.temperature);

        let request = self.client.post(&provider.endpoint).json(&payload);
        let request = match provider.wire {
            Wire::OpenAiChat => {
                request.header("Authorization", format!("Bearer {}", provider.api_key))
            }
            Wire::AnthropicMessages => request
                .header("x-api-key", provider.api_key.as_str())
                .header("anthropic-version", "2023-06-01"),
            Wire::GeminiGenerate => request.query(&[("key", provider.api_key.as_str())]),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("API returned {status}: {error_text}"));
        }

        let body: Value = response.json().await?;
        provider.wire.parse_reply(body)
    }
}
