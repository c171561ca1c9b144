//! LLM provider abstraction and implementations.
//!
//! Supports Gemini, Anthropic Claude, `OpenAI`, and AWS Bedrock via a
//! common trait.

pub mod anthropic;
#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod gemini;
pub mod openai;

use crate::{AiConfig, AiError};

/// Upper bound on generated tokens. Narratives are short.
pub(crate) const MAX_TOKENS: u32 = 1024;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Sends one completion request and returns the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the response carries
    /// no text.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError>;
}

/// Creates an LLM provider from explicit configuration.
///
/// If [`AiConfig::provider`] is set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `gemini_api_key` -> Google Gemini
/// 2. `anthropic_api_key` -> Anthropic Claude
/// 3. `openai_api_key` or `base_url` -> `OpenAI`-compatible
///
/// Returns `Ok(None)` when nothing is configured, which disables the
/// generator.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the explicitly requested provider is
/// unknown or lacks its credential.
#[allow(clippy::unused_async)] // async is needed when bedrock feature is enabled
pub async fn create_provider(config: &AiConfig) -> Result<Option<Box<dyn LlmProvider>>, AiError> {
    let Some(provider) = config.provider.clone().or_else(|| detect_provider(config)) else {
        log::warn!(
            "No AI credentials configured. Set one of GEMINI_API_KEY, \
             ANTHROPIC_API_KEY, OPENAI_API_KEY, or AI_PROVIDER; narratives \
             will use the deterministic fallback."
        );
        return Ok(None);
    };

    let model = |default: &str| {
        config
            .model
            .clone()
            .unwrap_or_else(|| default.to_string())
    };

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = required(config.gemini_api_key.as_ref(), "GEMINI_API_KEY")?;
            Ok(Some(Box::new(gemini::GeminiProvider::new(
                api_key,
                model("gemini-1.5-flash"),
            ))))
        }
        "anthropic" | "claude" => {
            let api_key = required(config.anthropic_api_key.as_ref(), "ANTHROPIC_API_KEY")?;
            Ok(Some(Box::new(anthropic::AnthropicProvider::new(
                api_key,
                model("claude-sonnet-4-20250514"),
            ))))
        }
        "openai" | "gpt" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
            // Local OpenAI-compatible servers usually take no key.
            let api_key = config.openai_api_key.clone().unwrap_or_default();
            if api_key.is_empty() && config.base_url.is_none() {
                return Err(AiError::Config {
                    message: "OPENAI_API_KEY environment variable not set".to_string(),
                });
            }
            Ok(Some(Box::new(openai::OpenAiProvider::new(
                api_key,
                model("gpt-4o-mini"),
                base_url,
            ))))
        }
        #[cfg(feature = "bedrock")]
        "bedrock" | "aws" => {
            let provider = bedrock::BedrockProvider::new(
                model("us.anthropic.claude-sonnet-4-20250514-v1:0"),
                config.aws_region.clone(),
            )
            .await;
            Ok(Some(Box::new(provider)))
        }
        #[cfg(not(feature = "bedrock"))]
        "bedrock" | "aws" => Err(AiError::Config {
            message: "Bedrock support not compiled. Rebuild with --features bedrock".to_string(),
        }),
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'gemini', 'anthropic', 'openai', or 'bedrock'."
            ),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
fn detect_provider(config: &AiConfig) -> Option<String> {
    let has = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.is_empty());

    if has(&config.gemini_api_key) {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return Some("gemini".to_string());
    }

    if has(&config.anthropic_api_key) {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Some("anthropic".to_string());
    }

    if has(&config.openai_api_key) || config.base_url.is_some() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return Some("openai".to_string());
    }

    None
}

fn required(key: Option<&String>, var: &str) -> Result<String, AiError> {
    key.filter(|k| !k.is_empty())
        .cloned()
        .ok_or_else(|| AiError::Config {
            message: format!("{var} environment variable not set"),
        })
}
