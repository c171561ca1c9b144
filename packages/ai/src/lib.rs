#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generative providers for simulation narratives.
//!
//! Supports Google Gemini, Anthropic Claude, `OpenAI`, AWS Bedrock
//! (feature-gated), and any `OpenAI`-compatible local/self-hosted server
//! (Ollama, vLLM, llama.cpp, LM Studio) via [`AiConfig::base_url`]. Each
//! provider turns one system prompt plus one user prompt into raw text;
//! interpreting that text is the caller's job.
//!
//! [`speech`] wraps the `ElevenLabs` text-to-speech API for narrating
//! headlines.

pub mod providers;
pub mod speech;

use thiserror::Error;

pub use providers::{LlmProvider, create_provider};

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Credentials and model selection for the narrative generator.
///
/// Built once from the environment by the server and passed in; nothing in
/// this crate reads environment variables.
#[derive(Debug, Clone, Default)]
pub struct AiConfig {
    /// Explicit provider name (`gemini`, `anthropic`, `openai`, `bedrock`).
    /// Auto-detected from the available keys when `None`.
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Base URL override for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
    /// Google Gemini API key.
    pub gemini_api_key: Option<String>,
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,
    /// `OpenAI` API key.
    pub openai_api_key: Option<String>,
    /// AWS region for Bedrock.
    pub aws_region: Option<String>,
}
