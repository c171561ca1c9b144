//! Text-to-speech for narrative headlines.
//!
//! See <https://elevenlabs.io/docs/api-reference/text-to-speech/convert>

use std::time::Duration;

use crate::AiError;

/// Default `ElevenLabs` voice ("Rachel").
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default budget for one synthesis request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest text accepted for synthesis, in characters.
pub const MAX_TEXT_CHARS: usize = 1_000;

/// Source of synthesized speech.
#[async_trait::async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Synthesizes `text`, returning MP3 audio bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider rejects
    /// the text.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError>;
}

/// `ElevenLabs` text-to-speech client.
pub struct ElevenLabsSpeech {
    api_key: String,
    voice_id: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ElevenLabsSpeech {
    /// Creates a client, or `None` when no API key is configured. Each
    /// request is abandoned after `timeout`.
    #[must_use]
    pub fn new(
        api_key: Option<String>,
        voice_id: Option<String>,
        timeout: Duration,
    ) -> Option<Self> {
        let api_key = api_key.filter(|k| !k.is_empty())?;
        Some(Self {
            api_key,
            voice_id: voice_id
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            timeout,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechGenerator for ElevenLabsSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
            return Err(AiError::Provider {
                message: format!("Narration text must be 1..={MAX_TEXT_CHARS} characters"),
            });
        }

        let resp = self
            .client
            .post(format!(
                "https://api.elevenlabs.io/v1/text-to-speech/{}",
                self.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&serde_json::json!({ "text": text }))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                message: format!("ElevenLabs HTTP {status}: {body}"),
            });
        }

        let audio = resp.bytes().await?;
        log::debug!("ElevenLabs returned {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}
