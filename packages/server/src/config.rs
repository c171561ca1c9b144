//! Runtime configuration, read once from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use eco_blocks_ai::AiConfig;
use eco_blocks_ai::speech::DEFAULT_TIMEOUT as DEFAULT_NARRATION_TIMEOUT;
use eco_blocks_persistence::DEFAULT_DB_PATH;
use eco_blocks_simulation::engine::DEFAULT_NARRATIVE_TIMEOUT;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Everything the server needs to build its collaborators.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to listen on (`PORT`).
    pub port: u16,
    /// `SQLite` file for simulation and reward records (`DATABASE_PATH`).
    pub database_path: PathBuf,
    /// `TomTom` key (`TOMTOM_API_KEY`). Traffic is estimated without it.
    pub tomtom_api_key: Option<String>,
    /// Narrative generator settings.
    pub ai: AiConfig,
    /// `ElevenLabs` key (`ELEVEN_LABS_API_KEY`). Narration is disabled
    /// without it.
    pub eleven_labs_api_key: Option<String>,
    /// `ElevenLabs` voice (`ELEVEN_LABS_VOICE_ID`).
    pub eleven_labs_voice_id: Option<String>,
    /// Budget for one generator call (`NARRATIVE_TIMEOUT_SECS`).
    pub narrative_timeout: Duration,
    /// Budget for one narration request (`NARRATION_TIMEOUT_SECS`).
    pub narration_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            tomtom_api_key: None,
            ai: AiConfig::default(),
            eleven_labs_api_key: None,
            eleven_labs_voice_id: None,
            narrative_timeout: DEFAULT_NARRATIVE_TIMEOUT,
            narration_timeout: DEFAULT_NARRATION_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as
    /// unset; unparseable numbers fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = var("PORT").and_then(|p| {
            p.parse()
                .inspect_err(|e| log::warn!("Ignoring PORT={p}: {e}"))
                .ok()
        });
        let secs = |key: &str| {
            var(key).and_then(|s| {
                s.parse::<u64>()
                    .inspect_err(|e| log::warn!("Ignoring {key}={s}: {e}"))
                    .ok()
            })
        };
        let narrative_timeout = secs("NARRATIVE_TIMEOUT_SECS");
        let narration_timeout = secs("NARRATION_TIMEOUT_SECS");

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: port.unwrap_or(defaults.port),
            database_path: var("DATABASE_PATH").map_or(defaults.database_path, PathBuf::from),
            tomtom_api_key: var("TOMTOM_API_KEY"),
            ai: AiConfig {
                provider: var("AI_PROVIDER"),
                model: var("AI_MODEL"),
                base_url: var("AI_BASE_URL"),
                gemini_api_key: var("GEMINI_API_KEY"),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                openai_api_key: var("OPENAI_API_KEY"),
                aws_region: var("AWS_REGION"),
            },
            eleven_labs_api_key: var("ELEVEN_LABS_API_KEY"),
            eleven_labs_voice_id: var("ELEVEN_LABS_VOICE_ID"),
            narrative_timeout: narrative_timeout
                .map_or(defaults.narrative_timeout, Duration::from_secs),
            narration_timeout: narration_timeout
                .map_or(defaults.narration_timeout, Duration::from_secs),
        }
    }
}
