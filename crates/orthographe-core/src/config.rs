use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TrainerError};

/// Top-level configuration for the dictation trainer.
///
/// Loaded from `~/.orthographe/config.toml` by default. Every section is
/// optional; missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl TrainerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TrainerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(TrainerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the progress database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.orthographe/data".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Data directory with a leading `~` expanded to the home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

/// Expand a leading `~/` using `HOME` (or `USERPROFILE` on Windows).
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

/// Connection settings for the Gemini generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the Generative Language REST API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model used for catalogs, texts and evaluations.
    pub text_model: String,
    /// Model used for speech synthesis.
    pub speech_model: String,
    /// Prebuilt voice used for speech synthesis.
    pub voice_name: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice_name: "Puck".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TrainerError::Config(format!(
                "environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

/// Speech decoding and playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of the synthesized PCM stream in Hz.
    pub sample_rate: u32,
    /// How close to the end a run must be to count as a natural completion.
    pub completion_tolerance_secs: f64,
    /// Delay before the single synthesis retry.
    pub synthesis_retry_backoff_ms: u64,
    /// Number of synthesis retries after the first failure.
    pub synthesis_retries: u32,
    /// Play through the default output device (requires the `device` feature).
    pub output_enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            completion_tolerance_secs: 0.2,
            synthesis_retry_backoff_ms: 2_000,
            synthesis_retries: 1,
            output_enabled: true,
        }
    }
}

/// Catalog growth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Collections with fewer known items than this are extended.
    pub min_known_items: usize,
    /// Entries requested when extending a training level.
    pub training_fetch_count: usize,
    /// Entries requested when extending the Brevet collection.
    pub exam_fetch_count: usize,
    /// Target length of training excerpts, in words.
    pub training_word_range: String,
    /// Target length of Brevet excerpts, in words.
    pub exam_word_range: String,
    /// Texts per training level shown as the progress target.
    pub texts_per_level: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            min_known_items: 10,
            training_fetch_count: 50,
            exam_fetch_count: 30,
            training_word_range: "50 à 60".to_string(),
            exam_word_range: "120 à 140".to_string(),
            texts_per_level: 50,
        }
    }
}

/// Grading policy applied on top of the evaluator's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum score (out of 10) that marks an item completed.
    pub pass_threshold: f64,
    /// Score at or above which a result counts as excellent.
    pub excellent_threshold: f64,
    /// Points deducted per grammar mistake.
    pub grammar_penalty: f64,
    /// Points deducted per lexical mistake.
    pub lexical_penalty: f64,
    /// Maximum score.
    pub max_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 5.0,
            excellent_threshold: 8.0,
            grammar_penalty: 1.0,
            lexical_penalty: 0.5,
            max_score: 10.0,
        }
    }
}
