//! Error types for calls to the generation service.

use orthographe_core::error::TrainerError;

/// Errors from the generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request blocked by the service: {0}")]
    Blocked(String),
    #[error("empty response: {0}")]
    EmptyResponse(String),
    #[error("no audio data in response")]
    MissingAudio,
    #[error("unparseable response: {0}")]
    Parse(String),
    #[error("incomplete response: {0}")]
    Incomplete(String),
    #[error("client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GenerationError::Parse(err.to_string())
        } else {
            GenerationError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Parse(err.to_string())
    }
}

impl From<GenerationError> for TrainerError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Config(msg) => TrainerError::Config(msg),
            other => TrainerError::Generation(other.to_string()),
        }
    }
}
