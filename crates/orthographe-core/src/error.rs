use thiserror::Error;

/// Top-level error type for the dictation trainer.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for TrainerError` so that `?` works across crate
/// boundaries. Every variant is recoverable by retrying from the user's side.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A catalog, text or evaluation request failed or returned unusable data.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Speech synthesis failed or returned no usable audio after its retry.
    #[error("Audio synthesis failed: {0}")]
    AudioSynthesis(String),

    /// The returned sample stream could not be decoded into a playable buffer.
    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown catalog item: {0}")]
    UnknownItem(String),

    #[error("Invalid difficulty level: {0} (expected 1 to 4)")]
    InvalidLevel(u8),

    #[error("Submission is empty")]
    EmptySubmission,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TrainerError {
    fn from(err: toml::de::Error) -> Self {
        TrainerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TrainerError {
    fn from(err: toml::ser::Error) -> Self {
        TrainerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::Serialization(err.to_string())
    }
}

impl TrainerError {
    /// Whether the failure came from the remote generation service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            TrainerError::Generation(_) | TrainerError::AudioSynthesis(_)
        )
    }
}

/// A specialized `Result` type for trainer operations.
pub type Result<T> = std::result::Result<T, TrainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainerError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_taxonomy() {
        let cases: Vec<(TrainerError, &str)> = vec![
            (
                TrainerError::Generation("empty reply".to_string()),
                "Generation failed: empty reply",
            ),
            (
                TrainerError::AudioSynthesis("no inline data".to_string()),
                "Audio synthesis failed: no inline data",
            ),
            (
                TrainerError::AudioDecode("odd byte count".to_string()),
                "Audio decode failed: odd byte count",
            ),
            (
                TrainerError::InvalidLevel(7),
                "Invalid difficulty level: 7 (expected 1 to 4)",
            ),
            (TrainerError::EmptySubmission, "Submission is empty"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrainerError = io_err.into();
        assert!(matches!(err, TrainerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let trainer_err: TrainerError = err.unwrap_err().into();
        assert!(matches!(trainer_err, TrainerError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let trainer_err: TrainerError = err.unwrap_err().into();
        assert!(matches!(trainer_err, TrainerError::Serialization(_)));
    }

    #[test]
    fn test_is_remote() {
        assert!(TrainerError::Generation("x".into()).is_remote());
        assert!(TrainerError::AudioSynthesis("x".into()).is_remote());
        assert!(!TrainerError::AudioDecode("x".into()).is_remote());
        assert!(!TrainerError::Storage("x".into()).is_remote());
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
