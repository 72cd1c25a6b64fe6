use orthographe_core::error::TrainerError;
use orthographe_gemini::GenerationError;

/// Errors from speech loading and playback.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The speech service failed or returned no audio.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    /// The returned sample stream could not be decoded.
    #[error("audio decode failed: {0}")]
    Decode(String),
    #[error("audio output error: {0}")]
    Device(String),
    /// A newer load was started before this one finished.
    #[error("load superseded by a newer request")]
    Superseded,
}

impl From<GenerationError> for AudioError {
    fn from(err: GenerationError) -> Self {
        AudioError::Synthesis(err.to_string())
    }
}

impl From<AudioError> for TrainerError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Synthesis(msg) => TrainerError::AudioSynthesis(msg),
            AudioError::Decode(msg) => TrainerError::AudioDecode(msg),
            AudioError::Device(msg) => TrainerError::AudioDevice(msg),
            other @ AudioError::Superseded => TrainerError::AudioSynthesis(other.to_string()),
        }
    }
}
