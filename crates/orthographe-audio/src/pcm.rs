//! Decoding of the synthesized sample stream.
//!
//! The speech service returns base64-encoded signed 16-bit little-endian
//! mono PCM with no header.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::AudioError;

/// Decoded mono samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::Decode("sample rate must be greater than 0".into()));
        }
        if samples.is_empty() {
            return Err(AudioError::Decode("audio stream is empty".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a base64 payload into an [`AudioBuffer`] at `sample_rate`.
pub fn decode_base64_pcm(data: &str, sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| AudioError::Decode(format!("invalid base64: {e}")))?;
    let samples = pcm16_le_to_f32(&bytes)?;
    let buffer = AudioBuffer::new(samples, sample_rate)?;
    tracing::debug!(
        bytes = bytes.len(),
        duration_secs = buffer.duration(),
        "speech decoded"
    );
    Ok(buffer)
}

/// Convert little-endian i16 PCM bytes to f32 samples (`/ 32768`).
pub fn pcm16_le_to_f32(bytes: &[u8]) -> Result<Vec<f32>, AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::Decode(format!(
            "odd byte count {} for 16-bit samples",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        BASE64.encode(bytes)
    }

    #[test]
    fn test_decode_scales_samples() {
        let buffer = decode_base64_pcm(&encode(&[0, 16384, -32768, 32767]), 24_000).unwrap();
        let s = buffer.samples();
        assert_eq!(s.len(), 4);
        assert_eq!(s[0], 0.0);
        assert_eq!(s[1], 0.5);
        assert_eq!(s[2], -1.0);
        assert!(s[3] < 1.0 && s[3] > 0.999);
    }

    #[test]
    fn test_duration() {
        let buffer = decode_base64_pcm(&encode(&vec![0i16; 48_000]), 24_000).unwrap();
        assert!((buffer.duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode_base64_pcm("***", 24_000),
            Err(AudioError::Decode(_))
        ));
        assert!(matches!(
            decode_base64_pcm("", 24_000),
            Err(AudioError::Decode(_))
        ));
        // Three bytes.
        assert!(matches!(
            decode_base64_pcm("AAAA", 24_000),
            Err(AudioError::Decode(_))
        ));
        assert!(matches!(
            decode_base64_pcm(&encode(&[1, 2]), 0),
            Err(AudioError::Decode(_))
        ));
    }
}
