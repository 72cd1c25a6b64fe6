//! Playback position and state tracking over one decoded speech buffer.
//!
//! The controller owns the output sink and a clock. Position is derived from
//! the clock rather than from the sink:
//! `elapsed_before + (now - run_started_at)` while playing, clamped to the
//! buffer duration. Reloading (for example when switching to slow speech)
//! rebuilds the state from scratch; a load is split into [`LoadTicket`]
//! issue and completion so that a reply for a superseded request is
//! recognised and dropped.

use std::sync::Arc;
use std::time::Duration;

use orthographe_core::config::AudioConfig;
use orthographe_gemini::GenerationService;

use crate::clock::{Clock, SystemClock};
use crate::error::AudioError;
use crate::output::AudioOutput;
use crate::pcm::{decode_base64_pcm, AudioBuffer};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Nothing loaded.
    Idle,
    /// Waiting for synthesized speech.
    Loading,
    /// A buffer is loaded and paused.
    Ready,
    Playing,
    /// The last load failed; controls stay disabled until a load succeeds.
    Errored,
}

/// How a run ended when the output reported end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Played to the end; position was reset to zero.
    Completed,
    /// Stopped short of the end; position was kept.
    Interrupted,
}

/// Handle for one in-flight load. Only the most recent ticket can complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    content: String,
    slow: bool,
}

impl LoadTicket {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn slow(&self) -> bool {
        self.slow
    }
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Arc<AudioBuffer>),
    /// A newer load was started; the result was discarded.
    Stale,
}

/// Retry policy for speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisRetry {
    pub retries: u32,
    pub backoff: Duration,
}

impl From<&AudioConfig> for SynthesisRetry {
    fn from(config: &AudioConfig) -> Self {
        Self {
            retries: config.synthesis_retries,
            backoff: Duration::from_millis(config.synthesis_retry_backoff_ms),
        }
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Request speech for `content` and decode it.
///
/// Synthesis failures are retried `retry.retries` times after
/// `retry.backoff`. Decode failures are not retried.
pub async fn fetch_speech<S: GenerationService>(
    service: &S,
    content: &str,
    slow: bool,
    sample_rate: u32,
    retry: SynthesisRetry,
) -> Result<AudioBuffer, AudioError> {
    let mut attempt = 0;
    loop {
        match service.synthesize_speech(content, slow).await {
            Ok(data) => return decode_base64_pcm(&data, sample_rate),
            Err(err) if attempt < retry.retries => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    error = %err,
                    backoff_ms = retry.backoff.as_millis() as u64,
                    "speech synthesis failed, retrying"
                );
                tokio::time::sleep(retry.backoff).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "speech synthesis failed");
                return Err(err.into());
            }
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

pub struct PlaybackController<O: AudioOutput, C: Clock = SystemClock> {
    output: O,
    clock: C,
    status: PlaybackStatus,
    buffer: Option<Arc<AudioBuffer>>,
    content: Option<String>,
    slow: bool,
    elapsed_before: f64,
    run_started_at: Option<f64>,
    generation: u64,
    completion_tolerance: f64,
    sample_rate: u32,
    retry: SynthesisRetry,
    last_error: Option<String>,
    released: bool,
}

impl<O: AudioOutput, C: Clock> PlaybackController<O, C> {
    pub fn new(output: O, clock: C, config: &AudioConfig) -> Self {
        Self {
            output,
            clock,
            status: PlaybackStatus::Idle,
            buffer: None,
            content: None,
            slow: false,
            elapsed_before: 0.0,
            run_started_at: None,
            generation: 0,
            completion_tolerance: config.completion_tolerance_secs.max(0.0),
            sample_rate: config.sample_rate,
            retry: SynthesisRetry::from(config),
            last_error: None,
            released: false,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Whether the speech currently loaded (or loading) is the slow reading.
    pub fn is_slow(&self) -> bool {
        self.slow
    }

    /// Play/pause and rate controls are usable only with a buffer loaded.
    pub fn controls_enabled(&self) -> bool {
        matches!(self.status, PlaybackStatus::Ready | PlaybackStatus::Playing)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn duration(&self) -> Option<f64> {
        self.buffer.as_ref().map(|b| b.duration())
    }

    fn raw_elapsed(&self) -> f64 {
        let running = self
            .run_started_at
            .map(|start| (self.clock.now() - start).max(0.0))
            .unwrap_or(0.0);
        self.elapsed_before + running
    }

    /// Seconds played so far, clamped to `[0, duration]`.
    pub fn current_position(&self) -> f64 {
        match self.duration() {
            Some(duration) => self.raw_elapsed().clamp(0.0, duration),
            None => 0.0,
        }
    }

    /// Pause if playing, otherwise resume from the accumulated position.
    ///
    /// A position at or past the end wraps so playback restarts from the
    /// beginning. Does nothing unless a buffer is loaded.
    pub fn toggle(&mut self) -> Result<(), AudioError> {
        let Some(buffer) = self.buffer.clone() else {
            return Ok(());
        };
        match self.status {
            PlaybackStatus::Playing => {
                self.output.stop();
                self.elapsed_before = self.raw_elapsed();
                self.run_started_at = None;
                self.status = PlaybackStatus::Ready;
                tracing::debug!(position = self.elapsed_before, "playback paused");
            }
            PlaybackStatus::Ready => {
                let duration = buffer.duration();
                let offset = if duration > 0.0 {
                    self.elapsed_before % duration
                } else {
                    0.0
                };
                self.output.play(&buffer, offset)?;
                self.elapsed_before = offset;
                self.run_started_at = Some(self.clock.now());
                self.status = PlaybackStatus::Playing;
                tracing::debug!(offset, "playback started");
            }
            _ => {}
        }
        Ok(())
    }

    fn teardown_buffer(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.output.stop();
        }
        self.buffer = None;
        self.elapsed_before = 0.0;
        self.run_started_at = None;
    }

    /// Stop playback, drop the current buffer and open a new load.
    ///
    /// Any earlier ticket becomes stale.
    pub fn begin_load(&mut self, content: &str, slow: bool) -> LoadTicket {
        self.teardown_buffer();
        self.generation += 1;
        self.status = PlaybackStatus::Loading;
        self.content = Some(content.to_string());
        self.slow = slow;
        self.released = false;
        LoadTicket {
            generation: self.generation,
            content: content.to_string(),
            slow,
        }
    }

    /// Reload the current content at another rate. `None` if nothing was
    /// ever loaded.
    pub fn begin_rate_change(&mut self, slow: bool) -> Option<LoadTicket> {
        let content = self.content.clone()?;
        Some(self.begin_load(&content, slow))
    }

    /// Install the result of the load `ticket` was issued for.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<AudioBuffer, AudioError>,
    ) -> Result<LoadOutcome, AudioError> {
        if ticket.generation != self.generation || self.status != PlaybackStatus::Loading {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding superseded speech load"
            );
            return Ok(LoadOutcome::Stale);
        }
        match result {
            Ok(buffer) => {
                let buffer = Arc::new(buffer);
                self.buffer = Some(buffer.clone());
                self.elapsed_before = 0.0;
                self.run_started_at = None;
                self.status = PlaybackStatus::Ready;
                self.last_error = None;
                tracing::info!(
                    duration_secs = buffer.duration(),
                    slow = ticket.slow,
                    "speech ready"
                );
                Ok(LoadOutcome::Loaded(buffer))
            }
            Err(err) => {
                self.status = PlaybackStatus::Errored;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Synthesize `content` and make it the current buffer, position zero.
    pub async fn load<S: GenerationService>(
        &mut self,
        service: &S,
        content: &str,
        slow: bool,
    ) -> Result<Arc<AudioBuffer>, AudioError> {
        let ticket = self.begin_load(content, slow);
        let result = fetch_speech(service, content, slow, self.sample_rate, self.retry).await;
        match self.complete_load(ticket, result)? {
            LoadOutcome::Loaded(buffer) => Ok(buffer),
            LoadOutcome::Stale => Err(AudioError::Superseded),
        }
    }

    /// Switch between normal and slow speech. Position restarts at zero.
    pub async fn set_rate<S: GenerationService>(
        &mut self,
        service: &S,
        slow: bool,
    ) -> Result<Arc<AudioBuffer>, AudioError> {
        let content = self
            .content
            .clone()
            .ok_or_else(|| AudioError::Synthesis("no dictation loaded".into()))?;
        self.load(service, &content, slow).await
    }

    /// Handle the output's end-of-stream notification.
    ///
    /// Only a playing run observed within the completion tolerance of the
    /// duration counts as finished; anything earlier is a stop and keeps its
    /// position. A notice arriving after a pause is always a stop.
    pub fn on_stream_ended(&mut self) -> PlaybackEvent {
        if self.status != PlaybackStatus::Playing {
            tracing::debug!(position = self.elapsed_before, "end of stream after manual stop");
            return PlaybackEvent::Interrupted;
        }
        let Some(duration) = self.duration() else {
            return PlaybackEvent::Interrupted;
        };
        let observed = self.raw_elapsed().clamp(0.0, duration);
        self.run_started_at = None;
        self.status = PlaybackStatus::Ready;
        if duration - observed <= self.completion_tolerance {
            self.elapsed_before = 0.0;
            tracing::debug!(duration, "playback completed");
            PlaybackEvent::Completed
        } else {
            self.elapsed_before = observed;
            tracing::debug!(position = observed, duration, "playback interrupted");
            PlaybackEvent::Interrupted
        }
    }

    /// Check a playing run for end of stream, either reported by the output
    /// or implied by the clock.
    pub fn poll(&mut self) -> Option<PlaybackEvent> {
        if self.status != PlaybackStatus::Playing {
            return None;
        }
        let duration = self.duration()?;
        if self.output.is_finished() || self.raw_elapsed() >= duration {
            Some(self.on_stream_ended())
        } else {
            None
        }
    }

    /// Stop output and release the device. Idempotent.
    pub fn dispose(&mut self) {
        if self.released {
            return;
        }
        self.teardown_buffer();
        self.output.release();
        self.generation += 1;
        self.status = PlaybackStatus::Idle;
        self.released = true;
        tracing::debug!("playback disposed");
    }
}

impl<O: AudioOutput, C: Clock> Drop for PlaybackController<O, C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
