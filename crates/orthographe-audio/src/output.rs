//! Sound output sinks driven by the playback controller.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AudioError;
use crate::pcm::AudioBuffer;

/// A sink that plays one buffer at a time.
///
/// `play` replaces whatever was playing. Implementations need not be `Send`:
/// device streams are owned by the thread that opened them.
pub trait AudioOutput {
    /// Start playing `buffer` from `offset_secs`.
    fn play(&mut self, buffer: &Arc<AudioBuffer>, offset_secs: f64) -> Result<(), AudioError>;

    fn stop(&mut self);

    /// Whether the last started run has played to its end.
    fn is_finished(&self) -> bool;

    /// Release the underlying device. Safe to call more than once.
    fn release(&mut self);
}

impl<O: AudioOutput + ?Sized> AudioOutput for Box<O> {
    fn play(&mut self, buffer: &Arc<AudioBuffer>, offset_secs: f64) -> Result<(), AudioError> {
        (**self).play(buffer, offset_secs)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

// =============================================================================
// Silent output
// =============================================================================

/// Output that produces no sound; completion is detected from the clock.
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&mut self, buffer: &Arc<AudioBuffer>, offset_secs: f64) -> Result<(), AudioError> {
        tracing::debug!(offset_secs, duration_secs = buffer.duration(), "silent playback");
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_finished(&self) -> bool {
        false
    }

    fn release(&mut self) {}
}

// =============================================================================
// Mock output
// =============================================================================

/// Calls observed by a [`MockAudioOutput`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OutputLog {
    /// Start offsets of every `play` call, in order.
    pub plays: Vec<f64>,
    pub stops: usize,
    pub releases: usize,
    pub finished: bool,
    pub fail_next_play: bool,
}

/// Recording output for tests. Clones share one [`OutputLog`].
#[derive(Debug, Default, Clone)]
pub struct MockAudioOutput {
    log: Arc<Mutex<OutputLog>>,
}

impl MockAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OutputLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log(&self) -> OutputLog {
        self.lock().clone()
    }

    /// Simulate the device reaching the end of the buffer.
    pub fn set_finished(&self, finished: bool) {
        self.lock().finished = finished;
    }

    pub fn fail_next_play(&self) {
        self.lock().fail_next_play = true;
    }
}

impl AudioOutput for MockAudioOutput {
    fn play(&mut self, _buffer: &Arc<AudioBuffer>, offset_secs: f64) -> Result<(), AudioError> {
        let mut log = self.lock();
        if std::mem::take(&mut log.fail_next_play) {
            return Err(AudioError::Device("mock output refused to start".into()));
        }
        log.plays.push(offset_secs);
        log.finished = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stops += 1;
    }

    fn is_finished(&self) -> bool {
        self.lock().finished
    }

    fn release(&mut self) {
        self.lock().releases += 1;
    }
}

// =============================================================================
// Device output
// =============================================================================

#[cfg(feature = "device")]
pub use device::DeviceOutput;

#[cfg(feature = "device")]
mod device {
    use std::sync::Arc;
    use std::time::Duration;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::AudioOutput;
    use crate::error::AudioError;
    use crate::pcm::AudioBuffer;

    /// Default output device through rodio.
    pub struct DeviceOutput {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
    }

    impl DeviceOutput {
        pub fn open_default() -> Result<Self, AudioError> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
            tracing::info!("audio output device opened");
            Ok(Self {
                _stream: stream,
                handle,
                sink: None,
            })
        }
    }

    impl AudioOutput for DeviceOutput {
        fn play(&mut self, buffer: &Arc<AudioBuffer>, offset_secs: f64) -> Result<(), AudioError> {
            self.stop();
            let sink = Sink::try_new(&self.handle).map_err(|e| AudioError::Device(e.to_string()))?;
            let source = SamplesBuffer::new(1, buffer.sample_rate(), buffer.samples().to_vec())
                .skip_duration(Duration::from_secs_f64(offset_secs.max(0.0)));
            sink.append(source);
            sink.play();
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn is_finished(&self) -> bool {
            self.sink.as_ref().is_some_and(|s| s.empty())
        }

        fn release(&mut self) {
            self.stop();
        }
    }
}
