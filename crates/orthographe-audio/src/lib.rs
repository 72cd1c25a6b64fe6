//! Speech audio for dictations: decoding of synthesized PCM, output sinks,
//! and the playback controller that tracks play/pause position across
//! reloads.

pub mod clock;
pub mod error;
pub mod output;
pub mod pcm;
pub mod playback;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AudioError;
#[cfg(feature = "device")]
pub use output::DeviceOutput;
pub use output::{AudioOutput, MockAudioOutput, NullOutput, OutputLog};
pub use pcm::{decode_base64_pcm, AudioBuffer};
pub use playback::{
    fetch_speech, LoadOutcome, LoadTicket, PlaybackController, PlaybackEvent, PlaybackStatus,
    SynthesisRetry,
};
