//! Dictation training workflow.
//!
//! Ties the generation service, the progress store and the scoring policy
//! together: catalog growth, excerpt loading, grading and completion
//! tracking. State changes are announced as [`DomainEvent`]s on a broadcast
//! channel.
//!
//! [`DomainEvent`]: orthographe_core::DomainEvent

pub mod session;
pub mod trainer;

pub use session::{DictationSession, SubmissionOutcome};
pub use trainer::{LevelProgress, ProgressSummary, Trainer};
