use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Domain events emitted by the trainer after state changes.
///
/// Consumed by the terminal front end (status lines) and by the log.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// New entries were merged into a collection's catalog.
    CatalogExtended {
        collection: String,
        added: usize,
        total: usize,
        timestamp: Timestamp,
    },

    /// Catalog prefetch failed; the existing catalog is kept.
    CatalogFetchFailed {
        collection: String,
        reason: String,
        timestamp: Timestamp,
    },

    /// Dictation text was generated and a session opened.
    DictationLoaded {
        session_id: Uuid,
        item_id: String,
        word_count: u32,
        timestamp: Timestamp,
    },

    /// Dictation text generation failed.
    DictationFailed {
        item_id: String,
        reason: String,
        timestamp: Timestamp,
    },

    /// The evaluator graded a submission.
    EvaluationReceived {
        session_id: Uuid,
        item_id: String,
        score: f64,
        error_count: usize,
        self_correction: bool,
        timestamp: Timestamp,
    },

    /// An item reached the pass threshold and joined a completion set.
    ItemCompleted {
        item_id: String,
        score: f64,
        timestamp: Timestamp,
    },

    /// All progress and fetched catalogs were cleared.
    ProgressReset { timestamp: Timestamp },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DomainEvent::CatalogExtended { timestamp, .. }
            | DomainEvent::CatalogFetchFailed { timestamp, .. }
            | DomainEvent::DictationLoaded { timestamp, .. }
            | DomainEvent::DictationFailed { timestamp, .. }
            | DomainEvent::EvaluationReceived { timestamp, .. }
            | DomainEvent::ItemCompleted { timestamp, .. }
            | DomainEvent::ProgressReset { timestamp } => *timestamp,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::CatalogExtended { .. } => "catalog_extended",
            DomainEvent::CatalogFetchFailed { .. } => "catalog_fetch_failed",
            DomainEvent::DictationLoaded { .. } => "dictation_loaded",
            DomainEvent::DictationFailed { .. } => "dictation_failed",
            DomainEvent::EvaluationReceived { .. } => "evaluation_received",
            DomainEvent::ItemCompleted { .. } => "item_completed",
            DomainEvent::ProgressReset { .. } => "progress_reset",
        }
    }
}
