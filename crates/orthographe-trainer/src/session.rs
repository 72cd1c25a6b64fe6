use chrono::{DateTime, Utc};
use uuid::Uuid;

use orthographe_core::types::{CollectionKind, DictationText, EvaluationResult};
use orthographe_review::{ErrorBreakdown, ScoreBand};

/// One dictation being worked on: the generated excerpt and the latest
/// graded attempt.
#[derive(Debug, Clone)]
pub struct DictationSession {
    pub id: Uuid,
    pub text: DictationText,
    pub started_at: DateTime<Utc>,
    /// Number of graded attempts, self-corrections included.
    pub attempts: u32,
    pub last_submission: Option<String>,
    pub last_evaluation: Option<EvaluationResult>,
}

impl DictationSession {
    pub fn new(text: DictationText) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            started_at: Utc::now(),
            attempts: 0,
            last_submission: None,
            last_evaluation: None,
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.text.kind
    }

    pub fn item_id(&self) -> &str {
        &self.text.metadata.id
    }

    pub fn content(&self) -> &str {
        &self.text.content
    }

    /// Whether a first submission has been graded.
    pub fn is_graded(&self) -> bool {
        self.last_evaluation.is_some()
    }

    pub(crate) fn record(&mut self, submission: &str, evaluation: EvaluationResult) {
        self.attempts += 1;
        self.last_submission = Some(submission.to_string());
        self.last_evaluation = Some(evaluation);
    }
}

/// Result of grading a submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub evaluation: EvaluationResult,
    pub band: ScoreBand,
    pub breakdown: ErrorBreakdown,
    /// The score reached the pass threshold.
    pub passed: bool,
    /// This attempt added the item to a completion set.
    pub newly_completed: bool,
    pub self_correction: bool,
}
