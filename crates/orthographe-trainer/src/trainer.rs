use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use orthographe_core::config::{CatalogConfig, TrainerConfig};
use orthographe_core::error::{Result, TrainerError};
use orthographe_core::events::DomainEvent;
use orthographe_core::types::{
    CollectionKind, DictationMetadata, DictationText, DifficultyLevel, Timestamp,
};
use orthographe_gemini::{tag_entries, GenerationService, TextRequest};
use orthographe_review::ScoringPolicy;
use orthographe_storage::ProgressStore;

use crate::session::{DictationSession, SubmissionOutcome};

const EVENT_CAPACITY: usize = 64;

/// Progress through one training level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelProgress {
    pub level: DifficultyLevel,
    pub completed: usize,
    pub target: usize,
    pub percentage: u8,
    /// Entries currently in the level's catalog.
    pub known: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub levels: Vec<LevelProgress>,
    pub brevet_completed: usize,
    pub brevet_known: usize,
}

impl ProgressSummary {
    /// Per-level completion against `target` texts per level.
    pub fn from_store(store: &ProgressStore, target: usize) -> Self {
        let levels = DifficultyLevel::all()
            .map(|level| {
                let kind = CollectionKind::Training(level);
                LevelProgress {
                    level,
                    completed: store.completed_count(kind),
                    target,
                    percentage: store.level_percentage(level, target),
                    known: store.catalog(kind).len(),
                }
            })
            .collect();
        Self {
            levels,
            brevet_completed: store.completed_count(CollectionKind::Exam),
            brevet_known: store.catalog(CollectionKind::Exam).len(),
        }
    }
}

/// Dictation workflow over a generation service and a progress store.
pub struct Trainer<S: GenerationService> {
    service: Arc<S>,
    store: ProgressStore,
    catalog_config: CatalogConfig,
    policy: ScoringPolicy,
    events: broadcast::Sender<DomainEvent>,
}

impl<S: GenerationService> Trainer<S> {
    pub fn new(service: Arc<S>, store: ProgressStore, config: &TrainerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            store,
            catalog_config: config.catalog.clone(),
            policy: ScoringPolicy::from(&config.scoring),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn into_store(self) -> ProgressStore {
        self.store
    }

    fn emit(&self, event: DomainEvent) {
        tracing::debug!(event = event.event_name(), "domain event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Target excerpt length for `kind`, e.g. `"50 à 60"`.
    pub fn word_range(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::Training(_) => &self.catalog_config.training_word_range,
            CollectionKind::Exam => &self.catalog_config.exam_word_range,
        }
    }

    pub fn catalog(&self, kind: CollectionKind) -> &[DictationMetadata] {
        self.store.catalog(kind)
    }

    /// First entry of `kind` not yet completed, else the first entry.
    pub fn next_item(&self, kind: CollectionKind) -> Option<&DictationMetadata> {
        let catalog = self.store.catalog(kind);
        catalog
            .iter()
            .find(|m| !self.store.is_completed(kind, &m.id))
            .or_else(|| catalog.first())
    }

    // =========================================================================
    // Catalogs
    // =========================================================================

    /// Extend `kind`'s catalog when it is short.
    ///
    /// Generation failures are logged and reported as an event; the current
    /// catalog stays usable and `Ok(0)` is returned. Storage failures are
    /// returned.
    pub async fn ensure_catalog(&mut self, kind: CollectionKind) -> Result<usize> {
        if !self.store.needs_more(kind, self.catalog_config.min_known_items) {
            return Ok(0);
        }
        let desired = match kind {
            CollectionKind::Training(_) => self.catalog_config.training_fetch_count,
            CollectionKind::Exam => self.catalog_config.exam_fetch_count,
        };
        info!(collection = %kind.key(), desired, "extending catalog");

        let entries = match self.service.generate_catalog(kind, desired).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(collection = %kind.key(), error = %e, "catalog prefetch failed");
                self.emit(DomainEvent::CatalogFetchFailed {
                    collection: kind.key(),
                    reason: e.to_string(),
                    timestamp: Timestamp::now(),
                });
                return Ok(0);
            }
        };

        let added = self.store.merge_catalog(kind, tag_entries(kind, entries))?;
        if added > 0 {
            self.emit(DomainEvent::CatalogExtended {
                collection: kind.key(),
                added,
                total: self.store.catalog(kind).len(),
                timestamp: Timestamp::now(),
            });
        }
        Ok(added)
    }

    // =========================================================================
    // Dictations
    // =========================================================================

    /// Generate the excerpt for catalog item `item_id` and open a session.
    pub async fn load_dictation(&self, item_id: &str) -> Result<DictationSession> {
        let metadata = self
            .store
            .find_item(item_id)
            .cloned()
            .ok_or_else(|| TrainerError::UnknownItem(item_id.to_string()))?;
        let kind = CollectionKind::from_item_id(item_id)
            .ok_or_else(|| TrainerError::UnknownItem(item_id.to_string()))?;

        let request = TextRequest::for_item(&metadata, kind, self.word_range(kind));
        let generated = match self.service.generate_text(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(item = item_id, error = %e, "dictation text generation failed");
                self.emit(DomainEvent::DictationFailed {
                    item_id: item_id.to_string(),
                    reason: e.to_string(),
                    timestamp: Timestamp::now(),
                });
                return Err(e.into());
            }
        };

        let session = DictationSession::new(DictationText {
            metadata,
            content: generated.content,
            word_count: generated.word_count,
            kind,
        });
        info!(
            session = %session.id,
            item = item_id,
            words = session.text.word_count,
            "dictation loaded"
        );
        self.emit(DomainEvent::DictationLoaded {
            session_id: session.id,
            item_id: item_id.to_string(),
            word_count: session.text.word_count,
            timestamp: Timestamp::now(),
        });
        Ok(session)
    }

    /// Grade a first submission. A passing score marks the item completed.
    pub async fn submit(
        &mut self,
        session: &mut DictationSession,
        submission: &str,
    ) -> Result<SubmissionOutcome> {
        self.grade(session, submission, false).await
    }

    /// Grade a revised submission. The result is shown but completion sets
    /// are left as they are.
    pub async fn self_correct(
        &mut self,
        session: &mut DictationSession,
        revised: &str,
    ) -> Result<SubmissionOutcome> {
        self.grade(session, revised, true).await
    }

    async fn grade(
        &mut self,
        session: &mut DictationSession,
        submission: &str,
        self_correction: bool,
    ) -> Result<SubmissionOutcome> {
        if submission.trim().is_empty() {
            return Err(TrainerError::EmptySubmission);
        }

        let mut evaluation = self
            .service
            .evaluate(session.content(), submission)
            .await
            .map_err(|e| {
                warn!(session = %session.id, error = %e, "evaluation failed");
                TrainerError::from(e)
            })?;
        evaluation.score = self.policy.normalized_score(evaluation.score);

        let score = evaluation.score;
        let passed = self.policy.is_passing(score);
        let newly_completed = if passed && !self_correction {
            self.store.mark_completed(session.kind(), session.item_id())?
        } else {
            false
        };

        info!(
            session = %session.id,
            item = session.item_id(),
            score,
            errors = evaluation.errors.len(),
            self_correction,
            "submission graded"
        );
        self.emit(DomainEvent::EvaluationReceived {
            session_id: session.id,
            item_id: session.item_id().to_string(),
            score,
            error_count: evaluation.errors.len(),
            self_correction,
            timestamp: Timestamp::now(),
        });
        if newly_completed {
            self.emit(DomainEvent::ItemCompleted {
                item_id: session.item_id().to_string(),
                score,
                timestamp: Timestamp::now(),
            });
        }

        let outcome = SubmissionOutcome {
            band: self.policy.band(score),
            breakdown: self.policy.breakdown(&evaluation),
            passed,
            newly_completed,
            self_correction,
            evaluation: evaluation.clone(),
        };
        session.record(submission, evaluation);
        Ok(outcome)
    }

    // =========================================================================
    // Progress
    // =========================================================================

    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary::from_store(&self.store, self.catalog_config.texts_per_level)
    }

    /// Clear completions and generated catalogs.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()?;
        self.emit(DomainEvent::ProgressReset {
            timestamp: Timestamp::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthographe_gemini::{CatalogEntry, GenerationError, MockGenerationService};

    fn level(n: u8) -> CollectionKind {
        CollectionKind::Training(DifficultyLevel::new(n).unwrap())
    }

    fn trainer() -> Trainer<MockGenerationService> {
        Trainer::new(
            Arc::new(MockGenerationService::new()),
            ProgressStore::in_memory().unwrap(),
            &TrainerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_catalog_is_not_extended() {
        let mut trainer = trainer();
        assert_eq!(trainer.ensure_catalog(level(1)).await.unwrap(), 0);
        assert_eq!(trainer.service().catalog_calls(), 0);
    }

    #[tokio::test]
    async fn test_short_catalog_is_extended() {
        let mut trainer = trainer();
        let mut events = trainer.subscribe();
        trainer.service().push_catalog(Ok(vec![
            CatalogEntry::new("Jean RACINE", "Phèdre", "1677"),
            CatalogEntry::new("MOLIÈRE", "Le Misanthrope", "1666"),
        ]));
        assert_eq!(trainer.ensure_catalog(level(3)).await.unwrap(), 2);
        assert_eq!(trainer.catalog(level(3)).len(), 2);

        let event = events.try_recv().unwrap();
        assert_eq!(event.event_name(), "catalog_extended");
    }

    #[tokio::test]
    async fn test_prefetch_failure_is_ignored() {
        let mut trainer = trainer();
        let mut events = trainer.subscribe();
        trainer
            .service()
            .push_catalog(Err(GenerationError::Status {
                status: 503,
                body: "unavailable".into(),
            }));
        assert_eq!(trainer.ensure_catalog(level(2)).await.unwrap(), 0);
        assert_eq!(trainer.catalog(level(2)).len(), 5);
        assert_eq!(events.try_recv().unwrap().event_name(), "catalog_fetch_failed");
    }

    #[tokio::test]
    async fn test_word_ranges() {
        let trainer = trainer();
        assert_eq!(trainer.word_range(level(4)), "50 à 60");
        assert_eq!(trainer.word_range(CollectionKind::Exam), "120 à 140");
    }

    #[tokio::test]
    async fn test_load_unknown_item() {
        let trainer = trainer();
        let err = trainer.load_dictation("level-1-text-99").await.unwrap_err();
        assert!(matches!(err, TrainerError::UnknownItem(_)));
    }

    #[tokio::test]
    async fn test_load_failure_is_returned() {
        let trainer = trainer();
        trainer
            .service()
            .push_text(Err(GenerationError::EmptyResponse("no text".into())));
        let err = trainer.load_dictation("level-1-text-1").await.unwrap_err();
        assert!(matches!(err, TrainerError::Generation(_)));
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let mut trainer = trainer();
        let mut session = trainer.load_dictation("brevet-text-1").await.unwrap();
        let err = trainer.submit(&mut session, "   \n").await.unwrap_err();
        assert!(matches!(err, TrainerError::EmptySubmission));
        assert_eq!(trainer.service().evaluate_calls(), 0);
    }

    #[tokio::test]
    async fn test_next_item_skips_completed() {
        let mut trainer = trainer();
        assert_eq!(trainer.next_item(level(1)).unwrap().id, "level-1-text-1");
        assert!(trainer.next_item(level(3)).is_none());

        let mut session = trainer.load_dictation("level-1-text-1").await.unwrap();
        trainer.service().push_score(6.0, Vec::new());
        trainer.submit(&mut session, "Un texte.").await.unwrap();
        assert_eq!(trainer.next_item(level(1)).unwrap().id, "level-1-text-2");
    }

    #[tokio::test]
    async fn test_progress_summary() {
        let trainer = trainer();
        let summary = trainer.progress_summary();
        assert_eq!(summary.levels.len(), 4);
        assert_eq!(summary.levels[0].known, 10);
        assert_eq!(summary.levels[0].target, 50);
        assert_eq!(summary.levels[0].percentage, 0);
        assert_eq!(summary.brevet_known, 8);
        assert_eq!(summary.brevet_completed, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_completions() {
        let mut trainer = trainer();
        let mut session = trainer.load_dictation("brevet-text-2").await.unwrap();
        trainer.service().push_score(9.0, Vec::new());
        trainer.submit(&mut session, "Un texte.").await.unwrap();
        assert_eq!(trainer.progress_summary().brevet_completed, 1);

        let mut events = trainer.subscribe();
        trainer.reset().unwrap();
        assert_eq!(trainer.progress_summary().brevet_completed, 0);
        assert_eq!(events.try_recv().unwrap().event_name(), "progress_reset");
    }
}
