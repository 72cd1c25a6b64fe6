use std::sync::Arc;

use tracing::{debug, info, warn};

use orthographe_core::error::TrainerError;
use orthographe_core::types::{CollectionKind, DictationMetadata, DifficultyLevel, UserProgress};

use crate::db::Database;
use crate::kv::KeyValueRepository;
use crate::seed::seed_catalogs;

/// Key of the progress record in `kv_store`.
pub const PROGRESS_KEY: &str = "orthographe_expert_v3_progress";

/// Completion sets and catalogs, persisted after every change.
#[derive(Debug)]
pub struct ProgressStore {
    kv: KeyValueRepository,
    progress: UserProgress,
}

impl ProgressStore {
    /// Load persisted progress and overlay it on the seed catalogs.
    ///
    /// Persisted catalogs replace seed catalogs with the same key; seed keys
    /// missing from the record are kept. An unreadable record is logged and
    /// replaced by a fresh one.
    pub fn open(db: Arc<Database>) -> Result<Self, TrainerError> {
        let kv = KeyValueRepository::new(db);
        let persisted = match kv.get(PROGRESS_KEY)? {
            Some(raw) => match serde_json::from_str::<UserProgress>(&raw) {
                Ok(progress) => progress,
                Err(e) => {
                    warn!(error = %e, "stored progress is unreadable, starting fresh");
                    UserProgress::default()
                }
            },
            None => UserProgress::default(),
        };

        let mut progress = persisted;
        for (key, entries) in seed_catalogs() {
            progress.catalogs.entry(key).or_insert(entries);
        }

        info!(
            completed_training = progress.completed_training.len(),
            completed_brevet = progress.completed_brevet.len(),
            catalogs = progress.catalogs.len(),
            "progress loaded"
        );
        Ok(Self { kv, progress })
    }

    pub fn in_memory() -> Result<Self, TrainerError> {
        Self::open(Arc::new(Database::in_memory()?))
    }

    fn persist(&self) -> Result<(), TrainerError> {
        let json = serde_json::to_string(&self.progress)?;
        self.kv.put(PROGRESS_KEY, &json)?;
        debug!(bytes = json.len(), "progress saved");
        Ok(())
    }

    /// Entries of `kind`'s catalog in catalog order.
    pub fn catalog(&self, kind: CollectionKind) -> &[DictationMetadata] {
        self.progress
            .catalogs
            .get(&kind.key())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn find_item(&self, id: &str) -> Option<&DictationMetadata> {
        let kind = CollectionKind::from_item_id(id)?;
        self.catalog(kind).iter().find(|m| m.id == id)
    }

    /// Whether `kind` holds fewer than `min_known` entries.
    pub fn needs_more(&self, kind: CollectionKind, min_known: usize) -> bool {
        self.catalog(kind).len() < min_known
    }

    /// Append the entries of `incoming` whose (author, source) is not yet in
    /// the catalog. Appended entries are renumbered after the current last
    /// index so ids stay unique. Returns the number added.
    pub fn merge_catalog(
        &mut self,
        kind: CollectionKind,
        incoming: Vec<DictationMetadata>,
    ) -> Result<usize, TrainerError> {
        let catalog = self.progress.catalogs.entry(kind.key()).or_default();
        let mut next_index = catalog.iter().map(|m| m.index).max().unwrap_or(0) + 1;
        let mut added = 0;

        for entry in incoming {
            if catalog.iter().any(|m| m.same_work(&entry.author, &entry.source)) {
                continue;
            }
            catalog.push(DictationMetadata {
                id: kind.item_id(next_index),
                index: next_index,
                ..entry
            });
            next_index += 1;
            added += 1;
        }

        if added > 0 {
            info!(collection = %kind.key(), added, total = catalog.len(), "catalog extended");
            self.persist()?;
        }
        Ok(added)
    }

    pub fn is_completed(&self, kind: CollectionKind, id: &str) -> bool {
        self.progress.completed(&kind).contains(id)
    }

    /// Record `id` as completed. Returns false if it already was.
    pub fn mark_completed(&mut self, kind: CollectionKind, id: &str) -> Result<bool, TrainerError> {
        let inserted = self.progress.completed_mut(&kind).insert(id.to_string());
        if inserted {
            info!(item = id, "item completed");
            self.persist()?;
        }
        Ok(inserted)
    }

    /// Completed items belonging to `kind`'s own catalog.
    pub fn completed_count(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Training(level) => self.progress.completed_at_level(level),
            CollectionKind::Exam => self.progress.completed_brevet.len(),
        }
    }

    /// Completion of `level` as a percentage of `target`, capped at 100.
    pub fn level_percentage(&self, level: DifficultyLevel, target: usize) -> u8 {
        if target == 0 {
            return 100;
        }
        let done = self.progress.completed_at_level(level) as f64;
        (done / target as f64 * 100.0).round().min(100.0) as u8
    }

    /// Forget all completions and generated catalogs.
    pub fn reset(&mut self) -> Result<(), TrainerError> {
        self.progress = UserProgress {
            catalogs: seed_catalogs(),
            ..UserProgress::default()
        };
        self.persist()?;
        info!("progress reset");
        Ok(())
    }
}
