use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TrainerError;

// =============================================================================
// Collections
// =============================================================================

/// Difficulty tier of the daily training module (1 to 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(level: u8) -> Result<Self, TrainerError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(TrainerError::InvalidLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All four levels in ascending order.
    pub fn all() -> impl Iterator<Item = DifficultyLevel> {
        (Self::MIN..=Self::MAX).map(DifficultyLevel)
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for DifficultyLevel {
    type Error = TrainerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which collection a dictation belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "module", content = "level")]
pub enum CollectionKind {
    /// Daily training at one of four difficulty levels.
    Training(DifficultyLevel),
    /// Brevet exam practice.
    Exam,
}

impl CollectionKind {
    /// Storage key of the collection's catalog (`level-N` or `brevet`).
    pub fn key(&self) -> String {
        match self {
            CollectionKind::Training(level) => format!("level-{}", level),
            CollectionKind::Exam => "brevet".to_string(),
        }
    }

    /// Identifier of the `index`-th item of this collection (1-based).
    pub fn item_id(&self, index: u32) -> String {
        format!("{}-text-{}", self.key(), index)
    }

    /// Parse a collection key produced by [`CollectionKind::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "brevet" {
            return Some(CollectionKind::Exam);
        }
        let level = key.strip_prefix("level-")?.parse::<u8>().ok()?;
        DifficultyLevel::new(level).ok().map(CollectionKind::Training)
    }

    /// Find the collection an item id belongs to.
    pub fn from_item_id(id: &str) -> Option<Self> {
        let (key, index) = id.rsplit_once("-text-")?;
        index.parse::<u32>().ok()?;
        Self::from_key(key)
    }

    pub fn is_training(&self) -> bool {
        matches!(self, CollectionKind::Training(_))
    }

    /// Level used when generating text; exam practice is generated as level 1.
    pub fn level(&self) -> DifficultyLevel {
        match self {
            CollectionKind::Training(level) => *level,
            CollectionKind::Exam => DifficultyLevel::default(),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Training(level) => write!(f, "Niveau {}", level),
            CollectionKind::Exam => write!(f, "Annales du Brevet"),
        }
    }
}

/// Catalog entry describing a literary excerpt available for dictation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictationMetadata {
    pub id: String,
    pub author: String,
    pub source: String,
    pub date: String,
    /// 1-based position within the collection.
    pub index: u32,
}

impl DictationMetadata {
    /// Whether this entry names the given work (author and source match).
    pub fn same_work(&self, author: &str, source: &str) -> bool {
        self.author == author && self.source == source
    }
}

/// A dictation whose text has been generated and is ready to be read aloud.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationText {
    #[serde(flatten)]
    pub metadata: DictationMetadata,
    pub content: String,
    pub word_count: u32,
    pub kind: CollectionKind,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Category of an annotated mistake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Grammar,
    /// Spelling or vocabulary. Unknown categories from the evaluator land here.
    #[default]
    Lexical,
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "grammar" | "grammaire" => ErrorKind::Grammar,
            _ => ErrorKind::Lexical,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Grammar => write!(f, "grammar"),
            ErrorKind::Lexical => write!(f, "lexical"),
        }
    }
}

/// An annotated error over the user's submitted text.
///
/// Offsets count Unicode scalar values. They are signed so that malformed
/// values from the evaluator deserialize and can be dropped at render time
/// instead of failing the whole evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSpan {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub hint: String,
    #[serde(deserialize_with = "lenient_offset")]
    pub start_index: i64,
    #[serde(deserialize_with = "lenient_offset")]
    pub end_index: i64,
}

impl ErrorSpan {
    pub fn new(kind: ErrorKind, start_index: i64, end_index: i64) -> Self {
        Self {
            text: String::new(),
            kind,
            hint: String::new(),
            start_index,
            end_index,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Width of the span; zero for degenerate or inverted spans.
    pub fn span_len(&self) -> i64 {
        (self.end_index - self.start_index).max(0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.start_index >= self.end_index
    }
}

/// JSON numbers may arrive as floats (`3.0`); truncate toward zero.
fn lenient_offset<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOffset {
        Int(i64),
        Float(f64),
    }

    Ok(match RawOffset::deserialize(deserializer)? {
        RawOffset::Int(value) => value,
        RawOffset::Float(value) => value.trunc() as i64,
    })
}

/// Graded comparison returned by the evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Score out of 10.
    pub score: f64,
    pub comment: String,
    pub correct_text: String,
    pub errors: Vec<ErrorSpan>,
}

impl EvaluationResult {
    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Persisted learner progress and known catalogs.
///
/// Field names match the historical JSON record so previously saved progress
/// keeps loading.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub completed_training: BTreeSet<String>,
    #[serde(default)]
    pub completed_brevet: BTreeSet<String>,
    #[serde(default)]
    pub catalogs: BTreeMap<String, Vec<DictationMetadata>>,
}

impl UserProgress {
    /// Completion set for the module `kind` belongs to.
    pub fn completed(&self, kind: &CollectionKind) -> &BTreeSet<String> {
        if kind.is_training() {
            &self.completed_training
        } else {
            &self.completed_brevet
        }
    }

    pub fn completed_mut(&mut self, kind: &CollectionKind) -> &mut BTreeSet<String> {
        if kind.is_training() {
            &mut self.completed_training
        } else {
            &mut self.completed_brevet
        }
    }

    /// Number of completed training items at `level`.
    pub fn completed_at_level(&self, level: DifficultyLevel) -> usize {
        let prefix = format!("level-{}-", level);
        self.completed_training
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .count()
    }
}

// =============================================================================
// Time
// =============================================================================

/// Unix timestamp in seconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_level_bounds() {
        assert!(DifficultyLevel::new(0).is_err());
        assert!(DifficultyLevel::new(5).is_err());
        assert_eq!(DifficultyLevel::new(4).unwrap().get(), 4);
        assert_eq!(DifficultyLevel::all().count(), 4);
    }

    #[test]
    fn test_difficulty_level_serde_rejects_out_of_range() {
        let ok: DifficultyLevel = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<DifficultyLevel>("9").is_err());
    }

    #[test]
    fn test_collection_keys_and_ids() {
        let level2 = CollectionKind::Training(DifficultyLevel::new(2).unwrap());
        assert_eq!(level2.key(), "level-2");
        assert_eq!(level2.item_id(7), "level-2-text-7");
        assert_eq!(CollectionKind::Exam.key(), "brevet");
        assert_eq!(CollectionKind::Exam.item_id(12), "brevet-text-12");
    }

    #[test]
    fn test_collection_from_key() {
        assert_eq!(CollectionKind::from_key("brevet"), Some(CollectionKind::Exam));
        assert_eq!(
            CollectionKind::from_key("level-4"),
            Some(CollectionKind::Training(DifficultyLevel::new(4).unwrap()))
        );
        assert_eq!(CollectionKind::from_key("level-9"), None);
        assert_eq!(CollectionKind::from_key("other"), None);
    }

    #[test]
    fn test_collection_from_item_id() {
        assert_eq!(
            CollectionKind::from_item_id("level-1-text-5"),
            Some(CollectionKind::Training(DifficultyLevel::new(1).unwrap()))
        );
        assert_eq!(
            CollectionKind::from_item_id("brevet-text-12"),
            Some(CollectionKind::Exam)
        );
        assert_eq!(CollectionKind::from_item_id("brevet-text-x"), None);
        assert_eq!(CollectionKind::from_item_id("nothing"), None);
    }

    #[test]
    fn test_error_span_deserializes_wire_shape() {
        let json = r#"{"text":"chevaus","type":"lexical","hint":"Pluriel en -aux","startIndex":4,"endIndex":11}"#;
        let span: ErrorSpan = serde_json::from_str(json).unwrap();
        assert_eq!(span.kind, ErrorKind::Lexical);
        assert_eq!(span.start_index, 4);
        assert_eq!(span.end_index, 11);
        assert_eq!(span.span_len(), 7);
    }

    #[test]
    fn test_error_span_tolerates_float_and_negative_offsets() {
        let json = r#"{"text":"x","type":"grammar","hint":"","startIndex":-3,"endIndex":5.7}"#;
        let span: ErrorSpan = serde_json::from_str(json).unwrap();
        assert_eq!(span.kind, ErrorKind::Grammar);
        assert_eq!(span.start_index, -3);
        assert_eq!(span.end_index, 5);
    }

    #[test]
    fn test_unknown_error_kind_is_lexical() {
        let kind: ErrorKind = serde_json::from_str(r#""punctuation""#).unwrap();
        assert_eq!(kind, ErrorKind::Lexical);
        let kind: ErrorKind = serde_json::from_str(r#""Grammar""#).unwrap();
        assert_eq!(kind, ErrorKind::Grammar);
    }

    #[test]
    fn test_degenerate_span() {
        assert!(ErrorSpan::new(ErrorKind::Grammar, 3, 3).is_degenerate());
        assert_eq!(ErrorSpan::new(ErrorKind::Grammar, 5, 2).span_len(), 0);
    }

    #[test]
    fn test_evaluation_result_wire_shape() {
        let json = r#"{
            "score": 7.5,
            "comment": "Bon travail",
            "correctText": "Il était une fois.",
            "errors": [
                {"text":"etait","type":"lexical","hint":"accent","startIndex":3,"endIndex":8},
                {"text":"fois","type":"grammar","hint":"","startIndex":13,"endIndex":17}
            ]
        }"#;
        let result: EvaluationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.score, 7.5);
        assert_eq!(result.count_of(ErrorKind::Lexical), 1);
        assert_eq!(result.count_of(ErrorKind::Grammar), 1);
    }

    #[test]
    fn test_evaluation_result_missing_field_fails() {
        let json = r#"{"score": 4, "comment": "x", "errors": []}"#;
        assert!(serde_json::from_str::<EvaluationResult>(json).is_err());
    }

    #[test]
    fn test_user_progress_legacy_record() {
        let json = r#"{
            "completedTraining": ["level-1-text-1", "level-2-text-3", "level-1-text-4"],
            "completedBrevet": [],
            "catalogs": {"level-1": [{"id":"level-1-text-1","author":"Colette","source":"Sido","date":"1930","index":1}]}
        }"#;
        let progress: UserProgress = serde_json::from_str(json).unwrap();
        let level1 = DifficultyLevel::new(1).unwrap();
        assert_eq!(progress.completed_at_level(level1), 2);
        assert_eq!(progress.catalogs["level-1"][0].author, "Colette");
    }

    #[test]
    fn test_user_progress_missing_sections_default() {
        let progress: UserProgress = serde_json::from_str("{}").unwrap();
        assert!(progress.completed_training.is_empty());
        assert!(progress.catalogs.is_empty());
    }

    #[test]
    fn test_completed_sets_are_per_module() {
        let mut progress = UserProgress::default();
        progress
            .completed_mut(&CollectionKind::Exam)
            .insert("brevet-text-1".to_string());
        assert!(progress.completed_training.is_empty());
        assert_eq!(progress.completed(&CollectionKind::Exam).len(), 1);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = Timestamp(1_700_000_000);
        assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
    }
}
