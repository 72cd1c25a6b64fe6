use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use orthographe_core::types::{
    CollectionKind, DictationMetadata, ErrorKind, ErrorSpan, EvaluationResult,
};

use crate::error::GenerationError;

// =============================================================================
// Request and reply types
// =============================================================================

/// One work proposed by the catalog generator, before it is given an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub author: String,
    pub source: String,
    #[serde(default)]
    pub date: String,
}

impl CatalogEntry {
    pub fn new(
        author: impl Into<String>,
        source: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            source: source.into(),
            date: date.into(),
        }
    }
}

/// Excerpt text returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedText {
    pub content: String,
    #[serde(default)]
    pub word_count: u32,
}

/// What to ask for when generating an excerpt.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub author: String,
    pub source: String,
    pub date: String,
    pub kind: CollectionKind,
    /// Target length, e.g. `"50 à 60"`.
    pub word_range: String,
}

impl TextRequest {
    pub fn for_item(
        metadata: &DictationMetadata,
        kind: CollectionKind,
        word_range: impl Into<String>,
    ) -> Self {
        Self {
            author: metadata.author.clone(),
            source: metadata.source.clone(),
            date: metadata.date.clone(),
            kind,
            word_range: word_range.into(),
        }
    }
}

/// Give freshly generated entries ids and 1-based positions in `kind`.
///
/// Positions start at 1; the store renumbers entries it appends to an
/// existing catalog.
pub fn tag_entries(kind: CollectionKind, entries: Vec<CatalogEntry>) -> Vec<DictationMetadata> {
    entries
        .into_iter()
        .zip(1u32..)
        .map(|(entry, index)| DictationMetadata {
            id: kind.item_id(index),
            author: entry.author,
            source: entry.source,
            date: entry.date,
            index,
        })
        .collect()
}

// =============================================================================
// Trait
// =============================================================================

/// Remote text, evaluation and speech generation.
///
/// Implemented by [`crate::GeminiClient`] for production and by
/// [`MockGenerationService`] for tests.
pub trait GenerationService: Send + Sync {
    /// Propose up to `desired_count` works suitable for `kind`.
    fn generate_catalog(
        &self,
        kind: CollectionKind,
        desired_count: usize,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, GenerationError>> + Send;

    /// Generate the excerpt to dictate for one catalog entry.
    fn generate_text(
        &self,
        request: &TextRequest,
    ) -> impl Future<Output = Result<GeneratedText, GenerationError>> + Send;

    /// Synthesize `content` as speech.
    ///
    /// Returns base64-encoded 16-bit little-endian mono PCM. `slow` asks for
    /// an articulated dictation pace.
    fn synthesize_speech(
        &self,
        content: &str,
        slow: bool,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;

    /// Grade `submitted` against `original`.
    fn evaluate(
        &self,
        original: &str,
        submitted: &str,
    ) -> impl Future<Output = Result<EvaluationResult, GenerationError>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Eight zero bytes: four silent samples.
const SILENT_PCM_BASE64: &str = "AAAAAAAAAAA=";

/// Scripted generation service.
///
/// Each operation pops the next queued reply; when its queue is empty a
/// fixed default is returned (no catalog entries, a short text, four silent
/// samples, a perfect score). Calls are counted per operation.
#[derive(Debug, Default)]
pub struct MockGenerationService {
    catalogs: Mutex<VecDeque<Result<Vec<CatalogEntry>, GenerationError>>>,
    texts: Mutex<VecDeque<Result<GeneratedText, GenerationError>>>,
    speech: Mutex<VecDeque<Result<String, GenerationError>>>,
    evaluations: Mutex<VecDeque<Result<EvaluationResult, GenerationError>>>,
    catalog_calls: AtomicUsize,
    text_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
    slow_requests: AtomicUsize,
}

impl MockGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_catalog(&self, reply: Result<Vec<CatalogEntry>, GenerationError>) {
        push(&self.catalogs, reply);
    }

    pub fn push_text(&self, reply: Result<GeneratedText, GenerationError>) {
        push(&self.texts, reply);
    }

    pub fn push_speech(&self, reply: Result<String, GenerationError>) {
        push(&self.speech, reply);
    }

    pub fn push_evaluation(&self, reply: Result<EvaluationResult, GenerationError>) {
        push(&self.evaluations, reply);
    }

    /// Queue a successful evaluation with `score` and the given errors.
    pub fn push_score(&self, score: f64, errors: Vec<ErrorSpan>) {
        self.push_evaluation(Ok(EvaluationResult {
            score,
            comment: format!("Note : {score}/10"),
            correct_text: String::new(),
            errors,
        }));
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    /// Number of speech requests made in slow mode.
    pub fn slow_requests(&self) -> usize {
        self.slow_requests.load(Ordering::SeqCst)
    }
}

fn push<T>(queue: &Mutex<VecDeque<T>>, item: T) {
    match queue.lock() {
        Ok(mut q) => q.push_back(item),
        Err(poisoned) => poisoned.into_inner().push_back(item),
    }
}

fn pop<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    match queue.lock() {
        Ok(mut q) => q.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

impl GenerationService for MockGenerationService {
    async fn generate_catalog(
        &self,
        kind: CollectionKind,
        desired_count: usize,
    ) -> Result<Vec<CatalogEntry>, GenerationError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(collection = %kind.key(), desired_count, "mock catalog request");
        pop(&self.catalogs).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<GeneratedText, GenerationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.texts).unwrap_or_else(|| {
            let content = format!("Un extrait de {} tiré de {}.", request.author, request.source);
            let word_count = content.split_whitespace().count() as u32;
            Ok(GeneratedText {
                content,
                word_count,
            })
        })
    }

    async fn synthesize_speech(&self, content: &str, slow: bool) -> Result<String, GenerationError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        if slow {
            self.slow_requests.fetch_add(1, Ordering::SeqCst);
        }
        tracing::debug!(chars = content.chars().count(), slow, "mock speech request");
        pop(&self.speech).unwrap_or_else(|| Ok(SILENT_PCM_BASE64.to_string()))
    }

    async fn evaluate(
        &self,
        original: &str,
        submitted: &str,
    ) -> Result<EvaluationResult, GenerationError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.evaluations).unwrap_or_else(|| {
            let errors = if original.trim() == submitted.trim() {
                Vec::new()
            } else {
                vec![ErrorSpan::new(ErrorKind::Lexical, 0, 0).with_hint("Relis ton texte.")]
            };
            Ok(EvaluationResult {
                score: if errors.is_empty() { 10.0 } else { 5.0 },
                comment: String::new(),
                correct_text: original.to_string(),
                errors,
            })
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
