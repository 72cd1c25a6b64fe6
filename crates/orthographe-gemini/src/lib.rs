//! Orthographe Gemini crate - the boundary to the generative AI service.
//!
//! Catalogs, dictation texts, speech audio and evaluations are all produced
//! remotely. This crate defines the `GenerationService` trait the rest of the
//! workspace depends on, the Gemini REST client implementing it, and a
//! scripted mock for tests.

pub mod client;
pub mod error;
pub mod prompts;
pub mod service;
pub mod wire;

pub use client::GeminiClient;
pub use error::GenerationError;
pub use service::{
    tag_entries, CatalogEntry, GeneratedText, GenerationService, MockGenerationService,
    TextRequest,
};
