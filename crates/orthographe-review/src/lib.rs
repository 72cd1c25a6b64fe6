//! Orthographe Review crate - annotated rendering and grading of a submission.
//!
//! The highlighter flattens possibly overlapping, nested or adjacent error
//! spans into an ordered partition of the submitted text. The scoring module
//! turns evaluator scores into completion decisions and score bands.

pub mod highlight;
pub mod scoring;

pub use highlight::{highlight, render, CoveringError, HighlightedSegment, Segment};
pub use scoring::{ErrorBreakdown, ScoreBand, ScoringPolicy};
