//! Overlap highlighter.
//!
//! Partitions a submitted text into the minimal ordered set of segments whose
//! boundaries are the start and end offsets of every error span. Each segment
//! carries the errors that fully contain it, widest first, so a renderer can
//! nest annotations outermost to innermost.
//!
//! Offsets are counted in chars. Offsets outside `[0, len]` are dropped as
//! boundaries; a malformed span never makes rendering fail.

use std::cmp::Reverse;

use orthographe_core::types::ErrorSpan;

/// An error covering a segment, with its position in the input sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoveringError<'a> {
    /// Index of the error in the slice passed to [`render`].
    pub ordinal: usize,
    pub span: &'a ErrorSpan,
}

/// A maximal run of text covered by the same set of errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    /// Start offset in chars, inclusive.
    pub start: usize,
    /// End offset in chars, exclusive.
    pub end: usize,
    /// Errors containing `[start, end)`, widest first, ties in input order.
    pub covering_errors: Vec<CoveringError<'a>>,
}

impl<'a> Segment<'a> {
    /// Plain text with no annotation.
    pub fn is_plain(&self) -> bool {
        self.covering_errors.is_empty()
    }

    /// The widest covering error, which wraps all the others.
    pub fn outermost(&self) -> Option<&'a ErrorSpan> {
        self.covering_errors.first().map(|c| c.span)
    }

    /// The narrowest covering error.
    pub fn innermost(&self) -> Option<&'a ErrorSpan> {
        self.covering_errors.last().map(|c| c.span)
    }

    /// Covering errors in nesting order, outermost first.
    pub fn errors(&self) -> impl DoubleEndedIterator<Item = &'a ErrorSpan> + '_ {
        self.covering_errors.iter().map(|c| c.span)
    }

    /// The segment's text within `text`.
    ///
    /// `text` must be the string the segment was rendered from.
    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        let byte_at = |char_idx: usize| {
            text.char_indices()
                .nth(char_idx)
                .map(|(b, _)| b)
                .unwrap_or(text.len())
        };
        &text[byte_at(self.start)..byte_at(self.end)]
    }
}

/// A segment paired with the text it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedSegment<'t, 'a> {
    pub text: &'t str,
    pub segment: Segment<'a>,
}

/// Partition `text` by the boundaries of `errors`.
///
/// The returned segments are non-empty, in left-to-right order, and their
/// concatenation is exactly `text`. An empty text yields no segment. With no
/// errors the whole text is a single plain segment.
pub fn render<'a>(text: &str, errors: &'a [ErrorSpan]) -> Vec<Segment<'a>> {
    let len = text.chars().count() as i64;

    let mut boundaries: Vec<i64> = Vec::with_capacity(errors.len() * 2 + 2);
    boundaries.push(0);
    boundaries.push(len);
    let mut dropped = 0usize;
    for error in errors {
        for offset in [error.start_index, error.end_index] {
            if (0..=len).contains(&offset) {
                boundaries.push(offset);
            } else {
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, text_len = len, "Out-of-range error offsets ignored");
    }

    boundaries.sort_unstable();
    boundaries.dedup();

    boundaries
        .windows(2)
        .filter(|pair| pair[0] < pair[1])
        .map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let mut covering_errors: Vec<CoveringError<'a>> = errors
                .iter()
                .enumerate()
                .filter(|(_, e)| start >= e.start_index && end <= e.end_index)
                .map(|(ordinal, span)| CoveringError { ordinal, span })
                .collect();
            // sort_by_key is stable: equal widths keep input order.
            covering_errors.sort_by_key(|c| Reverse(c.span.span_len()));

            Segment {
                start: start as usize,
                end: end as usize,
                covering_errors,
            }
        })
        .collect()
}

/// [`render`] with each segment's text sliced out of `text`.
pub fn highlight<'t, 'a>(text: &'t str, errors: &'a [ErrorSpan]) -> Vec<HighlightedSegment<'t, 'a>> {
    // Byte offset of every char boundary, including the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect();

    render(text, errors)
        .into_iter()
        .map(|segment| HighlightedSegment {
            text: &text[offsets[segment.start]..offsets[segment.end]],
            segment,
        })
        .collect()
}
