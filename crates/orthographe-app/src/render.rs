//! Terminal rendering of graded submissions, catalogs and progress.

use std::fmt::Write as _;

use crossterm::style::Stylize;

use orthographe_core::types::{DictationMetadata, ErrorKind, ErrorSpan};
use orthographe_review::{highlight, ErrorBreakdown, ScoreBand, Segment};
use orthographe_trainer::ProgressSummary;

/// Output styling. Plain mode marks grammar errors with `[..]` and lexical
/// errors with `{..}`.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub color: bool,
}

impl Palette {
    /// `text` annotated with every error covering it.
    ///
    /// Plain mode nests one pair of delimiters per error, innermost error
    /// closest to the text. Color mode takes the foreground from the
    /// innermost error and, when errors nest, the background from the
    /// outermost one.
    fn errors(&self, text: &str, segment: &Segment<'_>) -> String {
        if !self.color {
            return segment
                .errors()
                .rev()
                .fold(text.to_string(), |inner, e| match e.kind {
                    ErrorKind::Grammar => format!("[{inner}]"),
                    ErrorKind::Lexical => format!("{{{inner}}}"),
                });
        }
        let (Some(outer), Some(inner)) = (segment.outermost(), segment.innermost()) else {
            return text.to_string();
        };
        let styled = match inner.kind {
            ErrorKind::Grammar => text.red().underlined(),
            ErrorKind::Lexical => text.yellow().underlined(),
        };
        if segment.covering_errors.len() == 1 {
            return styled.to_string();
        }
        match outer.kind {
            ErrorKind::Grammar => styled.on_dark_red().bold().to_string(),
            ErrorKind::Lexical => styled.on_dark_yellow().bold().to_string(),
        }
    }

    fn band(&self, band: ScoreBand, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match band {
            ScoreBand::Excellent => text.green().bold().to_string(),
            ScoreBand::Passed => text.yellow().bold().to_string(),
            ScoreBand::Failed => text.red().bold().to_string(),
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }
}

/// The submission with every error region marked by all the errors covering
/// it, nested outermost to innermost.
pub fn annotated_submission(palette: Palette, submission: &str, errors: &[ErrorSpan]) -> String {
    let mut out = String::with_capacity(submission.len() * 2);
    for piece in highlight(submission, errors) {
        if piece.segment.is_plain() {
            out.push_str(piece.text);
        } else {
            out.push_str(&palette.errors(piece.text, &piece.segment));
        }
    }
    out
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Grammar => "grammaire",
        ErrorKind::Lexical => "orthographe",
    }
}

/// Numbered list of errors with their hints.
pub fn error_list(errors: &[ErrorSpan]) -> String {
    let mut out = String::new();
    for (i, error) in errors.iter().enumerate() {
        let _ = write!(out, "{:>3}. [{}]", i + 1, kind_label(error.kind));
        if !error.text.is_empty() {
            let _ = write!(out, " « {} »", error.text);
        }
        if !error.hint.is_empty() {
            let _ = write!(out, " : {}", error.hint);
        }
        out.push('\n');
    }
    out
}

pub fn score_line(
    palette: Palette,
    score: f64,
    band: ScoreBand,
    breakdown: &ErrorBreakdown,
) -> String {
    let verdict = match band {
        ScoreBand::Excellent => "Excellent",
        ScoreBand::Passed => "Réussi",
        ScoreBand::Failed => "À retravailler",
    };
    format!(
        "{} {}  ({} grammaire, {} orthographe)",
        palette.band(band, &format!("{score:.1}/10")),
        verdict,
        breakdown.grammar,
        breakdown.lexical,
    )
}

pub fn catalog_line(palette: Palette, item: &DictationMetadata, completed: bool) -> String {
    let mark = if completed { "✓" } else { " " };
    let date = if item.date.is_empty() {
        String::new()
    } else {
        format!(" ({})", item.date)
    };
    format!(
        "{} {:<18} {} - {}{}",
        mark,
        palette.dim(&item.id),
        item.author,
        item.source,
        date
    )
}

fn bar(percentage: u8, width: usize) -> String {
    let filled = (percentage as usize * width + 50) / 100;
    let filled = filled.min(width);
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn progress_report(summary: &ProgressSummary) -> String {
    let mut out = String::new();
    for level in &summary.levels {
        let _ = writeln!(
            out,
            "Niveau {}  [{}] {:>3}%  ({}/{} textes, {} au catalogue)",
            level.level,
            bar(level.percentage, 20),
            level.percentage,
            level.completed,
            level.target,
            level.known,
        );
    }
    let _ = writeln!(
        out,
        "Brevet    {} sujet(s) réussi(s) sur {} au catalogue",
        summary.brevet_completed, summary.brevet_known
    );
    out
}

/// `m:ss / m:ss` playback clock.
pub fn position_line(position: f64, duration: f64) -> String {
    fn mmss(secs: f64) -> String {
        let total = secs.max(0.0).round() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
    format!("{} / {}", mmss(position), mmss(duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthographe_core::types::DifficultyLevel;
    use orthographe_trainer::LevelProgress;

    const PLAIN: Palette = Palette { color: false };

    #[test]
    fn test_annotated_submission_plain() {
        let errors = vec![
            ErrorSpan::new(ErrorKind::Lexical, 4, 10),
            ErrorSpan::new(ErrorKind::Grammar, 11, 17),
        ];
        assert_eq!(
            annotated_submission(PLAIN, "Les enfant jouait.", &errors),
            "Les {enfant} [jouait]."
        );
    }

    #[test]
    fn test_nested_errors_show_every_kind() {
        let errors = vec![
            ErrorSpan::new(ErrorKind::Lexical, 4, 10),
            ErrorSpan::new(ErrorKind::Grammar, 0, 17),
        ];
        assert_eq!(
            annotated_submission(PLAIN, "Les enfant jouait.", &errors),
            "[Les ][{enfant}][ jouait]."
        );
    }

    #[test]
    fn test_inner_error_inside_wider_one() {
        let errors = vec![
            ErrorSpan::new(ErrorKind::Lexical, 0, 10),
            ErrorSpan::new(ErrorKind::Grammar, 2, 5),
        ];
        assert_eq!(
            annotated_submission(PLAIN, "abcdefghij", &errors),
            "{ab}{[cde]}{fghij}"
        );
    }

    #[test]
    fn test_three_levels_of_nesting() {
        let errors = vec![
            ErrorSpan::new(ErrorKind::Grammar, 3, 4),
            ErrorSpan::new(ErrorKind::Grammar, 0, 6),
            ErrorSpan::new(ErrorKind::Lexical, 2, 5),
        ];
        assert_eq!(
            annotated_submission(PLAIN, "abcdef", &errors),
            "[ab][{c}][{[d]}][{e}][f]"
        );
    }

    #[test]
    fn test_colored_output_keeps_text() {
        let errors = vec![ErrorSpan::new(ErrorKind::Grammar, 0, 3)];
        let out = annotated_submission(Palette { color: true }, "Ils chante", &errors);
        assert!(out.contains("Ils"));
        assert!(out.contains('\u{1b}'));
        assert!(out.ends_with(" chante"));
    }

    #[test]
    fn test_error_list() {
        let errors = vec![
            ErrorSpan::new(ErrorKind::Grammar, 0, 3)
                .with_text("Ils chante")
                .with_hint("Accord sujet-verbe"),
            ErrorSpan::new(ErrorKind::Lexical, 0, 0),
        ];
        let out = error_list(&errors);
        assert_eq!(
            out,
            "  1. [grammaire] « Ils chante » : Accord sujet-verbe\n  2. [orthographe]\n"
        );
    }

    #[test]
    fn test_score_line_plain() {
        let breakdown = ErrorBreakdown {
            grammar: 1,
            lexical: 2,
            deducted: 2.0,
        };
        assert_eq!(
            score_line(PLAIN, 7.0, ScoreBand::Passed, &breakdown),
            "7.0/10 Réussi  (1 grammaire, 2 orthographe)"
        );
    }

    #[test]
    fn test_progress_report_and_bar() {
        assert_eq!(bar(0, 10), "..........");
        assert_eq!(bar(50, 10), "#####.....");
        assert_eq!(bar(100, 10), "##########");

        let summary = ProgressSummary {
            levels: vec![LevelProgress {
                level: DifficultyLevel::new(1).unwrap(),
                completed: 5,
                target: 50,
                percentage: 10,
                known: 12,
            }],
            brevet_completed: 1,
            brevet_known: 8,
        };
        let report = progress_report(&summary);
        assert!(report.starts_with("Niveau 1  [##"));
        assert!(report.contains("(5/50 textes, 12 au catalogue)"));
        assert!(report.contains("1 sujet(s) réussi(s) sur 8"));
    }

    #[test]
    fn test_position_line() {
        assert_eq!(position_line(3.0, 65.4), "0:03 / 1:05");
    }

    #[test]
    fn test_catalog_line_plain() {
        let item = DictationMetadata {
            id: "brevet-text-8".into(),
            author: "Gaël FAYE".into(),
            source: "Petit Pays".into(),
            date: "2016".into(),
            index: 8,
        };
        let line = catalog_line(PLAIN, &item, true);
        assert!(line.starts_with("✓ brevet-text-8"));
        assert!(line.ends_with("Gaël FAYE - Petit Pays (2016)"));
    }
}
