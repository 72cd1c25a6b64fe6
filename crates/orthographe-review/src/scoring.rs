//! Grading policy.
//!
//! The evaluator's score is authoritative for completion. Per-error
//! deductions are presentation values and only feed [`ErrorBreakdown`].

use serde::Serialize;

use orthographe_core::config::ScoringConfig;
use orthographe_core::types::{ErrorKind, EvaluationResult};

/// Coarse grade shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Passed,
    Failed,
}

/// Mistake counts and the points they account for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorBreakdown {
    pub grammar: usize,
    pub lexical: usize,
    pub deducted: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pass_threshold: f64,
    excellent_threshold: f64,
    grammar_penalty: f64,
    lexical_penalty: f64,
    max_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for ScoringPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            pass_threshold: config.pass_threshold,
            excellent_threshold: config.excellent_threshold,
            grammar_penalty: config.grammar_penalty,
            lexical_penalty: config.lexical_penalty,
            max_score: config.max_score,
        }
    }
}

impl ScoringPolicy {
    pub fn pass_threshold(&self) -> f64 {
        self.pass_threshold
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Whether `score` marks the item completed.
    pub fn is_passing(&self, score: f64) -> bool {
        score.is_finite() && score >= self.pass_threshold
    }

    pub fn band(&self, score: f64) -> ScoreBand {
        if score >= self.excellent_threshold {
            ScoreBand::Excellent
        } else if self.is_passing(score) {
            ScoreBand::Passed
        } else {
            ScoreBand::Failed
        }
    }

    pub fn penalty(&self, kind: ErrorKind) -> f64 {
        match kind {
            ErrorKind::Grammar => self.grammar_penalty,
            ErrorKind::Lexical => self.lexical_penalty,
        }
    }

    pub fn breakdown(&self, result: &EvaluationResult) -> ErrorBreakdown {
        let grammar = result.count_of(ErrorKind::Grammar);
        let lexical = result.count_of(ErrorKind::Lexical);
        ErrorBreakdown {
            grammar,
            lexical,
            deducted: grammar as f64 * self.grammar_penalty
                + lexical as f64 * self.lexical_penalty,
        }
    }

    /// Score implied by the deductions alone, floored at zero.
    pub fn estimated_score(&self, result: &EvaluationResult) -> f64 {
        (self.max_score - self.breakdown(result).deducted).max(0.0)
    }

    /// The evaluator's score clamped to `[0, max_score]`; NaN becomes 0.
    pub fn normalized_score(&self, score: f64) -> f64 {
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, self.max_score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthographe_core::types::ErrorSpan;

    fn result(score: f64, errors: Vec<ErrorSpan>) -> EvaluationResult {
        EvaluationResult {
            score,
            comment: String::new(),
            correct_text: String::new(),
            errors,
        }
    }

    #[test]
    fn test_pass_threshold_default() {
        let policy = ScoringPolicy::default();
        assert!(!policy.is_passing(3.0));
        assert!(!policy.is_passing(4.99));
        assert!(policy.is_passing(5.0));
        assert!(policy.is_passing(7.0));
        assert!(!policy.is_passing(f64::NAN));
    }

    #[test]
    fn test_pass_threshold_is_configurable() {
        let config = ScoringConfig {
            pass_threshold: 8.0,
            ..ScoringConfig::default()
        };
        let policy = ScoringPolicy::from(&config);
        assert!(!policy.is_passing(7.0));
        assert!(policy.is_passing(8.0));
    }

    #[test]
    fn test_bands() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.band(9.5), ScoreBand::Excellent);
        assert_eq!(policy.band(8.0), ScoreBand::Excellent);
        assert_eq!(policy.band(6.0), ScoreBand::Passed);
        assert_eq!(policy.band(2.0), ScoreBand::Failed);
    }

    #[test]
    fn test_breakdown_and_estimate() {
        let policy = ScoringPolicy::default();
        let r = result(
            6.0,
            vec![
                ErrorSpan::new(ErrorKind::Grammar, 0, 2),
                ErrorSpan::new(ErrorKind::Grammar, 3, 5),
                ErrorSpan::new(ErrorKind::Lexical, 6, 9),
            ],
        );
        let breakdown = policy.breakdown(&r);
        assert_eq!(breakdown.grammar, 2);
        assert_eq!(breakdown.lexical, 1);
        assert!((breakdown.deducted - 2.5).abs() < 1e-9);
        assert!((policy.estimated_score(&r) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_floors_at_zero() {
        let policy = ScoringPolicy::default();
        let errors = (0..20)
            .map(|i| ErrorSpan::new(ErrorKind::Grammar, i, i + 1))
            .collect();
        assert_eq!(policy.estimated_score(&result(0.0, errors)), 0.0);
    }

    #[test]
    fn test_normalized_score() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.normalized_score(12.0), 10.0);
        assert_eq!(policy.normalized_score(-1.0), 0.0);
        assert_eq!(policy.normalized_score(f64::NAN), 0.0);
        assert_eq!(policy.normalized_score(6.5), 6.5);
    }
}
