//! Verdicts for submitted answers.
//!
//! The matcher never touches the store: callers resolve a question's expected
//! answers, hand them in, and decide what to persist and log.

use serde::{Deserialize, Serialize};

use super::normalize::{fold, normalize};
use super::number::{infer_input_type, parse_guess};
use super::similarity::similarity;
use crate::types::{ExpectedAnswer, InputType, Question};

pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.85;
pub const DEFAULT_GUESS_TOLERANCE: f64 = 0.0;

/// Where a candidate answer came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Primary,
    Alternate,
    /// The question's legacy answer column, used when no expected answers exist
    LegacyFallback,
}

/// One acceptable answer after resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub source: AnswerSource,
    pub input_type: InputType,
    pub answer_raw: String,
    pub answer_normalized: String,
    /// Hint of the expected-answer row, empty for the legacy fallback
    #[serde(default)]
    pub hint: String,
}

/// A question's candidates in (rank, id) order with the reference answer first-class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedAnswers {
    pub candidates: Vec<Candidate>,
    /// Index into `candidates` of the reference (display) answer
    pub reference: Option<usize>,
}

impl ResolvedAnswers {
    pub fn reference(&self) -> Option<&Candidate> {
        self.reference.and_then(|i| self.candidates.get(i))
    }

    /// Input type of the question as decided by its reference answer
    pub fn input_type(&self) -> InputType {
        self.reference()
            .map(|c| c.input_type)
            .unwrap_or(InputType::Normal)
    }

    pub fn is_legacy_fallback(&self) -> bool {
        self.candidates
            .iter()
            .any(|c| c.source == AnswerSource::LegacyFallback)
    }
}

/// Resolve a question's acceptable answers.
///
/// Ordered resolution: expected answers by (rank, id) with ranked rows before
/// unranked ones; if there are none, the legacy answer as a single primary
/// candidate, typed the way the migration would type it; if that is blank too, nothing. The reference is the first row
/// flagged primary, else the first row. Duplicate or missing primary flags are
/// not rejected here.
pub fn resolve(question: &Question, expected: &[ExpectedAnswer]) -> ResolvedAnswers {
    if expected.is_empty() {
        let legacy = question.legacy_answer.trim();
        if legacy.is_empty() {
            return ResolvedAnswers {
                candidates: Vec::new(),
                reference: None,
            };
        }
        return ResolvedAnswers {
            candidates: vec![Candidate {
                source: AnswerSource::LegacyFallback,
                input_type: infer_input_type(&question.legacy_answer),
                answer_raw: question.legacy_answer.clone(),
                answer_normalized: normalize(&question.legacy_answer),
                hint: String::new(),
            }],
            reference: Some(0),
        };
    }

    let mut ordered: Vec<&ExpectedAnswer> = expected.iter().collect();
    ordered.sort_by_key(|a| (a.rank.is_none(), a.rank, a.id));

    let reference = ordered.iter().position(|a| a.is_primary).unwrap_or(0);

    let candidates = ordered
        .iter()
        .enumerate()
        .map(|(i, a)| Candidate {
            source: if i == reference {
                AnswerSource::Primary
            } else {
                AnswerSource::Alternate
            },
            input_type: a.input_type,
            answer_raw: a.answer_raw.clone(),
            answer_normalized: a.answer_normalized.clone(),
            hint: a.hint.clone(),
        })
        .collect();

    ResolvedAnswers {
        candidates,
        reference: Some(reference),
    }
}

/// Outcome of evaluating one submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub is_correct: bool,
    /// Similarity in [0, 1] of the best candidate
    pub similarity: f64,
    /// Raw text of the best candidate, if any was compared
    pub matched_answer: Option<String>,
    pub source: Option<AnswerSource>,
    pub input_type: InputType,
    pub submission_normalized: String,
    /// Absolute distance for guess questions with a parseable submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct AnswerMatcher {
    pub threshold: f64,
    pub tolerance: f64,
}

impl Default for AnswerMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ACCEPT_THRESHOLD,
            tolerance: DEFAULT_GUESS_TOLERANCE,
        }
    }
}

impl AnswerMatcher {
    /// Non-finite values fall back to the defaults
    pub fn new(threshold: f64, tolerance: f64) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_ACCEPT_THRESHOLD
        };
        let tolerance = if tolerance.is_finite() {
            tolerance.max(0.0)
        } else {
            DEFAULT_GUESS_TOLERANCE
        };
        Self {
            threshold,
            tolerance,
        }
    }

    /// Evaluate a raw submission against a question and its expected answers
    pub fn evaluate(
        &self,
        submission_raw: &str,
        question: &Question,
        expected: &[ExpectedAnswer],
    ) -> Verdict {
        self.evaluate_resolved(submission_raw, &resolve(question, expected))
    }

    pub fn evaluate_resolved(&self, submission_raw: &str, resolved: &ResolvedAnswers) -> Verdict {
        match resolved.input_type() {
            InputType::Guess => self.evaluate_guess(submission_raw, resolved),
            InputType::Normal => self.evaluate_text(submission_raw, resolved),
        }
    }

    fn evaluate_text(&self, submission_raw: &str, resolved: &ResolvedAnswers) -> Verdict {
        let submitted = normalize(submission_raw);
        let submitted_key = fold(submission_raw);

        let mut best: Option<(f64, &Candidate)> = None;
        for candidate in &resolved.candidates {
            let score = if submitted == candidate.answer_normalized
                || (!submitted_key.is_empty() && submitted_key == fold(&candidate.answer_raw))
            {
                1.0
            } else {
                similarity(&submitted, &candidate.answer_normalized)
            };

            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
            if score >= 1.0 {
                break;
            }
        }

        let Some((score, candidate)) = best else {
            return Verdict {
                is_correct: false,
                similarity: 0.0,
                matched_answer: None,
                source: None,
                input_type: InputType::Normal,
                submission_normalized: submitted,
                distance: None,
            };
        };

        Verdict {
            is_correct: !submitted.is_empty() && score >= self.threshold,
            similarity: score,
            matched_answer: Some(candidate.answer_raw.clone()),
            source: Some(candidate.source),
            input_type: InputType::Normal,
            submission_normalized: submitted,
            distance: None,
        }
    }

    fn evaluate_guess(&self, submission_raw: &str, resolved: &ResolvedAnswers) -> Verdict {
        let submitted = normalize(submission_raw);
        let reference = resolved.reference();

        let distance = match (
            parse_guess(submission_raw),
            reference.and_then(|r| parse_guess(&r.answer_raw)),
        ) {
            (Some(guess), Some(expected)) => Some((guess - expected).abs()),
            _ => None,
        };
        let is_correct = distance.is_some_and(|d| d <= self.tolerance);

        Verdict {
            is_correct,
            similarity: if is_correct { 1.0 } else { 0.0 },
            matched_answer: reference.map(|r| r.answer_raw.clone()),
            source: reference.map(|r| r.source),
            input_type: InputType::Guess,
            submission_normalized: submitted,
            distance,
        }
    }
}

/// One guess to rank
#[derive(Debug, Clone, PartialEq)]
pub struct GuessEntry<K> {
    pub key: K,
    pub answer_raw: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedGuess<K> {
    pub key: K,
    pub answer_raw: String,
    pub guess: Option<f64>,
    /// `None` for unparseable guesses, which rank last
    pub distance: Option<f64>,
    pub rank: usize,
    pub is_winner: bool,
}

/// Rank guesses by distance to the expected value; every guess at the minimal
/// finite distance wins. Unparseable guesses never win.
pub fn rank_guesses<K: Clone>(expected_raw: &str, entries: &[GuessEntry<K>]) -> Vec<RankedGuess<K>> {
    let expected = parse_guess(expected_raw);

    let mut ranked: Vec<RankedGuess<K>> = entries
        .iter()
        .map(|entry| {
            let guess = parse_guess(&entry.answer_raw);
            let distance = match (guess, expected) {
                (Some(g), Some(e)) => Some((g - e).abs()),
                _ => None,
            };
            RankedGuess {
                key: entry.key.clone(),
                answer_raw: entry.answer_raw.clone(),
                guess,
                distance,
                rank: 0,
                is_winner: false,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance.unwrap_or(f64::INFINITY))
    });

    let best = ranked.first().and_then(|r| r.distance);
    for (i, entry) in ranked.iter_mut().enumerate() {
        entry.rank = i + 1;
        entry.is_winner = best.is_some() && entry.distance == best;
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(legacy: &str) -> Question {
        Question {
            id: 1,
            text: "What is the capital of France?".to_string(),
            legacy_answer: legacy.to_string(),
            category: None,
            input_expected: true,
        }
    }

    fn expected(
        id: u64,
        raw: &str,
        is_primary: bool,
        rank: Option<u32>,
        input_type: InputType,
    ) -> ExpectedAnswer {
        ExpectedAnswer {
            id,
            question_id: 1,
            input_type,
            hint: "Enter your answer".to_string(),
            answer_raw: raw.to_string(),
            answer_normalized: normalize(raw),
            is_primary,
            rank,
        }
    }

    fn capital_of_france() -> Vec<ExpectedAnswer> {
        vec![
            expected(1, "Paris", true, None, InputType::Normal),
            expected(2, "France", false, None, InputType::Normal),
        ]
    }

    #[test]
    fn test_capital_scenario() {
        let matcher = AnswerMatcher::default();
        let q = question("");
        let answers = capital_of_france();

        for input in ["paris", "  Paris!", "FRANCE"] {
            let verdict = matcher.evaluate(input, &q, &answers);
            assert!(verdict.is_correct, "{:?} should be correct", input);
            assert_eq!(verdict.similarity, 1.0);
        }

        let verdict = matcher.evaluate("Lyon", &q, &answers);
        assert!(!verdict.is_correct);
        assert!(verdict.similarity < matcher.threshold);
    }

    #[test]
    fn test_reports_best_candidate_and_source() {
        let matcher = AnswerMatcher::default();
        let verdict = matcher.evaluate("france", &question(""), &capital_of_france());
        assert_eq!(verdict.matched_answer.as_deref(), Some("France"));
        assert_eq!(verdict.source, Some(AnswerSource::Alternate));

        // Incorrect answers still report the closest candidate
        let verdict = matcher.evaluate("Pariz", &question(""), &capital_of_france());
        assert!(!verdict.is_correct);
        assert_eq!(verdict.matched_answer.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_typo_within_threshold() {
        let matcher = AnswerMatcher::default();
        let answers = vec![expected(1, "Schwarzenegger", true, None, InputType::Normal)];
        let verdict = matcher.evaluate("Schwarzeneger", &question(""), &answers);
        assert!(verdict.is_correct);
        assert!(verdict.similarity < 1.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let answers = vec![expected(1, "Paris", true, None, InputType::Normal)];
        let strict = AnswerMatcher::new(1.0, 0.0);
        assert!(!strict.evaluate("Pariss", &question(""), &answers).is_correct);
        let lenient = AnswerMatcher::new(0.8, 0.0);
        assert!(lenient.evaluate("Pariss", &question(""), &answers).is_correct);
    }

    #[test]
    fn test_fold_exact_match() {
        let matcher = AnswerMatcher::new(1.0, 0.0);
        let answers = vec![expected(1, "Der Übermensch", true, None, InputType::Normal)];
        assert!(matcher.evaluate("uebermensch", &question(""), &answers).is_correct);
    }

    #[test]
    fn test_blank_submission_is_incorrect() {
        let matcher = AnswerMatcher::new(0.0, 0.0);
        let verdict = matcher.evaluate("   ", &question(""), &capital_of_france());
        assert!(!verdict.is_correct);
    }

    #[test]
    fn test_every_expected_answer_is_accepted_verbatim() {
        let matcher = AnswerMatcher::default();
        let answers = vec![
            expected(1, "The Lord of the Rings", true, Some(1), InputType::Normal),
            expected(2, "LOTR", false, Some(2), InputType::Normal),
            expected(3, "  Herr der Ringe! ", false, None, InputType::Normal),
        ];
        for answer in &answers {
            assert!(matcher.evaluate(&answer.answer_raw, &question(""), &answers).is_correct);
        }
    }

    #[test]
    fn test_legacy_fallback() {
        let matcher = AnswerMatcher::default();
        let q = question("Mount Everest");
        let resolved = resolve(&q, &[]);
        assert!(resolved.is_legacy_fallback());
        assert_eq!(resolved.reference().unwrap().source, AnswerSource::LegacyFallback);

        let verdict = matcher.evaluate("Mount Everest", &q, &[]);
        assert!(verdict.is_correct);
        assert_eq!(verdict.source, Some(AnswerSource::LegacyFallback));
    }

    #[test]
    fn test_numeric_legacy_fallback_is_guess() {
        let matcher = AnswerMatcher::default();
        let q = question("1,989");
        let resolved = resolve(&q, &[]);
        assert_eq!(resolved.input_type(), InputType::Guess);

        let verdict = matcher.evaluate("1989", &q, &[]);
        assert!(verdict.is_correct);
        assert_eq!(verdict.input_type, InputType::Guess);
        assert_eq!(verdict.distance, Some(0.0));

        let verdict = matcher.evaluate("1990", &q, &[]);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.distance, Some(1.0));
    }

    #[test]
    fn test_non_finite_settings_use_defaults() {
        let matcher = AnswerMatcher::new(f64::NAN, f64::INFINITY);
        assert_eq!(matcher.threshold, DEFAULT_ACCEPT_THRESHOLD);
        assert_eq!(matcher.tolerance, DEFAULT_GUESS_TOLERANCE);
        assert!(matcher.evaluate("Paris", &question("Paris"), &[]).is_correct);
    }

    #[test]
    fn test_no_answers_at_all() {
        let matcher = AnswerMatcher::default();
        let verdict = matcher.evaluate("anything", &question("  "), &[]);
        assert!(!verdict.is_correct);
        assert!(verdict.matched_answer.is_none());
    }

    #[test]
    fn test_reference_tie_break() {
        // Primary flag wins regardless of order
        let answers = vec![
            expected(1, "Alt", false, None, InputType::Normal),
            expected(2, "Main", true, None, InputType::Normal),
        ];
        let resolved = resolve(&question(""), &answers);
        assert_eq!(resolved.reference().unwrap().answer_raw, "Main");

        // No primary: first by rank, ranked before unranked
        let answers = vec![
            expected(1, "Unranked", false, None, InputType::Normal),
            expected(2, "Second", false, Some(2), InputType::Normal),
            expected(3, "First", false, Some(1), InputType::Normal),
        ];
        let resolved = resolve(&question(""), &answers);
        assert_eq!(resolved.reference().unwrap().answer_raw, "First");

        // Duplicate primaries: first by id
        let answers = vec![
            expected(5, "Later", true, None, InputType::Normal),
            expected(4, "Earlier", true, None, InputType::Normal),
        ];
        let resolved = resolve(&question(""), &answers);
        assert_eq!(resolved.reference().unwrap().answer_raw, "Earlier");
    }

    #[test]
    fn test_guess_scenario() {
        let matcher = AnswerMatcher::default();
        let answers = vec![expected(1, "1984", true, None, InputType::Guess)];

        let verdict = matcher.evaluate("1984", &question(""), &answers);
        assert!(verdict.is_correct);
        assert_eq!(verdict.distance, Some(0.0));

        // Thousands separator is accepted under the parse rule
        assert!(matcher.evaluate("1,984", &question(""), &answers).is_correct);

        let verdict = matcher.evaluate("1985", &question(""), &answers);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.distance, Some(1.0));
    }

    #[test]
    fn test_guess_malformed_is_incorrect() {
        let matcher = AnswerMatcher::default();
        let answers = vec![expected(1, "1984", true, None, InputType::Guess)];
        let verdict = matcher.evaluate("nineteen eighty-four", &question(""), &answers);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.distance, None);
    }

    #[test]
    fn test_guess_tolerance_and_alternates_ignored() {
        let matcher = AnswerMatcher::new(0.85, 5.0);
        let answers = vec![
            expected(1, "100", true, None, InputType::Guess),
            expected(2, "200", false, None, InputType::Guess),
        ];
        assert!(matcher.evaluate("104", &question(""), &answers).is_correct);
        assert!(matcher.evaluate("95", &question(""), &answers).is_correct);
        assert!(!matcher.evaluate("200", &question(""), &answers).is_correct);
    }

    #[test]
    fn test_rank_guesses() {
        let entries = vec![
            GuessEntry { key: "a", answer_raw: "90".to_string() },
            GuessEntry { key: "b", answer_raw: "banana".to_string() },
            GuessEntry { key: "c", answer_raw: "110".to_string() },
            GuessEntry { key: "d", answer_raw: "150".to_string() },
        ];
        let ranked = rank_guesses("100", &entries);

        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[3].key, "b");
        assert_eq!(ranked[3].distance, None);
        assert!(!ranked[3].is_winner);

        let winners: Vec<_> = ranked.iter().filter(|r| r.is_winner).map(|r| r.key).collect();
        assert_eq!(winners.len(), 2);
        assert!(winners.contains(&"a") && winners.contains(&"c"));
        assert_eq!(ranked[0].rank, 1);
    }
}
