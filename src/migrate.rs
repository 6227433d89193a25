//! One-time move of legacy single-column answers into expected answers.
//!
//! Safe to re-run: questions that already have expected answers are skipped.

use serde::Serialize;

use crate::answer::normalize;
pub use crate::answer::number::infer_input_type;
use crate::error::MigrationError;
use crate::store::{ContentStore, NewExpectedAnswer};
use crate::types::{InputType, Question, QuestionId, MAX_HINT_CHARS};

/// Hint used when the legacy answer gives nothing to show
pub const DEFAULT_HINT: &str = "Enter your answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMode {
    /// Report planned changes without writing
    Preview,
    /// Write planned changes
    Live,
}

/// The expected answer that would be synthesized for one question
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlannedAnswer {
    pub question_id: QuestionId,
    pub answer_raw: String,
    pub answer_normalized: String,
    pub input_type: InputType,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MigrationFailure {
    pub question_id: QuestionId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MigrationReport {
    pub live: bool,
    /// Questions holding a non-empty legacy answer
    pub processed: usize,
    pub planned: Vec<PlannedAnswer>,
    pub migrated: usize,
    /// Questions skipped because they already had expected answers
    pub skipped: usize,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerifyReport {
    pub questions_with_answers: usize,
    pub expected_rows: usize,
    /// Questions with a legacy answer but no expected answers
    pub missing: Vec<QuestionId>,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// First 50 characters of the legacy text, or the generic hint when blank
pub fn make_hint(legacy_answer: &str) -> String {
    if legacy_answer.trim().is_empty() {
        return DEFAULT_HINT.to_string();
    }
    legacy_answer.chars().take(MAX_HINT_CHARS).collect()
}

pub fn plan_for(question: &Question) -> PlannedAnswer {
    PlannedAnswer {
        question_id: question.id,
        answer_raw: question.legacy_answer.clone(),
        answer_normalized: normalize(&question.legacy_answer),
        input_type: infer_input_type(&question.legacy_answer),
        hint: make_hint(&question.legacy_answer),
    }
}

fn has_legacy_answer(question: &Question) -> bool {
    !question.legacy_answer.trim().is_empty()
}

async fn apply(store: &ContentStore, plan: &PlannedAnswer) -> Result<(), MigrationError> {
    store
        .add_expected_answer(NewExpectedAnswer {
            question_id: plan.question_id,
            input_type: plan.input_type,
            hint: plan.hint.clone(),
            answer_raw: plan.answer_raw.clone(),
            is_primary: true,
            rank: None,
        })
        .await
        .map(|_| ())
        .map_err(|source| MigrationError::Question {
            question_id: plan.question_id,
            source,
        })
}

/// Synthesize one primary expected answer per question that has a legacy
/// answer and no expected answers yet. A failing question is reported and the
/// batch continues.
pub async fn run_migration(store: &ContentStore, mode: MigrationMode) -> MigrationReport {
    let questions: Vec<Question> = store
        .list_questions()
        .await
        .into_iter()
        .filter(has_legacy_answer)
        .collect();

    tracing::info!(
        "Migrating {} questions with legacy answers ({:?})",
        questions.len(),
        mode
    );

    let mut report = MigrationReport {
        live: mode == MigrationMode::Live,
        processed: questions.len(),
        planned: Vec::new(),
        migrated: 0,
        skipped: 0,
        failures: Vec::new(),
    };

    for question in &questions {
        let existing = store.expected_answer_count(question.id).await;
        if existing > 0 {
            tracing::debug!(
                "Question {} already has {} expected answer(s), skipping",
                question.id,
                existing
            );
            report.skipped += 1;
            continue;
        }

        let plan = plan_for(question);

        if mode == MigrationMode::Live {
            if let Err(e) = apply(store, &plan).await {
                tracing::error!("{}", e);
                report.failures.push(MigrationFailure {
                    question_id: question.id,
                    reason: e.to_string(),
                });
                continue;
            }
        }

        report.migrated += 1;
        report.planned.push(plan);
    }

    report
}

/// Read-only check for questions still lacking expected answers
pub async fn verify(store: &ContentStore) -> VerifyReport {
    let mut report = VerifyReport {
        questions_with_answers: 0,
        expected_rows: store.total_expected_answers().await,
        missing: Vec::new(),
    };

    for question in store.list_questions().await {
        if !has_legacy_answer(&question) {
            continue;
        }
        report.questions_with_answers += 1;
        if store.expected_answer_count(question.id).await == 0 {
            report.missing.push(question.id);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewQuestion;

    async fn seed(store: &ContentStore, legacy: &str) -> Question {
        store
            .insert_question(NewQuestion {
                text: format!("Question for {}", legacy),
                legacy_answer: legacy.to_string(),
                category: None,
                input_expected: true,
            })
            .await
    }

    #[test]
    fn test_infer_input_type() {
        assert_eq!(infer_input_type("1984"), InputType::Guess);
        assert_eq!(infer_input_type("1,000,000"), InputType::Guess);
        assert_eq!(infer_input_type("3.5"), InputType::Guess);
        assert_eq!(infer_input_type("Paris"), InputType::Normal);
        assert_eq!(infer_input_type("1984 (Orwell)"), InputType::Normal);
    }

    #[test]
    fn test_make_hint() {
        assert_eq!(make_hint(""), DEFAULT_HINT);
        assert_eq!(make_hint("   "), DEFAULT_HINT);
        assert_eq!(make_hint("Paris"), "Paris");
        let long = "a".repeat(80);
        assert_eq!(make_hint(&long).chars().count(), 50);
        assert_eq!(make_hint(&"ä".repeat(60)).chars().count(), 50);
    }

    #[test]
    fn test_plan_keeps_raw_text() {
        let question = Question {
            id: 7,
            text: "Year?".to_string(),
            legacy_answer: " 1,984 ".to_string(),
            category: None,
            input_expected: true,
        };
        let plan = plan_for(&question);
        assert_eq!(plan.answer_raw, " 1,984 ");
        assert_eq!(plan.answer_normalized, "1,984");
        assert_eq!(plan.input_type, InputType::Guess);
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let store = ContentStore::new();
        seed(&store, "Paris").await;
        seed(&store, "1984").await;
        let revision = store.revision().await;

        let report = run_migration(&store, MigrationMode::Preview).await;
        assert!(!report.live);
        assert_eq!(report.planned.len(), 2);
        assert_eq!(report.migrated, 2);
        assert_eq!(store.revision().await, revision);
        assert_eq!(store.total_expected_answers().await, 0);
    }

    #[tokio::test]
    async fn test_live_is_idempotent() {
        let store = ContentStore::new();
        let paris = seed(&store, "Paris").await;
        seed(&store, "1984").await;
        seed(&store, "").await;

        let first = run_migration(&store, MigrationMode::Live).await;
        assert!(first.is_success());
        assert_eq!(first.processed, 2);
        assert_eq!(first.migrated, 2);
        let rows_after_first = store.total_expected_answers().await;
        assert_eq!(rows_after_first, 2);

        let second = run_migration(&store, MigrationMode::Live).await;
        assert_eq!(second.migrated, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.total_expected_answers().await, rows_after_first);

        let answers = store.expected_answers(paris.id).await;
        assert_eq!(answers.len(), 1);
        assert!(answers[0].is_primary);
        assert_eq!(answers[0].answer_normalized, "paris");
        assert_eq!(answers[0].input_type, InputType::Normal);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let store = ContentStore::new();
        let oversized = seed(&store, &"x".repeat(300)).await;
        let fine = seed(&store, "Paris").await;

        let report = run_migration(&store, MigrationMode::Live).await;
        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].question_id, oversized.id);
        assert_eq!(report.migrated, 1);
        assert_eq!(store.expected_answer_count(oversized.id).await, 0);
        assert_eq!(store.expected_answer_count(fine.id).await, 1);

        let verification = verify(&store).await;
        assert_eq!(verification.missing, vec![oversized.id]);
        assert!(!verification.is_complete());
    }

    #[tokio::test]
    async fn test_verify_after_migration() {
        let store = ContentStore::new();
        seed(&store, "Paris").await;
        seed(&store, "Rome").await;

        let before = verify(&store).await;
        assert_eq!(before.questions_with_answers, 2);
        assert_eq!(before.missing.len(), 2);

        run_migration(&store, MigrationMode::Live).await;
        let after = verify(&store).await;
        assert!(after.is_complete());
        assert_eq!(after.expected_rows, 2);
    }
}
