//! Content store: questions, their expected answers, and submissions.
//!
//! All tables sit behind one lock so a write either lands completely or not at
//! all. `answer_normalized` is computed here and nowhere else.

pub mod snapshot;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::answer::normalize;
use crate::error::StoreError;
use crate::types::*;
pub use snapshot::{ContentSnapshot, SNAPSHOT_SCHEMA_VERSION};

/// Input for creating a question
#[derive(Debug, Clone, Default)]
pub struct NewQuestion {
    pub text: String,
    pub legacy_answer: String,
    pub category: Option<String>,
    pub input_expected: bool,
}

/// Input for creating an expected answer; the normalized text is derived
#[derive(Debug, Clone)]
pub struct NewExpectedAnswer {
    pub question_id: QuestionId,
    pub input_type: InputType,
    pub hint: String,
    pub answer_raw: String,
    pub is_primary: bool,
    pub rank: Option<u32>,
}

/// Input for recording a submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub question_id: QuestionId,
    pub player_id: PlayerId,
    pub answer_raw: String,
    pub is_correct: bool,
    pub similarity: f64,
}

#[derive(Debug, Default)]
struct ContentTables {
    questions: BTreeMap<QuestionId, Question>,
    expected_answers: BTreeMap<ExpectedAnswerId, ExpectedAnswer>,
    submissions: BTreeMap<SubmissionId, Submission>,
    next_question_id: QuestionId,
    next_expected_answer_id: ExpectedAnswerId,
    next_submission_id: SubmissionId,
    /// Incremented on every successful write
    revision: u64,
}

impl ContentTables {
    fn answers_for(&self, question_id: QuestionId) -> Vec<ExpectedAnswer> {
        let mut answers: Vec<ExpectedAnswer> = self
            .expected_answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.rank.is_none(), a.rank, a.id));
        answers
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Shared handle to the content tables
#[derive(Clone, Default)]
pub struct ContentStore {
    tables: Arc<RwLock<ContentTables>>,
}

fn check_len(field: &'static str, text: &str, max: usize) -> Result<(), StoreError> {
    let len = text.chars().count();
    if len > max {
        return Err(StoreError::TooLong { field, len, max });
    }
    Ok(())
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Questions
    // =========================================================================

    pub async fn insert_question(&self, new: NewQuestion) -> Question {
        let mut tables = self.tables.write().await;
        tables.next_question_id += 1;
        let question = Question {
            id: tables.next_question_id,
            text: new.text,
            legacy_answer: new.legacy_answer,
            category: new.category,
            input_expected: new.input_expected,
        };
        tables.questions.insert(question.id, question.clone());
        tables.touch();
        tracing::debug!("Inserted question {}", question.id);
        question
    }

    pub async fn get_question(&self, id: QuestionId) -> Option<Question> {
        self.tables.read().await.questions.get(&id).cloned()
    }

    /// All questions in id order
    pub async fn list_questions(&self) -> Vec<Question> {
        self.tables.read().await.questions.values().cloned().collect()
    }

    /// Delete a question together with its expected answers and submissions
    pub async fn delete_question(&self, id: QuestionId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.questions.remove(&id).is_none() {
            return Err(StoreError::QuestionNotFound(id));
        }
        tables.expected_answers.retain(|_, a| a.question_id != id);
        tables.submissions.retain(|_, s| s.question_id != id);
        tables.touch();
        tracing::info!("Deleted question {} and its answers", id);
        Ok(())
    }

    // =========================================================================
    // Expected answers
    // =========================================================================

    /// Add an expected answer. Validation happens before anything is written.
    pub async fn add_expected_answer(
        &self,
        new: NewExpectedAnswer,
    ) -> Result<ExpectedAnswer, StoreError> {
        let answer_normalized = normalize(&new.answer_raw);
        check_len("hint", &new.hint, MAX_HINT_CHARS)?;
        check_len("answer_raw", &new.answer_raw, MAX_ANSWER_CHARS)?;
        check_len("answer_normalized", &answer_normalized, MAX_ANSWER_CHARS)?;

        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&new.question_id) {
            return Err(StoreError::QuestionNotFound(new.question_id));
        }

        tables.next_expected_answer_id += 1;
        let answer = ExpectedAnswer {
            id: tables.next_expected_answer_id,
            question_id: new.question_id,
            input_type: new.input_type,
            hint: new.hint,
            answer_raw: new.answer_raw,
            answer_normalized,
            is_primary: new.is_primary,
            rank: new.rank,
        };
        tables.expected_answers.insert(answer.id, answer.clone());
        tables.touch();
        Ok(answer)
    }

    /// Replace the raw text of an expected answer, re-deriving the normalized text
    pub async fn update_expected_answer_raw(
        &self,
        id: ExpectedAnswerId,
        answer_raw: String,
    ) -> Result<ExpectedAnswer, StoreError> {
        let answer_normalized = normalize(&answer_raw);
        check_len("answer_raw", &answer_raw, MAX_ANSWER_CHARS)?;
        check_len("answer_normalized", &answer_normalized, MAX_ANSWER_CHARS)?;

        let mut tables = self.tables.write().await;
        let answer = tables
            .expected_answers
            .get_mut(&id)
            .ok_or(StoreError::ExpectedAnswerNotFound(id))?;
        answer.answer_raw = answer_raw;
        answer.answer_normalized = answer_normalized;
        let updated = answer.clone();
        tables.touch();
        Ok(updated)
    }

    /// Expected answers of a question: ranked rows by rank, then unranked, ties by id
    pub async fn expected_answers(&self, question_id: QuestionId) -> Vec<ExpectedAnswer> {
        self.tables.read().await.answers_for(question_id)
    }

    pub async fn expected_answer_count(&self, question_id: QuestionId) -> usize {
        self.tables
            .read()
            .await
            .expected_answers
            .values()
            .filter(|a| a.question_id == question_id)
            .count()
    }

    pub async fn total_expected_answers(&self) -> usize {
        self.tables.read().await.expected_answers.len()
    }

    /// A question and its expected answers read under one lock
    pub async fn question_with_answers(
        &self,
        question_id: QuestionId,
    ) -> Option<(Question, Vec<ExpectedAnswer>)> {
        let tables = self.tables.read().await;
        let question = tables.questions.get(&question_id)?.clone();
        Some((question, tables.answers_for(question_id)))
    }

    // =========================================================================
    // Submissions
    // =========================================================================

    pub async fn record_submission(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&new.question_id) {
            return Err(StoreError::QuestionNotFound(new.question_id));
        }

        tables.next_submission_id += 1;
        let submission = Submission {
            id: tables.next_submission_id,
            question_id: new.question_id,
            player_id: new.player_id,
            answer_normalized: normalize(&new.answer_raw),
            answer_raw: new.answer_raw,
            is_correct: new.is_correct,
            similarity: new.similarity,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        tables.submissions.insert(submission.id, submission.clone());
        tables.touch();
        Ok(submission)
    }

    /// Submissions for a question in recording order
    pub async fn submissions_for(&self, question_id: QuestionId) -> Vec<Submission> {
        self.tables
            .read()
            .await
            .submissions
            .values()
            .filter(|s| s.question_id == question_id)
            .cloned()
            .collect()
    }

    /// Number of successful writes since the store was created or restored
    pub async fn revision(&self) -> u64 {
        self.tables.read().await.revision
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn snapshot(&self) -> ContentSnapshot {
        let tables = self.tables.read().await;
        ContentSnapshot::new(
            tables.questions.values().cloned().collect(),
            tables.expected_answers.values().cloned().collect(),
            tables.submissions.values().cloned().collect(),
        )
    }

    /// Replace all content with a validated snapshot
    pub async fn restore(&self, snapshot: ContentSnapshot) -> Result<(), StoreError> {
        snapshot.validate()?;

        let mut restored = ContentTables::default();
        for question in snapshot.questions {
            restored.next_question_id = restored.next_question_id.max(question.id);
            restored.questions.insert(question.id, question);
        }
        for mut answer in snapshot.expected_answers {
            let derived = normalize(&answer.answer_raw);
            if answer.answer_normalized != derived {
                tracing::warn!(
                    "Expected answer {} had stale normalized text {:?}, re-deriving",
                    answer.id,
                    answer.answer_normalized
                );
                answer.answer_normalized = derived;
            }
            restored.next_expected_answer_id = restored.next_expected_answer_id.max(answer.id);
            restored.expected_answers.insert(answer.id, answer);
        }
        for submission in snapshot.submissions {
            restored.next_submission_id = restored.next_submission_id.max(submission.id);
            restored.submissions.insert(submission.id, submission);
        }

        tracing::info!(
            "Restored content: {} questions, {} expected answers, {} submissions",
            restored.questions.len(),
            restored.expected_answers.len(),
            restored.submissions.len()
        );
        *self.tables.write().await = restored;
        Ok(())
    }

    /// Load a store from a JSON snapshot; a missing file yields an empty store
    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::new();

        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Content file {} not found, starting empty", path.display());
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: ContentSnapshot = serde_json::from_str(&json)?;
        store.restore(snapshot).await?;
        Ok(store)
    }

    pub async fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        // Readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        tracing::debug!("Saved content to {}", path.display());
        Ok(())
    }
}
