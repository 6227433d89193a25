//! Serializable snapshot of the content store.
//!
//! This is the on-disk format of `CONTENT_PATH` and the body of the
//! export/import endpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::StoreError;
use crate::types::*;

/// Schema version for snapshot compatibility
/// Version 1: questions, expected answers, submissions
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentSnapshot {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub expected_answers: Vec<ExpectedAnswer>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl ContentSnapshot {
    pub fn new(
        questions: Vec<Question>,
        expected_answers: Vec<ExpectedAnswer>,
        submissions: Vec<Submission>,
    ) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            questions,
            expected_answers,
            submissions,
        }
    }

    /// Validate the snapshot before restoring it
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: self.schema_version,
                supported: SNAPSHOT_SCHEMA_VERSION,
            });
        }

        let mut question_ids = HashSet::new();
        for question in &self.questions {
            if !question_ids.insert(question.id) {
                return Err(StoreError::InvalidSnapshot(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
        }

        let mut answer_ids = HashSet::new();
        for answer in &self.expected_answers {
            if !answer_ids.insert(answer.id) {
                return Err(StoreError::InvalidSnapshot(format!(
                    "duplicate expected answer id {}",
                    answer.id
                )));
            }
            if !question_ids.contains(&answer.question_id) {
                return Err(StoreError::InvalidSnapshot(format!(
                    "expected answer {} references question {} which doesn't exist",
                    answer.id, answer.question_id
                )));
            }
        }

        for submission in &self.submissions {
            if !question_ids.contains(&submission.question_id) {
                return Err(StoreError::InvalidSnapshot(format!(
                    "submission {} references question {} which doesn't exist",
                    submission.id, submission.question_id
                )));
            }
        }

        Ok(())
    }
}
