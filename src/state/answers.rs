//! Board questions: answering, evaluating and summarizing

use super::AppState;
use crate::answer::matcher::{rank_guesses, GuessEntry, RankedGuess};
use crate::answer::{resolve, Verdict};
use crate::error::StoreError;
use crate::store::NewSubmission;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextResult {
    pub player_id: PlayerId,
    pub answer_raw: String,
    pub is_correct: bool,
    pub similarity: f64,
}

/// Read-only summary of every player's latest answer to one question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationSummary {
    Text {
        question_id: QuestionId,
        expected_answers: Vec<String>,
        results: Vec<TextResult>,
        correct_count: usize,
        accuracy: f64,
    },
    Guess {
        question_id: QuestionId,
        correct_answer: Option<String>,
        results: Vec<RankedGuess<PlayerId>>,
        winners: Vec<PlayerId>,
    },
}

impl AppState {
    /// Verdict for a submission without recording it
    pub async fn evaluate_answer(
        &self,
        question_id: QuestionId,
        text: &str,
    ) -> Result<Verdict, StoreError> {
        let (question, expected) = self
            .store
            .question_with_answers(question_id)
            .await
            .ok_or(StoreError::QuestionNotFound(question_id))?;

        let resolved = resolve(&question, &expected);
        if resolved.is_legacy_fallback() {
            tracing::warn!(
                "Question {} has no expected answers, falling back to its legacy answer",
                question_id
            );
        }
        Ok(self.matcher.evaluate_resolved(text, &resolved))
    }

    /// Evaluate and record a player's board answer
    pub async fn submit_board_answer(
        &self,
        player: &Player,
        question_id: QuestionId,
        text: String,
    ) -> Result<(Submission, Verdict), StoreError> {
        let len = text.chars().count();
        if len > MAX_ANSWER_CHARS {
            return Err(StoreError::TooLong {
                field: "answer",
                len,
                max: MAX_ANSWER_CHARS,
            });
        }

        let verdict = self.evaluate_answer(question_id, &text).await?;
        let submission = self
            .store
            .record_submission(NewSubmission {
                question_id,
                player_id: player.id.clone(),
                answer_raw: text,
                is_correct: verdict.is_correct,
                similarity: verdict.similarity,
            })
            .await?;

        tracing::debug!(
            "{} answered question {}: correct={} similarity={:.2}",
            player.display_name,
            question_id,
            verdict.is_correct,
            verdict.similarity
        );
        Ok((submission, verdict))
    }

    /// Latest submission of every player for a question
    async fn latest_submissions(&self, question_id: QuestionId) -> Vec<Submission> {
        let mut latest: HashMap<PlayerId, Submission> = HashMap::new();
        for submission in self.store.submissions_for(question_id).await {
            latest.insert(submission.player_id.clone(), submission);
        }
        let mut submissions: Vec<Submission> = latest.into_values().collect();
        submissions.sort_by_key(|s| s.id);
        submissions
    }

    pub async fn evaluate_question(
        &self,
        question_id: QuestionId,
    ) -> Result<EvaluationSummary, StoreError> {
        let (question, expected) = self
            .store
            .question_with_answers(question_id)
            .await
            .ok_or(StoreError::QuestionNotFound(question_id))?;
        let resolved = resolve(&question, &expected);
        let submissions = self.latest_submissions(question_id).await;

        match resolved.input_type() {
            InputType::Guess => {
                let reference = resolved.reference().map(|r| r.answer_raw.clone());
                let entries: Vec<GuessEntry<PlayerId>> = submissions
                    .iter()
                    .map(|s| GuessEntry {
                        key: s.player_id.clone(),
                        answer_raw: s.answer_raw.clone(),
                    })
                    .collect();
                let results = rank_guesses(reference.as_deref().unwrap_or_default(), &entries);
                let winners = results
                    .iter()
                    .filter(|r| r.is_winner)
                    .map(|r| r.key.clone())
                    .collect();
                Ok(EvaluationSummary::Guess {
                    question_id,
                    correct_answer: reference,
                    results,
                    winners,
                })
            }
            InputType::Normal => {
                let results: Vec<TextResult> = submissions
                    .into_iter()
                    .map(|s| TextResult {
                        player_id: s.player_id,
                        answer_raw: s.answer_raw,
                        is_correct: s.is_correct,
                        similarity: s.similarity,
                    })
                    .collect();
                let correct_count = results.iter().filter(|r| r.is_correct).count();
                let accuracy = if results.is_empty() {
                    0.0
                } else {
                    correct_count as f64 / results.len() as f64
                };
                Ok(EvaluationSummary::Text {
                    question_id,
                    expected_answers: resolved
                        .candidates
                        .iter()
                        .map(|c| c.answer_raw.clone())
                        .collect(),
                    results,
                    correct_count,
                    accuracy,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewExpectedAnswer, NewQuestion};

    async fn question(state: &AppState, legacy: &str) -> Question {
        state
            .store
            .insert_question(NewQuestion {
                text: "Question".to_string(),
                legacy_answer: legacy.to_string(),
                ..Default::default()
            })
            .await
    }

    async fn expect(state: &AppState, question_id: QuestionId, raw: &str, input_type: InputType) {
        state
            .store
            .add_expected_answer(NewExpectedAnswer {
                question_id,
                input_type,
                hint: String::new(),
                answer_raw: raw.to_string(),
                is_primary: true,
                rank: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_board_answer_records() {
        let state = AppState::new();
        let q = question(&state, "").await;
        expect(&state, q.id, "Paris", InputType::Normal).await;
        let player = state.create_player(Some("Alice".to_string())).await;

        let (submission, verdict) = state
            .submit_board_answer(&player, q.id, " paris! ".to_string())
            .await
            .unwrap();
        assert!(verdict.is_correct);
        assert!(submission.is_correct);
        assert_eq!(submission.answer_raw, " paris! ");
        assert_eq!(submission.answer_normalized, "paris");
        assert_eq!(state.store.submissions_for(q.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_question() {
        let state = AppState::new();
        let player = state.create_player(None).await;
        let result = state
            .submit_board_answer(&player, 99, "x".to_string())
            .await;
        assert!(matches!(result, Err(StoreError::QuestionNotFound(99))));
    }

    #[tokio::test]
    async fn test_overlong_answer_rejected() {
        let state = AppState::new();
        let q = question(&state, "Paris").await;
        let player = state.create_player(None).await;
        let result = state
            .submit_board_answer(&player, q.id, "a".repeat(MAX_ANSWER_CHARS + 1))
            .await;
        assert!(matches!(result, Err(StoreError::TooLong { .. })));
    }

    #[tokio::test]
    async fn test_legacy_fallback_still_evaluates() {
        let state = AppState::new();
        let q = question(&state, "Berlin").await;
        let verdict = state.evaluate_answer(q.id, "berlin").await.unwrap();
        assert!(verdict.is_correct);
    }

    #[tokio::test]
    async fn test_text_summary_uses_latest_answers() {
        let state = AppState::new();
        let q = question(&state, "").await;
        expect(&state, q.id, "Paris", InputType::Normal).await;
        let alice = state.create_player(Some("Alice".to_string())).await;
        let bob = state.create_player(Some("Bob".to_string())).await;

        state
            .submit_board_answer(&alice, q.id, "Rome".to_string())
            .await
            .unwrap();
        state
            .submit_board_answer(&alice, q.id, "Paris".to_string())
            .await
            .unwrap();
        state
            .submit_board_answer(&bob, q.id, "London".to_string())
            .await
            .unwrap();

        match state.evaluate_question(q.id).await.unwrap() {
            EvaluationSummary::Text {
                results,
                correct_count,
                accuracy,
                expected_answers,
                ..
            } => {
                assert_eq!(results.len(), 2);
                assert_eq!(correct_count, 1);
                assert_eq!(accuracy, 0.5);
                assert_eq!(expected_answers, vec!["Paris".to_string()]);
            }
            other => panic!("Expected text summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guess_summary_ranks_by_distance() {
        let state = AppState::new();
        let q = question(&state, "").await;
        expect(&state, q.id, "1969", InputType::Guess).await;
        let alice = state.create_player(Some("Alice".to_string())).await;
        let bob = state.create_player(Some("Bob".to_string())).await;
        let carol = state.create_player(Some("Carol".to_string())).await;

        for (player, guess) in [(&alice, "1970"), (&bob, "1950"), (&carol, "soon")] {
            state
                .submit_board_answer(player, q.id, guess.to_string())
                .await
                .unwrap();
        }

        match state.evaluate_question(q.id).await.unwrap() {
            EvaluationSummary::Guess {
                results,
                winners,
                correct_answer,
                ..
            } => {
                assert_eq!(correct_answer.as_deref(), Some("1969"));
                assert_eq!(winners, vec![alice.id.clone()]);
                assert_eq!(results[0].key, alice.id);
                assert_eq!(results[2].key, carol.id);
                assert!(results[2].distance.is_none());
            }
            other => panic!("Expected guess summary, got {:?}", other),
        }
    }
}
