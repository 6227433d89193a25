//! Text and guess questions from the content store (match-me, movie letters)

use super::{InputOutcome, MiniGame, MiniGameKind, PlayerInput, QuestionPayload};
use crate::answer::{AnswerMatcher, ResolvedAnswers};
use crate::error::SessionError;
use crate::types::{PlayerId, Question};

/// A question with its resolved answers, fixed when the game starts
#[derive(Debug, Clone)]
pub struct TriviaItem {
    pub question: Question,
    pub hint: String,
    pub resolved: ResolvedAnswers,
}

pub struct TriviaGame {
    kind: MiniGameKind,
    items: Vec<TriviaItem>,
    matcher: AnswerMatcher,
}

impl TriviaGame {
    pub fn new(
        kind: MiniGameKind,
        items: Vec<TriviaItem>,
        matcher: AnswerMatcher,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::InvalidSetup(
                "a trivia game needs at least one question".to_string(),
            ));
        }
        Ok(Self {
            kind,
            items,
            matcher,
        })
    }
}

impl MiniGame for TriviaGame {
    fn kind(&self) -> MiniGameKind {
        self.kind
    }

    fn question_count(&self) -> usize {
        self.items.len()
    }

    fn question(&self, _player: &PlayerId, index: usize) -> Option<QuestionPayload> {
        let item = self.items.get(index)?;
        Some(QuestionPayload::Text {
            question_id: item.question.id,
            text: item.question.text.clone(),
            hint: item.hint.clone(),
            input_type: item.resolved.input_type(),
        })
    }

    fn evaluate(
        &mut self,
        _player: &PlayerId,
        index: usize,
        input: &PlayerInput,
    ) -> Result<InputOutcome, SessionError> {
        let PlayerInput::Text { text } = input else {
            return Err(SessionError::UnsupportedInput(input.kind_name()));
        };
        let item = self
            .items
            .get(index)
            .ok_or(SessionError::AlreadyFinished)?;

        let verdict = self.matcher.evaluate_resolved(text, &item.resolved);
        Ok(InputOutcome {
            correct: verdict.is_correct,
            points: u32::from(verdict.is_correct),
            similarity: Some(verdict.similarity),
            detail: item.resolved.reference().map(|r| r.answer_raw.clone()),
        })
    }
}
