//! Flappy birds: one run per player, the score is the points

use super::{InputOutcome, MiniGame, MiniGameKind, PlayerInput, QuestionPayload};
use crate::error::SessionError;
use crate::types::PlayerId;

/// Scores above this are treated as tampered input
pub const MAX_FLAPPY_SCORE: u32 = 10_000;

#[derive(Debug, Default)]
pub struct FlappyGame;

impl FlappyGame {
    pub fn new() -> Self {
        Self
    }
}

impl MiniGame for FlappyGame {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::FlappyBirds
    }

    fn question_count(&self) -> usize {
        1
    }

    fn question(&self, _player: &PlayerId, index: usize) -> Option<QuestionPayload> {
        (index == 0).then_some(QuestionPayload::Run)
    }

    fn evaluate(
        &mut self,
        _player: &PlayerId,
        _index: usize,
        input: &PlayerInput,
    ) -> Result<InputOutcome, SessionError> {
        let PlayerInput::Score { score } = input else {
            return Err(SessionError::UnsupportedInput(input.kind_name()));
        };
        if *score > MAX_FLAPPY_SCORE {
            return Err(SessionError::InvalidInput(format!(
                "score {} exceeds {}",
                score, MAX_FLAPPY_SCORE
            )));
        }
        Ok(InputOutcome {
            correct: true,
            points: *score,
            similarity: None,
            detail: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_becomes_points() {
        let mut game = FlappyGame::new();
        let player = "p1".to_string();
        assert_eq!(game.question(&player, 0), Some(QuestionPayload::Run));
        assert_eq!(game.question(&player, 1), None);

        let outcome = game
            .evaluate(&player, 0, &PlayerInput::Score { score: 42 })
            .unwrap();
        assert_eq!(outcome.points, 42);
        assert!(game.player_finished(&player, 1));
    }

    #[test]
    fn test_rejects_implausible_score() {
        let mut game = FlappyGame::new();
        let result = game.evaluate(
            &"p1".to_string(),
            0,
            &PlayerInput::Score { score: MAX_FLAPPY_SCORE + 1 },
        );
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }
}
