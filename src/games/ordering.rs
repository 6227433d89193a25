//! "Put the items in order" game scored by Kendall tau distance

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{InputOutcome, MiniGame, MiniGameKind, PlayerInput, QuestionPayload};
use crate::error::SessionError;
use crate::types::PlayerId;

/// Points for a perfect order; partial orders earn a proportional share
pub const ORDERING_MAX_POINTS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    /// Correct 1-based position
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderingRound {
    pub prompt: String,
    pub items: Vec<OrderItem>,
}

struct PreparedRound {
    prompt: String,
    correct_positions: HashMap<String, u32>,
    shown: Vec<String>,
}

pub struct OrderingGame {
    rounds: Vec<PreparedRound>,
}

/// Score in [0, 1]: one minus the share of inverted pairs, rounded to 4 places.
///
/// Callers pass a permutation of the round's items; see [`is_permutation`].
pub fn kendall_tau_score(correct_positions: &HashMap<String, u32>, submitted: &[String]) -> f64 {
    let n = submitted.len();
    let max_inversions = n * n.saturating_sub(1) / 2;
    if max_inversions == 0 {
        return 1.0;
    }

    let mut inversions = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let (Some(pos_i), Some(pos_j)) = (
                correct_positions.get(&submitted[i]),
                correct_positions.get(&submitted[j]),
            ) else {
                continue;
            };
            if pos_i > pos_j {
                inversions += 1;
            }
        }
    }

    let score = 1.0 - inversions as f64 / max_inversions as f64;
    (score * 10_000.0).round() / 10_000.0
}

/// True when `submitted` holds exactly the items of `shown`, each once
pub fn is_permutation(shown: &[String], submitted: &[String]) -> bool {
    if shown.len() != submitted.len() {
        return false;
    }
    let mut expected: Vec<&str> = shown.iter().map(String::as_str).collect();
    let mut got: Vec<&str> = submitted.iter().map(String::as_str).collect();
    expected.sort_unstable();
    got.sort_unstable();
    expected == got
}

impl OrderingGame {
    pub fn new(rounds: Vec<OrderingRound>) -> Result<Self, SessionError> {
        if rounds.is_empty() {
            return Err(SessionError::InvalidSetup(
                "an ordering game needs at least one round".to_string(),
            ));
        }

        let mut rng = rand::rng();
        let prepared = rounds
            .into_iter()
            .map(|round| {
                if round.items.len() < 2 {
                    return Err(SessionError::InvalidSetup(format!(
                        "round '{}' needs at least two items",
                        round.prompt
                    )));
                }
                let correct_positions: HashMap<String, u32> = round
                    .items
                    .iter()
                    .map(|item| (item.name.clone(), item.position))
                    .collect();
                if correct_positions.len() != round.items.len() {
                    return Err(SessionError::InvalidSetup(format!(
                        "round '{}' lists an item twice",
                        round.prompt
                    )));
                }
                let mut shown: Vec<String> = round.items.into_iter().map(|i| i.name).collect();
                shown.shuffle(&mut rng);
                Ok(PreparedRound {
                    prompt: round.prompt,
                    correct_positions,
                    shown,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rounds: prepared })
    }
}

impl MiniGame for OrderingGame {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::Ordering
    }

    fn question_count(&self) -> usize {
        self.rounds.len()
    }

    fn question(&self, _player: &PlayerId, index: usize) -> Option<QuestionPayload> {
        let round = self.rounds.get(index)?;
        Some(QuestionPayload::Order {
            prompt: round.prompt.clone(),
            items: round.shown.clone(),
        })
    }

    fn evaluate(
        &mut self,
        _player: &PlayerId,
        index: usize,
        input: &PlayerInput,
    ) -> Result<InputOutcome, SessionError> {
        let PlayerInput::Order { items } = input else {
            return Err(SessionError::UnsupportedInput(input.kind_name()));
        };
        let round = self
            .rounds
            .get(index)
            .ok_or(SessionError::AlreadyFinished)?;
        if items.is_empty() {
            return Err(SessionError::InvalidInput("order is empty".to_string()));
        }
        if !is_permutation(&round.shown, items) {
            return Err(SessionError::InvalidInput(format!(
                "order must contain each of the {} items exactly once",
                round.shown.len()
            )));
        }

        let score = kendall_tau_score(&round.correct_positions, items);
        Ok(InputOutcome {
            correct: score >= 1.0,
            points: (score * ORDERING_MAX_POINTS as f64).round() as u32,
            similarity: Some(score),
            detail: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(names: &[&str]) -> HashMap<String, u32> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32 + 1))
            .collect()
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_kendall_tau_perfect_and_reversed() {
        let correct = positions(&["cheetah", "horse", "cat", "snail"]);
        assert_eq!(
            kendall_tau_score(&correct, &order(&["cheetah", "horse", "cat", "snail"])),
            1.0
        );
        assert_eq!(
            kendall_tau_score(&correct, &order(&["snail", "cat", "horse", "cheetah"])),
            0.0
        );
    }

    #[test]
    fn test_kendall_tau_partial() {
        let correct = positions(&["a", "b", "c"]);
        // One inversion out of three pairs
        assert_eq!(kendall_tau_score(&correct, &order(&["b", "a", "c"])), 0.6667);
    }

    #[test]
    fn test_is_permutation() {
        let shown = order(&["a", "b", "c"]);
        assert!(is_permutation(&shown, &order(&["c", "a", "b"])));
        assert!(!is_permutation(&shown, &order(&["a", "b"])));
        assert!(!is_permutation(&shown, &order(&["a", "a", "b"])));
        assert!(!is_permutation(&shown, &order(&["a", "b", "x"])));
    }

    fn four_item_game() -> OrderingGame {
        OrderingGame::new(vec![OrderingRound {
            prompt: "Smallest first".to_string(),
            items: ["a", "b", "c", "d"]
                .iter()
                .enumerate()
                .map(|(i, n)| OrderItem { name: n.to_string(), position: i as u32 + 1 })
                .collect(),
        }])
        .unwrap()
    }

    #[test]
    fn test_partial_order_rejected() {
        let mut game = four_item_game();
        let result = game.evaluate(
            &"p1".to_string(),
            0,
            &PlayerInput::Order { items: order(&["d"]) },
        );
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_items_rejected() {
        let mut game = four_item_game();
        for submitted in [order(&["x", "y"]), order(&["a", "b", "c", "x"])] {
            let result = game.evaluate(
                &"p1".to_string(),
                0,
                &PlayerInput::Order { items: submitted },
            );
            assert!(matches!(result, Err(SessionError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_duplicate_items_rejected() {
        let mut game = four_item_game();
        let result = game.evaluate(
            &"p1".to_string(),
            0,
            &PlayerInput::Order { items: order(&["a", "a", "b", "c"]) },
        );
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[test]
    fn test_ordering_game_points() {
        let mut game = OrderingGame::new(vec![OrderingRound {
            prompt: "Fastest first".to_string(),
            items: vec![
                OrderItem { name: "cheetah".to_string(), position: 1 },
                OrderItem { name: "horse".to_string(), position: 2 },
                OrderItem { name: "snail".to_string(), position: 3 },
            ],
        }])
        .unwrap();
        let player = "p1".to_string();

        match game.question(&player, 0) {
            Some(QuestionPayload::Order { items, .. }) => assert_eq!(items.len(), 3),
            other => panic!("Expected order payload, got {:?}", other),
        }

        let outcome = game
            .evaluate(
                &player,
                0,
                &PlayerInput::Order { items: order(&["cheetah", "horse", "snail"]) },
            )
            .unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.points, ORDERING_MAX_POINTS);

        let outcome = game
            .evaluate(
                &player,
                0,
                &PlayerInput::Order { items: order(&["horse", "cheetah", "snail"]) },
            )
            .unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.points, 7);
    }

    #[test]
    fn test_ordering_setup_validation() {
        assert!(OrderingGame::new(vec![]).is_err());
        let result = OrderingGame::new(vec![OrderingRound {
            prompt: "Lonely".to_string(),
            items: vec![OrderItem { name: "one".to_string(), position: 1 }],
        }]);
        assert!(matches!(result, Err(SessionError::InvalidSetup(_))));

        let result = OrderingGame::new(vec![OrderingRound {
            prompt: "Twice".to_string(),
            items: vec![
                OrderItem { name: "one".to_string(), position: 1 },
                OrderItem { name: "one".to_string(), position: 2 },
            ],
        }]);
        assert!(matches!(result, Err(SessionError::InvalidSetup(_))));
    }
}
