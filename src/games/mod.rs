//! Server side of the mini-games.
//!
//! A mini-game owns its content and scoring; the session owns phases and
//! per-player progress and asks the game for question payloads and verdicts.

pub mod coop_puzzle;
pub mod flappy;
pub mod ordering;
pub mod trivia;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::types::{InputType, PlayerId, QuestionId};

pub use coop_puzzle::CoopPuzzleGame;
pub use flappy::FlappyGame;
pub use ordering::{OrderItem, OrderingGame, OrderingRound};
pub use trivia::{TriviaGame, TriviaItem};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameKind {
    MatchMe,
    MovieLetters,
    Ordering,
    FlappyBirds,
    CoopPuzzle,
}

/// What the admin asks for when starting a mini-game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameSetup {
    MatchMe {
        question_ids: Vec<QuestionId>,
    },
    MovieLetters {
        question_ids: Vec<QuestionId>,
    },
    Ordering {
        rounds: Vec<OrderingRound>,
    },
    FlappyBirds,
    CoopPuzzle {
        #[serde(default = "default_puzzle_side")]
        rows: usize,
        #[serde(default = "default_puzzle_side")]
        cols: usize,
        #[serde(default)]
        image_path: Option<String>,
    },
}

fn default_puzzle_side() -> usize {
    coop_puzzle::DEFAULT_SIDE
}

/// One player input; exactly one is accepted per question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerInput {
    Text { text: String },
    Order { items: Vec<String> },
    Score { score: u32 },
    LockPiece { piece: usize },
}

impl PlayerInput {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PlayerInput::Text { .. } => "text",
            PlayerInput::Order { .. } => "order",
            PlayerInput::Score { .. } => "score",
            PlayerInput::LockPiece { .. } => "lock_piece",
        }
    }
}

/// Question content sent to a player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionPayload {
    Text {
        question_id: QuestionId,
        text: String,
        hint: String,
        input_type: InputType,
    },
    Order {
        prompt: String,
        /// Items in display order (shuffled once per game)
        items: Vec<String>,
    },
    /// One flappy-birds run
    Run,
    Puzzle {
        rows: usize,
        cols: usize,
        image_path: Option<String>,
        team: Option<String>,
        teammates: Vec<PlayerId>,
    },
}

/// Verdict of a mini-game on one input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputOutcome {
    pub correct: bool,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Shown during the feedback window, e.g. the reference answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub trait MiniGame: Send + Sync {
    fn kind(&self) -> MiniGameKind;

    /// Number of questions each player works through
    fn question_count(&self) -> usize;

    /// Payload for a player's question `index`, `None` when nothing new is shown
    fn question(&self, player: &PlayerId, index: usize) -> Option<QuestionPayload>;

    /// Score one input. Must not change game state when it returns an error.
    fn evaluate(
        &mut self,
        player: &PlayerId,
        index: usize,
        input: &PlayerInput,
    ) -> Result<InputOutcome, SessionError>;

    /// Whether a player with `answered` inputs is done
    fn player_finished(&self, _player: &PlayerId, answered: usize) -> bool {
        answered >= self.question_count()
    }

    /// A player joining after the roster was fixed
    fn join(&mut self, _player: &PlayerId) {}

    /// Winners decided by the game itself before everyone finished
    fn decided(&self) -> Option<Vec<PlayerId>> {
        None
    }
}
