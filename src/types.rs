use serde::{Deserialize, Serialize};

/// Content-store ids are assigned sequentially, so id order is creation order
pub type QuestionId = u64;
pub type ExpectedAnswerId = u64;
pub type SubmissionId = u64;

/// Opaque runtime ids (ULIDs)
pub type PlayerId = String;
pub type SessionId = String;

/// Column limits carried over from the content schema
pub const MAX_HINT_CHARS: usize = 50;
pub const MAX_ANSWER_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Free text compared by similarity
    #[default]
    Normal,
    /// Numeric guess compared by distance
    Guess,
}

/// One trivia prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Single-answer column from before expected answers existed; read-only fallback
    #[serde(default)]
    pub legacy_answer: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Whether players type an answer for this question
    #[serde(default = "default_true")]
    pub input_expected: bool,
}

fn default_true() -> bool {
    true
}

/// One acceptable answer for a question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectedAnswer {
    pub id: ExpectedAnswerId,
    pub question_id: QuestionId,
    pub input_type: InputType,
    /// Placeholder text for the input form
    pub hint: String,
    pub answer_raw: String,
    /// Always `normalize(answer_raw)`; maintained by the store
    pub answer_normalized: String,
    pub is_primary: bool,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// A player's answer attempt on a board question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub question_id: QuestionId,
    pub player_id: PlayerId,
    pub answer_raw: String,
    pub answer_normalized: String,
    pub is_correct: bool,
    pub similarity: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub token: String,
    pub display_name: String,
    /// Mini-games and board questions won across the evening
    #[serde(default)]
    pub overall_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Display,
    Player,
}

/// Connection counts by role
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectionCounts {
    pub players: u32,
    pub displays: u32,
    pub admins: u32,
}
