use crate::answer::Verdict;
use crate::games::{GameSetup, InputOutcome, MiniGameKind, PlayerInput, QuestionPayload};
use crate::session::{ClientProgress, SessionPhase, SessionSnapshot, Standing};
use crate::state::EvaluationSummary;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a player; a display name is generated when none is given
    JoinPlayer {
        display_name: Option<String>,
    },
    /// Re-attach to an existing player (e.g. after a page reload)
    Reconnect {
        player_token: String,
    },
    SubmitInput {
        player_token: String,
        question_index: usize,
        input: PlayerInput,
    },
    /// Answer a question on the main game board
    SubmitAnswer {
        player_token: String,
        question_id: QuestionId,
        text: String,
    },
    RequestState {
        player_token: Option<String>,
    },
    // Admin-only messages
    AdminStartGame {
        setup: GameSetup,
    },
    AdminStartCountdown,
    AdminEndGame,
    AdminEvaluateQuestion {
        question_id: QuestionId,
    },
    AdminAddQuestion {
        text: String,
        #[serde(default)]
        legacy_answer: String,
        #[serde(default)]
        category: Option<String>,
    },
    AdminAddExpectedAnswer {
        question_id: QuestionId,
        answer_raw: String,
        #[serde(default)]
        input_type: InputType,
        #[serde(default)]
        hint: Option<String>,
        #[serde(default)]
        is_primary: bool,
        #[serde(default)]
        rank: Option<u32>,
    },
    AdminListPlayers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        server_now: String,
        phase: Option<SessionPhase>,
    },
    /// Sent to the joining client only; the token is its reconnect credential
    PlayerJoined {
        player_id: PlayerId,
        token: String,
        display_name: String,
    },
    PlayerList {
        players: Vec<PlayerInfo>,
    },
    GameReady {
        session_id: SessionId,
        game: MiniGameKind,
        players: Vec<PlayerInfo>,
        total_questions: usize,
    },
    Countdown {
        seconds: u64,
        server_now: String,
    },
    GameStarted {
        server_now: String,
        deadline: Option<String>,
    },
    Question {
        index: usize,
        total: usize,
        payload: QuestionPayload,
        /// Clients keep the previous feedback visible this long
        show_after_ms: u64,
    },
    Progress {
        progress: ClientProgress,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<Feedback>,
    },
    PlayerCompleted {
        player_id: PlayerId,
        display_name: String,
        points: u32,
    },
    /// Sent to a player whose progress restarted at question 0
    Resumed {
        progress: ClientProgress,
        total: usize,
        deadline: Option<String>,
    },
    Completed {
        standings: Vec<Standing>,
        winners: Vec<PlayerId>,
    },
    /// Clients navigate to `redirect` unconditionally
    GameOver {
        redirect: String,
        winners: Vec<PlayerId>,
    },
    SessionState {
        snapshot: SessionSnapshot,
    },
    /// Verdict for a board answer, sent to the submitting player
    AnswerResult {
        question_id: QuestionId,
        verdict: Verdict,
    },
    /// Admin-only: a board answer was recorded
    SubmissionReceived {
        question_id: QuestionId,
        player_id: PlayerId,
        display_name: String,
        count: usize,
    },
    EvaluationSummary {
        summary: EvaluationSummary,
    },
    QuestionAdded {
        question: Question,
    },
    ExpectedAnswerAdded {
        answer: ExpectedAnswer,
    },
    /// Connection stats sent to admins (periodic updates)
    ConnectionStats {
        players: u32,
        displays: u32,
        admins: u32,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<crate::error::StoreError> for ServerMessage {
    fn from(e: crate::error::StoreError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}

impl From<crate::error::SessionError> for ServerMessage {
    fn from(e: crate::error::SessionError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}

/// Feedback for one input, shown for `show_ms` before the next question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub question_index: usize,
    #[serde(flatten)]
    pub outcome: InputOutcome,
    pub show_ms: u64,
}

/// Public player info (no token)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u32>,
}

impl From<&Player> for PlayerInfo {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            overall_score: Some(p.overall_score),
        }
    }
}
