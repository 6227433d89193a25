//! Mini-game session state machine.
//!
//! One `GameSession` exists per running mini-game. Every external stimulus
//! (admin command, player input, timer) becomes a `SessionEvent` fed through
//! `dispatch`, which returns the messages to deliver. Timers are owned by the
//! caller; the session only records when they should fire.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::broadcast::Target;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::games::{MiniGame, MiniGameKind, PlayerInput};
use crate::protocol::{Feedback, PlayerInfo, ServerMessage};
use crate::types::{PlayerId, SessionId};

/// Where clients go once a mini-game is over
pub const GAME_OVER_REDIRECT: &str = "/board";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Ready,
    Countdown,
    Active,
    Completed,
    GameOver,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientProgress {
    pub questions_answered: usize,
    pub points: u32,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Announce the game to everyone
    Prepare,
    StartCountdown,
    CountdownElapsed,
    Join {
        player: PlayerId,
        display_name: String,
    },
    Input {
        player: PlayerId,
        question_index: usize,
        input: PlayerInput,
    },
    Reconnect {
        player: PlayerId,
    },
    BudgetExhausted,
    GameOverElapsed,
    EndGame,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Prepare => "prepare the game",
            SessionEvent::StartCountdown => "start the countdown",
            SessionEvent::CountdownElapsed => "finish the countdown",
            SessionEvent::Join { .. } => "join",
            SessionEvent::Input { .. } => "submit input",
            SessionEvent::Reconnect { .. } => "reconnect",
            SessionEvent::BudgetExhausted => "expire the time budget",
            SessionEvent::GameOverElapsed => "end the results screen",
            SessionEvent::EndGame => "end the game",
        }
    }
}

/// A message and who receives it
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn new(target: Target, message: ServerMessage) -> Self {
        Self { target, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    pub player_id: PlayerId,
    pub display_name: String,
    pub points: u32,
    pub questions_answered: usize,
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameResult {
    pub standings: Vec<Standing>,
    pub winners: Vec<PlayerId>,
}

/// What a (re)connecting client needs to render the current phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub game: MiniGameKind,
    pub phase: SessionPhase,
    pub total_questions: usize,
    pub deadline: Option<String>,
    pub progress: Option<ClientProgress>,
    pub result: Option<GameResult>,
}

pub struct GameSession {
    pub id: SessionId,
    phase: SessionPhase,
    game: Box<dyn MiniGame>,
    roster: Vec<PlayerId>,
    names: HashMap<PlayerId, String>,
    progress: HashMap<PlayerId, ClientProgress>,
    config: SessionConfig,
    deadline: Option<DateTime<Utc>>,
    result: Option<GameResult>,
    pending_awards: Vec<PlayerId>,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        game: Box<dyn MiniGame>,
        players: Vec<(PlayerId, String)>,
        config: SessionConfig,
    ) -> Self {
        let mut session = Self {
            id,
            phase: SessionPhase::Idle,
            game,
            roster: Vec::new(),
            names: HashMap::new(),
            progress: HashMap::new(),
            config,
            deadline: None,
            result: None,
            pending_awards: Vec::new(),
        };
        for (player, name) in players {
            session.add_player(player, name);
        }
        session
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn kind(&self) -> MiniGameKind {
        self.game.kind()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.phase == SessionPhase::Active && self.deadline.is_some_and(|d| now >= d)
    }

    pub fn progress_of(&self, player: &PlayerId) -> Option<&ClientProgress> {
        self.progress.get(player)
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.progress.contains_key(player)
    }

    /// Winners whose overall point has not been handed out yet
    pub fn take_pending_awards(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.pending_awards)
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        tracing::debug!("Session {} ({:?}) <- {:?}", self.id, self.phase, event);
        match self.phase {
            SessionPhase::Idle => self.on_idle(event),
            SessionPhase::Ready => self.on_ready(event),
            SessionPhase::Countdown => self.on_countdown(event),
            SessionPhase::Active => self.on_active(event),
            SessionPhase::Completed => self.on_completed(event),
            SessionPhase::GameOver => self.on_game_over(event),
        }
    }

    fn wrong_phase(&self, event: &SessionEvent) -> SessionError {
        SessionError::WrongPhase {
            action: event.name(),
            phase: self.phase,
        }
    }

    fn on_idle(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            SessionEvent::Prepare => {
                self.phase = SessionPhase::Ready;
                tracing::info!("Session {} ready: {:?}", self.id, self.game.kind());
                Ok(vec![Outbound::new(
                    Target::All,
                    ServerMessage::GameReady {
                        session_id: self.id.clone(),
                        game: self.game.kind(),
                        players: self.player_infos(),
                        total_questions: self.game.question_count(),
                    },
                )])
            }
            SessionEvent::Join {
                player,
                display_name,
            } => {
                self.add_player(player, display_name);
                Ok(Vec::new())
            }
            SessionEvent::EndGame => Ok(self.game_over()),
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn on_ready(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            SessionEvent::StartCountdown => {
                self.phase = SessionPhase::Countdown;
                Ok(vec![Outbound::new(
                    Target::All,
                    ServerMessage::Countdown {
                        seconds: self.config.countdown_seconds,
                        server_now: Utc::now().to_rfc3339(),
                    },
                )])
            }
            SessionEvent::Join {
                player,
                display_name,
            } => {
                self.add_player(player.clone(), display_name);
                Ok(vec![self.snapshot_for(&player)])
            }
            SessionEvent::Reconnect { player } => {
                self.require_player(&player)?;
                Ok(vec![self.snapshot_for(&player)])
            }
            SessionEvent::EndGame => Ok(self.game_over()),
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn on_countdown(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            SessionEvent::CountdownElapsed => Ok(self.activate()),
            SessionEvent::Join {
                player,
                display_name,
            } => {
                self.add_player(player.clone(), display_name);
                Ok(vec![self.snapshot_for(&player)])
            }
            SessionEvent::Reconnect { player } => {
                self.require_player(&player)?;
                Ok(vec![self.snapshot_for(&player)])
            }
            SessionEvent::EndGame => Ok(self.game_over()),
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn on_active(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            SessionEvent::Input {
                player,
                question_index,
                input,
            } => self.handle_input(&player, question_index, &input),
            SessionEvent::Reconnect { player } => self.resume(&player),
            SessionEvent::Join {
                player,
                display_name,
            } => {
                self.add_player(player.clone(), display_name);
                self.resume(&player)
            }
            SessionEvent::BudgetExhausted => {
                tracing::info!("Session {}: time budget exhausted", self.id);
                Ok(self.complete())
            }
            SessionEvent::EndGame => {
                let mut out = self.complete();
                out.extend(self.game_over());
                Ok(out)
            }
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn on_completed(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            SessionEvent::GameOverElapsed | SessionEvent::EndGame => Ok(self.game_over()),
            SessionEvent::Join {
                player,
                display_name,
            } => {
                self.add_player(player.clone(), display_name);
                Ok(vec![self.snapshot_for(&player)])
            }
            SessionEvent::Reconnect { player } => {
                self.require_player(&player)?;
                Ok(vec![self.snapshot_for(&player)])
            }
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn on_game_over(&mut self, event: SessionEvent) -> Result<Vec<Outbound>, SessionError> {
        match event {
            // Only players of the finished game are sent back to the board
            SessionEvent::Reconnect { player } | SessionEvent::Join { player, .. } => {
                if !self.has_player(&player) {
                    return Ok(Vec::new());
                }
                Ok(vec![Outbound::new(
                    Target::Player(player),
                    self.game_over_message(),
                )])
            }
            other => Err(self.wrong_phase(&other)),
        }
    }

    fn activate(&mut self) -> Vec<Outbound> {
        self.phase = SessionPhase::Active;
        let now = Utc::now();
        self.deadline = self.config.time_limit_seconds.and_then(|secs| {
            let deadline = i64::try_from(secs)
                .ok()
                .and_then(ChronoDuration::try_seconds)
                .and_then(|budget| now.checked_add_signed(budget));
            if deadline.is_none() {
                tracing::warn!(
                    "Session {}: time budget of {}s is out of range, running unlimited",
                    self.id,
                    secs
                );
            }
            deadline
        });
        tracing::info!(
            "Session {} active with {} players",
            self.id,
            self.roster.len()
        );

        let mut out = vec![Outbound::new(
            Target::All,
            ServerMessage::GameStarted {
                server_now: now.to_rfc3339(),
                deadline: self.deadline.map(|d| d.to_rfc3339()),
            },
        )];
        for player in &self.roster {
            if let Some(q) = self.question_message(player, 0, 0) {
                out.push(Outbound::new(Target::Player(player.clone()), q));
            }
        }
        out
    }

    fn handle_input(
        &mut self,
        player: &PlayerId,
        question_index: usize,
        input: &PlayerInput,
    ) -> Result<Vec<Outbound>, SessionError> {
        let progress = self
            .progress
            .get(player)
            .ok_or_else(|| SessionError::UnknownPlayer(player.clone()))?;
        if progress.finished {
            return Err(SessionError::AlreadyFinished);
        }
        if question_index != progress.questions_answered {
            return Err(SessionError::StaleInput {
                expected: progress.questions_answered,
                got: question_index,
            });
        }

        let outcome = self.game.evaluate(player, question_index, input)?;

        let answered = question_index + 1;
        let finished = self.game.player_finished(player, answered);
        let snapshot = {
            let progress = self
                .progress
                .get_mut(player)
                .ok_or_else(|| SessionError::UnknownPlayer(player.clone()))?;
            progress.questions_answered = answered;
            progress.points += outcome.points;
            progress.finished = finished;
            progress.clone()
        };

        let mut out = vec![Outbound::new(
            Target::Player(player.clone()),
            ServerMessage::Progress {
                progress: snapshot.clone(),
                feedback: Some(Feedback {
                    question_index,
                    outcome,
                    show_ms: self.config.feedback_window_ms,
                }),
            },
        )];

        if finished {
            out.push(self.completed_notice(player, snapshot.points));
        } else if let Some(q) =
            self.question_message(player, answered, self.config.feedback_window_ms)
        {
            out.push(Outbound::new(Target::Player(player.clone()), q));
        }

        // Team games can finish other players along with the submitter
        let newly_finished: Vec<PlayerId> = self
            .roster
            .iter()
            .filter(|p| *p != player)
            .filter(|p| {
                self.progress.get(*p).is_some_and(|pr| {
                    !pr.finished && self.game.player_finished(p, pr.questions_answered)
                })
            })
            .cloned()
            .collect();
        for other in newly_finished {
            if let Some(pr) = self.progress.get_mut(&other) {
                pr.finished = true;
                let pr = pr.clone();
                out.push(Outbound::new(
                    Target::Player(other.clone()),
                    ServerMessage::Progress {
                        progress: pr.clone(),
                        feedback: None,
                    },
                ));
                out.push(self.completed_notice(&other, pr.points));
            }
        }

        if self.game.decided().is_some() || self.everyone_finished() {
            out.extend(self.complete());
        }
        Ok(out)
    }

    /// Restart a player's loop at question 0 without touching anyone else
    fn resume(&mut self, player: &PlayerId) -> Result<Vec<Outbound>, SessionError> {
        let progress = self
            .progress
            .get_mut(player)
            .ok_or_else(|| SessionError::UnknownPlayer(player.clone()))?;
        *progress = ClientProgress::default();
        let progress = progress.clone();
        tracing::info!("Player {} resumed session {} from the start", player, self.id);

        let mut out = vec![Outbound::new(
            Target::Player(player.clone()),
            ServerMessage::Resumed {
                progress,
                total: self.game.question_count(),
                deadline: self.deadline.map(|d| d.to_rfc3339()),
            },
        )];
        if let Some(q) = self.question_message(player, 0, 0) {
            out.push(Outbound::new(Target::Player(player.clone()), q));
        }
        Ok(out)
    }

    fn complete(&mut self) -> Vec<Outbound> {
        self.phase = SessionPhase::Completed;
        self.deadline = None;

        let mut standings: Vec<Standing> = self
            .roster
            .iter()
            .filter_map(|id| {
                let progress = self.progress.get(id)?;
                Some(Standing {
                    player_id: id.clone(),
                    display_name: self.display_name(id),
                    points: progress.points,
                    questions_answered: progress.questions_answered,
                    finished: progress.finished,
                })
            })
            .collect();
        standings.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        let winners = match self.game.decided() {
            Some(decided) => decided,
            None => {
                let top = standings.first().map(|s| s.points).unwrap_or(0);
                if top == 0 {
                    Vec::new()
                } else {
                    standings
                        .iter()
                        .filter(|s| s.points == top)
                        .map(|s| s.player_id.clone())
                        .collect()
                }
            }
        };

        tracing::info!("Session {} completed, winners: {:?}", self.id, winners);
        self.pending_awards = winners.clone();
        let result = GameResult { standings, winners };
        self.result = Some(result.clone());

        vec![Outbound::new(
            Target::All,
            ServerMessage::Completed {
                standings: result.standings,
                winners: result.winners,
            },
        )]
    }

    fn game_over(&mut self) -> Vec<Outbound> {
        self.phase = SessionPhase::GameOver;
        self.deadline = None;
        tracing::info!("Session {} over", self.id);
        vec![Outbound::new(Target::All, self.game_over_message())]
    }

    fn game_over_message(&self) -> ServerMessage {
        ServerMessage::GameOver {
            redirect: GAME_OVER_REDIRECT.to_string(),
            winners: self
                .result
                .as_ref()
                .map(|r| r.winners.clone())
                .unwrap_or_default(),
        }
    }

    fn add_player(&mut self, player: PlayerId, display_name: String) {
        if self.progress.contains_key(&player) {
            return;
        }
        self.game.join(&player);
        self.names.insert(player.clone(), display_name);
        self.progress.insert(player.clone(), ClientProgress::default());
        self.roster.push(player);
    }

    fn require_player(&self, player: &PlayerId) -> Result<(), SessionError> {
        if self.progress.contains_key(player) {
            Ok(())
        } else {
            Err(SessionError::UnknownPlayer(player.clone()))
        }
    }

    fn everyone_finished(&self) -> bool {
        !self.progress.is_empty() && self.progress.values().all(|p| p.finished)
    }

    fn display_name(&self, player: &PlayerId) -> String {
        self.names
            .get(player)
            .cloned()
            .unwrap_or_else(|| player.clone())
    }

    fn player_infos(&self) -> Vec<PlayerInfo> {
        self.roster
            .iter()
            .map(|id| PlayerInfo {
                id: id.clone(),
                display_name: self.display_name(id),
                overall_score: None,
            })
            .collect()
    }

    fn question_message(
        &self,
        player: &PlayerId,
        index: usize,
        show_after_ms: u64,
    ) -> Option<ServerMessage> {
        let payload = self.game.question(player, index)?;
        Some(ServerMessage::Question {
            index,
            total: self.game.question_count(),
            payload,
            show_after_ms,
        })
    }

    fn completed_notice(&self, player: &PlayerId, points: u32) -> Outbound {
        Outbound::new(
            Target::Others(player.clone()),
            ServerMessage::PlayerCompleted {
                player_id: player.clone(),
                display_name: self.display_name(player),
                points,
            },
        )
    }

    pub fn snapshot(&self, player: Option<&PlayerId>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            game: self.game.kind(),
            phase: self.phase,
            total_questions: self.game.question_count(),
            deadline: self.deadline.map(|d| d.to_rfc3339()),
            progress: player.and_then(|p| self.progress.get(p).cloned()),
            result: self.result.clone(),
        }
    }

    fn snapshot_for(&self, player: &PlayerId) -> Outbound {
        Outbound::new(
            Target::Player(player.clone()),
            ServerMessage::SessionState {
                snapshot: self.snapshot(Some(player)),
            },
        )
    }
}
