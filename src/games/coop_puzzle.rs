//! Cooperative puzzle: players are split into teams, each team assembles its
//! own copy of the picture, and the first team to lock every piece wins.

use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet};

use super::{InputOutcome, MiniGame, MiniGameKind, PlayerInput, QuestionPayload};
use crate::error::SessionError;
use crate::types::PlayerId;

pub const DEFAULT_SIDE: usize = 3;
const MAX_SIDE: usize = 8;

#[derive(Debug, Default)]
struct Team {
    members: Vec<PlayerId>,
    locked: HashSet<usize>,
}

pub struct CoopPuzzleGame {
    rows: usize,
    cols: usize,
    image_path: Option<String>,
    teams: BTreeMap<String, Team>,
    winner: Option<String>,
}

/// Fewer than four players play solo, exactly four form two pairs, more form
/// teams of three (the last one may be smaller).
pub fn assign_teams(players: &[PlayerId]) -> Vec<Vec<PlayerId>> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(&mut rand::rng());

    let size = match shuffled.len() {
        n if n < 4 => 1,
        4 => 2,
        _ => 3,
    };
    shuffled.chunks(size).map(|c| c.to_vec()).collect()
}

fn team_name(index: usize) -> String {
    format!("team_{}", index + 1)
}

impl CoopPuzzleGame {
    pub fn new(
        players: &[PlayerId],
        rows: usize,
        cols: usize,
        image_path: Option<String>,
    ) -> Result<Self, SessionError> {
        if !(1..=MAX_SIDE).contains(&rows) || !(1..=MAX_SIDE).contains(&cols) {
            return Err(SessionError::InvalidSetup(format!(
                "puzzle size {}x{} out of range",
                rows, cols
            )));
        }
        if rows * cols < 2 {
            return Err(SessionError::InvalidSetup(
                "puzzle needs at least two pieces".to_string(),
            ));
        }

        let teams = assign_teams(players)
            .into_iter()
            .enumerate()
            .map(|(i, members)| {
                (
                    team_name(i),
                    Team {
                        members,
                        locked: HashSet::new(),
                    },
                )
            })
            .collect();

        Ok(Self {
            rows,
            cols,
            image_path,
            teams,
            winner: None,
        })
    }

    fn piece_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn team_of(&self, player: &PlayerId) -> Option<&str> {
        self.teams
            .iter()
            .find(|(_, team)| team.members.contains(player))
            .map(|(name, _)| name.as_str())
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }
}

impl MiniGame for CoopPuzzleGame {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::CoopPuzzle
    }

    fn question_count(&self) -> usize {
        self.piece_count()
    }

    /// The board is sent once; later locks need no new question
    fn question(&self, player: &PlayerId, index: usize) -> Option<QuestionPayload> {
        if index != 0 {
            return None;
        }
        let team = self.team_of(player).map(str::to_string);
        let teammates = team
            .as_ref()
            .and_then(|name| self.teams.get(name))
            .map(|t| t.members.iter().filter(|m| *m != player).cloned().collect())
            .unwrap_or_default();
        Some(QuestionPayload::Puzzle {
            rows: self.rows,
            cols: self.cols,
            image_path: self.image_path.clone(),
            team,
            teammates,
        })
    }

    fn evaluate(
        &mut self,
        player: &PlayerId,
        _index: usize,
        input: &PlayerInput,
    ) -> Result<InputOutcome, SessionError> {
        let PlayerInput::LockPiece { piece } = input else {
            return Err(SessionError::UnsupportedInput(input.kind_name()));
        };
        let piece = *piece;
        let total = self.piece_count();
        if piece >= total {
            return Err(SessionError::InvalidInput(format!(
                "piece {} out of range (0..{})",
                piece, total
            )));
        }
        if self.winner.is_some() {
            return Err(SessionError::AlreadyFinished);
        }

        let name = self
            .team_of(player)
            .map(str::to_string)
            .ok_or_else(|| SessionError::UnknownPlayer(player.clone()))?;
        let team = self
            .teams
            .get_mut(&name)
            .ok_or_else(|| SessionError::UnknownPlayer(player.clone()))?;

        let newly_locked = team.locked.insert(piece);
        if team.locked.len() == total {
            tracing::info!("Team {} completed the puzzle", name);
            self.winner = Some(name.clone());
        }

        Ok(InputOutcome {
            correct: newly_locked,
            points: u32::from(newly_locked),
            similarity: None,
            detail: Some(name),
        })
    }

    fn player_finished(&self, player: &PlayerId, _answered: usize) -> bool {
        self.team_of(player)
            .and_then(|name| self.teams.get(name))
            .is_some_and(|team| team.locked.len() == self.piece_count())
    }

    fn join(&mut self, player: &PlayerId) {
        if self.team_of(player).is_some() {
            return;
        }
        let smallest = self
            .teams
            .iter()
            .min_by_key(|(_, team)| team.members.len())
            .map(|(name, _)| name.clone());
        match smallest {
            Some(name) => {
                if let Some(team) = self.teams.get_mut(&name) {
                    team.members.push(player.clone());
                }
            }
            None => {
                let name = team_name(self.teams.len());
                self.teams.insert(
                    name,
                    Team {
                        members: vec![player.clone()],
                        locked: HashSet::new(),
                    },
                );
            }
        }
    }

    fn decided(&self) -> Option<Vec<PlayerId>> {
        let name = self.winner.as_ref()?;
        self.teams.get(name).map(|team| team.members.clone())
    }
}
