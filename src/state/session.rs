//! Mini-game session lifecycle on top of the session state machine

use super::AppState;
use crate::answer::resolve;
use crate::broadcast::schedule_for_phase;
use crate::error::SessionError;
use crate::games::{
    CoopPuzzleGame, FlappyGame, GameSetup, MiniGame, MiniGameKind, OrderingGame, TriviaGame,
    TriviaItem,
};
use crate::migrate::DEFAULT_HINT;
use crate::session::{GameSession, SessionEvent, SessionPhase};
use crate::types::*;
use std::sync::Arc;

impl AppState {
    /// Replace a finished (or absent) session with a new one and announce it
    pub async fn start_game(self: &Arc<Self>, setup: GameSetup) -> Result<SessionId, SessionError> {
        let players = self.list_players().await;
        let roster_ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let game = self.build_game(setup, &roster_ids).await?;

        let session_id = ulid::Ulid::new().to_string();
        let mut session = GameSession::new(
            session_id.clone(),
            game,
            players
                .into_iter()
                .map(|p| (p.id, p.display_name))
                .collect(),
            self.config.session.clone(),
        );
        let outbound = session.dispatch(SessionEvent::Prepare)?;

        let mut guard = self.session.write().await;
        if let Some(existing) = guard.as_ref() {
            if existing.phase() != SessionPhase::GameOver {
                return Err(SessionError::WrongPhase {
                    action: "start a new game",
                    phase: existing.phase(),
                });
            }
        }
        *guard = Some(session);
        for o in outbound {
            self.broadcaster.emit(o.target, o.message).await;
        }
        Ok(session_id)
    }

    async fn build_game(
        &self,
        setup: GameSetup,
        roster: &[PlayerId],
    ) -> Result<Box<dyn MiniGame>, SessionError> {
        let game: Box<dyn MiniGame> = match setup {
            GameSetup::MatchMe { question_ids } => Box::new(TriviaGame::new(
                MiniGameKind::MatchMe,
                self.trivia_items(&question_ids).await?,
                self.matcher,
            )?),
            GameSetup::MovieLetters { question_ids } => Box::new(TriviaGame::new(
                MiniGameKind::MovieLetters,
                self.trivia_items(&question_ids).await?,
                self.matcher,
            )?),
            GameSetup::Ordering { rounds } => Box::new(OrderingGame::new(rounds)?),
            GameSetup::FlappyBirds => Box::new(FlappyGame::new()),
            GameSetup::CoopPuzzle {
                rows,
                cols,
                image_path,
            } => Box::new(CoopPuzzleGame::new(roster, rows, cols, image_path)?),
        };
        Ok(game)
    }

    async fn trivia_items(&self, ids: &[QuestionId]) -> Result<Vec<TriviaItem>, SessionError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let (question, expected) = self
                .store
                .question_with_answers(*id)
                .await
                .ok_or_else(|| SessionError::InvalidSetup(format!("question {} not found", id)))?;

            let resolved = resolve(&question, &expected);
            if resolved.is_legacy_fallback() {
                tracing::warn!(
                    "Question {} has no expected answers, falling back to its legacy answer",
                    id
                );
            } else if resolved.candidates.is_empty() {
                tracing::warn!("Question {} has no answers at all; nothing will match", id);
            }

            let hint = resolved
                .reference()
                .map(|c| c.hint.clone())
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HINT.to_string());
            items.push(TriviaItem {
                question,
                hint,
                resolved,
            });
        }
        Ok(items)
    }

    /// Feed an event to the current session and deliver what it emits
    pub async fn dispatch_session(self: &Arc<Self>, event: SessionEvent) -> Result<(), SessionError> {
        self.dispatch_checked(None, event).await
    }

    /// Timer events only apply to the session that scheduled them
    pub async fn dispatch_timer(self: &Arc<Self>, session_id: &SessionId, event: SessionEvent) {
        if let Err(e) = self.dispatch_checked(Some(session_id), event).await {
            tracing::debug!("Timer event for session {} ignored: {}", session_id, e);
        }
    }

    async fn dispatch_checked(
        self: &Arc<Self>,
        expected_session: Option<&SessionId>,
        event: SessionEvent,
    ) -> Result<(), SessionError> {
        let mut guard = self.session.write().await;
        let session = guard.as_mut().ok_or(SessionError::NoSession)?;
        if expected_session.is_some_and(|id| *id != session.id) {
            return Err(SessionError::NoSession);
        }

        let before = session.phase();
        let outbound = session.dispatch(event)?;
        let after = session.phase();
        let awards = session.take_pending_awards();
        let session_id = session.id.clone();

        // Emit under the lock so each client sees messages in dispatch order
        for o in outbound {
            self.broadcaster.emit(o.target, o.message).await;
        }
        drop(guard);

        if !awards.is_empty() {
            self.award_points(&awards).await;
        }
        if before != after {
            schedule_for_phase(self, &session_id, after);
        }
        Ok(())
    }

    /// Bring a (re)connecting player back into the current session
    pub async fn rejoin_session(self: &Arc<Self>, player: &Player) -> Result<(), SessionError> {
        let known = match self.session.read().await.as_ref() {
            Some(session) => session.has_player(&player.id),
            None => return Ok(()),
        };
        let event = if known {
            SessionEvent::Reconnect {
                player: player.id.clone(),
            }
        } else {
            SessionEvent::Join {
                player: player.id.clone(),
                display_name: player.display_name.clone(),
            }
        };
        self.dispatch_session(event).await
    }

    pub async fn session_phase(&self) -> Option<SessionPhase> {
        self.session.read().await.as_ref().map(|s| s.phase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::games::{OrderItem, OrderingRound};
    use crate::store::ContentStore;

    /// Timers far enough out that tests drive every transition themselves
    fn manual_state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.session.countdown_seconds = 3600;
        config.session.game_over_delay_seconds = 3600;
        Arc::new(AppState::with_config(config, ContentStore::new()))
    }

    fn ordering_setup() -> GameSetup {
        GameSetup::Ordering {
            rounds: vec![OrderingRound {
                prompt: "Smallest first".to_string(),
                items: vec![
                    OrderItem { name: "mouse".to_string(), position: 1 },
                    OrderItem { name: "whale".to_string(), position: 2 },
                ],
            }],
        }
    }

    #[tokio::test]
    async fn test_start_game_builds_ready_session() {
        let state = manual_state();
        state.create_player(Some("Alice".to_string())).await;
        let mut all = state.broadcaster.subscribe(Role::Player).await;

        state.start_game(ordering_setup()).await.unwrap();
        assert_eq!(state.session_phase().await, Some(SessionPhase::Ready));
        match all.try_recv().unwrap() {
            crate::protocol::ServerMessage::GameReady { players, .. } => {
                assert_eq!(players.len(), 1)
            }
            other => panic!("Expected game ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cannot_start_over_running_game() {
        let state = manual_state();
        state.start_game(GameSetup::FlappyBirds).await.unwrap();
        let result = state.start_game(GameSetup::FlappyBirds).await;
        assert!(matches!(
            result,
            Err(SessionError::WrongPhase {
                phase: SessionPhase::Ready,
                ..
            })
        ));

        state.dispatch_session(SessionEvent::EndGame).await.unwrap();
        assert!(state.start_game(GameSetup::FlappyBirds).await.is_ok());
    }

    #[tokio::test]
    async fn test_trivia_needs_known_questions() {
        let state = manual_state();
        let result = state
            .start_game(GameSetup::MatchMe {
                question_ids: vec![42],
            })
            .await;
        assert!(matches!(result, Err(SessionError::InvalidSetup(_))));
        assert!(state.session.read().await.is_none());
    }

    #[tokio::test]
    async fn test_trivia_hint_comes_from_reference_answer() {
        use crate::store::{NewExpectedAnswer, NewQuestion};

        let state = manual_state();
        let question = state
            .store
            .insert_question(NewQuestion {
                text: "Tolkien's best known novel?".to_string(),
                input_expected: true,
                ..Default::default()
            })
            .await;
        for (raw, hint, is_primary) in [
            ("LOTR", "Four letters", false),
            ("The Lord of the Rings", "A long title", true),
        ] {
            state
                .store
                .add_expected_answer(NewExpectedAnswer {
                    question_id: question.id,
                    input_type: InputType::Normal,
                    hint: hint.to_string(),
                    answer_raw: raw.to_string(),
                    is_primary,
                    rank: None,
                })
                .await
                .unwrap();
        }

        let items = state.trivia_items(&[question.id]).await.unwrap();
        assert_eq!(items[0].hint, "A long title");
    }

    #[tokio::test]
    async fn test_timer_for_stale_session_is_ignored() {
        let state = manual_state();
        state.start_game(GameSetup::FlappyBirds).await.unwrap();
        state
            .dispatch_session(SessionEvent::StartCountdown)
            .await
            .unwrap();

        state
            .dispatch_timer(&"old-session".to_string(), SessionEvent::CountdownElapsed)
            .await;
        assert_eq!(state.session_phase().await, Some(SessionPhase::Countdown));

        let id = state.session.read().await.as_ref().unwrap().id.clone();
        state
            .dispatch_timer(&id, SessionEvent::CountdownElapsed)
            .await;
        assert_eq!(state.session_phase().await, Some(SessionPhase::Active));
    }

    #[tokio::test]
    async fn test_winner_gets_overall_point() {
        let state = manual_state();
        let alice = state.create_player(Some("Alice".to_string())).await;
        state.start_game(GameSetup::FlappyBirds).await.unwrap();
        state
            .dispatch_session(SessionEvent::StartCountdown)
            .await
            .unwrap();
        state
            .dispatch_session(SessionEvent::CountdownElapsed)
            .await
            .unwrap();
        state
            .dispatch_session(SessionEvent::Input {
                player: alice.id.clone(),
                question_index: 0,
                input: crate::games::PlayerInput::Score { score: 7 },
            })
            .await
            .unwrap();

        assert_eq!(state.session_phase().await, Some(SessionPhase::Completed));
        assert_eq!(state.get_player(&alice.id).await.unwrap().overall_score, 1);
    }

    #[tokio::test]
    async fn test_countdown_timer_fires() {
        let mut config = AppConfig::default();
        config.session.countdown_seconds = 0;
        let state = Arc::new(AppState::with_config(config, ContentStore::new()));
        state.create_player(Some("Alice".to_string())).await;
        state.start_game(GameSetup::FlappyBirds).await.unwrap();
        state
            .dispatch_session(SessionEvent::StartCountdown)
            .await
            .unwrap();

        for _ in 0..50 {
            if state.session_phase().await == Some(SessionPhase::Active) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(state.session_phase().await, Some(SessionPhase::Active));
    }
}
