//! Admin-only command handlers
//!
//! All handlers in this module require the Admin role.
//! Authorization is checked in the main dispatch layer before calling these.

use crate::broadcast::Target;
use crate::games::GameSetup;
use crate::protocol::{PlayerInfo, ServerMessage};
use crate::session::SessionEvent;
use crate::state::AppState;
use crate::store::{NewExpectedAnswer, NewQuestion};
use crate::types::QuestionId;
use std::sync::Arc;

async fn player_list(state: &Arc<AppState>) -> ServerMessage {
    let players = state
        .list_players()
        .await
        .iter()
        .map(PlayerInfo::from)
        .collect();
    ServerMessage::PlayerList { players }
}

/// Broadcast the current roster to admins
pub async fn broadcast_player_list_to_admin(state: &Arc<AppState>) {
    let msg = player_list(state).await;
    state.broadcaster.emit(Target::Admin, msg).await;
}

async fn save_content(state: &Arc<AppState>) {
    if let Err(e) = state.persist_content().await {
        tracing::error!("Failed to save content: {}", e);
    }
}

pub async fn handle_start_game(state: &Arc<AppState>, setup: GameSetup) -> Option<ServerMessage> {
    tracing::info!("Admin starting game: {:?}", setup);
    match state.start_game(setup).await {
        // GameReady already went out to everyone
        Ok(session_id) => {
            tracing::info!("Session {} ready", session_id);
            None
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_start_countdown(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Admin starting countdown");
    state
        .dispatch_session(SessionEvent::StartCountdown)
        .await
        .err()
        .map(Into::into)
}

pub async fn handle_end_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Admin ending game");
    state
        .dispatch_session(SessionEvent::EndGame)
        .await
        .err()
        .map(Into::into)
}

pub async fn handle_evaluate_question(
    state: &Arc<AppState>,
    question_id: QuestionId,
) -> Option<ServerMessage> {
    tracing::info!("Admin evaluating question {}", question_id);
    match state.evaluate_question(question_id).await {
        Ok(summary) => {
            state
                .broadcaster
                .emit(
                    Target::Display,
                    ServerMessage::EvaluationSummary {
                        summary: summary.clone(),
                    },
                )
                .await;
            Some(ServerMessage::EvaluationSummary { summary })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_add_question(
    state: &Arc<AppState>,
    text: String,
    legacy_answer: String,
    category: Option<String>,
) -> Option<ServerMessage> {
    if text.trim().is_empty() {
        return Some(ServerMessage::error(
            "INVALID_QUESTION",
            "Question text cannot be empty",
        ));
    }
    let question = state
        .store
        .insert_question(NewQuestion {
            text,
            legacy_answer,
            category,
            input_expected: true,
        })
        .await;
    tracing::info!("Admin added question {}", question.id);
    save_content(state).await;
    Some(ServerMessage::QuestionAdded { question })
}

pub async fn handle_add_expected_answer(
    state: &Arc<AppState>,
    new: NewExpectedAnswer,
) -> Option<ServerMessage> {
    if new.answer_raw.trim().is_empty() {
        return Some(ServerMessage::error(
            "INVALID_ANSWER",
            "Expected answer cannot be empty",
        ));
    }
    match state.store.add_expected_answer(new).await {
        Ok(answer) => {
            tracing::info!(
                "Admin added expected answer {} to question {}",
                answer.id,
                answer.question_id
            );
            save_content(state).await;
            Some(ServerMessage::ExpectedAnswerAdded { answer })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_list_players(state: &Arc<AppState>) -> Option<ServerMessage> {
    Some(player_list(state).await)
}
