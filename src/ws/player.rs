//! Player message handlers
//!
//! Joining, reconnecting, mini-game input and board answers.

use crate::broadcast::Target;
use crate::games::PlayerInput;
use crate::protocol::ServerMessage;
use crate::session::SessionEvent;
use crate::state::AppState;
use crate::types::{Player, QuestionId};
use crate::ws::admin::broadcast_player_list_to_admin;
use crate::ws::Connection;
use std::sync::Arc;

fn invalid_token() -> ServerMessage {
    ServerMessage::error("INVALID_PLAYER_TOKEN", "Unknown player token")
}

fn joined(player: &Player) -> ServerMessage {
    ServerMessage::PlayerJoined {
        player_id: player.id.clone(),
        token: player.token.clone(),
        display_name: player.display_name.clone(),
    }
}

/// Route the player's messages to this connection and catch up on the session
async fn attach(state: &Arc<AppState>, conn: &Connection, player: &Player) {
    state
        .broadcaster
        .attach_player(&player.id, conn.outbox.clone())
        .await;
    if let Err(e) = state.rejoin_session(player).await {
        tracing::warn!("Player {} could not rejoin the session: {}", player.id, e);
    }
}

pub async fn handle_join_player(
    state: &Arc<AppState>,
    conn: &Connection,
    display_name: Option<String>,
) -> Option<ServerMessage> {
    let player = state.create_player(display_name).await;
    attach(state, conn, &player).await;
    broadcast_player_list_to_admin(state).await;
    Some(joined(&player))
}

pub async fn handle_reconnect(
    state: &Arc<AppState>,
    conn: &Connection,
    player_token: String,
) -> Option<ServerMessage> {
    let Some(player) = state.get_player_by_token(&player_token).await else {
        return Some(invalid_token());
    };
    tracing::info!("Player {} reconnected", player.display_name);
    attach(state, conn, &player).await;
    Some(joined(&player))
}

pub async fn handle_submit_input(
    state: &Arc<AppState>,
    player_token: String,
    question_index: usize,
    input: PlayerInput,
) -> Option<ServerMessage> {
    let Some(player) = state.get_player_by_token(&player_token).await else {
        return Some(invalid_token());
    };

    // Progress and the next question arrive through the player's connection
    match state
        .dispatch_session(SessionEvent::Input {
            player: player.id,
            question_index,
            input,
        })
        .await
    {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!("Input from {} rejected: {}", player.display_name, e);
            Some(e.into())
        }
    }
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    player_token: String,
    question_id: QuestionId,
    text: String,
) -> Option<ServerMessage> {
    let Some(player) = state.get_player_by_token(&player_token).await else {
        return Some(invalid_token());
    };

    match state.submit_board_answer(&player, question_id, text).await {
        Ok((_, verdict)) => {
            let count = state.store.submissions_for(question_id).await.len();
            state
                .broadcaster
                .emit(
                    Target::Admin,
                    ServerMessage::SubmissionReceived {
                        question_id,
                        player_id: player.id.clone(),
                        display_name: player.display_name.clone(),
                        count,
                    },
                )
                .await;
            if let Err(e) = state.persist_content().await {
                tracing::error!("Failed to save content: {}", e);
            }
            Some(ServerMessage::AnswerResult {
                question_id,
                verdict,
            })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_request_state(
    state: &Arc<AppState>,
    player_token: Option<String>,
) -> Option<ServerMessage> {
    let player_id = match player_token {
        Some(token) => match state.get_player_by_token(&token).await {
            Some(player) => Some(player.id),
            None => return Some(invalid_token()),
        },
        None => None,
    };

    let session = state.session.read().await;
    match session.as_ref() {
        Some(session) => Some(ServerMessage::SessionState {
            snapshot: session.snapshot(player_id.as_ref()),
        }),
        None => Some(ServerMessage::error("NO_SESSION", "No game session")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewExpectedAnswer, NewQuestion};
    use crate::types::{InputType, Role};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_reconnect_with_unknown_token() {
        let state = Arc::new(AppState::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(Role::Player, tx);
        let result = handle_reconnect(&state, &conn, "ZZZZZ".to_string()).await;
        assert!(matches!(
            result,
            Some(ServerMessage::Error { ref code, .. }) if code == "INVALID_PLAYER_TOKEN"
        ));
    }

    #[tokio::test]
    async fn test_board_answer_notifies_admin() {
        let state = Arc::new(AppState::new());
        let question = state
            .store
            .insert_question(NewQuestion {
                text: "Largest planet?".to_string(),
                ..Default::default()
            })
            .await;
        state
            .store
            .add_expected_answer(NewExpectedAnswer {
                question_id: question.id,
                input_type: InputType::Normal,
                hint: "Planet".to_string(),
                answer_raw: "Jupiter".to_string(),
                is_primary: true,
                rank: None,
            })
            .await
            .unwrap();
        let player = state.create_player(Some("Alice".to_string())).await;
        let mut admin = state.broadcaster.subscribe(Role::Admin).await;

        let result = handle_submit_answer(
            &state,
            player.token.clone(),
            question.id,
            "jupiter".to_string(),
        )
        .await;
        match result {
            Some(ServerMessage::AnswerResult { verdict, .. }) => assert!(verdict.is_correct),
            other => panic!("Expected answer result, got {:?}", other),
        }
        match admin.try_recv().unwrap() {
            ServerMessage::SubmissionReceived { count, .. } => assert_eq!(count, 1),
            other => panic!("Expected submission notice, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_state_without_session() {
        let state = Arc::new(AppState::new());
        let result = handle_request_state(&state, None).await;
        assert!(matches!(
            result,
            Some(ServerMessage::Error { ref code, .. }) if code == "NO_SESSION"
        ));
    }
}
