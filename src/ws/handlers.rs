//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Authorization is checked here, then dispatched to role-specific handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{admin, player, Connection};

/// Macro to check admin authorization and return early if unauthorized
macro_rules! check_admin {
    ($conn:expr, $action:expr) => {
        if $conn.role != Role::Admin {
            return Some(ServerMessage::error(
                "UNAUTHORIZED",
                format!("Only the admin can {}", $action),
            ));
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Player messages
        ClientMessage::JoinPlayer { display_name } => {
            player::handle_join_player(state, conn, display_name).await
        }

        ClientMessage::Reconnect { player_token } => {
            player::handle_reconnect(state, conn, player_token).await
        }

        ClientMessage::SubmitInput {
            player_token,
            question_index,
            input,
        } => player::handle_submit_input(state, player_token, question_index, input).await,

        ClientMessage::SubmitAnswer {
            player_token,
            question_id,
            text,
        } => player::handle_submit_answer(state, player_token, question_id, text).await,

        ClientMessage::RequestState { player_token } => {
            player::handle_request_state(state, player_token).await
        }

        // Admin-only commands (authorization checked before dispatch)
        ClientMessage::AdminStartGame { setup } => {
            check_admin!(conn, "start games");
            admin::handle_start_game(state, setup).await
        }

        ClientMessage::AdminStartCountdown => {
            check_admin!(conn, "start the countdown");
            admin::handle_start_countdown(state).await
        }

        ClientMessage::AdminEndGame => {
            check_admin!(conn, "end games");
            admin::handle_end_game(state).await
        }

        ClientMessage::AdminEvaluateQuestion { question_id } => {
            check_admin!(conn, "evaluate questions");
            admin::handle_evaluate_question(state, question_id).await
        }

        ClientMessage::AdminAddQuestion {
            text,
            legacy_answer,
            category,
        } => {
            check_admin!(conn, "add questions");
            admin::handle_add_question(state, text, legacy_answer, category).await
        }

        ClientMessage::AdminAddExpectedAnswer {
            question_id,
            answer_raw,
            input_type,
            hint,
            is_primary,
            rank,
        } => {
            check_admin!(conn, "add expected answers");
            admin::handle_add_expected_answer(
                state,
                crate::store::NewExpectedAnswer {
                    question_id,
                    input_type,
                    hint: hint.unwrap_or_else(|| crate::migrate::DEFAULT_HINT.to_string()),
                    answer_raw,
                    is_primary,
                    rank,
                },
            )
            .await
        }

        ClientMessage::AdminListPlayers => {
            check_admin!(conn, "list players");
            admin::handle_list_players(state).await
        }
    }
}
