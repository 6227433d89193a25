//! HTTP API endpoints for content management.
//!
//! Used by the admin UI to inspect answers and to export/import the content store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::answer::{resolve, ResolvedAnswers};
use crate::error::StoreError;
use crate::state::AppState;
use crate::store::ContentSnapshot;
use crate::types::{ExpectedAnswer, Question, QuestionId};

/// A question with its stored and resolved answers
#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnswers {
    pub question: Question,
    pub expected_answers: Vec<ExpectedAnswer>,
    pub resolved: ResolvedAnswers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub question_id: QuestionId,
    pub answer: String,
}

fn store_error_response(e: StoreError) -> Response {
    let status = match e {
        StoreError::QuestionNotFound(_) | StoreError::ExpectedAnswerNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        StoreError::Json(_) | StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string()).into_response()
}

/// GET /api/questions/{id}/answers
pub async fn question_answers(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<QuestionId>,
) -> Response {
    match state.store.question_with_answers(question_id).await {
        Some((question, expected_answers)) => {
            let resolved = resolve(&question, &expected_answers);
            Json(QuestionAnswers {
                question,
                expected_answers,
                resolved,
            })
            .into_response()
        }
        None => store_error_response(StoreError::QuestionNotFound(question_id)),
    }
}

/// Evaluate an answer without recording it.
///
/// POST /api/evaluate
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Response {
    match state.evaluate_answer(req.question_id, &req.answer).await {
        Ok(verdict) => Json(verdict).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Export the content store as JSON.
///
/// GET /api/content/export
pub async fn export_content(State(state): State<Arc<AppState>>) -> Json<ContentSnapshot> {
    Json(state.store.snapshot().await)
}

/// Import a content snapshot.
///
/// POST /api/content/import
///
/// Replaces all questions, expected answers and submissions, then saves them.
pub async fn import_content(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<ContentSnapshot>,
) -> Response {
    if let Err(e) = state.store.restore(snapshot).await {
        tracing::error!("Content import failed: {}", e);
        return store_error_response(e);
    }
    if let Err(e) = state.persist_content().await {
        tracing::error!("Imported content could not be saved: {}", e);
        return store_error_response(e);
    }
    (StatusCode::OK, "Content imported successfully").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewExpectedAnswer, NewQuestion};
    use crate::types::InputType;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn state_with_question() -> (Arc<AppState>, QuestionId) {
        let state = Arc::new(AppState::new());
        let question = state
            .store
            .insert_question(NewQuestion {
                text: "Capital of France?".to_string(),
                legacy_answer: "Paris".to_string(),
                ..Default::default()
            })
            .await;
        state
            .store
            .add_expected_answer(NewExpectedAnswer {
                question_id: question.id,
                input_type: InputType::Normal,
                hint: "City".to_string(),
                answer_raw: "Paris".to_string(),
                is_primary: true,
                rank: None,
            })
            .await
            .unwrap();
        (state, question.id)
    }

    #[tokio::test]
    async fn test_question_answers() {
        let (state, id) = state_with_question().await;
        let response = question_answers(State(state), Path(id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["expected_answers"][0]["answer_normalized"], "paris");
        assert_eq!(json["resolved"]["reference"], 0);
    }

    #[tokio::test]
    async fn test_question_answers_missing() {
        let state = Arc::new(AppState::new());
        let response = question_answers(State(state), Path(99)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_is_stateless() {
        let (state, id) = state_with_question().await;
        let response = evaluate(
            State(state.clone()),
            Json(EvaluateRequest {
                question_id: id,
                answer: "  PARIS ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["is_correct"], true);
        assert!(state.store.submissions_for(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let (source, _) = state_with_question().await;
        let Json(snapshot) = export_content(State(source)).await;

        let target = Arc::new(AppState::new());
        let response = import_content(State(target.clone()), Json(snapshot)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(target.store.list_questions().await.len(), 1);
        assert_eq!(target.store.total_expected_answers().await, 1);
    }

    #[tokio::test]
    async fn test_import_rejects_future_schema() {
        let state = Arc::new(AppState::new());
        let mut snapshot = ContentSnapshot::new(vec![], vec![], vec![]);
        snapshot.schema_version = 99;
        let response = import_content(State(state), Json(snapshot)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
