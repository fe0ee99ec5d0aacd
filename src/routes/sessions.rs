use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::engine::session::{AnswerSubmission, RevealRequest};
use crate::response::{created, ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/:id/next", get(next_activity))
        .route("/:id/answer", post(submit_answer))
        .route("/:id/reveal", post(reveal_answer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    course_id: String,
    deck_ids: Vec<String>,
}

async fn start_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<StartSessionRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let started = state
        .engine()
        .start_session(&auth.user_id, &body.course_id, &body.deck_ids)
        .await?;
    Ok(created(started))
}

async fn next_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let activity = state
        .engine()
        .next_activity(&session_id, &auth.user_id)
        .await?;
    Ok(ok(activity))
}

async fn submit_answer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<AnswerSubmission>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let outcome = state
        .engine()
        .submit_answer(&session_id, &auth.user_id, body)
        .await?;
    Ok(ok(outcome))
}

async fn reveal_answer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<RevealRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let outcome = state
        .engine()
        .reveal_answer(&session_id, &auth.user_id, body)
        .await?;
    Ok(ok(outcome))
}
