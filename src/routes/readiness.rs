use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exam/:exam_id", get(exam_readiness))
        .route("/decks", get(deck_readiness))
        .route("/weak", get(weak_flashcards))
}

async fn exam_readiness(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record = state.engine().exam_readiness(&auth.user_id, &exam_id).await?;
    Ok(ok(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckReadinessQuery {
    course_id: String,
    /// Comma-separated deck ids.
    deck_ids: String,
    #[serde(default)]
    force_refresh: bool,
}

async fn deck_readiness(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeckReadinessQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let deck_ids: Vec<String> = query
        .deck_ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if deck_ids.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_SCOPE",
            "deckIds must name at least one deck",
        ));
    }

    let record = state
        .engine()
        .deck_readiness(&auth.user_id, &query.course_id, &deck_ids, query.force_refresh)
        .await?;
    Ok(ok(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeakQuery {
    course_id: Option<String>,
}

async fn weak_flashcards(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<WeakQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let weak = state
        .engine()
        .weak_flashcards(&auth.user_id, query.course_id.as_deref())
        .await?;
    Ok(ok(weak))
}
