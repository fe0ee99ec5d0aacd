use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::engine::selector;
use crate::engine::session::QuestionView;
use crate::response::{ok, AppError};
use crate::state::AppState;

const MAX_QUIZ_SIZE: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(build_quiz))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRequest {
    course_id: String,
    deck_ids: Vec<String>,
    size: usize,
}

async fn build_quiz(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<QuizRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if body.deck_ids.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_SCOPE",
            "deckIds must not be empty",
        ));
    }
    if body.size == 0 || body.size > MAX_QUIZ_SIZE {
        return Err(AppError::bad_request(
            "INVALID_SIZE",
            "size must be between 1 and 100",
        ));
    }

    let config = state.engine().get_config().await;
    let questions = selector::build_quiz(
        state.store(),
        &config.selector,
        &auth.user_id,
        &body.course_id,
        &body.deck_ids,
        body.size,
    )?;
    let views: Vec<QuestionView> = questions.into_iter().map(QuestionView::from).collect();
    Ok(ok(views))
}
