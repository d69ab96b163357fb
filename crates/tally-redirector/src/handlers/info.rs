use crate::model::InfoResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;

/// Always answers 200; store failures show up as sentinel values.
pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse::from(state.stats().report().await))
}
