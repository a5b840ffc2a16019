use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{RecommendQuery, Recommendation};
use super::services;
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/recommendations", get(recommend))
}

#[instrument(skip(state))]
pub async fn recommend(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RecommendQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    Ok(Json(
        services::recommend(&state, user_id, &q.restrictions()).await?,
    ))
}
