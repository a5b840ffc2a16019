use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{NewPantryItem, PantryItemView, QuantityUpdate, ScanSuggestion, SearchQuery};
use super::services;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::images::services::UploadItem;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pantry", get(list_items).post(add_item))
        .route("/pantry/search", get(search_items))
        .route("/pantry/:id", patch(update_quantity).delete(delete_item))
        .route(
            "/pantry/scan",
            post(scan).layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB
        )
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<PantryItemView>>> {
    Ok(Json(services::list_items(&state, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<NewPantryItem>,
) -> AppResult<(StatusCode, Json<PantryItemView>)> {
    let item = services::add_item(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn search_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<PantryItemView>>> {
    Ok(Json(services::search_items(&state, user_id, &q.q).await?))
}

#[instrument(skip(state))]
pub async fn update_quantity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<QuantityUpdate>,
) -> AppResult<Json<PantryItemView>> {
    Ok(Json(
        services::update_quantity(&state, user_id, id, body.quantity).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_item(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /pantry/scan (multipart)
/// Field: file (single image)
#[instrument(skip(state, mp))]
pub async fn scan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<Vec<ScanSuggestion>>> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("multipart: {}", e)))?
    {
        if matches!(field.name(), Some("file") | Some("image")) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("multipart: {}", e)))?;
            let suggestions = services::scan(
                &state,
                user_id,
                UploadItem { body, content_type: &content_type },
            )
            .await?;
            return Ok(Json(suggestions));
        }
    }
    Err(AppError::validation("file is required"))
}
