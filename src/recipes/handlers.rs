use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{GenerateRecipeRequest, NewRecipe};
use super::repo_types::BaseRecipe;
use super::services;
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/generate", post(generate_recipe))
        .route("/recipes/:id", get(get_recipe))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<NewRecipe>,
) -> AppResult<(StatusCode, HeaderMap, Json<BaseRecipe>)> {
    let recipe = services::create_base_recipe(&state, body, &user_id.to_string()).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/recipes/{}", recipe.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(recipe)))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BaseRecipe>> {
    Ok(Json(services::get_recipe(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn generate_recipe(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(body): Json<GenerateRecipeRequest>,
) -> AppResult<Json<NewRecipe>> {
    let draft = services::generate_from_ingredients(
        &state,
        body.ingredients,
        body.cuisine,
        body.dietary_restrictions,
    )
    .await?;
    Ok(Json(draft))
}
