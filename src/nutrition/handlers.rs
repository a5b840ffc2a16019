use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    AggregateRequest, BulkUpsertResponse, Compatibility, CompatibilityRequest, CostUpdate,
    EstimateRequest, NutritionInput, SearchQuery,
};
use super::repo_types::{NutritionData, NutritionTotals};
use super::services;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::generation::NutritionEstimate;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nutrition", get(search).post(add))
        .route("/nutrition/bulk", post(bulk_upsert))
        .route("/nutrition/aggregate", post(aggregate))
        .route("/nutrition/estimate", post(estimate))
        .route("/nutrition/compatibility", post(compatibility))
        .route("/nutrition/category/:category", get(by_category))
        .route("/nutrition/:name", get(get_one))
        .route("/nutrition/:name/cost", put(update_cost))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<NutritionData>>> {
    Ok(Json(services::search(state.nutrition.as_ref(), &q.q).await?))
}

#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<NutritionData>> {
    services::get(state.nutrition.as_ref(), &name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("nutrition data for '{}'", name)))
}

#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<NutritionData>>> {
    Ok(Json(services::by_category(state.nutrition.as_ref(), &category).await?))
}

#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(body): Json<NutritionInput>,
) -> AppResult<(StatusCode, Json<NutritionData>)> {
    let record = services::add(state.nutrition.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, body))]
pub async fn bulk_upsert(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(body): Json<Vec<NutritionInput>>,
) -> AppResult<Json<BulkUpsertResponse>> {
    let upserted = services::bulk_upsert(state.nutrition.as_ref(), body).await?;
    Ok(Json(BulkUpsertResponse { upserted }))
}

#[instrument(skip(state))]
pub async fn update_cost(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(name): Path<String>,
    Json(body): Json<CostUpdate>,
) -> AppResult<Json<NutritionData>> {
    Ok(Json(
        services::update_cost(state.nutrition.as_ref(), &name, body.cost_per_serving).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn aggregate(
    State(state): State<AppState>,
    Json(body): Json<AggregateRequest>,
) -> AppResult<Json<NutritionTotals>> {
    Ok(Json(
        services::aggregate(state.nutrition.as_ref(), &body.ingredients).await?,
    ))
}

#[instrument(skip(state))]
pub async fn estimate(
    State(state): State<AppState>,
    Json(body): Json<EstimateRequest>,
) -> AppResult<Json<NutritionEstimate>> {
    Ok(Json(
        services::estimate(&state, &body.ingredient_name, &body.serving_size).await?,
    ))
}

#[instrument(skip(state))]
pub async fn compatibility(
    State(state): State<AppState>,
    Json(body): Json<CompatibilityRequest>,
) -> AppResult<Json<Compatibility>> {
    Ok(Json(
        services::dietary_compatibility(
            state.nutrition.as_ref(),
            &body.ingredients,
            &body.dietary_restrictions,
        )
        .await?,
    ))
}
