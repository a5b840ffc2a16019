use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CompleteRequest, CompletionOutcome, CookingStory, DecisionOutcome, DecisionRequest,
    PhotoUploaded, QuestionBody, QuestionOutcome, SessionView, ShareOutcome, StartSessionRequest,
    StepUpdate,
};
use super::services;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::images::services::UploadItem;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(start_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/decisions", post(record_decision))
        .route("/sessions/:id/questions", post(ask_question))
        .route(
            "/sessions/:id/photos",
            post(attach_photo).layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB
        )
        .route("/sessions/:id/step", put(advance_step))
        .route("/sessions/:id/complete", post(complete_session))
        .route("/sessions/:id/story", post(regenerate_story))
        .route("/sessions/:id/abandon", post(abandon_session))
        .route("/sessions/:id/share", post(share_session))
}

#[instrument(skip(state))]
pub async fn start_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    let view = services::start_session(&state, user_id, body.base_recipe_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<SessionView>>> {
    Ok(Json(services::list_sessions_for_user(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    Ok(Json(services::get_session(&state, user_id, id).await?))
}

#[instrument(skip(state, body))]
pub async fn record_decision(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> AppResult<Json<DecisionOutcome>> {
    Ok(Json(
        services::record_decision(&state, user_id, id, body.branch_point, &body.choice).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn ask_question(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<QuestionBody>,
) -> AppResult<Json<QuestionOutcome>> {
    Ok(Json(
        services::record_voice_question(&state, user_id, id, &body.question).await?,
    ))
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("multipart: {}", e))
}

/// POST /sessions/:id/photos (multipart)
/// Fields: file (single image), step (step number)
#[instrument(skip(state, mp))]
pub async fn attach_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> AppResult<(StatusCode, Json<PhotoUploaded>)> {
    let mut file: Option<(Bytes, String)> = None;
    let mut step: Option<u32> = None;

    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") | Some("image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(multipart_error)?;
                file = Some((body, content_type));
            }
            Some("step") | Some("step_number") => {
                let text = field.text().await.map_err(multipart_error)?;
                step = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::validation("step must be a positive integer"))?,
                );
            }
            _ => {}
        }
    }

    let (body, content_type) = file.ok_or_else(|| AppError::validation("file is required"))?;
    let step = step.ok_or_else(|| AppError::validation("step is required"))?;
    let uploaded = services::attach_photo(
        &state,
        user_id,
        id,
        UploadItem { body, content_type: &content_type },
        step,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(uploaded)))
}

#[instrument(skip(state))]
pub async fn advance_step(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StepUpdate>,
) -> AppResult<Json<SessionView>> {
    Ok(Json(
        services::advance_step(&state, user_id, id, body.step_number).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn complete_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteRequest>>,
) -> AppResult<Json<CompletionOutcome>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(services::complete_session(&state, user_id, id, input).await?))
}

#[instrument(skip(state))]
pub async fn regenerate_story(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CookingStory>> {
    Ok(Json(services::regenerate_story(&state, user_id, id).await?))
}

#[instrument(skip(state))]
pub async fn abandon_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    Ok(Json(services::abandon_session(&state, user_id, id).await?))
}

#[instrument(skip(state))]
pub async fn share_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ShareOutcome>> {
    Ok(Json(services::share_session(&state, user_id, id).await?))
}
