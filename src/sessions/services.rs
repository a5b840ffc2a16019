use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{
    CompleteRequest, CompletionOutcome, CookingStory, DecisionOutcome, PhotoUploaded, PhotoView,
    QuestionOutcome, SessionView, ShareOutcome,
};
use super::repo_types::{CookingSession, Decision, SessionPhoto, SessionStatus, VoiceInteraction};
use crate::error::{AppError, AppResult};
use crate::generation::{CookingAnswer, QuestionRequest, RecomposeRequest, StoryRequest};
use crate::images::services::{presign_key, store_image, UploadItem};
use crate::recipes::repo_types::BaseRecipe;
use crate::state::AppState;

const FALLBACK_ANSWER: &str =
    "The cooking assistant is not reachable right now. Keep going with the current step and ask again in a moment.";

/// Load a session owned by `user_id`. Other users' sessions are reported as missing.
async fn load(state: &AppState, user_id: Uuid, id: Uuid) -> AppResult<CookingSession> {
    match state.sessions.get(id).await? {
        Some(s) if s.user_id == user_id => Ok(s),
        _ => Err(AppError::not_found(format!("session {}", id))),
    }
}

async fn load_recipe(state: &AppState, id: Uuid) -> AppResult<BaseRecipe> {
    state
        .recipes
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("recipe {}", id)))
}

fn require_in_progress(session: &CookingSession, action: &str) -> AppResult<()> {
    if !session.is_in_progress() {
        return Err(AppError::conflict(format!(
            "cannot {} session {}: it is {}",
            action,
            session.id,
            session.status.as_str()
        )));
    }
    Ok(())
}

/// Persist `next` over the stored copy it was derived from.
async fn save(state: &AppState, mut next: CookingSession, now: OffsetDateTime) -> AppResult<CookingSession> {
    let expected = next.version;
    next.version += 1;
    next.last_updated = now;
    if !state.sessions.update(&next, expected).await? {
        return Err(AppError::conflict(format!(
            "session {} was modified concurrently",
            next.id
        )));
    }
    Ok(next)
}

async fn to_view(state: &AppState, session: CookingSession) -> AppResult<SessionView> {
    let mut photos = Vec::with_capacity(session.session_photos.len());
    for photo in &session.session_photos {
        let url = presign_key(state.storage.as_ref(), &photo.storage_key, state.config.media.url_ttl_secs).await?;
        photos.push(PhotoView { photo: photo.clone(), url });
    }
    Ok(SessionView { session, photos })
}

pub async fn start_session(state: &AppState, user_id: Uuid, base_recipe_id: Uuid) -> AppResult<SessionView> {
    let recipe = load_recipe(state, base_recipe_id).await?;
    let session = CookingSession::start(user_id, &recipe, OffsetDateTime::now_utc());
    state.sessions.insert(&session).await?;
    info!(%user_id, session_id = %session.id, recipe_id = %recipe.id, "cooking session started");
    to_view(state, session).await
}

pub async fn get_session(state: &AppState, user_id: Uuid, id: Uuid) -> AppResult<SessionView> {
    let session = load(state, user_id, id).await?;
    to_view(state, session).await
}

pub async fn list_sessions_for_user(state: &AppState, user_id: Uuid) -> AppResult<Vec<SessionView>> {
    let sessions = state.sessions.list_for_user(user_id).await?;
    let mut out = Vec::with_capacity(sessions.len());
    for s in sessions {
        out.push(to_view(state, s).await?);
    }
    Ok(out)
}

/// Apply one branch choice. The decision entry and the recomposed recipe are
/// written together; if recomposition fails nothing is stored.
pub async fn record_decision(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    branch_step: u32,
    choice: &str,
) -> AppResult<DecisionOutcome> {
    let _guard = state.session_locks.acquire(session_id).await;

    let session = load(state, user_id, session_id).await?;
    require_in_progress(&session, "record a decision on")?;
    let recipe = load_recipe(state, session.base_recipe_id).await?;

    let branch = recipe.branch_at(branch_step).ok_or_else(|| {
        AppError::not_found(format!("branch point at step {} of recipe {}", branch_step, recipe.id))
    })?;
    let option = branch.option(choice).ok_or_else(|| {
        AppError::validation(format!(
            "'{}' is not an option at step {} (expected one of: {})",
            choice,
            branch_step,
            branch.choice_keys()
        ))
    })?;

    let req = RecomposeRequest {
        ingredients: session.final_ingredients.clone(),
        steps: session.final_steps.clone(),
        question: branch.question.clone(),
        choice: option.choice.clone(),
        choice_description: Some(option.description.clone()).filter(|d| !d.is_empty()),
    };
    let recomposed = state
        .generator
        .recompose(&req)
        .await
        .map_err(|e| AppError::from_generation("recompose", e))?;

    let now = OffsetDateTime::now_utc();
    let mut next = session.clone();
    next.decisions_made.push(Decision {
        branch_point: branch_step,
        choice: choice.to_string(),
        timestamp: now,
    });
    next.replace_derived(recomposed);
    let saved = save(state, next, now).await?;

    info!(
        %session_id,
        branch_step,
        choice,
        decisions = saved.decisions_made.len(),
        "decision applied"
    );
    let next_branch_points = recipe.upcoming_branch_points(saved.current_step + 1);
    Ok(DecisionOutcome {
        session: to_view(state, saved).await?,
        next_branch_points,
    })
}

/// Answer an in-session question. The answer is advisory and never changes the
/// recipe. When the assistant is unreachable a stock answer is returned and
/// nothing is recorded.
pub async fn record_voice_question(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    question: &str,
) -> AppResult<QuestionOutcome> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::validation("question is required"));
    }
    let _guard = state.session_locks.acquire(session_id).await;
    let session = load(state, user_id, session_id).await?;

    let req = QuestionRequest {
        ingredients: session.final_ingredients.clone(),
        steps: session.final_steps.clone(),
        current_step: session.current_step,
        question: question.to_string(),
    };
    let answer = match state.generator.answer_question(&req).await {
        Ok(a) => a,
        Err(e) if e.is_transient() => {
            warn!(%session_id, error = %e, "cooking assistant unavailable, using fallback answer");
            return Ok(QuestionOutcome {
                answer: CookingAnswer {
                    answer: FALLBACK_ANSWER.into(),
                    creates_branch: false,
                    suggested_modification: None,
                },
                recorded: false,
            });
        }
        Err(e) => return Err(AppError::from_generation("cooking question", e)),
    };

    let now = OffsetDateTime::now_utc();
    let mut next = session;
    next.voice_interactions.push(VoiceInteraction {
        timestamp: now,
        question: question.to_string(),
        answer: answer.answer.clone(),
    });
    save(state, next, now).await?;
    Ok(QuestionOutcome { answer, recorded: true })
}

pub async fn attach_photo(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    image: UploadItem<'_>,
    step_number: u32,
) -> AppResult<PhotoUploaded> {
    if image.body.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    let _guard = state.session_locks.acquire(session_id).await;
    let session = load(state, user_id, session_id).await?;

    let storage = state.storage.as_ref();
    let prefix = format!("sessions/{}/{}", user_id, session_id);
    let key = store_image(storage, &prefix, image).await?;

    let now = OffsetDateTime::now_utc();
    let mut next = session;
    next.session_photos.push(SessionPhoto {
        storage_key: key.clone(),
        step_number,
        uploaded_at: now,
    });
    if let Err(e) = save(state, next, now).await {
        if let Err(cleanup) = storage.delete_object(&key).await {
            warn!(%key, error = %cleanup, "failed to remove orphaned session photo");
        }
        return Err(e);
    }

    let url = presign_key(storage, &key, state.config.media.url_ttl_secs).await?;
    info!(%session_id, step_number, %key, "session photo attached");
    Ok(PhotoUploaded { storage_key: key, step_number, url })
}

/// Moves the cursor to any step. Range and direction are not checked.
pub async fn advance_step(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    step_number: u32,
) -> AppResult<SessionView> {
    let _guard = state.session_locks.acquire(session_id).await;
    let session = load(state, user_id, session_id).await?;
    require_in_progress(&session, "advance")?;
    if i32::try_from(step_number).is_err() {
        return Err(AppError::validation(format!("step {} is out of range", step_number)));
    }

    let mut next = session;
    next.current_step = step_number;
    let saved = save(state, next, OffsetDateTime::now_utc()).await?;
    to_view(state, saved).await
}

async fn build_story(state: &AppState, session: &CookingSession) -> AppResult<CookingStory> {
    let recipe = load_recipe(state, session.base_recipe_id).await?;
    let req = StoryRequest {
        session_id: session.id,
        recipe_name: recipe.name.clone(),
        decisions: session.decisions_made.clone(),
        voice_interactions: session.voice_interactions.clone(),
        nutrition: session.final_nutrition,
        rating: session.rating,
    };
    let (story, story_generated) = match state.generator.write_story(&req).await {
        Ok(s) => (s, true),
        Err(e) => {
            warn!(session_id = %session.id, error = %e, "story generation failed");
            (String::new(), false)
        }
    };
    Ok(CookingStory {
        title: format!("Cooking Adventure: {}", recipe.name),
        story,
        decisions_count: session.decisions_made.len(),
        photos_count: session.session_photos.len(),
        cooking_time: session.total_time_minutes,
        story_generated,
    })
}

/// Mark the session completed, then try to write its story. A failed story
/// does not undo the completion.
pub async fn complete_session(
    state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    input: CompleteRequest,
) -> AppResult<CompletionOutcome> {
    if let Some(r) = input.rating {
        if !(1..=5).contains(&r) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
    }
    let saved = {
        let _guard = state.session_locks.acquire(session_id).await;
        let session = load(state, user_id, session_id).await?;
        require_in_progress(&session, "complete")?;

        let now = OffsetDateTime::now_utc();
        let mut next = session;
        next.status = SessionStatus::Completed;
        next.completed_at = Some(now);
        next.rating = input.rating;
        next.notes = input.notes.filter(|n| !n.trim().is_empty());
        next.would_make_again = input.would_make_again;
        save(state, next, now).await?
    };
    info!(%session_id, rating = ?saved.rating, "cooking session completed");

    let story = build_story(state, &saved).await?;
    Ok(CompletionOutcome {
        session: to_view(state, saved).await?,
        story,
    })
}

/// Retry the narrative for a completed session.
pub async fn regenerate_story(state: &AppState, user_id: Uuid, session_id: Uuid) -> AppResult<CookingStory> {
    let session = load(state, user_id, session_id).await?;
    if session.status != SessionStatus::Completed {
        return Err(AppError::conflict(format!(
            "session {} has no story until it is completed",
            session_id
        )));
    }
    build_story(state, &session).await
}

pub async fn abandon_session(state: &AppState, user_id: Uuid, session_id: Uuid) -> AppResult<SessionView> {
    let _guard = state.session_locks.acquire(session_id).await;
    let session = load(state, user_id, session_id).await?;
    require_in_progress(&session, "abandon")?;

    let mut next = session;
    next.status = SessionStatus::Abandoned;
    let saved = save(state, next, OffsetDateTime::now_utc()).await?;
    info!(%session_id, "cooking session abandoned");
    to_view(state, saved).await
}

/// Publish a session link. Sharing twice returns the same URL.
pub async fn share_session(state: &AppState, user_id: Uuid, session_id: Uuid) -> AppResult<ShareOutcome> {
    let _guard = state.session_locks.acquire(session_id).await;
    let session = load(state, user_id, session_id).await?;
    if let (true, Some(url)) = (session.shared, &session.share_url) {
        return Ok(ShareOutcome { share_url: url.clone() });
    }

    let share_url = format!(
        "{}/shared/sessions/{}",
        state.config.public_base_url.trim_end_matches('/'),
        session_id
    );
    let mut next = session;
    next.shared = true;
    next.share_url = Some(share_url.clone());
    save(state, next, OffsetDateTime::now_utc()).await?;
    Ok(ShareOutcome { share_url })
}
