use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{CookingSession, SessionPhoto};
use crate::generation::CookingAnswer;
use crate::recipes::repo_types::BranchPoint;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub base_recipe_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub branch_point: u32,
    pub choice: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct StepUpdate {
    pub step_number: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub would_make_again: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PhotoView {
    #[serde(flatten)]
    pub photo: SessionPhoto,
    pub url: String,
}

/// Session as returned to clients; photo URLs are signed per read.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: CookingSession,
    pub photos: Vec<PhotoView>,
}

#[derive(Debug, Serialize)]
pub struct DecisionOutcome {
    pub session: SessionView,
    pub next_branch_points: Vec<BranchPoint>,
}

#[derive(Debug, Serialize)]
pub struct QuestionOutcome {
    #[serde(flatten)]
    pub answer: CookingAnswer,
    /// False when the assistant could not be reached and a stock answer was used.
    pub recorded: bool,
}

#[derive(Debug, Serialize)]
pub struct PhotoUploaded {
    pub storage_key: String,
    pub step_number: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CookingStory {
    pub title: String,
    pub story: String,
    pub decisions_count: usize,
    pub photos_count: usize,
    pub cooking_time: u32,
    /// False when the narrative could not be generated; retry via the story endpoint.
    pub story_generated: bool,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub session: SessionView,
    pub story: CookingStory,
}

#[derive(Debug, Serialize)]
pub struct ShareOutcome {
    pub share_url: String,
}
