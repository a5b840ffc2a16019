use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::generation::RecomposedRecipe;
use crate::recipes::repo_types::{non_negative, BaseRecipe, Ingredient, RecipeNutrition, RecipeStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(anyhow!("unknown session status '{}'", other)),
        }
    }
}

/// One applied branch choice. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub branch_point: u32,
    pub choice: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInteraction {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPhoto {
    pub storage_key: String,
    pub step_number: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// A single cooking attempt of a base recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub base_recipe_id: Uuid,
    pub status: SessionStatus,
    pub decisions_made: Vec<Decision>,
    pub current_step: u32,

    pub final_ingredients: Vec<Ingredient>,
    pub final_steps: Vec<RecipeStep>,
    pub final_nutrition: RecipeNutrition,
    pub final_cost: f64,
    pub total_time_minutes: u32,

    pub session_photos: Vec<SessionPhoto>,
    pub voice_interactions: Vec<VoiceInteraction>,

    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub would_make_again: Option<bool>,
    pub shared: bool,
    pub share_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    /// Bumped on every persisted change.
    pub version: i64,
}

impl CookingSession {
    /// Fresh session whose derived state is a copy of the recipe's base fields.
    pub fn start(user_id: Uuid, recipe: &BaseRecipe, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            base_recipe_id: recipe.id,
            status: SessionStatus::InProgress,
            decisions_made: Vec::new(),
            current_step: 1,
            final_ingredients: recipe.base_ingredients.clone(),
            final_steps: recipe.base_steps.clone(),
            final_nutrition: recipe.base_nutrition,
            final_cost: recipe.base_cost_estimate,
            total_time_minutes: recipe.total_time_minutes(),
            session_photos: Vec::new(),
            voice_interactions: Vec::new(),
            started_at: now,
            completed_at: None,
            rating: None,
            notes: None,
            would_make_again: None,
            shared: false,
            share_url: None,
            last_updated: now,
            version: 0,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// Replace the whole derived state. Nothing is merged.
    pub fn replace_derived(&mut self, r: RecomposedRecipe) {
        self.final_ingredients = r.ingredients;
        self.final_steps = r.steps;
        self.final_nutrition = r.nutrition;
        self.final_cost = r.cost;
        self.total_time_minutes = r.total_time_minutes;
    }
}

#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub base_recipe_id: Uuid,
    pub status: String,
    pub decisions_made: Json<Vec<Decision>>,
    pub current_step: i32,
    pub final_ingredients: Json<Vec<Ingredient>>,
    pub final_steps: Json<Vec<RecipeStep>>,
    pub final_nutrition: Json<RecipeNutrition>,
    pub final_cost: f64,
    pub total_time_minutes: i32,
    pub session_photos: Json<Vec<SessionPhoto>>,
    pub voice_interactions: Json<Vec<VoiceInteraction>>,
    pub started_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
    pub would_make_again: Option<bool>,
    pub shared: bool,
    pub share_url: Option<String>,
    pub last_updated: OffsetDateTime,
    pub version: i64,
}

impl TryFrom<SessionRow> for CookingSession {
    type Error = anyhow::Error;

    fn try_from(r: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            base_recipe_id: r.base_recipe_id,
            status: SessionStatus::parse(&r.status)?,
            decisions_made: r.decisions_made.0,
            current_step: non_negative(r.current_step),
            final_ingredients: r.final_ingredients.0,
            final_steps: r.final_steps.0,
            final_nutrition: r.final_nutrition.0,
            final_cost: r.final_cost,
            total_time_minutes: non_negative(r.total_time_minutes),
            session_photos: r.session_photos.0,
            voice_interactions: r.voice_interactions.0,
            started_at: r.started_at,
            completed_at: r.completed_at,
            rating: r.rating.and_then(|v| u8::try_from(v).ok()),
            notes: r.notes,
            would_make_again: r.would_make_again,
            shared: r.shared,
            share_url: r.share_url,
            last_updated: r.last_updated,
            version: r.version,
        })
    }
}
