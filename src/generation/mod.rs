//! Boundary to the external structured-generation capability.
//!
//! `GenerationAdapter` is what the services depend on. `LlmGenerator` implements
//! it over any `LlmProvider`, which only knows how to send a chat request and
//! hand back raw text. All decoding and validation happens in the generator, so
//! a provider can never push unchecked output into the domain.

#[cfg(test)]
pub mod fake;
mod generator;
mod openrouter;
pub mod provider;
mod schema;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use generator::LlmGenerator;
pub use openrouter::OpenRouterProvider;
pub use types::{
    CookingAnswer, NutritionEstimate, PantryScanItem, QuestionRequest, RecipeDraft,
    RecipeGenerationRequest, RecomposeRequest, RecomposedRecipe, StoryRequest,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Unavailable(String),

    #[error("generation request timed out")]
    Timeout,

    #[error("generation output violated its schema: {0}")]
    Format(String),
}

impl GenerationError {
    /// Transient failures that an idempotent caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Rewrite the whole recipe state for a branch decision.
    async fn recompose(&self, req: &RecomposeRequest) -> Result<RecomposedRecipe, GenerationError>;

    async fn estimate_nutrition(
        &self,
        ingredient: &str,
        serving_size: &str,
    ) -> Result<NutritionEstimate, GenerationError>;

    async fn scan_pantry(&self, image_url: &str) -> Result<Vec<PantryScanItem>, GenerationError>;

    async fn answer_question(&self, req: &QuestionRequest) -> Result<CookingAnswer, GenerationError>;

    /// Free-form narrative of a finished session.
    async fn write_story(&self, req: &StoryRequest) -> Result<String, GenerationError>;

    async fn generate_recipe(
        &self,
        req: &RecipeGenerationRequest,
    ) -> Result<RecipeDraft, GenerationError>;
}
