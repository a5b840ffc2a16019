use serde::{Deserialize, Serialize};

use super::repo_types::{BranchPoint, Ingredient, RecipeStep};
use crate::generation::RecipeDraft;

fn default_servings() -> u32 {
    1
}

/// Authored recipe definition. Generated drafts come back in this shape so a
/// client can submit them unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub difficulty_level: String,
    #[serde(default)]
    pub prep_time_minutes: u32,
    #[serde(default)]
    pub cook_time_minutes: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    #[serde(default)]
    pub branch_points: Vec<BranchPoint>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl From<RecipeDraft> for NewRecipe {
    fn from(d: RecipeDraft) -> Self {
        Self {
            name: d.name,
            description: d.description,
            cuisine_type: d.cuisine_type,
            difficulty_level: d.difficulty_level,
            prep_time_minutes: d.prep_time_minutes,
            cook_time_minutes: d.cook_time_minutes,
            servings: d.servings,
            ingredients: d.ingredients,
            steps: d.steps,
            branch_points: d.branch_points,
            dietary_tags: d.dietary_tags,
            image_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRecipeRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}
