//! Typed inputs/outputs of the generation adapter, plus the strict wire shapes
//! model output is decoded into before it is trusted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GenerationError;
use crate::recipes::repo_types::{BranchOption, BranchPoint, Ingredient, RecipeNutrition, RecipeStep};
use crate::sessions::repo_types::{Decision, VoiceInteraction};

// ---- requests ----

#[derive(Debug, Clone, Serialize)]
pub struct RecomposeRequest {
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    pub question: String,
    pub choice: String,
    pub choice_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest {
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    pub current_step: u32,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryRequest {
    pub session_id: Uuid,
    pub recipe_name: String,
    pub decisions: Vec<Decision>,
    pub voice_interactions: Vec<VoiceInteraction>,
    pub nutrition: RecipeNutrition,
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeGenerationRequest {
    pub ingredients: Vec<String>,
    pub cuisine: Option<String>,
    pub dietary_restrictions: Vec<String>,
}

// ---- validated outputs ----

/// Whole replacement for a session's derived state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomposedRecipe {
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    pub nutrition: RecipeNutrition,
    pub cost: f64,
    pub total_time_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub category: String,
    pub confidence: String,
}

impl NutritionEstimate {
    /// Fallback when the estimator cannot be reached.
    pub fn unknown() -> Self {
        Self {
            calories: 0.0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
            sugar_g: 0.0,
            sodium_mg: 0.0,
            category: "unknown".into(),
            confidence: "unknown".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryScanItem {
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
    pub estimated_quantity: f64,
    pub suggested_unit: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingAnswer {
    pub answer: String,
    /// Advisory only; never mutates the session.
    pub creates_branch: bool,
    pub suggested_modification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDraft {
    pub name: String,
    pub description: String,
    pub cuisine_type: String,
    pub difficulty_level: String,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
    pub branch_points: Vec<BranchPoint>,
    pub dietary_tags: Vec<String>,
}

// ---- wire shapes ----

fn finite(v: f64, field: &str) -> Result<f64, GenerationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GenerationError::Format(format!("{field} is not a finite number")))
    }
}

fn non_negative(v: f64, field: &str) -> Result<f64, GenerationError> {
    let v = finite(v, field)?;
    if v < 0.0 {
        return Err(GenerationError::Format(format!("{field} is negative")));
    }
    Ok(v)
}

/// Integral, non-negative and small enough for an INTEGER column.
fn whole(v: f64, field: &str) -> Result<u32, GenerationError> {
    let v = non_negative(v, field)?;
    if v.fract() != 0.0 || v > i32::MAX as f64 {
        return Err(GenerationError::Format(format!("{field} is not a whole number")));
    }
    Ok(v as u32)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireIngredient {
    name: String,
    quantity: f64,
    unit: String,
    required: bool,
}

impl TryFrom<WireIngredient> for Ingredient {
    type Error = GenerationError;

    fn try_from(w: WireIngredient) -> Result<Self, Self::Error> {
        if w.name.trim().is_empty() {
            return Err(GenerationError::Format("ingredient with empty name".into()));
        }
        Ok(Self {
            quantity: non_negative(w.quantity, "ingredient quantity")?,
            name: w.name,
            unit: w.unit,
            required: w.required,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireStep {
    step: f64,
    instruction: String,
    time_minutes: f64,
}

impl TryFrom<WireStep> for RecipeStep {
    type Error = GenerationError;

    fn try_from(w: WireStep) -> Result<Self, Self::Error> {
        let step = whole(w.step, "step number")?;
        if step == 0 {
            return Err(GenerationError::Format("step numbers are 1-based".into()));
        }
        Ok(Self {
            step,
            instruction: w.instruction,
            time_minutes: whole(w.time_minutes, "step time_minutes")?,
        })
    }
}

fn convert_ingredients(items: Vec<WireIngredient>) -> Result<Vec<Ingredient>, GenerationError> {
    items.into_iter().map(Ingredient::try_from).collect()
}

fn convert_steps(items: Vec<WireStep>) -> Result<Vec<RecipeStep>, GenerationError> {
    let steps: Vec<RecipeStep> = items
        .into_iter()
        .map(RecipeStep::try_from)
        .collect::<Result<_, _>>()?;
    if steps.windows(2).any(|w| w[1].step <= w[0].step) {
        return Err(GenerationError::Format("step numbers must be strictly increasing".into()));
    }
    Ok(steps)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireNutrition {
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    fiber: f64,
    sugar: f64,
    sodium: f64,
}

impl TryFrom<WireNutrition> for RecipeNutrition {
    type Error = GenerationError;

    fn try_from(w: WireNutrition) -> Result<Self, Self::Error> {
        Ok(Self {
            calories: non_negative(w.calories, "calories")?,
            protein: non_negative(w.protein, "protein")?,
            carbs: non_negative(w.carbs, "carbs")?,
            fat: non_negative(w.fat, "fat")?,
            fiber: non_negative(w.fiber, "fiber")?,
            sugar: non_negative(w.sugar, "sugar")?,
            sodium: non_negative(w.sodium, "sodium")?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireRecompose {
    ingredients: Vec<WireIngredient>,
    steps: Vec<WireStep>,
    nutrition: WireNutrition,
    cost: f64,
    total_time: f64,
}

impl TryFrom<WireRecompose> for RecomposedRecipe {
    type Error = GenerationError;

    fn try_from(w: WireRecompose) -> Result<Self, Self::Error> {
        let steps = convert_steps(w.steps)?;
        if steps.is_empty() {
            return Err(GenerationError::Format("recomposed recipe has no steps".into()));
        }
        Ok(Self {
            ingredients: convert_ingredients(w.ingredients)?,
            steps,
            nutrition: RecipeNutrition::try_from(w.nutrition)?,
            cost: non_negative(w.cost, "cost")?,
            total_time_minutes: whole(w.total_time, "total_time")?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireNutritionEstimate {
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
    fiber_g: f64,
    sugar_g: f64,
    sodium_mg: f64,
    category: String,
    confidence: String,
}

impl TryFrom<WireNutritionEstimate> for NutritionEstimate {
    type Error = GenerationError;

    fn try_from(w: WireNutritionEstimate) -> Result<Self, Self::Error> {
        Ok(Self {
            calories: non_negative(w.calories, "calories")?,
            protein_g: non_negative(w.protein_g, "protein_g")?,
            carbs_g: non_negative(w.carbs_g, "carbs_g")?,
            fat_g: non_negative(w.fat_g, "fat_g")?,
            fiber_g: non_negative(w.fiber_g, "fiber_g")?,
            sugar_g: non_negative(w.sugar_g, "sugar_g")?,
            sodium_mg: non_negative(w.sodium_mg, "sodium_mg")?,
            category: w.category,
            confidence: w.confidence,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireScanItem {
    name: String,
    brand: Option<String>,
    category: String,
    estimated_quantity: f64,
    suggested_unit: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WirePantryScan {
    items: Vec<WireScanItem>,
}

impl TryFrom<WirePantryScan> for Vec<PantryScanItem> {
    type Error = GenerationError;

    fn try_from(w: WirePantryScan) -> Result<Self, Self::Error> {
        w.items
            .into_iter()
            .map(|i| {
                let confidence = non_negative(i.confidence, "confidence")?;
                if confidence > 1.0 {
                    return Err(GenerationError::Format("confidence above 1".into()));
                }
                Ok(PantryScanItem {
                    estimated_quantity: non_negative(i.estimated_quantity, "estimated_quantity")?,
                    name: i.name,
                    brand: i.brand,
                    category: i.category,
                    suggested_unit: i.suggested_unit,
                    confidence,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireCookingAnswer {
    answer: String,
    creates_branch: bool,
    suggested_modification: Option<String>,
}

impl TryFrom<WireCookingAnswer> for CookingAnswer {
    type Error = GenerationError;

    fn try_from(w: WireCookingAnswer) -> Result<Self, Self::Error> {
        if w.answer.trim().is_empty() {
            return Err(GenerationError::Format("empty answer".into()));
        }
        Ok(Self {
            answer: w.answer,
            creates_branch: w.creates_branch,
            suggested_modification: w.suggested_modification,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireBranchOption {
    choice: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireBranchPoint {
    step: f64,
    question: String,
    options: Vec<WireBranchOption>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireRecipeDraft {
    name: String,
    description: String,
    cuisine_type: String,
    difficulty_level: String,
    prep_time_minutes: f64,
    cook_time_minutes: f64,
    servings: f64,
    ingredients: Vec<WireIngredient>,
    steps: Vec<WireStep>,
    branch_points: Vec<WireBranchPoint>,
    dietary_tags: Vec<String>,
}

impl TryFrom<WireRecipeDraft> for RecipeDraft {
    type Error = GenerationError;

    fn try_from(w: WireRecipeDraft) -> Result<Self, Self::Error> {
        let branch_points = w
            .branch_points
            .into_iter()
            .map(|bp| {
                Ok(BranchPoint {
                    step: whole(bp.step, "branch step")?,
                    question: bp.question,
                    options: bp
                        .options
                        .into_iter()
                        .map(|o| BranchOption {
                            choice: o.choice,
                            description: o.description,
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        Ok(Self {
            name: w.name,
            description: w.description,
            cuisine_type: w.cuisine_type,
            difficulty_level: w.difficulty_level,
            prep_time_minutes: whole(w.prep_time_minutes, "prep_time_minutes")?,
            cook_time_minutes: whole(w.cook_time_minutes, "cook_time_minutes")?,
            servings: whole(w.servings, "servings")?,
            ingredients: convert_ingredients(w.ingredients)?,
            steps: convert_steps(w.steps)?,
            branch_points,
            dietary_tags: w.dietary_tags,
        })
    }
}
