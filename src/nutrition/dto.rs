use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{canonical_name, NutritionData};
use crate::error::{AppError, AppResult};

fn default_source() -> String {
    "manual_entry".into()
}

/// One registry record as submitted by a client or the seeder.
#[derive(Debug, Clone, Deserialize)]
pub struct NutritionInput {
    pub ingredient_name: String,
    pub serving_size: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    #[serde(default)]
    pub vitamin_c_mg: Option<f64>,
    #[serde(default)]
    pub vitamin_a_iu: Option<f64>,
    #[serde(default)]
    pub calcium_mg: Option<f64>,
    #[serde(default)]
    pub iron_mg: Option<f64>,
    #[serde(default)]
    pub potassium_mg: Option<f64>,
    #[serde(default)]
    pub cost_per_serving: Option<f64>,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub category: String,
    #[serde(default = "default_source")]
    pub data_source: String,
    #[serde(default)]
    pub verified: bool,
}

fn check(v: f64, field: &str) -> AppResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

impl NutritionInput {
    pub fn validate(&self) -> AppResult<()> {
        if canonical_name(&self.ingredient_name).is_empty() {
            return Err(AppError::validation("ingredient_name is required"));
        }
        for (field, v) in [
            ("calories", self.calories),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
            ("fiber_g", self.fiber_g),
            ("sugar_g", self.sugar_g),
            ("sodium_mg", self.sodium_mg),
        ] {
            check(v, field)?;
        }
        for (field, v) in [
            ("vitamin_c_mg", self.vitamin_c_mg),
            ("vitamin_a_iu", self.vitamin_a_iu),
            ("calcium_mg", self.calcium_mg),
            ("iron_mg", self.iron_mg),
            ("potassium_mg", self.potassium_mg),
            ("cost_per_serving", self.cost_per_serving),
        ] {
            if let Some(v) = v {
                check(v, field)?;
            }
        }
        Ok(())
    }

    pub fn into_record(self, now: OffsetDateTime) -> NutritionData {
        NutritionData {
            id: Uuid::new_v4(),
            ingredient_name: canonical_name(&self.ingredient_name),
            serving_size: self.serving_size,
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            fiber_g: self.fiber_g,
            sugar_g: self.sugar_g,
            sodium_mg: self.sodium_mg,
            vitamin_c_mg: self.vitamin_c_mg,
            vitamin_a_iu: self.vitamin_a_iu,
            calcium_mg: self.calcium_mg,
            iron_mg: self.iron_mg,
            potassium_mg: self.potassium_mg,
            cost_per_serving: self.cost_per_serving,
            allergens: self
                .allergens
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            category: self.category.trim().to_lowercase(),
            data_source: self.data_source,
            verified: self.verified,
            created_at: now,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub name: String,
    pub quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CostUpdate {
    pub cost_per_serving: f64,
}

fn default_serving() -> String {
    "1 serving".into()
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub ingredient_name: String,
    #[serde(default = "default_serving")]
    pub serving_size: String,
}

#[derive(Debug, Deserialize)]
pub struct CompatibilityRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Compatibility {
    pub compatible: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpsertResponse {
    pub upserted: usize,
}
