use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::recipes::repo_types::RecipeNutrition;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Registry key for an ingredient: trimmed, single-spaced, lowercase.
pub fn canonical_name(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").to_lowercase()
}

/// Per-serving facts for one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NutritionData {
    pub id: Uuid,
    pub ingredient_name: String,
    pub serving_size: String,

    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,

    pub vitamin_c_mg: Option<f64>,
    pub vitamin_a_iu: Option<f64>,
    pub calcium_mg: Option<f64>,
    pub iron_mg: Option<f64>,
    pub potassium_mg: Option<f64>,

    pub cost_per_serving: Option<f64>,
    pub allergens: Vec<String>,
    pub category: String,
    pub data_source: String,
    pub verified: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl NutritionData {
    pub fn has_allergen(&self, tag: &str) -> bool {
        self.allergens.iter().any(|a| a.trim().eq_ignore_ascii_case(tag))
    }
}

/// Sums across an ingredient list. Quantity is applied as a plain multiplier
/// on the per-serving values; units are not converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub vitamin_c_mg: f64,
    pub vitamin_a_iu: f64,
    pub calcium_mg: f64,
    pub iron_mg: f64,
    pub potassium_mg: f64,
}

impl NutritionTotals {
    pub fn add_scaled(&mut self, n: &NutritionData, multiplier: f64) {
        self.calories += n.calories * multiplier;
        self.protein_g += n.protein_g * multiplier;
        self.carbs_g += n.carbs_g * multiplier;
        self.fat_g += n.fat_g * multiplier;
        self.fiber_g += n.fiber_g * multiplier;
        self.sugar_g += n.sugar_g * multiplier;
        self.sodium_mg += n.sodium_mg * multiplier;
        self.vitamin_c_mg += n.vitamin_c_mg.unwrap_or(0.0) * multiplier;
        self.vitamin_a_iu += n.vitamin_a_iu.unwrap_or(0.0) * multiplier;
        self.calcium_mg += n.calcium_mg.unwrap_or(0.0) * multiplier;
        self.iron_mg += n.iron_mg.unwrap_or(0.0) * multiplier;
        self.potassium_mg += n.potassium_mg.unwrap_or(0.0) * multiplier;
    }

    pub fn macros(&self) -> RecipeNutrition {
        RecipeNutrition {
            calories: self.calories,
            protein: self.protein_g,
            carbs: self.carbs_g,
            fat: self.fat_g,
            fiber: self.fiber_g,
            sugar: self.sugar_g,
            sodium: self.sodium_mg,
        }
    }
}

/// Copy of registry facts frozen onto a pantry item when it is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionSnapshot {
    pub serving_size: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

impl From<&NutritionData> for NutritionSnapshot {
    fn from(n: &NutritionData) -> Self {
        Self {
            serving_size: n.serving_size.clone(),
            calories: n.calories,
            protein_g: n.protein_g,
            carbs_g: n.carbs_g,
            fat_g: n.fat_g,
            fiber_g: n.fiber_g,
            sugar_g: n.sugar_g,
            sodium_mg: n.sodium_mg,
        }
    }
}

#[cfg(test)]
mod nutrition_types_tests {
    use super::*;

    #[test]
    fn canonical_name_normalizes_case_and_spacing() {
        assert_eq!(canonical_name("  Cherry   Tomatoes "), "cherry tomatoes");
        assert_eq!(canonical_name("GARLIC"), "garlic");
        assert_eq!(canonical_name("olive\toil"), "olive oil");
    }
}
