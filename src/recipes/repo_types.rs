use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub step: u32, // 1-based
    pub instruction: String,
    pub time_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOption {
    pub choice: String,
    pub description: String,
}

/// A decision offered at a specific step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
    pub step: u32,
    pub question: String,
    pub options: Vec<BranchOption>,
}

impl BranchPoint {
    pub fn option(&self, choice: &str) -> Option<&BranchOption> {
        self.options.iter().find(|o| o.choice == choice)
    }

    pub fn choice_keys(&self) -> String {
        self.options
            .iter()
            .map(|o| o.choice.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Per-recipe macro totals (grams, sodium in mg).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeNutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRecipe {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cuisine_type: String,
    pub difficulty_level: String,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub servings: u32,
    pub base_ingredients: Vec<Ingredient>,
    pub base_steps: Vec<RecipeStep>,
    pub branch_points: Vec<BranchPoint>,
    pub base_nutrition: RecipeNutrition,
    pub base_cost_estimate: f64,
    pub dietary_tags: Vec<String>,
    pub ingredient_categories: Vec<String>,
    pub image_path: Option<String>,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl BaseRecipe {
    pub fn total_time_minutes(&self) -> u32 {
        self.prep_time_minutes.saturating_add(self.cook_time_minutes)
    }

    pub fn branch_at(&self, step: u32) -> Option<&BranchPoint> {
        self.branch_points.iter().find(|bp| bp.step == step)
    }

    /// Branch points at or after `from_step`, in authored order.
    pub fn upcoming_branch_points(&self, from_step: u32) -> Vec<BranchPoint> {
        self.branch_points
            .iter()
            .filter(|bp| bp.step >= from_step)
            .cloned()
            .collect()
    }

    pub fn required_ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.base_ingredients.iter().filter(|i| i.required)
    }

    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        wanted.iter().any(|w| {
            self.dietary_tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(w.trim()))
        })
    }
}

#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cuisine_type: String,
    pub difficulty_level: String,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub base_ingredients: Json<Vec<Ingredient>>,
    pub base_steps: Json<Vec<RecipeStep>>,
    pub branch_points: Json<Vec<BranchPoint>>,
    pub base_nutrition: Json<RecipeNutrition>,
    pub base_cost_estimate: f64,
    pub dietary_tags: Vec<String>,
    pub ingredient_categories: Vec<String>,
    pub image_path: Option<String>,
    pub created_by: String,
    pub created_at: OffsetDateTime,
}

pub(crate) fn non_negative(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

/// Narrow a count for an INTEGER column, refusing values that would wrap.
pub(crate) fn db_int(v: u32, field: &str) -> anyhow::Result<i32> {
    i32::try_from(v).with_context(|| format!("{field} {v} does not fit an INTEGER column"))
}

impl From<RecipeRow> for BaseRecipe {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            cuisine_type: r.cuisine_type,
            difficulty_level: r.difficulty_level,
            prep_time_minutes: non_negative(r.prep_time_minutes),
            cook_time_minutes: non_negative(r.cook_time_minutes),
            servings: non_negative(r.servings),
            base_ingredients: r.base_ingredients.0,
            base_steps: r.base_steps.0,
            branch_points: r.branch_points.0,
            base_nutrition: r.base_nutrition.0,
            base_cost_estimate: r.base_cost_estimate,
            dietary_tags: r.dietary_tags,
            ingredient_categories: r.ingredient_categories,
            image_path: r.image_path,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod recipe_types_tests {
    use super::*;

    #[test]
    fn db_int_refuses_values_that_would_wrap() {
        assert_eq!(db_int(42, "servings").unwrap(), 42);
        assert_eq!(db_int(i32::MAX as u32, "servings").unwrap(), i32::MAX);
        let err = db_int(3_000_000_000, "current_step").unwrap_err();
        assert!(err.to_string().contains("current_step"));
    }

    #[test]
    fn option_lookup_is_exact() {
        let bp = BranchPoint {
            step: 3,
            question: "Heat?".into(),
            options: vec![
                BranchOption { choice: "mild".into(), description: String::new() },
                BranchOption { choice: "hot".into(), description: String::new() },
            ],
        };
        assert_eq!(bp.option("hot").map(|o| o.choice.as_str()), Some("hot"));
        assert!(bp.option("HOT").is_none());
        assert_eq!(bp.choice_keys(), "mild, hot");
    }
}
