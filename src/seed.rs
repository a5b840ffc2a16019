//! Demo catalog: common ingredient nutrition and two branching recipes.

use anyhow::Context;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::nutrition::{self, dto::NutritionInput};
use crate::recipes::{self, dto::NewRecipe};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SeedReport {
    pub nutrition_records: usize,
    pub recipes_created: usize,
}

fn sample_nutrition() -> anyhow::Result<Vec<NutritionInput>> {
    let rows = json!([
        {"ingredient_name": "pasta", "serving_size": "2 oz dry", "calories": 200, "protein_g": 7,
         "carbs_g": 42, "fat_g": 1, "fiber_g": 2, "sugar_g": 2, "sodium_mg": 0,
         "allergens": ["gluten"], "category": "grains"},
        {"ingredient_name": "olive oil", "serving_size": "1 tbsp", "calories": 120, "protein_g": 0,
         "carbs_g": 0, "fat_g": 14, "fiber_g": 0, "sugar_g": 0, "sodium_mg": 0, "category": "fats"},
        {"ingredient_name": "cherry tomatoes", "serving_size": "1 cup", "calories": 27, "protein_g": 1.3,
         "carbs_g": 6, "fat_g": 0.3, "fiber_g": 1.8, "sugar_g": 4, "sodium_mg": 7,
         "vitamin_c_mg": 20, "category": "vegetables"},
        {"ingredient_name": "garlic", "serving_size": "1 clove", "calories": 4, "protein_g": 0.2,
         "carbs_g": 1, "fat_g": 0, "fiber_g": 0.1, "sugar_g": 0, "sodium_mg": 0, "category": "aromatics"},
        {"ingredient_name": "fresh basil", "serving_size": "2 tbsp chopped", "calories": 1, "protein_g": 0.1,
         "carbs_g": 0.1, "fat_g": 0, "fiber_g": 0.1, "sugar_g": 0, "sodium_mg": 0,
         "vitamin_c_mg": 1.8, "category": "herbs"},
        {"ingredient_name": "bell peppers", "serving_size": "1 cup sliced", "calories": 28, "protein_g": 1,
         "carbs_g": 7, "fat_g": 0.3, "fiber_g": 2.5, "sugar_g": 5, "sodium_mg": 4,
         "vitamin_c_mg": 120, "category": "vegetables"},
        {"ingredient_name": "broccoli", "serving_size": "1 cup chopped", "calories": 25, "protein_g": 3,
         "carbs_g": 5, "fat_g": 0.4, "fiber_g": 2.3, "sugar_g": 1.5, "sodium_mg": 33,
         "vitamin_c_mg": 81, "category": "vegetables"},
        {"ingredient_name": "soy sauce", "serving_size": "1 tbsp", "calories": 8, "protein_g": 1.3,
         "carbs_g": 0.8, "fat_g": 0, "fiber_g": 0.1, "sugar_g": 0.4, "sodium_mg": 879,
         "allergens": ["gluten", "soy"], "category": "condiments"},
        {"ingredient_name": "chicken breast", "serving_size": "4 oz cooked", "calories": 185, "protein_g": 35,
         "carbs_g": 0, "fat_g": 4, "fiber_g": 0, "sugar_g": 0, "sodium_mg": 84, "category": "proteins"},
        {"ingredient_name": "shrimp", "serving_size": "4 oz cooked", "calories": 112, "protein_g": 23,
         "carbs_g": 0, "fat_g": 1.2, "fiber_g": 0, "sugar_g": 0, "sodium_mg": 191,
         "allergens": ["shellfish"], "category": "proteins"}
    ]);
    let mut items: Vec<NutritionInput> =
        serde_json::from_value(rows).context("decode sample nutrition")?;
    for item in &mut items {
        item.data_source = "USDA".into();
        item.verified = true;
    }
    Ok(items)
}

fn sample_recipes() -> anyhow::Result<Vec<NewRecipe>> {
    let recipes = json!([
        {
            "name": "Mediterranean Pasta Adventure",
            "description": "A customizable pasta dish where every choice creates a unique flavor journey",
            "cuisine_type": "Mediterranean",
            "difficulty_level": "easy",
            "prep_time_minutes": 15,
            "cook_time_minutes": 20,
            "servings": 4,
            "ingredients": [
                {"name": "pasta", "quantity": 12, "unit": "oz", "required": true},
                {"name": "olive oil", "quantity": 3, "unit": "tbsp", "required": true},
                {"name": "garlic", "quantity": 3, "unit": "cloves", "required": true},
                {"name": "cherry tomatoes", "quantity": 2, "unit": "cups", "required": true},
                {"name": "fresh basil", "quantity": 0.5, "unit": "cup", "required": false}
            ],
            "steps": [
                {"step": 1, "instruction": "Bring a large pot of salted water to boil", "time_minutes": 5},
                {"step": 2, "instruction": "Heat olive oil in a large skillet over medium heat", "time_minutes": 2},
                {"step": 3, "instruction": "Add garlic and cook until fragrant", "time_minutes": 1},
                {"step": 4, "instruction": "Add cherry tomatoes and cook until they start to burst", "time_minutes": 5},
                {"step": 5, "instruction": "Cook pasta according to package directions", "time_minutes": 8},
                {"step": 6, "instruction": "Combine pasta with sauce and serve", "time_minutes": 2}
            ],
            "branch_points": [
                {"step": 3, "question": "How would you like to flavor your garlic?", "options": [
                    {"choice": "classic", "description": "Keep it simple with just garlic"},
                    {"choice": "spicy", "description": "Add red pepper flakes for heat"},
                    {"choice": "herb", "description": "Add fresh rosemary for earthiness"}]},
                {"step": 4, "question": "What protein would you like to add?", "options": [
                    {"choice": "none", "description": "Keep it vegetarian"},
                    {"choice": "chicken", "description": "Add grilled chicken breast"},
                    {"choice": "shrimp", "description": "Add succulent shrimp"}]},
                {"step": 6, "question": "How would you like to finish the dish?", "options": [
                    {"choice": "parmesan", "description": "Classic Parmesan cheese"},
                    {"choice": "fresh_herbs", "description": "Fresh basil and parsley"},
                    {"choice": "both", "description": "Cheese and herbs together"}]}
            ],
            "dietary_tags": ["vegetarian"]
        },
        {
            "name": "Asian Fusion Stir-Fry Quest",
            "description": "Choose your adventure through bold Asian flavors with customizable vegetables and sauces",
            "cuisine_type": "Asian",
            "difficulty_level": "medium",
            "prep_time_minutes": 20,
            "cook_time_minutes": 15,
            "servings": 3,
            "ingredients": [
                {"name": "vegetable oil", "quantity": 2, "unit": "tbsp", "required": true},
                {"name": "ginger", "quantity": 1, "unit": "tbsp", "required": true},
                {"name": "garlic", "quantity": 2, "unit": "cloves", "required": true},
                {"name": "soy sauce", "quantity": 3, "unit": "tbsp", "required": true},
                {"name": "mixed vegetables", "quantity": 4, "unit": "cups", "required": true}
            ],
            "steps": [
                {"step": 1, "instruction": "Prepare all ingredients (mise en place)", "time_minutes": 15},
                {"step": 2, "instruction": "Heat oil in a wok or large skillet over high heat", "time_minutes": 2},
                {"step": 3, "instruction": "Add aromatics and stir-fry briefly", "time_minutes": 1},
                {"step": 4, "instruction": "Add vegetables in order of cooking time needed", "time_minutes": 5},
                {"step": 5, "instruction": "Add sauce and toss to coat", "time_minutes": 2},
                {"step": 6, "instruction": "Serve immediately over rice", "time_minutes": 1}
            ],
            "branch_points": [
                {"step": 2, "question": "What cooking fat would you prefer?", "options": [
                    {"choice": "vegetable_oil", "description": "Neutral vegetable oil for clean flavors"},
                    {"choice": "sesame_oil", "description": "Toasted sesame oil for nutty richness"},
                    {"choice": "peanut_oil", "description": "Peanut oil for high heat and subtle flavor"}]},
                {"step": 4, "question": "Which vegetables combination appeals to you?", "options": [
                    {"choice": "classic", "description": "Bell peppers, broccoli, and snap peas"},
                    {"choice": "mushroom", "description": "Mixed mushrooms, bok choy, and carrots"},
                    {"choice": "colorful", "description": "Red cabbage, yellow squash, and snow peas"}]},
                {"step": 5, "question": "How would you like to sauce your stir-fry?", "options": [
                    {"choice": "simple_soy", "description": "Classic soy sauce with a touch of sugar"},
                    {"choice": "sweet_sour", "description": "Sweet and sour sauce with pineapple"},
                    {"choice": "spicy_garlic", "description": "Garlic chili sauce for heat lovers"}]}
            ],
            "dietary_tags": ["vegan", "gluten-free"]
        }
    ]);
    serde_json::from_value(recipes).context("decode sample recipes")
}

/// Upsert the sample nutrition table, then add the sample recipes if the
/// catalog is still empty. Safe to run repeatedly.
pub async fn seed_sample_data(state: &AppState) -> AppResult<SeedReport> {
    let nutrition_records =
        nutrition::services::bulk_upsert(state.nutrition.as_ref(), sample_nutrition()?).await?;

    let mut recipes_created = 0;
    if state.recipes.count().await? == 0 {
        for def in sample_recipes()? {
            recipes::services::create_base_recipe(state, def, "system").await?;
            recipes_created += 1;
        }
    }
    info!(nutrition_records, recipes_created, "sample data seeded");
    Ok(SeedReport { nutrition_records, recipes_created })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/seed", post(seed))
}

#[instrument(skip(state))]
pub async fn seed(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> AppResult<Json<SeedReport>> {
    info!(%user_id, "seed requested");
    Ok(Json(seed_sample_data(&state).await?))
}

#[cfg(test)]
mod seed_tests {
    use super::*;
    use crate::recipes::services::validate_definition;
    use crate::testing::Harness;

    #[test]
    fn sample_recipes_are_valid_definitions() {
        for def in sample_recipes().unwrap() {
            validate_definition(&def).unwrap();
        }
    }

    #[tokio::test]
    async fn seeding_twice_does_not_duplicate_recipes() {
        let h = Harness::new();
        let first = seed_sample_data(&h.state).await.unwrap();
        assert_eq!(first.nutrition_records, 10);
        assert_eq!(first.recipes_created, 2);

        let again = seed_sample_data(&h.state).await.unwrap();
        assert_eq!(again.recipes_created, 0);
        assert_eq!(h.state.recipes.count().await.unwrap(), 2);

        let pasta = nutrition::services::get(h.state.nutrition.as_ref(), "Pasta").await.unwrap().unwrap();
        assert_eq!(pasta.data_source, "USDA");
        assert!(pasta.has_allergen("gluten"));
    }
}
