use std::collections::BTreeSet;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::NewRecipe;
use super::repo_types::BaseRecipe;
use crate::error::{AppError, AppResult};
use crate::generation::RecipeGenerationRequest;
use crate::nutrition;
use crate::state::AppState;

/// A week of cooking; anything longer is a typo.
pub const MAX_MINUTES: u32 = 10_080;
pub const MAX_SERVINGS: u32 = 1_000;

/// Structural checks shared by authored and generated recipes.
pub fn validate_definition(def: &NewRecipe) -> Result<(), String> {
    if def.name.trim().is_empty() {
        return Err("name is required".into());
    }
    if def.servings == 0 || def.servings > MAX_SERVINGS {
        return Err(format!("servings must be between 1 and {MAX_SERVINGS}"));
    }
    for (field, minutes) in [
        ("prep_time_minutes", def.prep_time_minutes),
        ("cook_time_minutes", def.cook_time_minutes),
    ] {
        if minutes > MAX_MINUTES {
            return Err(format!("{field} must be at most {MAX_MINUTES}"));
        }
    }
    if def.steps.is_empty() {
        return Err("at least one step is required".into());
    }
    let mut prev = 0;
    for s in &def.steps {
        if s.step <= prev {
            return Err(format!(
                "step numbers must start at 1 and strictly increase (got {} after {})",
                s.step, prev
            ));
        }
        prev = s.step;
        if s.time_minutes > MAX_MINUTES {
            return Err(format!("step {} time_minutes must be at most {MAX_MINUTES}", s.step));
        }
    }
    for ing in &def.ingredients {
        if ing.name.trim().is_empty() {
            return Err("ingredient name is required".into());
        }
        if !ing.quantity.is_finite() || ing.quantity < 0.0 {
            return Err(format!("quantity for '{}' must be a non-negative number", ing.name));
        }
    }

    let mut branch_steps = BTreeSet::new();
    for bp in &def.branch_points {
        if !def.steps.iter().any(|s| s.step == bp.step) {
            return Err(format!("branch point references missing step {}", bp.step));
        }
        if !branch_steps.insert(bp.step) {
            return Err(format!("more than one branch point at step {}", bp.step));
        }
        if bp.options.is_empty() {
            return Err(format!("branch point at step {} has no options", bp.step));
        }
        let mut keys = BTreeSet::new();
        for opt in &bp.options {
            if opt.choice.trim().is_empty() {
                return Err(format!("empty choice key at step {}", bp.step));
            }
            if !keys.insert(opt.choice.as_str()) {
                return Err(format!(
                    "duplicate choice '{}' at step {}",
                    opt.choice, bp.step
                ));
            }
        }
    }
    Ok(())
}

/// Validate, price and persist a new base recipe. Nutrition, cost and ingredient
/// categories come from the registry, never from the caller.
pub async fn create_base_recipe(state: &AppState, def: NewRecipe, created_by: &str) -> AppResult<BaseRecipe> {
    validate_definition(&def).map_err(AppError::Validation)?;

    let analysis = nutrition::services::analyze_ingredients(state.nutrition.as_ref(), &def.ingredients).await?;

    let tags: Vec<String> = def
        .dietary_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let recipe = BaseRecipe {
        id: Uuid::new_v4(),
        name: def.name.trim().to_string(),
        description: def.description,
        cuisine_type: def.cuisine_type,
        difficulty_level: def.difficulty_level,
        prep_time_minutes: def.prep_time_minutes,
        cook_time_minutes: def.cook_time_minutes,
        servings: def.servings,
        base_ingredients: def.ingredients,
        base_steps: def.steps,
        branch_points: def.branch_points,
        base_nutrition: analysis.totals.macros(),
        base_cost_estimate: analysis.cost,
        dietary_tags: tags,
        ingredient_categories: analysis.categories,
        image_path: def.image_path,
        created_by: created_by.to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    state.recipes.insert(&recipe).await?;
    info!(recipe_id = %recipe.id, name = %recipe.name, branch_points = recipe.branch_points.len(), "base recipe created");
    Ok(recipe)
}

pub async fn get_recipe(state: &AppState, id: Uuid) -> AppResult<BaseRecipe> {
    state
        .recipes
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("recipe {}", id)))
}

/// Draft a branching recipe around the given ingredients. Not persisted.
pub async fn generate_from_ingredients(
    state: &AppState,
    ingredients: Vec<String>,
    cuisine: Option<String>,
    dietary_restrictions: Vec<String>,
) -> AppResult<NewRecipe> {
    let ingredients: Vec<String> = ingredients
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if ingredients.is_empty() {
        return Err(AppError::validation("at least one ingredient is required"));
    }

    let req = RecipeGenerationRequest {
        ingredients,
        cuisine: cuisine.filter(|c| !c.trim().is_empty()),
        dietary_restrictions,
    };
    let draft: NewRecipe = state
        .generator
        .generate_recipe(&req)
        .await
        .map_err(|e| AppError::from_generation("recipe generation", e))?
        .into();

    if let Err(reason) = validate_definition(&draft) {
        warn!(%reason, "generated recipe failed structural validation");
        return Err(AppError::DownstreamFormat("recipe generation".into()));
    }
    Ok(draft)
}

#[cfg(test)]
mod recipe_service_tests {
    use super::*;
    use crate::generation::provider::Operation;
    use crate::recipes::repo_types::{BranchOption, BranchPoint, RecipeStep};
    use crate::testing::{nutrition_input, sample_recipe_def, Harness};

    #[tokio::test]
    async fn create_computes_registry_totals_and_round_trips() {
        let h = Harness::new();
        let mut pasta = nutrition_input("pasta", 200.0, "grains");
        pasta.cost_per_serving = Some(0.25);
        nutrition::services::add(h.state.nutrition.as_ref(), pasta).await.unwrap();

        let def = sample_recipe_def();
        let recipe = create_base_recipe(&h.state, def.clone(), "system").await.unwrap();

        // pasta 12 oz is the only registry hit
        assert_eq!(recipe.base_nutrition.calories, 200.0 * 12.0);
        let unpriced: f64 = def.ingredients.iter().filter(|i| i.name != "pasta").map(|i| i.quantity * 2.0).sum();
        assert_eq!(recipe.base_cost_estimate, 0.25 * 12.0 + unpriced);
        assert_eq!(recipe.ingredient_categories, vec!["grains", "other"]);
        assert_eq!(recipe.created_by, "system");

        let fetched = get_recipe(&h.state, recipe.id).await.unwrap();
        assert_eq!(fetched, recipe);
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let h = Harness::new();
        let err = get_recipe(&h.state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn branch_point_must_reference_an_existing_step() {
        let mut def = sample_recipe_def();
        def.branch_points[0].step = 42;
        let err = validate_definition(&def).unwrap_err();
        assert!(err.contains("missing step 42"));
    }

    #[test]
    fn choice_keys_must_be_unique_within_a_branch_point() {
        let mut def = sample_recipe_def();
        def.branch_points[0].options.push(BranchOption {
            choice: "spicy".into(),
            description: "again".into(),
        });
        assert!(validate_definition(&def).unwrap_err().contains("duplicate choice"));
    }

    #[test]
    fn steps_must_strictly_increase_from_one() {
        let mut def = sample_recipe_def();
        def.steps[1].step = 1;
        assert!(validate_definition(&def).is_err());

        let mut def = sample_recipe_def();
        def.steps.insert(
            0,
            RecipeStep { step: 0, instruction: "zero".into(), time_minutes: 1 },
        );
        assert!(validate_definition(&def).is_err());
    }

    #[test]
    fn rejects_two_branch_points_on_one_step_and_empty_options() {
        let mut def = sample_recipe_def();
        let dup = def.branch_points[0].clone();
        def.branch_points.push(dup);
        assert!(validate_definition(&def).is_err());

        let mut def = sample_recipe_def();
        def.branch_points.push(BranchPoint { step: 1, question: "?".into(), options: vec![] });
        assert!(validate_definition(&def).unwrap_err().contains("no options"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_definition_without_persisting() {
        let h = Harness::new();
        let mut def = sample_recipe_def();
        def.name = "   ".into();
        let err = create_base_recipe(&h.state, def, "u").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.state.recipes.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn generated_draft_is_validated() {
        let h = Harness::new();
        h.llm.push_json(
            Operation::RecipeGeneration,
            serde_json::json!({
                "name": "Tomato Rice", "description": "d", "cuisine_type": "Italian",
                "difficulty_level": "easy", "prep_time_minutes": 10, "cook_time_minutes": 20,
                "servings": 2,
                "ingredients": [{"name": "rice", "quantity": 1, "unit": "cup", "required": true}],
                "steps": [{"step": 1, "instruction": "Cook", "time_minutes": 20}],
                "branch_points": [{"step": 1, "question": "Herbs?",
                    "options": [{"choice": "basil", "description": "b"}, {"choice": "none", "description": "n"}]}],
                "dietary_tags": ["vegan"]
            }),
        );
        let draft = generate_from_ingredients(&h.state, vec!["rice".into()], Some("Italian".into()), vec![])
            .await
            .unwrap();
        assert_eq!(draft.name, "Tomato Rice");
        assert_eq!(draft.branch_points.len(), 1);

        // branch point on a step that does not exist
        h.llm.push_json(
            Operation::RecipeGeneration,
            serde_json::json!({
                "name": "Bad", "description": "d", "cuisine_type": "x", "difficulty_level": "easy",
                "prep_time_minutes": 1, "cook_time_minutes": 1, "servings": 1,
                "ingredients": [], "steps": [{"step": 1, "instruction": "a", "time_minutes": 1}],
                "branch_points": [{"step": 7, "question": "?", "options": [{"choice": "a", "description": "a"}]}],
                "dietary_tags": []
            }),
        );
        let err = generate_from_ingredients(&h.state, vec!["rice".into()], None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DownstreamFormat(_)));

        let err = generate_from_ingredients(&h.state, vec!["  ".into()], None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_out_of_range_times_and_servings() {
        let mut def = sample_recipe_def();
        def.prep_time_minutes = u32::MAX;
        assert!(validate_definition(&def).unwrap_err().contains("prep_time_minutes"));

        let mut def = sample_recipe_def();
        def.cook_time_minutes = MAX_MINUTES + 1;
        assert!(validate_definition(&def).is_err());

        let mut def = sample_recipe_def();
        def.steps[0].time_minutes = u32::MAX;
        assert!(validate_definition(&def).is_err());

        let mut def = sample_recipe_def();
        def.servings = 3_000_000_000;
        assert!(validate_definition(&def).is_err());

        let mut def = sample_recipe_def();
        def.prep_time_minutes = MAX_MINUTES;
        def.cook_time_minutes = MAX_MINUTES;
        validate_definition(&def).unwrap();
    }

    #[tokio::test]
    async fn oversized_prep_time_is_refused_at_creation() {
        let h = Harness::new();
        let mut def = sample_recipe_def();
        def.prep_time_minutes = u32::MAX;
        def.cook_time_minutes = 1;
        let err = create_base_recipe(&h.state, def, "u").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.state.recipes.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn starting_a_session_on_a_huge_stored_recipe_saturates_total_time() {
        let h = Harness::new();
        let mut recipe = create_base_recipe(&h.state, sample_recipe_def(), "u").await.unwrap();
        recipe.id = Uuid::new_v4();
        recipe.prep_time_minutes = u32::MAX;
        recipe.cook_time_minutes = 1;
        h.state.recipes.insert(&recipe).await.unwrap();

        let view = crate::sessions::services::start_session(&h.state, Uuid::new_v4(), recipe.id)
            .await
            .unwrap();
        assert_eq!(view.session.total_time_minutes, u32::MAX);
    }
}
