use tracing::debug;
use uuid::Uuid;

use super::dto::Recommendation;
use crate::error::AppResult;
use crate::recipes::repo_types::BaseRecipe;
use crate::state::AppState;

/// How many of the newest catalog recipes are considered.
pub const RECENT_WINDOW: i64 = 20;
pub const MAX_RESULTS: usize = 10;

/// Required ingredients present in the pantry, as a percentage, plus the names
/// of the ones that are not. An ingredient is present when its lowercase name is
/// a substring of some lowercase pantry item name.
pub fn score(recipe: &BaseRecipe, pantry_names: &[String]) -> (f64, Vec<String>) {
    let required: Vec<_> = recipe.required_ingredients().collect();
    if required.is_empty() {
        return (100.0, Vec::new());
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|ing| {
            let needle = ing.name.to_lowercase();
            !pantry_names.iter().any(|p| p.contains(&needle))
        })
        .map(|ing| ing.name.clone())
        .collect();
    let matched = required.len() - missing.len();
    (matched as f64 / required.len() as f64 * 100.0, missing)
}

pub async fn recommend(
    state: &AppState,
    user_id: Uuid,
    dietary_restrictions: &[String],
) -> AppResult<Vec<Recommendation>> {
    let pantry_names: Vec<String> = state
        .pantry
        .list_for_user(user_id)
        .await?
        .into_iter()
        .map(|p| p.name.to_lowercase())
        .collect();
    let recipes = state.recipes.list_recent(RECENT_WINDOW).await?;

    let mut out: Vec<Recommendation> = recipes
        .into_iter()
        .filter(|r| dietary_restrictions.is_empty() || r.has_any_tag(dietary_restrictions))
        .map(|recipe| {
            let (match_percentage, missing_ingredients) = score(&recipe, &pantry_names);
            Recommendation {
                recipe,
                match_percentage,
                missing_ingredients,
            }
        })
        .collect();

    // stable: equal scores keep catalog order
    out.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));
    out.truncate(MAX_RESULTS);

    debug!(%user_id, pantry = pantry_names.len(), results = out.len(), "recommendations computed");
    Ok(out)
}

#[cfg(test)]
mod recommendation_tests {
    use super::*;
    use crate::pantry;
    use crate::recipes;
    use crate::recipes::repo_types::Ingredient;
    use crate::testing::{pantry_input, sample_recipe_def, Harness};

    fn ing(name: &str, required: bool) -> Ingredient {
        Ingredient { name: name.into(), quantity: 1.0, unit: "unit".into(), required }
    }

    fn recipe_with(ingredients: Vec<Ingredient>) -> BaseRecipe {
        let mut def = sample_recipe_def();
        def.ingredients = ingredients;
        BaseRecipe {
            id: Uuid::new_v4(),
            name: def.name,
            description: def.description,
            cuisine_type: def.cuisine_type,
            difficulty_level: def.difficulty_level,
            prep_time_minutes: def.prep_time_minutes,
            cook_time_minutes: def.cook_time_minutes,
            servings: def.servings,
            base_ingredients: def.ingredients,
            base_steps: def.steps,
            branch_points: def.branch_points,
            base_nutrition: Default::default(),
            base_cost_estimate: 0.0,
            dietary_tags: vec![],
            ingredient_categories: vec![],
            image_path: None,
            created_by: "test".into(),
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn no_required_ingredients_scores_full_marks() {
        let (pct, missing) = score(&recipe_with(vec![ing("salt", false)]), &[]);
        assert_eq!(pct, 100.0);
        assert!(missing.is_empty());

        let (pct, _) = score(&recipe_with(vec![]), &["anything".into()]);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn nothing_in_pantry_scores_zero() {
        let r = recipe_with(vec![ing("flour", true), ing("eggs", true)]);
        for pantry in [vec![], vec!["sugar".to_string(), "milk".to_string()]] {
            let (pct, missing) = score(&r, &pantry);
            assert_eq!(pct, 0.0);
            assert_eq!(missing, vec!["flour", "eggs"]);
        }
    }

    #[test]
    fn substring_runs_from_recipe_name_into_pantry_name() {
        let r = recipe_with(vec![ing("Garlic", true), ing("cherry tomatoes", true)]);
        let pantry = vec!["fresh garlic bulbs".to_string(), "tomatoes".to_string()];
        let (pct, missing) = score(&r, &pantry);
        assert_eq!(pct, 50.0);
        assert_eq!(missing, vec!["cherry tomatoes"]);
    }

    #[tokio::test]
    async fn ranks_by_match_and_filters_by_any_dietary_tag() {
        let h = Harness::new();
        let user = Uuid::new_v4();

        let mut a = sample_recipe_def();
        a.name = "A".into();
        a.dietary_tags = vec!["Vegan".into()];
        a.ingredients = vec![ing("rice", true)];
        let mut b = sample_recipe_def();
        b.name = "B".into();
        b.dietary_tags = vec!["gluten-free".into()];
        b.ingredients = vec![ing("quinoa", true)];
        recipes::services::create_base_recipe(&h.state, a, "t").await.unwrap();
        recipes::services::create_base_recipe(&h.state, b, "t").await.unwrap();

        pantry::services::add_item(&h.state, user, pantry_input("brown rice", "grains")).await.unwrap();

        let all = recommend(&h.state, user, &[]).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].recipe.name, "A");
        assert_eq!(all[0].match_percentage, 100.0);

        let vegan = recommend(&h.state, user, &["VEGAN".into(), "keto".into()]).await.unwrap();
        assert_eq!(vegan.len(), 1);
        assert_eq!(vegan[0].recipe.name, "A");
    }

    #[tokio::test]
    async fn ties_keep_catalog_order_and_results_are_capped() {
        let h = Harness::new();
        for i in 0..12 {
            let mut def = sample_recipe_def();
            def.name = format!("R{}", i);
            recipes::services::create_base_recipe(&h.state, def, "t").await.unwrap();
            // distinct created_at
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let recs = recommend(&h.state, Uuid::new_v4(), &[]).await.unwrap();
        assert_eq!(recs.len(), MAX_RESULTS);
        // all score zero, newest first
        let names: Vec<_> = recs.iter().map(|r| r.recipe.name.clone()).collect();
        assert_eq!(names[0], "R11");
        assert_eq!(names[9], "R2");
    }
}
