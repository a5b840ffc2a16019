use std::collections::{BTreeSet, HashMap};

use time::OffsetDateTime;
use tracing::{info, warn};

use super::dto::{Compatibility, IngredientAmount, NutritionInput};
use super::repo::NutritionStore;
use super::repo_types::{canonical_name, NutritionData, NutritionTotals};
use crate::error::{AppError, AppResult};
use crate::generation::NutritionEstimate;
use crate::recipes::repo_types::Ingredient;
use crate::state::AppState;

pub const SEARCH_LIMIT: i64 = 20;
/// Cost per unit of quantity for ingredients without a registry price.
pub const DEFAULT_COST_PER_UNIT: f64 = 2.0;

const DAIRY_ALLERGENS: [&str; 3] = ["milk", "dairy", "lactose"];
const NUT_ALLERGENS: [&str; 3] = ["nuts", "peanuts", "tree nuts"];

pub async fn get(store: &dyn NutritionStore, name: &str) -> AppResult<Option<NutritionData>> {
    let key = canonical_name(name);
    if key.is_empty() {
        return Ok(None);
    }
    Ok(store.get(&key).await?)
}

pub async fn search(store: &dyn NutritionStore, query: &str) -> AppResult<Vec<NutritionData>> {
    Ok(store.search(query.trim(), SEARCH_LIMIT).await?)
}

pub async fn by_category(store: &dyn NutritionStore, category: &str) -> AppResult<Vec<NutritionData>> {
    Ok(store.by_category(category.trim()).await?)
}

pub async fn add(store: &dyn NutritionStore, input: NutritionInput) -> AppResult<NutritionData> {
    input.validate()?;
    let record = store
        .upsert(&input.into_record(OffsetDateTime::now_utc()))
        .await?;
    info!(ingredient = %record.ingredient_name, "nutrition data stored");
    Ok(record)
}

/// Batch upsert. Repeated names within one batch resolve to the last entry.
pub async fn bulk_upsert(store: &dyn NutritionStore, inputs: Vec<NutritionInput>) -> AppResult<usize> {
    for input in &inputs {
        input.validate()?;
    }
    let now = OffsetDateTime::now_utc();
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, NutritionData> = HashMap::new();
    for input in inputs {
        let record = input.into_record(now);
        if !latest.contains_key(&record.ingredient_name) {
            order.push(record.ingredient_name.clone());
        }
        latest.insert(record.ingredient_name.clone(), record);
    }
    let records: Vec<NutritionData> = order
        .iter()
        .filter_map(|name| latest.remove(name))
        .collect();

    store.upsert_many(&records).await?;
    info!(count = records.len(), "nutrition data bulk upsert");
    Ok(records.len())
}

pub async fn update_cost(
    store: &dyn NutritionStore,
    name: &str,
    cost_per_serving: f64,
) -> AppResult<NutritionData> {
    if !cost_per_serving.is_finite() || cost_per_serving < 0.0 {
        return Err(AppError::validation("cost_per_serving must be a non-negative number"));
    }
    let key = canonical_name(name);
    store
        .update_cost(&key, cost_per_serving)
        .await?
        .ok_or_else(|| AppError::not_found(format!("nutrition data for '{}'", key)))
}

async fn lookup_many<'a, I>(store: &dyn NutritionStore, names: I) -> AppResult<HashMap<String, NutritionData>>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: BTreeSet<String> = names
        .into_iter()
        .map(canonical_name)
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<String> = keys.into_iter().collect();
    let rows = store.get_many(&keys).await?;
    Ok(rows
        .into_iter()
        .map(|r| (canonical_name(&r.ingredient_name), r))
        .collect())
}

fn totals_for<'a, I>(registry: &HashMap<String, NutritionData>, items: I) -> NutritionTotals
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut totals = NutritionTotals::default();
    for (name, quantity) in items {
        if let Some(n) = registry.get(&canonical_name(name)) {
            totals.add_scaled(n, quantity);
        }
    }
    totals
}

fn cost_for(registry: &HashMap<String, NutritionData>, ingredients: &[Ingredient]) -> f64 {
    ingredients
        .iter()
        .map(|ing| {
            let per_unit = registry
                .get(&canonical_name(&ing.name))
                .and_then(|n| n.cost_per_serving)
                .unwrap_or(DEFAULT_COST_PER_UNIT);
            per_unit * ing.quantity
        })
        .sum()
}

/// Sum registry facts over `items`. Unknown ingredients contribute nothing.
pub async fn aggregate(store: &dyn NutritionStore, items: &[IngredientAmount]) -> AppResult<NutritionTotals> {
    if let Some(bad) = items.iter().find(|i| !i.quantity.is_finite() || i.quantity < 0.0) {
        return Err(AppError::validation(format!(
            "quantity for '{}' must be a non-negative number",
            bad.name
        )));
    }
    let registry = lookup_many(store, items.iter().map(|i| i.name.as_str())).await?;
    Ok(totals_for(
        &registry,
        items.iter().map(|i| (i.name.as_str(), i.quantity)),
    ))
}

pub async fn recipe_cost(store: &dyn NutritionStore, ingredients: &[Ingredient]) -> AppResult<f64> {
    let registry = lookup_many(store, ingredients.iter().map(|i| i.name.as_str())).await?;
    Ok(cost_for(&registry, ingredients))
}

/// Registry-derived figures for a new recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientAnalysis {
    pub totals: NutritionTotals,
    pub cost: f64,
    /// Sorted and distinct; unknown ingredients count as "other".
    pub categories: Vec<String>,
}

pub async fn analyze_ingredients(
    store: &dyn NutritionStore,
    ingredients: &[Ingredient],
) -> AppResult<IngredientAnalysis> {
    let registry = lookup_many(store, ingredients.iter().map(|i| i.name.as_str())).await?;
    let categories: BTreeSet<String> = ingredients
        .iter()
        .map(|i| {
            registry
                .get(&canonical_name(&i.name))
                .map(|n| n.category.clone())
                .unwrap_or_else(|| "other".into())
        })
        .collect();
    Ok(IngredientAnalysis {
        totals: totals_for(
            &registry,
            ingredients.iter().map(|i| (i.name.as_str(), i.quantity)),
        ),
        cost: cost_for(&registry, ingredients),
        categories: categories.into_iter().collect(),
    })
}

/// Model-backed estimate for an ingredient the registry does not know.
/// Falls back to an "unknown" estimate when the model cannot be reached.
pub async fn estimate(state: &AppState, name: &str, serving_size: &str) -> AppResult<NutritionEstimate> {
    let name = canonical_name(name);
    if name.is_empty() {
        return Err(AppError::validation("ingredient_name is required"));
    }
    match state.generator.estimate_nutrition(&name, serving_size).await {
        Ok(est) => Ok(est),
        Err(e) if e.is_transient() => {
            warn!(ingredient = %name, error = %e, "nutrition estimate degraded to unknown");
            Ok(NutritionEstimate::unknown())
        }
        Err(e) => Err(AppError::from_generation("nutrition estimate", e)),
    }
}

pub async fn dietary_compatibility(
    store: &dyn NutritionStore,
    ingredients: &[String],
    restrictions: &[String],
) -> AppResult<Compatibility> {
    let registry = lookup_many(store, ingredients.iter().map(String::as_str)).await?;
    let mut report = Compatibility {
        compatible: true,
        ..Default::default()
    };

    for ingredient in ingredients {
        let Some(n) = registry.get(&canonical_name(ingredient)) else {
            continue;
        };
        for restriction in restrictions {
            let restriction = restriction.trim().to_lowercase();
            let conflict = match restriction.as_str() {
                "gluten-free" if n.has_allergen("gluten") => Some("gluten"),
                "dairy-free" if DAIRY_ALLERGENS.iter().any(|a| n.has_allergen(a)) => Some("dairy"),
                "nut-free" if NUT_ALLERGENS.iter().any(|a| n.has_allergen(a)) => Some("nuts"),
                _ => None,
            };
            if let Some(what) = conflict {
                report.compatible = false;
                report.issues.push(format!("{} contains {}", ingredient, what));
                report
                    .suggestions
                    .push(format!("use a {} alternative to {}", restriction, ingredient));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod nutrition_service_tests {
    use std::sync::Arc;

    use super::*;
    use crate::generation::provider::Operation;
    use crate::generation::GenerationError;
    use crate::memory::MemoryStore;
    use crate::testing::{nutrition_input, Harness};

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        let mut pasta = nutrition_input("pasta", 200.0, "grains");
        pasta.protein_g = 7.0;
        pasta.allergens = vec!["gluten".into()];
        pasta.cost_per_serving = Some(0.5);
        let mut cheese = nutrition_input("parmesan", 110.0, "dairy");
        cheese.allergens = vec!["Milk".into()];
        let mut basil = nutrition_input("fresh basil", 1.0, "herbs");
        basil.vitamin_c_mg = Some(1.8);
        bulk_upsert(store.as_ref(), vec![pasta, cheese, basil]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn get_is_case_insensitive_and_absent_for_unknowns() {
        let store = seeded().await;
        let hit = get(store.as_ref(), "  PASTA ").await.unwrap().unwrap();
        assert_eq!(hit.ingredient_name, "pasta");
        assert!(get(store.as_ref(), "dragonfruit").await.unwrap().is_none());
        assert!(get(store.as_ref(), "   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_name_or_category_ordered_by_name() {
        let store = seeded().await;
        let found = search(store.as_ref(), "HERB").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ingredient_name, "fresh basil");

        let all = search(store.as_ref(), "a").await.unwrap();
        let names: Vec<_> = all.iter().map(|n| n.ingredient_name.as_str()).collect();
        assert_eq!(names, vec!["fresh basil", "parmesan", "pasta"]);
    }

    #[tokio::test]
    async fn search_is_capped() {
        let store = MemoryStore::default();
        let inputs = (0..30)
            .map(|i| nutrition_input(&format!("bean {:02}", i), 10.0, "legumes"))
            .collect();
        bulk_upsert(&store, inputs).await.unwrap();
        assert_eq!(search(&store, "bean").await.unwrap().len(), SEARCH_LIMIT as usize);
    }

    #[tokio::test]
    async fn aggregate_scales_linearly_with_quantity() {
        let store = seeded().await;
        let items = vec![
            IngredientAmount { name: "pasta".into(), quantity: 1.5 },
            IngredientAmount { name: "fresh basil".into(), quantity: 2.0 },
            IngredientAmount { name: "unobtainium".into(), quantity: 9.0 },
        ];
        let doubled: Vec<_> = items
            .iter()
            .map(|i| IngredientAmount { name: i.name.clone(), quantity: i.quantity * 2.0 })
            .collect();

        let once = aggregate(store.as_ref(), &items).await.unwrap();
        let twice = aggregate(store.as_ref(), &doubled).await.unwrap();

        assert_eq!(once.calories, 302.0);
        assert_eq!(once.vitamin_c_mg, 3.6);
        assert_eq!(twice.calories, once.calories * 2.0);
        assert_eq!(twice.protein_g, once.protein_g * 2.0);
        assert_eq!(twice.vitamin_c_mg, once.vitamin_c_mg * 2.0);
    }

    #[tokio::test]
    async fn aggregate_rejects_negative_quantities() {
        let store = seeded().await;
        let err = aggregate(
            store.as_ref(),
            &[IngredientAmount { name: "pasta".into(), quantity: -1.0 }],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn bulk_upsert_is_last_writer_wins_per_name() {
        let store = MemoryStore::default();
        let first = nutrition_input("Garlic", 4.0, "aromatics");
        let second = nutrition_input("garlic ", 5.0, "aromatics");
        let n = bulk_upsert(&store, vec![first, second]).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(get(&store, "garlic").await.unwrap().unwrap().calories, 5.0);

        add(&store, nutrition_input("GARLIC", 6.0, "aromatics")).await.unwrap();
        assert_eq!(get(&store, "garlic").await.unwrap().unwrap().calories, 6.0);
        assert_eq!(search(&store, "garlic").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_cost_requires_existing_record() {
        let store = seeded().await;
        let updated = update_cost(store.as_ref(), "Parmesan", 1.25).await.unwrap();
        assert_eq!(updated.cost_per_serving, Some(1.25));

        let err = update_cost(store.as_ref(), "saffron", 9.0).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cost_falls_back_to_default_per_unit() {
        let store = seeded().await;
        let ingredients = vec![
            Ingredient { name: "pasta".into(), quantity: 4.0, unit: "oz".into(), required: true },
            // known but unpriced
            Ingredient { name: "fresh basil".into(), quantity: 1.0, unit: "cup".into(), required: false },
            Ingredient { name: "saffron".into(), quantity: 0.5, unit: "g".into(), required: false },
        ];
        let cost = recipe_cost(store.as_ref(), &ingredients).await.unwrap();
        assert_eq!(cost, 0.5 * 4.0 + 2.0 * 1.0 + 2.0 * 0.5);
    }

    #[tokio::test]
    async fn analysis_derives_categories() {
        let store = seeded().await;
        let ingredients = vec![
            Ingredient { name: "pasta".into(), quantity: 1.0, unit: "oz".into(), required: true },
            Ingredient { name: "saffron".into(), quantity: 1.0, unit: "g".into(), required: true },
            Ingredient { name: "Pasta".into(), quantity: 1.0, unit: "oz".into(), required: true },
        ];
        let a = analyze_ingredients(store.as_ref(), &ingredients).await.unwrap();
        assert_eq!(a.categories, vec!["grains".to_string(), "other".to_string()]);
        assert_eq!(a.totals.calories, 400.0);
    }

    #[tokio::test]
    async fn dietary_compatibility_flags_allergens() {
        let store = seeded().await;
        let report = dietary_compatibility(
            store.as_ref(),
            &["pasta".into(), "parmesan".into(), "fresh basil".into(), "mystery".into()],
            &["Gluten-Free".into(), "dairy-free".into(), "nut-free".into()],
        )
        .await
        .unwrap();
        assert!(!report.compatible);
        assert_eq!(report.issues, vec!["pasta contains gluten", "parmesan contains dairy"]);
        assert_eq!(report.suggestions.len(), 2);

        let ok = dietary_compatibility(store.as_ref(), &["fresh basil".into()], &["vegan".into()])
            .await
            .unwrap();
        assert!(ok.compatible);
        assert!(ok.issues.is_empty());
    }

    #[tokio::test]
    async fn estimate_degrades_on_outage_but_not_on_bad_output() {
        let h = Harness::new();
        for _ in 0..3 {
            h.llm.push_err(Operation::NutritionEstimate, GenerationError::Unavailable("503".into()));
        }
        let est = estimate(&h.state, "Dragonfruit", "1 cup").await.unwrap();
        assert_eq!(est, NutritionEstimate::unknown());

        h.llm.push_ok(Operation::NutritionEstimate, r#"{"calories": 60}"#);
        let err = estimate(&h.state, "dragonfruit", "1 cup").await.unwrap_err();
        assert!(matches!(err, AppError::DownstreamFormat(_)));
    }
}
