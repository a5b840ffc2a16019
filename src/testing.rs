//! Fixtures shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, GenerationConfig, JwtConfig, MediaConfig};
use crate::generation::fake::FakeProvider;
use crate::generation::LlmGenerator;
use crate::memory::MemoryStore;
use crate::nutrition::dto::NutritionInput;
use crate::pantry::dto::NewPantryItem;
use crate::recipes::dto::NewRecipe;
use crate::recipes::repo_types::{BranchOption, BranchPoint, Ingredient, RecipeStep};
use crate::state::AppState;
use crate::storage::fake::FakeStorage;

pub fn test_generation_config() -> GenerationConfig {
    GenerationConfig {
        api_key: "test-key".into(),
        base_url: "http://generation.invalid/v1".into(),
        model: "test/text-model".into(),
        vision_model: "test/vision-model".into(),
        timeout_secs: 5,
        max_retries: 2,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "cookpath".into(),
            audience: "cookpath-users".into(),
        },
        media: MediaConfig {
            endpoint: "http://minio.invalid".into(),
            bucket: "media".into(),
            access_key: "a".into(),
            secret_key: "s".into(),
            region: "us-east-1".into(),
            url_ttl_secs: 600,
        },
        generation: test_generation_config(),
        public_base_url: "https://cookpath.test".into(),
        seed_sample_data: false,
    }
}

/// App state over in-memory stores, fake storage and a scripted model.
pub struct Harness {
    pub state: AppState,
    pub llm: Arc<FakeProvider>,
    pub storage: Arc<FakeStorage>,
}

impl Harness {
    pub fn new() -> Self {
        let config = test_config();
        let llm = Arc::new(FakeProvider::new());
        let storage = Arc::new(FakeStorage::default());
        let generator = LlmGenerator::new(llm.clone(), &config.generation)
            .with_retry_base(Duration::from_millis(1));
        let state = AppState::in_memory(
            Arc::new(config),
            storage.clone(),
            Arc::new(generator),
            Arc::new(MemoryStore::new()),
        );
        Self { state, llm, storage }
    }
}

pub fn nutrition_input(name: &str, calories: f64, category: &str) -> NutritionInput {
    NutritionInput {
        ingredient_name: name.into(),
        serving_size: "1 unit".into(),
        calories,
        protein_g: 0.0,
        carbs_g: 0.0,
        fat_g: 0.0,
        fiber_g: 0.0,
        sugar_g: 0.0,
        sodium_mg: 0.0,
        vitamin_c_mg: None,
        vitamin_a_iu: None,
        calcium_mg: None,
        iron_mg: None,
        potassium_mg: None,
        cost_per_serving: None,
        allergens: vec![],
        category: category.into(),
        data_source: "test".into(),
        verified: false,
    }
}

pub fn pantry_input(name: &str, category: &str) -> NewPantryItem {
    NewPantryItem {
        name: name.into(),
        brand: None,
        category: category.into(),
        quantity: 1.0,
        unit: "unit".into(),
        expiration_date: None,
        barcode: None,
        image_path: None,
        cost_per_unit: None,
        tags: vec![],
    }
}

fn ingredient(name: &str, quantity: f64, unit: &str, required: bool) -> Ingredient {
    Ingredient {
        name: name.into(),
        quantity,
        unit: unit.into(),
        required,
    }
}

fn step(n: u32, instruction: &str, minutes: u32) -> RecipeStep {
    RecipeStep {
        step: n,
        instruction: instruction.into(),
        time_minutes: minutes,
    }
}

/// Five ingredients (three required), five steps, one branch point at step 3.
pub fn sample_recipe_def() -> NewRecipe {
    NewRecipe {
        name: "Weeknight Tomato Pasta".into(),
        description: "A quick pasta with a sauce you steer".into(),
        cuisine_type: "Italian".into(),
        difficulty_level: "easy".into(),
        prep_time_minutes: 10,
        cook_time_minutes: 20,
        servings: 4,
        ingredients: vec![
            ingredient("pasta", 12.0, "oz", true),
            ingredient("cherry tomatoes", 2.0, "cups", true),
            ingredient("garlic", 3.0, "cloves", true),
            ingredient("fresh basil", 0.25, "cup", false),
            ingredient("parmesan", 0.5, "cup", false),
        ],
        steps: vec![
            step(1, "Bring a large pot of salted water to a boil", 10),
            step(2, "Cook the pasta until al dente", 10),
            step(3, "Build the sauce", 8),
            step(4, "Toss pasta with the sauce", 2),
            step(5, "Finish and serve", 1),
        ],
        branch_points: vec![BranchPoint {
            step: 3,
            question: "Which sauce style?".into(),
            options: vec![
                BranchOption { choice: "classic".into(), description: "Garlic and olive oil".into() },
                BranchOption { choice: "spicy".into(), description: "Add chili flakes".into() },
                BranchOption { choice: "herb".into(), description: "Lots of fresh herbs".into() },
            ],
        }],
        dietary_tags: vec!["vegetarian".into()],
        image_path: None,
    }
}
