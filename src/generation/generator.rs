use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::provider::{ChatMessage, ChatRequest, LlmProvider, Operation, ResponseSchema};
use super::types::{
    WireCookingAnswer, WireNutritionEstimate, WirePantryScan, WireRecipeDraft, WireRecompose,
};
use super::{
    schema, CookingAnswer, GenerationAdapter, GenerationError, NutritionEstimate, PantryScanItem,
    QuestionRequest, RecipeDraft, RecipeGenerationRequest, RecomposeRequest, RecomposedRecipe,
    StoryRequest,
};
use crate::config::GenerationConfig;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct LlmGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    vision_model: String,
    timeout: Duration,
    max_retries: u32,
    retry_base: Duration,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, cfg: &GenerationConfig) -> Self {
        Self {
            provider,
            model: cfg.model.clone(),
            vision_model: cfg.vision_model.clone(),
            timeout: cfg.timeout(),
            max_retries: cfg.max_retries,
            retry_base: Duration::from_millis(500),
        }
    }

    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    fn request(
        &self,
        operation: Operation,
        messages: Vec<ChatMessage>,
        schema: Option<ResponseSchema>,
    ) -> ChatRequest {
        let model = match operation {
            Operation::PantryScan => self.vision_model.clone(),
            _ => self.model.clone(),
        };
        ChatRequest {
            operation,
            model,
            messages,
            schema,
        }
    }

    /// One bounded attempt.
    async fn call(&self, req: &ChatRequest) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.provider.complete(req)).await {
            Ok(res) => res,
            Err(_) => {
                warn!(provider = self.provider.provider_name(), operation = %req.operation, timeout_ms = self.timeout.as_millis() as u64, "generation call timed out");
                Err(GenerationError::Timeout)
            }
        }
    }

    /// Exponential backoff on transient failures. Only for idempotent operations.
    async fn call_with_retry(&self, req: &ChatRequest) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.call(req).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_base * 2u32.pow(attempt);
                    warn!(operation = %req.operation, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying generation call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn decode<W, T>(&self, operation: Operation, raw: &str) -> Result<T, GenerationError>
    where
        W: DeserializeOwned,
        T: TryFrom<W, Error = GenerationError>,
    {
        let result = serde_json::from_str::<W>(raw)
            .map_err(|e| GenerationError::Format(e.to_string()))
            .and_then(<T as TryFrom<W>>::try_from);
        if let Err(e) = &result {
            warn!(
                %operation,
                error = %e,
                raw_preview = %preview(raw),
                "rejected malformed generation output"
            );
        }
        result
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

fn to_json<T: serde::Serialize>(v: &T) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".into())
}

#[async_trait]
impl GenerationAdapter for LlmGenerator {
    async fn recompose(&self, req: &RecomposeRequest) -> Result<RecomposedRecipe, GenerationError> {
        let choice = match &req.choice_description {
            Some(d) => format!("{} ({})", req.choice, d),
            None => req.choice.clone(),
        };
        let request = self.request(
            Operation::Recompose,
            vec![
                ChatMessage::system(
                    "You are a cooking expert who rewrites recipes after the cook makes a choice. \
                     Return the complete updated recipe, recalculating every affected ingredient, \
                     step, time, nutrition value and cost.",
                ),
                ChatMessage::user(format!(
                    "Current ingredients: {}\nCurrent steps: {}\nDecision: {} -> {}\n\
                     Update the recipe to reflect this choice.",
                    to_json(&req.ingredients),
                    to_json(&req.steps),
                    req.question,
                    choice
                )),
            ],
            Some(schema::recompose()),
        );
        // never retried: the caller applies the result exactly once
        let raw = self.call(&request).await?;
        self.decode::<WireRecompose, _>(Operation::Recompose, &raw)
    }

    async fn estimate_nutrition(
        &self,
        ingredient: &str,
        serving_size: &str,
    ) -> Result<NutritionEstimate, GenerationError> {
        let request = self.request(
            Operation::NutritionEstimate,
            vec![
                ChatMessage::system(
                    "You are a nutrition expert. Estimate nutrition facts for food ingredients \
                     using USDA reference data.",
                ),
                ChatMessage::user(format!(
                    "Ingredient: {}\nServing size: {}",
                    ingredient, serving_size
                )),
            ],
            Some(schema::nutrition_estimate()),
        );
        let raw = self.call_with_retry(&request).await?;
        self.decode::<WireNutritionEstimate, _>(Operation::NutritionEstimate, &raw)
    }

    async fn scan_pantry(&self, image_url: &str) -> Result<Vec<PantryScanItem>, GenerationError> {
        let request = self.request(
            Operation::PantryScan,
            vec![
                ChatMessage::system(
                    "You are a food recognition expert. Identify food items in kitchen and pantry \
                     photos with approximate quantities.",
                ),
                ChatMessage::user_with_image(
                    "List every food item in this image. Estimate each quantity and suggest a unit \
                     of measurement. Focus on packaged goods, fresh produce and pantry staples.",
                    image_url,
                ),
            ],
            Some(schema::pantry_scan()),
        );
        let raw = self.call(&request).await?;
        self.decode::<WirePantryScan, _>(Operation::PantryScan, &raw)
    }

    async fn answer_question(&self, req: &QuestionRequest) -> Result<CookingAnswer, GenerationError> {
        let request = self.request(
            Operation::Question,
            vec![
                ChatMessage::system(format!(
                    "You are a helpful cooking assistant talking to someone who is cooking right now.\n\
                     Ingredients: {}\nCurrent step: {}\nSteps: {}\n\
                     Answer concisely. If the question implies a substitution that would \
                     meaningfully change the recipe, set creates_branch.",
                    to_json(&req.ingredients),
                    req.current_step,
                    to_json(&req.steps)
                )),
                ChatMessage::user(req.question.clone()),
            ],
            Some(schema::cooking_answer()),
        );
        let raw = self.call(&request).await?;
        self.decode::<WireCookingAnswer, _>(Operation::Question, &raw)
    }

    async fn write_story(&self, req: &StoryRequest) -> Result<String, GenerationError> {
        let rating = req
            .rating
            .map(|r| format!("{}/5 stars", r))
            .unwrap_or_else(|| "not rated".into());
        let request = self.request(
            Operation::Story,
            vec![
                ChatMessage::system(
                    "You write short, warm stories about home cooking sessions.",
                ),
                ChatMessage::user(format!(
                    "Recipe: {}\nDecisions made: {}\nQuestions asked while cooking: {}\n\
                     Final nutrition: {}\nRating: {}\n\
                     Tell the story of this session and highlight the choices that made it unique.",
                    req.recipe_name,
                    to_json(&req.decisions),
                    to_json(&req.voice_interactions),
                    to_json(&req.nutrition),
                    rating
                )),
            ],
            None,
        );
        let raw = self.call_with_retry(&request).await?;
        let story = raw.trim();
        if story.is_empty() {
            return Err(GenerationError::Format("empty story".into()));
        }
        debug!(session_id = %req.session_id, len = story.len(), "story generated");
        Ok(story.to_string())
    }

    async fn generate_recipe(
        &self,
        req: &RecipeGenerationRequest,
    ) -> Result<RecipeDraft, GenerationError> {
        let mut prompt = format!(
            "Create a complete recipe using primarily these ingredients: {}.",
            req.ingredients.join(", ")
        );
        if !req.dietary_restrictions.is_empty() {
            prompt.push_str(&format!(
                " The recipe must be {}.",
                req.dietary_restrictions.join(", ")
            ));
        }
        if let Some(cuisine) = &req.cuisine {
            prompt.push_str(&format!(" Make it {} cuisine style.", cuisine));
        }
        prompt.push_str(
            "\nInclude a name and description, every ingredient with quantities, numbered steps, \
             two or three branch points where the cook chooses between options that change the \
             dish, prep and cook times, and servings.",
        );

        let request = self.request(
            Operation::RecipeGeneration,
            vec![
                ChatMessage::system(
                    "You are a creative chef who designs interactive recipes with branching choices.",
                ),
                ChatMessage::user(prompt),
            ],
            Some(schema::recipe_generation()),
        );
        let raw = self.call(&request).await?;
        self.decode::<WireRecipeDraft, _>(Operation::RecipeGeneration, &raw)
    }
}

#[cfg(test)]
mod generator_tests {
    use super::*;
    use crate::generation::fake::FakeProvider;
    use crate::testing::test_generation_config;

    fn generator(fake: Arc<FakeProvider>) -> LlmGenerator {
        LlmGenerator::new(fake, &test_generation_config()).with_retry_base(Duration::from_millis(1))
    }

    const ESTIMATE: &str = r#"{"calories": 95, "protein_g": 0.5, "carbs_g": 25, "fat_g": 0.3,
        "fiber_g": 4.4, "sugar_g": 19, "sodium_mg": 2, "category": "fruit", "confidence": "high"}"#;

    #[tokio::test]
    async fn estimate_retries_transient_failures() {
        let fake = Arc::new(FakeProvider::new());
        fake.push_err(Operation::NutritionEstimate, GenerationError::Unavailable("502".into()));
        fake.push_err(Operation::NutritionEstimate, GenerationError::Timeout);
        fake.push_ok(Operation::NutritionEstimate, ESTIMATE);

        let est = generator(fake.clone())
            .estimate_nutrition("apple", "1 medium")
            .await
            .unwrap();
        assert_eq!(est.category, "fruit");
        assert_eq!(fake.calls(Operation::NutritionEstimate), 3);
    }

    #[tokio::test]
    async fn estimate_does_not_retry_format_errors() {
        let fake = Arc::new(FakeProvider::new());
        fake.push_ok(Operation::NutritionEstimate, r#"{"calories": "lots"}"#);
        fake.push_ok(Operation::NutritionEstimate, ESTIMATE);

        let err = generator(fake.clone())
            .estimate_nutrition("apple", "1 medium")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Format(_)));
        assert_eq!(fake.calls(Operation::NutritionEstimate), 1);
    }

    #[tokio::test]
    async fn recompose_is_attempted_once() {
        let fake = Arc::new(FakeProvider::new());
        fake.push_err(Operation::Recompose, GenerationError::Unavailable("down".into()));

        let req = RecomposeRequest {
            ingredients: vec![],
            steps: vec![],
            question: "Spice?".into(),
            choice: "spicy".into(),
            choice_description: None,
        };
        let err = generator(fake.clone()).recompose(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
        assert_eq!(fake.calls(Operation::Recompose), 1);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let fake = Arc::new(FakeProvider::new().with_delay(Duration::from_secs(5)));
        fake.push_ok(Operation::Question, r#"{"answer": "yes", "creates_branch": false, "suggested_modification": null}"#);

        let mut cfg = test_generation_config();
        cfg.timeout_secs = 0;
        let gen = LlmGenerator::new(fake, &cfg);
        let req = QuestionRequest {
            ingredients: vec![],
            steps: vec![],
            current_step: 1,
            question: "Is it done?".into(),
        };
        let err = gen.answer_question(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout));
    }

    #[tokio::test]
    async fn scan_uses_the_vision_model() {
        let fake = Arc::new(FakeProvider::new());
        fake.push_ok(Operation::PantryScan, r#"{"items": []}"#);
        let items = generator(fake.clone())
            .scan_pantry("https://fake.local/p.jpg")
            .await
            .unwrap();
        assert!(items.is_empty());
        let last = fake.last_request(Operation::PantryScan).unwrap();
        assert_eq!(last.model, test_generation_config().vision_model);
        assert!(last.messages.iter().any(|m| m.image_url.is_some()));
    }

    #[tokio::test]
    async fn blank_story_is_a_format_error() {
        let fake = Arc::new(FakeProvider::new());
        fake.push_ok(Operation::Story, "   ");
        let req = StoryRequest {
            session_id: uuid::Uuid::new_v4(),
            recipe_name: "Pasta".into(),
            decisions: vec![],
            voice_interactions: vec![],
            nutrition: Default::default(),
            rating: Some(4),
        };
        let err = generator(fake).write_story(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Format(_)));
    }
}
