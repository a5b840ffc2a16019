use serde::{Deserialize, Serialize};

use crate::recipes::repo_types::BaseRecipe;

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    /// Comma-separated dietary tags, e.g. `vegan,gluten-free`.
    #[serde(default)]
    pub dietary: Option<String>,
}

impl RecommendQuery {
    pub fn restrictions(&self) -> Vec<String> {
        self.dietary
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub recipe: BaseRecipe,
    pub match_percentage: f64,
    pub missing_ingredients: Vec<String>,
}
