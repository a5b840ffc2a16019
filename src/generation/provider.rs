use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::GenerationError;

/// Which adapter operation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Recompose,
    NutritionEstimate,
    PantryScan,
    Question,
    Story,
    RecipeGeneration,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recompose => "recompose",
            Self::NutritionEstimate => "nutrition_estimate",
            Self::PantryScan => "pantry_scan",
            Self::Question => "question",
            Self::Story => "story",
            Self::RecipeGeneration => "recipe_generation",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Attached image, passed to vision models by URL.
    pub image_url: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn user_with_image(content: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_url: Some(image_url.into()),
        }
    }
}

/// Strict JSON schema the model output must conform to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub operation: Operation,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub schema: Option<ResponseSchema>,
}

/// Raw text completion against a chat model.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError>;

    fn provider_name(&self) -> &'static str;
}
