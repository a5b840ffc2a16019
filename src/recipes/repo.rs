use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{db_int, BaseRecipe, RecipeRow};

/// Append-only catalog of base recipes.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn insert(&self, recipe: &BaseRecipe) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<BaseRecipe>>;
    /// Most recent first.
    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<BaseRecipe>>;
    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const RECIPE_COLUMNS: &str = r#"
    id, name, description, cuisine_type, difficulty_level,
    prep_time_minutes, cook_time_minutes, servings,
    base_ingredients, base_steps, branch_points, base_nutrition, base_cost_estimate,
    dietary_tags, ingredient_categories, image_path, created_by, created_at
"#;

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn insert(&self, r: &BaseRecipe) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO base_recipes (
                id, name, description, cuisine_type, difficulty_level,
                prep_time_minutes, cook_time_minutes, servings,
                base_ingredients, base_steps, branch_points, base_nutrition, base_cost_estimate,
                dietary_tags, ingredient_categories, image_path, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(r.id)
        .bind(&r.name)
        .bind(&r.description)
        .bind(&r.cuisine_type)
        .bind(&r.difficulty_level)
        .bind(db_int(r.prep_time_minutes, "prep_time_minutes")?)
        .bind(db_int(r.cook_time_minutes, "cook_time_minutes")?)
        .bind(db_int(r.servings, "servings")?)
        .bind(Json(&r.base_ingredients))
        .bind(Json(&r.base_steps))
        .bind(Json(&r.branch_points))
        .bind(Json(&r.base_nutrition))
        .bind(r.base_cost_estimate)
        .bind(&r.dietary_tags)
        .bind(&r.ingredient_categories)
        .bind(&r.image_path)
        .bind(&r.created_by)
        .bind(r.created_at)
        .execute(&self.db)
        .await
        .context("insert base recipe")?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<BaseRecipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM base_recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get base recipe")?;
        Ok(row.map(BaseRecipe::from))
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<BaseRecipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM base_recipes ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list recent recipes")?;
        Ok(rows.into_iter().map(BaseRecipe::from).collect())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM base_recipes")
            .fetch_one(&self.db)
            .await
            .context("count recipes")?;
        Ok(n)
    }
}
