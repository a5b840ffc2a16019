use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::NutritionData;
use crate::db::contains_pattern;

/// Ingredient lookup table keyed by canonical name.
#[async_trait]
pub trait NutritionStore: Send + Sync {
    async fn get(&self, canonical: &str) -> anyhow::Result<Option<NutritionData>>;
    async fn get_many(&self, canonical: &[String]) -> anyhow::Result<Vec<NutritionData>>;
    /// Name or category substring, ordered by name.
    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<NutritionData>>;
    async fn by_category(&self, category: &str) -> anyhow::Result<Vec<NutritionData>>;
    /// Insert or replace the row for `record.ingredient_name`. The stored row keeps
    /// its original id and created_at.
    async fn upsert(&self, record: &NutritionData) -> anyhow::Result<NutritionData>;
    /// Names in `records` must already be distinct.
    async fn upsert_many(&self, records: &[NutritionData]) -> anyhow::Result<u64>;
    async fn update_cost(&self, canonical: &str, cost: f64) -> anyhow::Result<Option<NutritionData>>;
}

#[derive(Clone)]
pub struct PgNutritionStore {
    db: PgPool,
}

impl PgNutritionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const NUTRITION_COLUMNS: &str = r#"
    id, ingredient_name, serving_size,
    calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg,
    vitamin_c_mg, vitamin_a_iu, calcium_mg, iron_mg, potassium_mg,
    cost_per_serving, allergens, category, data_source, verified,
    created_at, last_updated
"#;

const UPSERT_TAIL: &str = r#"
    ON CONFLICT ((lower(ingredient_name))) DO UPDATE SET
        serving_size = EXCLUDED.serving_size,
        calories = EXCLUDED.calories,
        protein_g = EXCLUDED.protein_g,
        carbs_g = EXCLUDED.carbs_g,
        fat_g = EXCLUDED.fat_g,
        fiber_g = EXCLUDED.fiber_g,
        sugar_g = EXCLUDED.sugar_g,
        sodium_mg = EXCLUDED.sodium_mg,
        vitamin_c_mg = EXCLUDED.vitamin_c_mg,
        vitamin_a_iu = EXCLUDED.vitamin_a_iu,
        calcium_mg = EXCLUDED.calcium_mg,
        iron_mg = EXCLUDED.iron_mg,
        potassium_mg = EXCLUDED.potassium_mg,
        cost_per_serving = EXCLUDED.cost_per_serving,
        allergens = EXCLUDED.allergens,
        category = EXCLUDED.category,
        data_source = EXCLUDED.data_source,
        verified = EXCLUDED.verified,
        last_updated = EXCLUDED.last_updated
"#;

// 22 binds per row keeps each statement well under the protocol's bind limit.
const BULK_CHUNK: usize = 500;

fn insert_builder<'a>() -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new(format!("INSERT INTO nutrition_data ({NUTRITION_COLUMNS}) "))
}

fn push_rows<'a>(qb: &mut QueryBuilder<'a, Postgres>, rows: &'a [NutritionData]) {
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.id)
            .push_bind(&r.ingredient_name)
            .push_bind(&r.serving_size)
            .push_bind(r.calories)
            .push_bind(r.protein_g)
            .push_bind(r.carbs_g)
            .push_bind(r.fat_g)
            .push_bind(r.fiber_g)
            .push_bind(r.sugar_g)
            .push_bind(r.sodium_mg)
            .push_bind(r.vitamin_c_mg)
            .push_bind(r.vitamin_a_iu)
            .push_bind(r.calcium_mg)
            .push_bind(r.iron_mg)
            .push_bind(r.potassium_mg)
            .push_bind(r.cost_per_serving)
            .push_bind(&r.allergens)
            .push_bind(&r.category)
            .push_bind(&r.data_source)
            .push_bind(r.verified)
            .push_bind(r.created_at)
            .push_bind(r.last_updated);
    });
    qb.push(UPSERT_TAIL);
}

#[async_trait]
impl NutritionStore for PgNutritionStore {
    async fn get(&self, canonical: &str) -> anyhow::Result<Option<NutritionData>> {
        sqlx::query_as::<_, NutritionData>(&format!(
            "SELECT {NUTRITION_COLUMNS} FROM nutrition_data WHERE lower(ingredient_name) = $1 LIMIT 1"
        ))
        .bind(canonical)
        .fetch_optional(&self.db)
        .await
        .context("get nutrition data")
    }

    async fn get_many(&self, canonical: &[String]) -> anyhow::Result<Vec<NutritionData>> {
        sqlx::query_as::<_, NutritionData>(&format!(
            "SELECT {NUTRITION_COLUMNS} FROM nutrition_data WHERE lower(ingredient_name) = ANY($1)"
        ))
        .bind(canonical)
        .fetch_all(&self.db)
        .await
        .context("get nutrition data batch")
    }

    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<NutritionData>> {
        let pattern = contains_pattern(query);
        sqlx::query_as::<_, NutritionData>(&format!(
            r#"
            SELECT {NUTRITION_COLUMNS} FROM nutrition_data
            WHERE lower(ingredient_name) LIKE $1 ESCAPE '\' OR lower(category) LIKE $1 ESCAPE '\'
            ORDER BY ingredient_name
            LIMIT $2
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("search nutrition data")
    }

    async fn by_category(&self, category: &str) -> anyhow::Result<Vec<NutritionData>> {
        sqlx::query_as::<_, NutritionData>(&format!(
            "SELECT {NUTRITION_COLUMNS} FROM nutrition_data WHERE lower(category) = lower($1) ORDER BY ingredient_name"
        ))
        .bind(category)
        .fetch_all(&self.db)
        .await
        .context("nutrition data by category")
    }

    async fn upsert(&self, record: &NutritionData) -> anyhow::Result<NutritionData> {
        let rows = std::slice::from_ref(record);
        let mut qb = insert_builder();
        push_rows(&mut qb, rows);
        qb.push(format!(" RETURNING {NUTRITION_COLUMNS}"));
        qb.build_query_as::<NutritionData>()
            .fetch_one(&self.db)
            .await
            .context("upsert nutrition data")
    }

    async fn upsert_many(&self, records: &[NutritionData]) -> anyhow::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut tx = self.db.begin().await.context("begin bulk upsert")?;
        let mut affected = 0;
        for chunk in records.chunks(BULK_CHUNK) {
            let mut qb = insert_builder();
            push_rows(&mut qb, chunk);
            affected += qb
                .build()
                .execute(&mut *tx)
                .await
                .context("bulk upsert nutrition data")?
                .rows_affected();
        }
        tx.commit().await.context("commit bulk upsert")?;
        Ok(affected)
    }

    async fn update_cost(&self, canonical: &str, cost: f64) -> anyhow::Result<Option<NutritionData>> {
        sqlx::query_as::<_, NutritionData>(&format!(
            r#"
            UPDATE nutrition_data
            SET cost_per_serving = $2, last_updated = now()
            WHERE lower(ingredient_name) = $1
            RETURNING {NUTRITION_COLUMNS}
            "#
        ))
        .bind(canonical)
        .bind(cost)
        .fetch_optional(&self.db)
        .await
        .context("update ingredient cost")
    }
}
