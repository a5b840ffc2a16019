use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{PantryItem, PantryRow};
use crate::db::contains_pattern;

/// Per-user pantry records. Every query is scoped by owner.
#[async_trait]
pub trait PantryStore: Send + Sync {
    async fn insert(&self, item: &PantryItem) -> anyhow::Result<()>;
    /// Ordered by category, then name.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<PantryItem>>;
    async fn update_quantity(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: f64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PantryItem>>;
    /// Returns whether a row was removed.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
    /// Name, brand or category substring; ordered by name.
    async fn search(&self, user_id: Uuid, query: &str) -> anyhow::Result<Vec<PantryItem>>;
}

#[derive(Clone)]
pub struct PgPantryStore {
    db: PgPool,
}

impl PgPantryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const PANTRY_COLUMNS: &str = r#"
    id, user_id, name, brand, category, quantity, unit, expiration_date, barcode,
    image_path, nutrition_per_unit, cost_per_unit, tags, created_at, last_updated
"#;

#[async_trait]
impl PantryStore for PgPantryStore {
    async fn insert(&self, i: &PantryItem) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pantry_items (
                id, user_id, name, brand, category, quantity, unit, expiration_date, barcode,
                image_path, nutrition_per_unit, cost_per_unit, tags, created_at, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(i.id)
        .bind(i.user_id)
        .bind(&i.name)
        .bind(&i.brand)
        .bind(&i.category)
        .bind(i.quantity)
        .bind(&i.unit)
        .bind(i.expiration_date)
        .bind(&i.barcode)
        .bind(&i.image_path)
        .bind(i.nutrition_per_unit.as_ref().map(Json))
        .bind(i.cost_per_unit)
        .bind(&i.tags)
        .bind(i.created_at)
        .bind(i.last_updated)
        .execute(&self.db)
        .await
        .context("insert pantry item")?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<PantryItem>> {
        let rows = sqlx::query_as::<_, PantryRow>(&format!(
            "SELECT {PANTRY_COLUMNS} FROM pantry_items WHERE user_id = $1 ORDER BY lower(category), lower(name)"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list pantry items")?;
        Ok(rows.into_iter().map(PantryItem::from).collect())
    }

    async fn update_quantity(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: f64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PantryItem>> {
        let row = sqlx::query_as::<_, PantryRow>(&format!(
            r#"
            UPDATE pantry_items SET quantity = $3, last_updated = $4
            WHERE id = $1 AND user_id = $2
            RETURNING {PANTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("update pantry quantity")?;
        Ok(row.map(PantryItem::from))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM pantry_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete pantry item")?;
        Ok(res.rows_affected() > 0)
    }

    async fn search(&self, user_id: Uuid, query: &str) -> anyhow::Result<Vec<PantryItem>> {
        let pattern = contains_pattern(query);
        let rows = sqlx::query_as::<_, PantryRow>(&format!(
            r#"
            SELECT {PANTRY_COLUMNS} FROM pantry_items
            WHERE user_id = $1
              AND (lower(name) LIKE $2 ESCAPE '\'
                   OR lower(coalesce(brand, '')) LIKE $2 ESCAPE '\'
                   OR lower(category) LIKE $2 ESCAPE '\')
            ORDER BY lower(name)
            "#
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.db)
        .await
        .context("search pantry items")?;
        Ok(rows.into_iter().map(PantryItem::from).collect())
    }
}
