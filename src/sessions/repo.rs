use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{CookingSession, SessionRow};
use crate::recipes::repo_types::db_int;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &CookingSession) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CookingSession>>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CookingSession>>;
    /// Write `session` only if the stored row is still at `expected_version`.
    /// Returns false when another writer got there first.
    async fn update(&self, session: &CookingSession, expected_version: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const SESSION_COLUMNS: &str = r#"
    id, user_id, base_recipe_id, status, decisions_made, current_step,
    final_ingredients, final_steps, final_nutrition, final_cost, total_time_minutes,
    session_photos, voice_interactions, started_at, completed_at, rating, notes,
    would_make_again, shared, share_url, last_updated, version
"#;

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, s: &CookingSession) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cooking_sessions (
                id, user_id, base_recipe_id, status, decisions_made, current_step,
                final_ingredients, final_steps, final_nutrition, final_cost, total_time_minutes,
                session_photos, voice_interactions, started_at, completed_at, rating, notes,
                would_make_again, shared, share_url, last_updated, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22)
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(s.base_recipe_id)
        .bind(s.status.as_str())
        .bind(Json(&s.decisions_made))
        .bind(db_int(s.current_step, "current_step")?)
        .bind(Json(&s.final_ingredients))
        .bind(Json(&s.final_steps))
        .bind(Json(&s.final_nutrition))
        .bind(s.final_cost)
        .bind(db_int(s.total_time_minutes, "total_time_minutes")?)
        .bind(Json(&s.session_photos))
        .bind(Json(&s.voice_interactions))
        .bind(s.started_at)
        .bind(s.completed_at)
        .bind(s.rating.map(i16::from))
        .bind(&s.notes)
        .bind(s.would_make_again)
        .bind(s.shared)
        .bind(&s.share_url)
        .bind(s.last_updated)
        .bind(s.version)
        .execute(&self.db)
        .await
        .context("insert cooking session")?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CookingSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM cooking_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get cooking session")?;
        row.map(CookingSession::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CookingSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM cooking_sessions WHERE user_id = $1 ORDER BY started_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list cooking sessions")?;
        rows.into_iter().map(CookingSession::try_from).collect()
    }

    async fn update(&self, s: &CookingSession, expected_version: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE cooking_sessions SET
                status = $3,
                decisions_made = $4,
                current_step = $5,
                final_ingredients = $6,
                final_steps = $7,
                final_nutrition = $8,
                final_cost = $9,
                total_time_minutes = $10,
                session_photos = $11,
                voice_interactions = $12,
                completed_at = $13,
                rating = $14,
                notes = $15,
                would_make_again = $16,
                shared = $17,
                share_url = $18,
                last_updated = $19,
                version = $20
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(s.id)
        .bind(expected_version)
        .bind(s.status.as_str())
        .bind(Json(&s.decisions_made))
        .bind(db_int(s.current_step, "current_step")?)
        .bind(Json(&s.final_ingredients))
        .bind(Json(&s.final_steps))
        .bind(Json(&s.final_nutrition))
        .bind(s.final_cost)
        .bind(db_int(s.total_time_minutes, "total_time_minutes")?)
        .bind(Json(&s.session_photos))
        .bind(Json(&s.voice_interactions))
        .bind(s.completed_at)
        .bind(s.rating.map(i16::from))
        .bind(&s.notes)
        .bind(s.would_make_again)
        .bind(s.shared)
        .bind(&s.share_url)
        .bind(s.last_updated)
        .bind(s.version)
        .execute(&self.db)
        .await
        .context("update cooking session")?;
        Ok(res.rows_affected() == 1)
    }
}
