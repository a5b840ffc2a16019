//! Process-local persistence used when no database is configured, and by tests.
//! Orderings follow the Postgres queries.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::nutrition::repo::NutritionStore;
use crate::nutrition::repo_types::NutritionData;
use crate::pantry::repo::PantryStore;
use crate::pantry::repo_types::PantryItem;
use crate::recipes::repo::RecipeStore;
use crate::recipes::repo_types::BaseRecipe;
use crate::sessions::repo::SessionStore;
use crate::sessions::repo_types::CookingSession;

#[derive(Default)]
pub struct MemoryStore {
    /// Insertion order.
    recipes: RwLock<Vec<BaseRecipe>>,
    /// Insertion order.
    sessions: RwLock<Vec<CookingSession>>,
    /// Keyed by lowercase ingredient name.
    nutrition: RwLock<HashMap<String, NutritionData>>,
    pantry: RwLock<Vec<PantryItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_name(a: &NutritionData, b: &NutritionData) -> std::cmp::Ordering {
    a.ingredient_name.cmp(&b.ingredient_name)
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn insert(&self, recipe: &BaseRecipe) -> anyhow::Result<()> {
        let mut recipes = self.recipes.write().await;
        anyhow::ensure!(
            recipes.iter().all(|r| r.id != recipe.id),
            "duplicate recipe id {}",
            recipe.id
        );
        recipes.push(recipe.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<BaseRecipe>> {
        Ok(self.recipes.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<BaseRecipe>> {
        let mut out: Vec<BaseRecipe> = self.recipes.read().await.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.recipes.read().await.len() as i64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &CookingSession) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        anyhow::ensure!(
            sessions.iter().all(|s| s.id != session.id),
            "duplicate session id {}",
            session.id
        );
        sessions.push(session.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CookingSession>> {
        Ok(self.sessions.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CookingSession>> {
        let mut out: Vec<CookingSession> = self
            .sessions
            .read()
            .await
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(out)
    }

    async fn update(&self, session: &CookingSession, expected_version: i64) -> anyhow::Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions
            .iter_mut()
            .find(|s| s.id == session.id && s.version == expected_version)
        {
            Some(slot) => {
                *slot = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl NutritionStore for MemoryStore {
    async fn get(&self, canonical: &str) -> anyhow::Result<Option<NutritionData>> {
        Ok(self.nutrition.read().await.get(canonical).cloned())
    }

    async fn get_many(&self, canonical: &[String]) -> anyhow::Result<Vec<NutritionData>> {
        let map = self.nutrition.read().await;
        Ok(canonical.iter().filter_map(|n| map.get(n).cloned()).collect())
    }

    async fn search(&self, query: &str, limit: i64) -> anyhow::Result<Vec<NutritionData>> {
        let needle = query.to_lowercase();
        let mut out: Vec<NutritionData> = self
            .nutrition
            .read()
            .await
            .values()
            .filter(|n| {
                n.ingredient_name.to_lowercase().contains(&needle)
                    || n.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        out.sort_by(by_name);
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn by_category(&self, category: &str) -> anyhow::Result<Vec<NutritionData>> {
        let mut out: Vec<NutritionData> = self
            .nutrition
            .read()
            .await
            .values()
            .filter(|n| n.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect();
        out.sort_by(by_name);
        Ok(out)
    }

    async fn upsert(&self, record: &NutritionData) -> anyhow::Result<NutritionData> {
        let mut map = self.nutrition.write().await;
        let key = record.ingredient_name.to_lowercase();
        let mut stored = record.clone();
        if let Some(existing) = map.get(&key) {
            stored.id = existing.id;
            stored.created_at = existing.created_at;
        }
        map.insert(key, stored.clone());
        Ok(stored)
    }

    async fn upsert_many(&self, records: &[NutritionData]) -> anyhow::Result<u64> {
        for r in records {
            NutritionStore::upsert(self, r).await?;
        }
        Ok(records.len() as u64)
    }

    async fn update_cost(&self, canonical: &str, cost: f64) -> anyhow::Result<Option<NutritionData>> {
        let mut map = self.nutrition.write().await;
        Ok(map.get_mut(canonical).map(|n| {
            n.cost_per_serving = Some(cost);
            n.last_updated = OffsetDateTime::now_utc();
            n.clone()
        }))
    }
}

fn pantry_order(a: &PantryItem, b: &PantryItem) -> std::cmp::Ordering {
    a.category
        .to_lowercase()
        .cmp(&b.category.to_lowercase())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

#[async_trait]
impl PantryStore for MemoryStore {
    async fn insert(&self, item: &PantryItem) -> anyhow::Result<()> {
        self.pantry.write().await.push(item.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<PantryItem>> {
        let mut out: Vec<PantryItem> = self
            .pantry
            .read()
            .await
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(pantry_order);
        Ok(out)
    }

    async fn update_quantity(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: f64,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PantryItem>> {
        let mut items = self.pantry.write().await;
        Ok(items
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .map(|p| {
                p.quantity = quantity;
                p.last_updated = now;
                p.clone()
            }))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut items = self.pantry.write().await;
        let before = items.len();
        items.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(items.len() != before)
    }

    async fn search(&self, user_id: Uuid, query: &str) -> anyhow::Result<Vec<PantryItem>> {
        let needle = query.to_lowercase();
        let mut out: Vec<PantryItem> = self
            .pantry
            .read()
            .await
            .iter()
            .filter(|p| p.user_id == user_id && p.matches(&needle))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(out)
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;
    use crate::recipes::repo_types::RecipeNutrition;
    use crate::sessions::repo_types::SessionStatus;

    fn recipe(name: &str) -> BaseRecipe {
        BaseRecipe {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            cuisine_type: String::new(),
            difficulty_level: String::new(),
            prep_time_minutes: 5,
            cook_time_minutes: 10,
            servings: 1,
            base_ingredients: vec![],
            base_steps: vec![],
            branch_points: vec![],
            base_nutrition: RecipeNutrition::default(),
            base_cost_estimate: 0.0,
            dietary_tags: vec![],
            ingredient_categories: vec![],
            image_path: None,
            created_by: "t".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn recent_recipes_break_ties_by_insertion() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            RecipeStore::insert(&store, &recipe(name)).await.unwrap();
        }
        let names: Vec<_> = store
            .list_recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn session_update_is_a_version_check() {
        let store = MemoryStore::new();
        let mut s = CookingSession::start(Uuid::new_v4(), &recipe("r"), OffsetDateTime::now_utc());
        SessionStore::insert(&store, &s).await.unwrap();

        s.status = SessionStatus::Completed;
        s.version = 1;
        assert!(store.update(&s, 0).await.unwrap());
        // same expectation again loses
        s.version = 2;
        assert!(!store.update(&s, 0).await.unwrap());

        let stored = SessionStore::get(&store, s.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, SessionStatus::Completed);
    }
}
