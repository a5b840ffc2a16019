use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db;
use crate::generation::{GenerationAdapter, LlmGenerator, OpenRouterProvider};
use crate::memory::MemoryStore;
use crate::nutrition::repo::{NutritionStore, PgNutritionStore};
use crate::pantry::repo::{PantryStore, PgPantryStore};
use crate::recipes::repo::{PgRecipeStore, RecipeStore};
use crate::sessions::repo::{PgSessionStore, SessionStore};
use crate::sessions::SessionLocks;
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub generator: Arc<dyn GenerationAdapter>,
    pub recipes: Arc<dyn RecipeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub nutrition: Arc<dyn NutritionStore>,
    pub pantry: Arc<dyn PantryStore>,
    pub session_locks: SessionLocks,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        // S3/MinIO
        let storage = Arc::new(Storage::new(&config.media).await?) as Arc<dyn StorageClient>;

        let provider = Arc::new(OpenRouterProvider::new(&config.generation)?);
        let generator = Arc::new(LlmGenerator::new(provider, &config.generation)) as Arc<dyn GenerationAdapter>;

        let state = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await;
                info!("using postgres persistence");
                Self {
                    recipes: Arc::new(PgRecipeStore::new(pool.clone())),
                    sessions: Arc::new(PgSessionStore::new(pool.clone())),
                    nutrition: Arc::new(PgNutritionStore::new(pool.clone())),
                    pantry: Arc::new(PgPantryStore::new(pool)),
                    config: config.clone(),
                    storage,
                    generator,
                    session_locks: SessionLocks::default(),
                }
            }
            None => {
                warn!("DATABASE_URL not set; data lives in memory and is lost on restart");
                Self::in_memory(config.clone(), storage, generator, Arc::new(MemoryStore::new()))
            }
        };
        Ok(state)
    }

    /// All four stores backed by one in-memory instance.
    pub fn in_memory(
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        generator: Arc<dyn GenerationAdapter>,
        store: Arc<MemoryStore>,
    ) -> Self {
        Self {
            config,
            storage,
            generator,
            recipes: store.clone(),
            sessions: store.clone(),
            nutrition: store.clone(),
            pantry: store,
            session_locks: SessionLocks::default(),
        }
    }
}
