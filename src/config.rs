use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub generation: GenerationConfig,
    pub public_base_url: String,
    pub seed_sample_data: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cookpath".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cookpath-users".into()),
        };
        let media = MediaConfig {
            endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            url_ttl_secs: env_parse("MEDIA_URL_TTL_SECS", 30 * 60),
        };
        let generation = GenerationConfig {
            api_key: std::env::var("OPENROUTER_API_KEY").context("OPENROUTER_API_KEY")?,
            base_url: std::env::var("GENERATION_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".into()),
            model: std::env::var("GENERATION_MODEL").unwrap_or_else(|_| "openai/o4-mini".into()),
            vision_model: std::env::var("GENERATION_VISION_MODEL")
                .unwrap_or_else(|_| "google/gemini-2.5-flash-preview".into()),
            timeout_secs: env_parse("GENERATION_TIMEOUT_SECS", 60),
            max_retries: env_parse("GENERATION_MAX_RETRIES", 2),
        };

        Ok(Self {
            database_url,
            jwt,
            media,
            generation,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            seed_sample_data: env_parse("SEED_SAMPLE_DATA", false),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
