use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::nutrition::repo_types::NutritionSnapshot;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// One stocked ingredient owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(with = "iso_date::option")]
    pub expiration_date: Option<Date>,
    pub barcode: Option<String>,
    /// Storage key; never a URL.
    pub image_path: Option<String>,
    pub nutrition_per_unit: Option<NutritionSnapshot>,
    pub cost_per_unit: Option<f64>,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl PantryItem {
    /// Case-insensitive substring match over name, brand and category.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self.category.to_lowercase().contains(needle_lower)
            || self
                .brand
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(needle_lower))
    }
}

#[derive(Debug, FromRow)]
pub struct PantryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub expiration_date: Option<Date>,
    pub barcode: Option<String>,
    pub image_path: Option<String>,
    pub nutrition_per_unit: Option<Json<NutritionSnapshot>>,
    pub cost_per_unit: Option<f64>,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
    pub last_updated: OffsetDateTime,
}

impl From<PantryRow> for PantryItem {
    fn from(r: PantryRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            brand: r.brand,
            category: r.category,
            quantity: r.quantity,
            unit: r.unit,
            expiration_date: r.expiration_date,
            barcode: r.barcode,
            image_path: r.image_path,
            nutrition_per_unit: r.nutrition_per_unit.map(|j| j.0),
            cost_per_unit: r.cost_per_unit,
            tags: r.tags,
            created_at: r.created_at,
            last_updated: r.last_updated,
        }
    }
}
