use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{iso_date, PantryItem};
use crate::generation::PantryScanItem;

#[derive(Debug, Clone, Deserialize)]
pub struct NewPantryItem {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, with = "iso_date::option")]
    pub expiration_date: Option<Date>,
    #[serde(default)]
    pub barcode: Option<String>,
    /// Storage key from an earlier scan.
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Pantry item as returned to clients, with a short-lived image URL.
#[derive(Debug, Serialize)]
pub struct PantryItemView {
    #[serde(flatten)]
    pub item: PantryItem,
    pub image_url: Option<String>,
}

/// Recognized item from a photo, not yet in the pantry.
#[derive(Debug, Serialize)]
pub struct ScanSuggestion {
    #[serde(flatten)]
    pub item: PantryScanItem,
    pub image_path: String,
}
