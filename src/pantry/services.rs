use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{NewPantryItem, PantryItemView, ScanSuggestion};
use super::repo_types::PantryItem;
use crate::error::{AppError, AppResult};
use crate::images::services::{presign_key, store_image, UploadItem};
use crate::nutrition::{self, repo_types::NutritionSnapshot};
use crate::state::AppState;

fn check_quantity(quantity: f64) -> AppResult<()> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(AppError::validation("quantity must be a non-negative number"));
    }
    Ok(())
}

fn scan_prefix(user_id: Uuid) -> String {
    format!("pantry/{}", user_id)
}

/// Only keys issued by this user's own scans may be attached to an item.
fn check_image_key(user_id: Uuid, key: &str) -> AppResult<()> {
    let owned = key
        .strip_prefix(&scan_prefix(user_id))
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'));
    if !owned {
        return Err(AppError::validation("image_path must come from one of your pantry scans"));
    }
    Ok(())
}

async fn to_view(state: &AppState, item: PantryItem) -> AppResult<PantryItemView> {
    let image_url = match &item.image_path {
        Some(key) => Some(presign_key(state.storage.as_ref(), key, state.config.media.url_ttl_secs).await?),
        None => None,
    };
    Ok(PantryItemView { item, image_url })
}

async fn to_views(state: &AppState, items: Vec<PantryItem>) -> AppResult<Vec<PantryItemView>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(to_view(state, item).await?);
    }
    Ok(out)
}

pub async fn add_item(state: &AppState, user_id: Uuid, input: NewPantryItem) -> AppResult<PantryItemView> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    check_quantity(input.quantity)?;
    if let Some(cost) = input.cost_per_unit {
        if !cost.is_finite() || cost < 0.0 {
            return Err(AppError::validation("cost_per_unit must be a non-negative number"));
        }
    }
    let image_path = input.image_path.filter(|k| !k.trim().is_empty());
    if let Some(key) = &image_path {
        check_image_key(user_id, key)?;
    }

    let nutrition_per_unit = nutrition::services::get(state.nutrition.as_ref(), &name)
        .await?
        .as_ref()
        .map(NutritionSnapshot::from);

    let now = OffsetDateTime::now_utc();
    let item = PantryItem {
        id: Uuid::new_v4(),
        user_id,
        name,
        brand: input.brand.filter(|b| !b.trim().is_empty()),
        category: input.category.trim().to_string(),
        quantity: input.quantity,
        unit: input.unit,
        expiration_date: input.expiration_date,
        barcode: input.barcode,
        image_path,
        nutrition_per_unit,
        cost_per_unit: input.cost_per_unit,
        tags: input.tags,
        created_at: now,
        last_updated: now,
    };
    state.pantry.insert(&item).await?;
    info!(%user_id, item_id = %item.id, name = %item.name, "pantry item added");
    to_view(state, item).await
}

pub async fn list_items(state: &AppState, user_id: Uuid) -> AppResult<Vec<PantryItemView>> {
    let items = state.pantry.list_for_user(user_id).await?;
    to_views(state, items).await
}

pub async fn update_quantity(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    quantity: f64,
) -> AppResult<PantryItemView> {
    check_quantity(quantity)?;
    let item = state
        .pantry
        .update_quantity(user_id, id, quantity, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::not_found(format!("pantry item {}", id)))?;
    to_view(state, item).await
}

/// Deleting an item that does not exist is not an error.
pub async fn delete_item(state: &AppState, user_id: Uuid, id: Uuid) -> AppResult<()> {
    let removed = state.pantry.delete(user_id, id).await?;
    info!(%user_id, item_id = %id, removed, "pantry item delete");
    Ok(())
}

pub async fn search_items(state: &AppState, user_id: Uuid, query: &str) -> AppResult<Vec<PantryItemView>> {
    let items = state.pantry.search(user_id, query.trim()).await?;
    to_views(state, items).await
}

/// Store a pantry photo and ask the vision model what is in it. Suggestions are
/// returned for the client to confirm; nothing is added to the pantry here.
pub async fn scan(state: &AppState, user_id: Uuid, image: UploadItem<'_>) -> AppResult<Vec<ScanSuggestion>> {
    if image.body.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    let storage = state.storage.as_ref();
    let key = store_image(storage, &scan_prefix(user_id), image).await?;
    let url = presign_key(storage, &key, state.config.media.url_ttl_secs).await?;

    let items = match state.generator.scan_pantry(&url).await {
        Ok(items) => items,
        Err(e) => {
            if let Err(cleanup) = storage.delete_object(&key).await {
                warn!(%key, error = %cleanup, "failed to remove unscanned pantry image");
            }
            return Err(AppError::from_generation("pantry scan", e));
        }
    };

    info!(%user_id, count = items.len(), "pantry image scanned");
    Ok(items
        .into_iter()
        .map(|item| ScanSuggestion {
            item,
            image_path: key.clone(),
        })
        .collect())
}
