use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::memory::{build_context, MemoryContext, OnboardingStage};
use crate::models::profile::ProfileItemRow;
use crate::preferences::completeness::{compute_stored_completeness, StoredCompleteness};
use crate::preferences::store::{ProfileStore, SaveOutcome};
use crate::preferences::{save_user_preference, ItemType, SOURCE_PROFILE_API};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ItemTypeQuery {
    pub item_type: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileItemsResponse {
    pub user_id: String,
    pub total: usize,
    pub items: BTreeMap<String, Vec<ProfileItemRow>>,
}

#[derive(Deserialize)]
pub struct SavePreferenceRequest {
    #[serde(alias = "type")]
    pub preference_type: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct DeleteItemRequest {
    pub item_type: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct DeleteItemResponse {
    pub deleted: bool,
}

#[derive(Serialize)]
pub struct MemoryResponse {
    #[serde(flatten)]
    pub context: MemoryContext,
    pub stage: OnboardingStage,
}

fn profile_store(state: &AppState) -> Result<&dyn ProfileStore, AppError> {
    state
        .profiles
        .get()
        .ok_or_else(|| AppError::ServiceUnavailable(state.profiles.reason().to_string()))
}

fn parse_item_type(raw: &str) -> Result<ItemType, AppError> {
    ItemType::parse(raw.trim())
        .ok_or_else(|| AppError::Validation(format!("Unknown item_type '{raw}'")))
}

/// GET /api/v1/profile/:user_id/items
pub async fn handle_list_items(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ItemTypeQuery>,
) -> Result<Json<ProfileItemsResponse>, AppError> {
    let store = profile_store(&state)?;
    let filter = params.item_type.as_deref().map(parse_item_type).transpose()?;

    let rows = store.list(&user_id, filter).await?;
    let total = rows.len();
    let mut items: BTreeMap<String, Vec<ProfileItemRow>> = BTreeMap::new();
    for row in rows {
        items.entry(row.item_type.clone()).or_default().push(row);
    }

    Ok(Json(ProfileItemsResponse {
        user_id,
        total,
        items,
    }))
}

/// POST /api/v1/profile/:user_id/preferences
pub async fn handle_save_preference(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SavePreferenceRequest>,
) -> Result<Json<SaveOutcome>, AppError> {
    let store = profile_store(&state)?;
    let outcome = save_user_preference(
        store,
        &user_id,
        &req.preference_type,
        &req.value,
        SOURCE_PROFILE_API,
    )
    .await;
    Ok(Json(outcome))
}

/// DELETE /api/v1/profile/:user_id/items
pub async fn handle_delete_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<DeleteItemRequest>,
) -> Result<Json<DeleteItemResponse>, AppError> {
    let store = profile_store(&state)?;
    let item_type = parse_item_type(&req.item_type)?;
    let deleted = store.delete_item(&user_id, item_type, &req.value).await?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "No {} '{}' for this user",
            item_type.as_str(),
            req.value
        )));
    }
    Ok(Json(DeleteItemResponse { deleted }))
}

/// GET /api/v1/profile/:user_id/completeness
pub async fn handle_completeness(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StoredCompleteness>, AppError> {
    let store = profile_store(&state)?;
    let rows = store.list(&user_id, None).await?;
    Ok(Json(compute_stored_completeness(&rows)))
}

/// GET /api/v1/profile/:user_id/memory
/// Never fails; an unreachable memory service reads as an empty memory.
pub async fn handle_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<MemoryResponse> {
    let context = build_context(state.memory.get(), Some(&user_id)).await;
    let stage = context.stage();
    Json(MemoryResponse { context, stage })
}
