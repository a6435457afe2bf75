//! Persistence for profile items in `user_profile_items`.
//!
//! Location and role keep one row per user; a new value replaces the old
//! one inside a single store call, so a failed write leaves the previous
//! value in place. Skills and companies accumulate. Rows are never cached:
//! every call goes to the store.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info};

use crate::models::profile::ProfileItemRow;
use crate::preferences::ItemType;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct NewProfileItem<'a> {
    pub user_id: &'a str,
    pub item_type: ItemType,
    pub value: &'a str,
    pub metadata: &'a Value,
    pub confirmed: bool,
}

/// Result of [`ProfileStore::replace_single`].
#[derive(Debug, Clone)]
pub enum Replacement {
    /// The stored value already equals the new one, ignoring case.
    Unchanged,
    Saved {
        row: ProfileItemRow,
        previous: Option<String>,
    },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert, or touch `updated_at` when `(user_id, item_type, value)` already exists.
    async fn upsert(&self, item: NewProfileItem<'_>) -> Result<ProfileItemRow, StoreError>;

    /// Swaps the single row of a single-value type for `item`, all or nothing.
    /// On error the previous row is still stored.
    async fn replace_single(&self, item: NewProfileItem<'_>) -> Result<Replacement, StoreError>;

    async fn list(
        &self,
        user_id: &str,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ProfileItemRow>, StoreError>;

    async fn delete_item(
        &self,
        user_id: &str,
        item_type: ItemType,
        value: &str,
    ) -> Result<bool, StoreError>;
}

/// Result of a save, shaped for the model and the widget.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SaveOutcome {
    pub saved: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_change: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        SaveOutcome {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Persists an already-normalized value.
///
/// Single-value types: an equal existing value (ignoring case) is a no-op;
/// a different one is deleted and reported in `replaced`.
/// Multi-value types accumulate.
pub async fn save_preference(
    store: &dyn ProfileStore,
    user_id: &str,
    item_type: ItemType,
    value: &str,
    metadata: &Value,
) -> SaveOutcome {
    match try_save(store, user_id, item_type, value, metadata).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error saving {} for user {user_id}: {e}", item_type.as_str());
            SaveOutcome::failed(e.to_string())
        }
    }
}

async fn try_save(
    store: &dyn ProfileStore,
    user_id: &str,
    item_type: ItemType,
    value: &str,
    metadata: &Value,
) -> Result<SaveOutcome, StoreError> {
    let item = NewProfileItem {
        user_id,
        item_type,
        value,
        metadata,
        confirmed: false,
    };

    let (row, old_value) = if item_type.is_single_value() {
        match store.replace_single(item).await? {
            Replacement::Unchanged => {
                return Ok(SaveOutcome {
                    no_change: true,
                    message: Some(format!("Already set to {value}")),
                    ..Default::default()
                });
            }
            Replacement::Saved { row, previous } => {
                if let Some(old) = &previous {
                    info!("Replaced {}: {old} -> {value}", item_type.as_str());
                }
                (row, previous)
            }
        }
    } else {
        (store.upsert(item).await?, None)
    };

    info!(
        "Saved {}={} (id={}) for user {user_id}",
        item_type.as_str(),
        row.value,
        row.id
    );

    let message = old_value
        .as_ref()
        .map(|old| format!("Changed {} from {old} to {value}", item_type.as_str()));

    Ok(SaveOutcome {
        saved: true,
        no_change: false,
        item_type: Some(item_type.as_str().to_string()),
        value: Some(row.value),
        replaced: old_value,
        message,
        error: None,
    })
}

const UPSERT_SQL: &str = r#"
    INSERT INTO user_profile_items (user_id, item_type, value, metadata, confirmed)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (user_id, item_type, value) DO UPDATE SET updated_at = NOW()
    RETURNING *
"#;

/// Postgres-backed store over `user_profile_items`.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn upsert(&self, item: NewProfileItem<'_>) -> Result<ProfileItemRow, StoreError> {
        Ok(sqlx::query_as::<_, ProfileItemRow>(UPSERT_SQL)
            .bind(item.user_id)
            .bind(item.item_type.as_str())
            .bind(item.value)
            .bind(item.metadata)
            .bind(item.confirmed)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn replace_single(&self, item: NewProfileItem<'_>) -> Result<Replacement, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent saves for the same (user, type), including
        // the case where no row exists yet for FOR UPDATE to lock.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", item.user_id, item.item_type.as_str()))
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, ProfileItemRow>(
            r#"
            SELECT * FROM user_profile_items
            WHERE user_id = $1 AND item_type = $2
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(item.user_id)
        .bind(item.item_type.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(current) = &existing {
            if current.value.to_lowercase() == item.value.to_lowercase() {
                tx.rollback().await?;
                return Ok(Replacement::Unchanged);
            }
            sqlx::query("DELETE FROM user_profile_items WHERE user_id = $1 AND item_type = $2")
                .bind(item.user_id)
                .bind(item.item_type.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, ProfileItemRow>(UPSERT_SQL)
            .bind(item.user_id)
            .bind(item.item_type.as_str())
            .bind(item.value)
            .bind(item.metadata)
            .bind(item.confirmed)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Replacement::Saved {
            row,
            previous: existing.map(|r| r.value),
        })
    }

    async fn list(
        &self,
        user_id: &str,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ProfileItemRow>, StoreError> {
        let rows = match item_type {
            Some(t) => {
                sqlx::query_as::<_, ProfileItemRow>(
                    r#"
                    SELECT * FROM user_profile_items
                    WHERE user_id = $1 AND item_type = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(user_id)
                .bind(t.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProfileItemRow>(
                    r#"
                    SELECT * FROM user_profile_items
                    WHERE user_id = $1
                    ORDER BY item_type, created_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn delete_item(
        &self,
        user_id: &str,
        item_type: ItemType,
        value: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM user_profile_items WHERE user_id = $1 AND item_type = $2 AND value = $3",
        )
        .bind(user_id)
        .bind(item_type.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store with the same uniqueness rule as the table.
/// Writes can be made to fail to exercise error paths.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryProfileStore {
    rows: std::sync::Mutex<Vec<ProfileItemRow>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl InMemoryProfileStore {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Inserts or touches a row in `rows`, as the table's upsert does.
    fn write(
        &self,
        rows: &mut Vec<ProfileItemRow>,
        item: &NewProfileItem<'_>,
    ) -> Result<ProfileItemRow, StoreError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let now = chrono::Utc::now();
        if let Some(row) = rows.iter_mut().find(|r| {
            r.user_id == item.user_id
                && r.item_type == item.item_type.as_str()
                && r.value == item.value
        }) {
            row.updated_at = Some(now);
            return Ok(row.clone());
        }
        let row = ProfileItemRow {
            id: rows.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            user_id: item.user_id.to_string(),
            item_type: item.item_type.as_str().to_string(),
            value: item.value.to_string(),
            metadata: Some(item.metadata.clone()),
            confirmed: Some(item.confirmed),
            created_at: Some(now),
            updated_at: Some(now),
        };
        rows.push(row.clone());
        Ok(row)
    }

    /// Values stored for a user and type, in insertion order.
    pub fn values(&self, user_id: &str, item_type: &str) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.item_type == item_type)
            .map(|r| r.value.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, item: NewProfileItem<'_>) -> Result<ProfileItemRow, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        self.write(&mut rows, &item)
    }

    /// Works on a copy and swaps it in only when every step succeeded.
    async fn replace_single(&self, item: NewProfileItem<'_>) -> Result<Replacement, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let same_slot =
            |r: &ProfileItemRow| r.user_id == item.user_id && r.item_type == item.item_type.as_str();

        let previous = rows.iter().find(|r| same_slot(r)).map(|r| r.value.clone());
        if let Some(current) = &previous {
            if current.to_lowercase() == item.value.to_lowercase() {
                return Ok(Replacement::Unchanged);
            }
        }

        let mut staged = rows.clone();
        staged.retain(|r| !same_slot(r));
        let row = self.write(&mut staged, &item)?;
        *rows = staged;
        Ok(Replacement::Saved { row, previous })
    }

    async fn list(
        &self,
        user_id: &str,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ProfileItemRow>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| item_type.map_or(true, |t| r.item_type == t.as_str()))
            .cloned()
            .collect())
    }

    async fn delete_item(
        &self,
        user_id: &str,
        item_type: ItemType,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| {
            !(r.user_id == user_id && r.item_type == item_type.as_str() && r.value == value)
        });
        Ok(rows.len() < before)
    }
}
