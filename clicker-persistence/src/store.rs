use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::entities::{documents, prelude::*};
use crate::error::StoreError;

/// How many times a compare-and-swap write is retried before giving up.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Games,
    Clans,
    Trades,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Games => "games",
            Collection::Clans => "clans",
            Collection::Trades => "trades",
        }
    }
}

/// A decoded document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// JSON documents keyed by `(collection, key)`.
///
/// Every write is a compare-and-swap on the row's version, so two requests
/// touching the same entity cannot silently overwrite each other, and
/// requests touching different entities never contend at all.
#[derive(Clone)]
pub struct DocumentStore {
    db: DatabaseConnection,
}

impl DocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        let model = Documents::find_by_id((collection.as_str().to_string(), key.to_string()))
            .one(&self.db)
            .await?;

        model
            .map(|model| {
                Ok(Versioned {
                    value: serde_json::from_str(&model.body)?,
                    version: model.version,
                })
            })
            .transpose()
    }

    /// Every document in the collection, oldest first. Rows that no longer
    /// decode are skipped.
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        let models = Documents::find()
            .filter(documents::Column::Collection.eq(collection.as_str()))
            .order_by_asc(documents::Column::CreatedAt)
            .order_by_asc(documents::Column::Key)
            .all(&self.db)
            .await?;

        let values = models
            .into_iter()
            .filter_map(|model| match serde_json::from_str(&model.body) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(
                        "Skipping unreadable {}/{}: {}",
                        model.collection, model.key, e
                    );
                    None
                }
            })
            .collect();

        Ok(values)
    }

    /// Inserts `value` unless the key already exists. Returns whether the row
    /// was written.
    pub async fn insert<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        value: &T,
    ) -> Result<bool, StoreError> {
        let now = Utc::now().fixed_offset();
        let model = documents::ActiveModel {
            collection: Set(collection.as_str().to_string()),
            key: Set(key.to_string()),
            body: Set(serde_json::to_string(value)?),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = Documents::insert(model)
            .on_conflict(
                OnConflict::columns([documents::Column::Collection, documents::Column::Key])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted == 1)
    }

    /// Returns the stored value, creating it from `default` on first access.
    pub async fn get_or_insert_with<T, F>(
        &self,
        collection: Collection,
        key: &str,
        default: F,
    ) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get(collection, key).await? {
            return Ok(existing.value);
        }

        let value = default();
        if self.insert(collection, key, &value).await? {
            debug!("Created {}/{}", collection.as_str(), key);
            return Ok(value);
        }

        // Someone else created it between our read and insert
        self.get(collection, key)
            .await?
            .map(|existing| existing.value)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection.as_str(), key)))
    }

    /// Writes `value` under `key` whatever is there now. Concurrent writers
    /// of the same key are ordered by the version check; the last one wins.
    pub async fn put<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(value)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = Documents::find_by_id((collection.as_str().to_string(), key.to_string()))
                .one(&self.db)
                .await?;

            let written = match current {
                None => self.insert(collection, key, value).await?,
                Some(model) => {
                    self.compare_and_swap(collection, key, model.version, body.clone())
                        .await?
                }
            };
            if written {
                return Ok(());
            }
            tokio::task::yield_now().await;
        }

        Err(self.conflict(collection, key))
    }

    /// Read-modify-write of one document. `mutate` may run more than once if
    /// another writer gets in first; an error from it aborts without writing.
    pub async fn update<T, F>(
        &self,
        collection: Collection,
        key: &str,
        mut mutate: F,
    ) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut T) -> Result<(), StoreError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Versioned { mut value, version } = self
                .get::<T>(collection, key)
                .await?
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

            mutate(&mut value)?;

            let body = serde_json::to_string(&value)?;
            if self.compare_and_swap(collection, key, version, body).await? {
                return Ok(value);
            }

            debug!(
                "Version conflict on {}/{} (attempt {})",
                collection.as_str(),
                key,
                attempt
            );
            tokio::task::yield_now().await;
        }

        Err(self.conflict(collection, key))
    }

    async fn compare_and_swap(
        &self,
        collection: Collection,
        key: &str,
        expected_version: i64,
        body: String,
    ) -> Result<bool, StoreError> {
        let result = Documents::update_many()
            .col_expr(documents::Column::Body, Expr::value(body))
            .col_expr(documents::Column::Version, Expr::value(expected_version + 1))
            .col_expr(
                documents::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(documents::Column::Collection.eq(collection.as_str()))
            .filter(documents::Column::Key.eq(key))
            .filter(documents::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    fn conflict(&self, collection: Collection, key: &str) -> StoreError {
        warn!(
            "Giving up on {}/{} after {} conflicting writes",
            collection.as_str(),
            key,
            MAX_WRITE_ATTEMPTS
        );
        StoreError::Conflict {
            collection: collection.as_str(),
            key: key.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        }
    }
}
