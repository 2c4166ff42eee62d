use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{collection}/{key} kept changing underneath us after {attempts} attempts")]
    Conflict {
        collection: &'static str,
        key: String,
        attempts: u32,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}
