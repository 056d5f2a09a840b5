use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Illegal plan transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Plan version {0} not found")]
    PlanNotFound(i64),

    #[error("Idempotency key {key} reused with a different payload")]
    IdempotencyConflict { key: String },

    #[error("Illegal slot transition: {from} -> {to}")]
    IllegalSlotTransition { from: String, to: String },

    #[error("Integrity fault: {0}")]
    Integrity(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
