pub mod artifact;
pub mod error;
pub mod integrity;
pub mod models;
pub mod repository;
pub mod slots;

pub use artifact::FsArtifactStore;
pub use error::{Result, StorageError};
pub use integrity::{verify_state_machine_integrity, IntegrityCheck, IntegrityStatus};
pub use repository::SqlitePlanRepository;
pub use slots::{DailySlot, SqliteSlotRepository};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Initialize the plan database with migrations.
///
/// A single-connection pool keeps `:memory:` databases coherent and
/// matches the one-writer discipline of the plan lifecycle.
pub async fn init_db(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(db = db_path, "plan DB initialized");
    Ok(pool)
}

/// Check if a specific table exists
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
        .bind(table_name)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
