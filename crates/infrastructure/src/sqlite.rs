use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use settings_core::{SettingsError, SettingsResult};
use settings_domain::SettingsRepository;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// SQLite-backed settings repository. Values are stored as JSON text keyed
/// by dotted path.
pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an embedded repository, initializing the database file and
    /// schema on first use.
    pub async fn new_embedded(database_path: &str) -> SettingsResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Creating embedded SQLite settings repository at: {}", database_path);

        let connect_options = SqliteConnectOptions::from_str(database_path)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;

        debug!("Successfully created embedded SQLite settings repository");
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> SettingsResult<()> {
        debug!("Running SQLite settings migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn read_all(&self) -> SettingsResult<HashMap<String, Value>> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        let mut result = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("key");
            let raw: String = row.get("value");
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                SettingsError::Storage(format!("Corrupt persisted value for '{key}': {e}"))
            })?;
            result.insert(key, value);
        }

        debug!("Read {} persisted settings", result.len());
        Ok(result)
    }

    async fn write(&self, key: &str, value: &Value) -> SettingsResult<()> {
        let raw = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!("Persisted setting: {}", key);
        Ok(())
    }
}
