use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::credential::{CredentialRecord, NewCredential};

const RECORD_COLUMNS: &str =
    "id, name, description, token_hash, is_active, is_system, expires_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Unique-index violations become `Conflict` so the bootstrapper can tell a
/// lost creation race apart from a broken database.
fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create(&self, new: &NewCredential) -> Result<CredentialRecord, StoreError> {
        let sql = format!(
            r#"INSERT INTO api_tokens (name, description, token_hash, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING {RECORD_COLUMNS}"#
        );
        sqlx::query_as::<_, CredentialRecord>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(&new.token_hash)
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM api_tokens WHERE id = $1");
        let row = sqlx::query_as::<_, CredentialRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM api_tokens WHERE name = $1 ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, CredentialRecord>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_by_secret_hash(
        &self,
        hash: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM api_tokens WHERE token_hash = $1");
        let row = sqlx::query_as::<_, CredentialRecord>(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM api_tokens ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, CredentialRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update(&self, record: &CredentialRecord) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"UPDATE api_tokens
               SET name = $2, description = $3, is_active = $4, is_system = $5,
                   expires_at = $6, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.is_active)
        .bind(record.is_system)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM api_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
