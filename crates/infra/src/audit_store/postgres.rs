//! Postgres-backed audit store.
//!
//! Appends one row per entry to `api_logs`. Rows are never updated or deleted
//! from here.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use adminhub_audit::{AuditRecord, AuditStore, AuditStoreError, AUDIT_TABLE};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS api_logs (
    id            BIGSERIAL PRIMARY KEY,
    user_id       UUID NULL,
    api_key_id    UUID NULL,
    ip_address    TEXT NULL,
    action        TEXT NOT NULL,
    success       BOOLEAN NOT NULL,
    status_code   INTEGER NOT NULL,
    error_code    TEXT NULL,
    error_message TEXT NULL,
    request_body  JSONB NULL,
    duration_ms   BIGINT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub struct PostgresAuditStore {
    pool: Arc<PgPool>,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect lazily; the first insert opens the connection.
    pub fn connect_lazy(database_url: &str) -> Result<Self, AuditStoreError> {
        let pool = PgPool::connect_lazy(database_url)
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the audit table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AuditStoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        let sql = format!(
            r#"
            INSERT INTO {AUDIT_TABLE} (
                user_id, api_key_id, ip_address, action, success,
                status_code, error_code, error_message, request_body, duration_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#
        );

        sqlx::query(&sql)
            .bind(record.user_id)
            .bind(record.api_key_id)
            .bind(record.ip_address)
            .bind(record.action)
            .bind(record.success)
            .bind(record.status_code)
            .bind(record.error_code)
            .bind(record.error_message)
            .bind(record.request_body)
            .bind(record.duration_ms)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_audit_row", e))?;

        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuditStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            // 42P01 undefined_table, 42703 undefined_column
            match db_err.code().as_deref() {
                Some("42P01") | Some("42703") | Some("23502") => AuditStoreError::Permanent(msg),
                _ => AuditStoreError::Transient(msg),
            }
        }
        sqlx::Error::Configuration(e) => {
            AuditStoreError::Permanent(format!("invalid configuration in {}: {}", operation, e))
        }
        sqlx::Error::PoolClosed => {
            AuditStoreError::Permanent(format!("connection pool closed in {}", operation))
        }
        _ => AuditStoreError::Transient(format!("sqlx error in {}: {}", operation, err)),
    }
}
