//! PostgreSQL implementation of the remote document store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::RemoteDocumentRow;
use crate::domain::Collection;
use crate::error::LedgerError;
use crate::sync::{RemoteDocument, RemoteGateway};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS remote_documents (\
     owner_id TEXT NOT NULL, \
     collection TEXT NOT NULL, \
     items JSONB NOT NULL DEFAULT '[]'::jsonb, \
     last_synced TIMESTAMPTZ NOT NULL, \
     PRIMARY KEY (owner_id, collection))";

/// Remote document store backed by `sqlx::PgPool`.
///
/// One row per (owner, collection); `replace` upserts the whole row.
#[derive(Debug, Clone)]
pub struct PostgresRemote {
    pool: PgPool,
}

impl PostgresRemote {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RemoteUnavailable`] if no connection can be
    /// established within `connect_timeout`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| LedgerError::RemoteUnavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Creates the `remote_documents` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RemoteUnavailable`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::RemoteUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for PostgresRemote {
    async fn fetch(
        &self,
        owner_id: &str,
        collection: Collection,
    ) -> Result<Option<RemoteDocument>, LedgerError> {
        let row = sqlx::query_as::<_, (String, String, serde_json::Value, DateTime<Utc>)>(
            "SELECT owner_id, collection, items, last_synced FROM remote_documents \
             WHERE owner_id = $1 AND collection = $2",
        )
        .bind(owner_id)
        .bind(collection.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::RemoteUnavailable(e.to_string()))?;

        Ok(row.map(|(owner_id, collection, items, last_synced)| {
            RemoteDocumentRow {
                owner_id,
                collection,
                items,
                last_synced,
            }
            .into_document()
        }))
    }

    async fn replace(
        &self,
        owner_id: &str,
        collection: Collection,
        items: Vec<serde_json::Value>,
        last_synced: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let count = items.len();
        sqlx::query(
            "INSERT INTO remote_documents (owner_id, collection, items, last_synced) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (owner_id, collection) \
             DO UPDATE SET items = EXCLUDED.items, last_synced = EXCLUDED.last_synced",
        )
        .bind(owner_id)
        .bind(collection.as_str())
        .bind(serde_json::Value::Array(items))
        .bind(last_synced)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::RemoteUnavailable(e.to_string()))?;

        tracing::debug!(owner_id, %collection, count, "remote document replaced");
        Ok(())
    }
}
