//! PostgreSQL session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_access::PendingAuthorization;
use gatehouse_core::{Result, SessionId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::{SessionRecord, SessionStore};
use crate::error::SessionStoreError;

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_profile: Option<serde_json::Value>,
    return_to: Option<String>,
    pending_authorization: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_record(self) -> Result<SessionRecord, SessionStoreError> {
        let id = SessionId::from_str(&self.id).map_err(|e| SessionStoreError::Serialization {
            details: format!("invalid session id '{}': {}", self.id, e),
        })?;

        let pending = self
            .pending_authorization
            .map(serde_json::from_value::<PendingAuthorization>)
            .transpose()
            .map_err(|e| SessionStoreError::Serialization {
                details: format!("invalid pending authorization in '{}': {}", self.id, e),
            })?;

        Ok(SessionRecord::from_parts(
            id,
            self.user_profile,
            self.return_to,
            pending,
            self.created_at,
            self.expires_at,
        ))
    }
}

fn database_error(err: sqlx::Error) -> SessionStoreError {
    SessionStoreError::Database {
        details: err.to_string(),
    }
}

/// Session store backed by the `sessions` table.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(
        &self,
        id: &SessionId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_profile, return_to, pending_authorization, created_at, expires_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let pending = record
            .pending()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| SessionStoreError::Serialization {
                details: e.to_string(),
            })?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_profile, return_to, pending_authorization, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET user_profile = EXCLUDED.user_profile,
                return_to = EXCLUDED.return_to,
                pending_authorization = EXCLUDED.pending_authorization,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(record.id().to_string())
        .bind(record.user())
        .bind(record.return_to())
        .bind(pending)
        .bind(record.created_at())
        .bind(record.expires_at())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected())
    }
}
