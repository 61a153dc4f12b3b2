use crate::forecast::types::Units;
use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

/// Session key under which the preferred temperature units are kept.
pub const UNITS_KEY: &str = "units";

/// Sessions kept in the history database, expiring after `inactivity`
/// without a request. The returned store is what the expired-record sweep runs on.
pub async fn sqlite_session_layer(
    pool: SqlitePool,
    inactivity: Duration,
) -> Result<(SessionManagerLayer<SqliteStore>, SqliteStore), sqlx::Error> {
    let store = SqliteStore::new(pool);
    store.migrate().await?;

    let layer = SessionManagerLayer::new(store.clone())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(inactivity));

    Ok((layer, store))
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store failed: {0}")]
    Store(#[from] tower_sessions::session::Error),
    #[error("Session has no identifier after saving")]
    MissingId,
}

/// Per-visitor state the page handler reads and writes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Identifier of the current session, creating the session if needed.
    async fn session_key(&self) -> Result<String, SessionError>;
    async fn units(&self) -> Result<Option<Units>, SessionError>;
    async fn set_units(&self, units: Units) -> Result<(), SessionError>;
}

#[async_trait]
impl SessionStore for Session {
    async fn session_key(&self) -> Result<String, SessionError> {
        // Loading clears the id of a cookie whose record is gone.
        let units = self.get::<Units>(UNITS_KEY).await?;
        if self.id().is_none() {
            // Empty sessions get no cookie, so seed one before creating the record.
            self.insert(UNITS_KEY, units.unwrap_or_default()).await?;
            self.save().await?;
        }
        self.id()
            .map(|id| id.to_string())
            .ok_or(SessionError::MissingId)
    }

    async fn units(&self) -> Result<Option<Units>, SessionError> {
        Ok(self.get::<Units>(UNITS_KEY).await?)
    }

    async fn set_units(&self, units: Units) -> Result<(), SessionError> {
        self.insert(UNITS_KEY, units).await?;
        Ok(())
    }
}
