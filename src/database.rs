use crate::forecast::types::Units;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SearchHistory {
    pub id: i64,
    pub session_key: String,
    /// Display form, "Name, Region, Country".
    pub city: String,
    pub search_date: chrono::DateTime<chrono::Utc>,
    #[sqlx(try_from = "String")]
    pub units: Units,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CitySearchCount {
    pub city: String,
    pub count: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_key TEXT NOT NULL,
                city TEXT NOT NULL,
                search_date TEXT NOT NULL,
                units TEXT NOT NULL DEFAULT 'C',
                UNIQUE (session_key, city)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_search_history_session_date ON search_history(session_key, search_date)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts the (session, city) row or refreshes its date and units in place.
    pub async fn upsert_search(
        &self,
        session_key: &str,
        city: &str,
        units: Units,
    ) -> Result<SearchHistory, DatabaseError> {
        let now = chrono::Utc::now();

        let result = sqlx::query_as::<_, SearchHistory>(
            r#"
            INSERT INTO search_history (session_key, city, search_date, units)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_key, city) DO UPDATE SET
                search_date = excluded.search_date,
                units = excluded.units
            RETURNING *
            "#,
        )
        .bind(session_key)
        .bind(city)
        .bind(now)
        .bind(units.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    /// Most recent searches of one session, newest first.
    pub async fn recent_searches(
        &self,
        session_key: &str,
        limit: i64,
    ) -> Result<Vec<SearchHistory>, DatabaseError> {
        let results = sqlx::query_as::<_, SearchHistory>(
            "SELECT * FROM search_history WHERE session_key = $1 ORDER BY search_date DESC, id DESC LIMIT $2",
        )
        .bind(session_key)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    /// Searches per city across all sessions. Ties are ordered by city name.
    pub async fn city_search_counts(&self) -> Result<Vec<CitySearchCount>, DatabaseError> {
        let results = sqlx::query_as::<_, CitySearchCount>(
            "SELECT city, COUNT(*) AS count FROM search_history GROUP BY city ORDER BY count DESC, city ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
