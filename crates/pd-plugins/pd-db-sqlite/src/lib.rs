//! # pd-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `pd-core` domain models.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pd_core::{
    DirectoryStore, NewReview, Playground, PlaygroundId, Rating, Review, ReviewId, StoreError,
    StoreResult, ANONYMOUS_AUTHOR,
};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;

pub struct SqliteDirectory {
    pool: SqlitePool,
}

/// Constraint violations are the database refusing the write; anything else
/// means the database could not be used.
fn map_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::ForeignKeyViolation
            | ErrorKind::CheckViolation
            | ErrorKind::UniqueViolation
            | ErrorKind::NotNullViolation => StoreError::rejected(db.message()),
            _ => StoreError::unavailable(&err),
        },
        _ => StoreError::unavailable(&err),
    }
}

fn micros_to_datetime(micros: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::unavailable(format!("corrupt review timestamp {micros}")))
}

fn row_to_playground(row: &SqliteRow) -> StoreResult<Playground> {
    let features: String = row.try_get("features").map_err(map_err)?;
    Ok(Playground {
        id: PlaygroundId::new(row.try_get::<String, _>("id").map_err(map_err)?),
        name: row.try_get("name").map_err(map_err)?,
        location: row.try_get("location").map_err(map_err)?,
        zip: row.try_get("zip").map_err(map_err)?,
        image: row.try_get("image").map_err(map_err)?,
        features: serde_json::from_str(&features).unwrap_or_default(),
    })
}

fn row_to_review(row: &SqliteRow) -> StoreResult<Review> {
    let rating: i64 = row.try_get("rating").map_err(map_err)?;
    Ok(Review {
        id: ReviewId::new(row.try_get::<String, _>("id").map_err(map_err)?),
        playground_id: PlaygroundId::new(
            row.try_get::<String, _>("playground_id").map_err(map_err)?,
        ),
        author: row.try_get("name").map_err(map_err)?,
        rating: Rating::new(rating).map_err(StoreError::unavailable)?,
        comment: row.try_get("comment").map_err(map_err)?,
        created_at: micros_to_datetime(row.try_get("created_at").map_err(map_err)?)?,
    })
}

impl SqliteDirectory {
    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(map_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(map_err)?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database. Limited to one connection, since every
    /// SQLite connection to `:memory:` sees its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(map_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_err)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(Self { pool })
    }

    /// Inserts or replaces a playground. Used for seeding; playgrounds are
    /// otherwise read-only to the application.
    pub async fn insert_playground(&self, playground: &Playground) -> StoreResult<()> {
        let features = serde_json::to_string(&playground.features).map_err(StoreError::rejected)?;
        sqlx::query(
            "INSERT INTO playgrounds (id, name, location, zip, image, features) VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, location = excluded.location, \
             zip = excluded.zip, image = excluded.image, features = excluded.features",
        )
        .bind(playground.id.as_str())
        .bind(&playground.name)
        .bind(&playground.location)
        .bind(&playground.zip)
        .bind(&playground.image)
        .bind(features)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectory {
    /// Playgrounds in rowid order, i.e. the order they were first inserted.
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        let rows = sqlx::query(
            "SELECT id, name, location, zip, image, features FROM playgrounds ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.iter().map(row_to_playground).collect()
    }

    async fn list_reviews(&self, playground: &PlaygroundId) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT id, playground_id, name, rating, comment, created_at FROM reviews \
             WHERE playground_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(playground.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.iter().map(row_to_review).collect()
    }

    /// Timestamp assignment and insert share one transaction so the new review
    /// always sorts after the playground's previous ones.
    async fn create_review(
        &self,
        playground: &PlaygroundId,
        review: NewReview,
    ) -> StoreResult<Review> {
        // Take the write lock up front so racing writers wait on each other
        // instead of failing when a read lock is upgraded.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(map_err)?;

        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM reviews WHERE playground_id = ?")
                .bind(playground.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_err)?;
        let now = Utc::now().timestamp_micros();
        let created_at = latest.map_or(now, |latest| now.max(latest + 1));

        let stored = Review {
            id: ReviewId::new(Uuid::now_v7().to_string()),
            playground_id: playground.clone(),
            author: ANONYMOUS_AUTHOR.to_string(),
            rating: review.rating,
            comment: review.comment.into(),
            created_at: micros_to_datetime(created_at)?,
        };

        sqlx::query(
            "INSERT INTO reviews (id, playground_id, name, rating, comment, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.as_str())
        .bind(stored.playground_id.as_str())
        .bind(&stored.author)
        .bind(i64::from(stored.rating.get()))
        .bind(&stored.comment)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        tracing::debug!(playground = %playground, review = %stored.id, "stored review in sqlite");
        Ok(stored)
    }
}
