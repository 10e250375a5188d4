//! Repository Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// Identifier of the one plant this relay tracks
pub const PLANT_ID: i64 = 1;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS plant (
    id        INTEGER PRIMARY KEY,
    species   TEXT    NOT NULL,
    threshold REAL    NOT NULL,
    maximum   REAL    NOT NULL,
    moisture  REAL    NOT NULL DEFAULT 0
)";

const PLANT_COLUMNS: &str = "id, species, threshold, maximum, moisture";

/// Plant record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: i64,
    pub species: String,
    /// Lower moisture bound
    pub threshold: f64,
    /// Upper moisture bound
    pub maximum: f64,
    /// Current moisture reading
    pub moisture: f64,
}

impl Plant {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            species: row.try_get("species")?,
            threshold: row.try_get("threshold")?,
            maximum: row.try_get("maximum")?,
            moisture: row.try_get("moisture")?,
        })
    }
}

/// Registration data for a plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlant {
    pub species: String,
    pub threshold: f64,
    pub maximum: f64,
}

/// Repository for plant data access
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Open a SQLite database (created if missing) and apply the schema
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!("Opened SQLite repository at {}", url);
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create an in-memory repository
    ///
    /// Uses a single connection that never expires, since every new
    /// connection to `:memory:` would see an empty database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        info!("Creating in-memory repository");
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        debug!("Plant schema ready");
        Ok(())
    }

    /// Get a plant by ID
    pub async fn get_plant(&self, id: i64) -> Result<Option<Plant>, StorageError> {
        let query = format!("SELECT {PLANT_COLUMNS} FROM plant WHERE id = ?1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Plant::from_row).transpose()?)
    }

    /// Set the current moisture reading of an existing plant
    ///
    /// Returns `NotFound` when no plant with `id` is registered; no record
    /// is created in that case.
    pub async fn update_moisture(&self, id: i64, level: f64) -> Result<Plant, StorageError> {
        let query = format!(
            "UPDATE plant SET moisture = ?1 WHERE id = ?2 RETURNING {PLANT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(level)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        debug!("Updated moisture of plant {} to {}", id, level);
        Ok(Plant::from_row(&row)?)
    }

    /// Register a plant, replacing any existing record with the same ID
    ///
    /// The stored moisture starts at zero.
    pub async fn register_plant(&self, id: i64, plant: NewPlant) -> Result<Plant, StorageError> {
        let query = format!(
            "INSERT INTO plant (id, species, threshold, maximum, moisture) \
             VALUES (?1, ?2, ?3, ?4, 0) \
             ON CONFLICT(id) DO UPDATE SET \
             species = excluded.species, \
             threshold = excluded.threshold, \
             maximum = excluded.maximum, \
             moisture = 0 \
             RETURNING {PLANT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&plant.species)
            .bind(plant.threshold)
            .bind(plant.maximum)
            .fetch_one(&self.pool)
            .await?;

        info!("Registered plant {} ({})", id, plant.species);
        Ok(Plant::from_row(&row)?)
    }

    /// Get total plant count
    pub async fn plant_count(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM plant")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Check that the database answers
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
