//! Storage Layer
//!
//! Provides SQLite persistence of the single plant record with repository pattern.

mod repository;

pub use repository::{NewPlant, Plant, Repository, PLANT_ID};
pub use sqlx::Error as SqlxError;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
}
