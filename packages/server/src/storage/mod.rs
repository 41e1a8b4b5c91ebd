//! Storage abstraction layer for the portfolio server.
//!
//! The [`Storage`] trait is the contract between the CRUD resources and
//! persistence. Storage works on any [`RecordSchema`]; it knows nothing about
//! HTTP verbs or the parameter codec. Both backends enforce required fields
//! and foreign-key existence.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, throwaway servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use portfolio::{Predicate, Record, RecordSchema, Row};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,

    /// The row breaks a storage constraint, e.g. a foreign key that does not
    /// resolve.
    #[error("{0}")]
    Validation(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for record types.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
///
/// Deleting a record also deletes every record that references it.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Insert a new record and return it with its assigned primary key.
    ///
    /// Returns [`StorageError::Validation`] if a required field is missing or
    /// null, or a foreign key in `row` does not reference an existing record.
    async fn create(&self, schema: &'static RecordSchema, row: Row)
        -> Result<Record, StorageError>;

    /// Retrieve a record by primary key. Returns `None` if not found.
    async fn get(
        &self,
        schema: &'static RecordSchema,
        pk: i64,
    ) -> Result<Option<Record>, StorageError>;

    /// Return every record matching all `predicates`, ordered by primary key.
    /// No predicates matches every record.
    async fn filter(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>, StorageError>;

    /// Delete a record by primary key. Returns `false` if it did not exist.
    async fn delete(&self, schema: &'static RecordSchema, pk: i64) -> Result<bool, StorageError>;

    /// Delete every record matching all `predicates` and return how many
    /// records of `schema` were removed (cascaded rows are not counted).
    async fn delete_matching(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError>;
}
