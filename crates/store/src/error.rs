use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The unit of work lost a lock race (serialization failure,
    /// deadlock, or lock timeout). Safe to retry a bounded number of
    /// times at the infrastructure boundary.
    #[error("Transient lock contention")]
    Contention,

    /// A storage-level constraint was violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
