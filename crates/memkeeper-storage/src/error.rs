//! Storage error types.

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The host provides no usable persistent storage. Surfaced once when
    /// the store is opened; fatal for offline durability.
    #[error("persistent storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// An underlying read/write/delete failed (I/O, lock, quota).
    #[error("storage engine failure: {0}")]
    Persistence(#[source] Box<redb::Error>),

    /// A stored record no longer decodes. Treated as data corruption,
    /// a persistence-class failure.
    #[error("corrupt record in table {table}: {source}")]
    Corrupt {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The operation required an existing record with this id.
    #[error("memory entry {id} not found")]
    NotFound { id: String },

    /// A snapshot document is not valid JSON or is missing required
    /// top-level fields. The whole import is rejected.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Persistence(Box::new(err.into()))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Persistence(Box::new(err.into()))
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Persistence(Box::new(err.into()))
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Persistence(Box::new(err.into()))
    }
}
