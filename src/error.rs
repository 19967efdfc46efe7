use thiserror::Error;

/// Errors produced by the ledger engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A recurrence rule was rejected at create/update time.
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
    /// A stored rule row does not decode to a known schedule. Indicates
    /// data corruption rather than a transient condition; aborts the batch.
    #[error("corrupt recurrence rule {id}: {reason}")]
    CorruptRule { id: i64, reason: String },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
