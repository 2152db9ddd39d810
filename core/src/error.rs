use thiserror::Error;

/// Failure reported by a backend capability (document store, object store,
/// content fetcher).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed {entity} record: {reason}")]
    MalformedRecord {
        entity: &'static str,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("local store error: {0}")]
    Local(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn malformed(entity: &'static str, reason: impl ToString) -> Self {
        StoreError::MalformedRecord {
            entity,
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
