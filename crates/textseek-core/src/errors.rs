use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("malformed cursor: {0}")]
    Encoding(String),
}

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Stable label used in error bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::StorageFailure(_) => "storage_failure",
            Self::Encoding(_) => "encoding_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
