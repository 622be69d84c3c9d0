use thiserror::Error;

/// Errors reported at the boundary of every public engine operation.
///
/// Validation is eager: a failed operation leaves the index exactly as it
/// was before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Malformed document id, duplicate id, control characters in
    /// text/query/stop words, or malformed minus syntax.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup of a document id that is not live.
    #[error("out of range: {0}")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
