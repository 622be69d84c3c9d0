//! In-process TF-IDF full-text search engine.
//!
//! Documents are added with a status and a rating list, indexed into an
//! inverted index, and queried with boolean plus/minus keyword queries
//! filtered by arbitrary predicates. Lookup, matching, and removal come in
//! sequential and parallel execution modes.

pub mod batch;
pub mod concurrent;
pub mod dedup;
pub mod document;
pub mod error;
pub mod query;
pub mod server;
pub mod tokenizer;

pub use batch::{process_queries, process_queries_joined};
pub use concurrent::ExecutionMode;
pub use dedup::remove_duplicates;
pub use document::{Document, DocumentId, DocumentStatus};
pub use error::{Result, SearchError};
pub use query::Query;
pub use server::{SearchServer, MAX_RESULT_DOCUMENT_COUNT};
