//! Parallel batch query evaluation.

use rayon::prelude::*;

use crate::document::Document;
use crate::error::Result;
use crate::server::SearchServer;

/// Evaluate N queries against the engine, returning one ranked result list
/// per query, in query order. Queries run in parallel.
pub fn process_queries(
    server: &SearchServer,
    queries: &[String],
) -> Result<Vec<Vec<Document>>> {
    queries
        .par_iter()
        .map(|query| server.find_top_documents(query))
        .collect()
}

/// Like [`process_queries`], flattened: all results for the first query,
/// then the second, and so on.
pub fn process_queries_joined(
    server: &SearchServer,
    queries: &[String],
) -> Result<Vec<Document>> {
    Ok(process_queries(server, queries)?
        .into_iter()
        .flatten()
        .collect())
}
