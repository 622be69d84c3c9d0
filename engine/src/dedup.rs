//! Corpus-wide duplicate removal, built on the engine's public operations.

use tracing::info;

use crate::document::DocumentId;
use crate::server::SearchServer;

/// Remove every exact duplicate (identical distinct term sets), keeping the
/// lowest id per cluster. Returns the removed ids in ascending order.
pub fn remove_duplicates(server: &mut SearchServer) -> Vec<DocumentId> {
    let duplicates = server.check_duplicates();
    for &document_id in &duplicates {
        info!(document_id, "found duplicate document");
        server.remove_document(document_id);
    }
    duplicates
}
