//! The search engine proper: inverted index, TF-IDF ranking, matching,
//! removal, and duplicate detection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::debug;

use crate::concurrent::{ExecutionMode, ShardedAccumulator};
use crate::document::{compute_average_rating, Document, DocumentId, DocumentStatus};
use crate::error::{Result, SearchError};
use crate::query::{parse_query, Query};
use crate::tokenizer::{is_valid_word, split_into_words};

/// Ranked results are truncated to this many rows.
pub const MAX_RESULT_DOCUMENT_COUNT: usize = 5;

/// Relevance scores closer than this are a tie and break on rating.
const RELEVANCE_EPSILON: f64 = 1e-6;

/// Ranking order: descending relevance quantized to [`RELEVANCE_EPSILON`]
/// buckets, then descending rating, then descending exact relevance.
///
/// Quantizing instead of comparing pairwise distances keeps the comparator
/// a total order; a pairwise `|a - b| < epsilon` tie is intransitive and
/// is rejected by `sort_by` once a corpus packs scores closer than epsilon.
fn compare_ranked(lhs: &Document, rhs: &Document) -> Ordering {
    let lhs_bucket = (lhs.relevance / RELEVANCE_EPSILON).floor() as i64;
    let rhs_bucket = (rhs.relevance / RELEVANCE_EPSILON).floor() as i64;
    rhs_bucket
        .cmp(&lhs_bucket)
        .then_with(|| rhs.rating.cmp(&lhs.rating))
        .then_with(|| rhs.relevance.total_cmp(&lhs.relevance))
}

#[derive(Debug)]
struct DocumentRecord {
    rating: i32,
    status: DocumentStatus,
}

/// In-memory inverted index over short text documents.
///
/// Term text is stored once as a shared `Arc<str>`: the postings map and
/// each document's term set hold clones of the same allocation, and both
/// are purged together when the document is removed.
///
/// Reads (`find_top_documents`, `match_document`, `get_word_frequencies`)
/// take `&self` and may run concurrently; structural mutation takes
/// `&mut self`, so callers serialize it relative to readers.
pub struct SearchServer {
    stop_words: HashSet<String>,
    /// term -> (document id -> term frequency); sharded so the parallel
    /// removal path can retract distinct terms concurrently
    word_to_document_freqs: DashMap<Arc<str>, HashMap<DocumentId, f64>>,
    /// id -> rating/status record, ordered by id
    documents: BTreeMap<DocumentId, DocumentRecord>,
    /// id -> the document's distinct indexed terms
    document_words: BTreeMap<DocumentId, BTreeSet<Arc<str>>>,
}

impl SearchServer {
    /// Build an engine from a collection of stop words. Fails if any stop
    /// word contains control characters.
    pub fn new<I, S>(stop_words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for word in stop_words {
            let word = word.as_ref();
            if !is_valid_word(word) {
                return Err(SearchError::InvalidArgument(format!(
                    "control character in stop word {word:?}"
                )));
            }
            if !word.is_empty() {
                set.insert(word.to_string());
            }
        }
        Ok(Self {
            stop_words: set,
            word_to_document_freqs: DashMap::new(),
            documents: BTreeMap::new(),
            document_words: BTreeMap::new(),
        })
    }

    /// Build an engine from a space-separated stop-word string.
    pub fn from_stop_words_text(text: &str) -> Result<Self> {
        Self::new(split_into_words(text))
    }

    /// Index a document. Validation order: negative id, id already live,
    /// control characters in the text. Nothing is indexed on failure.
    pub fn add_document(
        &mut self,
        document_id: DocumentId,
        document: &str,
        status: DocumentStatus,
        ratings: &[i32],
    ) -> Result<()> {
        if document_id < 0 {
            return Err(SearchError::InvalidArgument(format!(
                "negative document id {document_id}"
            )));
        }
        if self.documents.contains_key(&document_id) {
            return Err(SearchError::InvalidArgument(format!(
                "document id {document_id} already exists"
            )));
        }
        if !is_valid_word(document) {
            return Err(SearchError::InvalidArgument(format!(
                "control character in document {document_id}"
            )));
        }

        let words = self.split_into_words_no_stop(document);
        let inv_word_count = 1.0 / words.len() as f64;
        let mut wordset = BTreeSet::new();
        for word in &words {
            let term = self.intern(word);
            *self
                .word_to_document_freqs
                .entry(Arc::clone(&term))
                .or_default()
                .entry(document_id)
                .or_insert(0.0) += inv_word_count;
            wordset.insert(term);
        }
        self.documents.insert(
            document_id,
            DocumentRecord {
                rating: compute_average_rating(ratings),
                status,
            },
        );
        self.document_words.insert(document_id, wordset);
        debug!(document_id, words = words.len(), "added document");
        Ok(())
    }

    /// Retract a document and every posting it contributed. Unknown ids
    /// are a no-op, so interleaved duplicate removal stays robust.
    pub fn remove_document(&mut self, document_id: DocumentId) {
        self.remove_document_with_mode(ExecutionMode::Sequential, document_id);
    }

    pub fn remove_document_with_mode(&mut self, mode: ExecutionMode, document_id: DocumentId) {
        let Some(words) = self.document_words.remove(&document_id) else {
            return;
        };
        match mode {
            ExecutionMode::Sequential => {
                for word in &words {
                    self.retract_posting(word, document_id);
                }
            }
            ExecutionMode::Parallel => {
                // distinct terms live under distinct postings entries
                words
                    .par_iter()
                    .for_each(|word| self.retract_posting(word, document_id));
            }
        }
        self.documents.remove(&document_id);
        debug!(document_id, "removed document");
    }

    fn retract_posting(&self, word: &Arc<str>, document_id: DocumentId) {
        let mut emptied = false;
        if let Some(mut postings) = self.word_to_document_freqs.get_mut(word.as_ref()) {
            postings.remove(&document_id);
            emptied = postings.is_empty();
        }
        if emptied {
            // no term may map to zero live documents
            self.word_to_document_freqs
                .remove_if(word.as_ref(), |_, postings| postings.is_empty());
        }
    }

    /// Term frequencies of one live document; empty map for unknown ids.
    pub fn get_word_frequencies(&self, document_id: DocumentId) -> BTreeMap<String, f64> {
        let mut freqs = BTreeMap::new();
        if let Some(words) = self.document_words.get(&document_id) {
            for word in words {
                if let Some(postings) = self.word_to_document_freqs.get(word.as_ref()) {
                    if let Some(&term_freq) = postings.get(&document_id) {
                        freqs.insert(word.to_string(), term_freq);
                    }
                }
            }
        }
        freqs
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Lazy, restartable iteration over live document ids, ascending.
    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    /// Parse a raw query against this engine's stop-word set. Hosts can
    /// use this to validate or inspect a query without running it.
    pub fn parse_query(&self, raw_query: &str) -> Result<Query> {
        parse_query(raw_query, &self.stop_words)
    }

    /// Top documents with status `Actual`.
    pub fn find_top_documents(&self, raw_query: &str) -> Result<Vec<Document>> {
        self.find_top_documents_by(raw_query, |_, status, _| status == DocumentStatus::Actual)
    }

    /// Top documents with the given status.
    pub fn find_top_documents_with_status(
        &self,
        raw_query: &str,
        status_filter: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.find_top_documents_by(raw_query, move |_, status, _| status == status_filter)
    }

    /// Top documents passing an arbitrary predicate over (id, status, rating).
    pub fn find_top_documents_by<P>(&self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        self.find_top_documents_with_mode(ExecutionMode::Sequential, raw_query, predicate)
    }

    /// Full form: explicit execution mode plus predicate. At most
    /// [`MAX_RESULT_DOCUMENT_COUNT`] rows, sorted by descending relevance;
    /// relevance ties within 1e-6 break on descending rating. Minus-terms
    /// exclude documents unconditionally, regardless of the predicate.
    pub fn find_top_documents_with_mode<P>(
        &self,
        mode: ExecutionMode,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let query = parse_query(raw_query, &self.stop_words)?;
        let mut matched = match mode {
            ExecutionMode::Sequential => self.find_all_documents(&query, &predicate),
            ExecutionMode::Parallel => self.find_all_documents_parallel(&query, &predicate),
        };
        matched.sort_by(compare_ranked);
        matched.truncate(MAX_RESULT_DOCUMENT_COUNT);
        Ok(matched)
    }

    /// Plus-terms of the query present in one specific document.
    ///
    /// Any minus-term present in the document forces an empty matched list;
    /// the minus scan runs and short-circuits before plus collection.
    pub fn match_document(
        &self,
        raw_query: &str,
        document_id: DocumentId,
    ) -> Result<(Vec<String>, DocumentStatus)> {
        self.match_document_with_mode(ExecutionMode::Sequential, raw_query, document_id)
    }

    pub fn match_document_with_mode(
        &self,
        mode: ExecutionMode,
        raw_query: &str,
        document_id: DocumentId,
    ) -> Result<(Vec<String>, DocumentStatus)> {
        let query = parse_query(raw_query, &self.stop_words)?;
        let status = self
            .documents
            .get(&document_id)
            .map(|record| record.status)
            .ok_or_else(|| {
                SearchError::OutOfRange(format!("unknown document id {document_id}"))
            })?;
        let Some(words) = self.document_words.get(&document_id) else {
            return Err(SearchError::OutOfRange(format!(
                "unknown document id {document_id}"
            )));
        };

        // The minus scan completes in full before any plus-term is
        // collected, in both modes.
        let excluded = match mode {
            ExecutionMode::Sequential => query
                .minus_words
                .iter()
                .any(|word| words.contains(word.as_str())),
            ExecutionMode::Parallel => query
                .minus_words
                .par_iter()
                .any(|word| words.contains(word.as_str())),
        };
        if excluded {
            return Ok((Vec::new(), status));
        }

        let matched: Vec<String> = match mode {
            ExecutionMode::Sequential => query
                .plus_words
                .iter()
                .filter(|word| words.contains(word.as_str()))
                .cloned()
                .collect(),
            ExecutionMode::Parallel => query
                .plus_words
                .par_iter()
                .filter(|word| words.contains(word.as_str()))
                .cloned()
                .collect(),
        };
        Ok((matched, status))
    }

    /// Ids of exact duplicates: documents whose distinct term sets equal an
    /// earlier (lower-id) document's. Per cluster the lowest id survives.
    pub fn check_duplicates(&self) -> Vec<DocumentId> {
        let mut seen: HashSet<&BTreeSet<Arc<str>>> = HashSet::new();
        let mut duplicates = Vec::new();
        for (&document_id, words) in &self.document_words {
            if !seen.insert(words) {
                duplicates.push(document_id);
            }
        }
        duplicates
    }

    fn split_into_words_no_stop<'a>(&self, text: &'a str) -> Vec<&'a str> {
        split_into_words(text)
            .into_iter()
            .filter(|word| !self.stop_words.contains(*word))
            .collect()
    }

    /// Reuse the postings key so all references to one term share a single
    /// allocation.
    fn intern(&self, word: &str) -> Arc<str> {
        match self.word_to_document_freqs.get(word) {
            Some(entry) => Arc::clone(entry.key()),
            None => Arc::from(word),
        }
    }

    fn inverse_document_freq(&self, docs_containing: usize) -> f64 {
        (self.documents.len() as f64 / docs_containing as f64).ln()
    }

    fn find_all_documents<P>(&self, query: &Query, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool,
    {
        let mut document_to_relevance: HashMap<DocumentId, f64> = HashMap::new();
        for word in &query.plus_words {
            let Some(postings) = self.word_to_document_freqs.get(word.as_str()) else {
                continue;
            };
            let idf = self.inverse_document_freq(postings.len());
            for (&document_id, &term_freq) in postings.iter() {
                if let Some(record) = self.documents.get(&document_id) {
                    if predicate(document_id, record.status, record.rating) {
                        *document_to_relevance.entry(document_id).or_insert(0.0) +=
                            term_freq * idf;
                    }
                }
            }
        }
        self.exclude_and_collect(query, document_to_relevance)
    }

    fn find_all_documents_parallel<P>(&self, query: &Query, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let accumulator = ShardedAccumulator::new();
        query.plus_words.par_iter().for_each(|word| {
            let Some(postings) = self.word_to_document_freqs.get(word.as_str()) else {
                return;
            };
            let idf = self.inverse_document_freq(postings.len());
            for (&document_id, &term_freq) in postings.iter() {
                if let Some(record) = self.documents.get(&document_id) {
                    if predicate(document_id, record.status, record.rating) {
                        accumulator.add(document_id, term_freq * idf);
                    }
                }
            }
        });
        self.exclude_and_collect(query, accumulator.into_map())
    }

    /// Minus-term exclusion and result construction, shared by both modes.
    fn exclude_and_collect(
        &self,
        query: &Query,
        mut document_to_relevance: HashMap<DocumentId, f64>,
    ) -> Vec<Document> {
        for word in &query.minus_words {
            if let Some(postings) = self.word_to_document_freqs.get(word.as_str()) {
                for document_id in postings.keys() {
                    document_to_relevance.remove(document_id);
                }
            }
        }
        document_to_relevance
            .into_iter()
            .filter_map(|(document_id, relevance)| {
                self.documents.get(&document_id).map(|record| Document {
                    id: document_id,
                    relevance,
                    rating: record.rating,
                })
            })
            .collect()
    }
}
