//! Raw query parsing into plus- and minus-terms.

use std::collections::{BTreeSet, HashSet};

use crate::error::{Result, SearchError};
use crate::tokenizer::{is_valid_word, split_into_words};

/// A parsed query: terms that must appear and terms that must not.
/// Duplicate terms collapse under set semantics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query {
    pub plus_words: BTreeSet<String>,
    pub minus_words: BTreeSet<String>,
}

/// Parse a raw query against the engine's stop-word set.
///
/// Checked in order: adjacent dashes anywhere in the raw text, a minus
/// marker followed by nothing (trailing dash or dash then space), control
/// characters in a de-dashed term. Stop words are dropped silently whether
/// plus or minus. An embedded dash is part of the term.
pub(crate) fn parse_query(raw: &str, stop_words: &HashSet<String>) -> Result<Query> {
    if raw.contains("--") {
        return Err(SearchError::InvalidArgument(format!(
            "double minus in query {raw:?}"
        )));
    }
    if raw.ends_with('-') || raw.contains("- ") {
        return Err(SearchError::InvalidArgument(format!(
            "no word after minus in query {raw:?}"
        )));
    }

    let mut query = Query::default();
    for word in split_into_words(raw) {
        let (term, is_minus) = match word.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (word, false),
        };
        if !is_valid_word(term) {
            return Err(SearchError::InvalidArgument(format!(
                "control character in query word {term:?}"
            )));
        }
        if stop_words.contains(term) {
            continue;
        }
        if is_minus {
            query.minus_words.insert(term.to_string());
        } else {
            query.plus_words.insert(term.to_string());
        }
    }
    Ok(query)
}
