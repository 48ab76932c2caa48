//! In-memory document index.
//!
//! The `DocumentIndex` stores the documents of one index directory and
//! evaluates [`Query`] predicates against them. It supports:
//!
//! - Adding documents in bulk (as produced by an indexer)
//! - Removing documents by URL, so a re-imported document replaces the old copy
//! - Parallel evaluation using Rayon for large indexes
//!
//! ## Matching
//!
//! Text fields are split on whitespace and tokens compare exactly, so
//! `groups:staff` matches a document whose `groups` field is
//! `"staff board"` but not one whose field is `"Staff"`.
//!
//! Scores are simple match counts: a term scores the number of times it
//! occurs, a phrase the number of times the whole sequence occurs, and a
//! boolean query the sum of its matching non-prohibited clauses. Hits are
//! ordered by descending score; equal scores keep insertion order.

use crate::engine::IndexSearcher;
use crate::error::Result;
use crate::query::{BooleanQuery, Occur, Query};
use crate::types::{Document, IndexStats, ScoredDocument, TopDocs};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use tracing::{debug, info, instrument};

/// Indexes larger than this are evaluated in parallel
const PARALLEL_THRESHOLD: usize = 10_000;

/// The documents of one index.
///
/// This structure is designed for concurrent access:
/// - Multiple readers can search simultaneously
/// - Updates are serialized via internal locking
///
/// ## Example
///
/// ```rust
/// use docgate_core::{Document, DocumentIndex, Query};
///
/// let index = DocumentIndex::new();
/// index.add_documents(vec![
///     Document::new().with_text("url", "file:///srv/a.txt").with_text("content", "budget 2023"),
/// ]);
///
/// let top = index.search(&Query::term("content", "budget"), 10);
/// assert_eq!(top.total_hits, 1);
/// ```
pub struct DocumentIndex {
    /// All documents in insertion order
    documents: RwLock<Vec<Document>>,

    /// Statistics about the index
    stats: RwLock<IndexStats>,
}

impl Default for DocumentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        DocumentIndex {
            documents: RwLock::new(Vec::with_capacity(capacity)),
            stats: RwLock::new(IndexStats::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Get current index statistics.
    pub fn stats(&self) -> IndexStats {
        self.stats.read().clone()
    }

    /// Append documents.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub fn add_documents(&self, documents: Vec<Document>) {
        let mut all = self.documents.write();
        all.extend(documents);
        let count = all.len();
        drop(all);

        self.touch(count);
        info!(documents = count, "Documents added");
    }

    /// Add a single document.
    pub fn add_document(&self, document: Document) {
        self.add_documents(vec![document]);
    }

    /// Remove every document whose URL is `url`. Returns how many were removed.
    pub fn remove_by_url(&self, url: &str) -> usize {
        let mut all = self.documents.write();
        let before = all.len();
        all.retain(|doc| doc.url() != Some(url));
        let removed = before - all.len();
        let count = all.len();
        drop(all);

        if removed > 0 {
            debug!(url = url, removed, "Removed documents");
            self.touch(count);
        }
        removed
    }

    /// Restore statistics loaded from disk.
    pub(crate) fn set_stats(&self, stats: IndexStats) {
        *self.stats.write() = stats;
    }

    fn touch(&self, count: usize) {
        let mut stats = self.stats.write();
        stats.document_count = count as u64;
        stats.last_updated = Some(chrono::Utc::now());
    }

    /// Search the index.
    ///
    /// Returns at most `limit` hits, best first, together with the total
    /// number of matching documents.
    pub fn search(&self, query: &Query, limit: usize) -> TopDocs {
        let documents = self.documents.read();

        let mut matches: Vec<(usize, u32)> = if documents.len() > PARALLEL_THRESHOLD {
            documents
                .par_iter()
                .enumerate()
                .filter_map(|(i, doc)| score(doc, query).map(|s| (i, s)))
                .collect()
        } else {
            documents
                .iter()
                .enumerate()
                .filter_map(|(i, doc)| score(doc, query).map(|s| (i, s)))
                .collect()
        };

        matches.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        TopDocs {
            total_hits: matches.len(),
            hits: matches
                .into_iter()
                .take(limit)
                .map(|(i, score)| ScoredDocument {
                    document: documents[i].clone(),
                    score,
                })
                .collect(),
        }
    }

    /// Get a copy of all documents (for persistence).
    pub fn all_documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }
}

impl IndexSearcher for DocumentIndex {
    fn search(&self, query: &Query, limit: usize) -> Result<TopDocs> {
        Ok(DocumentIndex::search(self, query, limit))
    }

    fn document_count(&self) -> u64 {
        self.len() as u64
    }
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("document_count", &self.len())
            .finish()
    }
}

/// The score of `doc` for `query`, or `None` if it does not match.
fn score(doc: &Document, query: &Query) -> Option<u32> {
    let hits = match query {
        Query::Term { field, value } => doc.tokens(field).filter(|t| *t == value.as_str()).count(),
        Query::Phrase { field, terms } => phrase_count(doc, field, terms),
        Query::Range {
            field,
            lower,
            upper,
            inclusive,
        } => doc
            .tokens(field)
            .filter(|t| in_range(t, lower, upper, *inclusive))
            .count(),
        Query::Boolean(boolean) => return score_boolean(doc, boolean),
        Query::MatchAll => 1,
    };
    (hits > 0).then(|| hits as u32)
}

fn score_boolean(doc: &Document, query: &BooleanQuery) -> Option<u32> {
    let mut total = 0u32;
    let mut required = 0usize;
    let mut optional_matched = 0usize;

    for clause in query.clauses() {
        let clause_score = score(doc, &clause.query);
        match clause.occur {
            Occur::MustNot => {
                if clause_score.is_some() {
                    return None;
                }
            }
            Occur::Must => {
                required += 1;
                total = total.saturating_add(clause_score?);
            }
            Occur::Should => {
                if let Some(s) = clause_score {
                    optional_matched += 1;
                    total = total.saturating_add(s);
                }
            }
        }
    }

    if required == 0 && optional_matched == 0 {
        return None;
    }
    Some(total.max(1))
}

fn phrase_count(doc: &Document, field: &str, terms: &[String]) -> usize {
    if terms.is_empty() {
        return 0;
    }
    let tokens: Vec<&str> = doc.tokens(field).collect();
    tokens
        .windows(terms.len())
        .filter(|window| window.iter().zip(terms).all(|(t, term)| *t == term.as_str()))
        .count()
}

/// Bounds compare numerically when both sides are numbers, otherwise
/// lexicographically. `*` is an open bound.
fn in_range(token: &str, lower: &str, upper: &str, inclusive: bool) -> bool {
    let accept = |ordering: CmpOrdering, wanted: CmpOrdering| {
        ordering == wanted || (inclusive && ordering == CmpOrdering::Equal)
    };

    let above_lower = lower == "*" || accept(compare(token, lower), CmpOrdering::Greater);
    let below_upper = upper == "*" || accept(compare(token, upper), CmpOrdering::Less);
    above_lower && below_upper
}

fn compare(a: &str, b: &str) -> CmpOrdering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FIELD_ACCESS_CONTROL_GROUPS, FIELD_CONTENT, FIELD_TITLE, FIELD_URL};

    fn make_test_documents() -> Vec<Document> {
        vec![
            Document::new()
                .with_text(FIELD_URL, "file:///srv/reports/2023.pdf")
                .with_text(FIELD_TITLE, "Annual Report")
                .with_text(FIELD_CONTENT, "budget figures for the budget year")
                .with_text("year", "2023")
                .with_text(FIELD_ACCESS_CONTROL_GROUPS, "board"),
            Document::new()
                .with_text(FIELD_URL, "file:///srv/reports/2009.pdf")
                .with_text(FIELD_TITLE, "Annual Report")
                .with_text(FIELD_CONTENT, "budget draft")
                .with_text("year", "2009")
                .with_text(FIELD_ACCESS_CONTROL_GROUPS, "staff board"),
            Document::new()
                .with_text(FIELD_URL, "http://intranet/welcome.html")
                .with_text(FIELD_TITLE, "Welcome")
                .with_text(FIELD_CONTENT, "hello and welcome")
                .with_text(FIELD_ACCESS_CONTROL_GROUPS, "staff"),
        ]
    }

    fn test_index() -> DocumentIndex {
        let index = DocumentIndex::new();
        index.add_documents(make_test_documents());
        index
    }

    fn urls(top: &TopDocs) -> Vec<&str> {
        top.hits.iter().filter_map(|h| h.document.url()).collect()
    }

    #[test]
    fn test_add_and_search() {
        let index = test_index();
        assert_eq!(index.len(), 3);

        let top = index.search(&Query::term(FIELD_CONTENT, "budget"), 10);
        assert_eq!(top.total_hits, 2);
        assert_eq!(
            urls(&top),
            vec!["file:///srv/reports/2023.pdf", "file:///srv/reports/2009.pdf"]
        );
        assert_eq!(top.hits[0].score, 2);
    }

    #[test]
    fn test_terms_are_case_sensitive() {
        let index = test_index();
        assert_eq!(index.search(&Query::term(FIELD_CONTENT, "Budget"), 10).total_hits, 0);
    }

    #[test]
    fn test_phrase() {
        let index = test_index();
        let query = Query::phrase(FIELD_TITLE, vec!["Annual".into(), "Report".into()]);
        assert_eq!(index.search(&query, 10).total_hits, 2);

        let query = Query::phrase(FIELD_TITLE, vec!["Report".into(), "Annual".into()]);
        assert_eq!(index.search(&query, 10).total_hits, 0);
    }

    #[test]
    fn test_numeric_range() {
        let index = test_index();
        let query = Query::Range {
            field: "year".into(),
            lower: "2000".into(),
            upper: "2010".into(),
            inclusive: true,
        };
        let top = index.search(&query, 10);
        assert_eq!(urls(&top), vec!["file:///srv/reports/2009.pdf"]);

        let query = Query::Range {
            field: "year".into(),
            lower: "2009".into(),
            upper: "*".into(),
            inclusive: false,
        };
        let top = index.search(&query, 10);
        assert_eq!(urls(&top), vec!["file:///srv/reports/2023.pdf"]);
    }

    #[test]
    fn test_boolean_semantics() {
        let index = test_index();

        let restricted: Query = BooleanQuery::new()
            .with_clause(Query::term(FIELD_CONTENT, "budget"), Occur::Must)
            .with_clause(
                BooleanQuery::new()
                    .with_clause(Query::term(FIELD_ACCESS_CONTROL_GROUPS, "staff"), Occur::Should)
                    .into(),
                Occur::Must,
            )
            .into();
        assert_eq!(
            urls(&index.search(&restricted, 10)),
            vec!["file:///srv/reports/2009.pdf"]
        );

        let excluded: Query = BooleanQuery::new()
            .with_clause(Query::MatchAll, Occur::Must)
            .with_clause(Query::term(FIELD_CONTENT, "draft"), Occur::MustNot)
            .into();
        assert_eq!(index.search(&excluded, 10).total_hits, 2);

        let only_prohibited: Query = BooleanQuery::new()
            .with_clause(Query::term(FIELD_CONTENT, "draft"), Occur::MustNot)
            .into();
        assert_eq!(index.search(&only_prohibited, 10).total_hits, 0);
    }

    #[test]
    fn test_empty_boolean_matches_nothing() {
        let index = test_index();
        assert_eq!(index.search(&BooleanQuery::new().into(), 10).total_hits, 0);
    }

    #[test]
    fn test_limit_keeps_total() {
        let index = test_index();
        let top = index.search(&Query::MatchAll, 1);
        assert_eq!(top.total_hits, 3);
        assert_eq!(top.hits.len(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let index = DocumentIndex::with_capacity(PARALLEL_THRESHOLD + 10);
        let documents = (0..PARALLEL_THRESHOLD + 10)
            .map(|i| {
                Document::new()
                    .with_text(FIELD_URL, format!("file:///srv/{}.txt", i))
                    .with_text(FIELD_CONTENT, if i % 2 == 0 { "even" } else { "odd" })
            })
            .collect();
        index.add_documents(documents);

        let top = index.search(&Query::term(FIELD_CONTENT, "even"), 3);
        assert_eq!(top.total_hits, (PARALLEL_THRESHOLD + 10) / 2);
        assert_eq!(
            urls(&top),
            vec!["file:///srv/0.txt", "file:///srv/2.txt", "file:///srv/4.txt"]
        );
    }

    #[test]
    fn test_remove_by_url() {
        let index = test_index();
        assert_eq!(index.remove_by_url("http://intranet/welcome.html"), 1);
        assert_eq!(index.remove_by_url("http://intranet/welcome.html"), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(index.stats().document_count, 2);
    }
}
