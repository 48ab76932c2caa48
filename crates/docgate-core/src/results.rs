//! Search results of one request.
//!
//! Results are computed once per request over the parent-expanded index
//! set. Every index is searched with the same parsed query, restricted by
//! the index's access controller when it has one. The hits of all indexes
//! are merged by descending score; equal scores keep index order.

use crate::access::restrict_query_for_index;
use crate::config::{IndexConfig, SearchConfig};
use crate::error::{DocgateError, Result};
use crate::hit::{hit_href, link_title};
use crate::pool::SearcherPool;
use crate::query::parse_query;
use crate::request::PageRequest;
use crate::types::{Document, FieldValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// One hit of a search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    index_name: String,
    document: Document,
    score: u32,
    url: String,
    use_file_to_http_bridge: bool,
    open_in_new_window: bool,
}

impl SearchHit {
    fn new(index: &IndexConfig, document: Document, score: u32) -> Self {
        let url = index.rewrite_to_external(document.url().unwrap_or(""));
        SearchHit {
            index_name: index.name().to_string(),
            document,
            score,
            url,
            use_file_to_http_bridge: index.use_file_to_http_bridge(),
            open_in_new_window: index.open_in_new_window(),
        }
    }

    /// Name of the index the hit came from
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// The externally visible URL (rewrite rules applied)
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn use_file_to_http_bridge(&self) -> bool {
        self.use_file_to_http_bridge
    }

    pub fn open_in_new_window(&self) -> bool {
        self.open_in_new_window
    }

    /// The link target for this hit
    pub fn href(&self) -> Result<String> {
        hit_href(&self.url, self.use_file_to_http_bridge)
    }

    /// The link text for this hit
    pub fn title(&self, highlight: bool) -> String {
        link_title(&self.document, highlight, &self.url)
    }

    /// A stored field as text.
    ///
    /// Binary fields hold lz4-compressed text and are decompressed here.
    /// Returns `None` when the document has no such field.
    pub fn field(&self, name: &str) -> Result<Option<String>> {
        match self.document.fields().get(name) {
            Some(FieldValue::Text(text)) => Ok(Some(text.clone())),
            Some(FieldValue::Binary(_)) => self.document.compressed_field_value(name).map(Some),
            None => Ok(None),
        }
    }
}

/// The merged hits of all indexes a request searched.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    query: String,
    hits: Vec<SearchHit>,
    total_hits: usize,
    search_time: Duration,
}

impl SearchResults {
    /// Results of a request without a query
    pub fn empty(query: impl Into<String>) -> Self {
        SearchResults {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Run `query` against `indexes`.
    ///
    /// Fails on the first index that cannot be searched; there are no
    /// partial results.
    #[instrument(skip_all, fields(query = %query, indexes = indexes.len()))]
    pub fn execute(
        query: &str,
        indexes: &[Arc<IndexConfig>],
        config: &SearchConfig,
        request: &PageRequest,
        pool: &SearcherPool,
    ) -> Result<Self> {
        if query.is_empty() {
            debug!("Empty query, no search performed");
            return Ok(Self::empty(query));
        }

        let start = Instant::now();
        let parsed = parse_query(query, config.default_field())?;
        let limit = config.max_results();

        let mut hits = Vec::new();
        let mut total_hits = 0usize;

        for index in indexes {
            let restricted = restrict_query_for_index(parsed.clone(), index, request)?;

            let top = {
                let searcher = pool.acquire(index.directory()).map_err(|e| {
                    DocgateError::search(format!("opening index '{}'", index.name()), e)
                })?;
                searcher.search(&restricted, limit).map_err(|e| {
                    DocgateError::search(format!("searching index '{}'", index.name()), e)
                })?
            };

            debug!(
                index = index.name(),
                total_hits = top.total_hits,
                "Searched index"
            );
            total_hits += top.total_hits;
            hits.extend(
                top.hits
                    .into_iter()
                    .map(|hit| SearchHit::new(index, hit.document, hit.score)),
            );
        }

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);

        let search_time = start.elapsed();
        info!(
            total_hits,
            shown = hits.len(),
            elapsed_ms = search_time.as_millis() as u64,
            "Search complete"
        );

        Ok(SearchResults {
            query: query.to_string(),
            hits,
            total_hits,
            search_time,
        })
    }

    /// The query string that was searched
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Number of hits kept (at most the configured maximum)
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Number of matching documents across all indexes
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    pub fn search_time(&self) -> Duration {
        self.search_time
    }

    pub fn hit(&self, index: usize) -> Option<&SearchHit> {
        self.hits.get(index)
    }

    pub fn hit_url(&self, index: usize) -> Option<&str> {
        self.hit(index).map(SearchHit::url)
    }

    pub fn hit_index_name(&self, index: usize) -> Option<&str> {
        self.hit(index).map(SearchHit::index_name)
    }

    pub fn use_file_to_http_bridge_for_hit(&self, index: usize) -> bool {
        self.hit(index)
            .map(SearchHit::use_file_to_http_bridge)
            .unwrap_or(false)
    }

    pub fn open_hit_in_new_window(&self, index: usize) -> bool {
        self.hit(index)
            .map(SearchHit::open_in_new_window)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{HeaderGroupsController, DEFAULT_GROUPS_HEADER};
    use crate::config::RewriteRule;
    use crate::engine::MemoryEngine;
    use crate::index::DocumentIndex;
    use crate::types::{FIELD_ACCESS_CONTROL_GROUPS, FIELD_CONTENT, FIELD_URL};

    fn doc(url: &str, content: &str, groups: &str) -> Document {
        Document::new()
            .with_text(FIELD_URL, url)
            .with_text(FIELD_CONTENT, content)
            .with_text(FIELD_ACCESS_CONTROL_GROUPS, groups)
    }

    fn setup() -> (SearchConfig, SearcherPool) {
        let public = DocumentIndex::new();
        public.add_documents(vec![
            doc("http://intranet/budget.html", "budget", "staff"),
            doc("http://intranet/news.html", "news", "staff"),
        ]);

        let private = DocumentIndex::new();
        private.add_documents(vec![
            doc("file:///srv/board/budget.pdf", "budget budget", "board"),
            doc("file:///srv/board/plan.pdf", "budget plan", "staff board"),
        ]);

        let engine = MemoryEngine::new()
            .with_index("/data/public", public)
            .with_index("/data/private", private);

        let config = SearchConfig::new(
            vec![
                IndexConfig::new("public", "/data/public").with_file_to_http_bridge(false),
                IndexConfig::new("private", "/data/private")
                    .with_access_controller("header", Arc::new(HeaderGroupsController::default()))
                    .with_rewrite_rule(RewriteRule::new("file:///srv", "http://files/srv")),
            ],
            None,
        );

        (config, SearcherPool::new(Arc::new(engine)))
    }

    #[test]
    fn test_merges_indexes_by_score() {
        let (config, pool) = setup();
        let request = PageRequest::new("/search").with_header(DEFAULT_GROUPS_HEADER, "board");

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &request, &pool).unwrap();

        assert_eq!(results.total_hits(), 3);
        assert_eq!(results.hit_url(0), Some("http://files/srv/board/budget.pdf"));
        assert_eq!(results.hit_index_name(0), Some("private"));
        assert!(results.use_file_to_http_bridge_for_hit(0));
        assert_eq!(results.hit_url(1), Some("http://files/srv/board/plan.pdf"));
        assert_eq!(results.hit_url(2), Some("http://intranet/budget.html"));
        assert!(!results.use_file_to_http_bridge_for_hit(2));
    }

    #[test]
    fn test_access_control_restricts_private_index() {
        let (config, pool) = setup();
        let request = PageRequest::new("/search").with_header(DEFAULT_GROUPS_HEADER, "staff");

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &request, &pool).unwrap();

        let urls: Vec<&str> = results.hits().iter().map(SearchHit::url).collect();
        assert_eq!(
            urls,
            vec!["http://files/srv/board/plan.pdf", "http://intranet/budget.html"]
        );
    }

    #[test]
    fn test_no_groups_means_unrestricted() {
        let (config, pool) = setup();
        let request = PageRequest::new("/search");

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &request, &pool).unwrap();
        assert_eq!(results.total_hits(), 3);
    }

    #[test]
    fn test_groups_match_any_of_the_callers_groups() {
        let index = DocumentIndex::new();
        index.add_documents(vec![
            doc("a", "budget", "g1"),
            doc("b", "budget", "g2"),
            doc("c", "budget", "g3"),
        ]);
        let engine = MemoryEngine::new().with_index("/data/groups", index);
        let pool = SearcherPool::new(Arc::new(engine));
        let config = SearchConfig::new(
            vec![IndexConfig::new("groups", "/data/groups")
                .with_access_controller("header", Arc::new(HeaderGroupsController::default()))],
            None,
        );
        let request = PageRequest::new("/search").with_header(DEFAULT_GROUPS_HEADER, "g1,g2");

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &request, &pool).unwrap();

        let urls: Vec<&str> = results.hits().iter().map(SearchHit::url).collect();
        assert_eq!(urls, vec!["a", "b"]);
        assert_eq!(results.total_hits(), 2);
    }

    #[test]
    fn test_strict_controller_hides_everything_without_groups() {
        let (config, pool) = setup();
        let strict = SearchConfig::new(
            vec![IndexConfig::new("private", "/data/private").with_access_controller(
                "header-strict",
                Arc::new(HeaderGroupsController::default().deny_when_missing()),
            )],
            None,
        );

        let results =
            SearchResults::execute("budget", strict.indexes(), &strict, &PageRequest::new("/"), &pool)
                .unwrap();
        assert_eq!(results.total_hits(), 0);

        // The lenient controller on the same index shows both documents
        let lenient = &config.indexes()[1..];
        let results =
            SearchResults::execute("budget", lenient, &config, &PageRequest::new("/"), &pool)
                .unwrap();
        assert_eq!(results.total_hits(), 2);
    }

    #[test]
    fn test_hit_field_reads_text_and_compressed_fields() {
        let index = DocumentIndex::new();
        index.add_documents(vec![doc("file:///srv/a.txt", "budget", "staff")
            .with_text("title", "Budget")
            .with_compressed("summary", "Costs rose by ten percent")
            .with_binary("broken", vec![10, 0, 0, 0, 0xff, 0xff])]);
        let engine = MemoryEngine::new().with_index("/data/stored", index);
        let pool = SearcherPool::new(Arc::new(engine));
        let config = SearchConfig::new(vec![IndexConfig::new("stored", "/data/stored")], None);

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &PageRequest::new("/"), &pool)
                .unwrap();
        let hit = results.hit(0).unwrap();

        assert_eq!(hit.field("title").unwrap().as_deref(), Some("Budget"));
        assert_eq!(
            hit.field("summary").unwrap().as_deref(),
            Some("Costs rose by ten percent")
        );
        assert_eq!(hit.field("missing").unwrap(), None);
        assert!(matches!(
            hit.field("broken"),
            Err(DocgateError::Decompression { .. })
        ));
    }

    #[test]
    fn test_empty_query() {
        let (config, pool) = setup();
        let results =
            SearchResults::execute("", config.indexes(), &config, &PageRequest::new("/"), &pool)
                .unwrap();
        assert_eq!(results.hit_count(), 0);
        assert_eq!(results.total_hits(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_missing_index_fails_whole_search() {
        let (config, pool) = setup();
        let indexes = vec![
            config.indexes()[0].clone(),
            Arc::new(IndexConfig::new("ghost", "/data/ghost")),
        ];

        let err = SearchResults::execute("budget", &indexes, &config, &PageRequest::new("/"), &pool)
            .unwrap_err();
        assert!(matches!(err, DocgateError::Search { .. }));
        assert_eq!(pool.active_leases(std::path::Path::new("/data/public")), 0);
    }

    #[test]
    fn test_max_results() {
        let (config, pool) = setup();
        let config = config.with_max_results(1);

        let results =
            SearchResults::execute("budget", config.indexes(), &config, &PageRequest::new("/"), &pool)
                .unwrap();
        assert_eq!(results.hit_count(), 1);
        assert_eq!(results.total_hits(), 3);
    }

    #[test]
    fn test_syntax_error() {
        let (config, pool) = setup();
        let err = SearchResults::execute(
            "title:\"unterminated",
            config.indexes(),
            &config,
            &PageRequest::new("/"),
            &pool,
        )
        .unwrap_err();
        assert!(matches!(err, DocgateError::QuerySyntax { .. }));
    }
}
