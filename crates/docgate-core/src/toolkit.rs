//! The search toolkit.
//!
//! [`SearchToolkit`] is the per-process entry point a front end holds on
//! to. It owns the load-once configuration and the searcher pool; all
//! per-request state lives in the [`RequestSearchContext`] the caller
//! passes in.
//!
//! ```no_run
//! use docgate_core::{
//!     AccessControllerRegistry, DiskEngine, PageRequest, RequestSearchContext,
//!     SearchToolkit, TomlConfigFactory,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> docgate_core::Result<()> {
//! let toolkit = SearchToolkit::new(
//!     TomlConfigFactory::new(AccessControllerRegistry::with_builtins()),
//!     Arc::new(DiskEngine),
//! );
//!
//! let request = PageRequest::from_uri("/search?query=budget&index=docs");
//! let mut ctx = RequestSearchContext::new();
//! for hit in toolkit.search_results(&mut ctx, &request)?.hits() {
//!     println!("{} -> {}", hit.title(false), hit.href()?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::access::restrict_query_for_index;
use crate::builder::build_query_string;
use crate::codec::{extract_file_url, url_to_file_name};
use crate::config::{ConfigFactory, ConfigLoader, IndexConfig, SearchConfig};
use crate::context::{IndexConfigs, RequestSearchContext};
use crate::delivery::{send_file, DeliveryOutcome};
use crate::engine::IndexEngine;
use crate::error::{DocgateError, Result};
use crate::pool::SearcherPool;
use crate::query::Query;
use crate::request::{PageRequest, PageResponse};
use crate::resolver;
use crate::results::SearchResults;
use crate::types::FIELD_URL;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Process-wide search services.
pub struct SearchToolkit {
    loader: ConfigLoader,
    pool: SearcherPool,
}

impl SearchToolkit {
    pub fn new(factory: impl ConfigFactory + 'static, engine: Arc<dyn IndexEngine>) -> Self {
        SearchToolkit {
            loader: ConfigLoader::new(factory),
            pool: SearcherPool::new(engine),
        }
    }

    /// The search configuration, loaded on the first call.
    pub fn config(&self, request: &PageRequest) -> Result<Arc<SearchConfig>> {
        self.loader.get(request)
    }

    /// The indexes named by the request.
    pub fn index_configs(
        &self,
        ctx: &mut RequestSearchContext,
        request: &PageRequest,
    ) -> Result<IndexConfigs> {
        let config = self.config(request)?;
        resolver::index_configs(ctx, &config, request)
    }

    /// The indexes named by the request, parents replaced by their children.
    pub fn index_configs_with_parent(
        &self,
        ctx: &mut RequestSearchContext,
        request: &PageRequest,
    ) -> Result<IndexConfigs> {
        let config = self.config(request)?;
        resolver::index_configs_with_parent(ctx, &config, request)
    }

    /// Every configured index.
    pub fn all_index_configs(&self, request: &PageRequest) -> Result<Vec<Arc<IndexConfig>>> {
        let config = self.config(request)?;
        resolver::all_index_configs(&config)
    }

    /// The query string of the request, built once per request.
    pub fn search_query(&self, ctx: &mut RequestSearchContext, request: &PageRequest) -> Arc<str> {
        ctx.query_or_init(|| build_query_string(request))
    }

    /// The search results of the request, computed once per request.
    pub fn search_results(
        &self,
        ctx: &mut RequestSearchContext,
        request: &PageRequest,
    ) -> Result<Arc<SearchResults>> {
        let config = self.config(request)?;
        ctx.results_or_try_init(|ctx| {
            let indexes = resolver::index_configs_with_parent(ctx, &config, request)?;
            let query = ctx.query_or_init(|| build_query_string(request));
            SearchResults::execute(&query, &indexes, &config, request, &self.pool)
        })
    }

    /// Whether `file_url` is a document the caller may see in one of the
    /// request's indexes.
    ///
    /// Parent indexes are not expanded here. Each index is asked with the
    /// URL in its internal form and with the index's access control
    /// applied; the first document whose URL is exactly that URL grants
    /// access.
    #[instrument(skip(self, ctx, request))]
    pub fn allow_file_access(
        &self,
        ctx: &mut RequestSearchContext,
        request: &PageRequest,
        file_url: &str,
    ) -> Result<bool> {
        let indexes = self.index_configs(ctx, request)?;

        for index in indexes.iter() {
            let internal_url = index.rewrite_to_internal(file_url);
            // The url field is whitespace-tokenized, so the phrase only finds
            // candidates. "file:///a" is also a phrase of "file:///a b.txt".
            let terms = internal_url.split_whitespace().map(String::from).collect();
            let query = restrict_query_for_index(Query::phrase(FIELD_URL, terms), index, request)?;

            let top = {
                let searcher = self.pool.acquire(index.directory()).map_err(|e| {
                    DocgateError::search(format!("opening index '{}'", index.name()), e)
                })?;
                searcher.search(&query, usize::MAX).map_err(|e| {
                    DocgateError::search(
                        format!("checking file access in index '{}'", index.name()),
                        e,
                    )
                })?
            };

            if top
                .hits
                .iter()
                .any(|hit| hit.document.url() == Some(internal_url.as_str()))
            {
                debug!(index = index.name(), "File is visible");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Serve the file a bridged request path points at.
    ///
    /// The file is only delivered if [`allow_file_access`] grants access to
    /// its URL.
    ///
    /// [`allow_file_access`]: SearchToolkit::allow_file_access
    #[instrument(skip(self, ctx, request, response), fields(path = request.path()))]
    pub fn serve_bridged_file(
        &self,
        ctx: &mut RequestSearchContext,
        request: &PageRequest,
        response: &mut dyn PageResponse,
    ) -> Result<DeliveryOutcome> {
        let file_url = extract_file_url(request.path())?;

        if !self.allow_file_access(ctx, request, &file_url)? {
            warn!(url = %file_url, "Denied access to file");
            return Err(DocgateError::FileAccessDenied { url: file_url });
        }

        let path = PathBuf::from(url_to_file_name(&file_url));
        let outcome = send_file(request, response, &path)?;
        info!(url = %file_url, outcome = ?outcome, "Served file");
        Ok(outcome)
    }

    pub fn pool(&self) -> &SearcherPool {
        &self.pool
    }
}

impl std::fmt::Debug for SearchToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchToolkit")
            .field("config_loaded", &self.loader.is_loaded())
            .field("pool", &self.pool)
            .finish()
    }
}
