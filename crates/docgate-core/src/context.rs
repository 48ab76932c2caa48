//! Per-request search state.
//!
//! A [`RequestSearchContext`] is created empty for every request and passed
//! by reference through everything that handles that request. Each value
//! it holds is computed on first demand and then reused for the rest of
//! the request, so the resolved indexes, the query string and the search
//! results are computed at most once and every consumer sees the same
//! value. Contexts are never shared between requests.

use crate::config::IndexConfig;
use crate::error::Result;
use crate::results::SearchResults;
use std::sync::Arc;

/// An ordered, shared list of index configurations
pub type IndexConfigs = Arc<[Arc<IndexConfig>]>;

/// Request-scoped cache of search state.
#[derive(Debug, Default)]
pub struct RequestSearchContext {
    index_configs: Option<IndexConfigs>,
    expanded_index_configs: Option<IndexConfigs>,
    query: Option<Arc<str>>,
    results: Option<Arc<SearchResults>>,
    error: Option<String>,
}

impl RequestSearchContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes named by the request, if already resolved
    pub fn index_configs(&self) -> Option<&IndexConfigs> {
        self.index_configs.as_ref()
    }

    /// Indexes named by the request with parents expanded, if already resolved
    pub fn expanded_index_configs(&self) -> Option<&IndexConfigs> {
        self.expanded_index_configs.as_ref()
    }

    /// The query string, if already built
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The search results, if already computed
    pub fn results(&self) -> Option<&Arc<SearchResults>> {
        self.results.as_ref()
    }

    pub(crate) fn index_configs_or_try_init(
        &mut self,
        init: impl FnOnce() -> Result<Vec<Arc<IndexConfig>>>,
    ) -> Result<IndexConfigs> {
        memoize(&mut self.index_configs, || init().map(Into::into))
    }

    pub(crate) fn expanded_index_configs_or_try_init(
        &mut self,
        init: impl FnOnce() -> Result<Vec<Arc<IndexConfig>>>,
    ) -> Result<IndexConfigs> {
        memoize(&mut self.expanded_index_configs, || init().map(Into::into))
    }

    pub(crate) fn query_or_init(&mut self, init: impl FnOnce() -> String) -> Arc<str> {
        self.query.get_or_insert_with(|| init().into()).clone()
    }

    pub(crate) fn results_or_try_init(
        &mut self,
        init: impl FnOnce(&mut Self) -> Result<SearchResults>,
    ) -> Result<Arc<SearchResults>> {
        if let Some(results) = &self.results {
            return Ok(results.clone());
        }
        let results = Arc::new(init(self)?);
        self.results = Some(results.clone());
        Ok(results)
    }

    /// Remember the message of a failed request so the page can show it.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// The recorded error message, or an empty string
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

fn memoize<T: Clone>(slot: &mut Option<T>, init: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(value) = slot {
        return Ok(value.clone());
    }
    let value = init()?;
    *slot = Some(value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocgateError;
    use std::cell::Cell;

    #[test]
    fn test_index_configs_computed_once() {
        let mut ctx = RequestSearchContext::new();
        let calls = Cell::new(0);
        let init = || {
            calls.set(calls.get() + 1);
            Ok(vec![Arc::new(IndexConfig::new("docs", "/data/docs"))])
        };

        let first = ctx.index_configs_or_try_init(init).unwrap();
        let second = ctx.index_configs_or_try_init(init).unwrap();

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(ctx.expanded_index_configs().is_none());
    }

    #[test]
    fn test_failed_init_is_not_cached() {
        let mut ctx = RequestSearchContext::new();

        let result = ctx.index_configs_or_try_init(|| Err(DocgateError::NoIndexSpecified));
        assert!(result.is_err());
        assert!(ctx.index_configs().is_none());

        let configs = ctx.index_configs_or_try_init(|| Ok(Vec::new())).unwrap();
        assert!(configs.is_empty());
    }

    #[test]
    fn test_query_computed_once() {
        let mut ctx = RequestSearchContext::new();
        assert_eq!(&*ctx.query_or_init(|| "budget".to_string()), "budget");
        assert_eq!(&*ctx.query_or_init(|| "other".to_string()), "budget");
        assert_eq!(ctx.query(), Some("budget"));
    }

    #[test]
    fn test_error_message() {
        let mut ctx = RequestSearchContext::new();
        assert_eq!(ctx.error_message(), "");
        assert!(!ctx.has_error());

        ctx.record_error("The configuration does not contain the index 'nope'");
        assert!(ctx.has_error());
        assert!(ctx.error_message().contains("nope"));
    }
}
