//! Pooled searchers, one per index directory.
//!
//! Opening an index is expensive, so each directory gets one long-lived
//! searcher shared by all requests. Callers borrow it through a
//! [`SearcherLease`]; dropping the lease returns it, so a searcher is
//! released on every exit path, including a failed search.

use crate::engine::{IndexEngine, IndexSearcher};
use crate::error::Result;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Owns the searcher of one index directory.
struct SearcherManager {
    directory: PathBuf,
    searcher: OnceCell<Arc<dyn IndexSearcher>>,
    active: AtomicUsize,
}

impl SearcherManager {
    fn new(directory: &Path) -> Self {
        SearcherManager {
            directory: directory.to_path_buf(),
            searcher: OnceCell::new(),
            active: AtomicUsize::new(0),
        }
    }
}

/// Hands out searchers for index directories.
pub struct SearcherPool {
    engine: Arc<dyn IndexEngine>,
    managers: DashMap<PathBuf, Arc<SearcherManager>>,
}

impl SearcherPool {
    pub fn new(engine: Arc<dyn IndexEngine>) -> Self {
        SearcherPool {
            engine,
            managers: DashMap::new(),
        }
    }

    /// Borrow the searcher of `directory`, opening the index on first use.
    pub fn acquire(&self, directory: &Path) -> Result<SearcherLease> {
        let manager = self
            .managers
            .entry(directory.to_path_buf())
            .or_insert_with(|| Arc::new(SearcherManager::new(directory)))
            .clone();

        let searcher = manager
            .searcher
            .get_or_try_init(|| {
                debug!(directory = %directory.display(), "Opening index searcher");
                self.engine.open(directory)
            })?
            .clone();

        manager.active.fetch_add(1, Ordering::AcqRel);
        trace!(directory = %directory.display(), "Searcher acquired");
        Ok(SearcherLease { manager, searcher })
    }

    /// Number of leases currently out for `directory`.
    pub fn active_leases(&self, directory: &Path) -> usize {
        self.managers
            .get(directory)
            .map(|m| m.active.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Forget the searcher of `directory`; the next acquire reopens it.
    ///
    /// Outstanding leases keep working on the old searcher.
    pub fn invalidate(&self, directory: &Path) {
        if self.managers.remove(directory).is_some() {
            debug!(directory = %directory.display(), "Searcher invalidated");
        }
    }

    /// Number of directories with a manager
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl fmt::Debug for SearcherPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearcherPool")
            .field("directories", &self.managers.len())
            .finish()
    }
}

/// A borrowed searcher; released when dropped.
pub struct SearcherLease {
    manager: Arc<SearcherManager>,
    searcher: Arc<dyn IndexSearcher>,
}

impl SearcherLease {
    /// Directory of the leased searcher
    pub fn directory(&self) -> &Path {
        &self.manager.directory
    }
}

impl Deref for SearcherLease {
    type Target = dyn IndexSearcher;

    fn deref(&self) -> &Self::Target {
        self.searcher.as_ref()
    }
}

impl Drop for SearcherLease {
    fn drop(&mut self) {
        self.manager.active.fetch_sub(1, Ordering::AcqRel);
        trace!(directory = %self.manager.directory.display(), "Searcher released");
    }
}
