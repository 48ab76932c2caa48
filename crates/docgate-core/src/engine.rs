//! Index engine abstraction.
//!
//! The resolution, access-control and bridge code never evaluates queries
//! itself. It hands a [`Query`] to an [`IndexSearcher`] obtained from an
//! [`IndexEngine`] for the index directory, which lets tests and embedders
//! substitute their own engine.

use crate::error::{DocgateError, Result};
use crate::index::DocumentIndex;
use crate::persistence::IndexStore;
use crate::query::Query;
use crate::types::TopDocs;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A searchable view of one index.
pub trait IndexSearcher: Send + Sync {
    /// Run `query`, returning at most `limit` hits and the total hit count.
    fn search(&self, query: &Query, limit: usize) -> Result<TopDocs>;

    /// Number of documents in the index
    fn document_count(&self) -> u64;
}

/// Opens searchers for index directories.
pub trait IndexEngine: Send + Sync {
    fn open(&self, directory: &Path) -> Result<Arc<dyn IndexSearcher>>;
}

/// Opens indexes persisted by [`IndexStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskEngine;

impl IndexEngine for DiskEngine {
    fn open(&self, directory: &Path) -> Result<Arc<dyn IndexSearcher>> {
        let index = IndexStore::new(directory).load()?;
        info!(
            directory = %directory.display(),
            documents = index.len(),
            "Opened index"
        );
        Ok(Arc::new(index))
    }
}

/// Serves indexes that live only in memory, keyed by directory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    indexes: DashMap<PathBuf, Arc<DocumentIndex>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `index` for `directory`
    pub fn insert(&self, directory: impl Into<PathBuf>, index: Arc<DocumentIndex>) {
        self.indexes.insert(directory.into(), index);
    }

    /// Builder form of [`MemoryEngine::insert`]
    pub fn with_index(self, directory: impl Into<PathBuf>, index: DocumentIndex) -> Self {
        self.insert(directory, Arc::new(index));
        self
    }
}

impl IndexEngine for MemoryEngine {
    fn open(&self, directory: &Path) -> Result<Arc<dyn IndexSearcher>> {
        let index: Arc<DocumentIndex> = self
            .indexes
            .get(directory)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DocgateError::IndexNotFound {
                path: directory.to_path_buf(),
            })?;
        Ok(index as Arc<dyn IndexSearcher>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use tempfile::TempDir;

    #[test]
    fn test_disk_engine_opens_saved_index() {
        let temp_dir = TempDir::new().unwrap();
        let index = DocumentIndex::new();
        index.add_document(Document::new().with_text("content", "hello"));
        IndexStore::new(temp_dir.path()).save(&index).unwrap();

        let searcher = DiskEngine.open(temp_dir.path()).unwrap();
        assert_eq!(searcher.document_count(), 1);
        let top = searcher.search(&Query::term("content", "hello"), 10).unwrap();
        assert_eq!(top.total_hits, 1);
    }

    #[test]
    fn test_disk_engine_missing_index() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            DiskEngine.open(temp_dir.path()),
            Err(DocgateError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_memory_engine() {
        let engine = MemoryEngine::new().with_index("/data/docs", DocumentIndex::new());
        assert!(engine.open(Path::new("/data/docs")).is_ok());
        assert!(engine.open(Path::new("/data/other")).is_err());
    }
}
