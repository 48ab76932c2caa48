//! # Docgate Core Library
//!
//! This crate provides the request-facing half of a document search front
//! end: it decides which indexes a request may search, turns request
//! parameters into a query, restricts that query to the caller's access
//! groups, and serves the files that search hits point at through an
//! opaque file-to-HTTP bridge.
//!
//! ## Architecture
//!
//! - **Config** (`config`): Index definitions, TOML loading, load-once holder
//! - **Request** (`request`): Page request and response abstraction
//! - **Context** (`context`): Per-request memoized search state
//! - **Resolver** (`resolver`): Index names to index configurations
//! - **Builder** (`builder`): Request parameters to a query string
//! - **Query** (`query`): Query model and query-string parser
//! - **Access** (`access`): Access controllers and query restriction
//! - **Codec** (`codec`): Reversible file URL encoding for the bridge
//! - **Delivery** (`delivery`, `mime`): Conditional file streaming
//! - **Engine** (`engine`, `index`, `persistence`, `pool`): Index storage
//!   and pooled searchers
//! - **Results** (`results`, `hit`): Merged hits and their rendering
//! - **Toolkit** (`toolkit`): The process-wide facade
//!
//! ## Example
//!
//! ```rust
//! use docgate_core::{Document, DocumentIndex, PageRequest, Query};
//!
//! let index = DocumentIndex::new();
//! index.add_document(
//!     Document::new()
//!         .with_text("url", "file:///srv/docs/report.pdf")
//!         .with_text("content", "quarterly report"),
//! );
//!
//! let top = index.search(&Query::term("content", "report"), 10);
//! assert_eq!(top.total_hits, 1);
//!
//! let request = PageRequest::from_uri("/search?query=report&field.author=Smith");
//! assert_eq!(
//!     docgate_core::build_query_string(&request),
//!     "report author:\"Smith\""
//! );
//! ```

pub mod access;
pub mod builder;
pub mod codec;
pub mod config;
pub mod context;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod hit;
pub mod index;
pub mod mime;
pub mod persistence;
pub mod pool;
pub mod query;
pub mod request;
pub mod resolver;
pub mod results;
pub mod toolkit;
pub mod types;

// Re-export commonly used types
pub use access::{
    AccessController, AccessControllerRegistry, HeaderGroupsController, DEFAULT_GROUPS_HEADER,
};
pub use builder::build_query_string;
pub use codec::{encode_file_url, extract_file_url};
pub use config::{
    ConfigFactory, ConfigFile, ConfigLoader, IndexConfig, RewriteRule, SearchConfig,
    TomlConfigFactory,
};
pub use context::{IndexConfigs, RequestSearchContext};
pub use delivery::{send_file, DeliveryOutcome};
pub use engine::{DiskEngine, IndexEngine, IndexSearcher, MemoryEngine};
pub use error::{DocgateError, Result};
pub use index::DocumentIndex;
pub use persistence::IndexStore;
pub use pool::{SearcherLease, SearcherPool};
pub use query::{parse_query, Occur, Query};
pub use request::{BufferedResponse, PageRequest, PageResponse};
pub use results::{SearchHit, SearchResults};
pub use toolkit::SearchToolkit;
pub use types::{Document, IndexStats, ScoredDocument, TopDocs};
