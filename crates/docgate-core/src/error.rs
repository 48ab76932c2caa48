//! Error types for Docgate core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the CLI uses `anyhow` for convenient error
//! handling at the top level.
//!
//! Every error is local to the request that raised it: there is no partial
//! result fallback and nothing here is ever written back into the shared
//! configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using DocgateError
pub type Result<T> = std::result::Result<T, DocgateError>;

/// Core error types for Docgate operations.
#[derive(Error, Debug)]
pub enum DocgateError {
    // === Configuration Errors ===
    /// A requested index name is not part of the search configuration
    #[error("the configuration does not contain the index '{name}'")]
    UnknownIndex { name: String },

    /// No `index` parameter was given and no default indexes are configured
    #[error("request parameter 'index' not specified and no default index configured")]
    NoIndexSpecified,

    /// The search configuration defines no indexes at all
    #[error("there are no indexes defined in the search configuration")]
    NoIndexesDefined,

    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An index refers to an access controller that was never registered
    #[error("index '{index}' refers to unknown access controller '{controller}' (registered: {registered})")]
    UnknownAccessController {
        index: String,
        controller: String,
        registered: String,
    },

    /// An access controller returned a group the index could never match
    #[error("access controller '{controller}' returned a group containing whitespace: '{group}'")]
    InvalidAccessGroup { controller: String, group: String },

    // === Query Errors ===
    /// A constructed query string does not parse
    #[error("query syntax error in '{query}': {reason}")]
    QuerySyntax { query: String, reason: String },

    // === Search and Delivery Errors ===
    /// Executing a search against an index failed
    #[error("{operation} failed: {source}")]
    Search {
        operation: String,
        #[source]
        source: Box<DocgateError>,
    },

    /// Streaming a file to the client failed
    #[error("sending file failed: {}", path.display())]
    SendFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested file is not visible in any of the request's indexes
    #[error("access to '{url}' is not allowed")]
    FileAccessDenied { url: String },

    // === Stored Value Errors ===
    /// A compressed stored field could not be decompressed
    #[error("couldn't uncompress field value of '{field}': {reason}")]
    Decompression { field: String, reason: String },

    /// A value could not be decoded (bad percent-encoding, invalid UTF-8, ...)
    #[error("decoding error: {reason}")]
    Decoding { reason: String },

    // === Index Storage Errors ===
    /// The index file is missing or could not be found
    #[error("index not found at {}", path.display())]
    IndexNotFound { path: PathBuf },

    /// The index file exists but is corrupted or unreadable
    #[error("index is corrupted: {reason}")]
    IndexCorrupted { reason: String },

    /// The index format version doesn't match the current version
    #[error("index version mismatch: found {found}, expected {expected}")]
    IndexVersionMismatch { found: u32, expected: u32 },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DocgateError {
    /// Returns true for errors caused by the search configuration or by
    /// index names that do not match it.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DocgateError::UnknownIndex { .. }
                | DocgateError::NoIndexSpecified
                | DocgateError::NoIndexesDefined
                | DocgateError::ConfigError { .. }
                | DocgateError::UnknownAccessController { .. }
        )
    }

    /// Returns true if the request itself is at fault (as opposed to the
    /// server, its indexes or its filesystem).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocgateError::UnknownIndex { .. }
                | DocgateError::NoIndexSpecified
                | DocgateError::QuerySyntax { .. }
                | DocgateError::FileAccessDenied { .. }
                | DocgateError::Decoding { .. }
        )
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        DocgateError::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(reason: impl Into<String>) -> Self {
        DocgateError::Decoding {
            reason: reason.into(),
        }
    }

    /// Wrap a failure of a search operation
    pub fn search(operation: impl Into<String>, source: DocgateError) -> Self {
        DocgateError::Search {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        DocgateError::Serialization(reason.into())
    }
}

impl From<bincode::Error> for DocgateError {
    fn from(err: bincode::Error) -> Self {
        DocgateError::Serialization(err.to_string())
    }
}
