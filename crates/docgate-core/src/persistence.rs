//! On-disk storage of a document index.
//!
//! Each index directory holds a single `docgate.idx`. A file written by
//! another format version is rejected rather than migrated; the importer
//! rebuilds it. Saves go through a temporary file and a rename, so readers
//! see either the old or the new index.
//!
//! ## Layout
//!
//! ```text
//! [Header: 32 bytes, bincode]
//!   - "DGIX"
//!   - format version (u32)
//!   - flag bits (u32), bit 0 = LZ4 body
//!   - number of documents (u64)
//!   - zero padding (12 bytes)
//!
//! [Body: variable]
//!   - bincode(stats, documents), optionally LZ4-compressed
//!
//! [Footer: 8 bytes]
//!   - CRC32 checksum of the body: u32
//!   - Magic: "XIGD" (4 bytes)
//! ```

use crate::error::{DocgateError, Result};
use crate::index::DocumentIndex;
use crate::types::{Document, IndexStats};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Leading magic of `docgate.idx`
pub const MAGIC_HEADER: &[u8; 4] = b"DGIX";
/// Trailing magic, the leading one reversed
pub const MAGIC_FOOTER: &[u8; 4] = b"XIGD";
/// Format version written by this build
pub const INDEX_VERSION: u32 = 1;

const HEADER_LEN: usize = 32;
const FOOTER_LEN: usize = 8;

/// Body encoding bits stored in the header
#[derive(Debug, Clone, Copy)]
pub struct IndexFlags(u32);

impl IndexFlags {
    /// No compression
    pub const NONE: Self = IndexFlags(0);
    /// LZ4 compression
    pub const COMPRESSED_LZ4: Self = IndexFlags(1);

    fn is_compressed(&self) -> bool {
        self.0 & 1 != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexHeader {
    magic: [u8; 4],
    version: u32,
    flags: u32,
    document_count: u64,
    reserved: [u8; 12],
}

impl IndexHeader {
    fn new(document_count: u64, flags: IndexFlags) -> Self {
        IndexHeader {
            magic: *MAGIC_HEADER,
            version: INDEX_VERSION,
            flags: flags.0,
            document_count,
            reserved: [0; 12],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.magic != *MAGIC_HEADER {
            return Err(DocgateError::IndexCorrupted {
                reason: "not a docgate index (bad header magic)".to_string(),
            });
        }
        if self.version != INDEX_VERSION {
            return Err(DocgateError::IndexVersionMismatch {
                found: self.version,
                expected: INDEX_VERSION,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIndex {
    stats: IndexStats,
    documents: Vec<Document>,
}

/// Manages persistence of a document index in its directory.
///
/// ## Example
///
/// ```rust,ignore
/// use docgate_core::{DocumentIndex, IndexStore};
///
/// let store = IndexStore::new("/var/lib/docgate/docs");
/// store.save(&DocumentIndex::new())?;
/// let loaded = store.load()?;
/// ```
#[derive(Debug, Clone)]
pub struct IndexStore {
    /// Index directory
    base_dir: PathBuf,

    /// Whether to use compression
    use_compression: bool,
}

impl IndexStore {
    /// Create a store for the given index directory.
    ///
    /// The directory will be created on the first save.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        IndexStore {
            base_dir: base_dir.as_ref().to_path_buf(),
            use_compression: true,
        }
    }

    /// Set whether to use compression when saving.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.use_compression = compress;
        self
    }

    /// Get the path to the index file.
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join("docgate.idx")
    }

    fn backup_path(&self) -> PathBuf {
        self.base_dir.join("docgate.idx.bak")
    }

    fn temp_path(&self) -> PathBuf {
        self.base_dir.join("docgate.idx.tmp")
    }

    /// Check if an index file exists.
    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Save the index to disk.
    ///
    /// Uses atomic write (write to temp, then rename) to prevent corruption.
    /// The previous index file is kept as a backup.
    pub fn save(&self, index: &DocumentIndex) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        let stored = StoredIndex {
            stats: index.stats(),
            documents: index.all_documents(),
        };
        let document_count = stored.documents.len() as u64;

        info!(
            path = %self.index_path().display(),
            documents = document_count,
            "Saving index to disk"
        );

        let serialized = bincode::serialize(&stored)?;
        let (flags, body) = if self.use_compression {
            (
                IndexFlags::COMPRESSED_LZ4,
                lz4_flex::compress_prepend_size(&serialized),
            )
        } else {
            (IndexFlags::NONE, serialized)
        };

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);

            let header = IndexHeader::new(document_count, flags);
            writer.write_all(&bincode::serialize(&header)?)?;
            writer.write_all(&body)?;

            let checksum = crc32fast::hash(&body);
            writer.write_all(&checksum.to_le_bytes())?;
            writer.write_all(MAGIC_FOOTER)?;

            writer.flush()?;
        }

        let index_path = self.index_path();
        let backup_path = self.backup_path();
        if index_path.exists() {
            if let Err(e) = fs::rename(&index_path, &backup_path) {
                warn!(error = %e, "Failed to keep backup of previous index");
            }
        }

        fs::rename(&temp_path, &index_path)?;

        debug!(compressed = flags.is_compressed(), "Index saved successfully");
        Ok(())
    }

    /// Load the index from disk.
    pub fn load(&self) -> Result<DocumentIndex> {
        let index_path = self.index_path();

        if !index_path.exists() {
            return Err(DocgateError::IndexNotFound { path: index_path });
        }

        info!(path = %index_path.display(), "Loading index from disk");

        let data = fs::read(&index_path)?;
        if data.len() < HEADER_LEN + FOOTER_LEN {
            return Err(DocgateError::IndexCorrupted {
                reason: format!("File too short ({} bytes)", data.len()),
            });
        }

        let header: IndexHeader = bincode::deserialize(&data[..HEADER_LEN])?;
        header.validate()?;
        let flags = IndexFlags(header.flags);

        let (body, footer) = data[HEADER_LEN..].split_at(data.len() - HEADER_LEN - FOOTER_LEN);

        if &footer[4..8] != MAGIC_FOOTER {
            return Err(DocgateError::IndexCorrupted {
                reason: "truncated index (bad footer magic)".to_string(),
            });
        }

        let stored_checksum = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let computed_checksum = crc32fast::hash(body);
        if stored_checksum != computed_checksum {
            return Err(DocgateError::IndexCorrupted {
                reason: format!(
                    "Checksum mismatch: expected {:08x}, got {:08x}",
                    stored_checksum, computed_checksum
                ),
            });
        }

        let decompressed;
        let bytes = if flags.is_compressed() {
            decompressed = lz4_flex::decompress_size_prepended(body).map_err(|e| {
                DocgateError::IndexCorrupted {
                    reason: format!("Decompression failed: {}", e),
                }
            })?;
            &decompressed[..]
        } else {
            body
        };

        let stored: StoredIndex =
            bincode::deserialize(bytes).map_err(|e| DocgateError::IndexCorrupted {
                reason: format!("Deserialization failed: {}", e),
            })?;

        if stored.documents.len() as u64 != header.document_count {
            return Err(DocgateError::IndexCorrupted {
                reason: format!(
                    "Header announces {} documents, body holds {}",
                    header.document_count,
                    stored.documents.len()
                ),
            });
        }

        let index = DocumentIndex::with_capacity(stored.documents.len());
        index.add_documents(stored.documents);
        index.set_stats(stored.stats);

        info!(documents = index.len(), "Index loaded successfully");
        Ok(index)
    }

    /// Load the index, or return a new empty one if there is none yet.
    ///
    /// A corrupted index is still an error.
    pub fn load_or_new(&self) -> Result<DocumentIndex> {
        match self.load() {
            Err(DocgateError::IndexNotFound { .. }) => Ok(DocumentIndex::new()),
            other => other,
        }
    }
}
