//! Storage abstraction for board persistence.

mod file;
mod locks;
mod manifest;
mod memory;
mod persistence;

pub use file::FileStore;
pub use locks::{Region, RegionLockTable};
pub use manifest::{MANIFEST_VERSION, Manifest};
pub use memory::MemoryStore;
pub use persistence::{LoadReport, PersistenceManager, SaveFailure, SaveReport};

use crate::layout::BlockId;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Manifest version {found} does not match {expected}")]
    VersionMismatch { expected: String, found: String },
    #[error("Stored palette is not a prefix of the configured palette")]
    PaletteMismatch,
    #[error("Corrupt manifest: {0}")]
    Corrupt(String),
    #[error("Block {block} has {found} bytes, expected {expected}")]
    BlockSize {
        block: BlockId,
        expected: usize,
        found: usize,
    },
    #[error("Block {0} is not part of the layout")]
    UnknownBlock(BlockId),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend holding the manifest and one byte blob per block.
///
/// Writes replace the previous content wholesale. Implementations must be
/// safe to call from several threads; callers serialize access to any one
/// region through [`RegionLockTable`].
pub trait BlockStore: Send + Sync {
    /// Make the backend ready for use. Idempotent.
    fn ensure_ready(&self) -> StorageResult<()>;

    /// Read the manifest text, or [`StorageError::NotFound`].
    fn read_manifest(&self) -> StorageResult<String>;

    /// Replace the manifest text.
    fn write_manifest(&self, text: &str) -> StorageResult<()>;

    /// Read a block's raw bytes, or [`StorageError::NotFound`].
    fn read_block(&self, id: BlockId) -> StorageResult<Vec<u8>>;

    /// Replace a block's raw bytes.
    fn write_block(&self, id: BlockId, data: &[u8]) -> StorageResult<()>;

    /// Delete a block. Deleting a missing block is not an error.
    fn remove_block(&self, id: BlockId) -> StorageResult<()>;
}
