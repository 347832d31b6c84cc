//! Directory-backed block store.

use super::{BlockStore, StorageError, StorageResult};
use crate::layout::BlockId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the data directory.
pub const MANIFEST_FILE: &str = "board.json";

/// Stores the manifest as `board.json` and each block as `block-<i>-<j>`
/// in one directory.
///
/// Every write lands in a temporary sibling first and is renamed over the
/// target, so readers never observe a half-written file.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path`. Nothing touches the disk until
    /// [`ensure_ready`](BlockStore::ensure_ready).
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_path.join(MANIFEST_FILE)
    }

    pub fn block_path(&self, id: BlockId) -> PathBuf {
        self.base_path.join(format!("block-{}-{}", id.i, id.j))
    }

    fn replace(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).map_err(|e| write_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| write_error(path, e))
    }
}

fn write_error(path: &Path, e: io::Error) -> StorageError {
    StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
}

fn read_error(path: &Path, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.display().to_string())
    } else {
        StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
    }
}

impl BlockStore for FileStore {
    fn ensure_ready(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).map_err(|e| {
            StorageError::Io(format!(
                "Failed to create data directory {}: {}",
                self.base_path.display(),
                e
            ))
        })
    }

    fn read_manifest(&self) -> StorageResult<String> {
        let path = self.manifest_path();
        fs::read_to_string(&path).map_err(|e| read_error(&path, e))
    }

    fn write_manifest(&self, text: &str) -> StorageResult<()> {
        self.replace(&self.manifest_path(), text.as_bytes())
    }

    fn read_block(&self, id: BlockId) -> StorageResult<Vec<u8>> {
        let path = self.block_path(id);
        fs::read(&path).map_err(|e| read_error(&path, e))
    }

    fn write_block(&self, id: BlockId, data: &[u8]) -> StorageResult<()> {
        self.replace(&self.block_path(id), data)
    }

    fn remove_block(&self, id: BlockId) -> StorageResult<()> {
        let path = self.block_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
