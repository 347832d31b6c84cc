//! In-memory block store.

use super::{BlockStore, StorageError, StorageResult};
use crate::layout::BlockId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral boards.
///
/// Counts block writes and can be told to fail writes, which lets callers
/// observe how often persistence actually touches the backend.
#[derive(Default)]
pub struct MemoryStore {
    manifest: RwLock<Option<String>>,
    blocks: RwLock<HashMap<BlockId, Vec<u8>>>,
    block_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `write_block` calls so far.
    pub fn block_writes(&self) -> usize {
        self.block_writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with an IO error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Ids of every stored block.
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<_> = read(&self.blocks).keys().copied().collect();
        ids.sort();
        ids
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Io("Write rejected by memory store".to_string()))
        } else {
            Ok(())
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl BlockStore for MemoryStore {
    fn ensure_ready(&self) -> StorageResult<()> {
        Ok(())
    }

    fn read_manifest(&self) -> StorageResult<String> {
        read(&self.manifest)
            .clone()
            .ok_or_else(|| StorageError::NotFound("manifest".to_string()))
    }

    fn write_manifest(&self, text: &str) -> StorageResult<()> {
        self.check_writable()?;
        *write(&self.manifest) = Some(text.to_string());
        Ok(())
    }

    fn read_block(&self, id: BlockId) -> StorageResult<Vec<u8>> {
        read(&self.blocks)
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("block {id}")))
    }

    fn write_block(&self, id: BlockId, data: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        write(&self.blocks).insert(id, data.to_vec());
        self.block_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_block(&self, id: BlockId) -> StorageResult<()> {
        write(&self.blocks).remove(&id);
        Ok(())
    }
}
