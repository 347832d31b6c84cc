//! One exclusive lock per persisted region.

use crate::layout::{BlockId, BlockLayout};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// A unit of persistence that is written as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Manifest,
    Block(BlockId),
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Manifest => write!(f, "manifest"),
            Region::Block(id) => write!(f, "block {id}"),
        }
    }
}

/// Locks for the manifest and every block of a layout.
///
/// Sized once from the layout and never resized. Callers hold at most one
/// region lock at a time, so there is no ordering between locks to get
/// wrong.
pub struct RegionLockTable {
    manifest: Mutex<()>,
    blocks: Vec<Mutex<()>>,
    layout: BlockLayout,
}

impl RegionLockTable {
    pub fn new(layout: &BlockLayout) -> Self {
        Self {
            manifest: Mutex::new(()),
            blocks: (0..layout.block_count()).map(|_| Mutex::new(())).collect(),
            layout: layout.clone(),
        }
    }

    fn mutex(&self, region: Region) -> Option<&Mutex<()>> {
        match region {
            Region::Manifest => Some(&self.manifest),
            Region::Block(id) => self.layout.flat_index(id).map(|n| &self.blocks[n]),
        }
    }

    /// Acquire the lock for `region`, or `None` if the region is not part
    /// of the layout. A lock poisoned by a panicking holder is reclaimed.
    pub fn lock(&self, region: Region) -> Option<MutexGuard<'_, ()>> {
        self.mutex(region)
            .map(|m| m.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Run `f` while holding the lock for `region`. The lock is released on
    /// every exit path, including unwinding out of `f`.
    pub fn with_lock<T>(&self, region: Region, f: impl FnOnce() -> T) -> Option<T> {
        let _guard = self.lock(region)?;
        Some(f())
    }
}
