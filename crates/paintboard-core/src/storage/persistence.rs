//! Loading and saving a board as a manifest plus one blob per block.

use super::{BlockStore, Manifest, Region, RegionLockTable, StorageError, StorageResult};
use crate::grid::PixelGrid;
use crate::layout::{BlockId, BlockLayout};
use crate::palette::Palette;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Blocks copied into the grid.
    pub blocks_read: usize,
    /// Stored blocks outside the current layout, deleted after being read.
    pub blocks_removed: Vec<BlockId>,
}

/// A region that could not be written.
#[derive(Debug)]
pub struct SaveFailure {
    pub region: Region,
    pub error: StorageError,
}

/// Outcome of saving several regions. Saving continues past failures.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<SaveFailure>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, region: Region, result: StorageResult<bool>) {
        match result {
            Ok(true) => self.written += 1,
            Ok(false) => self.skipped += 1,
            Err(error) => self.failures.push(SaveFailure { region, error }),
        }
    }
}

/// Moves board content between a [`PixelGrid`] and a [`BlockStore`].
///
/// Tracks one dirty flag per block. A flag is cleared just before its
/// block is snapshotted, inside the block's lock, so a pixel written while
/// the save is in flight marks the block dirty again instead of being lost.
/// A failed write sets the flag back.
pub struct PersistenceManager {
    store: Arc<dyn BlockStore>,
    layout: BlockLayout,
    palette: Palette,
    locks: RegionLockTable,
    dirty: Box<[AtomicBool]>,
}

impl PersistenceManager {
    /// Every block starts dirty.
    pub fn new(store: Arc<dyn BlockStore>, layout: BlockLayout, palette: Palette) -> Self {
        let locks = RegionLockTable::new(&layout);
        let dirty = (0..layout.block_count()).map(|_| AtomicBool::new(true)).collect();
        Self {
            store,
            layout,
            palette,
            locks,
            dirty,
        }
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub fn ensure_ready(&self) -> StorageResult<()> {
        self.store.ensure_ready()
    }

    fn flag(&self, id: BlockId) -> Option<&AtomicBool> {
        self.layout.flat_index(id).map(|n| &self.dirty[n])
    }

    pub fn is_dirty(&self, id: BlockId) -> bool {
        self.flag(id).is_some_and(|f| f.load(Ordering::SeqCst))
    }

    pub fn mark_dirty(&self, id: BlockId) {
        if let Some(flag) = self.flag(id) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Read the stored board into `grid`.
    ///
    /// The stored manifest must carry the current format version and a
    /// palette that prefixes the configured one. Blocks are placed at the
    /// offsets the manifest recorded, so a board saved with a different
    /// geometry is clipped into the current one; stored blocks that fall
    /// outside the current block grid are deleted once every block has been
    /// read.
    ///
    /// Content is assembled off to the side and copied into `grid` only
    /// after every block has been read, so on error `grid` and the store are
    /// untouched.
    pub fn load(&self, grid: &PixelGrid) -> StorageResult<LoadReport> {
        let manifest = Manifest::from_json(&self.store.read_manifest()?)?;
        manifest.check_compatible(&self.palette)?;
        let stored = manifest.layout()?;

        let scratch = PixelGrid::new(grid.width(), grid.height(), grid.background());
        let mut report = LoadReport::default();
        let mut stale = Vec::new();

        for id in stored.blocks() {
            let Some(rect) = stored.block_rect(id) else {
                continue;
            };
            let data = self.store.read_block(id)?;
            let block = PixelGrid::from_bytes(rect.width, rect.height, grid.background(), &data)
                .ok_or_else(|| StorageError::BlockSize {
                    block: id,
                    expected: rect.area(),
                    found: data.len(),
                })?;
            scratch.copy_from(
                &block,
                rect.x as i64,
                rect.y as i64,
                0,
                0,
                rect.width,
                rect.height,
            );
            report.blocks_read += 1;

            if !self.layout.contains(id) {
                stale.push(id);
            }
        }

        for id in stale {
            match self.store.remove_block(id) {
                Ok(()) => {
                    log::info!("Removed block {id} outside the current layout");
                    report.blocks_removed.push(id);
                }
                Err(e) => log::warn!("Failed to remove stale block {id}: {e}"),
            }
        }

        grid.copy_from(&scratch, 0, 0, 0, 0, grid.width(), grid.height());
        Ok(report)
    }

    /// Overwrite the manifest with the current geometry and palette.
    pub fn save_manifest(&self) -> StorageResult<()> {
        let text = Manifest::new(&self.layout, &self.palette).to_json()?;
        self.locks
            .with_lock(Region::Manifest, || self.store.write_manifest(&text))
            .unwrap_or(Ok(()))
    }

    /// Write one block if it is dirty or `force` is set.
    ///
    /// Returns whether the block was written. A clean block with `force`
    /// unset returns `Ok(false)` without touching the store or its lock.
    pub fn save_block(&self, grid: &PixelGrid, id: BlockId, force: bool) -> StorageResult<bool> {
        let (Some(flag), Some(rect)) = (self.flag(id), self.layout.block_rect(id)) else {
            return Err(StorageError::UnknownBlock(id));
        };
        if !force && !flag.load(Ordering::SeqCst) {
            return Ok(false);
        }

        self.locks
            .with_lock(Region::Block(id), || {
                let was_dirty = flag.swap(false, Ordering::SeqCst);
                if !force && !was_dirty {
                    // Another save got here first.
                    return Ok(false);
                }
                let data = grid.read_rect(rect.x as i64, rect.y as i64, rect.width, rect.height);
                match self.store.write_block(id, &data) {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        flag.store(true, Ordering::SeqCst);
                        Err(e)
                    }
                }
            })
            .unwrap_or(Err(StorageError::UnknownBlock(id)))
    }

    /// Save every block, skipping clean ones unless `force` is set.
    pub fn save_blocks(&self, grid: &PixelGrid, force: bool) -> SaveReport {
        let mut report = SaveReport::default();
        for id in self.layout.blocks() {
            report.record(Region::Block(id), self.save_block(grid, id, force));
        }
        report
    }

    /// Save the manifest, then every block.
    pub fn save_all(&self, grid: &PixelGrid, force: bool) -> SaveReport {
        let mut report = SaveReport::default();
        report.record(Region::Manifest, self.save_manifest().map(|()| true));
        let blocks = self.save_blocks(grid, force);
        report.written += blocks.written;
        report.skipped += blocks.skipped;
        report.failures.extend(blocks.failures);
        report
    }
}
