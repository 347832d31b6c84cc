//! The authoritative board and its public operations.

use crate::error::BoardError;
use crate::events::{PixelUpdate, SubscriptionId, Subscribers};
use crate::grid::PixelGrid;
use crate::layout::{BlockId, BlockLayout};
use crate::palette::Palette;
use crate::storage::{
    BlockStore, LoadReport, PersistenceManager, SaveReport, StorageError, StorageResult,
};
use std::sync::Arc;

/// Geometry and palette of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub block_size: usize,
    pub colors: Vec<String>,
    /// Palette index of blank pixels and of anything read off the board.
    pub background: u8,
}

/// Owns the pixel grid, its persistence and its update listeners.
///
/// Reads and writes go straight to the grid without locking; persistence
/// locks per block. Coordinates and colors are not validated here beyond
/// the grid's own clipping, that is up to the protocol layer.
pub struct CanvasService {
    grid: PixelGrid,
    palette: Palette,
    persistence: PersistenceManager,
    subscribers: Subscribers,
}

impl CanvasService {
    /// Create a blank board. Nothing is read from or written to `store`.
    pub fn new(config: BoardConfig, store: Arc<dyn BlockStore>) -> Result<Self, BoardError> {
        let palette = Palette::new(config.colors)?;
        if !palette.contains_index(config.background) {
            return Err(BoardError::BackgroundOutOfRange {
                index: config.background,
                palette_len: palette.len(),
            });
        }
        let layout = BlockLayout::new(config.width, config.height, config.block_size)?;
        Ok(Self {
            grid: PixelGrid::new(config.width, config.height, config.background),
            persistence: PersistenceManager::new(store, layout, palette.clone()),
            palette,
            subscribers: Subscribers::new(),
        })
    }

    /// Create a board and bring it in line with `store`.
    ///
    /// Prepares the store, restores the saved board if there is a compatible
    /// one (falling back to blank otherwise), then force-saves everything so
    /// the store matches memory. Only a store that cannot be prepared is an
    /// error.
    pub fn open(config: BoardConfig, store: Arc<dyn BlockStore>) -> Result<Self, BoardError> {
        let service = Self::new(config, store)?;
        service.persistence.ensure_ready()?;

        match service.load() {
            Ok(report) => log::info!(
                "Loaded board: {} blocks read, {} stale blocks removed",
                report.blocks_read,
                report.blocks_removed.len()
            ),
            Err(StorageError::NotFound(_)) => log::info!("No saved board, starting blank"),
            Err(e) => log::warn!("Failed to load saved board, starting blank: {e}"),
        }

        let report = service.save_all();
        for failure in &report.failures {
            log::warn!("Initial save of {} failed: {}", failure.region, failure.error);
        }
        Ok(service)
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn background(&self) -> u8 {
        self.grid.background()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn layout(&self) -> &BlockLayout {
        self.persistence.layout()
    }

    pub fn get_pixel(&self, x: i64, y: i64) -> u8 {
        self.grid.get(x, y)
    }

    /// Write a pixel, mark its block dirty and notify listeners.
    ///
    /// Returns the owning block, or `None` when `(x, y)` is off the board,
    /// in which case nothing happens.
    pub fn set_pixel(&self, x: i64, y: i64, color: u8) -> Option<BlockId> {
        if !self.grid.set(x, y, color) {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let id = self.layout().block_of(x, y)?;
        // After the write: a save that snapshots before it sees the flag set again.
        self.persistence.mark_dirty(id);
        self.subscribers.emit(&PixelUpdate { x, y, color });
        Some(id)
    }

    /// [`set_pixel`](Self::set_pixel) followed by saving the owning block.
    pub fn set_pixel_and_save(&self, x: i64, y: i64, color: u8) -> StorageResult<bool> {
        match self.set_pixel(x, y, color) {
            Some(id) => self.save_block(id, false),
            None => Ok(false),
        }
    }

    /// A fresh `cx` by `cy` row-major buffer read from `(x, y)`, with the
    /// background index wherever the window leaves the board.
    ///
    /// Each pixel is read at its own instant; concurrent paints may show up
    /// in part of the window only.
    pub fn get_board_area(&self, x: i64, y: i64, cx: usize, cy: usize) -> Vec<u8> {
        self.grid.read_rect(x, y, cx, cy)
    }

    /// Copy of the whole board, row-major.
    pub fn get_board(&self) -> Vec<u8> {
        self.grid.to_bytes()
    }

    pub fn is_dirty(&self, id: BlockId) -> bool {
        self.persistence.is_dirty(id)
    }

    pub fn load(&self) -> StorageResult<LoadReport> {
        self.persistence.load(&self.grid)
    }

    pub fn save_block(&self, id: BlockId, force: bool) -> StorageResult<bool> {
        self.persistence.save_block(&self.grid, id, force)
    }

    pub fn save_blocks(&self, force: bool) -> SaveReport {
        self.persistence.save_blocks(&self.grid, force)
    }

    /// Save the manifest and force-save every block.
    pub fn save_all(&self) -> SaveReport {
        self.persistence.save_all(&self.grid, true)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&PixelUpdate) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
