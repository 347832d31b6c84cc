//! Paintboard Core Library
//!
//! Storage and synchronization engine for a shared pixel board: an
//! in-memory grid of palette indices, split into fixed-size blocks that are
//! persisted independently, with per-block locking for concurrent saves and
//! a listener registry for fanning out accepted paints.

pub mod error;
pub mod events;
pub mod grid;
pub mod layout;
pub mod palette;
pub mod service;
pub mod storage;

pub use error::BoardError;
pub use events::{PixelUpdate, SubscriptionId, Subscribers};
pub use grid::PixelGrid;
pub use layout::{BlockId, BlockLayout, BlockRect, LayoutError};
pub use palette::{MAX_COLORS, Palette};
pub use service::{BoardConfig, CanvasService};
pub use storage::{
    BlockStore, FileStore, LoadReport, MANIFEST_VERSION, Manifest, MemoryStore,
    PersistenceManager, Region, RegionLockTable, SaveFailure, SaveReport, StorageError,
    StorageResult,
};
