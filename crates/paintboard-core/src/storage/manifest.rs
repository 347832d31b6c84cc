//! The durable description of board geometry and palette.

use super::{StorageError, StorageResult};
use crate::layout::BlockLayout;
use crate::palette::Palette;
use serde::{Deserialize, Serialize};

/// Format version written into every manifest. Loading refuses any other.
pub const MANIFEST_VERSION: &str = "1.0";

/// Contents of `board.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub width: usize,
    pub height: usize,
    pub cx_blocks: usize,
    pub cy_blocks: usize,
    pub block_x: Vec<usize>,
    pub block_y: Vec<usize>,
    pub colors: Vec<String>,
}

impl Manifest {
    pub fn new(layout: &BlockLayout, palette: &Palette) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            width: layout.width(),
            height: layout.height(),
            cx_blocks: layout.cx_blocks(),
            cy_blocks: layout.cy_blocks(),
            block_x: layout.block_x().to_vec(),
            block_y: layout.block_y().to_vec(),
            colors: palette.colors().to_vec(),
        }
    }

    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn from_json(text: &str) -> StorageResult<Self> {
        serde_json::from_str(text).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    /// Check that this manifest can be opened with `palette`.
    pub fn check_compatible(&self, palette: &Palette) -> StorageResult<()> {
        if self.version != MANIFEST_VERSION {
            return Err(StorageError::VersionMismatch {
                expected: MANIFEST_VERSION.to_string(),
                found: self.version.clone(),
            });
        }
        if !palette.is_compatible_with(&self.colors) {
            return Err(StorageError::PaletteMismatch);
        }
        Ok(())
    }

    /// Rebuild the block layout the manifest was written with.
    pub fn layout(&self) -> StorageResult<BlockLayout> {
        if self.block_x.len().checked_sub(1) != Some(self.cx_blocks)
            || self.block_y.len().checked_sub(1) != Some(self.cy_blocks)
        {
            return Err(StorageError::Corrupt(
                "block counts do not match boundary arrays".to_string(),
            ));
        }
        let layout = BlockLayout::from_boundaries(self.block_x.clone(), self.block_y.clone())
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        if layout.width() != self.width || layout.height() != self.height {
            return Err(StorageError::Corrupt(
                "boundaries do not end at the board size".to_string(),
            ));
        }
        Ok(layout)
    }
}
