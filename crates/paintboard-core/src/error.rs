//! Construction-time errors for a board.

use crate::layout::LayoutError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that prevent a board from being created at all.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Palette has {0} colors, at most 256 are supported")]
    TooManyColors(usize),
    #[error("Palette must contain at least one color")]
    EmptyPalette,
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Background index {index} is outside a palette of {palette_len} colors")]
    BackgroundOutOfRange { index: u8, palette_len: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
