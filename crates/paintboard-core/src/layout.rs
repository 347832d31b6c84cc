//! Partition of the board into persisted blocks.

use std::fmt;

/// Index pair of a block: `i` along x, `j` along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub i: usize,
    pub j: usize,
}

impl BlockId {
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.i, self.j)
    }
}

/// Pixel footprint of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl BlockRect {
    /// Pixel count, saturating at `usize::MAX`.
    pub fn area(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

/// Why a set of boundary arrays cannot describe a layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("block size must be positive")]
    ZeroBlockSize,
    #[error("{axis} boundaries must start at 0 and strictly increase")]
    NotIncreasing { axis: char },
}

/// Boundary coordinates of every block column and row.
///
/// Block `(i, j)` covers `[block_x[i], block_x[i + 1]) x [block_y[j], block_y[j + 1])`.
/// The last block on each axis may be shorter than the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    block_x: Vec<usize>,
    block_y: Vec<usize>,
}

fn boundaries(dim: usize, block_size: usize) -> Vec<usize> {
    let count = dim.div_ceil(block_size);
    let mut out: Vec<usize> = (0..count).map(|k| k * block_size).collect();
    out.push(dim);
    out
}

fn check_axis(axis: char, bounds: &[usize]) -> Result<(), LayoutError> {
    let starts_at_zero = bounds.first() == Some(&0);
    let increasing = bounds.windows(2).all(|w| w[0] < w[1]);
    if starts_at_zero && increasing {
        Ok(())
    } else {
        Err(LayoutError::NotIncreasing { axis })
    }
}

impl BlockLayout {
    /// Cut a `width` by `height` board into `block_size` squares.
    pub fn new(width: usize, height: usize, block_size: usize) -> Result<Self, LayoutError> {
        if block_size == 0 {
            return Err(LayoutError::ZeroBlockSize);
        }
        Ok(Self {
            block_x: boundaries(width, block_size),
            block_y: boundaries(height, block_size),
        })
    }

    /// Rebuild a layout from stored boundary arrays.
    pub fn from_boundaries(block_x: Vec<usize>, block_y: Vec<usize>) -> Result<Self, LayoutError> {
        check_axis('x', &block_x)?;
        check_axis('y', &block_y)?;
        Ok(Self { block_x, block_y })
    }

    pub fn width(&self) -> usize {
        self.block_x.last().copied().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.block_y.last().copied().unwrap_or(0)
    }

    /// Number of block columns.
    pub fn cx_blocks(&self) -> usize {
        self.block_x.len() - 1
    }

    /// Number of block rows.
    pub fn cy_blocks(&self) -> usize {
        self.block_y.len() - 1
    }

    pub fn block_count(&self) -> usize {
        self.cx_blocks() * self.cy_blocks()
    }

    pub fn block_x(&self) -> &[usize] {
        &self.block_x
    }

    pub fn block_y(&self) -> &[usize] {
        &self.block_y
    }

    pub fn contains(&self, id: BlockId) -> bool {
        id.i < self.cx_blocks() && id.j < self.cy_blocks()
    }

    /// Flat index of a block, column-major to match the iteration order of
    /// [`blocks`](Self::blocks).
    pub fn flat_index(&self, id: BlockId) -> Option<usize> {
        self.contains(id).then(|| id.i * self.cy_blocks() + id.j)
    }

    pub fn block_rect(&self, id: BlockId) -> Option<BlockRect> {
        if !self.contains(id) {
            return None;
        }
        Some(BlockRect {
            x: self.block_x[id.i],
            y: self.block_y[id.j],
            width: self.block_x[id.i + 1] - self.block_x[id.i],
            height: self.block_y[id.j + 1] - self.block_y[id.j],
        })
    }

    /// Block owning pixel `(x, y)`, found by searching the boundary arrays.
    pub fn block_of(&self, x: usize, y: usize) -> Option<BlockId> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = self.block_x.partition_point(|&b| b <= x) - 1;
        let j = self.block_y.partition_point(|&b| b <= y) - 1;
        Some(BlockId { i, j })
    }

    /// Every block, columns outermost.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        let rows = self.cy_blocks();
        (0..self.cx_blocks()).flat_map(move |i| (0..rows).map(move |j| BlockId { i, j }))
    }
}
