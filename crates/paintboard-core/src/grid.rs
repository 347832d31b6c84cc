//! Fixed-size grid of palette indices.
//!
//! Cells are atomic bytes so that many connections can read and paint the
//! same grid through a shared reference. Single-byte writes never tear;
//! two writes to the same cell race and the last one wins.

use std::sync::atomic::{AtomicU8, Ordering};

/// A row-major grid of palette indices.
///
/// Every operation is total over integer coordinates: reads outside the
/// grid return the background index and writes outside it are ignored.
pub struct PixelGrid {
    width: usize,
    height: usize,
    background: u8,
    cells: Box<[AtomicU8]>,
}

impl PixelGrid {
    /// Create a grid filled with `background`.
    pub fn new(width: usize, height: usize, background: u8) -> Self {
        let cells = (0..width * height).map(|_| AtomicU8::new(background)).collect();
        Self {
            width,
            height,
            background,
            cells,
        }
    }

    /// Wrap raw row-major bytes. Returns `None` when the length does not
    /// match `width * height`, or that product does not fit in `usize`.
    pub fn from_bytes(width: usize, height: usize, background: u8, data: &[u8]) -> Option<Self> {
        if width.checked_mul(height) != Some(data.len()) {
            return None;
        }
        let cells = data.iter().map(|&b| AtomicU8::new(b)).collect();
        Some(Self {
            width,
            height,
            background,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Index returned for coordinates outside the grid.
    pub fn background(&self) -> u8 {
        self.background
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u64, y as u64);
        if x >= self.width as u64 || y >= self.height as u64 {
            return None;
        }
        Some(x as usize + y as usize * self.width)
    }

    /// Read the palette index at `(x, y)`.
    pub fn get(&self, x: i64, y: i64) -> u8 {
        match self.index(x, y) {
            Some(pos) => self.cells[pos].load(Ordering::Relaxed),
            None => self.background,
        }
    }

    /// Write the palette index at `(x, y)`. Returns `false` if the
    /// coordinate lies outside the grid and nothing was written.
    pub fn set(&self, x: i64, y: i64, value: u8) -> bool {
        match self.index(x, y) {
            Some(pos) => {
                self.cells[pos].store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Copy a `cx` by `cy` window of `src` starting at `(sx, sy)` into this
    /// grid at `(dx, dy)`.
    ///
    /// Every pixel goes through [`get`](Self::get) and [`set`](Self::set),
    /// so the source and destination bounds clip independently: source
    /// pixels outside `src` arrive as its background, destination pixels
    /// outside `self` are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_from(
        &self,
        src: &PixelGrid,
        dx: i64,
        dy: i64,
        sx: i64,
        sy: i64,
        cx: usize,
        cy: usize,
    ) {
        for y in 0..cy as i64 {
            for x in 0..cx as i64 {
                self.set(dx + x, dy + y, src.get(sx + x, sy + y));
            }
        }
    }

    /// Extract a window as a fresh row-major buffer, filling coordinates
    /// outside the grid with the background index.
    pub fn read_rect(&self, x: i64, y: i64, cx: usize, cy: usize) -> Vec<u8> {
        let window = PixelGrid::new(cx, cy, self.background);
        window.copy_from(self, 0, 0, x, y, cx, cy);
        window.to_bytes()
    }

    /// Point-in-time copy of the whole grid, one relaxed load per cell.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }
}

impl std::fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_background() {
        let grid = PixelGrid::new(3, 2, 7);
        assert_eq!(grid.to_bytes(), vec![7; 6]);
    }

    #[test]
    fn test_set_then_get() {
        let grid = PixelGrid::new(4, 4, 0);
        assert!(grid.set(3, 2, 5));
        assert_eq!(grid.get(3, 2), 5);
        // row-major
        assert_eq!(grid.to_bytes()[3 + 2 * 4], 5);
    }

    #[test]
    fn test_out_of_range_is_total() {
        let grid = PixelGrid::new(4, 4, 2);
        assert!(!grid.set(-1, 0, 9));
        assert!(!grid.set(4, 0, 9));
        assert!(!grid.set(0, 4, 9));
        assert!(!grid.set(i64::MAX, i64::MIN, 9));
        assert_eq!(grid.get(-1, -1), 2);
        assert_eq!(grid.get(100, 0), 2);
        assert_eq!(grid.to_bytes(), vec![2; 16]);
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(PixelGrid::from_bytes(2, 2, 0, &[1, 2, 3]).is_none());
        let grid = PixelGrid::from_bytes(2, 2, 0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(1, 1), 4);
    }

    #[test]
    fn test_from_bytes_rejects_overflowing_size() {
        assert!(PixelGrid::from_bytes(usize::MAX, 2, 0, &[1, 2]).is_none());
        assert!(PixelGrid::from_bytes(1 << 33, 1 << 33, 0, &[1, 2]).is_none());
    }

    #[test]
    fn test_copy_from_clips_both_sides() {
        let src = PixelGrid::from_bytes(2, 2, 0, &[1, 2, 3, 4]).unwrap();
        let dst = PixelGrid::new(3, 3, 9);
        // Window hangs off the source's right edge and the destination's bottom edge.
        dst.copy_from(&src, 1, 2, 1, 0, 2, 2);
        assert_eq!(dst.to_bytes(), vec![9, 9, 9, 9, 9, 9, 9, 2, 0]);
    }

    #[test]
    fn test_read_rect_matches_get() {
        let grid = PixelGrid::new(5, 4, 1);
        for (i, (x, y)) in [(0, 0), (4, 3), (2, 1)].into_iter().enumerate() {
            grid.set(x, y, 10 + i as u8);
        }
        let (x0, y0, cx, cy) = (-2_i64, -1_i64, 9_usize, 7_usize);
        let area = grid.read_rect(x0, y0, cx, cy);
        assert_eq!(area.len(), cx * cy);
        for j in 0..cy {
            for i in 0..cx {
                assert_eq!(area[i + j * cx], grid.get(x0 + i as i64, y0 + j as i64));
            }
        }
    }
}
