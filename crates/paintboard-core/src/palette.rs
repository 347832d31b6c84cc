//! The ordered list of paintable colors.

use crate::error::BoardError;

/// Largest palette a byte-per-pixel grid can address.
pub const MAX_COLORS: usize = 256;

/// Ordered, immutable color list. Pixels store an index into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self, BoardError> {
        if colors.is_empty() {
            return Err(BoardError::EmptyPalette);
        }
        if colors.len() > MAX_COLORS {
            return Err(BoardError::TooManyColors(colors.len()));
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn contains_index(&self, index: u8) -> bool {
        (index as usize) < self.colors.len()
    }

    /// Position of a color by name.
    pub fn position(&self, color: &str) -> Option<u8> {
        self.colors.iter().position(|c| c == color).map(|p| p as u8)
    }

    /// Whether a board saved with `stored` colors can be opened with this
    /// palette. Colors may be appended over time but never removed or
    /// reordered, so `stored` must be a prefix.
    pub fn is_compatible_with(&self, stored: &[String]) -> bool {
        self.colors.starts_with(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_palette_limits() {
        assert!(matches!(Palette::new(vec![]), Err(BoardError::EmptyPalette)));
        let too_many = (0..257).map(|i| format!("#{i:06x}")).collect();
        assert!(matches!(Palette::new(too_many), Err(BoardError::TooManyColors(257))));
        let max = (0..256).map(|i| format!("#{i:06x}")).collect();
        assert_eq!(Palette::new(max).unwrap().len(), 256);
    }

    #[test]
    fn test_prefix_compatibility() {
        let palette = Palette::new(colors(&["#fff", "#000", "#f00"])).unwrap();
        assert!(palette.is_compatible_with(&colors(&["#fff", "#000"])));
        assert!(palette.is_compatible_with(&colors(&["#fff", "#000", "#f00"])));
        assert!(!palette.is_compatible_with(&colors(&["#000", "#fff"])));
        assert!(!palette.is_compatible_with(&colors(&["#fff", "#000", "#f00", "#0f0"])));
    }

    #[test]
    fn test_position() {
        let palette = Palette::new(colors(&["#fff", "#000"])).unwrap();
        assert_eq!(palette.position("#000"), Some(1));
        assert_eq!(palette.position("#abc"), None);
        assert!(palette.contains_index(1));
        assert!(!palette.contains_index(2));
    }
}
