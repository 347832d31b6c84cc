//! Server configuration.
//!
//! Read from a JSON file; every field is optional and falls back to the
//! defaults below. A missing file means "all defaults".

use anyhow::Context;
use paintboard_core::BoardConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 60;

const DEFAULT_COLORS: [&str; 16] = [
    "#ffffff", "#e4e4e4", "#888888", "#222222", "#ffa7d1", "#e50000", "#e59500", "#a06a42",
    "#e5d900", "#94e044", "#02be01", "#00d3dd", "#0083c7", "#0000ea", "#cf6ee4", "#820080",
];

/// Background color, by palette index or by color value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundColor {
    Index(u8),
    Color(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSection {
    pub width: usize,
    pub height: usize,
    pub block_size: usize,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 800,
            block_size: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub autosave_interval_secs: u64,
    pub board: BoardSection,
    pub colors: Vec<String>,
    pub bg_color: BackgroundColor,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 3030,
            data_dir: PathBuf::from("data/paint-board"),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            board: BoardSection::default(),
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            bg_color: BackgroundColor::Index(0),
        }
    }
}

impl ServerConfig {
    /// Load from `path`; defaults if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    /// Palette index of the background. A color that is not in the palette
    /// resolves to 0.
    pub fn background_index(&self) -> u8 {
        match &self.bg_color {
            BackgroundColor::Index(i) => *i,
            BackgroundColor::Color(c) => {
                self.colors.iter().position(|x| x == c).map_or(0, |p| p as u8)
            }
        }
    }

    pub fn board_config(&self) -> BoardConfig {
        BoardConfig {
            width: self.board.width,
            height: self.board.height,
            block_size: self.board.block_size,
            colors: self.colors.clone(),
            background: self.background_index(),
        }
    }
}
