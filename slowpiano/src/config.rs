//! Piano roll configuration
//!
//! Stored as JSON in the slowOS config directory
//! (`~/.config/slowos/slowpiano.json` on Linux). A missing or broken file
//! means defaults; the app never refuses to start over its config.

use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollError};
use crate::tracker::RetriggerPolicy;

/// Inclusive window of playable MIDI notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteRange {
    pub first: u8,
    pub last: u8,
}

impl NoteRange {
    pub fn new(first: u8, last: u8) -> Result<Self> {
        if first > last || last > 127 {
            return Err(RollError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, note: u8) -> bool {
        (self.first..=self.last).contains(&note)
    }

    /// Number of notes (columns) in the range.
    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Column index of `note`, or None if it is out of range.
    pub fn index_of(&self, note: u8) -> Option<usize> {
        self.contains(note).then(|| (note - self.first) as usize)
    }

    pub fn notes(&self) -> impl Iterator<Item = u8> {
        self.first..=self.last
    }
}

/// C3..=F4, the range the home-row shortcuts cover.
impl Default for NoteRange {
    fn default() -> Self {
        Self { first: 48, last: 65 }
    }
}

/// RGB triples so the file stays readable without egui's serde feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollPalette {
    pub background: [u8; 3],
    pub grid: [u8; 3],
    pub black_key: [u8; 3],
    pub beam: [u8; 3],
}

impl Default for RollPalette {
    fn default() -> Self {
        Self {
            background: [0x1E, 0x1E, 0x1E],
            grid: [0x33, 0x33, 0x33],
            black_key: [0x1A, 0x1A, 0x1A],
            beam: [0xFF, 0x7F, 0x50],
        }
    }
}

impl RollPalette {
    pub fn background(&self) -> Color32 {
        rgb(self.background)
    }

    pub fn grid(&self) -> Color32 {
        rgb(self.grid)
    }

    pub fn black_key(&self) -> Color32 {
        rgb(self.black_key)
    }

    pub fn beam(&self) -> Color32 {
        rgb(self.beam)
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    /// First playable MIDI note (inclusive)
    pub note_range_first: u8,
    /// Last playable MIDI note (inclusive)
    pub note_range_last: u8,
    /// Initial roll width in pixels; the roll follows the window after that
    pub canvas_width: f32,
    /// Roll height in pixels
    pub canvas_height: f32,
    /// Scroll speed in pixels per second
    pub scroll_rate: f64,
    /// Beam width as a fraction of one column
    pub beam_thickness: f32,
    /// Pixels between horizontal time lines
    pub grid_spacing: f32,
    /// How far past the top edge a span may travel before it is dropped.
    /// `None` uses the viewport height.
    pub evict_margin: Option<f32>,
    pub retrigger: RetriggerPolicy,
    pub palette: RollPalette,
}

impl Default for RollConfig {
    fn default() -> Self {
        let range = NoteRange::default();
        Self {
            note_range_first: range.first,
            note_range_last: range.last,
            canvas_width: 600.0,
            canvas_height: 400.0,
            scroll_rate: 100.0,
            beam_thickness: 0.6,
            grid_spacing: 20.0,
            evict_margin: None,
            retrigger: RetriggerPolicy::default(),
            palette: RollPalette::default(),
        }
    }
}

impl RollConfig {
    pub fn note_range(&self) -> Result<NoteRange> {
        NoteRange::new(self.note_range_first, self.note_range_last)
    }

    /// Eviction margin for a viewport of the given height.
    pub fn evict_margin(&self, viewport_height: f32) -> f32 {
        self.evict_margin.unwrap_or(viewport_height).max(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        self.note_range()?;
        if !(self.canvas_width.is_finite() && self.canvas_width >= 0.0)
            || !(self.canvas_height.is_finite() && self.canvas_height >= 0.0)
        {
            return Err(RollError::InvalidConfig(format!(
                "canvas size {}x{} must be finite and non-negative",
                self.canvas_width, self.canvas_height
            )));
        }
        if !(self.scroll_rate.is_finite() && self.scroll_rate > 0.0) {
            return Err(RollError::InvalidConfig(format!(
                "scroll_rate {} must be positive",
                self.scroll_rate
            )));
        }
        if !(self.beam_thickness > 0.0 && self.beam_thickness <= 1.0) {
            return Err(RollError::InvalidConfig(format!(
                "beam_thickness {} must be in (0, 1]",
                self.beam_thickness
            )));
        }
        if !(self.grid_spacing.is_finite() && self.grid_spacing > 0.0) {
            return Err(RollError::InvalidConfig(format!(
                "grid_spacing {} must be positive",
                self.grid_spacing
            )));
        }
        if let Some(margin) = self.evict_margin {
            if !(margin.is_finite() && margin >= 0.0) {
                return Err(RollError::InvalidConfig(format!(
                    "evict_margin {} must be finite and non-negative",
                    margin
                )));
            }
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "slowos")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp/slowos"))
            .join("slowpiano.json")
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}
