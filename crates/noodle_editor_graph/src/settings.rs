// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings, stored as RON.

use crate::noodle::NoodleStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "noodle_editor.ron";

/// Errors raised while reading or writing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed settings file
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be rendered
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Tunables for the interaction layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Radius in graph units within which a dragged noodle snaps to a socket
    pub snap_distance: f32,
    /// Smallest zoom factor
    pub zoom_min: f32,
    /// Largest zoom factor
    pub zoom_max: f32,
    /// Relative zoom change per wheel notch
    pub zoom_step: f32,
    /// Debounce delay before an edit is persisted
    pub autosave_delay_ms: u64,
    /// Box selections no larger than this (in screen pixels) clear the selection
    pub box_select_threshold: f32,
    /// Noodle drawing style
    pub noodle_style: NoodleStyle,
    /// Width of newly created nodes
    pub default_node_width: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_distance: 20.0,
            zoom_min: 0.25,
            zoom_max: 3.0,
            zoom_step: 0.1,
            autosave_delay_ms: 100,
            box_select_threshold: 4.0,
            noodle_style: NoodleStyle::Smooth,
            default_node_width: crate::node::DEFAULT_NODE_WIDTH,
        }
    }
}

impl EditorSettings {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Save settings as pretty RON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved editor settings to {}", path.display());
        Ok(())
    }

    /// Autosave debounce delay
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Zoom factor for one wheel notch; positive deltas zoom out
    pub fn wheel_zoom_factor(&self, delta_y: f32) -> f32 {
        if delta_y > 0.0 {
            1.0 - self.zoom_step
        } else {
            1.0 + self.zoom_step
        }
    }
}
