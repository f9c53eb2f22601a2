use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys::KeyMap;
use crate::types::{SpectrogramParameters, Tag};

/// Engine configuration. Every field has a default, so a partial JSON
/// document (or none at all) is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the tile rendering service.
    pub tile_url: String,
    /// Tiles kept in the LRU cache; 0 keeps everything.
    pub tile_cache_capacity: usize,
    /// Radius around edit handles that grabs them.
    pub handle_radius_px: f64,
    /// Slack when hit-testing thin shapes (time stamps, points).
    pub hit_tolerance_px: f64,
    /// Pointer travel below which a press/release is a click, not a drag.
    pub click_slop_px: f64,
    /// Tags attached to every annotation created in draw mode.
    pub default_tags: Vec<Tag>,
    pub auto_scroll: bool,
    pub fixed_aspect_ratio: bool,
    pub show_labels: bool,
    /// Zoom factor applied per wheel notch or zoom key.
    pub zoom_step: f64,
    /// Request the tiles left and right of the view once it has loaded.
    pub prefetch_neighbours: bool,
    pub parameters: SpectrogramParameters,
    pub keys: KeyMap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_url: "/api/v1/spectrograms/".to_string(),
            tile_cache_capacity: 128,
            handle_radius_px: 6.0,
            hit_tolerance_px: 5.0,
            click_slop_px: 3.0,
            default_tags: Vec::new(),
            auto_scroll: true,
            fixed_aspect_ratio: false,
            show_labels: true,
            zoom_step: 1.25,
            prefetch_neighbours: true,
            parameters: SpectrogramParameters::default(),
            keys: KeyMap::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Display toggles shared by every canvas of one annotation view. Built once
/// when the view mounts and changed only through its setters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplaySettings {
    show_labels: bool,
    auto_scroll: bool,
    fixed_aspect_ratio: bool,
}

impl DisplaySettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            show_labels: config.show_labels,
            auto_scroll: config.auto_scroll,
            fixed_aspect_ratio: config.fixed_aspect_ratio,
        }
    }

    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn fixed_aspect_ratio(&self) -> bool {
        self.fixed_aspect_ratio
    }

    pub fn set_show_labels(&mut self, on: bool) {
        self.show_labels = on;
    }

    pub fn set_auto_scroll(&mut self, on: bool) {
        self.auto_scroll = on;
    }

    pub fn set_fixed_aspect_ratio(&mut self, on: bool) {
        self.fixed_aspect_ratio = on;
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = EngineConfig::from_json(r#"{"tile_cache_capacity": 16, "default_tags": [{"key": "species", "value": "Myotis"}]}"#).unwrap();
        assert_eq!(cfg.tile_cache_capacity, 16);
        assert_eq!(cfg.default_tags, vec![Tag::new("species", "Myotis")]);
        assert_eq!(cfg.tile_url, EngineConfig::default().tile_url);
        assert_eq!(cfg.parameters, SpectrogramParameters::default());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_display_settings_setters() {
        let mut settings = DisplaySettings::default();
        assert!(settings.show_labels());
        settings.set_show_labels(false);
        settings.set_fixed_aspect_ratio(true);
        assert!(!settings.show_labels());
        assert!(settings.fixed_aspect_ratio());
    }
}
