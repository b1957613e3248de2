//! Project loading options
//!
//! Options can be built in code or read from TOML:
//!
//! ```toml
//! strict = false
//! start_z_index = -10
//!
//! [[path_map]]
//! pattern = "(.*)\\.png$"
//! output = "/static/[match].png"
//!
//! [[path_map]]
//! path = "legacy_tiles.png"
//! output = "/static/tiles.png"
//! ```

use crate::{ConfigError, PathMap, PathMapping};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// How a project is loaded and composed
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    /// Validate documents before use
    pub strict: bool,
    /// Skip image loading; tilesets get dimension-only handles
    pub headless: bool,
    /// Paint order of the backmost layer of every level
    pub start_z_index: i64,
    /// Report the level background color when composing
    pub use_map_background_color: bool,
    /// Report the bounds of the composed tile layers
    pub use_tilemap_camera_strategy: bool,
    /// Report the entity flagged with a truthy `camera` field
    pub use_entity_camera: bool,
    pub path_map: PathMap,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            strict: true,
            headless: false,
            start_z_index: 0,
            use_map_background_color: false,
            use_tilemap_camera_strategy: false,
            use_entity_camera: false,
            path_map: PathMap::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OptionsFile {
    strict: bool,
    headless: bool,
    start_z_index: i64,
    use_map_background_color: bool,
    use_tilemap_camera_strategy: bool,
    use_entity_camera: bool,
    path_map: Vec<PathMapEntry>,
}

impl Default for OptionsFile {
    fn default() -> Self {
        let defaults = ProjectOptions::default();
        Self {
            strict: defaults.strict,
            headless: defaults.headless,
            start_z_index: defaults.start_z_index,
            use_map_background_color: defaults.use_map_background_color,
            use_tilemap_camera_strategy: defaults.use_tilemap_camera_strategy,
            use_entity_camera: defaults.use_entity_camera,
            path_map: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PathMapEntry {
    path: Option<String>,
    pattern: Option<String>,
    output: String,
}

impl PathMapEntry {
    fn into_mapping(self, index: usize) -> Result<PathMapping, ConfigError> {
        match (self.path, self.pattern) {
            (Some(path), None) => Ok(PathMapping::literal(path, self.output)),
            (None, Some(pattern)) => {
                let regex = Regex::new(&pattern)
                    .map_err(|error| ConfigError::InvalidPattern { pattern, error })?;
                Ok(PathMapping::pattern(regex, self.output))
            }
            _ => Err(ConfigError::InvalidEntry { index }),
        }
    }
}

impl ProjectOptions {
    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: OptionsFile = toml::from_str(content)?;
        let path_map = file
            .path_map
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_mapping(index))
            .collect::<Result<PathMap, _>>()?;

        Ok(Self {
            strict: file.strict,
            headless: file.headless,
            start_z_index: file.start_z_index,
            use_map_background_color: file.use_map_background_color,
            use_tilemap_camera_strategy: file.use_tilemap_camera_strategy,
            use_entity_camera: file.use_entity_camera,
            path_map,
        })
    }

    /// Read options from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_start_z_index(mut self, start_z_index: i64) -> Self {
        self.start_z_index = start_z_index;
        self
    }

    pub fn with_path_map(mut self, path_map: PathMap) -> Self {
        self.path_map = path_map;
        self
    }

    /// Enable every report produced when composing
    pub fn with_scene_hints(mut self) -> Self {
        self.use_map_background_color = true;
        self.use_tilemap_camera_strategy = true;
        self.use_entity_camera = true;
        self
    }
}
