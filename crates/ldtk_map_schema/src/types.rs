//! Document types for LDtk project and level files
//!
//! Field names follow the published LDtk JSON format. Every struct accepts
//! missing fields (`#[serde(default)]`) so that relaxed loading only assumes
//! the minimal shape; strict loading runs [`crate::validate_project`] or
//! [`crate::validate_level`] over the raw JSON first.

use serde::{Deserialize, Serialize};

/// A pixel or grid coordinate pair `[x, y]`
pub type Pair = [i64; 2];

/// Case folding used for every case-insensitive match on identifiers,
/// field names and string values
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// Compare two identifiers after [`fold_case`]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || fold_case(a) == fold_case(b)
}

/// Root of an `.ldtk` project file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectDocument {
    pub iid: String,
    pub json_version: String,
    pub bg_color: Option<String>,
    pub default_grid_size: Option<i64>,
    pub default_level_width: Option<i64>,
    pub default_level_height: Option<i64>,
    pub default_entity_width: Option<i64>,
    pub default_entity_height: Option<i64>,
    pub world_grid_width: Option<i64>,
    pub world_grid_height: Option<i64>,
    pub external_levels: bool,
    pub defs: Definitions,
    pub levels: Vec<LevelDocument>,
}

impl ProjectDocument {
    /// Find a tileset definition by uid
    pub fn tileset_def(&self, uid: i64) -> Option<&TilesetDefinition> {
        self.defs.tilesets.iter().find(|t| t.uid == uid)
    }

    /// Find a layer definition, by identifier first and then by uid
    pub fn layer_def(&self, identifier: &str, uid: i64) -> Option<&LayerDefinition> {
        self.defs
            .layers
            .iter()
            .find(|l| l.identifier == identifier)
            .or_else(|| self.defs.layers.iter().find(|l| l.uid == uid))
    }

    /// Find an entity definition, by identifier first and then by uid
    pub fn entity_def(&self, identifier: &str, uid: i64) -> Option<&EntityDefinition> {
        self.defs
            .entities
            .iter()
            .find(|e| e.identifier == identifier)
            .or_else(|| self.defs.entities.iter().find(|e| e.uid == uid))
    }
}

/// The `defs` block of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub tilesets: Vec<TilesetDefinition>,
    pub layers: Vec<LayerDefinition>,
    pub entities: Vec<EntityDefinition>,
    pub enums: Vec<EnumDefinition>,
}

/// A tileset definition referencing an external image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TilesetDefinition {
    pub uid: i64,
    pub identifier: String,
    /// Image path relative to the project file
    pub rel_path: Option<String>,
    pub px_wid: i64,
    pub px_hei: i64,
    pub tile_grid_size: i64,
    pub spacing: i64,
    pub padding: i64,
    #[serde(rename = "__cWid")]
    pub c_wid: i64,
    #[serde(rename = "__cHei")]
    pub c_hei: i64,
    pub tags: Vec<String>,
}

/// Layer kinds as tagged by `__type`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    #[default]
    Tiles,
    IntGrid,
    Entities,
    AutoLayer,
}

impl LayerType {
    /// Parse the `__type` string used in LDtk files
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Tiles" => Some(LayerType::Tiles),
            "IntGrid" => Some(LayerType::IntGrid),
            "Entities" => Some(LayerType::Entities),
            "AutoLayer" => Some(LayerType::AutoLayer),
            _ => None,
        }
    }
}

/// A named value of an int-grid layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntGridValue {
    pub value: i64,
    pub identifier: Option<String>,
    pub color: Option<String>,
    pub group_uid: Option<i64>,
}

/// A layer definition from `defs.layers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerDefinition {
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    pub identifier: String,
    pub uid: i64,
    pub grid_size: i64,
    pub px_offset_x: i64,
    pub px_offset_y: i64,
    pub tileset_def_uid: Option<i64>,
    pub int_grid_values: Vec<IntGridValue>,
}

/// A rectangle inside a tileset image, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TilesetRect {
    pub tileset_uid: i64,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// An entity definition from `defs.entities`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityDefinition {
    pub identifier: String,
    pub uid: i64,
    pub width: i64,
    pub height: i64,
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub color: Option<String>,
    pub tileset_id: Option<i64>,
    pub tile_rect: Option<TilesetRect>,
    pub tile_render_mode: Option<String>,
    pub tags: Vec<String>,
}

/// A single enum value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumValueDefinition {
    pub id: String,
    pub color: Option<i64>,
    pub tile_rect: Option<TilesetRect>,
}

/// An enum definition from `defs.enums`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumDefinition {
    pub identifier: String,
    pub uid: i64,
    pub values: Vec<EnumValueDefinition>,
    pub tags: Vec<String>,
}

/// A level, either inline in the project or loaded from an `.ldtkl` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelDocument {
    pub identifier: String,
    pub iid: String,
    pub uid: i64,
    pub world_x: i64,
    pub world_y: i64,
    pub world_depth: i64,
    pub px_wid: i64,
    pub px_hei: i64,
    #[serde(rename = "__bgColor")]
    pub resolved_bg_color: Option<String>,
    pub bg_color: Option<String>,
    /// Path of the external level file, relative to the project
    pub external_rel_path: Option<String>,
    /// `None` when the level is stored in a separate file
    pub layer_instances: Option<Vec<LayerInstance>>,
    pub field_instances: Vec<FieldInstance>,
}

/// One layer of a level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    #[serde(rename = "__cWid")]
    pub c_wid: i64,
    #[serde(rename = "__cHei")]
    pub c_hei: i64,
    #[serde(rename = "__gridSize")]
    pub grid_size: i64,
    #[serde(rename = "__opacity")]
    pub opacity: Option<f32>,
    #[serde(rename = "__pxTotalOffsetX")]
    pub px_total_offset_x: i64,
    #[serde(rename = "__pxTotalOffsetY")]
    pub px_total_offset_y: i64,
    #[serde(rename = "__tilesetDefUid")]
    pub tileset_def_uid: Option<i64>,
    #[serde(rename = "__tilesetRelPath")]
    pub tileset_rel_path: Option<String>,
    pub iid: String,
    pub level_id: i64,
    pub layer_def_uid: i64,
    pub override_tileset_uid: Option<i64>,
    pub px_offset_x: i64,
    pub px_offset_y: i64,
    pub visible: Option<bool>,
    pub grid_tiles: Vec<TileInstance>,
    pub auto_layer_tiles: Vec<TileInstance>,
    /// `__cWid * __cHei` values, 0 means empty
    pub int_grid_csv: Vec<i64>,
    pub entity_instances: Vec<EntityInstance>,
}

impl LayerInstance {
    /// Tileset used to paint this layer, honouring `overrideTilesetUid`
    pub fn tileset_uid(&self) -> Option<i64> {
        self.override_tileset_uid.or(self.tileset_def_uid)
    }
}

/// A painted tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileInstance {
    /// Pixel coordinates of the tile in the layer
    pub px: Pair,
    /// Pixel coordinates of the tile in the tileset image
    pub src: Pair,
    /// Flip bits: bit 0 is X, bit 1 is Y
    pub f: u8,
    /// Tile id in the tileset
    pub t: i64,
    /// Opacity
    pub a: Option<f32>,
}

/// A placed entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__grid")]
    pub grid: Pair,
    #[serde(rename = "__pivot")]
    pub pivot: Option<[f32; 2]>,
    #[serde(rename = "__tags")]
    pub tags: Vec<String>,
    #[serde(rename = "__tile")]
    pub tile: Option<TilesetRect>,
    #[serde(rename = "__worldX")]
    pub world_x: Option<i64>,
    #[serde(rename = "__worldY")]
    pub world_y: Option<i64>,
    pub iid: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub def_uid: i64,
    pub px: Pair,
    pub field_instances: Vec<FieldInstance>,
}

impl EntityInstance {
    /// Find a field by identifier, ignoring case
    pub fn field(&self, identifier: &str) -> Option<&FieldInstance> {
        self.field_instances
            .iter()
            .find(|f| eq_ignore_case(&f.identifier, identifier))
    }
}

/// A typed custom field value on an entity or level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub field_type: String,
    #[serde(rename = "__value")]
    pub value: serde_json::Value,
    #[serde(rename = "__tile")]
    pub tile: Option<TilesetRect>,
    pub def_uid: i64,
}
