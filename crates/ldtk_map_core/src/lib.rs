//! Core scene model for ldtk_map
//!
//! This crate turns validated LDtk documents into renderer-ready values:
//! - `Tileset` - A sliced tileset image with per-cell sprite lookup
//! - `TileGrid` - A grid container whose cells hold sprites and solidity
//! - `Layer` - A tile, int-grid or entity layer with its paint order
//! - `Level` - Layers of one level in back-to-front order
//! - `Placeable` / `SceneEntity` - Generic and factory-built entities
//! - `FieldValue` - Normalized entity field values for lookups
//!
//! Nothing here touches the filesystem or a renderer; loading lives in
//! `ldtk_map_runtime`.

mod color;
mod diagnostics;
mod entity;
mod factory;
mod grid;
mod layer;
mod level;
mod tileset;
mod value;

pub use color::Color;
pub use diagnostics::{Diagnostic, Diagnostics, LookupMiss};
pub use entity::{Placeable, SceneEntity};
pub use factory::{EntityFactory, EntityFactoryContext, FactoryRegistry};
pub use grid::{GridCell, TileGrid};
pub use layer::{
    BuildContext, EntityKey, EntityLayer, IntGridLayer, Layer, LayerInfo, LayerKind,
    SolidityRule, TileLayer,
};
pub use level::Level;
pub use tileset::{Flip, ImageHandle, Sprite, Tileset};
pub use value::FieldValue;

pub use glam::Vec2;
