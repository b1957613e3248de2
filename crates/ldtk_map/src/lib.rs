//! ldtk_map - Load LDtk projects into renderer-agnostic scenes
//!
//! This crate bundles:
//! - `ldtk_map_schema` - Serde types and strict validation for `.ldtk` / `.ldtkl` documents
//! - `ldtk_map_core` - Tilesets, grids, layers, levels and entities
//! - `ldtk_map_runtime` - Asset fetching, path mapping, caching and scene composition
//!
//! # Usage
//!
//! ```rust,ignore
//! use ldtk_map::prelude::*;
//!
//! let mut project = ProjectResource::new(
//!     "maps/world.ldtk",
//!     FileSource::new("assets"),
//!     ProjectOptions::default(),
//! );
//! project.register_entity_type_fn("Player", |ctx: &EntityFactoryContext<'_>| {
//!     Some(Box::new(Placeable::new(ctx.identifier, ctx.position)) as Box<dyn SceneEntity>)
//! });
//! futures::executor::block_on(project.load())?;
//!
//! let mut scene = SceneRecorder::new();
//! let report = project.compose_into_scene(&mut scene, &ComposeOptions::default())?;
//! ```

// Re-export the member crates
pub use ldtk_map_core;
pub use ldtk_map_schema;

#[cfg(feature = "runtime")]
pub use ldtk_map_runtime;

pub mod prelude {
    pub use ldtk_map_core::{
        Color, Diagnostic, Diagnostics, EntityFactory, EntityFactoryContext, EntityKey,
        EntityLayer, FactoryRegistry, FieldValue, Flip, GridCell, IntGridLayer, Layer, LayerInfo,
        LayerKind, Level, LookupMiss, Placeable, SceneEntity, Sprite, TileGrid, TileLayer,
        Tileset, Vec2,
    };
    pub use ldtk_map_schema::{LevelDocument, ProjectDocument, SchemaError};

    #[cfg(feature = "runtime")]
    pub use ldtk_map_runtime::{
        AssetSource, Bounds, CameraSuggestion, ComposeOptions, ComposeReport, DocumentKind,
        FileSource, LoadError, MemorySource, PathMap, PathMapping, ProjectOptions,
        ProjectResource, SceneRecorder, SceneSink, SourceError,
    };
}
