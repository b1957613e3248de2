//! Runtime loading for ldtk_map
//!
//! This crate fetches an LDtk project and everything it references through
//! an [`AssetSource`], builds the scene model from `ldtk_map_core`, and
//! composes it into a host scene:
//!
//! - [`ProjectResource`] - Loads a project once and answers queries about it
//! - [`LoaderCache`] - De-duplicates image and level loads by resolved path
//! - [`PathMap`] - Rewrites asset paths before they are fetched
//! - [`SceneSink`] - Receives composed grids and entities
//!
//! # Example
//!
//! ```ignore
//! use ldtk_map_runtime::{ComposeOptions, FileSource, ProjectOptions, ProjectResource, SceneRecorder};
//!
//! let mut project = ProjectResource::new(
//!     "maps/world.ldtk",
//!     FileSource::new("assets"),
//!     ProjectOptions::from_file("assets/ldtk.toml")?,
//! );
//! futures::executor::block_on(project.load())?;
//!
//! let mut scene = SceneRecorder::new();
//! project.compose_into_scene(&mut scene, &ComposeOptions::default())?;
//! ```

mod cache;
mod compose;
mod error;
mod options;
mod path;
mod project;
mod source;

pub use cache::{CacheHandle, LoaderCache};
pub use compose::{
    Bounds, CameraSuggestion, ComposeOptions, ComposeReport, RecordedEntity, RecordedGrid,
    SceneRecorder, SceneSink,
};
pub use error::{ConfigError, LoadError, SourceError};
pub use options::ProjectOptions;
pub use path::{resolve, PathMap, PathMapping};
pub use project::ProjectResource;
pub use source::{AssetSource, DocumentKind, FileSource, MemorySource};
