//! The project loader
//!
//! [`ProjectResource`] owns everything loaded for one `.ldtk` file: the
//! parsed project, one image per tileset, one document per external level,
//! the built levels and the entity factories. Loading happens once, in
//! [`ProjectResource::load`]; afterwards the model is queried or composed
//! into a host scene.
//!
//! ```rust,ignore
//! use ldtk_map_runtime::{FileSource, ProjectOptions, ProjectResource};
//!
//! let mut project = ProjectResource::new("maps/world.ldtk", FileSource::new("assets"), ProjectOptions::default());
//! futures::executor::block_on(project.load())?;
//! project.register_entity_type_fn("Player", |ctx| Some(Box::new(Player::new(ctx.position))));
//! ```

use crate::compose::{compose, ComposeOptions, ComposeReport, SceneSink};
use crate::{resolve, AssetSource, DocumentKind, LoadError, LoaderCache, ProjectOptions};
use ldtk_map_core::{
    BuildContext, Diagnostic, Diagnostics, EntityFactory, EntityFactoryContext, EntityLayer,
    FactoryRegistry, FieldValue, ImageHandle, IntGridLayer, LayerInfo, Level, SceneEntity,
    TileLayer, Tileset,
};
use ldtk_map_schema::{
    is_version_supported, parse_level, parse_project, LevelDocument, ProjectDocument,
    MIN_SUPPORTED_VERSION,
};
use std::collections::HashMap;
use std::rc::Rc;

/// A loaded LDtk project and its levels
pub struct ProjectResource<S: AssetSource> {
    path: String,
    source: Rc<S>,
    options: ProjectOptions,
    factories: FactoryRegistry,
    images: LoaderCache<ImageHandle>,
    level_documents: LoaderCache<LevelDocument>,
    project: Option<Rc<ProjectDocument>>,
    tilesets: HashMap<i64, Tileset>,
    levels: Vec<Level>,
    by_identifier: HashMap<String, usize>,
    by_uid: HashMap<i64, usize>,
    diagnostics: Diagnostics,
}

impl<S: AssetSource + 'static> ProjectResource<S> {
    pub fn new(path: impl Into<String>, source: S, options: ProjectOptions) -> Self {
        Self {
            path: path.into(),
            source: Rc::new(source),
            options,
            factories: FactoryRegistry::new(),
            images: LoaderCache::new(),
            level_documents: LoaderCache::new(),
            project: None,
            tilesets: HashMap::new(),
            levels: Vec::new(),
            by_identifier: HashMap::new(),
            by_uid: HashMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Load the project, its images and external levels, then build levels
    ///
    /// Calling this again after a successful load returns the same document
    /// without fetching anything.
    pub async fn load(&mut self) -> Result<Rc<ProjectDocument>, LoadError> {
        if let Some(project) = &self.project {
            return Ok(Rc::clone(project));
        }

        let bytes = self
            .source
            .fetch_document(&self.path, DocumentKind::Project)
            .await
            .map_err(|error| LoadError::missing(&self.path, error))?;
        let project = Rc::new(parse_project(&self.path, &bytes, self.options.strict)?);
        log::info!(
            "fetched project {} (format {}, {} tilesets, {} levels)",
            self.path,
            project.json_version,
            project.defs.tilesets.len(),
            project.levels.len()
        );

        let mut diagnostics = Diagnostics::new();
        if !project.json_version.is_empty() && !is_version_supported(&project.json_version) {
            diagnostics.report(Diagnostic::VersionMismatch {
                document: self.path.clone(),
                found: project.json_version.clone(),
                supported: MIN_SUPPORTED_VERSION.to_string(),
            });
        }

        let image_keys = self.queue_images(&project);
        let level_keys = self.queue_levels(&project);
        futures::try_join!(self.images.load(), self.level_documents.load())?;

        self.tilesets = project
            .defs
            .tilesets
            .iter()
            .zip(&image_keys)
            .filter_map(|(def, key)| {
                let image = self.images.get(key.as_deref()?)?;
                Some((def.uid, Tileset::new(def.clone(), ImageHandle::clone(&image))))
            })
            .collect();
        log::debug!("built {} tilesets", self.tilesets.len());

        let mut ctx = BuildContext {
            project: &project,
            tilesets: &self.tilesets,
            factories: &self.factories,
            diagnostics: &mut diagnostics,
        };
        let mut levels = Vec::with_capacity(project.levels.len());
        for (inline, key) in project.levels.iter().zip(&level_keys) {
            let external = key
                .as_deref()
                .and_then(|key| self.level_documents.get(key));
            let document = external.as_deref().unwrap_or(inline);
            levels.push(Level::build(document, &mut ctx, self.options.start_z_index));
        }

        self.by_identifier.clear();
        self.by_uid.clear();
        for (index, level) in levels.iter().enumerate() {
            self.by_identifier
                .entry(level.identifier().to_string())
                .or_insert(index);
            self.by_uid.entry(level.uid()).or_insert(index);
        }
        log::info!(
            "loaded {} levels from {} ({} diagnostics)",
            levels.len(),
            self.path,
            diagnostics.len()
        );

        self.levels = levels;
        self.diagnostics = diagnostics;
        self.project = Some(Rc::clone(&project));
        Ok(project)
    }

    /// Register every tileset image, returning the cache key per tileset
    fn queue_images(&mut self, project: &ProjectDocument) -> Vec<Option<String>> {
        project
            .defs
            .tilesets
            .iter()
            .map(|def| {
                let rel_path = def.rel_path.as_deref().filter(|p| !p.is_empty())?;
                let key = resolve(&self.path, rel_path, &self.options.path_map);
                if self.options.headless {
                    let handle = ImageHandle::from_definition(key.as_str(), def);
                    self.images
                        .get_or_add(&key, move || async move { Ok(handle) });
                } else {
                    let source = Rc::clone(&self.source);
                    self.images.get_or_add(&key, || {
                        let load = source.load_image(&key);
                        let key = key.clone();
                        async move { load.await.map_err(|error| LoadError::missing(key, error)) }
                    });
                }
                Some(key)
            })
            .collect()
    }

    /// Register every external level document, returning the cache key per level
    fn queue_levels(&mut self, project: &ProjectDocument) -> Vec<Option<String>> {
        let strict = self.options.strict;
        project
            .levels
            .iter()
            .map(|level| {
                let rel_path = level
                    .external_rel_path
                    .as_deref()
                    .filter(|p| !p.is_empty())?;
                let key = resolve(&self.path, rel_path, &self.options.path_map);
                let source = Rc::clone(&self.source);
                self.level_documents.get_or_add(&key, || {
                    let fetch = source.fetch_document(&key, DocumentKind::Level);
                    let key = key.clone();
                    async move {
                        let bytes = fetch
                            .await
                            .map_err(|error| LoadError::missing(key.as_str(), error))?;
                        Ok::<_, LoadError>(parse_level(&key, &bytes, strict)?)
                    }
                });
                Some(key)
            })
            .collect()
    }

    /// Register construction logic for an entity identifier
    ///
    /// If the project is already loaded, every instance of `identifier` is
    /// rebuilt through the factory right away. Returns how many entities
    /// were rebuilt.
    pub fn register_entity_type_factory(
        &mut self,
        identifier: impl Into<String>,
        factory: EntityFactory,
    ) -> usize {
        let identifier = identifier.into();
        self.factories
            .register(identifier.clone(), Rc::clone(&factory));

        let Some(project) = &self.project else {
            return 0;
        };
        let rebuilt: usize = self
            .levels
            .iter_mut()
            .map(|level| level.apply_factory(&identifier, &factory, project))
            .sum();
        log::debug!("rebuilt {} {} entities", rebuilt, identifier);
        rebuilt
    }

    /// Register a closure as an entity factory
    pub fn register_entity_type_fn<F>(&mut self, identifier: impl Into<String>, factory: F) -> usize
    where
        F: Fn(&EntityFactoryContext<'_>) -> Option<Box<dyn SceneEntity>> + 'static,
    {
        self.register_entity_type_factory(identifier, Rc::new(factory))
    }

    /// Hand every admitted level to `sink`
    pub fn compose_into_scene(
        &self,
        sink: &mut dyn SceneSink,
        options: &ComposeOptions,
    ) -> Result<ComposeReport, LoadError> {
        let project = self.project.as_deref().ok_or(LoadError::NotLoaded)?;
        Ok(compose(&self.levels, project, &self.options, sink, options))
    }
}

impl<S: AssetSource> ProjectResource<S> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn is_loaded(&self) -> bool {
        self.project.is_some()
    }

    pub fn project(&self) -> Option<Rc<ProjectDocument>> {
        self.project.clone()
    }

    /// Warnings recorded while loading
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Levels in document order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, identifier: &str) -> Option<&Level> {
        self.by_identifier
            .get(identifier)
            .map(|&index| &self.levels[index])
    }

    pub fn level_by_uid(&self, uid: i64) -> Option<&Level> {
        self.by_uid.get(&uid).map(|&index| &self.levels[index])
    }

    pub fn tileset(&self, uid: i64) -> Option<&Tileset> {
        self.tilesets.get(&uid)
    }

    /// Loaded tilesets in definition order
    pub fn tilesets(&self) -> impl Iterator<Item = &Tileset> {
        self.project
            .iter()
            .flat_map(|project| project.defs.tilesets.iter())
            .filter_map(|def| self.tilesets.get(&def.uid))
    }

    /// Loaded images in the order they were requested
    pub fn images(&self) -> Vec<Rc<ImageHandle>> {
        self.images.values()
    }

    /// Loaded external level documents in the order they were requested
    pub fn external_levels(&self) -> Vec<Rc<LevelDocument>> {
        self.level_documents.values()
    }

    fn levels_matching<'a>(&'a self, level: Option<&'a str>) -> impl Iterator<Item = &'a Level> {
        self.levels
            .iter()
            .filter(move |l| level.map_or(true, |id| l.identifier() == id))
    }

    /// Entity layers, of one level or of all of them
    pub fn entity_layers<'a>(
        &'a self,
        level: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a LayerInfo, &'a EntityLayer)> {
        self.levels_matching(level).flat_map(Level::entity_layers)
    }

    pub fn tile_layers<'a>(
        &'a self,
        level: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a LayerInfo, &'a TileLayer)> {
        self.levels_matching(level).flat_map(Level::tile_layers)
    }

    pub fn int_grid_layers<'a>(
        &'a self,
        level: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a LayerInfo, &'a IntGridLayer)> {
        self.levels_matching(level).flat_map(Level::int_grid_layers)
    }

    /// Built entities of an identifier across every level, ignoring case
    pub fn find_entities_by_identifier(&self, identifier: &str) -> Vec<&dyn SceneEntity> {
        self.entity_layers(None)
            .flat_map(|(_, layer)| layer.find_by_identifier(identifier))
            .collect()
    }

    /// Built entities carrying `field`, optionally with a given value
    pub fn find_entities_by_field(
        &self,
        field: &str,
        value: Option<&FieldValue>,
    ) -> Vec<&dyn SceneEntity> {
        self.entity_layers(None)
            .flat_map(|(_, layer)| layer.find_by_field(field, value))
            .collect()
    }
}

impl<S: AssetSource> std::fmt::Debug for ProjectResource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectResource")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .field("levels", &self.levels.len())
            .field("tilesets", &self.tilesets.len())
            .field("factories", &self.factories)
            .finish()
    }
}
