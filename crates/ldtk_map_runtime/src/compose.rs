//! Handing a loaded project to the host scene
//!
//! The loader does not own a scene graph. Composition walks the built
//! levels and passes every grid and entity to a [`SceneSink`] together with
//! its final position; the host decides what to make of them.

use crate::ProjectOptions;
use glam::Vec2;
use ldtk_map_core::{Color, FieldValue, LayerInfo, LayerKind, Level, SceneEntity, TileGrid};
use ldtk_map_schema::ProjectDocument;

/// Receives composed grids and entities
pub trait SceneSink {
    /// A tile or int-grid layer, `position` being its top-left corner
    fn add_grid(&mut self, layer: &LayerInfo, grid: &TileGrid, position: Vec2);

    /// A built entity at its final position
    fn add_entity(&mut self, layer: &LayerInfo, entity: &dyn SceneEntity, position: Vec2);
}

/// Which levels to compose and where
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    /// Added to every position
    pub world_offset: Vec2,
    /// Level identifiers to compose; `None` composes all of them
    pub level_filter: Option<Vec<String>>,
    /// Place levels at their world position
    pub use_level_offsets: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            world_offset: Vec2::ZERO,
            level_filter: None,
            use_level_offsets: true,
        }
    }
}

impl ComposeOptions {
    pub fn with_world_offset(mut self, offset: Vec2) -> Self {
        self.world_offset = offset;
        self
    }

    pub fn with_levels<I, L>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.level_filter = Some(levels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_level_offsets(mut self, use_level_offsets: bool) -> Self {
        self.use_level_offsets = use_level_offsets;
        self
    }

    fn admits(&self, level: &Level) -> bool {
        self.level_filter
            .as_ref()
            .map_or(true, |filter| filter.iter().any(|id| id == level.identifier()))
    }
}

/// Axis-aligned rectangle in world pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Where a camera flagged in the level wants to be
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSuggestion {
    /// Identifier of the entity carrying the flag
    pub entity: String,
    pub position: Vec2,
    pub zoom: f32,
}

/// What composition did, plus hints for the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeReport {
    /// Identifiers of the composed levels
    pub levels: Vec<String>,
    pub grids: usize,
    pub entities: usize,
    /// Set when `use_entity_camera` is enabled and an entity asks for it
    pub camera: Option<CameraSuggestion>,
    /// Union of each level's first tile layer, with `use_tilemap_camera_strategy`
    pub bounds: Option<Bounds>,
    /// With `use_map_background_color`
    pub background: Option<Color>,
}

pub(crate) fn compose(
    levels: &[Level],
    project: &ProjectDocument,
    options: &ProjectOptions,
    sink: &mut dyn SceneSink,
    compose_options: &ComposeOptions,
) -> ComposeReport {
    let mut report = ComposeReport::default();

    for level in levels.iter().filter(|level| compose_options.admits(level)) {
        let level_offset = if compose_options.use_level_offsets {
            level.world_offset()
        } else {
            Vec2::ZERO
        };
        let base = level_offset + compose_options.world_offset;
        let mut first_tiles = true;

        for layer in level.layers() {
            let origin = base + layer.info.pixel_offset;
            match &layer.kind {
                LayerKind::Tiles(tiles) => {
                    sink.add_grid(&layer.info, &tiles.grid, origin);
                    report.grids += 1;
                    if first_tiles && options.use_tilemap_camera_strategy {
                        let (width, height) = tiles.grid.pixel_size();
                        let bounds =
                            Bounds::from_origin_size(origin, Vec2::new(width as f32, height as f32));
                        report.bounds = Some(match report.bounds {
                            Some(existing) => existing.union(bounds),
                            None => bounds,
                        });
                    }
                    first_tiles = false;
                }
                LayerKind::IntGrid(int_grid) => {
                    sink.add_grid(&layer.info, &int_grid.grid, origin);
                    report.grids += 1;
                }
                LayerKind::Entities(entities) => {
                    for (key, entity) in entities.entities() {
                        let position = origin + entity.position();
                        sink.add_entity(&layer.info, entity, position);
                        report.entities += 1;

                        if report.camera.is_some() || !options.use_entity_camera {
                            continue;
                        }
                        let Some(raw) = entities.raw_for_entity(key) else {
                            continue;
                        };
                        let flagged = raw
                            .field("camera")
                            .is_some_and(|f| FieldValue::from_json(&f.value).is_truthy());
                        if flagged {
                            let zoom = raw
                                .field("zoom")
                                .and_then(|f| f.value.as_f64())
                                .unwrap_or(1.0);
                            report.camera = Some(CameraSuggestion {
                                entity: raw.identifier.clone(),
                                position,
                                zoom: zoom as f32,
                            });
                        }
                    }
                }
            }
        }

        if options.use_map_background_color && report.background.is_none() {
            report.background = level.background();
        }
        report.levels.push(level.identifier().to_string());
    }

    if options.use_map_background_color && report.background.is_none() {
        report.background = project.bg_color.as_deref().and_then(Color::from_hex);
    }

    log::debug!(
        "composed {} levels: {} grids, {} entities",
        report.levels.len(),
        report.grids,
        report.entities
    );
    report
}

/// A composed grid as seen by [`SceneRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGrid {
    pub level: String,
    pub layer: String,
    pub order: i64,
    pub position: Vec2,
    pub grid: TileGrid,
}

/// A composed entity as seen by [`SceneRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEntity {
    pub level: String,
    pub layer: String,
    pub name: String,
    pub z: i64,
    pub position: Vec2,
}

/// Sink that keeps a copy of everything it receives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneRecorder {
    pub grids: Vec<RecordedGrid>,
    pub entities: Vec<RecordedEntity>,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RecordedEntity> {
        self.entities.iter().filter(move |e| e.name == name)
    }
}

impl SceneSink for SceneRecorder {
    fn add_grid(&mut self, layer: &LayerInfo, grid: &TileGrid, position: Vec2) {
        self.grids.push(RecordedGrid {
            level: layer.level_identifier.clone(),
            layer: layer.identifier.clone(),
            order: layer.order,
            position,
            grid: grid.clone(),
        });
    }

    fn add_entity(&mut self, layer: &LayerInfo, entity: &dyn SceneEntity, position: Vec2) {
        self.entities.push(RecordedEntity {
            level: layer.level_identifier.clone(),
            layer: layer.identifier.clone(),
            name: entity.name().to_string(),
            z: entity.z(),
            position,
        });
    }
}
