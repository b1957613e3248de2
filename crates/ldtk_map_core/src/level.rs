//! A level and its layers in paint order

use crate::{
    BuildContext, Color, EntityFactory, EntityLayer, IntGridLayer, Layer, LayerInfo, LayerKind,
    TileLayer,
};
use glam::Vec2;
use ldtk_map_schema::{LayerType, LevelDocument, ProjectDocument};

/// A built level
#[derive(Debug)]
pub struct Level {
    document: LevelDocument,
    layers: Vec<Layer>,
    background: Option<Color>,
}

impl Level {
    /// Build every layer of a level whose `layerInstances` are present
    ///
    /// Raw layers are stored front to back, so they are walked in reverse.
    /// `start_order` is the paint order of the backmost raw layer; each raw
    /// layer after it gets the next index, shared by all layers built from
    /// it.
    pub fn build(document: &LevelDocument, ctx: &mut BuildContext<'_>, start_order: i64) -> Self {
        let background = document
            .resolved_bg_color
            .as_deref()
            .or(document.bg_color.as_deref())
            .or(ctx.project.bg_color.as_deref())
            .and_then(Color::from_hex);

        let mut layers = Vec::new();
        let mut order = start_order;
        for raw in document.layer_instances.iter().flatten().rev() {
            let info = LayerInfo::from_instance(document, raw, order);

            if !raw.entity_instances.is_empty() {
                let layer = EntityLayer::build(raw, &info, ctx);
                layers.push(Layer {
                    info: info.clone(),
                    kind: LayerKind::Entities(layer),
                });
            }

            let auto_tiles =
                raw.layer_type == LayerType::AutoLayer && !raw.auto_layer_tiles.is_empty();
            if !raw.grid_tiles.is_empty() || auto_tiles {
                let layer = TileLayer::build(raw, &info, ctx);
                layers.push(Layer {
                    info: info.clone(),
                    kind: LayerKind::Tiles(layer),
                });
            }

            if !raw.int_grid_csv.is_empty() {
                let layer = IntGridLayer::build(raw, &info, ctx);
                layers.push(Layer {
                    info,
                    kind: LayerKind::IntGrid(layer),
                });
            }

            order += 1;
        }

        log::debug!(
            "built level {} with {} layers",
            document.identifier,
            layers.len()
        );

        Self {
            document: document.clone(),
            layers,
            background,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.document.identifier
    }

    pub fn iid(&self) -> &str {
        &self.document.iid
    }

    pub fn uid(&self) -> i64 {
        self.document.uid
    }

    pub fn document(&self) -> &LevelDocument {
        &self.document
    }

    /// World position of the level
    pub fn world_offset(&self) -> Vec2 {
        Vec2::new(self.document.world_x as f32, self.document.world_y as f32)
    }

    /// Size in pixels
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.document.px_wid as f32, self.document.px_hei as f32)
    }

    /// Resolved background color
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Layers back to front
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// First layer with the given identifier
    pub fn layer(&self, identifier: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.identifier() == identifier)
    }

    pub fn tile_layers(&self) -> impl Iterator<Item = (&LayerInfo, &TileLayer)> {
        self.layers
            .iter()
            .filter_map(|l| l.as_tiles().map(|t| (&l.info, t)))
    }

    pub fn int_grid_layers(&self) -> impl Iterator<Item = (&LayerInfo, &IntGridLayer)> {
        self.layers
            .iter()
            .filter_map(|l| l.as_int_grid().map(|t| (&l.info, t)))
    }

    pub fn entity_layers(&self) -> impl Iterator<Item = (&LayerInfo, &EntityLayer)> {
        self.layers
            .iter()
            .filter_map(|l| l.as_entities().map(|t| (&l.info, t)))
    }

    /// Rebuild entities of `identifier` in every entity layer
    pub fn apply_factory(
        &mut self,
        identifier: &str,
        factory: &EntityFactory,
        project: &ProjectDocument,
    ) -> usize {
        self.layers
            .iter_mut()
            .map(|layer| match &mut layer.kind {
                LayerKind::Entities(entities) => {
                    entities.apply_factory(identifier, factory, &layer.info, project)
                }
                _ => 0,
            })
            .sum()
    }
}
