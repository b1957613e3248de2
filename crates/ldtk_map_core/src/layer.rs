//! Layer model built from raw layer instances
//!
//! Each raw layer becomes one [`Layer`]: a shared [`LayerInfo`] plus one of
//! three payloads. Tile and int-grid layers paint into a [`TileGrid`];
//! entity layers keep the raw instances next to the entities built from
//! them and track which is which in both directions.

use crate::{
    Diagnostics, EntityFactory, EntityFactoryContext, FactoryRegistry, FieldValue, LookupMiss,
    Placeable, SceneEntity, TileGrid, Tileset,
};
use glam::Vec2;
use ldtk_map_schema::{
    eq_ignore_case, fold_case, EntityInstance, LayerDefinition, LayerInstance, LayerType,
    LevelDocument, ProjectDocument, TileInstance,
};
use std::collections::{BTreeMap, HashMap};

/// Placement and display data shared by every layer kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerInfo {
    pub identifier: String,
    pub iid: String,
    pub layer_type: LayerType,
    pub level_identifier: String,
    /// World position of the owning level
    pub level_offset: Vec2,
    /// `__pxTotalOffsetX/Y` of the layer
    pub pixel_offset: Vec2,
    /// Paint order, higher is drawn later
    pub order: i64,
    pub visible: bool,
    pub opacity: f32,
    pub grid_size: i64,
    pub columns: i64,
    pub rows: i64,
    pub tileset_uid: Option<i64>,
}

impl LayerInfo {
    pub fn from_instance(level: &LevelDocument, raw: &LayerInstance, order: i64) -> Self {
        Self {
            identifier: raw.identifier.clone(),
            iid: raw.iid.clone(),
            layer_type: raw.layer_type,
            level_identifier: level.identifier.clone(),
            level_offset: Vec2::new(level.world_x as f32, level.world_y as f32),
            pixel_offset: Vec2::new(raw.px_total_offset_x as f32, raw.px_total_offset_y as f32),
            order,
            visible: raw.visible.unwrap_or(true),
            opacity: raw.opacity.unwrap_or(1.0),
            grid_size: raw.grid_size,
            columns: raw.c_wid,
            rows: raw.c_hei,
            tileset_uid: raw.tileset_uid(),
        }
    }

    /// Level offset plus layer offset
    pub fn offset(&self) -> Vec2 {
        self.level_offset + self.pixel_offset
    }

    fn empty_grid(&self) -> TileGrid {
        TileGrid::new(&self.identifier, self.columns, self.rows, self.grid_size)
    }
}

/// Shared inputs of the layer builders
pub struct BuildContext<'a> {
    pub project: &'a ProjectDocument,
    /// Loaded tilesets by uid
    pub tilesets: &'a HashMap<i64, Tileset>,
    pub factories: &'a FactoryRegistry,
    pub diagnostics: &'a mut Diagnostics,
}

impl BuildContext<'_> {
    fn miss(&mut self, info: &LayerInfo, miss: LookupMiss) {
        self.diagnostics
            .lookup_miss(&info.level_identifier, &info.identifier, miss);
    }
}

/// A built layer
#[derive(Debug)]
pub struct Layer {
    pub info: LayerInfo,
    pub kind: LayerKind,
}

#[derive(Debug)]
pub enum LayerKind {
    Tiles(TileLayer),
    IntGrid(IntGridLayer),
    Entities(EntityLayer),
}

impl Layer {
    pub fn identifier(&self) -> &str {
        &self.info.identifier
    }

    pub fn order(&self) -> i64 {
        self.info.order
    }

    pub fn as_tiles(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tiles(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_int_grid(&self) -> Option<&IntGridLayer> {
        match &self.kind {
            LayerKind::IntGrid(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_entities(&self) -> Option<&EntityLayer> {
        match &self.kind {
            LayerKind::Entities(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_entities_mut(&mut self) -> Option<&mut EntityLayer> {
        match &mut self.kind {
            LayerKind::Entities(layer) => Some(layer),
            _ => None,
        }
    }

    /// The painted grid of a tile or int-grid layer
    pub fn grid(&self) -> Option<&TileGrid> {
        match &self.kind {
            LayerKind::Tiles(layer) => Some(&layer.grid),
            LayerKind::IntGrid(layer) => Some(&layer.grid),
            LayerKind::Entities(_) => None,
        }
    }
}

/// Paint tiles into a grid, recording every failed lookup
fn paint_tiles(
    grid: &mut TileGrid,
    info: &LayerInfo,
    tiles: &[TileInstance],
    ctx: &mut BuildContext<'_>,
) {
    if tiles.is_empty() {
        return;
    }
    let Some(uid) = info.tileset_uid else {
        ctx.miss(info, LookupMiss::NoTileset);
        return;
    };
    let tilesets = ctx.tilesets;
    let Some(tileset) = tilesets.get(&uid) else {
        ctx.miss(info, LookupMiss::Tileset { uid });
        return;
    };

    for tile in tiles {
        let x = tile.px[0].checked_div_euclid(info.grid_size);
        let y = tile.px[1].checked_div_euclid(info.grid_size);
        let (Some(x), Some(y)) = (x, y) else {
            ctx.miss(
                info,
                LookupMiss::GridCell {
                    x: tile.px[0],
                    y: tile.px[1],
                },
            );
            continue;
        };
        let Some(cell) = grid.get_mut(x, y) else {
            ctx.miss(info, LookupMiss::GridCell { x, y });
            continue;
        };
        match tileset.sprite_for_tile(tile.src, tile.f) {
            Ok(sprite) => cell.sprites.push(sprite),
            Err(miss) => ctx.miss(info, miss),
        }
    }
}

/// A layer of painted tiles
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub grid: TileGrid,
}

impl TileLayer {
    /// Paint `gridTiles`, or `autoLayerTiles` for auto-layers without any
    pub fn build(raw: &LayerInstance, info: &LayerInfo, ctx: &mut BuildContext<'_>) -> Self {
        let tiles = if raw.grid_tiles.is_empty() && raw.layer_type == LayerType::AutoLayer {
            &raw.auto_layer_tiles
        } else {
            &raw.grid_tiles
        };
        let mut grid = info.empty_grid();
        paint_tiles(&mut grid, info, tiles, ctx);
        Self { grid }
    }
}

/// Which int-grid values count as solid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolidityRule {
    /// Values whose identifier starts with "solid", ignoring case
    Named(Vec<i64>),
    /// Value `1` is solid
    ///
    /// Applies when the layer has no definition or none of its values is
    /// named "solid*".
    LegacyValueOne,
}

impl SolidityRule {
    pub fn for_definition(definition: Option<&LayerDefinition>) -> Self {
        let solid: Vec<i64> = definition
            .map(|def| {
                def.int_grid_values
                    .iter()
                    .filter(|v| {
                        v.identifier
                            .as_deref()
                            .is_some_and(|id| fold_case(id).starts_with("solid"))
                    })
                    .map(|v| v.value)
                    .collect()
            })
            .unwrap_or_default();

        if solid.is_empty() {
            SolidityRule::LegacyValueOne
        } else {
            SolidityRule::Named(solid)
        }
    }

    pub fn is_solid(&self, value: i64) -> bool {
        match self {
            SolidityRule::Named(values) => values.contains(&value),
            SolidityRule::LegacyValueOne => value == 1,
        }
    }
}

/// An int-grid layer: raw values, solidity and auto-tiles
#[derive(Debug, Clone, PartialEq)]
pub struct IntGridLayer {
    pub grid: TileGrid,
    pub rule: SolidityRule,
}

impl IntGridLayer {
    pub fn build(raw: &LayerInstance, info: &LayerInfo, ctx: &mut BuildContext<'_>) -> Self {
        let definition = ctx.project.layer_def(&raw.identifier, raw.layer_def_uid);
        let rule = SolidityRule::for_definition(definition);

        let mut grid = info.empty_grid();
        if info.columns > 0 {
            for (i, &value) in raw.int_grid_csv.iter().enumerate() {
                let i = i as i64;
                if let Some(cell) = grid.get_mut(i % info.columns, i / info.columns) {
                    cell.value = value;
                    cell.solid = rule.is_solid(value);
                }
            }
        }
        paint_tiles(&mut grid, info, &raw.auto_layer_tiles, ctx);

        Self { grid, rule }
    }

    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        self.grid.get(x, y).is_some_and(|c| c.solid)
    }
}

/// Stable handle of a built entity within its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(pub u64);

/// Raw entity instances and the entities built from them
#[derive(Debug, Default)]
pub struct EntityLayer {
    raw: Vec<EntityInstance>,
    entities: Vec<(EntityKey, Box<dyn SceneEntity>)>,
    raw_to_entity: BTreeMap<usize, EntityKey>,
    entity_to_raw: BTreeMap<EntityKey, usize>,
    next_key: u64,
}

impl EntityLayer {
    /// Build every instance, through its factory when one is registered
    pub fn build(raw: &LayerInstance, info: &LayerInfo, ctx: &mut BuildContext<'_>) -> Self {
        let mut layer = EntityLayer {
            raw: raw.entity_instances.clone(),
            ..Default::default()
        };

        for index in 0..layer.raw.len() {
            let instance = &layer.raw[index];
            let definition = ctx.project.entity_def(&instance.identifier, instance.def_uid);
            let built = ctx
                .factories
                .get(&instance.identifier)
                .and_then(|factory| run_factory(factory, instance, definition, info));
            let entity = match built {
                Some(entity) => entity,
                None => Box::new(placeable(instance, info, ctx)),
            };
            layer.push(index, entity);
        }
        layer
    }

    fn next_key(&mut self) -> EntityKey {
        let key = EntityKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn push(&mut self, index: usize, entity: Box<dyn SceneEntity>) {
        let key = self.next_key();
        self.entities.push((key, entity));
        self.raw_to_entity.insert(index, key);
        self.entity_to_raw.insert(key, index);
    }

    /// Rebuild every instance of `identifier` with a newly registered factory
    ///
    /// A built entity replaces the previous one for the same instance in
    /// place, or is appended when there was none. Instances the factory
    /// declines keep their current entity. Returns the number rebuilt.
    pub fn apply_factory(
        &mut self,
        identifier: &str,
        factory: &EntityFactory,
        info: &LayerInfo,
        project: &ProjectDocument,
    ) -> usize {
        let mut rebuilt = 0;
        for index in 0..self.raw.len() {
            let instance = &self.raw[index];
            if instance.identifier != identifier {
                continue;
            }
            let definition = project.entity_def(&instance.identifier, instance.def_uid);
            let Some(entity) = run_factory(factory, instance, definition, info) else {
                continue;
            };

            let previous = self.raw_to_entity.get(&index).copied();
            let slot = previous.and_then(|old| self.entities.iter().position(|(k, _)| *k == old));
            match (previous, slot) {
                (Some(old), Some(slot)) => {
                    let key = self.next_key();
                    self.entities[slot] = (key, entity);
                    self.entity_to_raw.remove(&old);
                    self.entity_to_raw.insert(key, index);
                    self.raw_to_entity.insert(index, key);
                }
                _ => self.push(index, entity),
            }
            rebuilt += 1;
        }
        rebuilt
    }

    pub fn raw_instances(&self) -> &[EntityInstance] {
        &self.raw
    }

    /// Built entities in build order
    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &dyn SceneEntity)> {
        self.entities.iter().map(|(key, e)| (*key, e.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, key: EntityKey) -> Option<&dyn SceneEntity> {
        self.entities
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, e)| e.as_ref())
    }

    /// Entity built for the raw instance at `index`
    pub fn entity_for_raw(&self, index: usize) -> Option<&dyn SceneEntity> {
        self.raw_to_entity
            .get(&index)
            .and_then(|key| self.entity(*key))
    }

    pub fn key_for_raw(&self, index: usize) -> Option<EntityKey> {
        self.raw_to_entity.get(&index).copied()
    }

    /// Raw instance an entity was built from
    pub fn raw_for_entity(&self, key: EntityKey) -> Option<&EntityInstance> {
        self.entity_to_raw
            .get(&key)
            .and_then(|index| self.raw.get(*index))
    }

    /// Built entities whose identifier matches, ignoring case
    pub fn find_by_identifier(&self, identifier: &str) -> Vec<&dyn SceneEntity> {
        self.find_raw(|raw| eq_ignore_case(&raw.identifier, identifier))
    }

    /// Built entities carrying `field`
    ///
    /// With a value, only entities whose field equals it after
    /// normalization match; without one the field just has to exist.
    pub fn find_by_field(&self, field: &str, value: Option<&FieldValue>) -> Vec<&dyn SceneEntity> {
        let wanted = value.map(FieldValue::normalized);
        self.find_raw(|raw| match (raw.field(field), &wanted) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(found), Some(wanted)) => FieldValue::from_json(&found.value).normalized() == *wanted,
        })
    }

    fn find_raw(&self, mut predicate: impl FnMut(&EntityInstance) -> bool) -> Vec<&dyn SceneEntity> {
        self.raw
            .iter()
            .enumerate()
            .filter(|(_, raw)| predicate(raw))
            .filter_map(|(index, _)| self.entity_for_raw(index))
            .collect()
    }
}

fn run_factory(
    factory: &EntityFactory,
    raw: &EntityInstance,
    definition: Option<&ldtk_map_schema::EntityDefinition>,
    info: &LayerInfo,
) -> Option<Box<dyn SceneEntity>> {
    let position = Vec2::new(raw.px[0] as f32, raw.px[1] as f32);
    let ctx = EntityFactoryContext {
        identifier: &raw.identifier,
        position,
        world_position: info.offset() + position,
        raw,
        definition,
        layer: info,
    };
    factory(&ctx)
}

/// Generic entity for an instance no factory claimed
fn placeable(raw: &EntityInstance, info: &LayerInfo, ctx: &mut BuildContext<'_>) -> Placeable {
    let definition = ctx.project.entity_def(&raw.identifier, raw.def_uid);

    let width = raw.width.or(definition.map(|d| d.width)).unwrap_or(0);
    let height = raw.height.or(definition.map(|d| d.height)).unwrap_or(0);
    let pivot = raw
        .pivot
        .map(Vec2::from)
        .or(definition.map(|d| Vec2::new(d.pivot_x, d.pivot_y)))
        .unwrap_or(Vec2::ZERO);

    let rect = raw.tile.or(definition.and_then(|d| d.tile_rect));
    let tilesets = ctx.tilesets;
    let sprite = rect.and_then(|rect| {
        let Some(tileset) = tilesets.get(&rect.tileset_uid) else {
            ctx.miss(
                info,
                LookupMiss::Tileset {
                    uid: rect.tileset_uid,
                },
            );
            return None;
        };
        tileset
            .sprite_for_rect(&rect)
            .map_err(|miss| ctx.miss(info, miss))
            .ok()
    });

    Placeable {
        name: raw.identifier.clone(),
        iid: raw.iid.clone(),
        position: Vec2::new(raw.px[0] as f32, raw.px[1] as f32),
        size: Vec2::new(width as f32, height as f32),
        pivot,
        z: info.order,
        sprite,
        tags: raw.tags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageHandle;
    use ldtk_map_schema::{IntGridValue, TilesetDefinition};
    use serde_json::json;
    use std::rc::Rc;

    fn project() -> ProjectDocument {
        serde_json::from_value(json!({
            "defs": {
                "tilesets": [{
                    "uid": 1, "identifier": "Cavern", "relPath": "cavern.png",
                    "pxWid": 64, "pxHei": 64, "tileGridSize": 16, "spacing": 0, "padding": 0
                }],
                "layers": [{
                    "__type": "IntGrid", "identifier": "Collisions", "uid": 10, "gridSize": 16,
                    "intGridValues": [
                        { "value": 1, "identifier": "Solid_Ground" },
                        { "value": 2, "identifier": "Solid_Water" },
                        { "value": 3, "identifier": "Grass" }
                    ]
                }],
                "entities": [
                    { "identifier": "Chest", "uid": 20, "width": 16, "height": 16,
                      "pivotX": 0.5, "pivotY": 1.0,
                      "tileRect": { "tilesetUid": 1, "x": 32, "y": 0, "w": 16, "h": 16 } },
                    { "identifier": "Player", "uid": 21, "width": 8, "height": 24 }
                ]
            }
        }))
        .unwrap()
    }

    fn tilesets(project: &ProjectDocument) -> HashMap<i64, Tileset> {
        project
            .defs
            .tilesets
            .iter()
            .map(|def: &TilesetDefinition| {
                let image = ImageHandle::from_definition("cavern.png", def);
                (def.uid, Tileset::new(def.clone(), image))
            })
            .collect()
    }

    fn level() -> LevelDocument {
        LevelDocument {
            identifier: "Level_0".to_string(),
            world_x: 256,
            world_y: 128,
            ..Default::default()
        }
    }

    fn layer(value: serde_json::Value) -> LayerInstance {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_layer_info_offsets() {
        let raw = layer(json!({
            "__identifier": "Ground", "__type": "Tiles", "__gridSize": 16,
            "__cWid": 4, "__cHei": 4, "__pxTotalOffsetX": 8, "__pxTotalOffsetY": -4,
            "__opacity": 0.5, "visible": false
        }));
        let info = LayerInfo::from_instance(&level(), &raw, 3);
        assert_eq!(info.offset(), Vec2::new(264.0, 124.0));
        assert_eq!(info.order, 3);
        assert!(!info.visible);
        assert_eq!(info.opacity, 0.5);
    }

    #[test]
    fn test_tile_layer_paints_and_flips() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };

        let raw = layer(json!({
            "__identifier": "Ground", "__type": "Tiles", "__gridSize": 16,
            "__cWid": 2, "__cHei": 2, "__tilesetDefUid": 1,
            "gridTiles": [
                { "px": [0, 0], "src": [16, 0], "f": 0, "t": 1 },
                { "px": [16, 16], "src": [16, 0], "f": 3, "t": 1 },
                { "px": [16, 0], "src": [64, 0], "f": 0, "t": 4 },
                { "px": [32, 0], "src": [0, 0], "f": 0, "t": 0 }
            ]
        }));
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = TileLayer::build(&raw, &info, &mut ctx);

        let plain = &built.grid.get(0, 0).unwrap().sprites[0];
        let flipped = &built.grid.get(1, 1).unwrap().sprites[0];
        assert!(plain.flip.is_none());
        assert!(flipped.flip.horizontal && flipped.flip.vertical);
        assert!(!std::sync::Arc::ptr_eq(plain, flipped));
        assert!(built.grid.get(1, 0).unwrap().sprites.is_empty());
        assert_eq!(built.grid.painted_count(), 2);

        assert_eq!(diagnostics.lookup_misses(), 2);
    }

    #[test]
    fn test_auto_layer_and_override_tileset() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };

        let raw = layer(json!({
            "__identifier": "Walls", "__type": "AutoLayer", "__gridSize": 16,
            "__cWid": 1, "__cHei": 1, "__tilesetDefUid": 99, "overrideTilesetUid": 1,
            "autoLayerTiles": [{ "px": [0, 0], "src": [0, 16], "f": 0, "t": 4 }]
        }));
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = TileLayer::build(&raw, &info, &mut ctx);

        let sprite = &built.grid.get(0, 0).unwrap().sprites[0];
        assert_eq!((sprite.column, sprite.row), (0, 1));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_tileset_is_reported() {
        let project = project();
        let tilesets = HashMap::new();
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };

        let raw = layer(json!({
            "__identifier": "Ground", "__type": "Tiles", "__gridSize": 16,
            "__cWid": 1, "__cHei": 1, "__tilesetDefUid": 1,
            "gridTiles": [{ "px": [0, 0], "src": [0, 0], "f": 0, "t": 0 }]
        }));
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = TileLayer::build(&raw, &info, &mut ctx);

        assert_eq!(built.grid.painted_count(), 0);
        assert_eq!(
            diagnostics.entries()[0],
            crate::Diagnostic::LookupMiss {
                level: "Level_0".to_string(),
                layer: "Ground".to_string(),
                miss: LookupMiss::Tileset { uid: 1 },
            }
        );
    }

    #[test]
    fn test_named_solidity() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };

        let raw = layer(json!({
            "__identifier": "Collisions", "__type": "IntGrid", "__gridSize": 16,
            "__cWid": 4, "__cHei": 1, "layerDefUid": 10,
            "intGridCsv": [1, 2, 3, 0]
        }));
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = IntGridLayer::build(&raw, &info, &mut ctx);

        assert_eq!(built.rule, SolidityRule::Named(vec![1, 2]));
        assert!(built.is_solid(0, 0));
        assert!(built.is_solid(1, 0));
        assert!(!built.is_solid(2, 0));
        assert!(!built.is_solid(3, 0));
        assert_eq!(built.grid.get(2, 0).unwrap().value, 3);
    }

    #[test]
    fn test_legacy_value_one_fallback() {
        let definition = LayerDefinition {
            int_grid_values: vec![IntGridValue {
                value: 1,
                identifier: Some("walls".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let rule = SolidityRule::for_definition(Some(&definition));
        assert_eq!(rule, SolidityRule::LegacyValueOne);
        assert!(rule.is_solid(1));
        assert!(!rule.is_solid(2));

        assert_eq!(SolidityRule::for_definition(None), SolidityRule::LegacyValueOne);
    }

    fn entity_layer_json() -> LayerInstance {
        layer(json!({
            "__identifier": "Entities", "__type": "Entities", "__gridSize": 16,
            "__cWid": 8, "__cHei": 8,
            "entityInstances": [
                { "__identifier": "Chest", "iid": "c1", "px": [32, 48], "defUid": 20,
                  "fieldInstances": [{ "__identifier": "Loot", "__type": "String", "__value": "Gold" }] },
                { "__identifier": "Player", "iid": "p1", "px": [8, 8], "defUid": 21,
                  "__pivot": [0.5, 0.5], "width": 10,
                  "fieldInstances": [{ "__identifier": "camera", "__type": "Bool", "__value": true }] },
                { "__identifier": "Chest", "iid": "c2", "px": [64, 48], "defUid": 20,
                  "fieldInstances": [{ "__identifier": "loot", "__type": "String", "__value": "silver" }] }
            ]
        }))
    }

    #[derive(Debug)]
    struct Hero {
        local: Vec2,
        world: Vec2,
    }

    impl SceneEntity for Hero {
        fn name(&self) -> &str {
            "Player"
        }
        fn position(&self) -> Vec2 {
            self.local
        }
        fn z(&self) -> i64 {
            0
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_generic_entities() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };

        let raw = entity_layer_json();
        let info = LayerInfo::from_instance(&level(), &raw, 5);
        let built = EntityLayer::build(&raw, &info, &mut ctx);
        assert_eq!(built.len(), 3);

        let chest = built.entity_for_raw(0).unwrap().downcast_ref::<Placeable>().unwrap();
        assert_eq!(chest.position, Vec2::new(32.0, 48.0));
        assert_eq!(chest.size, Vec2::new(16.0, 16.0));
        assert_eq!(chest.pivot, Vec2::new(0.5, 1.0));
        assert_eq!(chest.z, 5);
        let sprite = chest.sprite.as_ref().unwrap();
        assert_eq!((sprite.column, sprite.row), (2, 0));

        let player = built.entity_for_raw(1).unwrap().downcast_ref::<Placeable>().unwrap();
        assert_eq!(player.size, Vec2::new(10.0, 24.0));
        assert_eq!(player.pivot, Vec2::new(0.5, 0.5));
        assert!(player.sprite.is_none());

        let key = built.key_for_raw(2).unwrap();
        assert_eq!(built.raw_for_entity(key).unwrap().iid, "c2");
    }

    #[test]
    fn test_find_entities() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };
        let raw = entity_layer_json();
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = EntityLayer::build(&raw, &info, &mut ctx);

        assert_eq!(built.find_by_identifier("chest").len(), 2);
        assert_eq!(built.find_by_identifier("CHEST").len(), 2);
        assert_eq!(built.find_by_field("LOOT", None).len(), 2);
        let gold = built.find_by_field("loot", Some(&FieldValue::from("GOLD")));
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].position(), Vec2::new(32.0, 48.0));
        assert!(built.find_by_field("loot", Some(&FieldValue::from(3))).is_empty());
        assert!(built.find_by_identifier("Door").is_empty());
    }

    #[test]
    fn test_factory_at_build_time() {
        let project = project();
        let tilesets = tilesets(&project);
        let mut factories = FactoryRegistry::new();
        factories.register_fn("Player", |ctx| {
            Some(Box::new(Hero {
                local: ctx.position,
                world: ctx.world_position,
            }) as Box<dyn SceneEntity>)
        });
        factories.register_fn("Chest", |_| None);
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };
        let raw = entity_layer_json();
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let built = EntityLayer::build(&raw, &info, &mut ctx);

        let hero = built.entity_for_raw(1).unwrap().downcast_ref::<Hero>().unwrap();
        assert_eq!(hero.world, Vec2::new(264.0, 136.0));
        assert_eq!(hero.position(), Vec2::new(8.0, 8.0));
        assert!(built.entity_for_raw(0).unwrap().is::<Placeable>());
    }

    #[test]
    fn test_apply_factory_replaces_in_place() {
        let project = project();
        let tilesets = tilesets(&project);
        let factories = FactoryRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = BuildContext {
            project: &project,
            tilesets: &tilesets,
            factories: &factories,
            diagnostics: &mut diagnostics,
        };
        let raw = entity_layer_json();
        let info = LayerInfo::from_instance(&level(), &raw, 0);
        let mut built = EntityLayer::build(&raw, &info, &mut ctx);
        let old_key = built.key_for_raw(1).unwrap();

        let factory: EntityFactory = Rc::new(|ctx: &EntityFactoryContext<'_>| {
            Some(Box::new(Hero {
                local: ctx.position,
                world: ctx.world_position,
            }) as Box<dyn SceneEntity>)
        });
        assert_eq!(built.apply_factory("Player", &factory, &info, &project), 1);

        assert_eq!(built.len(), 3);
        let names: Vec<_> = built.entities().map(|(_, e)| e.name().to_string()).collect();
        assert_eq!(names, ["Chest", "Player", "Chest"]);
        assert!(built.entity_for_raw(1).unwrap().is::<Hero>());
        assert!(built.raw_for_entity(old_key).is_none());
        let new_key = built.key_for_raw(1).unwrap();
        assert_ne!(new_key, old_key);
        assert_eq!(built.raw_for_entity(new_key).unwrap().iid, "p1");
        assert_eq!(built.find_by_identifier("player").len(), 1);

        // declining leaves the current entity alone
        let decline: EntityFactory =
            Rc::new(|_: &EntityFactoryContext<'_>| -> Option<Box<dyn SceneEntity>> { None });
        assert_eq!(built.apply_factory("Chest", &decline, &info, &project), 0);
        assert!(built.entity_for_raw(0).unwrap().is::<Placeable>());
    }
}
