//! Per-identifier entity construction
//!
//! A factory turns a raw entity instance into a host entity. Returning
//! `None` leaves the instance to the generic [`crate::Placeable`] path.
//!
//! ```rust,ignore
//! registry.register_fn("Player", |ctx| {
//!     Some(Box::new(Player::spawn(ctx.position)) as Box<dyn SceneEntity>)
//! });
//! ```
//!
//! [`SceneEntity::position`] must stay layer-local: composition adds the
//! level, layer and world offsets itself.

use crate::{FieldValue, LayerInfo, SceneEntity};
use glam::Vec2;
use ldtk_map_schema::{EntityDefinition, EntityInstance};
use std::collections::HashMap;
use std::rc::Rc;

/// Construction logic for one entity identifier
pub type EntityFactory = Rc<dyn Fn(&EntityFactoryContext<'_>) -> Option<Box<dyn SceneEntity>>>;

/// Everything a factory gets to see about the instance it builds
#[derive(Debug, Clone, Copy)]
pub struct EntityFactoryContext<'a> {
    pub identifier: &'a str,
    /// Instance position in layer pixels; what [`SceneEntity::position`] returns
    pub position: Vec2,
    /// Where default composition places the instance, level and layer
    /// offsets included. Read-only context; returning it from
    /// [`SceneEntity::position`] would offset the entity twice.
    pub world_position: Vec2,
    pub raw: &'a EntityInstance,
    pub definition: Option<&'a EntityDefinition>,
    pub layer: &'a LayerInfo,
}

impl EntityFactoryContext<'_> {
    /// Field value by identifier, ignoring case
    pub fn field(&self, identifier: &str) -> Option<FieldValue> {
        self.raw
            .field(identifier)
            .map(|f| FieldValue::from_json(&f.value))
    }

    /// Instance size, falling back to the definition
    pub fn size(&self) -> Vec2 {
        let def = self.definition;
        let width = self.raw.width.or(def.map(|d| d.width)).unwrap_or(0);
        let height = self.raw.height.or(def.map(|d| d.height)).unwrap_or(0);
        Vec2::new(width as f32, height as f32)
    }

    /// Paint order of the owning layer
    pub fn z(&self) -> i64 {
        self.layer.order
    }
}

/// Registered factories keyed by entity identifier
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, returning the one it replaces
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        factory: EntityFactory,
    ) -> Option<EntityFactory> {
        self.factories.insert(identifier.into(), factory)
    }

    /// Register a closure as a factory
    pub fn register_fn<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn(&EntityFactoryContext<'_>) -> Option<Box<dyn SceneEntity>> + 'static,
    {
        self.register(identifier, Rc::new(factory));
    }

    pub fn get(&self, identifier: &str) -> Option<&EntityFactory> {
        self.factories.get(identifier)
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut identifiers: Vec<_> = self.identifiers().collect();
        identifiers.sort_unstable();
        f.debug_struct("FactoryRegistry")
            .field("identifiers", &identifiers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Placeable;
    use serde_json::json;

    #[test]
    fn test_register_and_replace() {
        let mut registry = FactoryRegistry::new();
        assert!(registry.is_empty());

        registry.register_fn("Player", |_| None);
        assert!(registry.is_registered("Player"));
        assert!(!registry.is_registered("player"));

        let factory: EntityFactory =
            Rc::new(|_: &EntityFactoryContext<'_>| -> Option<Box<dyn SceneEntity>> { None });
        let previous = registry.register("Player", factory);
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_context_helpers() {
        let raw: EntityInstance = serde_json::from_value(json!({
            "__identifier": "Chest",
            "px": [8, 8],
            "fieldInstances": [{ "__identifier": "Loot", "__type": "String", "__value": "Gold" }]
        }))
        .unwrap();
        let definition = EntityDefinition {
            identifier: "Chest".to_string(),
            width: 16,
            height: 8,
            ..Default::default()
        };
        let layer = LayerInfo {
            order: 4,
            ..Default::default()
        };
        let ctx = EntityFactoryContext {
            identifier: "Chest",
            position: Vec2::new(8.0, 8.0),
            world_position: Vec2::new(8.0, 8.0),
            raw: &raw,
            definition: Some(&definition),
            layer: &layer,
        };

        assert_eq!(ctx.field("loot"), Some(FieldValue::from("Gold")));
        assert_eq!(ctx.size(), Vec2::new(16.0, 8.0));
        assert_eq!(ctx.z(), 4);

        let mut registry = FactoryRegistry::new();
        registry.register_fn("Chest", |ctx| {
            Some(Box::new(Placeable::new(ctx.identifier, ctx.position)) as Box<dyn SceneEntity>)
        });
        let built = (registry.get("Chest").unwrap())(&ctx).unwrap();
        assert_eq!(built.name(), "Chest");
    }
}
