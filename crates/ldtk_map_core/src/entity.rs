//! Entities built from raw entity instances

use crate::Sprite;
use glam::Vec2;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Anything an entity layer can hold
///
/// Positions are local to the owning layer; the scene composer adds level
/// and layer offsets when handing entities to the host.
pub trait SceneEntity: fmt::Debug + Any {
    /// Entity identifier this was built for
    fn name(&self) -> &str;

    /// Position in layer pixels, without level or layer offsets
    fn position(&self) -> Vec2;

    /// Paint order
    fn z(&self) -> i64;

    fn sprite(&self) -> Option<&Arc<Sprite>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn SceneEntity {
    /// Downcast to a concrete entity type
    pub fn downcast_ref<T: SceneEntity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: SceneEntity>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Generic entity built when no factory claims an instance
#[derive(Debug, Clone, PartialEq)]
pub struct Placeable {
    pub name: String,
    /// Instance iid
    pub iid: String,
    pub position: Vec2,
    pub size: Vec2,
    /// Normalized anchor, `(0, 0)` is top-left
    pub pivot: Vec2,
    pub z: i64,
    pub sprite: Option<Arc<Sprite>>,
    pub tags: Vec<String>,
}

impl Placeable {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            iid: String::new(),
            position,
            size: Vec2::ZERO,
            pivot: Vec2::ZERO,
            z: 0,
            sprite: None,
            tags: Vec::new(),
        }
    }

    /// Top-left corner after applying the pivot
    pub fn top_left(&self) -> Vec2 {
        self.position - self.size * self.pivot
    }
}

impl SceneEntity for Placeable {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn z(&self) -> i64 {
        self.z
    }

    fn sprite(&self) -> Option<&Arc<Sprite>> {
        self.sprite.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
