//! Strict shape validation of raw LDtk JSON
//!
//! Validation walks the `serde_json::Value` tree before deserialization so
//! that a failure can name the exact JSON path of the offending field.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::SchemaError;

/// Validate the shape of a project document
pub fn validate_project(source: &str, value: &Value) -> Result<(), SchemaError> {
    check_project(value).map_err(|e| e.with_source(source))
}

/// Validate the shape of a standalone level document (`.ldtkl`)
pub fn validate_level(source: &str, value: &Value) -> Result<(), SchemaError> {
    check_level(value).map_err(|e| e.with_source(source))
}

fn check_project(value: &Value) -> Result<(), SchemaError> {
    let root = Obj::root(value)?;
    root.string("iid")?;
    root.string("jsonVersion")?;
    root.boolean("externalLevels")?;
    root.nullable_string("bgColor")?;
    root.nullable_integer("defaultGridSize")?;

    let defs = root.object("defs")?;
    defs.each("tilesets", validate_tileset_def)?;
    defs.each("layers", validate_layer_def)?;
    defs.each("entities", validate_entity_def)?;

    root.each("levels", validate_level_obj)
}

fn check_level(value: &Value) -> Result<(), SchemaError> {
    let root = Obj::root(value)?;
    validate_level_obj(&root)?;
    if root.get("layerInstances").map_or(true, Value::is_null) {
        return Err(root.error("layerInstances", "external level has no layer instances"));
    }
    Ok(())
}

fn validate_tileset_def(def: &Obj<'_>) -> Result<(), SchemaError> {
    def.integer("uid")?;
    def.string("identifier")?;
    def.nullable_string("relPath")?;
    let px_wid = def.integer("pxWid")?;
    let px_hei = def.integer("pxHei")?;
    let grid = def.integer("tileGridSize")?;
    let spacing = def.integer("spacing")?;
    let padding = def.integer("padding")?;

    if grid <= 0 {
        return Err(def.error("tileGridSize", "must be positive"));
    }
    let pitch = grid + spacing;
    for (key, extent) in [("pxWid", px_wid), ("pxHei", px_hei)] {
        let usable = extent - 2 * padding + spacing;
        if usable < 0 || usable % pitch != 0 {
            return Err(def.error(
                key,
                &format!(
                    "{extent}px does not divide into {grid}px cells (spacing {spacing}, padding {padding})"
                ),
            ));
        }
    }
    Ok(())
}

fn validate_layer_def(def: &Obj<'_>) -> Result<(), SchemaError> {
    def.layer_type("__type")?;
    def.string("identifier")?;
    def.integer("uid")?;
    def.each("intGridValues", |value| {
        value.integer("value")?;
        value.nullable_string("identifier")
    })
}

fn validate_entity_def(def: &Obj<'_>) -> Result<(), SchemaError> {
    def.string("identifier")?;
    def.integer("uid")?;
    def.integer("width")?;
    def.integer("height")?;
    def.number("pivotX")?;
    def.number("pivotY")?;
    def.optional_rect("tileRect")
}

fn validate_level_obj(level: &Obj<'_>) -> Result<(), SchemaError> {
    level.string("identifier")?;
    level.uuid("iid")?;
    level.integer("uid")?;
    level.integer("worldX")?;
    level.integer("worldY")?;
    level.integer("pxWid")?;
    level.integer("pxHei")?;
    level.nullable_string("__bgColor")?;
    level.nullable_string("externalRelPath")?;

    match level.get("layerInstances") {
        None | Some(Value::Null) => {
            let external = level.get("externalRelPath").and_then(Value::as_str);
            if external.map_or(true, str::is_empty) {
                log::debug!(
                    "{}: level has neither layer instances nor an external file",
                    level.path
                );
            }
            Ok(())
        }
        Some(_) => level.each("layerInstances", validate_layer_instance),
    }
}

fn validate_layer_instance(layer: &Obj<'_>) -> Result<(), SchemaError> {
    layer.string("__identifier")?;
    layer.layer_type("__type")?;
    layer.integer("__cWid")?;
    layer.integer("__cHei")?;
    let grid = layer.integer("__gridSize")?;
    if grid <= 0 {
        return Err(layer.error("__gridSize", "must be positive"));
    }
    layer.integer("__pxTotalOffsetX")?;
    layer.integer("__pxTotalOffsetY")?;
    layer.nullable_integer("__tilesetDefUid")?;
    layer.uuid("iid")?;
    layer.integer("layerDefUid")?;
    layer.boolean("visible")?;
    layer.each("gridTiles", validate_tile)?;
    layer.each("autoLayerTiles", validate_tile)?;
    layer.each_value("intGridCsv", |path, v| {
        if v.is_i64() {
            Ok(())
        } else {
            Err(SchemaError::invalid(path, "expected an integer"))
        }
    })?;
    layer.each("entityInstances", validate_entity_instance)
}

fn validate_tile(tile: &Obj<'_>) -> Result<(), SchemaError> {
    tile.pair("px")?;
    tile.pair("src")?;
    let flip = tile.integer("f")?;
    if !(0..=3).contains(&flip) {
        return Err(tile.error("f", "flip bits must be within 0..=3"));
    }
    tile.integer("t").map(|_| ())
}

fn validate_entity_instance(entity: &Obj<'_>) -> Result<(), SchemaError> {
    entity.string("__identifier")?;
    entity.pair("__grid")?;
    entity.pair("__pivot")?;
    entity.each_value("__tags", |path, v| {
        if v.is_string() {
            Ok(())
        } else {
            Err(SchemaError::invalid(path, "expected a string"))
        }
    })?;
    entity.optional_rect("__tile")?;
    entity.uuid("iid")?;
    entity.integer("width")?;
    entity.integer("height")?;
    entity.integer("defUid")?;
    entity.pair("px")?;
    entity.each("fieldInstances", |field| {
        field.string("__identifier")?;
        field.string("__type")?;
        field.integer("defUid")?;
        if field.get("__value").is_none() {
            return Err(field.error("__value", "missing field"));
        }
        Ok(())
    })
}

/// A JSON object plus the path used in error messages
struct Obj<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Obj<'a> {
    fn root(value: &'a Value) -> Result<Self, SchemaError> {
        match value {
            Value::Object(map) => Ok(Self {
                map,
                path: String::new(),
            }),
            _ => Err(SchemaError::invalid("$", "document root must be an object")),
        }
    }

    fn child(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn error(&self, key: &str, message: &str) -> SchemaError {
        SchemaError::invalid(&self.child(key), message)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    fn require(&self, key: &str) -> Result<&'a Value, SchemaError> {
        self.map
            .get(key)
            .ok_or_else(|| self.error(key, "missing field"))
    }

    fn string(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| self.error(key, "expected a string"))
    }

    fn nullable_string(&self, key: &str) -> Result<(), SchemaError> {
        match self.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(self.error(key, "expected a string or null")),
        }
    }

    fn uuid(&self, key: &str) -> Result<(), SchemaError> {
        let raw = self.string(key)?;
        Uuid::parse_str(raw)
            .map(|_| ())
            .map_err(|e| self.error(key, &format!("invalid iid '{raw}': {e}")))
    }

    fn integer(&self, key: &str) -> Result<i64, SchemaError> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| self.error(key, "expected an integer"))
    }

    fn nullable_integer(&self, key: &str) -> Result<(), SchemaError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(()),
            Some(v) if v.is_i64() => Ok(()),
            Some(_) => Err(self.error(key, "expected an integer or null")),
        }
    }

    fn number(&self, key: &str) -> Result<f64, SchemaError> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| self.error(key, "expected a number"))
    }

    fn boolean(&self, key: &str) -> Result<bool, SchemaError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| self.error(key, "expected a boolean"))
    }

    fn pair(&self, key: &str) -> Result<(), SchemaError> {
        match self.require(key)? {
            Value::Array(items) if items.len() == 2 && items.iter().all(Value::is_number) => Ok(()),
            _ => Err(self.error(key, "expected an array of 2 numbers")),
        }
    }

    fn layer_type(&self, key: &str) -> Result<(), SchemaError> {
        let name = self.string(key)?;
        crate::LayerType::from_name(name)
            .map(|_| ())
            .ok_or_else(|| self.error(key, &format!("unknown layer type '{name}'")))
    }

    fn object(&self, key: &str) -> Result<Obj<'a>, SchemaError> {
        match self.require(key)? {
            Value::Object(map) => Ok(Obj {
                map,
                path: self.child(key),
            }),
            _ => Err(self.error(key, "expected an object")),
        }
    }

    fn optional_rect(&self, key: &str) -> Result<(), SchemaError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(()),
            Some(_) => {
                let rect = self.object(key)?;
                for field in ["tilesetUid", "x", "y", "w", "h"] {
                    rect.integer(field)?;
                }
                Ok(())
            }
        }
    }

    fn array(&self, key: &str) -> Result<&'a Vec<Value>, SchemaError> {
        self.require(key)?
            .as_array()
            .ok_or_else(|| self.error(key, "expected an array"))
    }

    fn each_value(
        &self,
        key: &str,
        mut check: impl FnMut(&str, &Value) -> Result<(), SchemaError>,
    ) -> Result<(), SchemaError> {
        let base = self.child(key);
        for (i, item) in self.array(key)?.iter().enumerate() {
            check(&format!("{base}[{i}]"), item)?;
        }
        Ok(())
    }

    fn each(
        &self,
        key: &str,
        mut check: impl FnMut(&Obj<'_>) -> Result<(), SchemaError>,
    ) -> Result<(), SchemaError> {
        let base = self.child(key);
        for (i, item) in self.array(key)?.iter().enumerate() {
            let path = format!("{base}[{i}]");
            match item {
                Value::Object(map) => check(&Obj { map, path })?,
                _ => return Err(SchemaError::invalid(&path, "expected an object")),
            }
        }
        Ok(())
    }
}
