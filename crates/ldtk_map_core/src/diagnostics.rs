//! Non-fatal problems found while loading

use thiserror::Error;

/// A lookup that failed while painting a layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupMiss {
    #[error("tiles are painted but the layer names no tileset")]
    NoTileset,
    #[error("tileset {uid} is not loaded")]
    Tileset { uid: i64 },
    #[error("tileset {tileset_uid} has no cell at column {column}, row {row}")]
    Cell {
        tileset_uid: i64,
        column: i64,
        row: i64,
    },
    #[error("grid cell ({x}, {y}) is outside the layer")]
    GridCell { x: i64, y: i64 },
}

/// A warning recorded during loading
///
/// Every diagnostic is also logged at warn level when reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("{document}: format version {found} is older than the supported {supported}")]
    VersionMismatch {
        document: String,
        found: String,
        supported: String,
    },
    #[error("level {level}, layer {layer}: {miss}")]
    LookupMiss {
        level: String,
        layer: String,
        miss: LookupMiss,
    },
}

/// Collected diagnostics in the order they were reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Record a failed lookup for a layer
    pub fn lookup_miss(&mut self, level: &str, layer: &str, miss: LookupMiss) {
        self.report(Diagnostic::LookupMiss {
            level: level.to_string(),
            layer: layer.to_string(),
            miss,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded lookup misses
    pub fn lookup_misses(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::LookupMiss { .. }))
            .count()
    }
}
