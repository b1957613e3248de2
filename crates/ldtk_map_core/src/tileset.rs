//! Tilesets sliced into per-cell sprites

use crate::LookupMiss;
use glam::{IVec2, UVec2};
use ldtk_map_schema::{Pair, TilesetDefinition, TilesetRect};
use std::sync::Arc;

/// A loaded image, as far as the loader cares about it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    /// Resolved path the image was loaded from
    pub path: Arc<str>,
    pub width: u32,
    pub height: u32,
}

impl ImageHandle {
    pub fn new(path: impl Into<Arc<str>>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    /// A handle carrying only the dimensions declared by a tileset definition
    pub fn from_definition(path: impl Into<Arc<str>>, def: &TilesetDefinition) -> Self {
        Self::new(
            path,
            u32::try_from(def.px_wid).unwrap_or(0),
            u32::try_from(def.px_hei).unwrap_or(0),
        )
    }
}

/// Flip state decoded from the `f` bits of a tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flip {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Flip {
    pub const NONE: Flip = Flip {
        horizontal: false,
        vertical: false,
    };

    /// Bit 0 flips on X, bit 1 flips on Y
    pub fn from_bits(bits: u8) -> Self {
        Self {
            horizontal: bits & 0b01 != 0,
            vertical: bits & 0b10 != 0,
        }
    }

    pub fn is_none(self) -> bool {
        !self.horizontal && !self.vertical
    }
}

/// One cell of a tileset image
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub image: ImageHandle,
    pub tileset_uid: i64,
    pub column: i64,
    pub row: i64,
    /// Top-left pixel of the cell in the image
    pub source: IVec2,
    pub size: UVec2,
    pub flip: Flip,
}

impl Sprite {
    /// Sprite with the given flip applied
    ///
    /// Without flip bits the same `Arc` is returned; otherwise a fresh copy
    /// is made and `self` is left untouched.
    pub fn with_flip(self: &Arc<Self>, flip: Flip) -> Arc<Sprite> {
        if flip.is_none() {
            return Arc::clone(self);
        }
        Arc::new(Sprite {
            flip,
            ..Sprite::clone(self)
        })
    }
}

/// A tileset definition bound to its image
///
/// Every cell gets one canonical sprite at construction; lookups hand out
/// clones of those `Arc`s.
#[derive(Debug, Clone)]
pub struct Tileset {
    definition: TilesetDefinition,
    image: ImageHandle,
    columns: i64,
    rows: i64,
    sprites: Vec<Arc<Sprite>>,
}

impl Tileset {
    pub fn new(definition: TilesetDefinition, image: ImageHandle) -> Self {
        let pitch = definition.tile_grid_size + definition.spacing;
        let cells = |extent: i64| {
            if pitch <= 0 || definition.tile_grid_size <= 0 {
                return 0;
            }
            (extent - 2 * definition.padding + definition.spacing)
                .div_euclid(pitch)
                .max(0)
        };
        let columns = cells(definition.px_wid);
        let rows = cells(definition.px_hei);

        let size = UVec2::splat(u32::try_from(definition.tile_grid_size).unwrap_or(0));
        let mut sprites = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let origin = IVec2::new(
                    (definition.padding + column * pitch) as i32,
                    (definition.padding + row * pitch) as i32,
                );
                sprites.push(Arc::new(Sprite {
                    image: image.clone(),
                    tileset_uid: definition.uid,
                    column,
                    row,
                    source: origin,
                    size,
                    flip: Flip::NONE,
                }));
            }
        }

        Self {
            definition,
            image,
            columns,
            rows,
            sprites,
        }
    }

    pub fn uid(&self) -> i64 {
        self.definition.uid
    }

    pub fn identifier(&self) -> &str {
        &self.definition.identifier
    }

    pub fn definition(&self) -> &TilesetDefinition {
        &self.definition
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn columns(&self) -> i64 {
        self.columns
    }

    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Cell containing the given source pixel, before range checks
    pub fn cell_for_source(&self, src: Pair) -> (i64, i64) {
        let pitch = self.definition.tile_grid_size + self.definition.spacing;
        if pitch <= 0 {
            return (0, 0);
        }
        (
            (src[0] - self.definition.padding).div_euclid(pitch),
            (src[1] - self.definition.padding).div_euclid(pitch),
        )
    }

    /// Canonical sprite of a cell
    pub fn sprite(&self, column: i64, row: i64) -> Option<&Arc<Sprite>> {
        if !(0..self.columns).contains(&column) || !(0..self.rows).contains(&row) {
            return None;
        }
        self.sprites.get((row * self.columns + column) as usize)
    }

    /// Decode a painted tile into a sprite
    pub fn sprite_for_tile(&self, src: Pair, flip_bits: u8) -> Result<Arc<Sprite>, LookupMiss> {
        let (column, row) = self.cell_for_source(src);
        self.sprite(column, row)
            .map(|sprite| sprite.with_flip(Flip::from_bits(flip_bits)))
            .ok_or(LookupMiss::Cell {
                tileset_uid: self.uid(),
                column,
                row,
            })
    }

    /// Sprite for the top-left cell of a tileset rectangle
    pub fn sprite_for_rect(&self, rect: &TilesetRect) -> Result<Arc<Sprite>, LookupMiss> {
        self.sprite_for_tile([rect.x, rect.y], 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(px: i64, grid: i64, spacing: i64, padding: i64) -> TilesetDefinition {
        TilesetDefinition {
            uid: 1,
            identifier: "Cavern".to_string(),
            rel_path: Some("img/cavern.png".to_string()),
            px_wid: px,
            px_hei: px,
            tile_grid_size: grid,
            spacing,
            padding,
            ..Default::default()
        }
    }

    fn tileset(px: i64, grid: i64, spacing: i64, padding: i64) -> Tileset {
        let def = definition(px, grid, spacing, padding);
        let image = ImageHandle::from_definition("img/cavern.png", &def);
        Tileset::new(def, image)
    }

    #[test]
    fn test_plain_grid() {
        let tileset = tileset(64, 16, 0, 0);
        assert_eq!(tileset.columns(), 4);
        assert_eq!(tileset.rows(), 4);
        assert_eq!(tileset.len(), 16);
        assert_eq!(tileset.cell_for_source([48, 16]), (3, 1));
        assert_eq!(tileset.sprite(3, 1).unwrap().source, IVec2::new(48, 16));
        assert!(tileset.sprite(4, 0).is_none());
        assert!(tileset.sprite(-1, 0).is_none());
    }

    #[test]
    fn test_lookup_never_misses_in_range() {
        // 2px padding, 1px spacing, 16px cells: 2 + 4*16 + 3*1 + 2 = 71
        let tileset = tileset(71, 16, 1, 2);
        assert_eq!(tileset.columns(), 4);
        assert_eq!(tileset.rows(), 4);

        for row in 0..tileset.rows() {
            for column in 0..tileset.columns() {
                let src = [2 + column * 17, 2 + row * 17];
                let sprite = tileset.sprite_for_tile(src, 0).unwrap();
                assert_eq!((sprite.column, sprite.row), (column, row));
                assert_eq!(sprite.source, IVec2::new(src[0] as i32, src[1] as i32));
                assert_eq!(sprite.size, UVec2::splat(16));
            }
        }
    }

    #[test]
    fn test_out_of_range_is_a_miss() {
        let tileset = tileset(32, 16, 0, 0);
        assert_eq!(
            tileset.sprite_for_tile([32, 0], 0),
            Err(LookupMiss::Cell {
                tileset_uid: 1,
                column: 2,
                row: 0
            })
        );
    }

    #[test]
    fn test_relaxed_geometry_floors() {
        let tileset = tileset(70, 16, 0, 0);
        assert_eq!(tileset.columns(), 4);
    }

    #[test]
    fn test_flip_bits() {
        assert_eq!(Flip::from_bits(0), Flip::NONE);
        assert_eq!(
            Flip::from_bits(1),
            Flip {
                horizontal: true,
                vertical: false
            }
        );
        assert_eq!(
            Flip::from_bits(2),
            Flip {
                horizontal: false,
                vertical: true
            }
        );
        assert_eq!(
            Flip::from_bits(3),
            Flip {
                horizontal: true,
                vertical: true
            }
        );
    }

    #[test]
    fn test_flipped_sprite_does_not_alias_canonical() {
        let tileset = tileset(32, 16, 0, 0);
        let canonical = Arc::clone(tileset.sprite(1, 0).unwrap());

        let plain = tileset.sprite_for_tile([16, 0], 0).unwrap();
        assert!(Arc::ptr_eq(&plain, &canonical));

        for bits in 1..=3 {
            let flipped = tileset.sprite_for_tile([16, 0], bits).unwrap();
            assert!(!Arc::ptr_eq(&flipped, &canonical));
            assert_eq!(flipped.flip, Flip::from_bits(bits));
        }
        assert_eq!(tileset.sprite(1, 0).unwrap().flip, Flip::NONE);
    }
}
