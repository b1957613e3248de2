//! Fixed-size grid container handed to the host

use crate::Sprite;
use std::sync::Arc;

/// A single cell of a [`TileGrid`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    /// Sprites painted in this cell, bottom first
    pub sprites: Vec<Arc<Sprite>>,
    /// Raw int-grid value, 0 for empty
    pub value: i64,
    pub solid: bool,
}

impl GridCell {
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty() && self.value == 0 && !self.solid
    }
}

/// Row-major grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub name: String,
    columns: usize,
    rows: usize,
    /// Cell edge length in pixels
    cell_size: u32,
    cells: Vec<GridCell>,
}

impl TileGrid {
    /// Create an empty grid; negative dimensions become zero
    pub fn new(name: impl Into<String>, columns: i64, rows: i64, cell_size: i64) -> Self {
        let columns = usize::try_from(columns).unwrap_or(0);
        let rows = usize::try_from(rows).unwrap_or(0);
        Self {
            name: name.into(),
            columns,
            rows,
            cell_size: u32::try_from(cell_size).unwrap_or(0),
            cells: vec![GridCell::default(); columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Size in pixels as `(width, height)`
    ///
    /// Saturates at `u32::MAX` on oversized grids.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            pixel_extent(self.columns, self.cell_size),
            pixel_extent(self.rows, self.cell_size),
        )
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.columns && y < self.rows).then_some(y * self.columns + x)
    }

    pub fn get(&self, x: i64, y: i64) -> Option<&GridCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut GridCell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Iterate cells with their `(x, y)` coordinates
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &GridCell)> {
        let columns = self.columns.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i % columns, i / columns), cell))
    }

    /// Number of cells holding at least one sprite
    pub fn painted_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.sprites.is_empty()).count()
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|c| c.solid).count()
    }
}

fn pixel_extent(cells: usize, cell_size: u32) -> u32 {
    u32::try_from(cells)
        .unwrap_or(u32::MAX)
        .saturating_mul(cell_size)
}
