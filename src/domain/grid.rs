/// Collision grid: two row-major layers of tile indices over a catalog.
///
/// World coordinates are pixels with y growing DOWN. Cell `(col, row)`
/// covers `[col*T, (col+1)*T) x [row*T, (row+1)*T)` and lives at index
/// `row * width + col`.
///
/// Outside the grid, columns are solid wall and rows are open air, so
/// actors can fall out of the bottom but never walk off the sides.
/// A destroyed cell reads as air whatever its layers hold.

use crate::domain::catalog::TileCatalog;
use crate::domain::tile::TileType;

/// Shape of the grid without the tile data. Platforms step against this.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub tile_size: i32,
}

impl GridGeometry {
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// Top-left pixel of a cell.
    #[inline]
    pub fn cell_origin(&self, index: usize) -> (i32, i32) {
        let col = (index % self.width.max(1)) as i32;
        let row = (index / self.width.max(1)) as i32;
        (col * self.tile_size, row * self.tile_size)
    }

    /// Cell containing a pixel, `None` outside the grid.
    #[inline]
    pub fn index_at(&self, x: i32, y: i32) -> Option<usize> {
        let t = self.tile_size.max(1);
        let col = x.div_euclid(t);
        let row = y.div_euclid(t);
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }
}

/// Result of a world-space lookup.
#[derive(Clone, Copy, Debug)]
pub struct TileHit<'a> {
    /// `None` outside the grid.
    pub grid_index: Option<usize>,
    pub tile: &'a TileType,
    pub is_overlay: bool,
    /// Top-left pixel of the cell hit, valid outside the grid too.
    pub origin: (f32, f32),
}

#[derive(Clone, Debug)]
pub struct CollisionGrid {
    width: usize,
    height: usize,
    tile_size: f32,
    base: Vec<u32>,
    overlay: Vec<u32>,
    destroyed: Vec<bool>,
    catalog: TileCatalog,
}

impl CollisionGrid {
    pub fn new(width: usize, height: usize, tile_size: f32, catalog: TileCatalog) -> Self {
        CollisionGrid {
            width,
            height,
            tile_size,
            base: vec![0; width * height],
            overlay: vec![0; width * height],
            destroyed: vec![false; width * height],
            catalog,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry { width: self.width, height: self.height, tile_size: self.tile_size as i32 }
    }

    /// Pixel size of the whole level.
    pub fn pixel_size(&self) -> (f32, f32) {
        (self.width as f32 * self.tile_size, self.height as f32 * self.tile_size)
    }

    #[inline]
    pub fn index_of(&self, col: usize, row: usize) -> Option<usize> {
        (col < self.width && row < self.height).then(|| row * self.width + col)
    }

    pub fn base_at(&self, index: usize) -> u32 {
        self.base.get(index).copied().unwrap_or(0)
    }

    pub fn overlay_at(&self, index: usize) -> u32 {
        self.overlay.get(index).copied().unwrap_or(0)
    }

    /// Replace the base tile of a cell, undoing any destruction.
    /// Out-of-range indices are ignored.
    pub fn set_base(&mut self, index: usize, idx: u32) -> bool {
        match self.base.get_mut(index) {
            Some(cell) => {
                *cell = idx;
                self.destroyed[index] = false;
                true
            }
            None => false,
        }
    }

    pub fn set_overlay(&mut self, index: usize, idx: u32) -> bool {
        match self.overlay.get_mut(index) {
            Some(cell) => {
                *cell = idx;
                true
            }
            None => false,
        }
    }

    /// Copy of this grid with a new shape. Cells keep their `(col, row)`;
    /// cells outside the old grid start as air.
    pub fn resized(&self, width: usize, height: usize) -> CollisionGrid {
        let mut out = CollisionGrid::new(width, height, self.tile_size, self.catalog.clone());
        for row in 0..height.min(self.height) {
            for col in 0..width.min(self.width) {
                let from = row * self.width + col;
                let to = row * width + col;
                out.base[to] = self.base[from];
                out.overlay[to] = self.overlay[from];
                out.destroyed[to] = self.destroyed[from];
            }
        }
        out
    }

    pub fn is_destroyed(&self, index: usize) -> bool {
        self.destroyed.get(index).copied().unwrap_or(false)
    }

    /// Mark a cell destroyed. Returns false if it was out of range or already gone.
    pub fn destroy(&mut self, index: usize) -> bool {
        match self.destroyed.get_mut(index) {
            Some(cell) if !*cell => {
                *cell = true;
                true
            }
            _ => false,
        }
    }

    /// Tile covering a world point.
    ///
    /// A non-air overlay tile takes the cell and is reported with
    /// `is_overlay` set; otherwise the base tile. Destroyed cells are air.
    pub fn tile_at(&self, wx: f32, wy: f32) -> TileHit<'_> {
        let t = self.tile_size;
        let col = (wx / t).floor();
        let row = (wy / t).floor();
        let origin = (col * t, row * t);

        if col < 0.0 || col >= self.width as f32 {
            return TileHit { grid_index: None, tile: self.catalog.wall(), is_overlay: false, origin };
        }
        if row < 0.0 || row >= self.height as f32 {
            return TileHit { grid_index: None, tile: self.catalog.get(0), is_overlay: false, origin };
        }

        let index = row as usize * self.width + col as usize;
        if self.destroyed[index] {
            return TileHit { grid_index: Some(index), tile: self.catalog.get(0), is_overlay: false, origin };
        }
        let overlay_idx = self.overlay[index];
        if overlay_idx != 0 {
            return TileHit {
                grid_index: Some(index),
                tile: self.catalog.get(overlay_idx),
                is_overlay: true,
                origin,
            };
        }
        TileHit { grid_index: Some(index), tile: self.catalog.get(self.base[index]), is_overlay: false, origin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CollisionGrid {
        let mut g = CollisionGrid::new(4, 3, 32.0, TileCatalog::standard());
        g.set_base(g.index_of(1, 2).unwrap(), 1);
        g.set_overlay(g.index_of(2, 2).unwrap(), 2);
        g
    }

    #[test]
    fn lookup_is_row_major_with_top_row_zero() {
        let g = grid();
        let hit = g.tile_at(40.0, 70.0);
        assert_eq!(hit.grid_index, Some(9));
        assert_eq!(hit.tile.idx, 1);
        assert_eq!(hit.origin, (32.0, 64.0));
    }

    #[test]
    fn sides_are_wall_and_vertical_outside_is_air() {
        let g = grid();
        let left = g.tile_at(-1.0, 10.0);
        assert!(left.grid_index.is_none());
        assert!(left.tile.collides());
        assert_eq!(left.origin, (-32.0, 0.0));
        assert!(g.tile_at(128.0, 10.0).tile.collides());
        assert!(!g.tile_at(10.0, -5.0).tile.collides());
        assert!(!g.tile_at(10.0, 200.0).tile.collides());
    }

    #[test]
    fn overlay_reported_when_base_is_empty() {
        let g = grid();
        let hit = g.tile_at(70.0, 80.0);
        assert!(hit.is_overlay);
        assert_eq!(hit.tile.idx, 2);
    }

    #[test]
    fn overlay_takes_the_cell_over_a_solid_base() {
        let mut g = grid();
        let cell = g.index_of(1, 2).unwrap();
        g.set_overlay(cell, 12);
        let hit = g.tile_at(40.0, 70.0);
        assert!(hit.is_overlay);
        assert_eq!(hit.tile.idx, 12);
        assert!(hit.tile.code.liquid);

        // Destroying the cell clears both layers' collision.
        g.destroy(cell);
        let hit = g.tile_at(40.0, 70.0);
        assert!(!hit.is_overlay);
        assert_eq!(hit.tile.idx, 0);
    }

    #[test]
    fn set_base_ignores_out_of_range() {
        let mut g = grid();
        assert!(!g.set_base(99, 1));
        assert!(g.set_base(0, 1));
        assert_eq!(g.base_at(0), 1);
    }

    #[test]
    fn destroyed_cell_reads_as_air() {
        let mut g = grid();
        let cell = g.index_of(1, 2).unwrap();
        assert!(g.destroy(cell));
        assert!(!g.destroy(cell));
        let hit = g.tile_at(40.0, 70.0);
        assert_eq!(hit.grid_index, Some(cell));
        assert!(!hit.tile.collides());
        assert_eq!(g.base_at(cell), 1);
    }

    #[test]
    fn resize_keeps_cells_in_place() {
        let g = grid().resized(6, 2);
        assert_eq!(g.width(), 6);
        assert_eq!(g.base_at(g.index_of(1, 2).unwrap_or(99)), 0);
        let grown = grid().resized(6, 4);
        assert_eq!(grown.base_at(grown.index_of(1, 2).unwrap()), 1);
        assert_eq!(grown.overlay_at(grown.index_of(2, 2).unwrap()), 2);
        assert_eq!(grown.base_at(grown.index_of(5, 3).unwrap()), 0);
    }

    #[test]
    fn geometry_cell_origin() {
        let geo = grid().geometry();
        assert_eq!(geo.cells(), 12);
        assert_eq!(geo.cell_origin(6), (64, 32));
        assert_eq!(geo.index_at(64, 32), Some(6));
        assert_eq!(geo.index_at(95, 63), Some(6));
        assert_eq!(geo.index_at(-1, 0), None);
        assert_eq!(geo.index_at(0, 96), None);
    }
}
