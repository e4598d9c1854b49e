/// Tile catalog: the immutable table of tile types, keyed by index.
///
/// Loaded once (from TOML or the built-in table) and shared read-only by
/// the grid. Each entry may name a `glyph` used by the text level legend.
///
/// ## TOML format
///   ```toml
///   [[tile]]
///   idx = 6
///   glyph = "_"
///   code = "_"
///   partial_box = { height = -16 }
///   ```

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::tile::{CollisionCode, PartialBox, TileCategory, TileType};

/// Glyphs the level legend reserves for air and spawns.
pub const RESERVED_GLYPHS: [char; 4] = [' ', '.', 'P', 'S'];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("tile index {0} defined twice")]
    DuplicateIndex(u32),
    #[error("glyph {0:?} used by more than one tile")]
    DuplicateGlyph(char),
    #[error("glyph {0:?} is reserved by the level format")]
    ReservedGlyph(char),
    #[error("tile index 0 is reserved for air")]
    AirIndex,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tile: Vec<TileEntry>,
}

#[derive(Deserialize)]
struct TileEntry {
    idx: u32,
    #[serde(default)]
    glyph: Option<char>,
    #[serde(default = "default_solid")]
    solid: bool,
    #[serde(default)]
    code: String,
    #[serde(default)]
    partial_box: PartialBox,
    #[serde(default)]
    category: TileCategory,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    breakable: bool,
    #[serde(default)]
    climbable: bool,
    #[serde(default)]
    reveal_as: Option<u32>,
}

fn default_solid() -> bool {
    true
}

impl From<TileEntry> for TileType {
    fn from(e: TileEntry) -> Self {
        TileType {
            idx: e.idx,
            solid: e.solid,
            code: CollisionCode::parse(&e.code),
            partial_box: e.partial_box,
            category: e.category,
            hidden: e.hidden,
            breakable: e.breakable,
            climbable: e.climbable,
            reveal_as: e.reveal_as,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TileCatalog {
    types: HashMap<u32, TileType>,
    glyphs: HashMap<char, u32>,
    air: TileType,
    wall: TileType,
}

impl TileCatalog {
    fn empty() -> Self {
        let mut wall = TileType::air();
        wall.solid = true;
        wall.code = CollisionCode::parse("#");
        wall.category = TileCategory::Ground;
        TileCatalog { types: HashMap::new(), glyphs: HashMap::new(), air: TileType::air(), wall }
    }

    fn insert(&mut self, tile: TileType, glyph: Option<char>) -> Result<(), CatalogError> {
        if tile.idx == 0 {
            return Err(CatalogError::AirIndex);
        }
        if self.types.contains_key(&tile.idx) {
            return Err(CatalogError::DuplicateIndex(tile.idx));
        }
        if let Some(g) = glyph {
            if RESERVED_GLYPHS.contains(&g) {
                return Err(CatalogError::ReservedGlyph(g));
            }
            if self.glyphs.insert(g, tile.idx).is_some() {
                return Err(CatalogError::DuplicateGlyph(g));
            }
        }
        self.types.insert(tile.idx, tile);
        Ok(())
    }

    pub fn from_toml_str(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(src)?;
        let mut catalog = Self::empty();
        for entry in file.tile {
            let glyph = entry.glyph;
            catalog.insert(entry.into(), glyph)?;
        }
        Ok(catalog)
    }

    /// Built-in tile set used when no catalog file is supplied.
    ///
    /// ## Legend
    ///   '#' = ground            'I' = ice
    ///   '/' '\' = floor slopes  'p' 'q' = ceiling slopes (`/0`, `\0`)
    ///   '-' = one-way ledge     '_' = bottom half slab   '=' = top half slab
    ///   '?' = hidden block      'B' = breakable block    'H' = ladder
    ///   '~' = water             '%' = lava (lethal)
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for (tile, glyph) in standard_entries() {
            catalog.glyphs.insert(glyph, tile.idx);
            catalog.types.insert(tile.idx, tile);
        }
        catalog
    }
}

/// Rows of the built-in tile set, glyph included.
fn standard_entries() -> Vec<(TileType, char)> {
    let rows: [(u32, char, &str, PartialBox, TileCategory); 13] = [
            (1, '#', "#", PartialBox::default(), TileCategory::Ground),
            (2, '/', "/1", PartialBox::default(), TileCategory::Ground),
            (3, '\\', "\\1", PartialBox::default(), TileCategory::Ground),
            (4, 'p', "/0", PartialBox::default(), TileCategory::Ground),
            (5, 'q', "\\0", PartialBox::default(), TileCategory::Ground),
            (6, '-', "-", PartialBox::default(), TileCategory::Ground),
            (7, '_', "_", PartialBox { width: 0.0, height: -16.0 }, TileCategory::Ground),
            (8, '=', "=", PartialBox { width: 0.0, height: 16.0 }, TileCategory::Ground),
            (9, 'I', "#", PartialBox::default(), TileCategory::Ice),
            (10, '?', "#", PartialBox::default(), TileCategory::Ground),
            (11, 'B', "#", PartialBox::default(), TileCategory::Ground),
            (12, '~', "~", PartialBox::default(), TileCategory::Liquid),
            (281, '%', "~", PartialBox::default(), TileCategory::Liquid),
        ];
    let mut entries: Vec<(TileType, char)> = rows
        .into_iter()
        .map(|(idx, glyph, code, partial_box, category)| {
            let tile = TileType {
                idx,
                solid: true,
                code: CollisionCode::parse(code),
                partial_box,
                category,
                hidden: idx == 10,
                breakable: idx == 11,
                climbable: false,
                reveal_as: (idx == 10).then_some(1),
            };
            (tile, glyph)
        })
        .collect();
    entries.push((TileType { idx: 13, climbable: true, solid: false, ..TileType::air() }, 'H'));
    entries
}

impl TileCatalog {
    /// Tile type for an index. Index 0 and unknown indices are air.
    pub fn get(&self, idx: u32) -> &TileType {
        self.types.get(&idx).unwrap_or(&self.air)
    }

    /// The implicit solid wall beyond the left/right level edges.
    pub fn wall(&self) -> &TileType {
        &self.wall
    }

    pub fn index_for_glyph(&self, glyph: char) -> Option<u32> {
        self.glyphs.get(&glyph).copied()
    }

    pub fn glyph_for_index(&self, idx: u32) -> Option<char> {
        self.glyphs.iter().find(|(_, &i)| i == idx).map(|(&g, _)| g)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
