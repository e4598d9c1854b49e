/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.toml` files, sorted by filename)
///   2. Built-in embedded levels
///
/// A `tiles.toml` in the levels directory replaces the standard tile
/// catalog for every level loaded from there.
///
/// ## Level format (`.toml`):
///   ```toml
///   name = "Level Name"
///   rows = [
///     "..........",
///     "..P.....S.",
///     "####..####",
///   ]
///   overlay = [ ... ]        # optional, same shape and legend
///
///   [[platform]]
///   path = "24>27"           # grid indices joined by > < ^ v
///   speed = 2.0
///   delay = 0
///   mode = "ping_pong"       # after_stationary | after_forward | ping_pong
///   finish = "reverse"       # reverse | warp
///   requires_touch = false
///   frictionless = false
///   one_sided_mount = false
///   width = 64               # pixels, one tile if omitted
///   height = 16
///   ```
///
/// ## Legend:
///   Catalog glyphs place tiles (see `TileCatalog::standard`).
///   '.' or ' ' = air   'P' = player spawn   'S' = walker spawn
///   Short rows are padded with air.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PhysicsConfig;
use crate::domain::catalog::{CatalogError, TileCatalog};
use crate::domain::entity::{Actor, Vec2};
use crate::domain::grid::CollisionGrid;
use crate::domain::path::{PathError, PlatformPath};
use crate::domain::platform::{ActivationMode, FinishMode, PlatformTags};
use crate::sim::world::World;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not read level: {0}")]
    Io(#[from] std::io::Error),
    #[error("tile catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("level has no rows")]
    Empty,
    #[error("overlay has {found} rows, level has {expected}")]
    OverlayShape { expected: usize, found: usize },
    #[error("unknown glyph {glyph:?} at row {row}, column {col}")]
    UnknownGlyph { glyph: char, row: usize, col: usize },
    #[error("level needs exactly one player spawn, found {0}")]
    PlayerSpawn(usize),
    #[error("platform {index}: {source}")]
    Path {
        index: usize,
        #[source]
        source: PathError,
    },
}

// ── TOML schema ──

#[derive(Deserialize, Debug, Clone)]
pub struct LevelDef {
    #[serde(default = "default_name")]
    pub name: String,
    pub rows: Vec<String>,
    #[serde(default)]
    pub overlay: Vec<String>,
    #[serde(default, rename = "platform")]
    pub platforms: Vec<PlatformDef>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlatformDef {
    pub path: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub mode: ModeDef,
    #[serde(default)]
    pub finish: FinishDef,
    #[serde(default)]
    pub requires_touch: bool,
    #[serde(default)]
    pub frictionless: bool,
    #[serde(default)]
    pub one_sided_mount: bool,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    /// Linked blocks: touching one touches every platform in the group.
    #[serde(default)]
    pub group: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModeDef {
    AfterStationary,
    AfterForward,
    #[default]
    PingPong,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishDef {
    #[default]
    Reverse,
    Warp,
}

fn default_name() -> String {
    "Unnamed Level".into()
}

fn default_speed() -> f32 {
    1.0
}

impl From<ModeDef> for ActivationMode {
    fn from(m: ModeDef) -> Self {
        match m {
            ModeDef::AfterStationary => ActivationMode::AfterStationary,
            ModeDef::AfterForward => ActivationMode::AfterForward,
            ModeDef::PingPong => ActivationMode::PingPong,
        }
    }
}

impl From<FinishDef> for FinishMode {
    fn from(f: FinishDef) -> Self {
        match f {
            FinishDef::Reverse => FinishMode::Reverse,
            FinishDef::Warp => FinishMode::Warp,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn parse_level(text: &str) -> Result<LevelDef, LevelError> {
    Ok(toml::from_str(text)?)
}

/// Build a playable world from a decoded level.
pub fn build_world(def: &LevelDef, catalog: &TileCatalog, physics: &PhysicsConfig) -> Result<World, LevelError> {
    let height = def.rows.len();
    if height == 0 {
        return Err(LevelError::Empty);
    }
    if !def.overlay.is_empty() && def.overlay.len() != height {
        return Err(LevelError::OverlayShape { expected: height, found: def.overlay.len() });
    }
    let width = def.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0).max(1);
    let t = physics.tile_size;
    let mut grid = CollisionGrid::new(width, height, t, catalog.clone());

    let player_size = Vec2::new(t * 0.75, t);
    let walker_size = Vec2::new(t * 0.75, t * 0.75);
    let mut player_spawns = Vec::new();
    let mut walkers = Vec::new();

    for (row, line) in def.rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let cell = row * width + col;
            match ch {
                '.' | ' ' => {}
                'P' => player_spawns.push(spawn_point(col, row, t, player_size)),
                'S' => walkers.push(Actor::walker(spawn_point(col, row, t, walker_size), walker_size)),
                _ => {
                    let idx = catalog.index_for_glyph(ch).ok_or(LevelError::UnknownGlyph { glyph: ch, row, col })?;
                    grid.set_base(cell, idx);
                }
            }
        }
    }
    for (row, line) in def.overlay.iter().enumerate() {
        for (col, ch) in line.chars().enumerate().take(width) {
            if matches!(ch, '.' | ' ') {
                continue;
            }
            let idx = catalog.index_for_glyph(ch).ok_or(LevelError::UnknownGlyph { glyph: ch, row, col })?;
            grid.set_overlay(row * width + col, idx);
        }
    }

    let [spawn] = player_spawns[..] else {
        return Err(LevelError::PlayerSpawn(player_spawns.len()));
    };

    let mut world = World::new(&def.name, grid, Actor::player(spawn, player_size), physics.clone());
    world.walkers = walkers;

    let geo = world.geometry();
    for (index, p) in def.platforms.iter().enumerate() {
        let path = PlatformPath::parse(&p.path)
            .and_then(|path| path.validate(geo.width, geo.cells()).map(|_| path))
            .map_err(|source| LevelError::Path { index, source })?;
        let id = world.add_platform(path);
        if let Some(platform) = world.platforms.iter_mut().find(|pl| pl.id == id) {
            platform.speed = p.speed;
            platform.delay = p.delay;
            platform.mode = p.mode.into();
            platform.finish = p.finish.into();
            platform.requires_touch = p.requires_touch;
            platform.tags = PlatformTags { frictionless: p.frictionless, one_sided_mount: p.one_sided_mount };
            platform.size = (p.width.unwrap_or(geo.tile_size), p.height.unwrap_or(geo.tile_size));
            platform.group = p.group;
        }
    }

    info!(
        level = %def.name,
        width,
        height,
        walkers = world.walkers.len(),
        platforms = world.platforms.len(),
        "level built"
    );
    Ok(world)
}

/// Top-left of an actor standing on the floor of a cell, centred.
fn spawn_point(col: usize, row: usize, t: f32, size: Vec2) -> Vec2 {
    Vec2::new(col as f32 * t + (t - size.x) / 2.0, (row + 1) as f32 * t - size.y)
}

/// Levels and catalog for a run: the levels directory if it has any,
/// otherwise the embedded set with the standard catalog.
pub fn load_levels(dir: &Path) -> (Vec<LevelDef>, TileCatalog) {
    let catalog = load_catalog(dir);
    let mut levels = load_from_directory(dir);
    if levels.is_empty() {
        return (embedded_levels(), TileCatalog::standard());
    }
    levels.sort_by(|a, b| a.0.cmp(&b.0));
    (levels.into_iter().map(|(_, def)| def).collect(), catalog)
}

// ══════════════════════════════════════════════════════════════
// Directory loading
// ══════════════════════════════════════════════════════════════

fn load_catalog(dir: &Path) -> TileCatalog {
    let path = dir.join("tiles.toml");
    if !path.exists() {
        return TileCatalog::standard();
    }
    let loaded = std::fs::read_to_string(&path)
        .map_err(LevelError::from)
        .and_then(|text| TileCatalog::from_toml_str(&text).map_err(LevelError::from));
    match loaded {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(path = %path.display(), "{e}; using the standard tile catalog");
            TileCatalog::standard()
        }
    }
}

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return results,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |e| e != "toml") || path.file_name().map_or(false, |n| n == "tiles.toml") {
            continue;
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(LevelError::from)
            .and_then(|text| parse_level(&text));
        match parsed {
            Ok(def) => {
                let filename = path.file_name().unwrap_or_default().to_string_lossy().to_string();
                results.push((filename, def));
            }
            Err(e) => warn!(path = %path.display(), "skipping level: {e}"),
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: [&str; 2] = [
    include_str!("../../levels/01_ride_along.toml"),
    include_str!("../../levels/02_ice_cavern.toml"),
];

pub fn embedded_levels() -> Vec<LevelDef> {
    EMBEDDED
        .iter()
        .filter_map(|text| match parse_level(text) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!("embedded level rejected: {e}");
                None
            }
        })
        .collect()
}
