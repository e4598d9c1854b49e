/// World: one running level instance.
///
/// ## Grid layers
///
///   - `initial_grid`: the level as loaded. Never mutated after load.
///   - `grid`: the effective terrain (loaded level + broken/revealed tiles
///     + editor changes).
///
/// `restart` copies the initial grid back and respawns every actor.
///
/// ## Writers
///
/// Grid and path edits (`set_cell`, `destroy_cell`, `resize`,
/// `set_platform_path`) happen between ticks. Each edit revalidates
/// every platform path; platforms whose path broke are paused and the
/// warning is queued for the next `step` to report.

use crate::config::PhysicsConfig;
use crate::domain::entity::Actor;
use crate::domain::grid::{CollisionGrid, GridGeometry};
use crate::domain::path::{PathError, PlatformPath};
use crate::domain::platform::MovingPlatform;
use crate::domain::resolver::ResolveEnv;

pub struct World {
    pub name: String,

    // ── Terrain ──
    /// Level as loaded. Restored by `restart`.
    initial_grid: CollisionGrid,
    pub grid: CollisionGrid,

    // ── Entities ──
    pub player: Actor,
    pub walkers: Vec<Actor>,
    pub platforms: Vec<MovingPlatform>,

    pub physics: PhysicsConfig,
    pub tick: u64,

    // ── Editor ──
    editor_mode: bool,
    /// Path problems found by edits, not yet reported.
    path_warnings: Vec<(usize, PathError)>,
}

// ── Construction ──

impl World {
    pub fn new(name: &str, grid: CollisionGrid, player: Actor, physics: PhysicsConfig) -> Self {
        World {
            name: name.to_string(),
            initial_grid: grid.clone(),
            grid,
            player,
            walkers: Vec::new(),
            platforms: Vec::new(),
            physics,
            tick: 0,
            editor_mode: false,
            path_warnings: Vec::new(),
        }
    }

    /// Add a platform on `path`, returning its id. Invalid paths start paused.
    pub fn add_platform(&mut self, path: PlatformPath) -> usize {
        let id = self.platforms.len();
        let geo = self.geometry();
        let mut platform = MovingPlatform::new(id, path, &geo);
        if let Some(err) = platform.revalidate(&geo) {
            self.path_warnings.push((id, err));
        }
        self.platforms.push(platform);
        id
    }

    /// Back to the loaded level: terrain, actors and platforms.
    pub fn restart(&mut self) {
        self.grid = self.initial_grid.clone();
        self.player.respawn();
        for w in &mut self.walkers {
            w.respawn();
        }
        let geo = self.geometry();
        for p in &mut self.platforms {
            p.reset(&geo);
        }
        self.tick = 0;
    }
}

// ── Queries ──

impl World {
    #[inline]
    pub fn geometry(&self) -> GridGeometry {
        self.grid.geometry()
    }

    pub fn is_editor_mode(&self) -> bool {
        self.editor_mode
    }

    pub fn platform(&self, id: usize) -> Option<&MovingPlatform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    /// Borrow the read-only view the resolver needs.
    pub fn env(&self) -> ResolveEnv<'_> {
        ResolveEnv { grid: &self.grid, platforms: &self.platforms, physics: &self.physics }
    }

    /// Drain path warnings queued by edits.
    pub fn take_path_warnings(&mut self) -> Vec<(usize, PathError)> {
        std::mem::take(&mut self.path_warnings)
    }
}

// ── Edits (between ticks only) ──

impl World {
    pub fn set_editor_mode(&mut self, on: bool) {
        self.editor_mode = on;
    }

    /// Place a base tile. Returns false for an out-of-range cell.
    pub fn set_cell(&mut self, index: usize, tile: u32) -> bool {
        let changed = self.grid.set_base(index, tile);
        if changed {
            self.revalidate_paths();
        }
        changed
    }

    pub fn set_overlay_cell(&mut self, index: usize, tile: u32) -> bool {
        let changed = self.grid.set_overlay(index, tile);
        if changed {
            self.revalidate_paths();
        }
        changed
    }

    /// Destroy a cell so it reads as air. Returns false if nothing changed.
    pub fn destroy_cell(&mut self, index: usize) -> bool {
        let changed = self.grid.destroy(index);
        if changed {
            self.revalidate_paths();
        }
        changed
    }

    /// Reshape the level. Paths that no longer fit are paused.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.grid = self.grid.resized(width, height);
        self.revalidate_paths();
    }

    /// Give a platform a new path, restarting it from the first node.
    pub fn set_platform_path(&mut self, id: usize, path: PlatformPath) -> Option<PathError> {
        let geo = self.geometry();
        let platform = self.platforms.iter_mut().find(|p| p.id == id)?;
        let err = platform.set_path(path, &geo);
        if let Some(e) = &err {
            self.path_warnings.push((id, e.clone()));
        }
        err
    }

    fn revalidate_paths(&mut self) {
        let geo = self.geometry();
        for p in &mut self.platforms {
            if let Some(err) = p.revalidate(&geo) {
                self.path_warnings.push((p.id, err));
            }
        }
    }
}
