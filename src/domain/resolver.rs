/// Axis-separated collision resolver.
///
/// ## Order per call
///   1. Clamp the proposed velocity to `tile_size - 1` per axis.
///   2. Find the platform being ridden (feet within `ride_band` of its top)
///      and add its tick velocity to the motion.
///   3. X sweep: move, probe for a slope step-up, resolve walls, then push
///      out of platform sides (never the ridden one).
///   4. Y sweep: move, resolve tiles and platform tops/bottoms alternately
///      until nothing overlaps.
///   5. Scan the final position for liquid, ice and climbable tiles.
///
/// Each tile pass tests the six sample anchors in fixed priority (mid,
/// bottom, top) and snaps the actor's leading edge flush to the first
/// blocking face, repeating until clear. All passes in one call share a
/// single iteration budget; exhausting it reverts the actor to where it
/// started and flags the report (squashed if a platform was pushing).
/// The slope probe runs on its own short budget.

use tracing::debug;

use crate::config::PhysicsConfig;
use crate::domain::entity::{Actor, SamplePoint, Vec2};
use crate::domain::grid::CollisionGrid;
use crate::domain::platform::MovingPlatform;
use crate::domain::tile::{resolve_code, Axis, CodeOutcome, Contact, ContactQuery, SideEffect, SlopeHalf};

/// Read-only world view for one resolve call.
pub struct ResolveEnv<'a> {
    pub grid: &'a CollisionGrid,
    pub platforms: &'a [MovingPlatform],
    pub physics: &'a PhysicsConfig,
}

/// Everything the integrator and event layer need to know about one move.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionReport {
    /// Actual position change, carry included.
    pub delta: Vec2,
    /// Velocity after blocks and slope drag.
    pub velocity: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
    /// Stopped by a floor or platform top while moving down.
    pub landed: bool,
    pub grounded: bool,
    pub bumped_head: bool,
    /// Grid cell hit by the head, for breakable/hidden tiles.
    pub bumped_cell: Option<usize>,
    pub on_slope: bool,
    /// Platforms in contact after resolution, nearest-above first.
    pub platforms_touched: Vec<usize>,
    /// Platform carried this tick.
    pub riding: Option<usize>,
    /// Platform whose side stopped horizontal motion.
    pub platform_block: Option<usize>,
    pub swimming: bool,
    pub lethal: bool,
    pub on_ice: bool,
    pub can_climb: bool,
    pub fall_cap: Option<f32>,
    pub depenetration_failed: bool,
    pub squashed: bool,
}

/// Iteration budget ran out.
#[derive(Debug)]
struct Exhausted;

/// Tile snaps the slope probe may take before calling it a wall.
const PROBE_ITERATIONS: u32 = 8;

struct Budget {
    left: u32,
    platform_pushed: bool,
}

#[derive(Default)]
struct PassResult {
    moved: bool,
    blocked: bool,
    slope: bool,
    bumped_cell: Option<usize>,
    fall_cap: Option<f32>,
}

/// Which anchors a tile pass tests.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Samples {
    All,
    /// Downward Y sweeps: only the feet stop a fall.
    FeetWhenFalling,
}

// ══════════════════════════════════════════════════════════════
// Entry point
// ══════════════════════════════════════════════════════════════

pub fn resolve(actor: &mut Actor, proposed: Vec2, env: &ResolveEnv) -> CollisionReport {
    let max = env.physics.max_speed();
    let mut vel = Vec2::new(proposed.x.clamp(-max, max), proposed.y.clamp(-max, max));
    let start = actor.pos;
    let mut report = CollisionReport::default();
    let mut budget = Budget { left: env.physics.max_depenetration_iterations, platform_pushed: false };

    let candidates = nearby_platforms(actor, vel, env);
    let ride = ridden_platform(actor, vel, &candidates, env);
    let mut carry = Vec2::ZERO;
    if let Some(i) = ride {
        let p = &env.platforms[i];
        carry = p.velocity();
        if p.tags.frictionless {
            carry.x = 0.0;
        }
        report.riding = Some(p.id);
    }

    let swept = sweep_x(actor, &mut vel, carry.x, ride, &candidates, env, &mut report, &mut budget)
        .and_then(|_| sweep_y(actor, &mut vel, carry.y, start, &candidates, env, &mut report, &mut budget));

    if let Err(Exhausted) = swept {
        report.squashed = budget.platform_pushed;
        debug!(x = start.x, y = start.y, squashed = report.squashed, "depenetration budget exhausted; reverting");
        actor.pos = start;
        vel = Vec2::ZERO;
        report.depenetration_failed = true;
    }

    report.delta = actor.pos - start;
    report.velocity = vel;
    report.grounded = !report.depenetration_failed && (report.landed || ride.is_some());
    report.platforms_touched = touching_platforms(actor, &candidates, env);
    scan_environment(actor, env, &mut report);
    report
}

// ══════════════════════════════════════════════════════════════
// Platforms
// ══════════════════════════════════════════════════════════════

/// Platforms close enough to matter this tick, nearest-above first.
fn nearby_platforms(actor: &Actor, vel: Vec2, env: &ResolveEnv) -> Vec<usize> {
    let b = actor.bounds();
    let mut near: Vec<usize> = env
        .platforms
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            let pv = p.velocity();
            let reach = b.expanded(vel.x.abs() + pv.x.abs() + 1.0, vel.y.abs() + pv.y.abs() + 1.0);
            reach.overlaps(&p.bounds())
        })
        .map(|(i, _)| i)
        .collect();
    near.sort_by(|&a, &c| {
        let da = (env.platforms[a].bounds().top - b.bottom).abs();
        let dc = (env.platforms[c].bounds().top - b.bottom).abs();
        da.total_cmp(&dc)
    });
    near
}

fn ridden_platform(actor: &Actor, vel: Vec2, candidates: &[usize], env: &ResolveEnv) -> Option<usize> {
    if vel.y < 0.0 {
        return None;
    }
    let b = actor.bounds();
    candidates.iter().copied().find(|&i| {
        let p = &env.platforms[i];
        let pb = p.bounds();
        b.overlaps_x(&pb) && (b.bottom - pb.top).abs() <= env.physics.ride_band + p.velocity().y.abs()
    })
}

fn touching_platforms(actor: &Actor, candidates: &[usize], env: &ResolveEnv) -> Vec<usize> {
    let reach = actor.bounds().expanded(1.0, 1.0);
    candidates
        .iter()
        .map(|&i| &env.platforms[i])
        .filter(|p| reach.overlaps(&p.bounds()))
        .map(|p| p.id)
        .collect()
}

/// Push the actor out of one overlapping platform side. Returns the signed shift.
fn platform_pass_x(
    actor: &mut Actor,
    vel: &mut Vec2,
    ride: Option<usize>,
    candidates: &[usize],
    env: &ResolveEnv,
    report: &mut CollisionReport,
) -> f32 {
    let b = actor.bounds();
    for &i in candidates {
        let p = &env.platforms[i];
        if Some(i) == ride || p.tags.one_sided_mount {
            continue;
        }
        let pb = p.bounds();
        if !b.overlaps(&pb) {
            continue;
        }
        // Shallow vertical overlaps belong to the Y sweep.
        let depth_x = b.right.min(pb.right) - b.left.max(pb.left);
        let depth_y = b.bottom.min(pb.bottom) - b.top.max(pb.top);
        if depth_y <= depth_x {
            continue;
        }
        let before = actor.pos.x;
        if b.left + b.right < pb.left + pb.right {
            actor.pos.x = pb.left - actor.size.x;
            if vel.x > 0.0 {
                vel.x = 0.0;
            }
        } else {
            actor.pos.x = pb.right;
            if vel.x < 0.0 {
                vel.x = 0.0;
            }
        }
        report.blocked_x = true;
        report.platform_block = Some(p.id);
        return actor.pos.x - before;
    }
    0.0
}

/// Land on or bump under one overlapping platform. Returns the signed shift.
fn platform_pass_y(
    actor: &mut Actor,
    vel: &mut Vec2,
    start: Vec2,
    candidates: &[usize],
    env: &ResolveEnv,
    report: &mut CollisionReport,
) -> f32 {
    let b = actor.bounds();
    for &i in candidates {
        let p = &env.platforms[i];
        let pb = p.bounds();
        if !b.overlaps(&pb) {
            continue;
        }
        let before = actor.pos.y;
        if b.mid_y() < (pb.top + pb.bottom) / 2.0 {
            if p.tags.one_sided_mount {
                let prev_bottom = start.y + actor.size.y;
                if prev_bottom > pb.top + p.velocity().y.abs() + env.physics.ride_band {
                    continue;
                }
            }
            actor.pos.y = pb.top - actor.size.y;
            if vel.y > 0.0 {
                vel.y = 0.0;
            }
            report.landed = true;
        } else {
            if p.tags.one_sided_mount {
                continue;
            }
            actor.pos.y = pb.bottom;
            if vel.y < 0.0 {
                vel.y = 0.0;
                report.bumped_head = true;
            }
        }
        report.blocked_y = true;
        return actor.pos.y - before;
    }
    0.0
}

// ══════════════════════════════════════════════════════════════
// Sweeps
// ══════════════════════════════════════════════════════════════

#[allow(clippy::too_many_arguments)]
fn sweep_x(
    actor: &mut Actor,
    vel: &mut Vec2,
    carry_x: f32,
    ride: Option<usize>,
    candidates: &[usize],
    env: &ResolveEnv,
    report: &mut CollisionReport,
    budget: &mut Budget,
) -> Result<(), Exhausted> {
    // Carry included: still at most one tile boundary per tick.
    let max = env.physics.max_speed();
    let dx = (vel.x + carry_x).clamp(-max, max);
    actor.pos.x += dx;

    if dx != 0.0 {
        let y0 = actor.pos.y;
        let probe_speed = dx.abs().max(1.0);
        let mut probe_budget = PROBE_ITERATIONS;
        let lift = match tile_pass(actor, Axis::Y, probe_speed, Samples::All, env, &mut probe_budget) {
            Ok(_) => y0 - actor.pos.y,
            Err(Exhausted) => f32::INFINITY,
        };

        if lift > dx.abs() + env.physics.step_tolerance {
            actor.pos.y = y0;
            let pass = tile_pass(actor, Axis::X, dx, Samples::All, env, &mut budget.left)?;
            if pass.blocked {
                report.blocked_x = true;
                vel.x = 0.0;
            }
        } else if lift > 0.0 {
            vel.x *= env.physics.slope_drag;
            report.on_slope = true;
        }
    }

    loop {
        let shift = platform_pass_x(actor, vel, ride, candidates, env, report);
        if shift == 0.0 {
            return Ok(());
        }
        budget.platform_pushed = true;
        let pass = tile_pass(actor, Axis::X, shift, Samples::All, env, &mut budget.left)?;
        if !pass.moved {
            return Ok(());
        }
        spend(&mut budget.left)?;
    }
}

#[allow(clippy::too_many_arguments)]
fn sweep_y(
    actor: &mut Actor,
    vel: &mut Vec2,
    carry_y: f32,
    start: Vec2,
    candidates: &[usize],
    env: &ResolveEnv,
    report: &mut CollisionReport,
    budget: &mut Budget,
) -> Result<(), Exhausted> {
    let max = env.physics.max_speed();
    let dy = (vel.y + carry_y).clamp(-max, max);
    actor.pos.y += dy;

    let mut motion = dy;
    loop {
        let pass = tile_pass(actor, Axis::Y, motion, Samples::FeetWhenFalling, env, &mut budget.left)?;
        if pass.blocked || pass.slope {
            report.blocked_y = true;
            if motion > 0.0 {
                report.landed = true;
            } else if motion < 0.0 {
                report.bumped_head = true;
                report.bumped_cell = report.bumped_cell.or(pass.bumped_cell);
            }
            vel.y = 0.0;
        }
        if let Some(cap) = pass.fall_cap {
            report.fall_cap = Some(report.fall_cap.map_or(cap, |c: f32| c.min(cap)));
        }

        let shift = platform_pass_y(actor, vel, start, candidates, env, report);
        if shift == 0.0 {
            return Ok(());
        }
        budget.platform_pushed = true;
        motion = shift;
        spend(&mut budget.left)?;
    }
}

fn spend(budget: &mut u32) -> Result<(), Exhausted> {
    *budget = budget.checked_sub(1).ok_or(Exhausted)?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Tile pass
// ══════════════════════════════════════════════════════════════

struct Blocker {
    outcome: CodeOutcome,
    origin: (f32, f32),
    grid_index: Option<usize>,
}

/// Resolve one sample anchor against the tile under it.
fn query_sample(actor: &Actor, sample: SamplePoint, axis: Axis, velocity: f32, env: &ResolveEnv) -> Blocker {
    let (wx, wy) = actor.bounds().sample(sample);
    let hit = env.grid.tile_at(wx, wy);
    let tile = hit.tile;
    let clear = Blocker { outcome: CodeOutcome::CLEAR, origin: hit.origin, grid_index: hit.grid_index };

    if !tile.collides() {
        return clear;
    }
    // Hidden blocks only stop a head moving up.
    if tile.hidden && !(axis == Axis::Y && velocity < 0.0) {
        return clear;
    }

    let q = ContactQuery {
        axis,
        velocity,
        offset: (wx - hit.origin.0, wy - hit.origin.1),
        tile_size: env.grid.tile_size(),
        feet: sample.is_feet(),
        climbing: actor.climbing,
        overlay: hit.is_overlay,
        lethal_liquid: env.physics.is_lethal_liquid(tile.idx),
    };
    Blocker { outcome: resolve_code(&tile.code, tile.partial_box, &q), ..clear }
}

fn tile_pass(
    actor: &mut Actor,
    axis: Axis,
    velocity: f32,
    samples: Samples,
    env: &ResolveEnv,
    budget: &mut u32,
) -> Result<PassResult, Exhausted> {
    let mut result = PassResult::default();
    if velocity == 0.0 {
        return Ok(result);
    }
    let feet_only = samples == Samples::FeetWhenFalling && axis == Axis::Y && velocity > 0.0;

    loop {
        let mut blocker = None;
        for s in SamplePoint::PRIORITY {
            if feet_only && !s.is_feet() {
                continue;
            }
            let b = query_sample(actor, s, axis, velocity, env);
            if let Some(cap) = b.outcome.fall_cap {
                result.fall_cap = Some(result.fall_cap.map_or(cap, |c: f32| c.min(cap)));
            }
            if b.outcome.blocks() {
                blocker = Some(b);
                break;
            }
        }
        let Some(b) = blocker else {
            return Ok(result);
        };
        spend(budget)?;

        match b.outcome.contact {
            Contact::Slope { .. } => result.slope = true,
            _ => result.blocked = true,
        }
        if axis == Axis::Y && velocity < 0.0 {
            result.bumped_cell = result.bumped_cell.or(b.grid_index);
        }

        let before = actor.pos;
        snap(actor, axis, velocity, b.outcome.contact, b.origin);
        if actor.pos == before {
            return Ok(result);
        }
        result.moved = true;
    }
}

/// Put the actor's leading edge on the blocking face.
fn snap(actor: &mut Actor, axis: Axis, velocity: f32, contact: Contact, origin: (f32, f32)) {
    match contact {
        Contact::Clear => {}
        Contact::Edge(at) => match (axis, velocity > 0.0) {
            (Axis::X, true) => actor.pos.x = origin.0 + at - actor.size.x,
            (Axis::X, false) => actor.pos.x = origin.0 + at,
            (Axis::Y, true) => actor.pos.y = origin.1 + at - actor.size.y,
            (Axis::Y, false) => actor.pos.y = origin.1 + at,
        },
        Contact::Slope { surface, half: SlopeHalf::Lower } => actor.pos.y = origin.1 + surface - actor.size.y,
        Contact::Slope { surface, half: SlopeHalf::Upper } => actor.pos.y = origin.1 + surface,
    }
}

// ══════════════════════════════════════════════════════════════
// Environment scan
// ══════════════════════════════════════════════════════════════

fn scan_environment(actor: &Actor, env: &ResolveEnv, report: &mut CollisionReport) {
    let b = actor.bounds();
    for s in SamplePoint::PRIORITY {
        let probe = query_sample(actor, s, Axis::Y, 1.0, env);
        match probe.outcome.side_effect {
            Some(SideEffect::Lethal) => report.lethal = true,
            Some(SideEffect::Swim) if actor.caps.swim => report.swimming = true,
            _ => {}
        }
        let (wx, wy) = b.sample(s);
        if actor.caps.climb && env.grid.tile_at(wx, wy).tile.climbable {
            report.can_climb = true;
        }
        if s.is_feet() {
            let under = env.grid.tile_at(wx, b.bottom + 1.0).tile;
            if under.is_ice() && under.collides() {
                report.on_ice = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::TileCatalog;
    use crate::domain::path::PlatformPath;
    use crate::domain::platform::{ActivationMode, PlatformTags};

    const T: f32 = 32.0;

    /// ASCII map using the standard catalog legend; anything else is air.
    fn grid_from(rows: &[&str]) -> CollisionGrid {
        let catalog = TileCatalog::standard();
        let width = rows[0].chars().count();
        let mut g = CollisionGrid::new(width, rows.len(), T, catalog.clone());
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if let (Some(idx), Some(cell)) = (catalog.index_for_glyph(ch), g.index_of(col, row)) {
                    g.set_base(cell, idx);
                }
            }
        }
        g
    }

    fn actor_at(x: f32, y: f32, w: f32, h: f32) -> Actor {
        Actor::player(Vec2::new(x, y), Vec2::new(w, h))
    }

    fn run(actor: &mut Actor, vel: Vec2, grid: &CollisionGrid, platforms: &[MovingPlatform]) -> CollisionReport {
        let physics = PhysicsConfig::default();
        let env = ResolveEnv { grid, platforms, physics: &physics };
        resolve(actor, vel, &env)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.05
    }

    // ── floors and walls ──

    #[test]
    fn lands_flush_on_flat_floor() {
        let g = grid_from(&["....", "....", "####"]);
        let mut a = actor_at(40.0, 20.0, 24.0, 32.0);
        let r = run(&mut a, Vec2::new(0.0, 20.0), &g, &[]);
        assert_eq!(a.pos.y + a.size.y, 64.0);
        assert!(r.landed && r.grounded && r.blocked_y);
        assert_eq!(r.velocity.y, 0.0);
        assert_eq!(r.delta, Vec2::new(0.0, 12.0));
    }

    #[test]
    fn wall_stops_horizontal_motion_flush() {
        let g = grid_from(&["....", "..#.", "####"]);
        let mut a = actor_at(40.0, 40.0, 24.0, 24.0);
        let r = run(&mut a, Vec2::new(3.0, 0.0), &g, &[]);
        assert!(r.blocked_x);
        assert_eq!(a.pos.x + a.size.x, 64.0);
        assert_eq!(a.pos.y, 40.0);
        assert_eq!(r.velocity.x, 0.0);
    }

    #[test]
    fn level_sides_are_walls() {
        let g = grid_from(&["....", "####"]);
        let mut a = actor_at(2.0, 8.0, 16.0, 24.0);
        let r = run(&mut a, Vec2::new(-5.0, 0.0), &g, &[]);
        assert!(r.blocked_x);
        assert_eq!(a.pos.x, 0.0);
    }

    #[test]
    fn velocity_clamped_below_tile_size() {
        let g = grid_from(&["....", "....", "....", "...."]);
        let mut a = actor_at(0.0, 0.0, 8.0, 8.0);
        let r = run(&mut a, Vec2::new(100.0, -100.0), &g, &[]);
        assert_eq!(r.delta, Vec2::new(T - 1.0, -(T - 1.0)));
    }

    #[test]
    fn head_bump_reports_cell() {
        let g = grid_from(&[".B..", "....", "####"]);
        let mut a = actor_at(36.0, 40.0, 16.0, 24.0);
        let r = run(&mut a, Vec2::new(0.0, -12.0), &g, &[]);
        assert!(r.bumped_head);
        assert_eq!(r.bumped_cell, Some(1));
        assert_eq!(a.pos.y, 32.0);
        assert_eq!(r.velocity.y, 0.0);
    }

    #[test]
    fn hidden_block_only_stops_upward_heads() {
        let g = grid_from(&["....", ".?..", "...."]);
        // Falling through from above.
        let mut a = actor_at(36.0, 0.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 20.0), &g, &[]);
        assert!(!r.blocked_y);
        // Jumping into it from below.
        let mut a = actor_at(36.0, 66.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, -6.0), &g, &[]);
        assert!(r.bumped_head);
        assert_eq!(r.bumped_cell, Some(5));
        assert_eq!(a.pos.y, 64.0);
    }

    // ── slopes ──

    #[test]
    fn settles_on_rising_slope_at_intra_tile_offsets() {
        let g = grid_from(&["....", "./..", "####"]);
        let tile_top = 32.0;
        for ox in [0.0, 16.0, 31.0] {
            let w = 8.0;
            let h = 16.0;
            // Right-bottom anchor lands at tile-local x = ox.
            let x = T + ox + crate::domain::entity::SAMPLE_EPS - w;
            let expected_bottom = tile_top + (T - ox);
            let mut a = actor_at(x, expected_bottom - 4.0 - h, w, h);
            let r = run(&mut a, Vec2::new(0.0, 6.0), &g, &[]);
            assert!(close(a.pos.y + h, expected_bottom), "ox {ox}: bottom {}", a.pos.y + h);
            assert!(r.landed);
        }
    }

    #[test]
    fn walking_up_slope_lifts_without_blocking() {
        let g = grid_from(&["....", "./..", "####"]);
        // Right edge just short of the slope tile, standing on the floor.
        let mut a = actor_at(31.5 - 8.0 + 0.01, 48.0, 8.0, 16.0);
        let r = run(&mut a, Vec2::new(3.0, 0.9), &g, &[]);
        assert!(!r.blocked_x);
        assert!(r.on_slope);
        assert!(close(r.velocity.x, 3.0 * 0.8));
        // Right anchor now 2.5 into the tile: surface at 32 - 2.5.
        assert!(close(a.pos.y + 16.0, 32.0 + 29.5));
        assert!(r.landed);
    }

    #[test]
    fn tall_slope_face_is_a_wall() {
        let g = grid_from(&["....", "..\\.", "####"]);
        // `\1` has its full-height face on the left.
        let mut a = actor_at(40.0, 40.0, 16.0, 24.0);
        let r = run(&mut a, Vec2::new(10.0, 0.0), &g, &[]);
        assert!(r.blocked_x);
        assert_eq!(a.pos.x + a.size.x, 64.0);
    }

    // ── one-way ──

    #[test]
    fn one_way_lets_jumps_through() {
        let g = grid_from(&["....", ".-..", "...."]);
        let mut a = actor_at(36.0, 66.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, -20.0), &g, &[]);
        assert!(!r.blocked_y);
        assert_eq!(a.pos.y, 46.0);
    }

    #[test]
    fn one_way_catches_landing_from_above() {
        let g = grid_from(&["....", ".-..", "...."]);
        let mut a = actor_at(36.0, 15.5, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 1.0), &g, &[]);
        assert!(r.landed);
        assert_eq!(a.pos.y + 16.0, 32.0);
    }

    #[test]
    fn one_way_ignores_actor_already_below_its_top() {
        let g = grid_from(&["....", ".-..", "...."]);
        let mut a = actor_at(36.0, 24.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 1.0), &g, &[]);
        assert!(!r.blocked_y);
        assert_eq!(a.pos.y, 25.0);
    }

    // ── partial boxes ──

    #[test]
    fn lands_on_bottom_half_slab() {
        let g = grid_from(&["....", "._..", "...."]);
        let mut a = actor_at(36.0, 26.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 8.0), &g, &[]);
        assert!(r.landed);
        assert_eq!(a.pos.y + 16.0, 48.0);
    }

    #[test]
    fn fast_fall_over_slab_reports_cap() {
        let g = grid_from(&["....", "._..", "...."]);
        let mut a = actor_at(36.0, 0.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 20.0), &g, &[]);
        assert!(!r.blocked_y);
        // Feet at 35.99: 12.01 above the slab top.
        assert!(close(r.fall_cap.unwrap_or(0.0), 12.01));
    }

    // ── environment ──

    #[test]
    fn liquid_sets_swimming_and_lava_is_lethal() {
        let g = grid_from(&["....", ".~%.", "####"]);
        let mut a = actor_at(36.0, 40.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 0.0), &g, &[]);
        assert!(r.swimming);
        assert!(!r.lethal);
        let mut a = actor_at(68.0, 40.0, 16.0, 16.0);
        assert!(run(&mut a, Vec2::ZERO, &g, &[]).lethal);
    }

    #[test]
    fn walkers_do_not_swim() {
        let g = grid_from(&["....", ".~..", "####"]);
        let mut a = Actor::walker(Vec2::new(36.0, 40.0), Vec2::new(16.0, 16.0));
        assert!(!run(&mut a, Vec2::ZERO, &g, &[]).swimming);
    }

    #[test]
    fn ice_underfoot_and_ladders_detected() {
        let g = grid_from(&["....", ".H..", "IIII"]);
        let mut a = actor_at(36.0, 48.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 0.9), &g, &[]);
        assert!(r.on_ice);
        assert!(r.can_climb);
    }

    // ── platforms ──

    fn geo(g: &CollisionGrid) -> crate::domain::grid::GridGeometry {
        g.geometry()
    }

    #[test]
    fn rider_moves_exactly_with_platform() {
        let g = grid_from(&["..........", "..........", "..........", ".........."]);
        let mut p = MovingPlatform::new(0, PlatformPath::parse("25>27").unwrap(), &geo(&g));
        p.speed = 3.0;
        p.mode = ActivationMode::PingPong;
        p.step(&geo(&g));
        assert_eq!(p.velocity(), Vec2::new(3.0, 0.0));

        let mut a = actor_at(165.0, 48.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 0.9), &g, std::slice::from_ref(&p));
        assert_eq!(r.delta, Vec2::new(3.0, 0.0));
        assert_eq!(r.riding, Some(0));
        assert!(r.grounded);
        assert_eq!(r.velocity.y, 0.0);
        assert_eq!(r.platforms_touched, vec![0]);
    }

    #[test]
    fn frictionless_platform_does_not_carry_sideways() {
        let g = grid_from(&["..........", "..........", "..........", ".........."]);
        let mut p = MovingPlatform::new(0, PlatformPath::parse("25>27").unwrap(), &geo(&g));
        p.speed = 3.0;
        p.tags = PlatformTags { frictionless: true, one_sided_mount: false };
        p.step(&geo(&g));

        let mut a = actor_at(165.0, 48.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 0.9), &g, std::slice::from_ref(&p));
        assert_eq!(r.delta.x, 0.0);
        assert!(r.grounded);
    }

    #[test]
    fn rider_follows_rising_platform() {
        let g = grid_from(&["..........", "..........", "..........", ".........."]);
        let mut p = MovingPlatform::new(0, PlatformPath::parse("25^15").unwrap(), &geo(&g));
        p.speed = 2.0;
        p.step(&geo(&g));
        assert_eq!(p.velocity(), Vec2::new(0.0, -2.0));

        let mut a = actor_at(165.0, 48.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 0.9), &g, std::slice::from_ref(&p));
        assert_eq!(a.pos.y + 16.0, 62.0);
        assert!(r.landed);
    }

    #[test]
    fn platform_side_blocks_walker() {
        let g = grid_from(&["..........", "..........", "..........", ".........."]);
        let p = MovingPlatform::new(7, PlatformPath::single(22), &geo(&g));
        let mut a = Actor::walker(Vec2::new(44.0, 70.0), Vec2::new(16.0, 16.0));
        let r = run(&mut a, Vec2::new(6.0, 0.0), &g, std::slice::from_ref(&p));
        assert!(r.blocked_x);
        assert_eq!(r.platform_block, Some(7));
        assert_eq!(a.pos.x, 48.0);
    }

    #[test]
    fn one_sided_platform_passable_from_below() {
        let g = grid_from(&["..........", "..........", "..........", ".........."]);
        let mut p = MovingPlatform::new(0, PlatformPath::single(12), &geo(&g));
        p.tags.one_sided_mount = true;
        let mut a = actor_at(68.0, 66.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, -10.0), &g, std::slice::from_ref(&p));
        assert!(!r.blocked_y);
        assert_eq!(a.pos.y, 56.0);

        // Landing from above still works.
        let mut a = actor_at(68.0, 14.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(0.0, 4.0), &g, std::slice::from_ref(&p));
        assert!(r.landed);
        assert_eq!(a.pos.y + 16.0, 32.0);
    }

    #[test]
    fn fast_platform_cannot_carry_rider_through_a_wall() {
        let g = grid_from(&["...#......", "...#......", "..........", ".........."]);
        let mut p = MovingPlatform::new(0, PlatformPath::parse("21>28").unwrap(), &geo(&g));
        p.speed = 30.0;
        p.step(&geo(&g));
        assert_eq!(p.velocity(), Vec2::new(30.0, 0.0));

        let mut a = actor_at(60.0, 48.0, 16.0, 16.0);
        let r = run(&mut a, Vec2::new(20.0, 0.9), &g, std::slice::from_ref(&p));
        assert!(r.delta.x <= T - 1.0);
        assert!(r.blocked_x);
        assert!(a.pos.x + 16.0 <= 96.05);
    }

    #[test]
    fn crushed_between_platform_and_floor_is_squashed() {
        let g = grid_from(&["....", "....", "####"]);
        let mut p = MovingPlatform::new(0, PlatformPath::parse("1v5").unwrap(), &geo(&g));
        p.speed = 12.0;
        p.step(&geo(&g));
        assert_eq!(p.position(), (32, 12));

        let mut a = actor_at(40.0, 40.0, 16.0, 24.0);
        let r = run(&mut a, Vec2::new(0.0, 0.9), &g, std::slice::from_ref(&p));
        assert!(r.depenetration_failed);
        assert!(r.squashed);
        assert_eq!(a.pos, Vec2::new(40.0, 40.0));
        assert_eq!(r.delta, Vec2::ZERO);
    }
}
