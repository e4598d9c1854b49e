/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Report path warnings queued by edits
///   2. (editor mode stops here)
///   3. Platforms: age touches, then step every automaton
///   4. Walkers: integrate -> resolve -> apply
///   5. Player: integrate -> resolve -> apply
///   6. Player / walker contact (stomp or hit)
///   7. Touch callbacks for every platform contacted this tick
///   8. Head-bump requests: break or reveal tiles
///
/// Platforms move strictly before any actor resolves, so every actor sees
/// this tick's platform positions. Grid writes happen only in step 8.

use tracing::debug;

use crate::domain::entity::{Actor, FrameInput};
use crate::domain::integrator;
use crate::domain::resolver::{CollisionReport, ResolveEnv};
use super::event::{ActorRef, GameEvent};
use super::world::World;

/// What a tick did to one actor, beyond its report.
#[derive(Default)]
struct Outcome {
    died: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut World, input: FrameInput) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();

    for (platform, error) in world.take_path_warnings() {
        events.push(GameEvent::PathWarning { platform, error });
    }
    if world.is_editor_mode() {
        return events;
    }
    world.tick += 1;

    resolve_platforms(world);
    let mut touched = Vec::new();
    resolve_walkers(world, &mut events, &mut touched);
    let bumps = resolve_player(world, input, &mut events, &mut touched);
    record_touches(world, &touched);
    resolve_bumps(world, &bumps, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Platforms
// ══════════════════════════════════════════════════════════════

fn resolve_platforms(world: &mut World) {
    let geo = world.geometry();
    let grace = world.physics.touch_grace_ticks;
    for p in &mut world.platforms {
        p.age_touch(grace);
        p.step(&geo);
    }
}

/// Touch every contacted platform and every platform grouped with one.
fn record_touches(world: &mut World, touched: &[usize]) {
    if touched.is_empty() {
        return;
    }
    let groups: Vec<u32> = world
        .platforms
        .iter()
        .filter(|p| touched.contains(&p.id))
        .filter_map(|p| p.group)
        .collect();
    for p in &mut world.platforms {
        if touched.contains(&p.id) || p.group.is_some_and(|g| groups.contains(&g)) {
            p.record_touch();
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Actors
// ══════════════════════════════════════════════════════════════

/// Shared per-actor bookkeeping: events for landing, liquid, hazards.
fn advance_actor(
    actor: &mut Actor,
    who: ActorRef,
    input: FrameInput,
    env: &ResolveEnv,
    events: &mut Vec<GameEvent>,
) -> (CollisionReport, Outcome) {
    let was_grounded = actor.grounded;
    let was_swimming = actor.swimming;
    let report = integrator::advance(actor, input, env);
    let mut outcome = Outcome::default();

    if report.landed && !was_grounded {
        events.push(GameEvent::Landed { actor: who });
    }
    if report.swimming && !was_swimming {
        events.push(GameEvent::EnteredLiquid { actor: who });
    }
    if report.squashed {
        debug!(?who, "squashed");
        events.push(GameEvent::Squashed { actor: who });
        outcome.died = true;
    }
    if report.lethal {
        events.push(GameEvent::Lethal { actor: who });
        outcome.died = true;
    }
    let (_, level_height) = env.grid.pixel_size();
    if actor.pos.y > level_height {
        events.push(GameEvent::FellOut { actor: who });
        outcome.died = true;
    }
    (report, outcome)
}

fn resolve_walkers(world: &mut World, events: &mut Vec<GameEvent>, touched: &mut Vec<usize>) {
    let World { grid, platforms, physics, walkers, .. } = world;
    let env = ResolveEnv { grid: &*grid, platforms: platforms.as_slice(), physics: &*physics };
    for (i, walker) in walkers.iter_mut().enumerate() {
        if !walker.alive {
            continue;
        }
        let (report, outcome) = advance_actor(walker, ActorRef::Walker(i), FrameInput::default(), &env, events);
        touched.extend(&report.platforms_touched);
        if outcome.died {
            walker.alive = false;
        }
    }
}

/// Returns the grid cells the player's head bumped.
fn resolve_player(
    world: &mut World,
    input: FrameInput,
    events: &mut Vec<GameEvent>,
    touched: &mut Vec<usize>,
) -> Vec<usize> {
    let World { grid, platforms, physics, player, walkers, .. } = world;
    let env = ResolveEnv { grid: &*grid, platforms: platforms.as_slice(), physics: &*physics };

    let falling_before = player.falling;
    let (report, outcome) = advance_actor(player, ActorRef::Player, input, &env, events);
    touched.extend(&report.platforms_touched);
    if outcome.died {
        player.respawn();
        return Vec::new();
    }

    let mut bumps = Vec::new();
    if let Some(cell) = report.bumped_cell {
        events.push(GameEvent::Bumped { actor: ActorRef::Player, cell });
        bumps.push(cell);
    }

    // Walkers are not solid: contact is judged by overlap after both moved.
    let stomping = report.delta.y > 1.0 && falling_before >= physics.coyote_ticks;
    let reach = player.bounds();
    for (i, walker) in walkers.iter_mut().enumerate() {
        if !walker.alive || !reach.overlaps(&walker.bounds()) {
            continue;
        }
        if stomping {
            walker.alive = false;
            player.vel.y = physics.stomp_bounce_speed;
            player.falling = physics.coyote_ticks;
            events.push(GameEvent::Stomped { walker: i });
        } else {
            events.push(GameEvent::PlayerHit { walker: i });
            player.respawn();
            return Vec::new();
        }
    }
    bumps
}

// ══════════════════════════════════════════════════════════════
// Bumped tiles
// ══════════════════════════════════════════════════════════════

fn resolve_bumps(world: &mut World, bumps: &[usize], events: &mut Vec<GameEvent>) {
    for &cell in bumps {
        let tile = world.grid.catalog().get(world.grid.base_at(cell)).clone();
        if tile.breakable {
            if world.destroy_cell(cell) {
                events.push(GameEvent::TileBroken { cell });
            }
        } else if tile.hidden {
            if let Some(to) = tile.reveal_as {
                world.set_cell(cell, to);
                events.push(GameEvent::TileRevealed { cell });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::domain::catalog::TileCatalog;
    use crate::domain::entity::Vec2;
    use crate::domain::grid::CollisionGrid;
    use crate::domain::path::PlatformPath;
    use crate::domain::platform::ActivationMode;

    fn grid_from(rows: &[&str]) -> CollisionGrid {
        let catalog = TileCatalog::standard();
        let width = rows[0].chars().count();
        let mut g = CollisionGrid::new(width, rows.len(), 32.0, catalog.clone());
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if let (Some(idx), Some(cell)) = (catalog.index_for_glyph(ch), g.index_of(col, row)) {
                    g.set_base(cell, idx);
                }
            }
        }
        g
    }

    fn world_from(rows: &[&str], player_at: Vec2) -> World {
        let player = Actor::player(player_at, Vec2::new(16.0, 32.0));
        World::new("test", grid_from(rows), player, PhysicsConfig::default())
    }

    fn jump() -> FrameInput {
        FrameInput { jump: true, ..Default::default() }
    }

    #[test]
    fn landing_is_reported_once() {
        let mut w = world_from(&["....", "....", "....", "####"], Vec2::new(40.0, 40.0));
        let mut landings = 0;
        for _ in 0..20 {
            landings += step(&mut w, FrameInput::default())
                .iter()
                .filter(|e| matches!(e, GameEvent::Landed { actor: ActorRef::Player }))
                .count();
        }
        assert_eq!(landings, 1);
        assert_eq!(w.player.pos.y, 64.0);
    }

    #[test]
    fn editor_mode_freezes_the_world() {
        let mut w = world_from(&["....", "....", "####"], Vec2::new(40.0, 0.0));
        w.add_platform(PlatformPath::parse("0>3").unwrap());
        w.set_editor_mode(true);
        let before = (w.player.pos, w.platforms[0].position());
        assert!(step(&mut w, FrameInput::default()).is_empty());
        assert_eq!((w.player.pos, w.platforms[0].position()), before);
        assert_eq!(w.tick, 0);
    }

    #[test]
    fn path_warning_surfaces_once() {
        let mut w = world_from(&["....", "....", "####"], Vec2::new(40.0, 32.0));
        w.add_platform(PlatformPath::parse("4>7").unwrap());
        w.set_editor_mode(true);
        w.resize(4, 1);
        let events = step(&mut w, FrameInput::default());
        assert!(matches!(events.as_slice(), [GameEvent::PathWarning { platform: 0, .. }]));
        w.set_cell(0, 1);
        assert!(step(&mut w, FrameInput::default()).is_empty());
    }

    #[test]
    fn bumping_breakable_block_destroys_it() {
        let mut w = world_from(&[".B..", "....", "....", "####"], Vec2::new(36.0, 64.0));
        let mut events = Vec::new();
        for _ in 0..15 {
            events.extend(step(&mut w, jump()));
        }
        assert!(events.contains(&GameEvent::Bumped { actor: ActorRef::Player, cell: 1 }));
        assert!(events.contains(&GameEvent::TileBroken { cell: 1 }));
        assert!(w.grid.is_destroyed(1));
    }

    #[test]
    fn bumping_hidden_block_reveals_it() {
        let mut w = world_from(&["....", ".?..", "....", "####"], Vec2::new(36.0, 64.0));
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(step(&mut w, jump()));
        }
        assert!(events.contains(&GameEvent::TileRevealed { cell: 5 }));
        assert_eq!(w.grid.base_at(5), 1);
        assert!(w.grid.tile_at(40.0, 40.0).tile.collides());
    }

    #[test]
    fn falling_out_respawns_player() {
        let mut w = world_from(&["....", "...."], Vec2::new(40.0, 0.0));
        let mut fell = false;
        for _ in 0..40 {
            if step(&mut w, FrameInput::default()).contains(&GameEvent::FellOut { actor: ActorRef::Player }) {
                fell = true;
                break;
            }
        }
        assert!(fell);
        assert_eq!(w.player.pos, Vec2::new(40.0, 0.0));
    }

    #[test]
    fn lava_kills_and_water_is_entered() {
        let mut w = world_from(&["....", ".~..", "####"], Vec2::new(36.0, 0.0));
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(step(&mut w, FrameInput::default()));
        }
        assert!(events.contains(&GameEvent::EnteredLiquid { actor: ActorRef::Player }));

        let mut w = world_from(&["....", ".%..", "####"], Vec2::new(36.0, 0.0));
        let mut died = false;
        for _ in 0..10 {
            died |= step(&mut w, FrameInput::default()).contains(&GameEvent::Lethal { actor: ActorRef::Player });
        }
        assert!(died);
    }

    #[test]
    fn standing_on_stationary_platform_starts_it_after_delay() {
        let mut w = world_from(&["..........", "..........", "..........", ".........."], Vec2::new(164.0, 16.0));
        let id = w.add_platform(PlatformPath::parse("25>27").unwrap());
        w.platforms[0].mode = ActivationMode::AfterStationary;
        w.platforms[0].delay = 10;
        w.platforms[0].speed = 2.0;
        assert_eq!(w.platform(id).map(|p| p.position()), Some((160, 64)));

        // Fall onto it and settle.
        for _ in 0..10 {
            step(&mut w, FrameInput::default());
        }
        assert!(w.player.grounded);
        assert_eq!(w.platforms[0].position(), (160, 64));

        for _ in 0..15 {
            step(&mut w, FrameInput::default());
        }
        let (x, _) = w.platforms[0].position();
        assert!(x > 160);
        // Carried along without slipping off.
        assert_eq!(w.player.pos.x, 164.0 + (x - 160) as f32);
    }

    #[test]
    fn touching_one_block_touches_its_whole_group() {
        let mut w = world_from(&["..........", "..........", "..........", ".........."], Vec2::new(164.0, 32.0));
        let ridden = w.add_platform(PlatformPath::single(25));
        let linked = w.add_platform(PlatformPath::single(21));
        let loose = w.add_platform(PlatformPath::single(28));
        w.platforms[ridden].group = Some(1);
        w.platforms[linked].group = Some(1);
        w.platforms[loose].group = Some(2);

        step(&mut w, FrameInput::default());
        assert!(w.player.grounded);
        assert!(w.platforms[ridden].is_touching());
        assert!(w.platforms[linked].is_touching());
        assert!(!w.platforms[loose].is_touching());
    }

    #[test]
    fn stomping_a_walker_bounces_the_player() {
        let mut w = world_from(&["....", "....", "....", "####"], Vec2::new(40.0, 0.0));
        w.walkers.push(Actor::walker(Vec2::new(40.0, 80.0), Vec2::new(16.0, 16.0)));
        let mut stomped = false;
        for _ in 0..20 {
            if step(&mut w, FrameInput::default()).contains(&GameEvent::Stomped { walker: 0 }) {
                stomped = true;
                break;
            }
        }
        assert!(stomped);
        assert!(!w.walkers[0].alive);
        assert_eq!(w.player.vel.y, w.physics.stomp_bounce_speed);
    }

    #[test]
    fn walking_into_a_walker_hurts() {
        let mut w = world_from(&["......", "......", "######"], Vec2::new(20.0, 32.0));
        w.walkers.push(Actor::walker(Vec2::new(60.0, 48.0), Vec2::new(16.0, 16.0)));
        let right = FrameInput { right: true, ..Default::default() };
        let mut hit = false;
        for _ in 0..40 {
            if step(&mut w, right).contains(&GameEvent::PlayerHit { walker: 0 }) {
                hit = true;
                break;
            }
        }
        assert!(hit);
        assert_eq!(w.player.pos, Vec2::new(20.0, 32.0));
    }
}
