/// Actor integrator: turns input and gravity into a proposed velocity,
/// then folds the resolver's report back into the actor.
///
/// One tick for one actor is `integrate_*` -> `resolve` -> `apply_report`;
/// `advance` runs all three. The integrator never moves the actor itself.

use crate::config::PhysicsConfig;
use crate::domain::entity::{Actor, ActorKind, Carry, CarryAxis, Facing, FrameInput, Vec2};
use crate::domain::platform::MovingPlatform;
use crate::domain::resolver::{resolve, CollisionReport, ResolveEnv};

/// Carry below this is dropped.
const CARRY_EPSILON: f32 = 0.1;

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// Proposed velocity for one player tick. Updates facing, climb and jump state.
pub fn integrate_player(actor: &mut Actor, input: FrameInput, cfg: &PhysicsConfig) -> Vec2 {
    update_climb(actor, input);
    if !actor.climbing {
        apply_gravity(actor, cfg);
    }
    move_horizontal(actor, input, cfg);
    if actor.climbing {
        actor.falling = 0;
        actor.vel.y = -(axis(input.up, input.down)) * cfg.climb_speed;
    }
    jump(actor, input, cfg);
    actor.vel
}

fn axis(positive: bool, negative: bool) -> f32 {
    (positive as i8 - negative as i8) as f32
}

fn update_climb(actor: &mut Actor, input: FrameInput) {
    if !actor.caps.climb || !actor.can_climb {
        actor.climbing = false;
    } else if input.up {
        actor.climbing = true;
    }
}

fn gravity_for(actor: &Actor, cfg: &PhysicsConfig) -> f32 {
    if actor.swimming {
        cfg.swim_gravity
    } else if actor.slow_fall {
        cfg.slow_fall_gravity
    } else {
        cfg.gravity
    }
}

fn apply_gravity(actor: &mut Actor, cfg: &PhysicsConfig) {
    let g = gravity_for(actor, cfg);
    actor.vel.y = (actor.vel.y + g).min(cfg.terminal_velocity(g));
}

fn move_horizontal(actor: &mut Actor, input: FrameInput, cfg: &PhysicsConfig) {
    let dir = axis(input.right, input.left);
    let footed = actor.falling < cfg.coyote_ticks;
    let vx = actor.vel.x;

    if dir == 0.0 {
        if actor.climbing {
            actor.vel.x = 0.0;
        } else if footed {
            let d = if actor.on_ice { cfg.ice_deceleration } else { cfg.deceleration };
            actor.vel.x = toward_zero(vx, d);
        }
    } else if actor.climbing {
        actor.vel.x = dir * cfg.climb_speed;
    } else {
        actor.facing = if dir > 0.0 { Facing::Right } else { Facing::Left };
        let top = match (actor.swimming, input.run) {
            (true, true) => cfg.swim_run_speed,
            (true, false) => cfg.swim_walk_speed,
            (false, true) => cfg.run_speed,
            (false, false) => cfg.walk_speed,
        };
        if dir * vx < top {
            if dir * vx < 0.0 {
                let turn = if !footed {
                    cfg.air_turn_deceleration
                } else if actor.swimming {
                    cfg.swim_turn_deceleration
                } else if actor.on_ice {
                    cfg.ice_turn_deceleration
                } else {
                    cfg.turn_deceleration
                };
                actor.vel.x = vx + dir * turn;
            } else {
                let accel = if actor.swimming {
                    cfg.swim_acceleration
                } else if actor.on_ice {
                    cfg.ice_acceleration
                } else {
                    cfg.acceleration
                };
                actor.vel.x = dir * (dir * vx + accel).min(top);
            }
        }
    }

    let max = cfg.max_speed();
    actor.vel.x = actor.vel.x.clamp(-max, max);
}

fn toward_zero(v: f32, by: f32) -> f32 {
    if v.abs() <= by {
        0.0
    } else {
        v - by * v.signum()
    }
}

/// (speed, hold limit) of the jump the actor would make right now.
fn jump_profile(actor: &Actor, cfg: &PhysicsConfig) -> (f32, u32) {
    if actor.swimming {
        (cfg.swim_jump_speed, cfg.swim_jump_hold_ticks)
    } else {
        (cfg.jump_speed, cfg.jump_hold_ticks)
    }
}

fn jump(actor: &mut Actor, input: FrameInput, cfg: &PhysicsConfig) {
    if !input.jump {
        actor.jump_ticks = 0;
        return;
    }
    let (speed, limit) = jump_profile(actor, cfg);
    let can_start = actor.swimming || actor.falling < cfg.coyote_ticks;
    if !can_start && actor.jump_ticks == 0 {
        return;
    }
    actor.jump_ticks = actor.jump_ticks.saturating_add(1);
    if actor.jump_ticks <= limit {
        actor.vel.y = speed;
        actor.climbing = false;
    }
}

// ══════════════════════════════════════════════════════════════
// Walker
// ══════════════════════════════════════════════════════════════

/// Proposed velocity for one walker tick: gravity plus a slow walk in the
/// facing direction.
pub fn integrate_walker(actor: &mut Actor, cfg: &PhysicsConfig) -> Vec2 {
    let g = cfg.walker_gravity;
    actor.vel.y = (actor.vel.y + g).min(cfg.terminal_velocity(g));
    if actor.vel.x.abs() < cfg.walker_speed {
        actor.vel.x += cfg.walker_acceleration * actor.facing.sign();
    }
    actor.vel
}

// ══════════════════════════════════════════════════════════════
// Report
// ══════════════════════════════════════════════════════════════

/// Fold a collision report into the actor's motion state.
pub fn apply_report(actor: &mut Actor, report: &CollisionReport, platforms: &[MovingPlatform], cfg: &PhysicsConfig) {
    actor.vel = report.velocity;
    if let Some(cap) = report.fall_cap {
        actor.vel.y = actor.vel.y.min(cap);
    }
    actor.grounded = report.grounded;
    actor.swimming = report.swimming;
    actor.on_ice = report.on_ice;
    actor.can_climb = report.can_climb;
    if !report.can_climb {
        actor.climbing = false;
    }

    if report.grounded || actor.climbing {
        actor.falling = 0;
    } else {
        actor.falling = actor.falling.saturating_add(1);
    }

    if report.bumped_head {
        let (_, limit) = jump_profile(actor, cfg);
        actor.jump_ticks = limit + 1;
    }

    if actor.kind == ActorKind::Walker && report.blocked_x {
        actor.facing = walker_turn(actor.facing, report, platforms);
    }

    if actor.caps.momentum_carry {
        update_carry(actor, report, platforms, cfg);
    } else {
        actor.carry = None;
    }
}

/// A walker blocked by a moving platform walks the way the platform goes;
/// anything else turns it around.
fn walker_turn(facing: Facing, report: &CollisionReport, platforms: &[MovingPlatform]) -> Facing {
    let vx = report
        .platform_block
        .and_then(|id| platforms.iter().find(|p| p.id == id))
        .map_or(0.0, |p| p.velocity().x);
    if vx > 0.0 {
        Facing::Right
    } else if vx < 0.0 {
        Facing::Left
    } else {
        facing.flipped()
    }
}

fn carrying_platform<'a>(report: &CollisionReport, platforms: &'a [MovingPlatform]) -> Option<&'a MovingPlatform> {
    let by_id = |id: usize| platforms.iter().find(|p| p.id == id);
    report
        .riding
        .and_then(by_id)
        .or_else(|| {
            report
                .platforms_touched
                .iter()
                .filter_map(|&id| by_id(id))
                .find(|p| p.velocity() != Vec2::ZERO)
        })
        .filter(|p| !p.tags.frictionless)
}

/// Latch platform speed while in contact; release it as a boost on the
/// first airborne tick, then bleed it off as `boost / (1 + k / decay)`.
fn update_carry(actor: &mut Actor, report: &CollisionReport, platforms: &[MovingPlatform], cfg: &PhysicsConfig) {
    if let Some(p) = carrying_platform(report, platforms) {
        let v = p.velocity();
        let (speed, axis) = if v.x != 0.0 {
            (v.x, CarryAxis::X)
        } else if v.y != 0.0 {
            (v.y, CarryAxis::Y)
        } else {
            actor.carry = None;
            return;
        };
        let peak = match actor.carry {
            Some(c) if c.axis == axis && c.airborne == 0 && c.speed * speed > 0.0 && c.speed.abs() > speed.abs() => c.speed,
            _ => speed,
        };
        actor.carry = Some(Carry { speed: peak, axis, boost: 0.0, airborne: 0 });
        return;
    }

    if report.grounded {
        actor.carry = None;
        return;
    }
    let Some(mut c) = actor.carry else {
        return;
    };

    let decay = cfg.carry_decay.max(f32::EPSILON);
    let remaining = |k: u32, boost: f32| boost / (1.0 + k as f32 / decay);
    let change = if c.airborne == 0 {
        c.boost = c.speed * c.speed.abs() / (c.speed.abs() + decay);
        c.boost
    } else {
        remaining(c.airborne, c.boost) - remaining(c.airborne - 1, c.boost)
    };
    match c.axis {
        CarryAxis::X => actor.vel.x += change,
        CarryAxis::Y => actor.vel.y += change,
    }
    c.airborne += 1;

    actor.carry = (remaining(c.airborne - 1, c.boost).abs() >= CARRY_EPSILON).then_some(c);
}

// ══════════════════════════════════════════════════════════════
// One tick
// ══════════════════════════════════════════════════════════════

/// Integrate, resolve and apply for one actor. `input` is ignored for walkers.
pub fn advance(actor: &mut Actor, input: FrameInput, env: &ResolveEnv) -> CollisionReport {
    let proposed = match actor.kind {
        ActorKind::Player => integrate_player(actor, input, env.physics),
        ActorKind::Walker => integrate_walker(actor, env.physics),
    };
    let report = resolve(actor, proposed, env);
    apply_report(actor, &report, env.platforms, env.physics);
    report
}
