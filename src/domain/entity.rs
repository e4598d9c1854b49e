/// Actors: the player and walking creatures, plus the per-frame input snapshot.
///
/// Positions are the actor's top-left corner in world pixels, y DOWN.
/// Capabilities are set at construction and branched on by the resolver
/// and integrator; actor kinds are never compared by name.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Inset of the right/bottom sample points so an actor exactly flush
/// against a tile edge does not sample the neighbouring cell.
pub const SAMPLE_EPS: f32 = 0.01;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, o: Vec2) {
        self.x += o.x;
        self.y += o.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f32) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// Per-actor feature flags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Capabilities {
    /// Inherits platform velocity on dismount.
    pub momentum_carry: bool,
    /// Liquids switch to swim physics instead of being ignored.
    pub swim: bool,
    /// May climb `climbable` tiles.
    pub climb: bool,
}

impl Capabilities {
    pub const PLAYER: Capabilities = Capabilities { momentum_carry: true, swim: true, climb: true };
    pub const WALKER: Capabilities = Capabilities { momentum_carry: false, swim: false, climb: false };
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorKind {
    Player,
    Walker,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CarryAxis {
    X,
    Y,
}

/// Platform velocity latched while riding, released as momentum on dismount.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Carry {
    /// Signed peak platform speed seen while riding.
    pub speed: f32,
    pub axis: CarryAxis,
    /// Velocity granted at dismount; decays from here.
    pub boost: f32,
    /// Airborne ticks since dismount, 0 while still riding.
    pub airborne: u32,
}

/// Which sample a point is, for rules that care (feet for one-way ledges).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SamplePoint {
    LeftMid,
    RightMid,
    LeftBottom,
    RightBottom,
    LeftTop,
    RightTop,
}

impl SamplePoint {
    /// Resolution priority: mid before bottom before top.
    pub const PRIORITY: [SamplePoint; 6] = [
        SamplePoint::LeftMid,
        SamplePoint::RightMid,
        SamplePoint::LeftBottom,
        SamplePoint::RightBottom,
        SamplePoint::LeftTop,
        SamplePoint::RightTop,
    ];

    pub fn is_feet(self) -> bool {
        matches!(self, SamplePoint::LeftBottom | SamplePoint::RightBottom)
    }

    pub fn is_head(self) -> bool {
        matches!(self, SamplePoint::LeftTop | SamplePoint::RightTop)
    }
}

/// Axis-aligned box of an actor, with the six sample anchors.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ActorBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl ActorBounds {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        ActorBounds { left: pos.x, right: pos.x + size.x, top: pos.y, bottom: pos.y + size.y }
    }

    pub fn mid_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// World position of a sample anchor.
    pub fn sample(&self, p: SamplePoint) -> (f32, f32) {
        let l = self.left;
        let r = self.right - SAMPLE_EPS;
        let t = self.top;
        let b = self.bottom - SAMPLE_EPS;
        let m = self.mid_y();
        match p {
            SamplePoint::LeftMid => (l, m),
            SamplePoint::RightMid => (r, m),
            SamplePoint::LeftBottom => (l, b),
            SamplePoint::RightBottom => (r, b),
            SamplePoint::LeftTop => (l, t),
            SamplePoint::RightTop => (r, t),
        }
    }

    pub fn overlaps(&self, o: &ActorBounds) -> bool {
        self.left < o.right && o.left < self.right && self.top < o.bottom && o.top < self.bottom
    }

    pub fn overlaps_x(&self, o: &ActorBounds) -> bool {
        self.left < o.right && o.left < self.right
    }

    /// Grow by `dx`/`dy` on every side.
    pub fn expanded(&self, dx: f32, dy: f32) -> ActorBounds {
        ActorBounds {
            left: self.left - dx,
            right: self.right + dx,
            top: self.top - dy,
            bottom: self.bottom + dy,
        }
    }
}

/// One tick of player key state. Consumed by the player integrator only.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub run: bool,
    pub jump: bool,
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub kind: ActorKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub facing: Facing,
    pub caps: Capabilities,
    pub spawn: Vec2,
    pub alive: bool,

    pub grounded: bool,
    /// Ticks since last standing on something. Drives coyote jumps.
    pub falling: u32,
    /// Ticks the current jump has been held, 0 when not jumping.
    pub jump_ticks: u32,
    pub swimming: bool,
    pub on_ice: bool,
    pub climbing: bool,
    pub can_climb: bool,
    /// Special item: reduced gravity while set.
    pub slow_fall: bool,
    pub carry: Option<Carry>,
}

impl Actor {
    fn new(kind: ActorKind, pos: Vec2, size: Vec2, caps: Capabilities, facing: Facing) -> Self {
        Actor {
            kind,
            pos,
            size,
            vel: Vec2::ZERO,
            facing,
            caps,
            spawn: pos,
            alive: true,
            grounded: false,
            falling: 0,
            jump_ticks: 0,
            swimming: false,
            on_ice: false,
            climbing: false,
            can_climb: false,
            slow_fall: false,
            carry: None,
        }
    }

    pub fn player(pos: Vec2, size: Vec2) -> Self {
        Actor::new(ActorKind::Player, pos, size, Capabilities::PLAYER, Facing::Right)
    }

    pub fn walker(pos: Vec2, size: Vec2) -> Self {
        Actor::new(ActorKind::Walker, pos, size, Capabilities::WALKER, Facing::Left)
    }

    pub fn bounds(&self) -> ActorBounds {
        ActorBounds::new(self.pos, self.size)
    }

    /// Back to the spawn point with all motion state cleared.
    pub fn respawn(&mut self) {
        let spawn = self.spawn;
        *self = Actor::new(self.kind, spawn, self.size, self.caps, self.facing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_points_sit_inside_the_box() {
        let b = ActorBounds::new(Vec2::new(10.0, 20.0), Vec2::new(24.0, 32.0));
        assert_eq!(b.sample(SamplePoint::LeftMid), (10.0, 36.0));
        let (rx, by) = b.sample(SamplePoint::RightBottom);
        assert!(rx < 34.0 && rx > 33.9);
        assert!(by < 52.0 && by > 51.9);
        assert_eq!(b.sample(SamplePoint::LeftTop), (10.0, 20.0));
    }

    #[test]
    fn priority_tests_mid_first() {
        assert_eq!(SamplePoint::PRIORITY[0], SamplePoint::LeftMid);
        assert!(SamplePoint::PRIORITY[2].is_feet());
        assert!(SamplePoint::PRIORITY[5].is_head());
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = ActorBounds::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let b = ActorBounds::new(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(!a.overlaps(&b));
        assert!(a.expanded(1.0, 0.0).overlaps(&b));
    }

    #[test]
    fn respawn_clears_motion() {
        let mut a = Actor::player(Vec2::new(5.0, 6.0), Vec2::new(24.0, 32.0));
        a.pos = Vec2::new(100.0, 100.0);
        a.vel = Vec2::new(3.0, 4.0);
        a.swimming = true;
        a.respawn();
        assert_eq!(a.pos, Vec2::new(5.0, 6.0));
        assert_eq!(a.vel, Vec2::ZERO);
        assert!(!a.swimming);
    }
}
