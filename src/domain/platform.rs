/// Moving-platform automaton.
///
/// A platform walks its `PlatformPath` one pixel substep at a time, stopping
/// exactly on each node. At a node its activation mode decides whether it
/// departs and in which direction; between nodes it keeps travelling the
/// current leg.
///
/// ## Activation modes
///   AfterStationary  waits at each node until an actor touches it (plus
///                    `delay` touched frames), reverses at the ends
///   AfterForward     moves forward while touched, back toward the start
///                    otherwise; halts at whichever end it is pushed to
///   PingPong         moves continuously, reversing at the ends
///
/// `touching` is written only by `record_touch` (actor contact during
/// resolution) and aged by `age_touch`; `step` only reads it. The grace
/// latch keeps a moving platform going through brief airborne frames, but
/// `AfterStationary` delay frames count only ticks with real contact.

use tracing::warn;

use crate::domain::entity::{ActorBounds, Vec2};
use crate::domain::grid::GridGeometry;
use crate::domain::path::{PathError, PlatformPath};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ActivationMode {
    AfterStationary,
    AfterForward,
    #[default]
    PingPong,
}

/// What happens at the last node.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FinishMode {
    #[default]
    Reverse,
    /// Jump straight back to the first node.
    Warp,
}

/// Capability tags set at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PlatformTags {
    /// Riders are not carried horizontally and gain no dismount momentum.
    pub frictionless: bool,
    /// Solid only when landed on from above.
    pub one_sided_mount: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Leg {
    from: usize,
    to: usize,
}

impl Leg {
    fn forward(&self) -> bool {
        self.to > self.from
    }

    fn reversed(&self) -> Leg {
        Leg { from: self.to, to: self.from }
    }
}

#[derive(Clone, Debug)]
pub struct MovingPlatform {
    pub id: usize,
    pub path: PlatformPath,
    pub speed: f32,
    pub delay: u32,
    pub mode: ActivationMode,
    pub finish: FinishMode,
    pub requires_touch: bool,
    pub tags: PlatformTags,
    /// Pixel size, one tile by default.
    pub size: (i32, i32),
    /// Platforms sharing a group are touched together.
    pub group: Option<u32>,

    pos: (i32, i32),
    vel: (i32, i32),
    forward: bool,
    /// Path position of the node last reached.
    node: usize,
    leg: Option<Leg>,
    current_index: Option<usize>,
    touching: bool,
    /// Real contact recorded since the last step.
    contact: bool,
    touch_age: u32,
    touched: bool,
    at_start: bool,
    reached_end: bool,
    frames_since_arrival: u32,
    paused: bool,
    warned: bool,
}

impl MovingPlatform {
    pub fn new(id: usize, path: PlatformPath, geo: &GridGeometry) -> Self {
        let mut p = MovingPlatform {
            id,
            path,
            speed: 1.0,
            delay: 0,
            mode: ActivationMode::default(),
            finish: FinishMode::default(),
            requires_touch: false,
            tags: PlatformTags::default(),
            size: (geo.tile_size, geo.tile_size),
            group: None,
            pos: (0, 0),
            vel: (0, 0),
            forward: true,
            node: 0,
            leg: None,
            current_index: None,
            touching: false,
            contact: false,
            touch_age: 0,
            touched: false,
            at_start: true,
            reached_end: false,
            frames_since_arrival: 0,
            paused: false,
            warned: false,
        };
        p.reset(geo);
        p
    }

    /// Back to `path[0]`, facing forward, untouched.
    pub fn reset(&mut self, geo: &GridGeometry) {
        self.pos = self.path.nodes().first().map_or((0, 0), |&n| geo.cell_origin(n));
        self.vel = (0, 0);
        self.forward = true;
        self.node = 0;
        self.leg = None;
        self.current_index = geo.index_at(self.pos.0, self.pos.1);
        self.touching = false;
        self.contact = false;
        self.touch_age = 0;
        self.touched = false;
        self.at_start = true;
        self.reached_end = false;
        self.frames_since_arrival = 0;
    }

    // ── Accessors ──

    pub fn position(&self) -> (i32, i32) {
        self.pos
    }

    /// This tick's actual displacement.
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vel.0 as f32, self.vel.1 as f32)
    }

    pub fn bounds(&self) -> ActorBounds {
        ActorBounds::new(
            Vec2::new(self.pos.0 as f32, self.pos.1 as f32),
            Vec2::new(self.size.0 as f32, self.size.1 as f32),
        )
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn at_start(&self) -> bool {
        self.at_start
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn frames_since_arrival(&self) -> u32 {
        self.frames_since_arrival
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    // ── Touch latch ──

    /// Contact callback: an actor touched this platform during resolution.
    pub fn record_touch(&mut self) {
        self.touching = true;
        self.contact = true;
        self.touched = true;
        self.touch_age = 0;
    }

    /// Called once per tick before stepping. Contact older than `grace`
    /// ticks stops counting as touching.
    pub fn age_touch(&mut self, grace: u32) {
        if self.touching {
            self.touch_age += 1;
            if self.touch_age > grace {
                self.touching = false;
            }
        }
    }

    // ── Path validity ──

    /// Swap in a new path and restart from its first node.
    pub fn set_path(&mut self, path: PlatformPath, geo: &GridGeometry) -> Option<PathError> {
        self.path = path;
        self.paused = false;
        self.warned = false;
        self.reset(geo);
        self.revalidate(geo)
    }

    /// Re-check the path against the grid. An invalid path pauses the
    /// platform; the error is returned only the first time.
    pub fn revalidate(&mut self, geo: &GridGeometry) -> Option<PathError> {
        match self.path.validate(geo.width, geo.cells()) {
            Ok(()) => {
                if self.paused {
                    self.paused = false;
                    self.reset(geo);
                }
                self.warned = false;
                None
            }
            Err(err) => {
                if !self.paused {
                    self.paused = true;
                    self.vel = (0, 0);
                    if let Some(leg) = self.leg.take() {
                        if let Some(&n) = self.path.nodes().get(leg.from).filter(|&&n| n < geo.cells()) {
                            self.pos = geo.cell_origin(n);
                            self.node = leg.from;
                        }
                    }
                }
                if self.warned {
                    return None;
                }
                self.warned = true;
                warn!(platform = self.id, path = %self.path, error = %err, "platform path invalid; pausing");
                Some(err)
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Step
    // ══════════════════════════════════════════════════════════════

    pub fn step(&mut self, geo: &GridGeometry) {
        self.vel = (0, 0);
        let contact = std::mem::take(&mut self.contact);
        if self.paused || self.path.is_empty() {
            return;
        }

        let leg = match self.leg {
            Some(leg) => self.continue_leg(leg),
            None => match self.depart(geo, contact) {
                Some(leg) => leg,
                None => return,
            },
        };
        self.advance(leg, geo);
    }

    /// Between nodes. Only `AfterForward` turns around mid-leg.
    fn continue_leg(&mut self, leg: Leg) -> Leg {
        if self.mode == ActivationMode::AfterForward && leg.forward() != self.touching {
            self.forward = self.touching;
            return leg.reversed();
        }
        leg
    }

    /// On a node: apply touch and delay gating, pick the next leg.
    fn depart(&mut self, geo: &GridGeometry, contact: bool) -> Option<Leg> {
        if self.requires_touch && !self.touched {
            return None;
        }
        if self.path.len() < 2 {
            return None;
        }

        let counts = self.mode != ActivationMode::AfterStationary || contact;
        if counts {
            self.frames_since_arrival = self.frames_since_arrival.saturating_add(1);
        }
        if self.frames_since_arrival < self.delay {
            return None;
        }

        let at_first = self.node == 0;
        let at_last = self.node == self.path.last();

        match self.mode {
            ActivationMode::AfterStationary | ActivationMode::PingPong => {
                if self.mode == ActivationMode::AfterStationary && !self.touching {
                    return None;
                }
                if at_last && self.forward {
                    self.reached_end = true;
                    if self.finish == FinishMode::Warp {
                        self.warp(geo);
                        return None;
                    }
                    self.forward = false;
                } else if at_first && !self.forward {
                    self.at_start = true;
                    self.forward = true;
                }
            }
            ActivationMode::AfterForward => {
                self.forward = self.touching;
                if at_last && self.forward {
                    self.reached_end = true;
                    if self.finish == FinishMode::Warp {
                        self.warp(geo);
                    }
                    return None;
                }
                if at_first && !self.forward {
                    self.at_start = true;
                    return None;
                }
            }
        }

        let to = if self.forward { self.node + 1 } else { self.node - 1 };
        Some(Leg { from: self.node, to })
    }

    fn warp(&mut self, geo: &GridGeometry) {
        let touched = self.touched;
        let touching = self.touching;
        self.reset(geo);
        self.touched = touched;
        self.touching = touching;
        self.reached_end = true;
    }

    /// Unit substeps along the leg, halting exactly on the target node.
    fn advance(&mut self, leg: Leg, geo: &GridGeometry) {
        self.leg = Some(leg);
        let Some(edge) = self.path.edges().get(leg.from.min(leg.to)) else {
            return;
        };
        let sign = if leg.forward() { 1 } else { -1 };
        let (ux, uy) = edge.glyph.unit();
        let target = geo.cell_origin(self.path.nodes()[leg.to]);

        let start = self.pos;
        let mut arrived = false;
        for _ in 0..self.speed.abs().floor() as u32 {
            self.pos.0 += ux * sign;
            self.pos.1 += uy * sign;
            if self.pos == target {
                arrived = true;
                break;
            }
        }
        self.vel = (self.pos.0 - start.0, self.pos.1 - start.1);

        let index = geo.index_at(self.pos.0, self.pos.1);
        if index != self.current_index {
            self.current_index = index;
            self.frames_since_arrival = 0;
            self.at_start = false;
            self.reached_end = false;
        }
        if arrived {
            self.node = leg.to;
            self.leg = None;
            self.frames_since_arrival = 0;
            self.at_start = leg.to == 0;
            self.reached_end = leg.to == self.path.last();
        }
    }
}
