/// Keyboard state tracker.
///
/// Movement, run and jump are level-triggered: the integrator needs to know
/// whether jump is still held to extend a jump, so a key stays "held" until
/// its Release event arrives. Terminals without keyboard enhancement never
/// send Release; there a key expires after `HOLD_TIMEOUT` without a
/// Press/Repeat event.
///
/// Meta keys (quit, restart, next level, editor) are edge-triggered.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use tilerider::domain::entity::FrameInput;

/// Key repeat on most terminals fires every 30-50 ms after an initial
/// delay of a few hundred ms; this has to bridge that first gap.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')];
const KEYS_RUN: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];

pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_NEXT: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
pub const KEYS_EDITOR: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from not held to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Only true when keyboard enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => {
                    let was_held = self.is_held(key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh_presses.push(key.code);
                    }
                }
            }
        }

        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        match self.last_active.get(&code) {
            Some(_) if self.honor_release => true,
            Some(t) => t.elapsed() < HOLD_TIMEOUT,
            None => false,
        }
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Player keys for this tick. A key pressed and released within one
    /// frame still counts, so quick taps are not lost.
    pub fn frame_input(&self) -> FrameInput {
        let active = |codes: &[KeyCode]| self.any_held(codes) || self.any_pressed(codes);
        FrameInput {
            left: active(KEYS_LEFT),
            right: active(KEYS_RIGHT),
            up: active(KEYS_UP),
            down: active(KEYS_DOWN),
            run: active(KEYS_RUN),
            jump: active(KEYS_JUMP),
        }
    }
}
