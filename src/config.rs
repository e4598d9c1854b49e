/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Every physics constant the resolver, automaton and integrator use lives
/// here, so a level instance never reads process-wide globals.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub physics: PhysicsConfig,
    pub tick_rate_ms: u64,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub tile_size: f32,
    pub gravity: f32,
    pub swim_gravity: f32,
    pub slow_fall_gravity: f32,
    /// Terminal velocity = round(gravity * factor).
    pub terminal_velocity_factor: f32,
    pub walker_gravity: f32,
    pub jump_speed: f32,
    pub jump_hold_ticks: u32,
    pub swim_jump_speed: f32,
    pub swim_jump_hold_ticks: u32,
    pub coyote_ticks: u32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub swim_walk_speed: f32,
    pub swim_run_speed: f32,
    pub acceleration: f32,
    pub ice_acceleration: f32,
    pub swim_acceleration: f32,
    pub deceleration: f32,
    pub ice_deceleration: f32,
    pub turn_deceleration: f32,
    pub ice_turn_deceleration: f32,
    pub swim_turn_deceleration: f32,
    pub air_turn_deceleration: f32,
    pub climb_speed: f32,
    pub walker_speed: f32,
    pub walker_acceleration: f32,
    /// Vertical speed given to the player after stomping a walker.
    pub stomp_bounce_speed: f32,
    /// Largest x-sweep lift still treated as a slope/step rather than a wall,
    /// on top of the horizontal speed.
    pub step_tolerance: f32,
    pub slope_drag: f32,
    /// Vertical band around a platform top inside which an actor rides it.
    pub ride_band: f32,
    pub max_depenetration_iterations: u32,
    pub carry_decay: f32,
    pub touch_grace_ticks: u32,
    /// Inclusive tile-index range of liquids that kill on contact.
    pub lethal_liquid: (u32, u32),
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        TomlPhysics::default().into()
    }
}

impl PhysicsConfig {
    /// Maximum per-axis speed: guarantees at most one tile boundary per tick.
    pub fn max_speed(&self) -> f32 {
        self.tile_size - 1.0
    }

    pub fn terminal_velocity(&self, gravity: f32) -> f32 {
        (gravity * self.terminal_velocity_factor).round()
    }

    pub fn is_lethal_liquid(&self, idx: u32) -> bool {
        self.lethal_liquid.0 <= idx && idx <= self.lethal_liquid.1
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
struct TomlPhysics {
    tile_size: f32,
    gravity: f32,
    swim_gravity: f32,
    slow_fall_gravity: f32,
    terminal_velocity_factor: f32,
    walker_gravity: f32,
    jump_speed: f32,
    jump_hold_ticks: u32,
    swim_jump_speed: f32,
    swim_jump_hold_ticks: u32,
    coyote_ticks: u32,
    walk_speed: f32,
    run_speed: f32,
    swim_walk_speed: f32,
    swim_run_speed: f32,
    acceleration: f32,
    ice_acceleration: f32,
    swim_acceleration: f32,
    deceleration: f32,
    ice_deceleration: f32,
    turn_deceleration: f32,
    ice_turn_deceleration: f32,
    swim_turn_deceleration: f32,
    air_turn_deceleration: f32,
    climb_speed: f32,
    walker_speed: f32,
    walker_acceleration: f32,
    stomp_bounce_speed: f32,
    step_tolerance: f32,
    slope_drag: f32,
    ride_band: f32,
    max_depenetration_iterations: u32,
    carry_decay: f32,
    touch_grace_ticks: u32,
    lethal_liquid: [u32; 2],
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }   // ~60 ticks per second
fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "tilerider.log".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            tile_size: 32.0,
            gravity: 0.9,
            swim_gravity: 0.1,
            slow_fall_gravity: 0.1,
            terminal_velocity_factor: 24.444_444,
            walker_gravity: 1.0,
            jump_speed: -9.0,
            jump_hold_ticks: 15,
            swim_jump_speed: -3.0,
            swim_jump_hold_ticks: 4,
            coyote_ticks: 2,
            walk_speed: 3.0,
            run_speed: 7.0,
            swim_walk_speed: 2.0,
            swim_run_speed: 4.0,
            acceleration: 0.3,
            ice_acceleration: 0.1,
            swim_acceleration: 0.2,
            deceleration: 0.45,
            ice_deceleration: 0.1,
            turn_deceleration: 0.7,
            ice_turn_deceleration: 0.3,
            swim_turn_deceleration: 0.2,
            air_turn_deceleration: 0.7,
            climb_speed: 3.0,
            walker_speed: 1.0,
            walker_acceleration: 0.1,
            stomp_bounce_speed: -13.0,
            step_tolerance: 4.0,
            slope_drag: 0.8,
            ride_band: 2.0,
            max_depenetration_iterations: 1000,
            carry_decay: 3.0,
            touch_grace_ticks: 5,
            lethal_liquid: [280, 282],
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
        }
    }
}

impl From<TomlPhysics> for PhysicsConfig {
    fn from(t: TomlPhysics) -> Self {
        PhysicsConfig {
            tile_size: t.tile_size,
            gravity: t.gravity,
            swim_gravity: t.swim_gravity,
            slow_fall_gravity: t.slow_fall_gravity,
            terminal_velocity_factor: t.terminal_velocity_factor,
            walker_gravity: t.walker_gravity,
            jump_speed: t.jump_speed,
            jump_hold_ticks: t.jump_hold_ticks,
            swim_jump_speed: t.swim_jump_speed,
            swim_jump_hold_ticks: t.swim_jump_hold_ticks,
            coyote_ticks: t.coyote_ticks,
            walk_speed: t.walk_speed,
            run_speed: t.run_speed,
            swim_walk_speed: t.swim_walk_speed,
            swim_run_speed: t.swim_run_speed,
            acceleration: t.acceleration,
            ice_acceleration: t.ice_acceleration,
            swim_acceleration: t.swim_acceleration,
            deceleration: t.deceleration,
            ice_deceleration: t.ice_deceleration,
            turn_deceleration: t.turn_deceleration,
            ice_turn_deceleration: t.ice_turn_deceleration,
            swim_turn_deceleration: t.swim_turn_deceleration,
            air_turn_deceleration: t.air_turn_deceleration,
            climb_speed: t.climb_speed,
            walker_speed: t.walker_speed,
            walker_acceleration: t.walker_acceleration,
            stomp_bounce_speed: t.stomp_bounce_speed,
            step_tolerance: t.step_tolerance,
            slope_drag: t.slope_drag,
            ride_band: t.ride_band,
            max_depenetration_iterations: t.max_depenetration_iterations,
            carry_decay: t.carry_decay,
            touch_grace_ticks: t.touch_grace_ticks,
            lethal_liquid: (t.lethal_liquid[0], t.lethal_liquid[1]),
        }
    }
}

// ── Loading ──

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl EngineConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        EngineConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document. Relative directories resolve against the CWD.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        validate(&toml_cfg)?;
        Ok(EngineConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        EngineConfig {
            physics: toml_cfg.physics.into(),
            tick_rate_ms: toml_cfg.timing.tick_rate_ms,
            levels_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
        }
    }
}

fn validate(cfg: &TomlConfig) -> Result<(), ConfigError> {
    let p = &cfg.physics;
    if p.tile_size < 2.0 {
        return Err(ConfigError::Invalid(format!("tile_size must be at least 2, got {}", p.tile_size)));
    }
    if p.max_depenetration_iterations == 0 {
        return Err(ConfigError::Invalid("max_depenetration_iterations must be positive".into()));
    }
    if p.lethal_liquid[0] > p.lethal_liquid[1] {
        return Err(ConfigError::Invalid(format!(
            "lethal_liquid range is reversed: {:?}", p.lethal_liquid
        )));
    }
    Ok(())
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let parsed = toml::from_str::<TomlConfig>(&text)
                    .map_err(ConfigError::from)
                    .and_then(|cfg| validate(&cfg).map(|_| cfg));
                return match parsed {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        warn!(path = %path.display(), "{e}; using default settings");
                        TomlConfig::default()
                    }
                };
            }
            Err(e) => {
                warn!("could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}
