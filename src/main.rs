/// Entry point and game loop for the terminal demo.

mod ui;

use std::error::Error;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tilerider::config::EngineConfig;
use tilerider::domain::catalog::TileCatalog;
use tilerider::sim::event::{ActorRef, GameEvent};
use tilerider::sim::level::{build_world, load_levels, LevelDef};
use tilerider::sim::step;
use tilerider::sim::world::World;
use ui::input::{InputState, KEYS_EDITOR, KEYS_NEXT, KEYS_QUIT, KEYS_RESTART};
use ui::renderer::{Overlay, Renderer};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Ticks a status message stays on screen.
const MESSAGE_TICKS: u32 = 90;

fn main() {
    // Config warnings go to stderr: the log file is not known yet.
    let startup = tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).finish();
    let config = tracing::subscriber::with_default(startup, EngineConfig::load);
    init_tracing(&config);

    let (levels, catalog) = load_levels(&config.levels_dir);
    info!(count = levels.len(), dir = %config.levels_dir.display(), "levels loaded");

    let mut renderer = Renderer::new();
    let enhanced = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let result = game_loop(&mut renderer, enhanced, &config, &levels, &catalog);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Error: {e}");
    }
}

/// Log to the configured file; the terminal belongs to the renderer.
fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match File::create(&config.log_file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        Err(e) => eprintln!("Logging disabled, cannot open {}: {e}", config.log_file.display()),
    }
}

// ══════════════════════════════════════════════════════════════
// Session: the current level plus the on-screen message
// ══════════════════════════════════════════════════════════════

struct Session<'a> {
    levels: &'a [LevelDef],
    catalog: &'a TileCatalog,
    config: &'a EngineConfig,
    current: usize,
    world: World,
    message: String,
    message_timer: u32,
}

impl<'a> Session<'a> {
    /// Start at the first level that builds.
    fn start(levels: &'a [LevelDef], catalog: &'a TileCatalog, config: &'a EngineConfig) -> Result<Self, Box<dyn Error>> {
        for (i, def) in levels.iter().enumerate() {
            match build_world(def, catalog, &config.physics) {
                Ok(world) => {
                    return Ok(Session {
                        levels,
                        catalog,
                        config,
                        current: i,
                        world,
                        message: String::new(),
                        message_timer: 0,
                    });
                }
                Err(e) => warn!(level = %def.name, "cannot build level: {e}"),
            }
        }
        Err("no playable level".into())
    }

    /// Advance to the next level that builds, wrapping around.
    fn next_level(&mut self) {
        for offset in 1..=self.levels.len() {
            let i = (self.current + offset) % self.levels.len();
            match build_world(&self.levels[i], self.catalog, &self.config.physics) {
                Ok(world) => {
                    self.current = i;
                    self.world = world;
                    self.say(format!("Level {}: {}", i + 1, self.world.name));
                    return;
                }
                Err(e) => warn!(level = %self.levels[i].name, "cannot build level: {e}"),
            }
        }
    }

    fn say(&mut self, message: String) {
        self.message = message;
        self.message_timer = MESSAGE_TICKS;
    }

    fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }

    fn report(&mut self, events: &[GameEvent]) {
        for event in events {
            if let Some(text) = describe(event) {
                self.say(text);
            }
        }
    }
}

fn game_loop(
    renderer: &mut Renderer,
    enhanced: bool,
    config: &EngineConfig,
    levels: &[LevelDef],
    catalog: &TileCatalog,
) -> Result<(), Box<dyn Error>> {
    let mut session = Session::start(levels, catalog, config)?;
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }
        if kb.any_pressed(KEYS_RESTART) {
            session.world.restart();
            session.say("Restarted".to_string());
        }
        if kb.any_pressed(KEYS_NEXT) {
            session.next_level();
            renderer.invalidate()?;
        }
        if kb.any_pressed(KEYS_EDITOR) {
            let on = !session.world.is_editor_mode();
            session.world.set_editor_mode(on);
            session.say(if on { "Editor mode: simulation frozen" } else { "Play mode" }.to_string());
        }

        if last_tick.elapsed() >= tick_rate {
            let events = step::step(&mut session.world, kb.frame_input());
            session.report(&events);
            session.tick_message();
            last_tick = Instant::now();
        }

        let overlay = Overlay {
            level_index: session.current,
            level_count: levels.len(),
            message: &session.message,
        };
        renderer.render(&session.world, &overlay)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Status line text for the events worth showing.
fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::Squashed { actor: ActorRef::Player } => "Squashed!".to_string(),
        GameEvent::Lethal { actor: ActorRef::Player } => "Burned!".to_string(),
        GameEvent::FellOut { actor: ActorRef::Player } => "Fell out of the world".to_string(),
        GameEvent::PlayerHit { .. } => "Hit by a walker".to_string(),
        GameEvent::Stomped { .. } => "Stomp!".to_string(),
        GameEvent::TileBroken { cell } => format!("Broke block {cell}"),
        GameEvent::TileRevealed { cell } => format!("Found hidden block {cell}"),
        GameEvent::PathWarning { platform, error } => format!("Platform {platform} paused: {error}"),
        _ => return None,
    };
    Some(text)
}
