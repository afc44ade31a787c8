/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::content::ContentManager;
use domain::entity::FrameInput;
use sim::avoid::AvoidWorld;
use sim::event::GameEvent;
use sim::level::{Level, LevelError};
use sim::loader::{self, LevelDef};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::{Renderer, Screen};
use ui::sound::SoundEngine;

/// Longest step handed to the simulation, so a stall (terminal resize,
/// suspended process) doesn't tunnel the player through the floor.
const MAX_ELAPSED: Duration = Duration::from_millis(100);
const LOG_FILE: &str = "collect_the_coins.log";

fn main() {
    init_logging();
    let config = GameConfig::load();
    let levels = loader::level_list(&config.levels_dir);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut renderer, sound.as_ref(), &config, &levels);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Collect The Coins!");
}

/// Logging goes to a file, and only when RUST_LOG is set: the terminal
/// belongs to the renderer.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    match std::fs::File::create(LOG_FILE) {
        Ok(file) => {
            env_logger::Builder::from_default_env()
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("Could not open {LOG_FILE}: {e}"),
    }
}

// ── Host state ──

/// A level being played, plus what the HUD needs to know about it.
struct Session {
    index: usize,
    name: String,
    coins_total: usize,
    level: Level,
}

enum Mode {
    Title { error: Option<String> },
    Platformer(Session),
    Avoid(AvoidWorld),
}

fn start_session(levels: &[LevelDef], index: usize, config: &GameConfig) -> Result<Session, LevelError> {
    let def = loader::level_at(levels, index)?;
    let mut level = def.build(&config.level)?;
    level.start();
    log::info!("host: level {} '{}' loaded", index + 1, def.name);
    Ok(Session {
        index,
        name: def.name.clone(),
        coins_total: level.coins().len(),
        level,
    })
}

/// Load a level, or fall back to the title with the error on screen.
fn enter_level(levels: &[LevelDef], index: usize, config: &GameConfig) -> Mode {
    match start_session(levels, index, config) {
        Ok(session) => Mode::Platformer(session),
        Err(e) => {
            log::error!("host: level {} failed to load: {e}", index + 1);
            Mode::Title { error: Some(format!("Level {}: {e}", index + 1)) }
        }
    }
}

fn game_loop(
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    levels: &[LevelDef],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    log::info!("host: {} levels, gamepad connected: {}", levels.len(), gp.connected);

    let mut mode = Mode::Title { error: None };
    let mut last_frame = Instant::now();

    loop {
        let frame_start = Instant::now();
        let elapsed = (frame_start - last_frame).min(MAX_ELAPSED);
        last_frame = frame_start;

        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(&mut mode, &kb, &gp, config, levels) {
            break;
        }

        let input = frame_input(&kb, &gp);
        match &mut mode {
            Mode::Platformer(session) => {
                let events = session.level.update(elapsed, &input, config.orientation);
                process_events(sound, &events);
            }
            Mode::Avoid(world) => {
                let events = world.update(elapsed, &input);
                process_events(sound, &events);
            }
            Mode::Title { .. } => {}
        }

        let screen = match &mode {
            Mode::Title { error } => Screen::Title { levels: levels.len(), error: error.as_deref() },
            Mode::Platformer(s) => Screen::Platformer {
                level: &s.level,
                name: &s.name,
                index: s.index,
                total: levels.len(),
                coins_total: s.coins_total,
            },
            Mode::Avoid(world) => Screen::Avoid { world },
        };
        renderer.render(&screen)?;

        if let Some(rest) = config.frame.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}

fn process_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Sound { effect, volume } => {
                if let Some(sfx) = sound {
                    sfx.play(effect, *volume);
                }
            }
            GameEvent::PlayerKilled => log::info!("host: player killed"),
            GameEvent::ExitReached => log::info!("host: exit reached"),
            GameEvent::TimeExpired => log::info!("host: time expired"),
            GameEvent::GhostHit { hits } => log::debug!("host: ghost hit ({hits})"),
            GameEvent::CoinCollected { .. } | GameEvent::PlayerJumped => {}
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_AVOID: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn frame_input(kb: &InputState, gp: &GamepadState) -> FrameInput {
    FrameInput {
        stick: gp.stick(),
        left: kb.any_active(KEYS_LEFT) || gp.left_held(),
        right: kb.any_active(KEYS_RIGHT) || gp.right_held(),
        up: kb.any_active(KEYS_UP) || gp.up_held(),
        down: kb.any_active(KEYS_DOWN) || gp.down_held(),
        jump: kb.any_active(KEYS_JUMP) || gp.jump_held(),
    }
}

/// Mode transitions driven by menu keys. Returns true to quit.
fn handle_meta(mode: &mut Mode, kb: &InputState, gp: &GamepadState, config: &GameConfig, levels: &[LevelDef]) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();
    let restart = kb.any_pressed(KEYS_RESTART) || gp.restart_pressed();

    let next = match mode {
        // ── Title Screen ──
        Mode::Title { .. } => {
            if confirm {
                Some(enter_level(levels, 0, config))
            } else if kb.any_pressed(KEYS_AVOID) {
                Some(match AvoidWorld::new(&config.avoid, ContentManager::new()) {
                    Ok(world) => Mode::Avoid(world),
                    Err(e) => {
                        log::error!("host: avoid demo failed to load: {e}");
                        Mode::Title { error: Some(e.to_string()) }
                    }
                })
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            } else {
                None
            }
        }

        // ── Platformer ──
        Mode::Platformer(session) => {
            let level = &mut session.level;
            if esc {
                Some(Mode::Title { error: None })
            } else if restart {
                Some(enter_level(levels, session.index, config))
            } else if confirm {
                if !level.player().alive {
                    level.start();
                    None
                } else if level.time_remaining().is_zero() {
                    let index = if level.at_exit() { (session.index + 1) % levels.len() } else { session.index };
                    Some(enter_level(levels, index, config))
                } else {
                    None
                }
            } else {
                None
            }
        }

        // ── Avoid Benny Ball ──
        Mode::Avoid(_) => esc.then_some(Mode::Title { error: None }),
    };

    if let Some(next) = next {
        // Replacing the mode drops the previous level or demo, which
        // releases its content.
        *mode = next;
    }
    false
}
