/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::entity::Orientation;
use crate::sim::avoid::ARENA;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub frame: Duration,
    pub level: LevelConfig,
    pub avoid: AvoidConfig,
    pub gamepad: GamepadConfig,
    pub orientation: Orientation,
    pub levels_dir: PathBuf,
}

/// Everything a level needs besides its text: the variant seed, the
/// starting clock and the player's physics.
#[derive(Clone, Debug)]
pub struct LevelConfig {
    pub seed: u64,
    pub time_limit: Duration,
    pub physics: PhysicsConfig,
}

#[cfg(test)]
impl LevelConfig {
    pub fn with_seed(seed: u64) -> Self {
        LevelConfig { seed, ..Self::default() }
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        LevelConfig {
            seed: default_seed(),
            time_limit: Duration::from_secs(default_time_limit()),
            physics: PhysicsConfig::default(),
        }
    }
}

/// Player movement tuning, in pixels and seconds.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub move_acceleration: f32,
    pub max_move_speed: f32,
    pub ground_drag: f32,
    pub air_drag: f32,
    pub max_jump_time: f32,
    pub jump_launch_velocity: f32,
    pub jump_control_power: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub stick_deadzone: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            move_acceleration: 13000.0,
            max_move_speed: 1750.0,
            ground_drag: 0.48,
            air_drag: 0.58,
            max_jump_time: 0.35,
            jump_launch_velocity: -3500.0,
            jump_control_power: 0.14,
            gravity: 3400.0,
            max_fall_speed: 550.0,
            stick_deadzone: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AvoidConfig {
    pub seed: u64,
    pub balls: usize,
    pub ball_speed: f32,
    pub ball_radius: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    level: TomlLevel,
    #[serde(default)]
    physics: PhysicsConfig,
    #[serde(default)]
    avoid: TomlAvoid,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default)]
    orientation: TomlOrientation,
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum TomlOrientation {
    #[default]
    LandscapeLeft,
    LandscapeRight,
    Portrait,
}

#[derive(Deserialize, Debug)]
struct TomlLevel {
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default = "default_time_limit")]
    time_limit_secs: u64,
}

#[derive(Deserialize, Debug)]
struct TomlAvoid {
    #[serde(default = "default_avoid_seed")]
    seed: u64,
    #[serde(default = "default_balls")]
    balls: usize,
    #[serde(default = "default_ball_speed")]
    ball_speed: f32,
    #[serde(default = "default_ball_radius")]
    ball_radius: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

// ── Defaults ──

/// Balls must fit the arena's height, or they have nowhere to spawn.
const MAX_BALL_RADIUS: f32 = ARENA.y / 2.0;
const MAX_BALLS: usize = 64;

fn default_levels_dir() -> String { "levels".into() }
fn default_frame_ms() -> u64 { 16 }      // ~60 fps
fn default_seed() -> u64 { 354668 }
fn default_time_limit() -> u64 { 45 }
fn default_avoid_seed() -> u64 { 2021 }
fn default_balls() -> usize { 3 }
fn default_ball_speed() -> f32 { 160.0 }
fn default_ball_radius() -> f32 { 16.0 }

fn default_jump() -> Vec<String> { vec!["A".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            frame_ms: default_frame_ms(),
            orientation: TomlOrientation::default(),
        }
    }
}

impl Default for TomlLevel {
    fn default() -> Self {
        TomlLevel {
            seed: default_seed(),
            time_limit_secs: default_time_limit(),
        }
    }
}

impl Default for TomlAvoid {
    fn default() -> Self {
        TomlAvoid {
            seed: default_avoid_seed(),
            balls: default_balls(),
            ball_speed: default_ball_speed(),
            ball_radius: default_ball_radius(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

impl From<TomlOrientation> for Orientation {
    fn from(o: TomlOrientation) -> Self {
        match o {
            TomlOrientation::LandscapeLeft => Orientation::LandscapeLeft,
            TomlOrientation::LandscapeRight => Orientation::LandscapeRight,
            TomlOrientation::Portrait => Orientation::Portrait,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Build a config from TOML text, resolving paths against the CWD.
    #[cfg(test)]
    fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(cfg, &[PathBuf::from(".")]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            frame: Duration::from_millis(toml_cfg.general.frame_ms.max(1)),
            level: LevelConfig {
                seed: toml_cfg.level.seed,
                time_limit: Duration::from_secs(toml_cfg.level.time_limit_secs),
                physics: validate_physics(toml_cfg.physics),
            },
            avoid: validate_avoid(toml_cfg.avoid),
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
            },
            orientation: toml_cfg.general.orientation.into(),
            levels_dir,
        }
    }
}

// ── Range checks ──

/// Keep `value` when `valid` accepts it, otherwise warn and use `default`.
fn validated<T: Copy + std::fmt::Display>(key: &str, value: T, default: T, valid: impl Fn(T) -> bool) -> T {
    if valid(value) {
        value
    } else {
        log::warn!("config: {key} = {value} is out of range, using {default}");
        default
    }
}

fn validate_physics(p: PhysicsConfig) -> PhysicsConfig {
    let d = PhysicsConfig::default();
    let finite = |v: f32| v.is_finite();
    let positive = |v: f32| v.is_finite() && v > 0.0;
    let unit = |v: f32| (0.0..=1.0).contains(&v);

    PhysicsConfig {
        move_acceleration: validated("physics.move_acceleration", p.move_acceleration, d.move_acceleration, finite),
        max_move_speed: validated("physics.max_move_speed", p.max_move_speed, d.max_move_speed, positive),
        ground_drag: validated("physics.ground_drag", p.ground_drag, d.ground_drag, unit),
        air_drag: validated("physics.air_drag", p.air_drag, d.air_drag, unit),
        max_jump_time: validated("physics.max_jump_time", p.max_jump_time, d.max_jump_time, positive),
        jump_launch_velocity: validated("physics.jump_launch_velocity", p.jump_launch_velocity, d.jump_launch_velocity, finite),
        jump_control_power: validated("physics.jump_control_power", p.jump_control_power, d.jump_control_power, finite),
        gravity: validated("physics.gravity", p.gravity, d.gravity, finite),
        max_fall_speed: validated("physics.max_fall_speed", p.max_fall_speed, d.max_fall_speed, positive),
        stick_deadzone: validated("physics.stick_deadzone", p.stick_deadzone, d.stick_deadzone, unit),
    }
}

fn validate_avoid(a: TomlAvoid) -> AvoidConfig {
    AvoidConfig {
        seed: a.seed,
        balls: validated("avoid.balls", a.balls, default_balls(), |n| n <= MAX_BALLS),
        ball_speed: validated("avoid.ball_speed", a.ball_speed, default_ball_speed(), |v| v.is_finite() && v >= 0.0),
        ball_radius: validated("avoid.ball_radius", a.ball_radius, default_ball_radius(), |r| r > 0.0 && r < MAX_BALL_RADIUS),
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
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
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        log::info!("config: loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("config: {} parse error, using defaults: {e}", path.display());
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("config: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
