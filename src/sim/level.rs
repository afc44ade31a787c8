/// Level: the tile grid plus everything that lives on it.
///
/// ## Description format
///
/// One text line per grid row, all lines the same length:
///
///   '.' = Empty                  'X' = Exit (finish flag)
///   'C' = Coin                   '1' = Player start (exactly one)
///   '~' = Platform (2 variants)  ':' = Passable decoration (2 variants)
///   '#' = Solid block (7 variants)
///
/// Variant visuals are drawn from a generator seeded by the level config,
/// row by row, so the same text and seed always build the same level.
///
/// ## Per-frame state machine
///
///   Frozen  (time is up, or the player is dead): player physics only.
///   AtExit  (exit reached, terminal): the clock drains up to 100× faster.
///   Active  : clock runs, player moves, coins update, exit is checked.

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use crate::config::LevelConfig;
use crate::domain::content::{ContentError, ContentManager, SoundEffect, Texture};
use crate::domain::entity::{Coin, Facing, FrameInput, Orientation, Player, Pose};
use crate::domain::geometry::{Point, Rect};
use crate::domain::physics::TileMap;
use crate::domain::tile::{Block, BlockCollision, TILE_HEIGHT};
use super::event::GameEvent;
use super::paint::Painter;

/// Backgrounds up to and including this layer are drawn behind entities.
pub const ENTITY_LAYER: usize = 3;
const BACKGROUND_LAYERS: usize = 4;

const COIN_VOLUME: f32 = 0.2;
/// How much faster than real time the clock drains after the exit.
const EXIT_DRAIN_RATE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level description is empty")]
    Empty,
    #[error("the length of line {line} is {found}, different from the first line's {expected}")]
    InconsistentRowLength { line: usize, expected: usize, found: usize },
    #[error("unsupported tile type character '{ch}' at position {x}, {y}")]
    UnsupportedTile { ch: char, x: usize, y: usize },
    #[error("level has no player start tile")]
    MissingStart,
    #[error("second player start tile at position {x}, {y}")]
    DuplicateStart { x: usize, y: usize },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("no level {index} in a list of {count}")]
    NoSuchLevel { index: usize, count: usize },
    #[error("could not read level {path}: {source}")]
    Io { path: String, source: std::io::Error },
}

// ══════════════════════════════════════════════════════════════
// Tile parsing
// ══════════════════════════════════════════════════════════════

/// What a level character stands for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileKind {
    Empty,
    Exit,
    Coin,
    Platform,
    Decoration,
    Start,
    Solid,
}

/// Entity registered alongside a tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Spawn {
    Start,
    Exit,
    Coin,
}

/// Result of parsing one character: the cell to place and, optionally,
/// the entity it introduces.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParsedTile {
    pub kind: TileKind,
    pub spawn: Option<Spawn>,
}

pub fn parse_tile(ch: char, x: usize, y: usize) -> Result<ParsedTile, LevelError> {
    let (kind, spawn) = match ch {
        '.' => (TileKind::Empty, None),
        'X' => (TileKind::Exit, Some(Spawn::Exit)),
        'C' => (TileKind::Coin, Some(Spawn::Coin)),
        '~' => (TileKind::Platform, None),
        ':' => (TileKind::Decoration, None),
        '1' => (TileKind::Start, Some(Spawn::Start)),
        '#' => (TileKind::Solid, None),
        _ => return Err(LevelError::UnsupportedTile { ch, x, y }),
    };
    Ok(ParsedTile { kind, spawn })
}

/// Visual source for a tile kind: a fixed asset, a family of numbered
/// variants, or nothing.
enum Look {
    None,
    Fixed(&'static str),
    Variety(&'static str, u32),
}

impl TileKind {
    fn look(self) -> (Look, BlockCollision) {
        match self {
            TileKind::Empty | TileKind::Coin | TileKind::Start => (Look::None, BlockCollision::Passable),
            TileKind::Exit => (Look::Fixed("FinishFlag"), BlockCollision::Passable),
            TileKind::Platform => (Look::Variety("BlockB", 2), BlockCollision::Platform),
            TileKind::Decoration => (Look::Variety("BlockB", 2), BlockCollision::Passable),
            TileKind::Solid => (Look::Variety("BlockA", 7), BlockCollision::Impassable),
        }
    }
}

fn load_block(kind: TileKind, rng: &mut Pcg32, content: &mut ContentManager) -> Result<Block, ContentError> {
    let (look, collision) = kind.look();
    let texture = match look {
        Look::None => None,
        Look::Fixed(name) => Some(content.load_texture(&format!("sprites/blocks/{name}"))?),
        Look::Variety(name, count) => {
            let index = rng.random_range(0..count);
            Some(content.load_texture(&format!("sprites/blocks/{name}{index}"))?)
        }
    };
    Ok(Block::new(texture, collision))
}

// ══════════════════════════════════════════════════════════════
// Tile grid
// ══════════════════════════════════════════════════════════════

/// The static layout: a `[y][x]` array of blocks.
pub struct TileGrid {
    blocks: Vec<Vec<Block>>,
    width: usize,
    height: usize,
}

impl TileGrid {
    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn block(&self, x: usize, y: usize) -> Option<&Block> {
        self.blocks.get(y).and_then(|row| row.get(x))
    }
}

impl TileMap for TileGrid {
    /// Outside the grid horizontally is a wall; above or below it is open
    /// air, so the player can jump past the top and fall out the bottom.
    fn collision(&self, x: i32, y: i32) -> BlockCollision {
        if x < 0 || x >= self.width as i32 {
            return BlockCollision::Impassable;
        }
        if y < 0 || y >= self.height as i32 {
            return BlockCollision::Passable;
        }
        self.blocks[y as usize][x as usize].collision()
    }
}

// ══════════════════════════════════════════════════════════════
// Level
// ══════════════════════════════════════════════════════════════

struct PlayerSprites {
    idle: Texture,
    run: Texture,
    jump: Texture,
    celebrate: Texture,
    die: Texture,
}

impl PlayerSprites {
    fn load(content: &mut ContentManager) -> Result<Self, ContentError> {
        Ok(PlayerSprites {
            idle: content.load_texture("sprites/player/Idle")?,
            run: content.load_texture("sprites/player/Run")?,
            jump: content.load_texture("sprites/player/Jump")?,
            celebrate: content.load_texture("sprites/player/Celebrate")?,
            die: content.load_texture("sprites/player/Die")?,
        })
    }

    fn for_pose(&self, pose: Pose) -> &Texture {
        match pose {
            Pose::Idle => &self.idle,
            Pose::Run => &self.run,
            Pose::Jump => &self.jump,
            Pose::Celebrate => &self.celebrate,
            Pose::Die => &self.die,
        }
    }
}

struct LevelSounds {
    coin_collected: SoundEffect,
    jump: SoundEffect,
    killed: SoundEffect,
    exit_reached: SoundEffect,
}

pub struct Level {
    grid: TileGrid,
    start_position: Vec2,
    exit: Point,
    time_remaining: Duration,
    at_exit: bool,
    coins: Vec<Coin>,
    player: Player,
    backgrounds: Vec<Texture>,
    coin_texture: Texture,
    player_sprites: PlayerSprites,
    sounds: LevelSounds,
    /// Owns every asset above; dropping the level releases them.
    content: ContentManager,
}

impl Level {
    /// Build a level from its rows. Row lengths are checked before any
    /// character is parsed.
    pub fn load<S: AsRef<str>>(rows: &[S], config: &LevelConfig, mut content: ContentManager) -> Result<Self, LevelError> {
        let first = rows.first().ok_or(LevelError::Empty)?;
        let width = first.as_ref().chars().count();
        for (i, row) in rows.iter().enumerate() {
            let found = row.as_ref().chars().count();
            if found != width {
                return Err(LevelError::InconsistentRowLength { line: i + 1, expected: width, found });
            }
        }

        let mut rng = Pcg32::seed_from_u64(config.seed);
        let mut blocks = Vec::with_capacity(rows.len());
        let mut start: Option<Vec2> = None;
        let mut exit = Point::INVALID;
        let mut coins = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            let mut line = Vec::with_capacity(width);
            for (x, ch) in row.as_ref().chars().enumerate() {
                let parsed = parse_tile(ch, x, y)?;
                line.push(load_block(parsed.kind, &mut rng, &mut content)?);

                let bounds = Block::bounds(x as i32, y as i32);
                match parsed.spawn {
                    Some(Spawn::Start) => {
                        if start.is_some() {
                            return Err(LevelError::DuplicateStart { x, y });
                        }
                        start = Some(bounds.bottom_center());
                    }
                    Some(Spawn::Exit) => exit = bounds.center(),
                    Some(Spawn::Coin) => {
                        let c = bounds.center();
                        coins.push(Coin::new(Vec2::new(c.x as f32, c.y as f32)));
                    }
                    None => {}
                }
            }
            blocks.push(line);
        }

        let start_position = start.ok_or(LevelError::MissingStart)?;
        let grid = TileGrid { blocks, width, height: rows.len() };

        let backgrounds = (0..BACKGROUND_LAYERS)
            .map(|i| content.load_texture(&format!("backgrounds/Layer0_{i}")))
            .collect::<Result<Vec<_>, _>>()?;
        let coin_texture = content.load_texture("sprites/coin")?;
        let player_sprites = PlayerSprites::load(&mut content)?;
        let sounds = LevelSounds {
            coin_collected: content.load_sound("sounds/coinPickup")?,
            jump: content.load_sound("sounds/playerJump")?,
            killed: content.load_sound("sounds/playerKilled")?,
            exit_reached: content.load_sound("sounds/exitReached")?,
        };

        log::debug!(
            "level: {}x{} tiles, {} coins, exit {:?}, seed {}",
            grid.width, grid.height, coins.len(), exit, config.seed,
        );

        Ok(Level {
            grid,
            start_position,
            exit,
            time_remaining: config.time_limit,
            at_exit: false,
            coins,
            player: Player::new(start_position, config.physics),
            backgrounds,
            coin_texture,
            player_sprites,
            sounds,
            content,
        })
    }

    // ── Queries ──

    pub fn width(&self) -> usize { self.grid.width }
    pub fn height(&self) -> usize { self.grid.height }
    pub fn grid(&self) -> &TileGrid { &self.grid }
    pub fn start_position(&self) -> Vec2 { self.start_position }
    /// Pixel center of the exit tile, or `Point::INVALID`.
    pub fn exit(&self) -> Point { self.exit }
    pub fn time_remaining(&self) -> Duration { self.time_remaining }
    pub fn at_exit(&self) -> bool { self.at_exit }
    pub fn coins(&self) -> &[Coin] { &self.coins }
    pub fn player(&self) -> &Player { &self.player }
    /// Assets currently held by this level.
    pub fn loaded_assets(&self) -> usize { self.content.loaded_count() }

    pub fn collision(&self, x: i32, y: i32) -> BlockCollision {
        self.grid.collision(x, y)
    }

    pub fn bounds(&self, x: i32, y: i32) -> Rect {
        Block::bounds(x, y)
    }

    // ── Lifecycle ──

    /// Put the player back at the start, alive and at rest. The grid,
    /// coins and clock are untouched.
    pub fn start(&mut self) {
        self.player.reset(self.start_position);
    }

    pub fn update(&mut self, elapsed: Duration, input: &FrameInput, orientation: Orientation) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let dt = elapsed.as_secs_f32();

        if self.time_remaining.is_zero() {
            self.player.apply_physics(dt, &self.grid);
        } else if self.at_exit {
            let drain = (elapsed.as_secs_f64() * EXIT_DRAIN_RATE)
                .round()
                .min(self.time_remaining.as_secs_f64().ceil());
            self.time_remaining = self.time_remaining.saturating_sub(Duration::from_secs_f64(drain));
        } else {
            self.time_remaining = self.time_remaining.saturating_sub(elapsed);
            self.player.update(dt, input, orientation, &self.grid);
            if self.player.take_jump_started() {
                events.push(GameEvent::PlayerJumped);
                events.push(GameEvent::Sound { effect: self.sounds.jump.clone(), volume: 1.0 });
            }

            self.update_coins(dt, &mut events);

            let bounds = self.player.bounding_rectangle();
            if self.player.alive && bounds.top() >= self.grid.height as i32 * TILE_HEIGHT {
                self.on_player_killed(&mut events);
            }

            if self.player.alive && self.player.on_ground && bounds.contains(self.exit) {
                self.on_exit_reached(&mut events);
            }

            if self.time_remaining.is_zero() {
                events.push(GameEvent::TimeExpired);
            }
        }

        events
    }

    /// Animate every coin once and collect the ones touching the player.
    fn update_coins(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let player_bounds = self.player.bounding_rectangle();
        let sound = &self.sounds.coin_collected;
        self.coins.retain_mut(|coin| {
            coin.update(dt);
            if coin.bounding_circle().collides_with_rect(&player_bounds) {
                let p = coin.position();
                events.push(GameEvent::CoinCollected { x: p.x, y: p.y });
                events.push(GameEvent::Sound { effect: sound.clone(), volume: COIN_VOLUME });
                false
            } else {
                true
            }
        });
    }

    fn on_player_killed(&mut self, events: &mut Vec<GameEvent>) {
        self.player.on_killed();
        log::debug!("level: player killed at {:?}", self.player.position);
        events.push(GameEvent::PlayerKilled);
        events.push(GameEvent::Sound { effect: self.sounds.killed.clone(), volume: 1.0 });
    }

    /// The exit only counts once every coin is gone.
    fn on_exit_reached(&mut self, events: &mut Vec<GameEvent>) {
        if !self.coins.is_empty() {
            return;
        }
        self.player.on_reached_exit();
        self.at_exit = true;
        log::info!("level: exit reached with {:?} left", self.time_remaining);
        events.push(GameEvent::ExitReached);
        events.push(GameEvent::Sound { effect: self.sounds.exit_reached.clone(), volume: 1.0 });
    }

    // ── Drawing ──

    /// Back layers, tiles, coins, player, front layers.
    pub fn draw(&self, target: &mut impl Painter) {
        for layer in &self.backgrounds[..=ENTITY_LAYER] {
            target.background(layer);
        }

        self.draw_blocks(target);

        for coin in &self.coins {
            target.sprite(coin.position(), &self.coin_texture, false);
        }

        let flipped = self.player.facing == Facing::Left;
        target.sprite(self.player.position, self.player_sprites.for_pose(self.player.pose), flipped);

        for layer in &self.backgrounds[ENTITY_LAYER + 1..] {
            target.background(layer);
        }
    }

    fn draw_blocks(&self, target: &mut impl Painter) {
        for (y, row) in self.grid.blocks.iter().enumerate() {
            for (x, block) in row.iter().enumerate() {
                if let Some(texture) = block.texture() {
                    target.tile(x, y, texture);
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{builtin_asset, AssetDef};
    use crate::sim::paint::{DrawCall, Recorder};
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_millis(20);

    fn level(rows: &[&str]) -> Level {
        Level::load(rows, &LevelConfig::default(), ContentManager::new()).unwrap()
    }

    fn load_err(rows: &[&str]) -> LevelError {
        match Level::load(rows, &LevelConfig::default(), ContentManager::new()) {
            Ok(_) => panic!("expected load error"),
            Err(e) => e,
        }
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn walk_right() -> FrameInput {
        FrameInput { right: true, ..Default::default() }
    }

    fn step(level: &mut Level, input: FrameInput) -> Vec<GameEvent> {
        level.update(FRAME, &input, Orientation::LandscapeLeft)
    }

    fn player_on_exit(level: &Level) -> bool {
        let p = level.player();
        p.alive && p.on_ground && p.bounding_rectangle().contains(level.exit())
    }

    // ── Construction ──

    #[test]
    fn dimensions_follow_rows() {
        let lvl = level(&["......", ".1....", "######"]);
        assert_eq!(lvl.width(), 6);
        assert_eq!(lvl.height(), 3);
        assert_eq!(lvl.time_remaining(), Duration::from_secs(45));
        assert!(!lvl.at_exit());
    }

    #[test]
    fn ragged_row_fails_with_line_number() {
        match load_err(&["....", ".1..", "###"]) {
            LevelError::InconsistentRowLength { line, expected, found } => {
                assert_eq!((line, expected, found), (3, 4, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_check_runs_before_tile_parsing() {
        assert!(matches!(load_err(&["?...", ".1."]), LevelError::InconsistentRowLength { .. }));
    }

    #[test]
    fn unknown_character_is_a_tile_error() {
        match load_err(&["....", ".1?.", "####"]) {
            LevelError::UnsupportedTile { ch, x, y } => assert_eq!((ch, x, y), ('?', 2, 1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tile_error_message_names_char_and_position() {
        let msg = load_err(&[".1.", "..@"]).to_string();
        assert!(msg.contains("'@'"));
        assert!(msg.contains("2, 1"));
    }

    #[test]
    fn empty_missing_and_duplicate_start() {
        let none: [&str; 0] = [];
        assert!(matches!(load_err(&none), LevelError::Empty));
        assert!(matches!(load_err(&["...", "###"]), LevelError::MissingStart));
        assert!(matches!(load_err(&["1.1", "###"]), LevelError::DuplicateStart { x: 2, y: 0 }));
    }

    #[test]
    fn parse_table() {
        let cases = [
            ('.', TileKind::Empty, None),
            ('X', TileKind::Exit, Some(Spawn::Exit)),
            ('C', TileKind::Coin, Some(Spawn::Coin)),
            ('~', TileKind::Platform, None),
            (':', TileKind::Decoration, None),
            ('1', TileKind::Start, Some(Spawn::Start)),
            ('#', TileKind::Solid, None),
        ];
        for (ch, kind, spawn) in cases {
            assert_eq!(parse_tile(ch, 0, 0).unwrap(), ParsedTile { kind, spawn });
        }
    }

    #[test]
    fn collision_classes_per_character() {
        let lvl = level(&["1XC~:#."]);
        let expected = [
            BlockCollision::Passable,
            BlockCollision::Passable,
            BlockCollision::Passable,
            BlockCollision::Platform,
            BlockCollision::Passable,
            BlockCollision::Impassable,
            BlockCollision::Passable,
        ];
        for (x, want) in expected.iter().enumerate() {
            assert_eq!(lvl.collision(x as i32, 0), *want, "column {x}");
        }
        let grid = lvl.grid();
        assert!(grid.block(0, 0).unwrap().texture().is_none());
        assert_eq!(grid.block(1, 0).unwrap().texture().unwrap().name(), "sprites/blocks/FinishFlag");
        assert!(grid.block(2, 0).unwrap().texture().is_none());
        assert!(grid.block(3, 0).unwrap().texture().unwrap().name().starts_with("sprites/blocks/BlockB"));
        assert!(grid.block(4, 0).unwrap().texture().unwrap().name().starts_with("sprites/blocks/BlockB"));
        assert!(grid.block(5, 0).unwrap().texture().unwrap().name().starts_with("sprites/blocks/BlockA"));
        assert!(grid.block(6, 0).unwrap().texture().is_none());
    }

    #[test]
    fn start_exit_and_coin_positions() {
        let lvl = level(&["..C.", ".1.X", "####"]);
        assert_eq!(lvl.start_position(), Vec2::new(60.0, 64.0));
        assert_eq!(lvl.player().position, lvl.start_position());
        assert_eq!(lvl.exit(), Point::new(140, 48));
        assert_eq!(lvl.coins().len(), 1);
        assert_eq!(lvl.coins()[0].position(), Vec2::new(100.0, 16.0));
    }

    #[test]
    fn missing_exit_keeps_sentinel() {
        let lvl = level(&[".1.", "###"]);
        assert_eq!(lvl.exit(), Point::INVALID);
    }

    #[test]
    fn same_seed_same_variants() {
        let rows = ["##########"; 10];
        let names = |seed: u64| -> Vec<String> {
            let mut rows = rows.to_vec();
            rows[0] = "1#########";
            let lvl = Level::load(&rows, &LevelConfig::with_seed(seed), ContentManager::new()).unwrap();
            let mut out = Vec::new();
            for y in 0..lvl.height() {
                for x in 0..lvl.width() {
                    if let Some(t) = lvl.grid().block(x, y).and_then(|b| b.texture()) {
                        out.push(t.name().to_string());
                    }
                }
            }
            out
        };
        assert_eq!(names(1), names(1));
        assert_ne!(names(1), names(2));
    }

    #[test]
    fn missing_asset_propagates() {
        fn no_flag(name: &str) -> Option<AssetDef> {
            if name == "sprites/blocks/FinishFlag" { None } else { builtin_asset(name) }
        }
        let err = Level::load(&[".1X", "###"], &LevelConfig::default(), ContentManager::with_catalog(no_flag));
        match err {
            Err(LevelError::Content(ContentError::NotFound(name))) => {
                assert_eq!(name, "sprites/blocks/FinishFlag");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected content error"),
        }
    }

    // ── Collision query edge policy ──

    #[test]
    fn out_of_bounds_policy() {
        let lvl = level(&["...", ".1.", "###"]);
        assert_eq!(lvl.collision(-1, 1), BlockCollision::Impassable);
        assert_eq!(lvl.collision(3, 1), BlockCollision::Impassable);
        assert_eq!(lvl.collision(-1, -5), BlockCollision::Impassable);
        assert_eq!(lvl.collision(1, -1), BlockCollision::Passable);
        assert_eq!(lvl.collision(1, 3), BlockCollision::Passable);
        assert_eq!(lvl.collision(1, 2), BlockCollision::Impassable);
        assert_eq!(lvl.bounds(1, 2), Rect::new(40, 64, 40, 32));
    }

    fn level_strategy() -> impl Strategy<Value = Vec<String>> {
        (1usize..12, 1usize..10).prop_flat_map(|(w, h)| {
            (
                prop::collection::vec(prop::sample::select(vec!['.', 'X', 'C', '~', ':', '#']), w * h),
                0..w * h,
            ).prop_map(move |(mut cells, start)| -> Vec<String> {
                cells[start] = '1';
                cells.chunks(w).map(|row| row.iter().collect()).collect()
            })
        })
    }

    proptest! {
        #[test]
        fn dimensions_match_any_valid_description(rows in level_strategy()) {
            let lvl = Level::load(&rows, &LevelConfig::default(), ContentManager::new()).unwrap();
            prop_assert_eq!(lvl.width(), rows[0].len());
            prop_assert_eq!(lvl.height(), rows.len());
        }

        #[test]
        fn outside_x_is_always_a_wall(rows in level_strategy(), dx in 0i32..50, y in -50i32..50) {
            let lvl = Level::load(&rows, &LevelConfig::default(), ContentManager::new()).unwrap();
            let w = lvl.width() as i32;
            prop_assert_eq!(lvl.collision(-1 - dx, y), BlockCollision::Impassable);
            prop_assert_eq!(lvl.collision(w + dx, y), BlockCollision::Impassable);
        }

        #[test]
        fn outside_y_is_always_open(rows in level_strategy(), x in 0usize..12, dy in 0i32..50) {
            let lvl = Level::load(&rows, &LevelConfig::default(), ContentManager::new()).unwrap();
            let x = (x % lvl.width()) as i32;
            let h = lvl.height() as i32;
            prop_assert_eq!(lvl.collision(x, -1 - dy), BlockCollision::Passable);
            prop_assert_eq!(lvl.collision(x, h + dy), BlockCollision::Passable);
        }

        #[test]
        fn any_ragged_row_fails(rows in level_strategy(), pick in 0usize..10, extra in 1usize..4) {
            prop_assume!(rows.len() > 1);
            let mut rows = rows;
            let i = 1 + pick % (rows.len() - 1);
            rows[i].push_str(&".".repeat(extra));
            let err = Level::load(&rows, &LevelConfig::default(), ContentManager::new());
            let ragged = matches!(err, Err(LevelError::InconsistentRowLength { .. }));
            prop_assert!(ragged, "got {:?}", err.err());
        }
    }

    // ── Exit ──

    #[test]
    fn reaches_exit_the_first_frame_it_is_occupied() {
        let mut lvl = level(&["......", ".1.X..", "######"]);
        let mut reached = false;
        for _ in 0..200 {
            let events = step(&mut lvl, walk_right());
            if lvl.at_exit() {
                assert!(player_on_exit(&lvl));
                assert!(events.iter().any(|e| matches!(e, GameEvent::ExitReached)));
                reached = true;
                break;
            }
            assert!(!player_on_exit(&lvl));
        }
        assert!(reached);
        assert_eq!(lvl.player().pose, Pose::Celebrate);
    }

    #[test]
    fn at_exit_is_terminal_and_freezes_the_player() {
        let mut lvl = level(&["......", ".1.X..", "######"]);
        while !lvl.at_exit() {
            step(&mut lvl, walk_right());
        }
        let pos = lvl.player().position;
        for _ in 0..5 {
            step(&mut lvl, walk_right());
            assert!(lvl.at_exit());
            assert_eq!(lvl.player().position, pos);
        }
    }

    /// Walk right until standing on the exit tile, then let the player stop.
    fn walk_onto_exit(lvl: &mut Level) {
        for _ in 0..200 {
            step(lvl, walk_right());
            if lvl.player().bounding_rectangle().contains(lvl.exit()) {
                break;
            }
        }
        for _ in 0..30 {
            step(lvl, idle());
        }
    }

    #[test]
    fn remaining_coin_blocks_the_exit() {
        let mut lvl = level(&["C.....", ".1.X..", "######"]);
        walk_onto_exit(&mut lvl);
        assert!(player_on_exit(&lvl));
        assert_eq!(lvl.coins().len(), 1);
        assert!(!lvl.at_exit());
    }

    #[test]
    fn collecting_the_coin_opens_the_exit() {
        let mut lvl = level(&["......", ".1CX..", "######"]);
        let mut collected = false;
        for _ in 0..200 {
            let events = step(&mut lvl, walk_right());
            if events.iter().any(|e| matches!(e, GameEvent::CoinCollected { .. })) {
                assert!(events.iter().any(|e| matches!(
                    e,
                    GameEvent::Sound { effect, volume } if effect.name() == "sounds/coinPickup" && *volume == 0.2
                )));
                collected = true;
            }
            if lvl.at_exit() {
                break;
            }
        }
        assert!(collected);
        assert!(lvl.coins().is_empty());
        assert!(lvl.at_exit());
    }

    #[test]
    fn overlapping_coins_are_all_collected_in_one_frame() {
        let mut lvl = level(&["CCC.", "....", ".1..", "####"]);
        // Hitbox spans x 67..92, y -1..50: touches the coins at columns 1 and 2.
        lvl.player.position = Vec2::new(80.0, 50.0);
        let events = step(&mut lvl, idle());
        let picked = events.iter().filter(|e| matches!(e, GameEvent::CoinCollected { .. })).count();
        assert_eq!(picked, 2);
        assert_eq!(lvl.coins().len(), 1);
        assert_eq!(lvl.coins()[0].position().x, 20.0);
    }

    // ── Timer ──

    #[test]
    fn clock_runs_out_after_time_limit() {
        let mut lvl = level(&["....", ".1..", "####"]);
        for i in 0..2250 {
            let events = step(&mut lvl, idle());
            let expired = events.iter().any(|e| matches!(e, GameEvent::TimeExpired));
            assert_eq!(expired, i == 2249);
        }
        assert_eq!(lvl.time_remaining(), Duration::ZERO);
        assert!(lvl.player().alive);

        for _ in 0..10 {
            assert!(step(&mut lvl, walk_right()).is_empty());
            assert_eq!(lvl.time_remaining(), Duration::ZERO);
        }
    }

    #[test]
    fn step_longer_than_remaining_clamps_at_zero() {
        let mut lvl = level(&["....", ".1..", "####"]);
        lvl.time_remaining = Duration::from_millis(10);
        let events = step(&mut lvl, idle());
        assert_eq!(lvl.time_remaining(), Duration::ZERO);
        assert!(events.iter().any(|e| matches!(e, GameEvent::TimeExpired)));
    }

    #[test]
    fn exit_drains_clock_fast() {
        let mut lvl = level(&["......", ".1.X..", "######"]);
        while !lvl.at_exit() {
            step(&mut lvl, walk_right());
        }
        let before = lvl.time_remaining();
        assert!(before > Duration::from_secs(40));

        // 20ms × 100 = 2 whole seconds per frame
        step(&mut lvl, idle());
        assert_eq!(lvl.time_remaining(), before - Duration::from_secs(2));

        for _ in 0..30 {
            step(&mut lvl, idle());
        }
        assert_eq!(lvl.time_remaining(), Duration::ZERO);
        assert!(lvl.at_exit());
    }

    // ── Death and restart ──

    #[test]
    fn falling_out_of_the_grid_kills() {
        let mut lvl = level(&["....", ".1..", "#..#"]);
        let mut killed = false;
        for _ in 0..120 {
            let events = step(&mut lvl, idle());
            if events.iter().any(|e| matches!(e, GameEvent::PlayerKilled)) {
                killed = true;
                break;
            }
        }
        assert!(killed);
        assert!(!lvl.player().alive);
        assert_eq!(lvl.player().pose, Pose::Die);

        // The clock keeps running while dead and the body keeps falling,
        // without a second kill.
        let t = lvl.time_remaining();
        let (x, y) = (lvl.player().position.x, lvl.player().position.y);
        let events = step(&mut lvl, walk_right());
        assert_eq!(lvl.time_remaining(), t - FRAME);
        assert_eq!(lvl.player().position.x, x);
        assert!(lvl.player().position.y > y);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerKilled)));

        lvl.start();
        assert!(lvl.player().alive);
        assert_eq!(lvl.player().position, lvl.start_position());
    }

    #[test]
    fn revived_player_stands_on_a_platform_start() {
        let mut lvl = level(&["....", ".1..", "~~~~", "...."]);
        for _ in 0..30 {
            step(&mut lvl, idle());
        }
        assert!(lvl.player().on_ground);
        let standing = lvl.player().position;

        // Drop the body below the grid so the last frame's bottom is far
        // under the platform.
        lvl.player.position.y = 400.0;
        let events = step(&mut lvl, idle());
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlayerKilled)));

        lvl.start();
        for _ in 0..30 {
            step(&mut lvl, idle());
        }
        assert!(lvl.player().alive);
        assert!(lvl.player().on_ground);
        assert_eq!(lvl.player().position, standing);
    }

    #[test]
    fn start_keeps_coins_and_clock() {
        let mut lvl = level(&["C...", ".1..", "####"]);
        for _ in 0..20 {
            step(&mut lvl, walk_right());
        }
        let t = lvl.time_remaining();
        lvl.start();
        assert_eq!(lvl.player().position, lvl.start_position());
        assert_eq!(lvl.coins().len(), 1);
        assert_eq!(lvl.time_remaining(), t);
    }

    #[test]
    fn jump_emits_sound() {
        let mut lvl = level(&["....", "....", ".1..", "####"]);
        step(&mut lvl, idle());
        let events = step(&mut lvl, FrameInput { jump: true, ..Default::default() });
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlayerJumped)));
    }

    // ── Drawing ──

    #[test]
    fn draw_order_is_layered() {
        let lvl = level(&["#X", "1C"]);
        let mut rec = Recorder::default();
        lvl.draw(&mut rec);

        let calls = rec.calls;
        assert_eq!(calls.len(), 4 + 2 + 1 + 1);
        for (i, call) in calls[..4].iter().enumerate() {
            assert_eq!(*call, DrawCall::Background(format!("backgrounds/Layer0_{i}")));
        }
        assert!(matches!(&calls[4], DrawCall::Tile(0, 0, name) if name.starts_with("sprites/blocks/BlockA")));
        assert_eq!(calls[5], DrawCall::Tile(1, 0, "sprites/blocks/FinishFlag".into()));
        assert_eq!(calls[6], DrawCall::Sprite("sprites/coin".into()));
        assert_eq!(calls[7], DrawCall::Sprite("sprites/player/Idle".into()));
    }

    #[test]
    fn collected_coins_are_not_drawn() {
        let mut lvl = level(&["......", ".1CX..", "######"]);
        while !lvl.coins().is_empty() {
            step(&mut lvl, walk_right());
        }
        let mut rec = Recorder::default();
        lvl.draw(&mut rec);
        assert!(!rec.calls.contains(&DrawCall::Sprite("sprites/coin".into())));
    }
}
