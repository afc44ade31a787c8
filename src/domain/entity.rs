/// Entities: Player, Coin, and the avoidance demo's SlimeGhost and Ball.
/// Player physics lives in `physics.rs`; this file holds state and the
/// simple per-frame behaviour of the other entities.

use glam::Vec2;

use super::geometry::{Circle, Rect};
use super::tile::{TILE_HEIGHT, TILE_WIDTH};
use crate::config::PhysicsConfig;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Which way the display is held. Analog input is reported in device
/// space, so `LandscapeRight` mirrors the horizontal axis.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Orientation {
    #[default]
    LandscapeLeft,
    LandscapeRight,
    Portrait,
}

/// Per-frame input snapshot. Digital directions win over the stick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Left stick, each axis in [-1, 1], +Y up.
    pub stick: Vec2,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
}

/// Animation the player is showing. Drives which texture is drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pose {
    Idle,
    Run,
    Jump,
    Celebrate,
    Die,
}

// ── Player ──

/// Size of the player's animation frame. The hitbox is derived from it.
pub const PLAYER_FRAME: i32 = 64;

#[derive(Clone, Debug)]
pub struct Player {
    /// Bottom-center of the sprite, in pixels.
    pub position: Vec2,
    pub velocity: Vec2,
    pub alive: bool,
    pub on_ground: bool,
    pub facing: Facing,
    pub pose: Pose,
    pub(super) movement: f32,
    pub(super) is_jumping: bool,
    pub(super) was_jumping: bool,
    pub(super) jump_time: f32,
    pub(super) jump_started: bool,
    pub(super) previous_bottom: f32,
    pub(super) tuning: PhysicsConfig,
}

impl Player {
    pub fn new(position: Vec2, tuning: PhysicsConfig) -> Self {
        let mut p = Player {
            position,
            velocity: Vec2::ZERO,
            alive: true,
            on_ground: false,
            facing: Facing::Left,
            pose: Pose::Idle,
            movement: 0.0,
            is_jumping: false,
            was_jumping: false,
            jump_time: 0.0,
            jump_started: false,
            previous_bottom: 0.0,
            tuning,
        };
        p.reset(position);
        p
    }

    /// Bring the player back to life at `position`, at rest.
    pub fn reset(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.alive = true;
        self.on_ground = false;
        self.previous_bottom = position.y;
        self.pose = Pose::Idle;
        self.jump_time = 0.0;
        self.is_jumping = false;
        self.was_jumping = false;
    }

    pub fn on_killed(&mut self) {
        self.alive = false;
        self.pose = Pose::Die;
    }

    pub fn on_reached_exit(&mut self) {
        self.pose = Pose::Celebrate;
    }

    /// Was a jump launched during the last update? Clears the flag.
    pub fn take_jump_started(&mut self) -> bool {
        std::mem::take(&mut self.jump_started)
    }

    /// Hitbox: a narrow box inside the 64×64 frame, whose origin is the
    /// bottom-center `position`.
    pub fn bounding_rectangle(&self) -> Rect {
        let width = (PLAYER_FRAME as f32 * 0.4) as i32;
        let left = (PLAYER_FRAME - width) / 2;
        let height = (PLAYER_FRAME as f32 * 0.8) as i32;
        let top = PLAYER_FRAME - height;

        let origin_x = (self.position.x - PLAYER_FRAME as f32 / 2.0).round() as i32;
        let origin_y = (self.position.y - PLAYER_FRAME as f32).round() as i32;
        Rect::new(origin_x + left, origin_y + top, width, height)
    }
}

// ── Coin ──

const COIN_BOUNCE_HEIGHT: f32 = 0.18;
const COIN_BOUNCE_RATE: f32 = 3.0;
const COIN_BOUNCE_SYNC: f32 = -0.75;

/// A collectible that bobs in place over its tile.
#[derive(Clone, Debug)]
pub struct Coin {
    base_position: Vec2,
    bounce: f32,
    clock: f32,
}

impl Coin {
    pub fn new(base_position: Vec2) -> Self {
        Coin { base_position, bounce: 0.0, clock: 0.0 }
    }

    pub fn position(&self) -> Vec2 {
        self.base_position + Vec2::new(0.0, self.bounce)
    }

    pub fn bounding_circle(&self) -> Circle {
        Circle::new(self.position(), TILE_WIDTH as f32 / 3.0)
    }

    /// Advance the bob animation. Neighbouring coins are out of phase.
    pub fn update(&mut self, elapsed: f32) {
        self.clock += elapsed;
        let t = self.clock * COIN_BOUNCE_RATE + self.base_position.x * COIN_BOUNCE_SYNC;
        self.bounce = t.sin() * COIN_BOUNCE_HEIGHT * TILE_HEIGHT as f32;
    }
}

// ── Avoidance demo ──

pub const GHOST_START: Vec2 = Vec2::new(200.0, 200.0);
pub const GHOST_RADIUS: f32 = 16.0;
const GHOST_KEY_SPEED: f32 = 5.0;

/// The avoidance demo's player sprite: input maps straight to position.
#[derive(Clone, Debug)]
pub struct SlimeGhost {
    position: Vec2,
    flipped: bool,
    bounds: Circle,
}

impl SlimeGhost {
    pub fn new() -> Self {
        SlimeGhost {
            position: GHOST_START,
            flipped: false,
            bounds: Circle::new(GHOST_START, GHOST_RADIUS),
        }
    }

    pub fn position(&self) -> Vec2 { self.position }
    pub fn flipped(&self) -> bool { self.flipped }
    pub fn bounds(&self) -> Circle { self.bounds }

    pub fn reset(&mut self) {
        self.position = GHOST_START;
        self.bounds.center = self.position;
    }

    /// Stick moves one pixel per frame at full tilt (Y inverted), keys
    /// move five.
    pub fn update(&mut self, input: &FrameInput) {
        self.position += input.stick * Vec2::new(1.0, -1.0);
        if input.stick.x < 0.0 { self.flipped = true; }
        if input.stick.x > 0.0 { self.flipped = false; }

        if input.up { self.position.y -= GHOST_KEY_SPEED; }
        if input.down { self.position.y += GHOST_KEY_SPEED; }
        if input.left {
            self.position.x -= GHOST_KEY_SPEED;
            self.flipped = true;
        }
        if input.right {
            self.position.x += GHOST_KEY_SPEED;
            self.flipped = false;
        }
        self.bounds.center = self.position;
    }
}

impl Default for SlimeGhost {
    fn default() -> Self {
        Self::new()
    }
}

/// A hazard that travels in a straight line and bounces off the arena walls.
#[derive(Clone, Debug)]
pub struct Ball {
    pub bounds: Circle,
    pub velocity: Vec2,
}

impl Ball {
    pub fn new(center: Vec2, radius: f32, velocity: Vec2) -> Self {
        Ball { bounds: Circle::new(center, radius), velocity }
    }

    pub fn update(&mut self, elapsed: f32, arena: Vec2) {
        let r = self.bounds.radius;
        let c = &mut self.bounds.center;
        *c += self.velocity * elapsed;

        if c.x < r {
            c.x = r;
            self.velocity.x = self.velocity.x.abs();
        } else if c.x > arena.x - r {
            c.x = arena.x - r;
            self.velocity.x = -self.velocity.x.abs();
        }
        if c.y < r {
            c.y = r;
            self.velocity.y = self.velocity.y.abs();
        } else if c.y > arena.y - r {
            c.y = arena.y - r;
            self.velocity.y = -self.velocity.y.abs();
        }
    }
}
