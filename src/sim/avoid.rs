/// AvoidBennyBall: steer the slime ghost around bouncing balls.
///
/// Balls are spawned from a seeded generator, away from the ghost's start,
/// and bounce inside a fixed arena. Touching one sends the ghost back to
/// its start, counts a hit, restarts the survival clock and flashes the
/// ghost red for a moment.

use std::f32::consts::TAU;
use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::AvoidConfig;
use crate::domain::content::{ContentError, ContentManager, SoundEffect, Texture};
use crate::domain::entity::{Ball, FrameInput, SlimeGhost, GHOST_RADIUS, GHOST_START};
use super::event::GameEvent;
use super::paint::Painter;

/// Play area in pixels.
pub const ARENA: Vec2 = Vec2::new(800.0, 480.0);
const HIT_FLASH: Duration = Duration::from_millis(300);
/// Balls spawn at least this many ghost radii from the ghost's start.
const SPAWN_CLEARANCE: f32 = 6.0;
const SPAWN_ATTEMPTS: usize = 32;

pub struct AvoidWorld {
    ghost: SlimeGhost,
    balls: Vec<Ball>,
    hits: u32,
    survival: Duration,
    best: Duration,
    flash: Duration,
    background: Texture,
    ghost_texture: Texture,
    ghost_hit_texture: Texture,
    ball_texture: Texture,
    hit_sound: SoundEffect,
    content: ContentManager,
}

impl AvoidWorld {
    pub fn new(config: &AvoidConfig, mut content: ContentManager) -> Result<Self, ContentError> {
        let background = content.load_texture("backgrounds/Layer0_0")?;
        let ghost_texture = content.load_texture("sprites/slime")?;
        let ghost_hit_texture = content.load_texture("sprites/slimeHit")?;
        let ball_texture = content.load_texture("sprites/ball")?;
        let hit_sound = content.load_sound("sounds/ghostHit")?;

        let balls = spawn_balls(config);
        log::debug!("avoid: {} balls, seed {}", balls.len(), config.seed);

        Ok(AvoidWorld {
            ghost: SlimeGhost::new(),
            balls,
            hits: 0,
            survival: Duration::ZERO,
            best: Duration::ZERO,
            flash: Duration::ZERO,
            background,
            ghost_texture,
            ghost_hit_texture,
            ball_texture,
            hit_sound,
            content,
        })
    }

    pub fn ghost(&self) -> &SlimeGhost { &self.ghost }
    pub fn balls(&self) -> &[Ball] { &self.balls }
    pub fn hits(&self) -> u32 { self.hits }
    /// Time since the last hit (or since the start).
    pub fn survival(&self) -> Duration { self.survival }
    pub fn best(&self) -> Duration { self.best }
    pub fn flashing(&self) -> bool { !self.flash.is_zero() }

    pub fn update(&mut self, elapsed: Duration, input: &FrameInput) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let dt = elapsed.as_secs_f32();

        self.ghost.update(input);
        for ball in &mut self.balls {
            ball.update(dt, ARENA);
        }

        self.flash = self.flash.saturating_sub(elapsed);
        self.survival += elapsed;
        self.best = self.best.max(self.survival);

        let ghost = self.ghost.bounds();
        if self.balls.iter().any(|b| b.bounds.collides_with_circle(&ghost)) {
            self.hits += 1;
            self.ghost.reset();
            self.survival = Duration::ZERO;
            self.flash = HIT_FLASH;
            log::debug!("avoid: hit #{}", self.hits);
            events.push(GameEvent::GhostHit { hits: self.hits });
            events.push(GameEvent::Sound { effect: self.hit_sound.clone(), volume: 1.0 });
        }

        events
    }

    pub fn draw(&self, target: &mut impl Painter) {
        target.background(&self.background);
        for ball in &self.balls {
            target.sprite(ball.bounds.center, &self.ball_texture, false);
        }
        let texture = if self.flashing() { &self.ghost_hit_texture } else { &self.ghost_texture };
        target.sprite(self.ghost.position(), texture, self.ghost.flipped());
    }

    /// Assets currently held by the demo.
    pub fn loaded_assets(&self) -> usize { self.content.loaded_count() }
}

fn spawn_balls(config: &AvoidConfig) -> Vec<Ball> {
    let mut rng = Pcg32::seed_from_u64(config.seed);
    let r = config.ball_radius;
    let clearance = SPAWN_CLEARANCE * GHOST_RADIUS + r;

    (0..config.balls)
        .map(|_| {
            let mut center = Vec2::ZERO;
            for _ in 0..SPAWN_ATTEMPTS {
                center = Vec2::new(
                    rng.random_range(r..=ARENA.x - r),
                    rng.random_range(r..=ARENA.y - r),
                );
                if center.distance(GHOST_START) >= clearance {
                    break;
                }
            }
            let angle = rng.random_range(0.0..TAU);
            Ball::new(center, r, Vec2::from_angle(angle) * config.ball_speed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::paint::{DrawCall, Recorder};

    const FRAME: Duration = Duration::from_millis(20);

    fn config() -> AvoidConfig {
        AvoidConfig { seed: 2021, balls: 3, ball_speed: 160.0, ball_radius: 16.0 }
    }

    fn world() -> AvoidWorld {
        AvoidWorld::new(&config(), ContentManager::new()).unwrap()
    }

    #[test]
    fn spawns_balls_inside_arena_away_from_ghost() {
        let w = world();
        assert_eq!(w.balls().len(), 3);
        for b in w.balls() {
            let c = b.bounds.center;
            assert!(c.x >= 16.0 && c.x <= ARENA.x - 16.0);
            assert!(c.y >= 16.0 && c.y <= ARENA.y - 16.0);
            assert!(!b.bounds.collides_with_circle(&w.ghost().bounds()));
            assert!((b.velocity.length() - 160.0).abs() < 1e-2);
        }
    }

    #[test]
    fn same_seed_same_balls() {
        let a = world();
        let b = world();
        for (x, y) in a.balls().iter().zip(b.balls()) {
            assert_eq!(x.bounds.center, y.bounds.center);
            assert_eq!(x.velocity, y.velocity);
        }
    }

    #[test]
    fn balls_stay_in_arena() {
        let mut w = world();
        for _ in 0..1000 {
            w.update(FRAME, &FrameInput::default());
            for b in w.balls() {
                let c = b.bounds.center;
                assert!(c.x >= 16.0 && c.x <= ARENA.x - 16.0);
                assert!(c.y >= 16.0 && c.y <= ARENA.y - 16.0);
            }
        }
    }

    #[test]
    fn touching_a_ball_resets_the_ghost() {
        let mut w = world();
        w.balls = vec![Ball::new(Vec2::new(236.0, 200.0), 16.0, Vec2::ZERO)];

        w.update(FRAME, &FrameInput::default());
        assert_eq!(w.hits(), 0);
        assert_eq!(w.survival(), FRAME);

        // Ghost moves to x = 205, 31 px from the ball: radii sum is 32.
        let events = w.update(FRAME, &FrameInput { right: true, ..Default::default() });
        assert_eq!(w.hits(), 1);
        assert_eq!(w.ghost().position(), GHOST_START);
        assert_eq!(w.survival(), Duration::ZERO);
        assert_eq!(w.best(), FRAME * 2);
        assert!(w.flashing());
        assert!(events.iter().any(|e| matches!(e, GameEvent::GhostHit { hits: 1 })));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Sound { effect, .. } if effect.name() == "sounds/ghostHit"
        )));
    }

    #[test]
    fn flash_wears_off() {
        let mut w = world();
        w.balls.clear();
        w.flash = HIT_FLASH;
        for _ in 0..15 {
            w.update(FRAME, &FrameInput::default());
        }
        assert!(!w.flashing());
    }

    #[test]
    fn draw_order_background_balls_ghost() {
        let mut w = world();
        let mut rec = Recorder::default();
        w.draw(&mut rec);
        assert_eq!(rec.calls.first(), Some(&DrawCall::Background("backgrounds/Layer0_0".into())));
        assert_eq!(rec.calls.iter().filter(|c| **c == DrawCall::Sprite("sprites/ball".into())).count(), 3);
        assert_eq!(rec.calls.last(), Some(&DrawCall::Sprite("sprites/slime".into())));

        w.flash = HIT_FLASH;
        let mut rec = Recorder::default();
        w.draw(&mut rec);
        assert_eq!(rec.calls.last(), Some(&DrawCall::Sprite("sprites/slimeHit".into())));
    }
}
