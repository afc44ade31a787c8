/// Player physics: input → velocity → position, then collision resolution
/// against the tile grid.
///
/// Terrain is read through `TileMap`, so the player never holds a
/// reference to the level that owns it.
///
/// ## Resolution rules
///
/// For every non-passable tile the hitbox overlaps:
///
/// ┌────────────────────────────────────┬───────────────────────────────┐
/// │ Condition                          │ Effect                        │
/// ├────────────────────────────────────┼───────────────────────────────┤
/// │ |depth.y| < |depth.x| or Platform  │ vertical candidate            │
/// │   previous bottom ≤ tile top       │   on_ground = true            │
/// │   Impassable, or landed this frame │   push out along Y            │
/// │ otherwise, Impassable              │ push out along X              │
/// │ otherwise (Platform from the side) │ nothing                       │
/// └────────────────────────────────────┴───────────────────────────────┘
///
/// Platforms only ever push up, and only when the player was above them on
/// the previous frame, so they can be jumped through from below.

use glam::Vec2;

use super::entity::{Facing, FrameInput, Orientation, Player, Pose};
use super::tile::{Block, BlockCollision, TILE_HEIGHT, TILE_WIDTH};

/// Read-only collision view of a tile grid.
pub trait TileMap {
    /// Collision class of grid cell (x, y); defined for any coordinates.
    fn collision(&self, x: i32, y: i32) -> BlockCollision;
}

impl Player {
    /// Full per-frame update: read input, integrate, resolve, animate.
    /// A dead player ignores input and only falls.
    pub fn update(&mut self, elapsed: f32, input: &FrameInput, orientation: Orientation, map: &impl TileMap) {
        if self.alive {
            self.read_input(input, orientation);
        }
        self.apply_physics(elapsed, map);

        if self.alive && self.on_ground {
            self.pose = if self.velocity.x.abs() - 0.02 > 0.0 { Pose::Run } else { Pose::Idle };
        }

        self.movement = 0.0;
        self.is_jumping = false;
    }

    fn read_input(&mut self, input: &FrameInput, orientation: Orientation) {
        let mut movement = input.stick.x;
        if movement.abs() < self.tuning.stick_deadzone {
            movement = 0.0;
        }
        if orientation == Orientation::LandscapeRight {
            movement = -movement;
        }

        if input.left {
            movement = -1.0;
        } else if input.right {
            movement = 1.0;
        }

        self.movement = movement;
        self.is_jumping = input.jump || input.up;
    }

    /// Integrate velocity and position for one frame, then resolve
    /// collisions. Input from the last `update` is used if any.
    pub fn apply_physics(&mut self, elapsed: f32, map: &impl TileMap) {
        let t = self.tuning;
        let previous = self.position;

        self.velocity.x += self.movement * t.move_acceleration * elapsed;
        self.velocity.y = (self.velocity.y + t.gravity * elapsed).clamp(-t.max_fall_speed, t.max_fall_speed);
        self.velocity.y = self.do_jump(self.velocity.y, elapsed);

        self.velocity.x *= if self.on_ground { t.ground_drag } else { t.air_drag };
        self.velocity.x = self.velocity.x.clamp(-t.max_move_speed, t.max_move_speed);

        self.position += self.velocity * elapsed;
        self.position = self.position.round();

        self.handle_collisions(map);

        if self.position.x == previous.x { self.velocity.x = 0.0; }
        if self.position.y == previous.y { self.velocity.y = 0.0; }

        if self.velocity.x > 0.0 {
            self.facing = Facing::Right;
        } else if self.velocity.x < 0.0 {
            self.facing = Facing::Left;
        }
    }

    /// Jump curve: full launch speed at take-off, easing off as the jump
    /// is held, cut short when the button is released.
    fn do_jump(&mut self, mut velocity_y: f32, elapsed: f32) -> f32 {
        let t = self.tuning;
        if self.is_jumping {
            if (!self.was_jumping && self.on_ground) || self.jump_time > 0.0 {
                if self.jump_time == 0.0 {
                    self.jump_started = true;
                }
                self.jump_time += elapsed;
                self.pose = Pose::Jump;
            }

            if 0.0 < self.jump_time && self.jump_time <= t.max_jump_time {
                velocity_y = t.jump_launch_velocity
                    * (1.0 - (self.jump_time / t.max_jump_time).powf(t.jump_control_power));
            } else {
                self.jump_time = 0.0;
            }
        } else {
            self.jump_time = 0.0;
        }
        self.was_jumping = self.is_jumping;
        velocity_y
    }

    fn handle_collisions(&mut self, map: &impl TileMap) {
        let mut bounds = self.bounding_rectangle();
        let left_tile = (bounds.left() as f32 / TILE_WIDTH as f32).floor() as i32;
        let right_tile = (bounds.right() as f32 / TILE_WIDTH as f32).ceil() as i32 - 1;
        let top_tile = (bounds.top() as f32 / TILE_HEIGHT as f32).floor() as i32;
        let bottom_tile = (bounds.bottom() as f32 / TILE_HEIGHT as f32).ceil() as i32 - 1;

        self.on_ground = false;

        for y in top_tile..=bottom_tile {
            for x in left_tile..=right_tile {
                let collision = map.collision(x, y);
                if !collision.is_solid() { continue; }

                let tile_bounds = Block::bounds(x, y);
                let depth = bounds.intersection_depth(&tile_bounds);
                if depth == Vec2::ZERO { continue; }

                let (abs_x, abs_y) = (depth.x.abs(), depth.y.abs());
                if abs_y < abs_x || collision == BlockCollision::Platform {
                    if self.previous_bottom <= tile_bounds.top() as f32 {
                        self.on_ground = true;
                    }
                    if collision == BlockCollision::Impassable || self.on_ground {
                        self.position.y += depth.y;
                        bounds = self.bounding_rectangle();
                    }
                } else if collision == BlockCollision::Impassable {
                    self.position.x += depth.x;
                    bounds = self.bounding_rectangle();
                }
            }
        }

        self.previous_bottom = bounds.bottom() as f32;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
