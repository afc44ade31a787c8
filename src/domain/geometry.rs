/// Bounding volumes and the overlap tests used by both prototypes.
///
/// Rectangles are integer pixel boxes (tiles, the player's hitbox).
/// Circles are float volumes (coins, the slime ghost, balls).
/// Edge contact counts as a collision for circle tests.

use glam::Vec2;

/// Integer pixel coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Sentinel for "no such position", e.g. a level without an exit tile.
    pub const INVALID: Point = Point { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Axis-aligned pixel rectangle. `right()`/`bottom()` are exclusive.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn left(&self) -> i32 { self.x }
    pub fn top(&self) -> i32 { self.y }
    pub fn right(&self) -> i32 { self.x + self.width }
    pub fn bottom(&self) -> i32 { self.y + self.height }

    /// Integer center (rounded toward the top-left).
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Midpoint of the bottom edge, in float pixels.
    pub fn bottom_center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + self.width as f32 / 2.0, self.bottom() as f32)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.x <= p.x && p.x < self.right() && self.y <= p.y && p.y < self.bottom()
    }

    /// How far `self` must move to stop overlapping `other`.
    ///
    /// The sign of each component points away from `other`. Returns zero
    /// when the rectangles do not overlap.
    pub fn intersection_depth(&self, other: &Rect) -> Vec2 {
        let half_a = Vec2::new(self.width as f32, self.height as f32) / 2.0;
        let half_b = Vec2::new(other.width as f32, other.height as f32) / 2.0;

        let center_a = Vec2::new(self.x as f32, self.y as f32) + half_a;
        let center_b = Vec2::new(other.x as f32, other.y as f32) + half_b;

        let distance = center_a - center_b;
        let min_distance = half_a + half_b;

        if distance.x.abs() >= min_distance.x || distance.y.abs() >= min_distance.y {
            return Vec2::ZERO;
        }

        let depth_x = if distance.x > 0.0 { min_distance.x - distance.x } else { -min_distance.x - distance.x };
        let depth_y = if distance.y > 0.0 { min_distance.y - distance.y } else { -min_distance.y - distance.y };
        Vec2::new(depth_x, depth_y)
    }
}

/// Circular bounding volume.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Circle { center, radius }
    }

    pub fn collides_with_circle(&self, other: &Circle) -> bool {
        let reach = self.radius + other.radius;
        reach * reach >= self.center.distance_squared(other.center)
    }

    /// Nearest-point test against a rectangle.
    pub fn collides_with_rect(&self, rect: &Rect) -> bool {
        let nearest = Vec2::new(
            self.center.x.clamp(rect.left() as f32, rect.right() as f32),
            self.center.y.clamp(rect.top() as f32, rect.bottom() as f32),
        );
        self.radius * self.radius >= self.center.distance_squared(nearest)
    }
}
