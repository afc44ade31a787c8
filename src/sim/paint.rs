/// Draw target for the simulation's `draw` passes.
///
/// Levels and the avoidance demo describe *what* to draw, in order; the
/// terminal renderer decides how. Positions are world pixels.

use glam::Vec2;

use crate::domain::content::Texture;

pub trait Painter {
    /// A full-screen layer.
    fn background(&mut self, texture: &Texture);
    /// A tile visual at grid position (x, y).
    fn tile(&mut self, x: usize, y: usize, texture: &Texture);
    /// A free-moving sprite anchored at `position`. Multi-row textures
    /// grow upward from the anchor row.
    fn sprite(&mut self, position: Vec2, texture: &Texture, flipped: bool);
}

/// Records draw calls by asset name, for asserting draw order.
#[cfg(test)]
#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<DrawCall>,
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Background(String),
    Tile(usize, usize, String),
    Sprite(String),
}

#[cfg(test)]
impl Painter for Recorder {
    fn background(&mut self, texture: &Texture) {
        self.calls.push(DrawCall::Background(texture.name().to_string()));
    }

    fn tile(&mut self, x: usize, y: usize, texture: &Texture) {
        self.calls.push(DrawCall::Tile(x, y, texture.name().to_string()));
    }

    fn sprite(&mut self, _position: Vec2, texture: &Texture, _flipped: bool) {
        self.calls.push(DrawCall::Sprite(texture.name().to_string()));
    }
}
