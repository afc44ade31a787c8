/// Grid cells and their collision classes.
/// A cell never changes after the level is built, so it is a plain value:
/// an optional visual plus how it blocks movement.

use super::content::Texture;
use super::geometry::Rect;

/// Pixel width of one tile.
pub const TILE_WIDTH: i32 = 40;
/// Pixel height of one tile.
pub const TILE_HEIGHT: i32 = 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BlockCollision {
    /// Nothing blocks movement.
    #[default]
    Passable,
    /// Solid from every side.
    Impassable,
    /// Solid only when landing on it from above.
    Platform,
}

impl BlockCollision {
    /// Does this collision class take part in collision resolution at all?
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockCollision::Passable)
    }
}

/// One addressable tile of the level.
#[derive(Clone, Debug, Default)]
pub struct Block {
    texture: Option<Texture>,
    collision: BlockCollision,
}

impl Block {
    pub fn new(texture: Option<Texture>, collision: BlockCollision) -> Self {
        Block { texture, collision }
    }

    /// An invisible, passable tile.
    pub fn empty() -> Self {
        Block::default()
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn collision(&self) -> BlockCollision {
        self.collision
    }

    /// Pixel rectangle covered by the tile at grid position (x, y).
    /// Defined for any coordinates, including ones outside the grid.
    pub fn bounds(x: i32, y: i32) -> Rect {
        Rect::new(x * TILE_WIDTH, y * TILE_HEIGHT, TILE_WIDTH, TILE_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_passable_is_not_solid() {
        assert!(!BlockCollision::Passable.is_solid());
        assert!(BlockCollision::Impassable.is_solid());
        assert!(BlockCollision::Platform.is_solid());
    }

    #[test]
    fn empty_block_has_no_visual() {
        let b = Block::empty();
        assert!(b.texture().is_none());
        assert_eq!(b.collision(), BlockCollision::Passable);
    }

    #[test]
    fn bounds_scale_by_tile_size() {
        let r = Block::bounds(2, 3);
        assert_eq!(r, Rect::new(80, 96, TILE_WIDTH, TILE_HEIGHT));
        assert_eq!(Block::bounds(-1, 0).x, -TILE_WIDTH);
    }
}
