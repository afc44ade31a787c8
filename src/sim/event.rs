/// Events emitted during an update.
/// The presentation layer consumes these for sound and status messages.

use crate::domain::content::SoundEffect;

#[derive(Clone, Debug)]
pub enum GameEvent {
    CoinCollected { x: f32, y: f32 },
    PlayerJumped,
    PlayerKilled,
    ExitReached,
    TimeExpired,
    GhostHit { hits: u32 },
    /// Fire-and-forget one-shot sound.
    Sound { effect: SoundEffect, volume: f32 },
}
