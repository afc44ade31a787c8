/// Content loading: logical asset names → ready-to-use handles.
///
/// A `ContentManager` is scoped to one owner (a level, the avoidance demo).
/// Everything it loaded is released when the owner drops it, or earlier via
/// `unload()`. Handles are `Rc`, so loading the same name twice hands out the
/// same asset instead of building a second copy.
///
/// Assets come from a catalog function. The default catalog describes every
/// asset the two games use in terminal terms: glyph rows and colors for
/// textures, a synthesized cue for sounds.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("asset {name} is not a {expected}")]
    WrongKind { name: String, expected: &'static str },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// How a full-screen background layer covers the play area.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Backdrop {
    /// Paint every cell's background color.
    Fill,
    /// Repeat the glyph every `stride` columns between two height ratios
    /// (0.0 = top, 1.0 = bottom).
    Band { from: f32, to: f32, stride: usize },
}

#[derive(Debug)]
struct TextureData {
    name: String,
    rows: Vec<String>,
    fg: Rgb,
    bg: Option<Rgb>,
    backdrop: Option<Backdrop>,
}

/// Handle to a loaded texture.
#[derive(Clone)]
pub struct Texture(Rc<TextureData>);

impl Texture {
    pub fn name(&self) -> &str { &self.0.name }
    /// Glyph rows, top to bottom. Each row is two terminal columns wide.
    pub fn rows(&self) -> &[String] { &self.0.rows }
    pub fn fg(&self) -> Rgb { self.0.fg }
    pub fn bg(&self) -> Option<Rgb> { self.0.bg }
    pub fn backdrop(&self) -> Option<Backdrop> { self.0.backdrop }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Texture({})", self.0.name)
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

/// Which synthesized effect a sound asset plays.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum SoundCue {
    CoinPickup,
    Jump,
    PlayerKilled,
    ExitReached,
    GhostHit,
}

#[derive(Debug)]
struct SoundData {
    name: String,
    cue: SoundCue,
}

/// Handle to a loaded sound effect.
#[derive(Clone)]
pub struct SoundEffect(Rc<SoundData>);

impl SoundEffect {
    pub fn name(&self) -> &str { &self.0.name }
    pub fn cue(&self) -> SoundCue { self.0.cue }
}

impl fmt::Debug for SoundEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SoundEffect({})", self.0.name)
    }
}

impl PartialEq for SoundEffect {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

/// Static description of an asset, as returned by a catalog.
#[derive(Clone, Debug)]
pub enum AssetDef {
    Texture {
        rows: &'static [&'static str],
        fg: Rgb,
        bg: Option<Rgb>,
        backdrop: Option<Backdrop>,
    },
    Sound(SoundCue),
}

pub type Catalog = fn(&str) -> Option<AssetDef>;

#[derive(Clone)]
enum Asset {
    Texture(Texture),
    Sound(SoundEffect),
}

pub struct ContentManager {
    catalog: Catalog,
    cache: HashMap<String, Asset>,
}

impl ContentManager {
    /// Manager backed by the built-in catalog.
    pub fn new() -> Self {
        Self::with_catalog(builtin_asset)
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        ContentManager { catalog, cache: HashMap::new() }
    }

    pub fn load_texture(&mut self, name: &str) -> Result<Texture, ContentError> {
        match self.load(name)? {
            Asset::Texture(t) => Ok(t),
            Asset::Sound(_) => Err(ContentError::WrongKind { name: name.to_string(), expected: "texture" }),
        }
    }

    pub fn load_sound(&mut self, name: &str) -> Result<SoundEffect, ContentError> {
        match self.load(name)? {
            Asset::Sound(s) => Ok(s),
            Asset::Texture(_) => Err(ContentError::WrongKind { name: name.to_string(), expected: "sound" }),
        }
    }

    /// Number of distinct assets currently held.
    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    /// Release every loaded asset. Returns how many were released;
    /// calling it again releases nothing.
    pub fn unload(&mut self) -> usize {
        let released = self.cache.len();
        if released > 0 {
            self.cache.clear();
            log::debug!("content: released {released} assets");
        }
        released
    }

    fn load(&mut self, name: &str) -> Result<Asset, ContentError> {
        if let Some(asset) = self.cache.get(name) {
            return Ok(asset.clone());
        }
        let def = (self.catalog)(name).ok_or_else(|| ContentError::NotFound(name.to_string()))?;
        let asset = match def {
            AssetDef::Texture { rows, fg, bg, backdrop } => Asset::Texture(Texture(Rc::new(TextureData {
                name: name.to_string(),
                rows: rows.iter().map(|r| r.to_string()).collect(),
                fg,
                bg,
                backdrop,
            }))),
            AssetDef::Sound(cue) => Asset::Sound(SoundEffect(Rc::new(SoundData {
                name: name.to_string(),
                cue,
            }))),
        };
        self.cache.insert(name.to_string(), asset.clone());
        Ok(asset)
    }
}

impl Default for ContentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContentManager {
    fn drop(&mut self) {
        self.unload();
    }
}

// ── Built-in catalog ──

const SKY: Rgb = Rgb(24, 30, 58);

fn tile(rows: &'static [&'static str], fg: Rgb) -> Option<AssetDef> {
    Some(AssetDef::Texture { rows, fg, bg: None, backdrop: None })
}

fn layer(glyph: &'static [&'static str], fg: Rgb, backdrop: Backdrop) -> Option<AssetDef> {
    let bg = matches!(backdrop, Backdrop::Fill).then_some(SKY);
    Some(AssetDef::Texture { rows: glyph, fg, bg, backdrop: Some(backdrop) })
}

/// Every asset shipped with the games.
pub fn builtin_asset(name: &str) -> Option<AssetDef> {
    match name {
        // Solid blocks: 7 variants
        "sprites/blocks/BlockA0" => tile(&["▓▓"], Rgb(138, 94, 62)),
        "sprites/blocks/BlockA1" => tile(&["▓▓"], Rgb(124, 86, 58)),
        "sprites/blocks/BlockA2" => tile(&["▒▒"], Rgb(138, 94, 62)),
        "sprites/blocks/BlockA3" => tile(&["▓▒"], Rgb(112, 80, 56)),
        "sprites/blocks/BlockA4" => tile(&["▒▓"], Rgb(112, 80, 56)),
        "sprites/blocks/BlockA5" => tile(&["██"], Rgb(98, 72, 52)),
        "sprites/blocks/BlockA6" => tile(&["▓▓"], Rgb(150, 104, 70)),
        // Platform / decoration blocks: 2 variants
        "sprites/blocks/BlockB0" => tile(&["══"], Rgb(168, 168, 190)),
        "sprites/blocks/BlockB1" => tile(&["──"], Rgb(150, 150, 176)),
        "sprites/blocks/FinishFlag" => tile(&["|>"], Rgb(250, 210, 60)),

        "backgrounds/Layer0_0" => layer(&["  "], SKY, Backdrop::Fill),
        "backgrounds/Layer0_1" => layer(&[" ."], Rgb(120, 130, 170), Backdrop::Band { from: 0.0, to: 0.4, stride: 7 }),
        "backgrounds/Layer0_2" => layer(&["/\\"], Rgb(48, 66, 90), Backdrop::Band { from: 0.55, to: 0.75, stride: 4 }),
        "backgrounds/Layer0_3" => layer(&[",,"], Rgb(40, 96, 52), Backdrop::Band { from: 0.8, to: 1.0, stride: 5 }),

        "sprites/coin" => tile(&["()"], Rgb(255, 215, 0)),
        "sprites/player/Idle" => tile(&["()", "||"], Rgb(110, 200, 255)),
        "sprites/player/Run" => tile(&["()", "/>"], Rgb(110, 200, 255)),
        "sprites/player/Jump" => tile(&["()", "/\\"], Rgb(110, 200, 255)),
        "sprites/player/Celebrate" => tile(&["\\/", "()"], Rgb(255, 240, 120)),
        "sprites/player/Die" => tile(&["xx", "__"], Rgb(255, 80, 80)),

        "sprites/slime" => tile(&["{}"], Rgb(90, 230, 120)),
        "sprites/slimeHit" => tile(&["{}"], Rgb(255, 70, 70)),
        "sprites/ball" => tile(&["OO"], Rgb(255, 110, 70)),

        "sounds/coinPickup" => Some(AssetDef::Sound(SoundCue::CoinPickup)),
        "sounds/playerJump" => Some(AssetDef::Sound(SoundCue::Jump)),
        "sounds/playerKilled" => Some(AssetDef::Sound(SoundCue::PlayerKilled)),
        "sounds/exitReached" => Some(AssetDef::Sound(SoundCue::ExitReached)),
        "sounds/ghostHit" => Some(AssetDef::Sound(SoundCue::GhostHit)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_builtin_texture_and_sound() {
        let mut content = ContentManager::new();
        let t = content.load_texture("sprites/blocks/BlockA0").unwrap();
        assert_eq!(t.name(), "sprites/blocks/BlockA0");
        assert_eq!(t.rows(), ["▓▓".to_string()]);
        let s = content.load_sound("sounds/coinPickup").unwrap();
        assert_eq!(s.cue(), SoundCue::CoinPickup);
        assert_eq!(content.loaded_count(), 2);
    }

    #[test]
    fn repeated_load_shares_handle() {
        let mut content = ContentManager::new();
        let a = content.load_texture("sprites/coin").unwrap();
        let b = content.load_texture("sprites/coin").unwrap();
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert_eq!(content.loaded_count(), 1);
    }

    #[test]
    fn missing_asset_is_not_found() {
        let mut content = ContentManager::new();
        let err = content.load_texture("sprites/nope").unwrap_err();
        assert_eq!(err, ContentError::NotFound("sprites/nope".into()));
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut content = ContentManager::new();
        assert!(matches!(
            content.load_sound("sprites/coin"),
            Err(ContentError::WrongKind { expected: "sound", .. })
        ));
    }

    #[test]
    fn unload_releases_once() {
        let mut content = ContentManager::new();
        let t = content.load_texture("sprites/slime").unwrap();
        let weak = Rc::downgrade(&t.0);
        drop(t);
        assert!(weak.upgrade().is_some());
        assert_eq!(content.unload(), 1);
        assert!(weak.upgrade().is_none());
        assert_eq!(content.unload(), 0);
    }

    #[test]
    fn drop_releases_assets() {
        let mut content = ContentManager::new();
        let weak = Rc::downgrade(&content.load_texture("sprites/ball").unwrap().0);
        drop(content);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn every_background_layer_has_a_backdrop() {
        let mut content = ContentManager::new();
        for i in 0..4 {
            let t = content.load_texture(&format!("backgrounds/Layer0_{i}")).unwrap();
            assert!(t.backdrop().is_some());
        }
    }
}
