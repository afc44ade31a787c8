/// Level sources.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   One line per grid row, every line the same length. Trailing blank
///   lines are ignored. The level's name is the file stem.

use std::path::Path;

use super::level::{Level, LevelError};
use crate::config::LevelConfig;
use crate::domain::content::ContentManager;

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

impl LevelDef {
    pub fn parse(name: &str, text: &str) -> Self {
        let mut rows: Vec<String> = text.lines().map(str::to_string).collect();
        while rows.last().is_some_and(|r| r.trim().is_empty()) {
            rows.pop();
        }
        LevelDef { name: name.to_string(), rows }
    }

    /// Build a playable level with its own content scope.
    pub fn build(&self, config: &LevelConfig) -> Result<Level, LevelError> {
        Level::load(&self.rows, config, ContentManager::new())
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// The level list to play: the directory's levels when it has any,
/// otherwise the embedded set. An unreadable directory is logged and
/// skipped.
pub fn level_list(levels_dir: &Path) -> Vec<LevelDef> {
    if levels_dir.is_dir() {
        match load_from_directory(levels_dir) {
            Ok(levels) if !levels.is_empty() => {
                log::info!("levels: {} from {}", levels.len(), levels_dir.display());
                return levels;
            }
            Ok(_) => log::info!("levels: {} has no .txt files", levels_dir.display()),
            Err(e) => log::warn!("levels: {e}"),
        }
    }
    embedded_levels()
}

/// The level at `index`, counting from zero.
pub fn level_at(levels: &[LevelDef], index: usize) -> Result<&LevelDef, LevelError> {
    levels.get(index).ok_or(LevelError::NoSuchLevel { index, count: levels.len() })
}

/// Every `.txt` file in `dir`, sorted by file name.
pub fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let io_err = |path: &Path, source| LevelError::Io { path: path.display().to_string(), source };

    let mut paths = vec![];
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
            let name = path.file_stem().unwrap_or_default().to_string_lossy();
            Ok(LevelDef::parse(&name, &text))
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn make_embedded(name: &str, rows: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: rows.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Level 1 - First Steps", &[
            "....................",
            "....................",
            "..........X.........",
            ".........~~~........",
            "....................",
            ".....C.........C....",
            "....~~~......~~~~...",
            "....................",
            "..C..........C......",
            ".~~~~.....:.~~~~....",
            "....................",
            ".........C.......C..",
            "......#####....####.",
            ".1..................",
            "####################",
        ]),
        make_embedded("Level 2 - Stairway", &[
            "....................",
            "..................X.",
            "...............#####",
            "....C...............",
            "...~~~......C.......",
            "...........~~~......",
            "#......C............",
            "#.....~~~...........",
            "#..C.........:....C.",
            "#.~~~..............#",
            "#.........#.....~~~#",
            "#....C....#........#",
            "#..#####..#..C.....#",
            "#1........#..:.....#",
            "####################",
        ]),
        make_embedded("Level 3 - Overhang", &[
            "#..................#",
            "#.X.............C..#",
            "#~~~..........~~~~.#",
            "#..................#",
            "#.....C.....C......#",
            "#....####..~~~.....#",
            "#..................#",
            "#.C.............C..#",
            "#~~~..:.....:..~~~.#",
            "#..................#",
            "#......~~~~~~......#",
            "#..C............C..#",
            "#.####........####.#",
            "#........1.........#",
            "####################",
        ]),
    ]
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
