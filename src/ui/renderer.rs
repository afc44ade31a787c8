/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The play field is drawn through `Canvas`, the terminal's `Painter`:
/// one tile (40×32 px) is two columns by one row, so a column covers
/// 20 px horizontally and a row 32 px vertically.

use std::io::{self, BufWriter, Write};
use std::time::Duration;

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use glam::Vec2;

use crate::domain::content::{Backdrop, Rgb, Texture};
use crate::domain::tile::{TILE_HEIGHT, TILE_WIDTH};
use crate::sim::avoid::{AvoidWorld, ARENA};
use crate::sim::level::Level;
use crate::sim::paint::Painter;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells. Using the
    /// same RGB for `Clear` and every cell keeps row gaps the same color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer: differs from any real
    /// cell, so every position is diffed.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies one column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

fn color(c: Rgb) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

// ── Canvas: world pixels → terminal cells ──

const PX_PER_COL: f32 = TILE_WIDTH as f32 / 2.0;
const PX_PER_ROW: f32 = TILE_HEIGHT as f32;

/// Horizontal mirror image of a glyph row.
fn flip_row(row: &str) -> String {
    row.chars()
        .rev()
        .map(|c| match c {
            '<' => '>',
            '>' => '<',
            '/' => '\\',
            '\\' => '/',
            '(' => ')',
            ')' => '(',
            '{' => '}',
            '}' => '{',
            '[' => ']',
            ']' => '[',
            other => other,
        })
        .collect()
}

/// A rectangular play field inside the frame buffer.
struct Canvas<'a> {
    buf: &'a mut FrameBuffer,
    top: usize,
    cols: usize,
    rows: usize,
}

impl<'a> Canvas<'a> {
    fn new(buf: &'a mut FrameBuffer, top: usize, cols: usize, rows: usize) -> Self {
        Canvas { buf, top, cols, rows }
    }

    /// Write one glyph, clipped to the field. `bg: None` keeps whatever
    /// background is already there.
    fn put(&mut self, col: i32, row: i32, ch: char, fg: Color, bg: Option<Color>) {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return;
        }
        let (x, y) = (col as usize, self.top + row as usize);
        let bg = bg.unwrap_or_else(|| self.buf.get(x, y).bg);
        self.buf.set(x, y, Cell::new(ch, fg, bg));
    }

    fn put_row(&mut self, col: i32, row: i32, glyphs: &str, texture: &Texture) {
        let fg = color(texture.fg());
        let bg = texture.bg().map(color);
        for (i, ch) in glyphs.chars().enumerate() {
            self.put(col + i as i32, row, ch, fg, bg);
        }
    }
}

impl Painter for Canvas<'_> {
    fn background(&mut self, texture: &Texture) {
        let glyph = texture.rows().first().map(String::as_str).unwrap_or("  ");
        match texture.backdrop() {
            Some(Backdrop::Band { from, to, stride }) => {
                let stride = stride.max(1);
                let first = (from * self.rows as f32).floor() as usize;
                let last = ((to * self.rows as f32).ceil() as usize).min(self.rows);
                for row in first..last {
                    // Stagger rows so the pattern doesn't form columns.
                    let mut col = (row * 3) % stride;
                    while col < self.cols {
                        self.put_row(col as i32, row as i32, glyph, texture);
                        col += stride;
                    }
                }
            }
            Some(Backdrop::Fill) | None => {
                let fg = color(texture.fg());
                let bg = texture.bg().map(color);
                let pattern: Vec<char> = glyph.chars().collect();
                for row in 0..self.rows {
                    for col in 0..self.cols {
                        let ch = pattern.get(col % pattern.len().max(1)).copied().unwrap_or(' ');
                        self.put(col as i32, row as i32, ch, fg, bg);
                    }
                }
            }
        }
    }

    fn tile(&mut self, x: usize, y: usize, texture: &Texture) {
        if let Some(glyphs) = texture.rows().first() {
            self.put_row(x as i32 * 2, y as i32, glyphs, texture);
        }
    }

    fn sprite(&mut self, position: Vec2, texture: &Texture, flipped: bool) {
        let rows = texture.rows();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let left = (position.x / PX_PER_COL).round() as i32 - width / 2;
        let bottom = ((position.y - 0.5) / PX_PER_ROW).floor() as i32;
        let height = rows.len() as i32;

        for (i, glyphs) in rows.iter().enumerate() {
            let row = bottom - (height - 1 - i as i32);
            if flipped {
                self.put_row(left, row, &flip_row(glyphs), texture);
            } else {
                self.put_row(left, row, glyphs, texture);
            }
        }
    }
}

// ── Screens ──

/// What to show this frame.
pub enum Screen<'a> {
    Title {
        levels: usize,
        error: Option<&'a str>,
    },
    Platformer {
        level: &'a Level,
        name: &'a str,
        index: usize,
        total: usize,
        coins_total: usize,
    },
    Avoid {
        world: &'a AvoidWorld,
    },
}

impl Screen<'_> {
    fn kind(&self) -> u8 {
        match self {
            Screen::Title { .. } => 0,
            Screen::Platformer { .. } => 1,
            Screen::Avoid { .. } => 2,
        }
    }
}

/// Below this the clock blinks red.
const WARNING_TIME: Duration = Duration::from_secs(30);

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

fn format_clock(t: Duration) -> String {
    let secs = t.as_secs_f64().ceil() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<u8>,
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        // Release events make held keys exact; without them input falls
        // back to the hold timeout.
        if matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }
        log::info!("renderer: {}x{} terminal, key release events: {}", self.term_w, self.term_h, self.keyboard_enhanced);

        Ok(())
    }

    /// Whether the terminal reports key Release events.
    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, screen: &Screen<'_>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Screen change → clear for a clean transition
        if self.last_screen != Some(screen.kind()) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen.kind());
        }

        self.front.clear();

        match screen {
            Screen::Title { levels, error } => self.compose_title(*levels, *error),
            Screen::Platformer { level, name, index, total, coins_total } => {
                self.compose_platformer(level, name, *index, *total, *coins_total)
            }
            Screen::Avoid { world } => self.compose_avoid(world),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;

                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_title(&mut self, levels: usize, error: Option<&str>) {
        let title = [
            r"   ___     _ _        _     _____ _            ___     _         ",
            r"  / __|___| | |___ __| |_  |_   _| |_  ___    / __|___(_)_ _  ___",
            r" | (__/ _ \ | / -_) _|  _|   | | | ' \/ -_)  | (__/ _ \ | ' \(_-<",
            r"  \___\___/_|_\___\__|\__|   |_| |_||_\___|   \___\___/_|_||_/__/",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, GOLD, Color::Reset);
        }

        let menu = 8;
        self.front.put_str(8, menu, "ENTER   Collect The Coins", GREEN, Color::Reset);
        self.front.put_str(8, menu + 1, "  B     Avoid Benny Ball", Color::Rgb { r: 100, g: 200, b: 255 }, Color::Reset);
        self.front.put_str(8, menu + 2, "  Q     Quit", Color::White, Color::Reset);

        let info = format!("        {levels} levels");
        self.front.put_str(8, menu + 4, &info, Color::DarkGrey, Color::Reset);

        let help = [
            "Controls",
            "  ←→ / AD       Run            ↑ / W / SPACE   Jump",
            "  ENTER         Continue       R               Restart",
            "  ESC           Title          Pad: stick, A jump, Start",
        ];
        let help_base = menu + 6;
        for (i, line) in help.iter().enumerate() {
            let fg = if i == 0 { GOLD } else { Color::White };
            self.front.put_str(8, help_base + i, line, fg, Color::Reset);
        }

        if let Some(err) = error {
            let row = self.front.height.saturating_sub(1);
            if row > help_base + help.len() {
                self.front.fill_row(row, MSG_BG);
                self.front.put_str(0, row, &format!(" ◈ {err} "), Color::Black, MSG_BG);
            }
        }
    }

    fn compose_platformer(&mut self, level: &Level, name: &str, index: usize, total: usize, coins_total: usize) {
        let time = level.time_remaining();
        let blink = time.as_secs() % 2 == 0;
        let time_fg = if time > WARNING_TIME || level.at_exit() || blink { GOLD } else { RED };

        self.front.fill_row(HUD_ROW, HUD_BG);
        let head = format!(" {}/{} {name}  ", index + 1, total);
        self.front.put_str(0, HUD_ROW, &head, Color::White, HUD_BG);
        let clock = format!("TIME {}", format_clock(time));
        let x = head.chars().count();
        self.front.put_str(x, HUD_ROW, &clock, time_fg, HUD_BG);
        let coins = format!("   COINS {}/{}", coins_total - level.coins().len(), coins_total);
        self.front.put_str(x + clock.chars().count(), HUD_ROW, &coins, Color::White, HUD_BG);

        let cols = level.width() * 2;
        let rows = level.height();
        level.draw(&mut Canvas::new(&mut self.front, MAP_ROW, cols, rows));

        let msg = if level.at_exit() {
            time.is_zero().then_some("YOU WIN!  ENTER: next level")
        } else if time.is_zero() {
            Some("TIME UP!  ENTER: try again")
        } else if !level.player().alive {
            Some("YOU DIED!  ENTER: continue")
        } else {
            None
        };
        let msg_row = MAP_ROW + rows + 1;
        if let Some(msg) = msg {
            if msg_row < self.front.height {
                self.front.fill_row(msg_row, MSG_BG);
                self.front.put_str(0, msg_row, &format!(" ◈ {msg} "), Color::Black, MSG_BG);
            }
        }

        let help_row = msg_row + 2;
        if help_row < self.front.height {
            let help = " ←→:Run  ↑/SPACE:Jump  R:Restart  ESC:Title";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_avoid(&mut self, world: &AvoidWorld) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let hud = format!(
            " AVOID BENNY BALL   HITS {}   ALIVE {:.1}s   BEST {:.1}s ",
            world.hits(),
            world.survival().as_secs_f32(),
            world.best().as_secs_f32(),
        );
        let fg = if world.flashing() { RED } else { Color::White };
        self.front.put_str(0, HUD_ROW, &hud, fg, HUD_BG);

        let cols = (ARENA.x / PX_PER_COL) as usize;
        let rows = (ARENA.y / PX_PER_ROW) as usize;
        world.draw(&mut Canvas::new(&mut self.front, MAP_ROW, cols, rows));

        let help_row = MAP_ROW + rows + 1;
        if help_row < self.front.height {
            let help = " ←→↑↓ / WASD / stick: Move   ESC: Title";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::ContentManager;

    fn canvas_buf(cols: usize, rows: usize) -> FrameBuffer {
        FrameBuffer::new(cols, rows + MAP_ROW)
    }

    fn row_text(buf: &FrameBuffer, y: usize) -> String {
        (0..buf.width).map(|x| buf.get(x, y).ch).collect()
    }

    #[test]
    fn tile_covers_two_columns() {
        let mut content = ContentManager::new();
        let flag = content.load_texture("sprites/blocks/FinishFlag").unwrap();
        let mut buf = canvas_buf(8, 3);
        Canvas::new(&mut buf, MAP_ROW, 8, 3).tile(2, 1, &flag);
        assert_eq!(row_text(&buf, MAP_ROW + 1), "    |>  ");
    }

    #[test]
    fn sprite_stands_on_its_tile_row() {
        let mut content = ContentManager::new();
        let idle = content.load_texture("sprites/player/Idle").unwrap();
        let mut buf = canvas_buf(8, 3);
        // Bottom-center of tile (1, 1)
        Canvas::new(&mut buf, MAP_ROW, 8, 3).sprite(Vec2::new(60.0, 64.0), &idle, false);
        assert_eq!(row_text(&buf, MAP_ROW), "  ()    ");
        assert_eq!(row_text(&buf, MAP_ROW + 1), "  ||    ");
    }

    #[test]
    fn flipped_sprite_is_mirrored() {
        assert_eq!(flip_row("/>"), "<\\");
        assert_eq!(flip_row("{}"), "{}");
        assert_eq!(flip_row("ab"), "ba");
    }

    #[test]
    fn drawing_is_clipped_to_the_field() {
        let mut content = ContentManager::new();
        let ball = content.load_texture("sprites/ball").unwrap();
        let mut buf = canvas_buf(4, 2);
        let mut canvas = Canvas::new(&mut buf, MAP_ROW, 4, 2);
        canvas.sprite(Vec2::new(-100.0, 16.0), &ball, false);
        canvas.sprite(Vec2::new(60.0, 500.0), &ball, false);
        canvas.sprite(Vec2::new(80.0, 16.0), &ball, false);
        assert_eq!(row_text(&buf, MAP_ROW), "   O");
        assert_eq!(row_text(&buf, 0), "    ");
    }

    #[test]
    fn glyphs_keep_the_background_under_them() {
        let mut content = ContentManager::new();
        let sky = content.load_texture("backgrounds/Layer0_0").unwrap();
        let coin = content.load_texture("sprites/coin").unwrap();
        let mut buf = canvas_buf(4, 1);
        let mut canvas = Canvas::new(&mut buf, MAP_ROW, 4, 1);
        canvas.background(&sky);
        canvas.sprite(Vec2::new(40.0, 16.0), &coin, false);
        let sky_bg = color(sky.bg().unwrap());
        assert_eq!(buf.get(1, MAP_ROW), Cell::new('(', color(coin.fg()), sky_bg));
        assert_eq!(buf.get(3, MAP_ROW).bg, sky_bg);
    }

    #[test]
    fn clock_rounds_up_to_whole_seconds() {
        assert_eq!(format_clock(Duration::from_secs(45)), "0:45");
        assert_eq!(format_clock(Duration::from_millis(59_100)), "1:00");
        assert_eq!(format_clock(Duration::ZERO), "0:00");
    }
}
