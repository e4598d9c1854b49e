/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` (array of Cell)
///   2. Compare each cell with `back` (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One grid cell is drawn as `CELL_W` terminal columns. Actors and
/// platforms are snapped to the cell under their centre, so the view is a
/// coarse picture of the pixel-precise simulation.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use tilerider::domain::entity::{ActorBounds, Facing};
use tilerider::domain::tile::TileCategory;
use tilerider::sim::world::World;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Same RGB for `Clear` and every cell, so row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Camera ──

/// Viewport in grid cells.
#[derive(Clone, Copy, Default)]
struct Camera {
    x: i32,
    y: i32,
    view_w: usize,
    view_h: usize,
}

impl Camera {
    /// Dead-zone follow: scroll only when the target nears the edge.
    /// Maps smaller than the viewport are centred.
    fn follow(&mut self, tx: i32, ty: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = follow_axis(self.x, tx, self.view_w, world_w);
        self.y = follow_axis(self.y, ty, self.view_h, world_h);
    }
}

fn follow_axis(start: i32, target: i32, view: usize, world: usize) -> i32 {
    let (view, world) = (view as i32, world as i32);
    if world <= view {
        return -((view - world) / 2);
    }
    let margin = view / 5;
    let mut start = start;
    if target < start + margin {
        start = target - margin;
    } else if target > start + view - margin - 1 {
        start = target - view + margin + 1;
    }
    start.clamp(0, world - view)
}

// ── Renderer ──

const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

/// Status text shown under the map.
pub struct Overlay<'a> {
    pub level_index: usize,
    pub level_count: usize,
    pub message: &'a str,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame (level switch).
    pub fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    pub fn render(&mut self, world: &World, overlay: &Overlay<'_>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }

        // HUD + gap + message + help
        let reserved_rows = MAP_ROW + 4;
        self.camera.view_w = (self.term_w / CELL_W).min(world.grid.width());
        self.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1).min(world.grid.height());
        let (pc, pr) = cell_of(&world.player.bounds(), world.grid.tile_size());
        self.camera.follow(pc, pr, world.grid.width(), world.grid.height());

        self.front.clear();
        self.compose_hud(world, overlay);
        self.compose_map(world);
        self.compose_footer(overlay);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
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
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &World, overlay: &Overlay<'_>) {
        let p = &w.player;
        let mode = if w.is_editor_mode() { "EDIT" } else { "PLAY" };
        let mut flags = String::new();
        for (on, tag) in [
            (p.grounded, "ground"),
            (p.swimming, "swim"),
            (p.on_ice, "ice"),
            (p.climbing, "climb"),
            (p.carry.is_some(), "carry"),
        ] {
            if on {
                flags.push(' ');
                flags.push_str(tag);
            }
        }
        let hud = format!(
            " {}/{} {}  [{}]  t={}  v=({:+.1},{:+.1}){}",
            overlay.level_index + 1,
            overlay.level_count,
            w.name,
            mode,
            w.tick,
            p.vel.x,
            p.vel.y,
            flags,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &World) {
        let cam = self.camera;
        let t = w.grid.tile_size();

        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height {
                break;
            }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                let cell = self.tile_cell(w, cam.x + vx as i32, cam.y + vy as i32);
                self.put_cell(col, row, cell);
            }
        }

        for p in &w.platforms {
            let b = p.bounds();
            let fg = if p.is_paused() { Color::DarkGrey } else { Color::Rgb { r: 230, g: 160, b: 60 } };
            let first = (b.left / t).floor() as i32;
            let last = ((b.right - 1.0) / t).floor() as i32;
            let row = (b.top / t).floor() as i32;
            for c in first..=last {
                self.put_world(c, row, Cell::new('=', fg, Color::Rgb { r: 70, g: 40, b: 10 }));
            }
        }

        for walker in w.walkers.iter().filter(|a| a.alive) {
            let (c, r) = cell_of(&walker.bounds(), t);
            let ch = if walker.facing == Facing::Left { '<' } else { '>' };
            self.put_world(c, r, Cell::new(ch, Color::Rgb { r: 255, g: 90, b: 90 }, Color::Reset));
        }

        let (c, r) = cell_of(&w.player.bounds(), t);
        let ch = if w.player.facing == Facing::Left { '[' } else { ']' };
        self.put_world(c, r, Cell::new(ch, Color::Rgb { r: 120, g: 255, b: 120 }, Color::Reset));
    }

    fn compose_footer(&mut self, overlay: &Overlay<'_>) {
        let msg_row = MAP_ROW + self.camera.view_h + 1;
        if msg_row < self.front.height && !overlay.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" {} ", overlay.message), Color::Black, MSG_BG);
        }

        let help_row = MAP_ROW + self.camera.view_h + 3;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Move  Space/Z:Jump  X:Run  R:Restart  N:Next  E:Editor  Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Glyph for a grid cell. Destroyed cells are blank and hidden tiles
    /// stay invisible outside the editor.
    fn tile_cell(&self, w: &World, gx: i32, gy: i32) -> Cell {
        if gx < 0 || gy < 0 {
            return Cell::BLANK;
        }
        let Some(index) = w.grid.index_of(gx as usize, gy as usize) else {
            return Cell::BLANK;
        };
        if w.grid.is_destroyed(index) {
            return Cell::BLANK;
        }
        let catalog = w.grid.catalog();
        let idx = match w.grid.overlay_at(index) {
            0 => w.grid.base_at(index),
            overlay => overlay,
        };
        if idx == 0 {
            return Cell::BLANK;
        }
        let tile = catalog.get(idx);
        if tile.hidden && !w.is_editor_mode() {
            return Cell::BLANK;
        }
        let ch = catalog.glyph_for_index(idx).unwrap_or('#');
        let (fg, bg) = if tile.code.liquid {
            if w.physics.is_lethal_liquid(idx) {
                (Color::Rgb { r: 255, g: 200, b: 80 }, Color::Rgb { r: 150, g: 30, b: 0 })
            } else {
                (Color::Rgb { r: 150, g: 200, b: 255 }, Color::Rgb { r: 20, g: 50, b: 120 })
            }
        } else if tile.climbable {
            (Color::Rgb { r: 100, g: 200, b: 255 }, Color::Reset)
        } else if tile.category == TileCategory::Ice {
            (Color::Rgb { r: 200, g: 240, b: 255 }, Color::Rgb { r: 60, g: 110, b: 140 })
        } else if tile.breakable {
            (Color::Rgb { r: 180, g: 120, b: 60 }, Color::Rgb { r: 100, g: 65, b: 30 })
        } else if tile.hidden {
            (Color::Rgb { r: 0, g: 180, b: 180 }, Color::Rgb { r: 0, g: 40, b: 40 })
        } else {
            (Color::Rgb { r: 160, g: 160, b: 160 }, Color::Rgb { r: 70, g: 70, b: 70 })
        };
        Cell::new(ch, fg, bg)
    }

    fn put_cell(&mut self, col: usize, row: usize, cell: Cell) {
        self.front.set(col, row, cell);
        self.front.set(col + 1, row, cell);
    }

    /// Draw at a grid position if the camera sees it.
    fn put_world(&mut self, gx: i32, gy: i32, cell: Cell) {
        let cam = self.camera;
        let (vx, vy) = (gx - cam.x, gy - cam.y);
        if vx < 0 || vy < 0 || vx as usize >= cam.view_w || vy as usize >= cam.view_h {
            return;
        }
        let (col, row) = (vx as usize * CELL_W, MAP_ROW + vy as usize);
        if col + 1 < self.front.width && row < self.front.height {
            self.put_cell(col, row, cell);
        }
    }
}

/// Grid cell under the centre of a box.
fn cell_of(b: &ActorBounds, tile_size: f32) -> (i32, i32) {
    let cx = (b.left + b.right) * 0.5;
    let cy = (b.top + b.bottom) * 0.5;
    ((cx / tile_size).floor() as i32, (cy / tile_size).floor() as i32)
}
