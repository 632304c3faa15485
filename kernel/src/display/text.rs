// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Text terminal on an 8 bit indexed framebuffer.
//!
//! Cells are 8x16 pixels: the 8x8 font drawn with every row doubled. At 640x480 that is 80 columns
//! by 30 rows. The screen interprets a small subset of the ANSI escape sequences:
//!
//! - `ESC [ 2 J` clears the screen and homes the cursor.
//! - `ESC [ K` / `ESC [ 2 K` clear to the end of the line / the whole line.
//! - `ESC [ row ; col H` moves the cursor, 1-based. Without parameters it homes.
//! - `ESC [ n m` selects colors: `0` reset, `1` bright, `30..=37`/`90..=97` foreground,
//!   `40..=47`/`100..=107` background.
//!
//! Unknown sequences are swallowed. All framebuffer accesses are volatile and 32 bit aligned,
//! because the framebuffer is mapped as device memory.

use super::{font, VideoSurface};
use core::ptr;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

const ESC: u8 = 0x1B;
const MAX_PARAMS: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Escape {
    Ground,
    Esc,
    Csi {
        params: [u16; MAX_PARAMS],
        count: usize,
    },
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Pixel height of one text cell.
pub const CELL_HEIGHT: usize = 2 * font::GLYPH_HEIGHT;

/// Pixel width of one text cell.
pub const CELL_WIDTH: usize = font::GLYPH_WIDTH;

/// Columns between two tab stops.
pub const TAB_WIDTH: usize = 8;

/// Palette index of the default foreground (light gray).
pub const DEFAULT_FG: u8 = 7;

/// Palette index of the default background (black).
pub const DEFAULT_BG: u8 = 0;

/// The terminal state on top of one framebuffer.
pub struct TextScreen {
    surface: VideoSurface,
    cols: usize,
    rows: usize,
    row: usize,
    col: usize,
    fg: u8,
    bg: u8,
    escape: Escape,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// A palette index repeated into all four bytes of a word.
const fn splat(color: u8) -> u32 {
    u32::from_ne_bytes([color; 4])
}

impl TextScreen {
    fn word_ptr(&self, byte_offset: usize) -> *mut u32 {
        (self.surface.base + byte_offset) as *mut u32
    }

    fn write_word(&self, byte_offset: usize, value: u32) {
        // Offsets handed in here are multiples of four and inside the surface, see `new()`.
        unsafe { ptr::write_volatile(self.word_ptr(byte_offset), value) }
    }

    fn read_word(&self, byte_offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.word_ptr(byte_offset)) }
    }

    /// Fill pixel lines `[first, first + count)` with `color`.
    fn fill_lines(&self, first: usize, count: usize, color: u8) {
        let value = splat(color);
        let start = first * self.surface.pitch;
        let end = (first + count) * self.surface.pitch;

        for offset in (start..end).step_by(4) {
            self.write_word(offset, value);
        }
    }

    /// Fill the cells `[first_col, last_col)` of text row `row` with the background color.
    fn fill_cells(&self, row: usize, first_col: usize, last_col: usize) {
        let value = splat(self.bg);

        for line in 0..CELL_HEIGHT {
            let line_start = (row * CELL_HEIGHT + line) * self.surface.pitch;
            for offset in (line_start + first_col * CELL_WIDTH..line_start + last_col * CELL_WIDTH)
                .step_by(4)
            {
                self.write_word(offset, value);
            }
        }
    }

    fn draw_glyph(&self, row: usize, col: usize, byte: u8) {
        let glyph = font::glyph(byte);

        for line in 0..CELL_HEIGHT {
            let bits = glyph[line / 2];
            let mut pixels = [self.bg; CELL_WIDTH];
            for (i, pixel) in pixels.iter_mut().enumerate() {
                if bits & (0x80 >> i) != 0 {
                    *pixel = self.fg;
                }
            }

            let offset = (row * CELL_HEIGHT + line) * self.surface.pitch + col * CELL_WIDTH;
            let left = u32::from_ne_bytes([pixels[0], pixels[1], pixels[2], pixels[3]]);
            let right = u32::from_ne_bytes([pixels[4], pixels[5], pixels[6], pixels[7]]);
            self.write_word(offset, left);
            self.write_word(offset + 4, right);
        }
    }

    /// Move everything up by one text row and blank the bottom row.
    fn scroll_up(&self) {
        let pitch = self.surface.pitch;
        let row_bytes = CELL_HEIGHT * pitch;
        let end = self.rows * row_bytes;

        for offset in (row_bytes..end).step_by(4) {
            self.write_word(offset - row_bytes, self.read_word(offset));
        }

        self.fill_lines((self.rows - 1) * CELL_HEIGHT, CELL_HEIGHT, self.bg);
    }

    fn newline(&mut self) {
        self.col = 0;

        if self.row + 1 < self.rows {
            self.row += 1;
        } else {
            self.scroll_up();
        }
    }

    fn put_glyph(&mut self, byte: u8) {
        if self.col >= self.cols {
            self.newline();
        }

        self.draw_glyph(self.row, self.col, byte);
        self.col += 1;
    }

    fn control(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            // Backspace only moves. DEL also erases what it moved onto.
            0x08 => self.col = self.col.saturating_sub(1),
            0x7F => {
                self.col = self.col.saturating_sub(1);
                self.fill_cells(self.row, self.col, self.col + 1);
            }
            b'\t' => {
                let next_stop = (self.col / TAB_WIDTH + 1) * TAB_WIDTH;
                self.col = next_stop.min(self.cols - 1);
            }
            ESC => self.escape = Escape::Esc,
            // Bell and the rest of C0 render nothing.
            _ => (),
        }
    }

    fn select_graphic_rendition(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.fg = DEFAULT_FG;
            self.bg = DEFAULT_BG;
        }

        for &param in params {
            match param {
                0 => {
                    self.fg = DEFAULT_FG;
                    self.bg = DEFAULT_BG;
                }
                1 => self.fg |= 0x8,
                30..=37 => self.fg = (param - 30) as u8,
                40..=47 => self.bg = (param - 40) as u8,
                90..=97 => self.fg = (param - 90 + 8) as u8,
                100..=107 => self.bg = (param - 100 + 8) as u8,
                _ => (),
            }
        }
    }

    fn execute_csi(&mut self, final_byte: u8, params: &[u16]) {
        let first = params.first().copied().unwrap_or(0);

        match final_byte {
            b'J' if first == 2 => self.clear(),
            b'K' => match first {
                0 => self.fill_cells(self.row, self.col.min(self.cols), self.cols),
                2 => self.fill_cells(self.row, 0, self.cols),
                _ => (),
            },
            b'H' | b'f' => {
                let row = usize::from(first.max(1)) - 1;
                let col = usize::from(params.get(1).copied().unwrap_or(0).max(1)) - 1;
                self.row = row.min(self.rows - 1);
                self.col = col.min(self.cols - 1);
            }
            b'm' => self.select_graphic_rendition(params),
            _ => (),
        }
    }

    fn escape_byte(&mut self, state: Escape, byte: u8) {
        self.escape = Escape::Ground;

        match (state, byte) {
            (Escape::Esc, b'[') => {
                self.escape = Escape::Csi {
                    params: [0; MAX_PARAMS],
                    count: 0,
                }
            }
            (Escape::Csi { mut params, count }, b'0'..=b'9') => {
                let slot = count.max(1) - 1;
                if slot < MAX_PARAMS {
                    params[slot] = params[slot]
                        .saturating_mul(10)
                        .saturating_add(u16::from(byte - b'0'));
                }
                self.escape = Escape::Csi {
                    params,
                    count: count.max(1),
                };
            }
            (Escape::Csi { params, count }, b';') => {
                self.escape = Escape::Csi {
                    params,
                    count: count.max(1) + 1,
                };
            }
            (Escape::Csi { params, count }, 0x40..=0x7E) => {
                self.execute_csi(byte, &params[..count.min(MAX_PARAMS)]);
            }
            // Malformed. Drop the sequence.
            _ => (),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl TextScreen {
    /// Create a screen on `surface`. Does not touch the pixels.
    pub fn new(surface: VideoSurface) -> Result<Self, &'static str> {
        if surface.depth != 8 {
            return Err("Text screen needs an 8 bit indexed surface");
        }

        if surface.pitch % 4 != 0 || surface.base % 4 != 0 || surface.pitch < surface.width {
            return Err("Framebuffer pitch or base not word aligned");
        }

        if surface.size < surface.pitch * surface.height {
            return Err("Framebuffer smaller than pitch * height");
        }

        let cols = surface.width / CELL_WIDTH;
        let rows = surface.height / CELL_HEIGHT;
        if cols == 0 || rows == 0 {
            return Err("Framebuffer too small for a single text cell");
        }

        Ok(Self {
            surface,
            cols,
            rows,
            row: 0,
            col: 0,
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            escape: Escape::Ground,
        })
    }

    /// Terminal size as (columns, rows).
    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Cursor position as (column, row), zero-based.
    pub fn cursor(&self) -> (usize, usize) {
        (self.col, self.row)
    }

    /// Current (foreground, background) palette indices.
    pub fn colors(&self) -> (u8, u8) {
        (self.fg, self.bg)
    }

    /// Fill the whole surface with the background and home the cursor.
    pub fn clear(&mut self) {
        self.fill_lines(0, self.surface.height, self.bg);
        self.row = 0;
        self.col = 0;
    }

    /// Interpret one terminal byte.
    pub fn write_byte(&mut self, byte: u8) {
        match self.escape {
            Escape::Ground => match byte {
                0x00..=0x1F | 0x7F => self.control(byte),
                _ => self.put_glyph(byte),
            },
            state => self.escape_byte(state, byte),
        }
    }

    /// Interpret a run of terminal bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Palette index of the pixel at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let offset = y * self.surface.pitch + x;
        let word = self.read_word(offset & !0x3);

        word.to_ne_bytes()[offset & 0x3]
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{vec, vec::Vec};
    use test_macros::kernel_test;

    /// 4 columns x 2 rows.
    const WIDTH: usize = 32;
    const HEIGHT: usize = 32;

    fn surface_over(memory: &mut Vec<u32>) -> VideoSurface {
        VideoSurface {
            base: memory.as_mut_ptr() as usize,
            size: memory.len() * 4,
            pitch: WIDTH,
            width: WIDTH,
            height: HEIGHT,
            depth: 8,
        }
    }

    /// Whether any pixel of cell (col, row) has palette index `color`.
    fn cell_has(screen: &TextScreen, col: usize, row: usize, color: u8) -> bool {
        (0..CELL_HEIGHT).any(|y| {
            (0..CELL_WIDTH).any(|x| {
                screen.pixel(col * CELL_WIDTH + x, row * CELL_HEIGHT + y) == color
            })
        })
    }

    #[kernel_test]
    fn rejects_unsupported_surfaces() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let surface = surface_over(&mut memory);

        assert!(TextScreen::new(VideoSurface { depth: 16, ..surface }).is_err());
        assert!(TextScreen::new(VideoSurface { pitch: 30, ..surface }).is_err());
        assert!(TextScreen::new(VideoSurface { size: 16, ..surface }).is_err());
    }

    #[kernel_test]
    fn glyphs_advance_and_wrap() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let mut screen = TextScreen::new(surface_over(&mut memory)).unwrap();
        assert_eq!(screen.size(), (4, 2));

        screen.write_bytes(b"ABCDE");

        assert_eq!(screen.cursor(), (1, 1));
        assert!(cell_has(&screen, 0, 0, DEFAULT_FG));
        assert!(cell_has(&screen, 0, 1, DEFAULT_FG));
        assert!(!cell_has(&screen, 1, 1, DEFAULT_FG));
    }

    #[kernel_test]
    fn control_bytes_move_the_cursor() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let mut screen = TextScreen::new(surface_over(&mut memory)).unwrap();

        screen.write_bytes(b"ab\r");
        assert_eq!(screen.cursor(), (0, 0));

        screen.write_bytes(b"ab\x08");
        assert_eq!(screen.cursor(), (1, 0));
        // Backspace keeps the glyph, DEL erases it.
        assert!(cell_has(&screen, 1, 0, DEFAULT_FG));
        screen.write_byte(0x7F);
        assert!(!cell_has(&screen, 0, 0, DEFAULT_FG));

        screen.write_byte(b'\n');
        assert_eq!(screen.cursor(), (0, 1));

        // Past the last tab stop the cursor sticks to the last column.
        screen.write_byte(b'\t');
        assert_eq!(screen.cursor(), (3, 1));
    }

    #[kernel_test]
    fn newline_on_last_row_scrolls() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let mut screen = TextScreen::new(surface_over(&mut memory)).unwrap();

        screen.write_bytes(b"\nX\n");

        assert_eq!(screen.cursor(), (0, 1));
        assert!(cell_has(&screen, 0, 0, DEFAULT_FG));
        assert!(!cell_has(&screen, 0, 1, DEFAULT_FG));
    }

    #[kernel_test]
    fn escape_sequences_are_interpreted_not_drawn() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let mut screen = TextScreen::new(surface_over(&mut memory)).unwrap();

        screen.write_bytes(b"\x1B[44;93m");
        assert_eq!(screen.colors(), (11, 4));
        assert_eq!(screen.cursor(), (0, 0));

        screen.write_bytes(b"\x1B[2J");
        assert_eq!(screen.pixel(WIDTH - 1, HEIGHT - 1), 4);

        screen.write_bytes(b"\x1B[2;3H");
        assert_eq!(screen.cursor(), (2, 1));

        screen.write_bytes(b"\x1B[0m\x1B[H");
        assert_eq!(screen.colors(), (DEFAULT_FG, DEFAULT_BG));
        assert_eq!(screen.cursor(), (0, 0));

        // Unknown final bytes and broken sequences leave no trace.
        screen.write_bytes(b"\x1B[5n\x1Bx");
        assert_eq!(screen.cursor(), (0, 0));
    }

    #[kernel_test]
    fn clear_line_uses_background() {
        let mut memory = vec![0u32; WIDTH * HEIGHT / 4];
        let mut screen = TextScreen::new(surface_over(&mut memory)).unwrap();

        screen.write_bytes(b"abcd\x1B[41m\x1B[2K");

        assert!(!cell_has(&screen, 0, 0, DEFAULT_FG));
        assert_eq!(screen.pixel(0, 0), 1);
        assert_eq!(screen.pixel(0, CELL_HEIGHT), 0);
    }
}
