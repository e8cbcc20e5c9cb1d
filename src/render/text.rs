//! Bitmap text and the console overlay.
use anyhow::{bail, Result};

use crate::core::console::Console;
use crate::render::framebuffer::{rgba, Framebuffer, WHITE};

/// Printable ASCII `' '..='~'`.
pub const GLYPH_COUNT: u32 = 95;
/// Longest string drawn in one call.
pub const TEXT_MAX: usize = 128;
const TAB_SIZE: i32 = 4;
const SHADOW: u32 = rgba(0, 0, 0, 255);
const MARGIN: i32 = 5;

/// Fixed-width glyph strip covering printable ASCII. Non-zero pixels are ink.
#[derive(Clone, Debug)]
pub struct Font {
    pixels: Vec<u32>,
    char_width: u32,
    char_height: u32,
}

impl Font {
    pub fn from_strip(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if height == 0 || width < GLYPH_COUNT || width % GLYPH_COUNT != 0 {
            bail!("font strip {width}x{height} does not hold {GLYPH_COUNT} equal glyphs");
        }
        if pixels.len() != (width * height) as usize {
            bail!("font strip has {} pixels, expected {}", pixels.len(), width * height);
        }
        Ok(Self {
            pixels,
            char_width: width / GLYPH_COUNT,
            char_height: height,
        })
    }

    #[cfg(feature = "desktop")]
    pub fn load(path: &str) -> Result<Self> {
        let atlas = raylib::prelude::Image::load_image(path)
            .map_err(|e| anyhow::anyhow!("could not load font '{path}': {e:?}"))?;
        let w = atlas.width().max(0) as u32;
        let h = atlas.height().max(0) as u32;
        let pixels = atlas
            .get_image_data()
            .iter()
            .map(|c| if c.a == 0 { 0 } else { WHITE })
            .collect();
        Self::from_strip(w, h, pixels)
    }

    /// Built-in 3x5 font, each glyph padded to 4x6 and magnified by `scale`.
    pub fn builtin(scale: u32) -> Self {
        let scale = scale.max(1);
        let cw = 4 * scale;
        let ch = 6 * scale;
        let pitch = cw * GLYPH_COUNT;
        let mut pixels = vec![0; (pitch * ch) as usize];
        for (g, rows) in GLYPHS.iter().enumerate() {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..3u32 {
                    if bits & (0b100 >> col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let x = g as u32 * cw + col * scale + dx;
                            let y = row as u32 * scale + dy;
                            pixels[(x + y * pitch) as usize] = WHITE;
                        }
                    }
                }
            }
        }
        Self {
            pixels,
            char_width: cw,
            char_height: ch,
        }
    }

    #[inline]
    pub fn char_width(&self) -> u32 {
        self.char_width
    }

    #[inline]
    pub fn char_height(&self) -> u32 {
        self.char_height
    }

    #[inline]
    fn ink(&self, glyph: u32, x: u32, y: u32) -> bool {
        let pitch = self.char_width * GLYPH_COUNT;
        self.pixels[(glyph * self.char_width + x + y * pitch) as usize] != 0
    }

    fn blit(&self, fb: &mut Framebuffer, glyph: u32, x: i32, y: i32, color: u32) {
        for iy in 0..self.char_height {
            for ix in 0..self.char_width {
                if self.ink(glyph, ix, iy) {
                    fb.set_pixel(x + ix as i32, y + iy as i32, color);
                }
            }
        }
    }
}

/// Draws `text` with a one-pixel drop shadow. `\n` starts a new line and `\t` advances
/// to the next tab stop; other non-printable characters are skipped.
pub fn draw_text(fb: &mut Framebuffer, font: &Font, x: i32, y: i32, color: u32, text: &str) {
    let cw = font.char_width as i32;
    let ch = font.char_height as i32;
    let mut x_offset = 0;
    let mut y_offset = 0;
    for c in text.chars().take(TEXT_MAX) {
        match c {
            ' '..='~' => {
                let glyph = c as u32 - ' ' as u32;
                font.blit(fb, glyph, x + x_offset, y + y_offset + 1, SHADOW);
                font.blit(fb, glyph, x + x_offset, y + y_offset, color);
                x_offset += cw;
            }
            '\n' => {
                y_offset += ch;
                x_offset = 0;
            }
            '\t' => {
                // Rounds up, so a tab already on a stop stays put.
                let stop = cw * TAB_SIZE;
                x_offset = (x_offset + stop - 1) / stop * stop;
            }
            _ => {}
        }
    }
}

/// Scrollback above the entry line, newest at the bottom, plus the entry with a cursor.
pub fn draw_console(fb: &mut Framebuffer, font: &Font, console: &Console, cursor_on: bool) {
    let ch = font.char_height as i32;
    let bottom = fb.height as i32 - MARGIN;
    for (i, line) in console.lines().enumerate() {
        let y = bottom - ch * 2 - i as i32 * ch;
        draw_text(fb, font, MARGIN, y, WHITE, line);
    }
    if console.entry_active() {
        let y = bottom - ch;
        draw_text(fb, font, MARGIN, y, WHITE, &format!("> {}", console.entry()));
        if cursor_on {
            let x = MARGIN + (console.entry().len() as i32 + 2) * font.char_width as i32;
            draw_text(fb, font, x, y, WHITE, "_");
        }
    }
}

#[rustfmt::skip]
const GLYPHS: [[u8; 5]; GLYPH_COUNT as usize] = [
    [0,0,0,0,0], [2,2,2,0,2], [5,5,0,0,0], [5,7,5,7,5], [3,6,2,3,6], [5,1,2,4,5],
    [2,5,2,5,3], [2,2,0,0,0], [1,2,2,2,1], [4,2,2,2,4], [0,5,2,5,0], [0,2,7,2,0],
    [0,0,0,2,4], [0,0,7,0,0], [0,0,0,0,2], [1,1,2,4,4],
    // 0-9
    [7,5,5,5,7], [2,6,2,2,7], [7,1,7,4,7], [7,1,3,1,7], [5,5,7,1,1],
    [7,4,7,1,7], [7,4,7,5,7], [7,1,1,2,2], [7,5,7,5,7], [7,5,7,1,7],
    [0,2,0,2,0], [0,2,0,2,4], [1,2,4,2,1], [0,7,0,7,0], [4,2,1,2,4], [7,1,2,0,2],
    [7,5,7,4,7],
    // A-Z
    [2,5,7,5,5], [6,5,6,5,6], [3,4,4,4,3], [6,5,5,5,6], [7,4,6,4,7], [7,4,6,4,4],
    [3,4,5,5,3], [5,5,7,5,5], [7,2,2,2,7], [1,1,1,5,2], [5,5,6,5,5], [4,4,4,4,7],
    [5,7,7,5,5], [6,5,5,5,5], [2,5,5,5,2], [6,5,6,4,4], [2,5,5,6,3], [6,5,6,5,5],
    [3,4,2,1,6], [7,2,2,2,2], [5,5,5,5,7], [5,5,5,5,2], [5,5,7,7,5], [5,5,2,5,5],
    [5,5,2,2,2], [7,1,2,4,7],
    [6,4,4,4,6], [4,4,2,1,1], [3,1,1,1,3], [2,5,0,0,0], [0,0,0,0,7], [4,2,0,0,0],
    // a-z share the capitals
    [2,5,7,5,5], [6,5,6,5,6], [3,4,4,4,3], [6,5,5,5,6], [7,4,6,4,7], [7,4,6,4,4],
    [3,4,5,5,3], [5,5,7,5,5], [7,2,2,2,7], [1,1,1,5,2], [5,5,6,5,5], [4,4,4,4,7],
    [5,7,7,5,5], [6,5,5,5,5], [2,5,5,5,2], [6,5,6,4,4], [2,5,5,6,3], [6,5,6,5,5],
    [3,4,2,1,6], [7,2,2,2,2], [5,5,5,5,7], [5,5,5,5,2], [5,5,7,7,5], [5,5,2,5,5],
    [5,5,2,2,2], [7,1,2,4,7],
    [3,2,6,2,3], [2,2,2,2,2], [6,2,3,2,6], [0,4,7,1,0],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_must_hold_every_glyph() {
        assert!(Font::from_strip(94, 5, vec![0; 94 * 5]).is_err());
        assert!(Font::from_strip(190, 5, vec![0; 10]).is_err());
        let font = Font::from_strip(190, 5, vec![0; 950]).unwrap();
        assert_eq!((font.char_width(), font.char_height()), (2, 5));
    }

    #[test]
    fn builtin_glyphs() {
        let font = Font::builtin(2);
        assert_eq!((font.char_width(), font.char_height()), (8, 12));
        // 'I' has a full top bar, space is blank.
        let i = 'I' as u32 - ' ' as u32;
        assert!((0..6).all(|x| font.ink(i, x, 0)));
        assert!((0..8).all(|x| (0..12).all(|y| !font.ink(0, x, y))));
    }

    #[test]
    fn text_draws_ink_shadow_and_newlines() {
        let font = Font::builtin(1);
        let mut fb = Framebuffer::new(40, 20);
        fb.fill(rgba(9, 9, 9, 255));
        let red = rgba(255, 0, 0, 255);
        draw_text(&mut fb, &font, 0, 0, red, "I\nI");
        assert_eq!(fb.get_pixel(0, 0), red);
        // Shadow peeks out below the last row of the stem.
        assert_eq!(fb.get_pixel(1, 5), SHADOW);
        // Second line starts one glyph height down, back at the left margin.
        assert_eq!(fb.get_pixel(0, 6), red);
        assert_eq!(fb.get_pixel(4, 0), rgba(9, 9, 9, 255));
    }

    #[test]
    fn tabs_align_to_stops() {
        let font = Font::builtin(1);
        let mut fb = Framebuffer::new(64, 8);
        fb.fill(0);
        draw_text(&mut fb, &font, 0, 0, WHITE, "I\tI");
        // Tab stop is 4 glyphs of 4 pixels.
        assert_eq!(fb.get_pixel(0, 0), WHITE);
        assert_eq!(fb.get_pixel(8, 0), 0);
        assert_eq!(fb.get_pixel(16, 0), WHITE);

        // Already on a stop: the tab does not move the pen.
        fb.fill(0);
        draw_text(&mut fb, &font, 0, 0, WHITE, "\tI");
        assert_eq!(fb.get_pixel(0, 0), WHITE);
        assert_eq!(fb.get_pixel(16, 0), 0);
    }
}
