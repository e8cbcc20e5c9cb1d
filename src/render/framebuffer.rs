//! CPU framebuffer of packed RGBA pixels.
#[cfg(feature = "desktop")]
use raylib::core::texture::RaylibTexture2D;
#[cfg(feature = "desktop")]
use raylib::prelude::Texture2D;

/// Packs a colour so that its in-memory bytes are `R, G, B, A`.
#[inline]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

pub const WHITE: u32 = rgba(255, 255, 255, 255);
pub const BLACK: u32 = rgba(0, 0, 0, 255);

pub struct Framebuffer {
    pub color_buffer: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color_buffer: vec![BLACK; (width * height) as usize],
            width,
            height,
        }
    }

    /// Reallocates for a new screen size. Contents are undefined until the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.color_buffer.resize((width * height) as usize, BLACK);
    }

    #[inline]
    pub fn fill(&mut self, color: u32) {
        self.color_buffer.fill(color);
    }

    /// Fills whole rows `[y0, y1)`; rows past the bottom are ignored.
    pub fn fill_rows(&mut self, y0: u32, y1: u32, color: u32) {
        let y1 = y1.min(self.height);
        if y0 >= y1 {
            return;
        }
        let w = self.width as usize;
        self.color_buffer[y0 as usize * w..y1 as usize * w].fill(color);
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if self.in_bounds(x, y) {
            self.color_buffer[y as usize * self.width as usize + x as usize] = color;
        }
    }

    /// Returns 0 (transparent) outside the buffer.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> u32 {
        if self.in_bounds(x, y) {
            return self.color_buffer[y as usize * self.width as usize + x as usize];
        }
        0
    }

    pub fn row(&self, y: u32) -> Option<&[u32]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        Some(&self.color_buffer[start..start + w])
    }

    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u32]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        Some(&mut self.color_buffer[start..start + w])
    }

    /// Raw RGBA8 bytes, row-major, ready for a streaming texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color_buffer)
    }

    /// Uploads the pixels into a persistent texture of the same size.
    #[cfg(feature = "desktop")]
    pub fn upload_to_texture(&self, tex: &mut Texture2D) {
        if let Err(e) = tex.update_texture(self.as_bytes()) {
            tracing::warn!("texture upload failed: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_byte_order() {
        let c = rgba(1, 2, 3, 4);
        assert_eq!(c.to_le_bytes(), [1, 2, 3, 4]);
        let fb = {
            let mut fb = Framebuffer::new(1, 1);
            fb.set_pixel(0, 0, c);
            fb
        };
        assert_eq!(fb.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut fb = Framebuffer::new(4, 3);
        fb.fill(BLACK);
        fb.set_pixel(-1, 0, WHITE);
        fb.set_pixel(4, 0, WHITE);
        fb.set_pixel(0, 3, WHITE);
        assert!(fb.color_buffer.iter().all(|&c| c == BLACK));
        assert_eq!(fb.get_pixel(10, 10), 0);
    }

    #[test]
    fn rows_are_contiguous() {
        let mut fb = Framebuffer::new(3, 2);
        fb.fill(BLACK);
        fb.row_mut(1).unwrap().fill(WHITE);
        assert_eq!(fb.get_pixel(2, 1), WHITE);
        assert_eq!(fb.get_pixel(2, 0), BLACK);
        assert!(fb.row(2).is_none());
        fb.fill_rows(0, 10, WHITE);
        assert!(fb.color_buffer.iter().all(|&c| c == WHITE));
    }
}
