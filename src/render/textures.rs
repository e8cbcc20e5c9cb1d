//! Texture atlases: horizontal strips of equally sized square tiles.
use anyhow::{bail, Result};
#[cfg(feature = "desktop")]
use raylib::prelude::*;

use crate::render::framebuffer::rgba;

/// Read-only strip of `tile_count` square tiles, each `tile_size` pixels wide.
///
/// A texel value of 0 is fully transparent; wall strips never contain it in practice,
/// sprite strips use it for the background.
#[derive(Clone, Debug)]
pub struct Atlas {
    pixels: Vec<u32>,
    tile_size: u32,
    tile_count: u32,
    pitch: u32,
}

impl Atlas {
    /// Wraps a decoded `width` x `height` image. The strip must be exactly
    /// `height * n` pixels wide.
    pub fn from_strip(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("atlas is empty ({width}x{height})");
        }
        if pixels.len() != (width * height) as usize {
            bail!(
                "atlas has {} pixels, expected {}x{}",
                pixels.len(),
                width,
                height
            );
        }
        if width % height != 0 {
            bail!("atlas width {width} is not a multiple of its tile size {height}");
        }
        Ok(Self {
            pixels,
            tile_size: height,
            tile_count: width / height,
            pitch: width,
        })
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[inline]
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    #[inline]
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Texel `(x, y)` of tile `index`, or 0 for any out-of-range coordinate.
    #[inline]
    pub fn texel(&self, index: i32, x: i32, y: i32) -> u32 {
        let size = self.tile_size as i32;
        if index >= 0 && (index as u32) < self.tile_count && x >= 0 && x < size && y >= 0 && y < size
        {
            let x = (x + size * index) as usize;
            return self.pixels[x + y as usize * self.pitch as usize];
        }
        0
    }

    /// Decodes an image file into an atlas. Pixels with zero alpha become transparent.
    #[cfg(feature = "desktop")]
    pub fn load(path: &str) -> Result<Self> {
        let img = Image::load_image(path)
            .map_err(|e| anyhow::anyhow!("could not load image '{path}': {e:?}"))?;
        let w = img.width().max(0) as u32;
        let h = img.height().max(0) as u32;
        let pixels = img
            .get_image_data()
            .iter()
            .map(|c| if c.a == 0 { 0 } else { rgba(c.r, c.g, c.b, c.a) })
            .collect();
        Self::from_strip(w, h, pixels)
    }

    /// Procedural wall strip used when no wall image is available.
    pub fn fallback_walls(size: u32, count: u32) -> Self {
        let palette = [
            rgba(150, 150, 150, 255),
            rgba(140, 60, 50, 255),
            rgba(60, 110, 160, 255),
            rgba(90, 140, 70, 255),
            rgba(170, 140, 60, 255),
            rgba(120, 80, 150, 255),
        ];
        let pitch = size * count;
        let mut pixels = vec![0; (pitch * size) as usize];
        let brick_h = (size / 4).max(1);
        let brick_w = (size / 2).max(1);
        for t in 0..count {
            let base = palette[t as usize % palette.len()];
            let mortar = mix(base, rgba(20, 20, 20, 255), 160);
            for y in 0..size {
                let row = y / brick_h;
                let offset = if row % 2 == 0 { 0 } else { brick_w / 2 };
                for x in 0..size {
                    let edge = y % brick_h == 0 || (x + offset) % brick_w == 0;
                    let c = if edge { mortar } else { base };
                    pixels[(x + t * size + y * pitch) as usize] = c;
                }
            }
        }
        Self {
            pixels,
            tile_size: size,
            tile_count: count,
            pitch,
        }
    }

    /// Procedural figures on a transparent background, one colour per tile.
    pub fn fallback_sprites(size: u32, count: u32) -> Self {
        let pitch = size * count;
        let mut pixels = vec![0; (pitch * size) as usize];
        let cx = size as f32 * 0.5;
        let body_cy = size as f32 * 0.65;
        let head_cy = size as f32 * 0.25;
        let (rx, ry) = (size as f32 * 0.22, size as f32 * 0.33);
        let head_r = size as f32 * 0.14;
        for t in 0..count {
            let k = t + 1;
            let body = rgba(
                ((k * 97) % 200 + 55) as u8,
                ((k * 57) % 200 + 55) as u8,
                ((k * 31) % 200 + 55) as u8,
                255,
            );
            let head = mix(body, rgba(255, 255, 255, 255), 96);
            for y in 0..size {
                for x in 0..size {
                    let fx = x as f32 + 0.5 - cx;
                    let by = (y as f32 + 0.5 - body_cy) / ry;
                    let hy = y as f32 + 0.5 - head_cy;
                    let i = (x + t * size + y * pitch) as usize;
                    if (fx / rx).powi(2) + by * by <= 1.0 {
                        pixels[i] = body;
                    } else if fx * fx + hy * hy <= head_r * head_r {
                        pixels[i] = head;
                    }
                }
            }
        }
        Self {
            pixels,
            tile_size: size,
            tile_count: count,
            pitch,
        }
    }
}

#[inline]
fn mix(a: u32, b: u32, t: u8) -> u32 {
    let [ar, ag, ab, aa] = a.to_le_bytes();
    let [br, bg, bb, ba] = b.to_le_bytes();
    let ta = t as u16;
    let na = 255u16 - ta;
    let m = |x: u8, y: u8| -> u8 { (((x as u16) * na + (y as u16) * ta) / 255) as u8 };
    rgba(m(ar, br), m(ag, bg), m(ab, bb), m(aa, ba))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_dimensions_are_validated() {
        assert!(Atlas::from_strip(0, 0, vec![]).is_err());
        assert!(Atlas::from_strip(10, 4, vec![1; 40]).is_err());
        assert!(Atlas::from_strip(8, 4, vec![1; 31]).is_err());
        let atlas = Atlas::from_strip(8, 4, vec![1; 32]).unwrap();
        assert_eq!(atlas.tile_size(), 4);
        assert_eq!(atlas.tile_count(), 2);
        assert_eq!(atlas.pitch(), 8);
    }

    #[test]
    fn texel_addresses_tiles_and_guards_range() {
        let pixels: Vec<u32> = (0..8).collect();
        // 4x2 strip: two 2x2 tiles.
        let atlas = Atlas::from_strip(4, 2, pixels).unwrap();
        assert_eq!(atlas.texel(0, 1, 1), 5);
        assert_eq!(atlas.texel(1, 0, 0), 2);
        assert_eq!(atlas.texel(1, 1, 1), 7);
        assert_eq!(atlas.texel(2, 0, 0), 0);
        assert_eq!(atlas.texel(-1, 0, 0), 0);
        assert_eq!(atlas.texel(0, 2, 0), 0);
        assert_eq!(atlas.texel(0, 0, -1), 0);
    }

    #[test]
    fn fallbacks_are_well_formed() {
        let walls = Atlas::fallback_walls(16, 5);
        assert_eq!(walls.tile_count(), 5);
        assert!((0..16).all(|y| (0..16).all(|x| walls.texel(3, x, y) != 0)));

        let sprites = Atlas::fallback_sprites(16, 4);
        assert_eq!(sprites.texel(0, 0, 0), 0);
        assert_ne!(sprites.texel(0, 8, 10), 0);
    }
}
