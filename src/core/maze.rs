//! Tile map loading and lookup.
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub const EMPTY: u8 = b' ';
/// Code used to pad short rows and for every lookup outside the grid.
pub const BOUNDARY: u8 = b'0';

/// Map shipped with the crate, used when no map file can be read.
pub const DEFAULT_MAP: &str = include_str!("../../maps/labyrinth.txt");

/// Fixed-size grid of cell codes, row-major (`x + y * width`).
///
/// `' '` is passable, every other code is a wall whose texture id is `code - '0'`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TileMap {
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows: Vec<Vec<u8>> = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let mut row = Vec::with_capacity(line.len());
            for ch in line.chars() {
                match ch {
                    '\t' => row.push(EMPTY),
                    ' '..='~' => row.push(ch as u8),
                    _ => bail!("line {}: unsupported map character {:?}", n + 1, ch),
                }
            }
            rows.push(row);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }

        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let height = rows.len();
        if width == 0 || height == 0 {
            bail!("map is empty");
        }

        let mut cells = Vec::with_capacity(width * height);
        for mut row in rows {
            row.resize(width, BOUNDARY);
            cells.extend_from_slice(&row);
        }
        if !cells.contains(&EMPTY) {
            bail!("map has no open cells");
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read map {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid map {}", path.display()))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell code at integer coordinates; anything outside the grid is a wall.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return BOUNDARY;
        }
        self.cells[x as usize + y as usize * self.width]
    }

    /// Cell code containing a world-space point.
    #[inline]
    pub fn tile_at(&self, x: f32, y: f32) -> u8 {
        self.get(x.floor() as i32, y.floor() as i32)
    }

    #[inline]
    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == EMPTY
    }

    /// Number of passable cells.
    pub fn open_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c == EMPTY).count()
    }
}

/// Texture index of a wall code.
#[inline]
pub fn texture_id(code: u8) -> i32 {
    code as i32 - b'0' as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_rows_and_drops_trailing_blank_lines() {
        let map = TileMap::parse("111\n1 \n111\n\n").unwrap();
        assert_eq!((map.width(), map.height()), (3, 3));
        assert_eq!(map.get(2, 1), BOUNDARY);
        assert!(map.is_empty(1, 1));
        assert_eq!(map.open_cells(), 1);
    }

    #[test]
    fn outside_is_solid() {
        let map = TileMap::parse("   \n   ").unwrap();
        assert_eq!(map.get(-1, 0), BOUNDARY);
        assert_eq!(map.get(0, 2), BOUNDARY);
        assert_eq!(map.tile_at(-0.5, 0.5), BOUNDARY);
        assert_eq!(map.tile_at(2.99, 1.99), EMPTY);
    }

    #[test]
    fn rejects_bad_maps() {
        assert!(TileMap::parse("").is_err());
        assert!(TileMap::parse("111\n111").is_err());
        assert!(TileMap::parse("1é1").is_err());
    }

    #[test]
    fn texture_ids() {
        assert_eq!(texture_id(b'0'), 0);
        assert_eq!(texture_id(b'3'), 3);
    }

    #[test]
    fn default_map_parses() {
        let map = TileMap::parse(DEFAULT_MAP).unwrap();
        assert!(map.open_cells() > 10);
    }
}
