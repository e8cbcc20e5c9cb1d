//! Top-down overlay of the map and every player, toggled from the keyboard.
use crate::core::maze::{TileMap, EMPTY};
use crate::core::player::Player;
use crate::render::framebuffer::{rgba, Framebuffer};

const WALL: u32 = rgba(200, 40, 40, 255);
const FLOOR: u32 = rgba(20, 20, 20, 255);
const LOCAL: u32 = rgba(255, 220, 0, 255);
const REMOTE: u32 = rgba(0, 200, 255, 255);
/// Length of the facing tick, in cells.
const FACING: f32 = 1.0;

/// Bresenham line, clipped per pixel.
pub fn draw_line(fb: &mut Framebuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        fb.set_pixel(x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_rect(fb: &mut Framebuffer, x: i32, y: i32, w: i32, h: i32, color: u32) {
    for py in y..y + h {
        for px in x..x + w {
            fb.set_pixel(px, py, color);
        }
    }
}

/// Draws the map with its top-left corner at `(x, y)`, `cell` pixels per tile.
/// `players[local]` is highlighted.
pub fn draw_minimap(
    fb: &mut Framebuffer,
    map: &TileMap,
    players: &[Player],
    local: usize,
    x: i32,
    y: i32,
    cell: u32,
) {
    let cell = cell.max(1) as i32;
    for ty in 0..map.height() as i32 {
        for tx in 0..map.width() as i32 {
            let color = if map.get(tx, ty) == EMPTY { FLOOR } else { WALL };
            fill_rect(fb, x + tx * cell, y + ty * cell, cell, cell, color);
        }
    }

    let to_screen = |wx: f32, wy: f32| (x + (wx * cell as f32) as i32, y + (wy * cell as f32) as i32);
    for (i, p) in players.iter().enumerate() {
        let color = if i == local { LOCAL } else { REMOTE };
        let (px, py) = to_screen(p.x, p.y);
        let (fx, fy) = to_screen(p.x + p.angle.cos() * FACING, p.y + p.angle.sin() * FACING);
        draw_line(fb, px, py, fx, fy, color);
        fill_rect(fb, px - 1, py - 1, 3, 3, color);
    }
}
