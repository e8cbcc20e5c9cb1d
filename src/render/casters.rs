//! Per-column ray marching against the tile map.
use std::f32::consts::PI;

use crate::core::maze::{texture_id, TileMap, EMPTY};
use crate::core::player::Player;
use crate::render::render3d::RenderContext;
use crate::render::textures::Atlas;

/// Rays start this far from the viewer so they never hit the viewer's own tile edge.
pub const MIN_DISTANCE_FROM_WALL: f32 = 0.1;
/// Smallest ray march step. Finer steps are raised to this so a column stays bounded.
pub const MIN_VIEW_ACCURACY: f32 = 1e-4;
/// Narrowest field of view the console accepts.
pub const MIN_FOV: f32 = 0.01;

/// Live view parameters, settable from the console.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewSettings {
    /// Horizontal field of view in radians.
    pub fov: f32,
    /// Maximum ray march distance in tiles.
    pub view_distance: f32,
    /// Ray march step in tiles.
    pub view_accuracy: f32,
}

impl ViewSettings {
    pub const DEFAULT_VIEW_DISTANCE: f32 = 32.0;
    pub const DEFAULT_VIEW_ACCURACY: f32 = 0.01;

    pub fn for_screen(width: u32, height: u32) -> Self {
        Self {
            fov: fov_for_screen(width, height),
            view_distance: Self::DEFAULT_VIEW_DISTANCE,
            view_accuracy: Self::DEFAULT_VIEW_ACCURACY,
        }
    }
}

/// 60° at a 1:1 aspect, widening with the screen.
pub fn fov_for_screen(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        return PI / 3.0;
    }
    PI / (3.0 * (height as f32 / width as f32))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersect {
    pub distance: f32,
    pub impact: u8,
    pub hit_x: f32,
    pub hit_y: f32,
}

/// Angle of the ray through screen column `sx`.
#[inline]
pub fn ray_angle(viewer_angle: f32, fov: f32, sx: u32, screen_width: u32) -> f32 {
    let t = sx as f32 / screen_width as f32;
    (1.0 - t) * (viewer_angle - fov / 2.0) + t * (viewer_angle + fov / 2.0)
}

/// Marches from `(x, y)` along `angle` until a non-empty tile or `view_distance`.
pub fn cast_ray(map: &TileMap, x: f32, y: f32, angle: f32, view: &ViewSettings) -> Option<Intersect> {
    if view.view_accuracy.is_nan() || view.view_accuracy <= 0.0 {
        return None;
    }
    let step = view.view_accuracy.max(MIN_VIEW_ACCURACY);
    // Counted steps: `distance += step` stalls once step drops below the f32 spacing.
    let steps = ((view.view_distance - MIN_DISTANCE_FROM_WALL) / step).ceil();
    if !(steps > 0.0) {
        return None;
    }
    let (sin, cos) = angle.sin_cos();
    for i in 0..steps as u32 {
        let distance = MIN_DISTANCE_FROM_WALL + i as f32 * step;
        let cx = x + cos * distance;
        let cy = y + sin * distance;
        let impact = map.tile_at(cx, cy);
        if impact != EMPTY {
            return Some(Intersect {
                distance,
                impact,
                hit_x: cx,
                hit_y: cy,
            });
        }
    }
    None
}

/// Projected wall height in pixels.
#[inline]
pub fn wall_height(screen_height: u32, distance: f32) -> i32 {
    (screen_height as f32 / distance) as i32
}

/// Texture column for a hit point.
///
/// The larger fractional part picks the face that was struck. `accuracy` is added before
/// truncating so that samples sitting just below an integer (2.9999) count as just past
/// it instead of as a full tile width.
#[inline]
pub fn texture_x(hit_x: f32, hit_y: f32, accuracy: f32, texture_size: u32) -> i32 {
    let fx = hit_x - (hit_x + accuracy).floor();
    let fy = hit_y - (hit_y + accuracy).floor();
    let tx = (fx.max(fy) * texture_size as f32) as i32;
    tx.clamp(0, texture_size as i32 - 1)
}

/// Draws the textured wall columns for `viewer` and records each column's hit distance.
/// Columns without a hit keep whatever the background pass drew and report +∞ depth.
pub fn render_player_view(
    ctx: &mut RenderContext,
    map: &TileMap,
    textures: &Atlas,
    viewer: &Player,
    view: &ViewSettings,
) {
    ctx.depth.reset();
    let screen_width = ctx.framebuffer.width;
    let screen_height = ctx.framebuffer.height;
    let texture_size = textures.tile_size();

    for sx in 0..screen_width {
        let angle = ray_angle(viewer.angle, view.fov, sx, screen_width);
        let Some(hit) = cast_ray(map, viewer.x, viewer.y, angle, view) else {
            continue;
        };

        let h = wall_height(screen_height, hit.distance);
        let tx = texture_x(hit.hit_x, hit.hit_y, view.view_accuracy, texture_size);
        let tex = texture_id(hit.impact);
        let top = (screen_height as i32 - h) / 2;

        // Only the rows that land on screen.
        let first = (-top).max(0);
        let last = h.min(screen_height as i32 - top);
        for ty in first..last {
            let v = (ty as i64 * texture_size as i64 / h as i64) as i32;
            ctx.framebuffer
                .set_pixel(sx as i32, ty + top, textures.texel(tex, tx, v));
        }

        ctx.depth.set(sx as usize, hit.distance);
    }
}
