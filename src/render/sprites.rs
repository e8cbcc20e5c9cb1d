//! Billboard sprites for other players, depth tested against the wall columns.
use std::f32::consts::FRAC_PI_2;

use crate::core::player::{normalize_angle, Player};
use crate::render::casters::ViewSettings;
use crate::render::depth::DepthBuffer;
use crate::render::render3d::RenderContext;
use crate::render::textures::Atlas;

/// Entities closer than this to the viewer are never drawn or targeted.
pub const MIN_SPRITE_DISTANCE: f32 = 0.2;

/// Angle of `(x, y)` relative to the viewer's facing, in `(-π, π]`.
#[inline]
pub fn relative_angle(x: f32, y: f32, viewer: &Player) -> f32 {
    normalize_angle((y - viewer.y).atan2(x - viewer.x) - viewer.angle)
}

/// Screen column of a world point: the inverse of the ray caster's column → angle mapping.
/// Clamped to one screen width either side so later pixel arithmetic cannot overflow.
#[inline]
pub fn get_screen_x(x: f32, y: f32, viewer: &Player, fov: f32, screen_width: u32) -> i32 {
    let angle = relative_angle(x, y, viewer);
    let w = screen_width as f32;
    (angle * w / fov + (screen_width / 2) as f32).clamp(-w, 2.0 * w) as i32
}

/// Widest relative angle still drawn: a half-plane, or half the view when that is wider.
#[inline]
fn cull_angle(view: &ViewSettings) -> f32 {
    FRAC_PI_2.max(view.fov / 2.0)
}

/// On-screen width and height of a sprite at `distance`.
#[inline]
pub fn sprite_extent(distance: f32, sprite_size: u32, screen_height: u32) -> i32 {
    let scale = (screen_height as f32 / sprite_size as f32) / distance;
    (sprite_size as f32 * scale) as i32
}

/// Draws tile `sprite_index` of `sprites` standing at `(x, y)`.
pub fn render_sprite(
    ctx: &mut RenderContext,
    x: f32,
    y: f32,
    sprites: &Atlas,
    sprite_index: usize,
    viewer: &Player,
    view: &ViewSettings,
) {
    let distance = viewer.distance_to(x, y);
    if distance.is_nan() || distance < MIN_SPRITE_DISTANCE {
        return;
    }
    // Behind the viewer.
    if relative_angle(x, y, viewer).abs() > cull_angle(view) {
        return;
    }

    let width = ctx.framebuffer.width as i32;
    let height = ctx.framebuffer.height as i32;
    let size = sprites.tile_size();
    let scaled = sprite_extent(distance, size, ctx.framebuffer.height);
    if scaled <= 0 {
        return;
    }

    let screen_x = get_screen_x(x, y, viewer, view.fov, ctx.framebuffer.width) - scaled / 2;
    let screen_y = height / 2 - scaled / 2;

    let px_range = (-screen_x).max(0)..scaled.min(width - screen_x);
    let py_range = (-screen_y).max(0)..scaled.min(height - screen_y);

    for px in px_range {
        let column = screen_x + px;
        if distance >= ctx.depth.get(column) {
            continue;
        }
        let tx = ((px as f32 / scaled as f32) * size as f32) as i32;
        for py in py_range.clone() {
            let ty = ((py as f32 / scaled as f32) * size as f32) as i32;
            let pixel = sprites.texel(sprite_index as i32, tx, ty);
            if pixel != 0 {
                ctx.framebuffer.set_pixel(column, screen_y + py, pixel);
            }
        }
    }
}

/// Other players ordered farthest first. Equal distances keep their slice order.
pub fn draw_order(players: &[Player], viewer_index: usize) -> Vec<(usize, f32)> {
    let Some(viewer) = players.get(viewer_index) else {
        return Vec::new();
    };
    let mut order: Vec<(usize, f32)> = players
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != viewer_index)
        .map(|(i, p)| (i, viewer.distance_to(p.x, p.y)))
        .filter(|(_, d)| *d > MIN_SPRITE_DISTANCE)
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order
}

/// Painter's pass over every player except the viewer.
pub fn render_players(
    ctx: &mut RenderContext,
    sprites: &Atlas,
    players: &[Player],
    viewer_index: usize,
    view: &ViewSettings,
) {
    let Some(viewer) = players.get(viewer_index) else {
        return;
    };
    let count = sprites.tile_count().max(1) as usize;
    for (i, _) in draw_order(players, viewer_index) {
        let p = &players[i];
        render_sprite(ctx, p.x, p.y, sprites, p.sprite_index % count, viewer, view);
    }
}

/// Nearest visible player whose sprite covers the centre column, if any.
pub fn target_under_crosshair(
    depth: &DepthBuffer,
    players: &[Player],
    viewer_index: usize,
    sprite_size: u32,
    screen_width: u32,
    screen_height: u32,
    view: &ViewSettings,
) -> Option<usize> {
    let viewer = players.get(viewer_index)?;
    let cx = (screen_width / 2) as i32;
    let mut best: Option<(usize, f32)> = None;
    for (i, p) in players.iter().enumerate() {
        if i == viewer_index {
            continue;
        }
        let distance = viewer.distance_to(p.x, p.y);
        if distance.is_nan() || distance < MIN_SPRITE_DISTANCE {
            continue;
        }
        if relative_angle(p.x, p.y, viewer).abs() > cull_angle(view) {
            continue;
        }
        let scaled = sprite_extent(distance, sprite_size, screen_height);
        let sx = get_screen_x(p.x, p.y, viewer, view.fov, screen_width);
        if (sx - cx).abs() < scaled / 2
            && depth.get(cx) > distance
            && best.is_none_or(|(_, d)| distance < d)
        {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::framebuffer::rgba;

    const W: u32 = 64;
    const H: u32 = 64;
    const BLUE: u32 = rgba(0, 0, 255, 255);

    fn blue_sprite() -> Atlas {
        Atlas::from_strip(8, 8, vec![BLUE; 64]).unwrap()
    }

    fn view() -> ViewSettings {
        ViewSettings::for_screen(W, H)
    }

    fn blank() -> RenderContext {
        let mut ctx = RenderContext::new(W, H);
        ctx.framebuffer.fill(0);
        ctx
    }

    #[test]
    fn viewer_standing_on_a_sprite_draws_nothing() {
        let viewer = Player::new(0, 2.5, 2.5, 0.0);
        let mut ctx = blank();
        render_sprite(&mut ctx, 2.5, 2.5, &blue_sprite(), 0, &viewer, &view());
        assert!(ctx.framebuffer.color_buffer.iter().all(|&c| c == 0));

        let players = [viewer, Player::new(1, 2.5, 2.5, 0.0)];
        assert!(draw_order(&players, 0).is_empty());
        assert_eq!(target_under_crosshair(&ctx.depth, &players, 0, 8, W, H, &view()), None);
    }

    #[test]
    fn equal_distances_keep_slice_order() {
        let players = [
            Player::new(0, 5.0, 5.0, 0.0),
            Player::new(1, 7.0, 5.0, 0.0),
            Player::new(2, 3.0, 5.0, 0.0),
            Player::new(3, 5.0, 9.0, 0.0),
        ];
        let order: Vec<usize> = draw_order(&players, 0).into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn sprites_behind_the_viewer_are_culled() {
        let viewer = Player::new(0, 2.5, 2.5, 0.0);
        let mut ctx = blank();
        render_sprite(&mut ctx, -0.5, 2.5, &blue_sprite(), 0, &viewer, &view());
        assert!(!ctx.framebuffer.color_buffer.contains(&BLUE));

        let players = [viewer, Player::new(1, -0.5, 2.5, 0.0)];
        assert_eq!(target_under_crosshair(&ctx.depth, &players, 0, 8, W, H, &view()), None);
    }

    #[test]
    fn occlusion_is_per_column() {
        let viewer = Player::new(0, 2.5, 2.5, 0.0);
        let mut ctx = blank();
        // A wall at distance 1 over the left half of the screen.
        for column in 0..(W / 2) as usize {
            ctx.depth.set(column, 1.0);
        }
        render_sprite(&mut ctx, 5.5, 2.5, &blue_sprite(), 0, &viewer, &view());
        let row = (H / 2) as i32;
        assert_eq!(ctx.framebuffer.get_pixel(28, row), 0);
        assert_eq!(ctx.framebuffer.get_pixel(36, row), BLUE);
    }

    #[test]
    fn crosshair_picks_the_visible_player() {
        let players = [
            Player::new(0, 2.5, 2.5, 0.0),
            Player::new(1, 5.5, 2.5, 0.0),
            Player::new(2, 8.5, 2.5, 0.0),
        ];
        let mut depth = DepthBuffer::new(W);
        assert_eq!(target_under_crosshair(&depth, &players, 0, 8, W, H, &view()), Some(1));
        // A wall between the viewer and both players.
        depth.set((W / 2) as usize, 2.0);
        assert_eq!(target_under_crosshair(&depth, &players, 0, 8, W, H, &view()), None);
    }

    #[test]
    fn tiny_fov_keeps_screen_x_bounded() {
        let viewer = Player::new(0, 2.5, 2.5, 0.0);
        let x = get_screen_x(5.5, 2.6, &viewer, 1e-9, W);
        assert!((-(W as i32)..=2 * W as i32).contains(&x), "{x}");
        assert_eq!(get_screen_x(5.5, 2.6, &viewer, 0.0, W), 2 * W as i32);

        let mut view = view();
        view.fov = 1e-9;
        let players = [viewer, Player::new(1, 5.5, 2.6, 0.0)];
        let mut ctx = blank();
        render_players(&mut ctx, &blue_sprite(), &players, 0, &view);
        target_under_crosshair(&ctx.depth, &players, 0, 8, W, H, &view);
    }

    #[test]
    fn wide_fov_draws_sprites_past_the_side() {
        let viewer = Player::new(0, 5.5, 5.5, 0.0);
        let angle = 100f32.to_radians();
        let (x, y) = (5.5 + angle.cos() * 3.0, 5.5 + angle.sin() * 3.0);
        let mut view = view();
        view.fov = 4.0;
        let mut ctx = blank();
        render_sprite(&mut ctx, x, y, &blue_sprite(), 0, &viewer, &view);
        assert!(ctx.framebuffer.color_buffer.contains(&BLUE));
    }
}
