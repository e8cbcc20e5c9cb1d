//! Frame orchestration: background, walls, sprites, overlay.
use crate::core::maze::TileMap;
use crate::core::player::Player;
use crate::render::casters::{render_player_view, ViewSettings};
use crate::render::depth::DepthBuffer;
use crate::render::framebuffer::{rgba, Framebuffer, WHITE};
use crate::render::sprites::render_players;
use crate::render::textures::Atlas;

pub const CEILING: u32 = rgba(0xB6, 0xB6, 0xB6, 0xFF);
pub const FLOOR: u32 = rgba(0x3C, 0x3C, 0x3C, 0xFF);
const CROSSHAIR_SIZE: i32 = 3;

/// Per-screen render state, reallocated only when the screen size changes.
pub struct RenderContext {
    pub framebuffer: Framebuffer,
    pub depth: DepthBuffer,
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
            depth: DepthBuffer::new(width),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "resizing render context");
        self.framebuffer.resize(width, height);
        self.depth.resize(width);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.framebuffer.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.framebuffer.height
    }
}

/// Everything a frame reads. Borrowed for the duration of one frame.
pub struct Scene<'a> {
    pub map: &'a TileMap,
    pub textures: &'a Atlas,
    pub sprites: &'a Atlas,
    pub players: &'a [Player],
    pub viewer_index: usize,
    pub view: ViewSettings,
}

/// Ceiling over the top half, floor below.
pub fn render_background(fb: &mut Framebuffer) {
    let half = fb.height / 2;
    fb.fill_rows(0, half, CEILING);
    fb.fill_rows(half, fb.height, FLOOR);
}

pub fn draw_crosshair(fb: &mut Framebuffer) {
    let cx = (fb.width / 2) as i32;
    let cy = (fb.height / 2) as i32;
    for y in cy - CROSSHAIR_SIZE + 1..cy + CROSSHAIR_SIZE {
        fb.set_pixel(cx, y, WHITE);
    }
    for x in cx - CROSSHAIR_SIZE + 1..cx + CROSSHAIR_SIZE {
        fb.set_pixel(x, cy, WHITE);
    }
}

/// Renders one frame. The overlay runs last so nothing can cover it; presenting the
/// framebuffer is left to the caller.
pub fn render_frame<F>(ctx: &mut RenderContext, scene: &Scene<'_>, overlay: F)
where
    F: FnOnce(&mut Framebuffer),
{
    render_background(&mut ctx.framebuffer);
    if let Some(viewer) = scene.players.get(scene.viewer_index) {
        render_player_view(ctx, scene.map, scene.textures, viewer, &scene.view);
        render_players(
            ctx,
            scene.sprites,
            scene.players,
            scene.viewer_index,
            &scene.view,
        );
    }
    draw_crosshair(&mut ctx.framebuffer);
    overlay(&mut ctx.framebuffer);
}
