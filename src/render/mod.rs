//! Software renderer: walls, sprites and overlays into a CPU framebuffer.
//!
//! Re-exports:
//! - `framebuffer`: Packed RGBA pixel buffer
//! - `depth`: Per-column wall distances
//! - `textures`: Texture atlases with generated fallbacks
//! - `casters`: Ray marching and the wall column pass
//! - `sprites`: Billboards sorted farthest first and crosshair targeting
//! - `render3d`: Render context and frame order
//! - `text`: Bitmap font and console overlay
//! - `minimap`: Top-down map overlay

pub mod framebuffer;
pub mod depth;
pub mod textures;
pub mod casters;
pub mod sprites;
pub mod render3d;
pub mod text;
pub mod minimap;
