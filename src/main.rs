// main.rs
use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use raylib::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use labyrinth::audio_manager::{AudioManager, Sound};
use labyrinth::config::{Config, CONFIG_FILE};
use labyrinth::core::maze::{TileMap, DEFAULT_MAP};
use labyrinth::core::process_events::read_input;
use labyrinth::game::{Game, GameEvent, LOCAL};
use labyrinth::render::framebuffer::WHITE;
use labyrinth::render::minimap::draw_minimap;
use labyrinth::render::render3d::{render_frame, RenderContext, Scene};
use labyrinth::render::text::{draw_console, draw_text, Font};
use labyrinth::render::textures::Atlas;

/// Wall codes `'1'..='4'` plus the boundary code `'0'`.
const WALL_TEXTURES: u32 = 5;
const SPRITE_TEXTURES: u32 = 8;
const MINIMAP_CELL: u32 = 6;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .try_init()
        .ok();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn atlas_or(path: Option<&str>, fallback: impl FnOnce() -> Atlas) -> Atlas {
    match path.map(Atlas::load) {
        Some(Ok(atlas)) => atlas,
        Some(Err(e)) => {
            warn!("{e:#}, using generated textures");
            fallback()
        }
        None => fallback(),
    }
}

fn load_sound(path: Option<&str>, fallback: impl FnOnce() -> Sound) -> Sound {
    let Some(path) = path else {
        return fallback();
    };
    match std::fs::read(path)
        .with_context(|| format!("could not read {path}"))
        .and_then(Sound::decode)
    {
        Ok(sound) => sound,
        Err(e) => {
            warn!("{e:#}, using a generated sound");
            fallback()
        }
    }
}

fn streaming_texture(rl: &mut RaylibHandle, thread: &RaylibThread, w: u32, h: u32) -> Result<Texture2D> {
    let image = Image::gen_image_color(w as i32, h as i32, Color::BLACK);
    rl.load_texture_from_image(thread, &image)
        .map_err(|e| anyhow!("could not create screen texture: {e:?}"))
}

fn run() -> Result<()> {
    let config = Config::load(CONFIG_FILE);
    let map = match config.map_path.as_deref() {
        Some(path) => TileMap::load(path)?,
        None => TileMap::parse(DEFAULT_MAP).context("built-in map")?,
    };
    info!(width = map.width(), height = map.height(), "map loaded");

    let (mut rl, thread) = raylib::init()
        .size(config.screen_width as i32, config.screen_height as i32)
        .title("Labyrinth")
        .resizable()
        .build();
    rl.set_target_fps(60);
    rl.set_exit_key(None);
    rl.disable_cursor();
    if config.fullscreen {
        rl.toggle_fullscreen();
    }

    let walls = atlas_or(config.texture_path.as_deref(), || {
        Atlas::fallback_walls(config.tile_size, WALL_TEXTURES)
    });
    let sprites = atlas_or(config.sprite_path.as_deref(), || {
        Atlas::fallback_sprites(config.tile_size, SPRITE_TEXTURES)
    });
    let font = match config.font_path.as_deref().map(Font::load) {
        Some(Ok(font)) => font,
        Some(Err(e)) => {
            warn!("{e:#}, using the built-in font");
            Font::builtin(config.font_scale)
        }
        None => Font::builtin(config.font_scale),
    };

    let audio = match AudioManager::new(config.channel_count, config.master_gain) {
        Ok(audio) => Some(audio),
        Err(e) => {
            warn!("no audio output: {e:#}");
            None
        }
    };
    let shot = load_sound(config.shot_sound_path.as_deref(), || Sound::tone(180.0, 0.12, 0.6));
    let ouch = Sound::tone(90.0, 0.3, 0.6);

    let (mut width, mut height) = (rl.get_screen_width() as u32, rl.get_screen_height() as u32);
    let mut ctx = RenderContext::new(width, height);
    let mut screen = streaming_texture(&mut rl, &thread, width, height)?;

    let mut game = Game::new(map, config, StdRng::from_entropy());
    game.resize(width, height);
    game.console.push("Press Enter to talk, /help for commands");
    let mut show_map = false;

    'frame: while !rl.window_should_close() {
        let (w, h) = (rl.get_screen_width() as u32, rl.get_screen_height() as u32);
        if (w, h) != (width, height) && w > 0 && h > 0 {
            (width, height) = (w, h);
            ctx.resize(width, height);
            game.resize(width, height);
            screen = streaming_texture(&mut rl, &thread, width, height)?;
        }

        let mut events = Vec::new();
        if game.console.entry_active() {
            while let Some(c) = rl.get_char_pressed() {
                game.console.push_char(c);
            }
            if rl.is_key_pressed(KeyboardKey::KEY_BACKSPACE) {
                game.console.pop_char();
            }
            if rl.is_key_pressed(KeyboardKey::KEY_UP) {
                game.console.load_previous_entry();
            }
            if rl.is_key_pressed(KeyboardKey::KEY_ESCAPE) {
                game.console.clear_entry();
                game.console.close();
            }
            if rl.is_key_pressed(KeyboardKey::KEY_ENTER) {
                events.extend(game.submit_console());
            }
        } else {
            let open_with_slash = rl.is_key_pressed(KeyboardKey::KEY_SLASH);
            if rl.is_key_pressed(KeyboardKey::KEY_ENTER) || rl.is_key_pressed(KeyboardKey::KEY_T) || open_with_slash {
                // Whatever opened the entry line is not part of it.
                while rl.get_char_pressed().is_some() {}
                game.console.open();
                if open_with_slash {
                    game.console.push_char('/');
                }
            }
            if rl.is_key_pressed(KeyboardKey::KEY_M) {
                show_map = !show_map;
            }
            if rl.is_key_pressed(KeyboardKey::KEY_ESCAPE) {
                break 'frame;
            }
        }

        let input = read_input(&rl);
        if input.shoot && !game.console.entry_active() {
            if let Some(audio) = &audio {
                audio.handle().play(&shot, 1.0, 1.0, false);
            }
            game.shoot(&ctx.depth, sprites.tile_size());
        }
        events.extend(game.tick(&input));

        for event in events {
            match event {
                GameEvent::Quit => break 'frame,
                GameEvent::ToggleFullscreen => {
                    rl.toggle_fullscreen();
                    game.config.fullscreen = !game.config.fullscreen;
                }
                GameEvent::Respawned => {
                    if let Some(audio) = &audio {
                        audio.handle().play(&ouch, 1.0, 1.0, false);
                    }
                }
                GameEvent::ChatReceived(_) => {}
            }
        }

        if let Some(audio) = &audio {
            audio.handle().reclaim();
        }

        let fps = rl.get_fps();
        let cursor_on = (rl.get_time() * 2.0) as i64 % 2 == 0;
        let scene = Scene {
            map: &game.map,
            textures: &walls,
            sprites: &sprites,
            players: &game.players,
            viewer_index: LOCAL,
            view: game.view,
        };
        render_frame(&mut ctx, &scene, |fb| {
            if show_map {
                draw_minimap(fb, &game.map, &game.players, LOCAL, 5, 5, MINIMAP_CELL);
            }
            draw_console(fb, &font, &game.console, cursor_on);
            let label = format!("{fps} FPS");
            let x = fb.width as i32 - (label.len() as u32 * font.char_width()) as i32 - 5;
            draw_text(fb, &font, x, 5, WHITE, &label);
        });
        ctx.framebuffer.upload_to_texture(&mut screen);

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);
        d.draw_texture(&screen, 0, 0, Color::WHITE);
    }

    game.network.leave();
    info!("bye");
    Ok(())
}
