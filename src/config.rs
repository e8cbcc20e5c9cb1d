//! `labyrinth.toml`. Every field is optional; missing ones take their defaults.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::network::DEFAULT_PORT;
use crate::render::casters::ViewSettings;

pub const CONFIG_FILE: &str = "labyrinth.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen_width: u32,
    pub screen_height: u32,
    pub fullscreen: bool,
    /// Overrides the aspect-derived field of view, in radians.
    pub fov: Option<f32>,
    pub view_distance: f32,
    pub view_accuracy: f32,

    /// Falls back to the built-in map when unset.
    pub map_path: Option<String>,
    pub texture_path: Option<String>,
    pub sprite_path: Option<String>,
    pub font_path: Option<String>,
    pub shot_sound_path: Option<String>,
    /// Texel size of the built-in atlases.
    pub tile_size: u32,
    pub font_scale: u32,

    pub port: u16,
    pub player_name: String,
    pub mouse_sensitivity: f32,

    pub channel_count: usize,
    pub master_gain: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen_width: 640,
            screen_height: 480,
            fullscreen: false,
            fov: None,
            view_distance: ViewSettings::DEFAULT_VIEW_DISTANCE,
            view_accuracy: ViewSettings::DEFAULT_VIEW_ACCURACY,
            map_path: None,
            texture_path: None,
            sprite_path: None,
            font_path: None,
            shot_sound_path: None,
            tile_size: 64,
            font_scale: 2,
            port: DEFAULT_PORT,
            player_name: "player".to_string(),
            mouse_sensitivity: 0.003,
            channel_count: 16,
            master_gain: 0.5,
        }
    }
}

impl Config {
    /// Reads `path`. A missing file or one that fails to parse yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No {:?}, using default settings", path);
            return Self::default();
        }
        match fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))
            .and_then(|text| Self::parse(&text))
        {
            Ok(config) => {
                info!("Loaded settings from {:?}", path);
                config
            }
            Err(e) => {
                error!("Failed to load settings: {e:#}");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings file")
    }

    /// View parameters for a screen of the given size.
    pub fn view_settings(&self, width: u32, height: u32) -> ViewSettings {
        let mut view = ViewSettings::for_screen(width, height);
        if let Some(fov) = self.fov {
            view.fov = fov;
        }
        view.view_distance = self.view_distance;
        view.view_accuracy = self.view_accuracy;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::casters::fov_for_screen;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            screen_width = 800
            player_name = "ada"
            fov = 1.2
            "#,
        )
        .unwrap();
        assert_eq!(config.screen_width, 800);
        assert_eq!(config.player_name, "ada");
        assert_eq!(config.screen_height, Config::default().screen_height);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.view_settings(800, 600).fov, 1.2);
    }

    #[test]
    fn bad_files_are_errors_but_load_falls_back() {
        assert!(Config::parse("screen_width = \"wide\"").is_err());
        assert_eq!(
            Config::load("/nonexistent/labyrinth.toml"),
            Config::default()
        );
    }

    #[test]
    fn fov_follows_aspect_ratio_by_default() {
        let config = Config::default();
        let view = config.view_settings(640, 480);
        assert_eq!(view.fov, fov_for_screen(640, 480));
        assert_eq!(view.view_distance, config.view_distance);
    }

    #[test]
    fn serializes_back_to_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }
}
