//! Labyrinth: a first-person raycaster with billboard players, an in-game console,
//! UDP multiplayer and a software audio mixer.

pub mod audio_manager;
pub mod config;
pub mod core;
pub mod game;
pub mod render;
