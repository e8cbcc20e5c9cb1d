//! Core game types and logic (world, players, console, networking).
//!
//! Re-exports:
//! - `maze`: Tile map loading and lookup
//! - `player`: Player pose, kinematics and respawn
//! - `process_events`: Input state and movement
//! - `console`: Scrollback, entry line and command parsing
//! - `packet`: Datagram wire format
//! - `network`: UDP server/client session

pub mod maze;
pub mod player;
pub mod process_events;
pub mod console;
pub mod packet;
pub mod network;
