//! Headless Avatar Teacher Player
//!
//! A terminal frontend for the avatar teacher. It renders the player as text,
//! simulates the video and narration elements, and reads commands from stdin.
//! `bin/player.rs` is a thin wrapper around this library.

pub mod app;
pub mod commands;
pub mod config;
pub mod media;
pub mod terminal;
