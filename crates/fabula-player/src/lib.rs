//! Fabula player
//!
//! - `story`  — the presentation core: timeline, stage and controllers
//! - `engine` — window, input, rendering and audio output

pub mod engine;
pub mod story;
