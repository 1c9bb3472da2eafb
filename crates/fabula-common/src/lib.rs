//! Common types shared across Fabula crates
//!
//! - `content`  — story content model (scenes, thought scripts, video slots)
//! - `timings`  — every fixed duration used by the player
//! - `settings` — player settings file (TOML)

pub mod content;
pub mod settings;
pub mod timings;

use std::path::PathBuf;

use thiserror::Error;

pub use content::{LetterConfig, SceneConfig, StoryContent, ThoughtScript, VideoSlotConfig};
pub use settings::PlayerSettings;
pub use timings::Timings;

/// 0-based position of a scene in the story
pub type SceneIndex = usize;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse story content: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid story content: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ContentError>;
