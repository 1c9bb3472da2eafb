//! Player settings — small TOML file next to the story or given on the
//! command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ContentError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub log_level: String,
    /// Integer upscale of the 640×480 stage
    pub window_scale: usize,
    /// Start with background music switched off
    pub start_muted: bool,
    /// Directory music tracks are resolved against (defaults to the story's
    /// directory)
    pub audio_root: Option<PathBuf>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window_scale: 2,
            start_muted: false,
            audio_root: None,
        }
    }
}

impl PlayerSettings {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from `path`; a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = PlayerSettings::default();
        assert_eq!(s.log_level, "info");
        assert_eq!(s.window_scale, 2);
        assert!(!s.start_muted);
    }

    #[test]
    fn partial_toml() {
        let s = PlayerSettings::from_toml("start_muted = true\nlog_level = \"debug\"").unwrap();
        assert!(s.start_muted);
        assert_eq!(s.log_level, "debug");
        assert_eq!(s.window_scale, 2);
    }

    #[test]
    fn missing_file_is_default() {
        let s = PlayerSettings::load_or_default(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(s.window_scale, 2);
    }

    #[test]
    fn bad_toml_is_error() {
        assert!(matches!(
            PlayerSettings::from_toml("window_scale = \"big\""),
            Err(ContentError::Toml(_))
        ));
    }
}
