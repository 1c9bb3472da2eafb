//! Media device capabilities used by the player core
//!
//! This crate handles:
//! - The single background audio channel (`AudioChannel`)
//! - An in-memory channel for headless runs and tests (`MemoryChannel`)
//! - Video element lifecycle events (`VideoEvent`)
//!
//! Actual decoding lives behind the trait (the player's rodio sound engine).

use std::collections::HashSet;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to load track: {0}")]
    LoadError(String),

    #[error("Playback refused: {0}")]
    PlaybackRejected(String),

    #[error("No track loaded")]
    NothingLoaded,

    #[error("Failed to play audio: {0}")]
    AudioError(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;

/// A playback primitive for one looping background track.
///
/// Volume and loop flag belong to the channel, not to the loaded track:
/// loading a new track keeps both.
pub trait AudioChannel {
    /// Replace the loaded track (paused, at the current volume)
    fn load(&mut self, track: &str) -> Result<()>;
    /// Stop playback and unload
    fn stop(&mut self);
    /// Start or resume the loaded track. May be refused by the host.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn set_looping(&mut self, looping: bool);
    fn is_playing(&self) -> bool;
    fn loaded(&self) -> Option<&str>;
}

impl<T: AudioChannel + ?Sized> AudioChannel for Box<T> {
    fn load(&mut self, track: &str) -> Result<()> {
        (**self).load(track)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn volume(&self) -> f32 {
        (**self).volume()
    }

    fn set_looping(&mut self, looping: bool) {
        (**self).set_looping(looping)
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn loaded(&self) -> Option<&str> {
        (**self).loaded()
    }
}

/// Audio channel without an output device. Tracks state only; can be told to
/// refuse playback or fail loading specific tracks.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    loaded: Option<String>,
    playing: bool,
    volume: f32,
    looping: bool,
    /// Every `play()` fails while set
    pub reject_play: bool,
    /// Tracks whose `load()` fails
    pub missing: HashSet<String>,
    /// (track, volume) for each `set_volume` call
    pub volume_log: Vec<(Option<String>, f32)>,
    /// Tracks in the order they were loaded
    pub load_log: Vec<String>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

impl AudioChannel for MemoryChannel {
    fn load(&mut self, track: &str) -> Result<()> {
        if self.missing.contains(track) {
            tracing::debug!("Memory channel: '{}' marked missing", track);
            return Err(MediaError::LoadError(track.to_string()));
        }
        self.loaded = Some(track.to_string());
        self.playing = false;
        self.load_log.push(track.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.playing = false;
    }

    fn play(&mut self) -> Result<()> {
        if self.loaded.is_none() {
            return Err(MediaError::NothingLoaded);
        }
        if self.reject_play {
            tracing::debug!("Memory channel: refusing playback");
            return Err(MediaError::PlaybackRejected("playback not allowed".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.volume_log.push((self.loaded.clone(), self.volume));
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }
}

/// Lifecycle signals from a video element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    Play,
    /// Paused; `ended` is true when the pause comes from reaching the end
    Pause { ended: bool },
    Ended,
    /// The media failed to load or decode
    Error,
    /// First frame available; `ready_state` follows HTMLMediaElement (2 = current data)
    LoadedData { ready_state: u8 },
}

/// Ready state from which a video can show its first frame
pub const HAVE_CURRENT_DATA: u8 = 2;

/// Whether a video source points at real content: non-empty and not the
/// presentation's own address (which is what an unset source resolves to).
pub fn source_is_resolvable(source: Option<&str>, base_address: &str) -> bool {
    match source.map(str::trim) {
        Some(src) if !src.is_empty() => src != base_address,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_channel_play_needs_track() {
        let mut ch = MemoryChannel::new();
        assert!(matches!(ch.play(), Err(MediaError::NothingLoaded)));
        ch.load("a.ogg").unwrap();
        ch.play().unwrap();
        assert!(ch.is_playing());
        assert_eq!(ch.loaded(), Some("a.ogg"));
    }

    #[test]
    fn memory_channel_rejects_when_told() {
        let mut ch = MemoryChannel::new();
        ch.load("a.ogg").unwrap();
        ch.reject_play = true;
        assert!(matches!(ch.play(), Err(MediaError::PlaybackRejected(_))));
        assert!(!ch.is_playing());
    }

    #[test]
    fn memory_channel_missing_track() {
        let mut ch = MemoryChannel::new();
        ch.missing.insert("gone.ogg".into());
        assert!(ch.load("gone.ogg").is_err());
        assert_eq!(ch.loaded(), None);
    }

    #[test]
    fn volume_is_clamped_and_logged() {
        let mut ch = MemoryChannel::new();
        ch.load("a.ogg").unwrap();
        ch.set_volume(1.5);
        assert_eq!(ch.volume(), 1.0);
        assert_eq!(ch.volume_log, vec![(Some("a.ogg".to_string()), 1.0)]);
    }

    #[test]
    fn resolvable_sources() {
        assert!(source_is_resolvable(Some("clip.mp4"), "index.html"));
        assert!(!source_is_resolvable(Some("  "), "index.html"));
        assert!(!source_is_resolvable(None, "index.html"));
        assert!(!source_is_resolvable(Some("index.html"), "index.html"));
        assert!(!source_is_resolvable(Some(""), ""));
    }
}
