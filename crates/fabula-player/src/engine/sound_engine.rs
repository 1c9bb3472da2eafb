//! Sound engine — background music playback via rodio
//!
//! Tracks are files under the audio root (ogg/wav/mp3/flac, whatever rodio
//! decodes). One sink holds the loaded track; it is created paused so the
//! story decides when playback starts.

use std::io::Cursor;
use std::path::PathBuf;

use fabula_media::{AudioChannel, MediaError, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

pub struct SoundEngine {
    /// rodio output stream (must be kept alive)
    _stream: OutputStream,
    /// Handle for creating new sinks
    handle: OutputStreamHandle,
    /// Directory track names are resolved against
    root: PathBuf,
    sink: Option<Sink>,
    loaded: Option<String>,
    volume: f32,
    looping: bool,
}

impl SoundEngine {
    /// Create a new sound engine. Returns None if audio device unavailable.
    pub fn new(root: PathBuf) -> Option<Self> {
        match OutputStream::try_default() {
            Ok((stream, handle)) => {
                tracing::info!("Audio output initialized (tracks from {})", root.display());
                Some(Self {
                    _stream: stream,
                    handle,
                    root,
                    sink: None,
                    loaded: None,
                    volume: 1.0,
                    looping: false,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to initialize audio: {}", e);
                None
            }
        }
    }
}

impl AudioChannel for SoundEngine {
    fn load(&mut self, track: &str) -> Result<()> {
        self.stop();

        let path = self.root.join(track);
        let bytes = std::fs::read(&path)
            .map_err(|e| MediaError::LoadError(format!("{}: {}", path.display(), e)))?;
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| MediaError::LoadError(format!("{}: {}", path.display(), e)))?;

        let sink = Sink::try_new(&self.handle)
            .map_err(|e| MediaError::AudioError(format!("Failed to create sink: {}", e)))?;
        sink.pause();
        sink.set_volume(self.volume);
        if self.looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        tracing::debug!("Loaded track '{}'", track);
        self.sink = Some(sink);
        self.loaded = Some(track.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.loaded = None;
    }

    fn play(&mut self) -> Result<()> {
        let sink = self.sink.as_ref().ok_or(MediaError::NothingLoaded)?;
        sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.is_paused() && !s.empty())
    }

    fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }
}
