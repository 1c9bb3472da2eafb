//! Video slots: placeholder visibility and pausing the music while a video
//! plays.

use std::collections::HashSet;

use fabula_common::SceneIndex;
use fabula_media::{source_is_resolvable, VideoEvent, HAVE_CURRENT_DATA};

use crate::story::{Cx, TransitionObserver};

/// What the background music should do in response to a video event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicRequest {
    Pause,
    Resume,
}

#[derive(Debug, Default)]
pub struct VideoCoordinator {
    /// Slots currently playing
    playing: HashSet<String>,
}

impl VideoCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_playing(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Show or hide each of `scene`'s placeholders from its source
    pub fn prepare_scene<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        let content = cx.content;
        let Some(config) = content.scene(scene) else {
            return;
        };
        for slot in &config.videos {
            let resolvable = source_is_resolvable(slot.source.as_deref(), &content.base_address);
            match cx.stage.placeholders.get_mut(&slot.id) {
                Some(shown) => *shown = !resolvable,
                None => tracing::debug!("Video slot '{}' not on stage", slot.id),
            }
            if !resolvable {
                tracing::debug!("Video slot '{}' has no usable source", slot.id);
            }
        }
    }

    /// Apply a lifecycle event from `slot`. Music is only resumed once no
    /// other slot is still playing.
    pub fn on_event<C>(
        &mut self,
        slot: &str,
        event: VideoEvent,
        cx: &mut Cx<'_, C>,
    ) -> Option<MusicRequest> {
        tracing::debug!("Video '{}': {:?}", slot, event);
        match event {
            VideoEvent::Play => {
                self.playing.insert(slot.to_string());
                Some(MusicRequest::Pause)
            }
            VideoEvent::Ended | VideoEvent::Pause { ended: false } => self.stopped(slot),
            // An end-of-media pause is followed by `Ended`
            VideoEvent::Pause { ended: true } => None,
            VideoEvent::Error => {
                tracing::warn!("Video '{}' failed to load", slot);
                if let Some(shown) = cx.stage.placeholders.get_mut(slot) {
                    *shown = true;
                }
                self.stopped(slot)
            }
            VideoEvent::LoadedData { ready_state } => {
                if ready_state >= HAVE_CURRENT_DATA {
                    if let Some(shown) = cx.stage.placeholders.get_mut(slot) {
                        *shown = false;
                    }
                }
                None
            }
        }
    }

    fn stopped(&mut self, slot: &str) -> Option<MusicRequest> {
        let was_playing = self.playing.remove(slot);
        if was_playing && self.playing.is_empty() {
            Some(MusicRequest::Resume)
        } else {
            None
        }
    }
}

impl<C> TransitionObserver<C> for VideoCoordinator {
    fn name(&self) -> &'static str {
        "video"
    }

    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        self.prepare_scene(scene, cx);
    }
}
