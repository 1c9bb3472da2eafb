//! Background music — one looping track per scene, crossed over with linear
//! volume fades.
//!
//! The manager is the only owner of the audio channel. A track change while
//! something is audible first fades the current track out, then switches;
//! the new track fades in from silence. Requesting a new track mid-fade
//! cancels that fade and starts over from the current volume, so only the
//! most recent target is ever loaded.

use fabula_common::{SceneIndex, StoryContent};
use fabula_media::AudioChannel;

use crate::story::stage::Stage;
use crate::story::timeline::{Generation, TimerHandle, Timeline};
use crate::story::{Cx, TransitionObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    FadeStep { fade: Generation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    Out,
    In,
}

#[derive(Debug)]
struct Fade {
    direction: FadeDirection,
    timer: TimerHandle,
    step: u32,
    from: f32,
    to: f32,
}

pub struct AudioTrackManager<A: AudioChannel> {
    channel: A,
    /// Most recently requested track (None = silence)
    target: Option<String>,
    /// User intent from the music toggle
    wants_playback: bool,
    /// Held paused while a video plays
    suspended: bool,
    fade: Option<Fade>,
    fade_gen: Generation,
}

impl<A: AudioChannel> AudioTrackManager<A> {
    pub fn new(mut channel: A, wants_playback: bool) -> Self {
        channel.set_looping(true);
        Self {
            channel,
            target: None,
            wants_playback,
            suspended: false,
            fade: None,
            fade_gen: Generation::default(),
        }
    }

    pub fn channel(&self) -> &A {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut A {
        &mut self.channel
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.channel.is_playing()
    }

    pub fn wants_playback(&self) -> bool {
        self.wants_playback
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn fading(&self) -> Option<FadeDirection> {
        self.fade.as_ref().map(|f| f.direction)
    }

    /// Switch to `scene`'s track
    pub fn change_audio_scene<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>)
    where
        C: From<AudioCue> + Clone,
    {
        let content = cx.content;
        self.change_track(content.track_for(scene), cx);
    }

    pub fn change_track<C>(&mut self, track: Option<&str>, cx: &mut Cx<'_, C>)
    where
        C: From<AudioCue> + Clone,
    {
        if self.target.as_deref() == track {
            tracing::trace!("Track {:?} already selected", track);
            return;
        }
        tracing::info!("Music: {:?} → {:?}", self.target, track);

        self.cancel_fade(cx.timeline);
        self.target = track.map(str::to_string);

        if self.channel.is_playing() && self.channel.volume() > 0.0 {
            let from = self.channel.volume();
            self.begin_fade(FadeDirection::Out, from, 0.0, cx);
        } else {
            self.switch_to_target(cx);
        }
    }

    /// Hold the music while something else (a video) plays
    pub fn pause(&mut self, stage: &mut Stage) {
        self.suspended = true;
        if self.channel.is_playing() {
            self.channel.pause();
        }
        self.sync_toggle(stage);
    }

    /// Undo `pause`. Plays only if the user wants music and a track is loaded.
    pub fn resume(&mut self, stage: &mut Stage) {
        self.suspended = false;
        if self.wants_playback && self.channel.loaded().is_some() && !self.channel.is_playing() {
            self.start_playback();
        }
        self.sync_toggle(stage);
    }

    /// User play/pause of the background music
    pub fn toggle<C: Clone>(&mut self, cx: &mut Cx<'_, C>) {
        self.wants_playback = !self.wants_playback;
        let nominal = cx.content.timings.nominal_volume;

        if self.wants_playback {
            if !self.suspended && self.channel.loaded().is_some() {
                if self.fade.is_none() {
                    self.channel.set_volume(nominal);
                }
                self.start_playback();
            }
        } else {
            if self.fading() == Some(FadeDirection::In) {
                self.cancel_fade(cx.timeline);
                self.channel.set_volume(nominal);
            }
            self.channel.pause();
        }
        tracing::info!(
            "Background music {}",
            if self.wants_playback { "on" } else { "off" }
        );
        self.sync_toggle(cx.stage);
    }

    pub fn on_cue<C>(&mut self, cue: AudioCue, cx: &mut Cx<'_, C>)
    where
        C: From<AudioCue> + Clone,
    {
        let AudioCue::FadeStep { fade } = cue;
        if fade != self.fade_gen {
            return;
        }
        let steps = cx.content.timings.audio_fade_steps.max(1);
        let Some(state) = self.fade.as_mut() else {
            return;
        };

        state.step += 1;
        if state.step < steps {
            let t = state.step as f32 / steps as f32;
            self.channel.set_volume(state.from + (state.to - state.from) * t);
            return;
        }

        // Last step lands exactly on the target
        self.channel.set_volume(state.to);
        cx.timeline.cancel(state.timer);
        let direction = state.direction;
        self.fade = None;

        if direction == FadeDirection::Out {
            self.switch_to_target(cx);
        }
    }

    fn begin_fade<C>(&mut self, direction: FadeDirection, from: f32, to: f32, cx: &mut Cx<'_, C>)
    where
        C: From<AudioCue> + Clone,
    {
        let fade = self.fade_gen.bump();
        let step_ms = cx.content.timings.audio_step_ms();
        let timer = cx.timeline.every(step_ms, C::from(AudioCue::FadeStep { fade }));
        self.fade = Some(Fade {
            direction,
            timer,
            step: 0,
            from,
            to,
        });
    }

    fn cancel_fade<C: Clone>(&mut self, timeline: &mut Timeline<C>) {
        self.fade_gen.bump();
        if let Some(fade) = self.fade.take() {
            timeline.cancel(fade.timer);
        }
    }

    /// Stop what is loaded and bring in the target track
    fn switch_to_target<C>(&mut self, cx: &mut Cx<'_, C>)
    where
        C: From<AudioCue> + Clone,
    {
        self.channel.stop();
        let Some(track) = self.target.clone() else {
            self.sync_toggle(cx.stage);
            return;
        };

        let loaded = self.load_with_fallback(&track, cx.content);
        if let Some(toggle) = cx.stage.music_toggle.as_mut() {
            toggle.hidden = !loaded;
        }
        if !loaded {
            self.sync_toggle(cx.stage);
            return;
        }

        let nominal = cx.content.timings.nominal_volume;
        if self.wants_playback && !self.suspended {
            self.channel.set_volume(0.0);
            if self.start_playback() {
                self.begin_fade(FadeDirection::In, 0.0, nominal, cx);
            }
        } else {
            self.channel.set_volume(nominal);
        }
        self.sync_toggle(cx.stage);
    }

    fn load_with_fallback(&mut self, track: &str, content: &StoryContent) -> bool {
        let err = match self.channel.load(track) {
            Ok(()) => return true,
            Err(err) => err,
        };
        tracing::warn!("Could not load '{}': {}", track, err);

        match content.default_track.as_deref() {
            Some(fallback) if fallback != track => match self.channel.load(fallback) {
                Ok(()) => {
                    tracing::info!("Falling back to '{}'", fallback);
                    true
                }
                Err(err) => {
                    tracing::warn!("Fallback track '{}' failed too: {}", fallback, err);
                    false
                }
            },
            _ => false,
        }
    }

    /// Play and report whether the device accepted it
    fn start_playback(&mut self) -> bool {
        match self.channel.play() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Music playback rejected: {}", err);
                false
            }
        }
    }

    fn sync_toggle(&self, stage: &mut Stage) {
        if let Some(toggle) = stage.music_toggle.as_mut() {
            toggle.playing = self.channel.is_playing();
        }
    }
}

impl<C, A> TransitionObserver<C> for AudioTrackManager<A>
where
    C: From<AudioCue> + Clone,
    A: AudioChannel,
{
    fn name(&self) -> &'static str {
        "audio"
    }

    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        self.change_audio_scene(scene, cx);
    }
}
