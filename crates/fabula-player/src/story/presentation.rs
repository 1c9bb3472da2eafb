//! Presentation — owns the story state and routes input and timers.
//!
//! Navigation commits in the sequencer, then fans out to the transition
//! observers in a fixed order: guide, thought, video, audio, decor.

use fabula_common::{SceneIndex, StoryContent};
use fabula_media::{AudioChannel, VideoEvent};

use crate::story::audio::{AudioCue, AudioTrackManager};
use crate::story::decor::{DecorController, DecorCue};
use crate::story::guide::{GuideController, GuideCue};
use crate::story::letter::{LetterCue, LetterIntro};
use crate::story::sequencer::{SceneCue, SceneSequencer};
use crate::story::stage::Stage;
use crate::story::thought::{ThoughtCue, ThoughtSequencer};
use crate::story::timeline::Timeline;
use crate::story::typewriter::TypeCue;
use crate::story::video::{MusicRequest, VideoCoordinator};
use crate::story::{Cx, StoryNotice, TransitionObserver};

/// Every timer payload in the story, tagged with its owning controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    Scene(SceneCue),
    Guide(GuideCue),
    Thought(ThoughtCue),
    Audio(AudioCue),
    Decor(DecorCue),
    Letter(LetterCue),
}

impl From<SceneCue> for Cue {
    fn from(cue: SceneCue) -> Self {
        Cue::Scene(cue)
    }
}

impl From<GuideCue> for Cue {
    fn from(cue: GuideCue) -> Self {
        Cue::Guide(cue)
    }
}

impl From<ThoughtCue> for Cue {
    fn from(cue: ThoughtCue) -> Self {
        Cue::Thought(cue)
    }
}

impl From<TypeCue> for Cue {
    fn from(cue: TypeCue) -> Self {
        Cue::Thought(ThoughtCue::Type(cue))
    }
}

impl From<AudioCue> for Cue {
    fn from(cue: AudioCue) -> Self {
        Cue::Audio(cue)
    }
}

impl From<DecorCue> for Cue {
    fn from(cue: DecorCue) -> Self {
        Cue::Decor(cue)
    }
}

impl From<LetterCue> for Cue {
    fn from(cue: LetterCue) -> Self {
        Cue::Letter(cue)
    }
}

/// User-level actions, as produced by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    First,
    GoTo(SceneIndex),
    /// The current scene's "continue" button
    SceneButton,
    ToggleMusic,
    OpenLetter,
}

/// Borrow the split fields of a `Presentation` as a controller context
macro_rules! cx {
    ($p:ident) => {
        &mut Cx {
            timeline: &mut $p.timeline,
            stage: &mut $p.stage,
            content: &$p.content,
            notices: &mut $p.notices,
        }
    };
}

pub struct Presentation<A: AudioChannel> {
    content: StoryContent,
    timeline: Timeline<Cue>,
    stage: Stage,
    notices: Vec<StoryNotice>,

    sequencer: SceneSequencer,
    guide: GuideController,
    thought: ThoughtSequencer,
    video: VideoCoordinator,
    audio: AudioTrackManager<A>,
    decor: DecorController,
    letter: LetterIntro,
}

impl<A: AudioChannel> Presentation<A> {
    pub fn new(content: StoryContent, channel: A, wants_music: bool) -> Self {
        let stage = Stage::for_story(&content);
        Self {
            sequencer: SceneSequencer::new(content.total_scenes()),
            guide: GuideController::for_story(&content),
            thought: ThoughtSequencer::new(),
            video: VideoCoordinator::new(),
            audio: AudioTrackManager::new(channel, wants_music),
            decor: DecorController::new(),
            letter: LetterIntro::new(),
            timeline: Timeline::new(),
            stage,
            notices: Vec::new(),
            content,
        }
    }

    /// Show the first scene and load its music
    pub fn start(&mut self) {
        if self.sequencer.start(cx!(self)) {
            tracing::info!(
                "Starting '{}' ({} scenes)",
                self.content.title,
                self.content.total_scenes()
            );
            self.fan_out(0);
        }
    }

    /// Run every timer due in the next `dt_ms` and report what happened
    pub fn update(&mut self, dt_ms: u64) -> Vec<StoryNotice> {
        let until = self.timeline.now().saturating_add(dt_ms);
        while let Some((_, cue)) = self.timeline.pop_due(until) {
            self.dispatch(cue);
        }
        self.timeline.advance_to(until);
        std::mem::take(&mut self.notices)
    }

    pub fn apply(&mut self, command: Command) {
        tracing::debug!("Command {:?}", command);
        match command {
            Command::Next => self.next_scene(),
            Command::Previous => self.previous_scene(),
            Command::First => self.first_scene(),
            Command::GoTo(index) => {
                self.go_to_scene(index);
            }
            Command::SceneButton => self.press_scene_button(),
            Command::ToggleMusic => self.toggle_music(),
            Command::OpenLetter => {
                self.open_letter();
            }
        }
    }

    // ─── Navigation ───

    /// Returns whether the scene changed
    pub fn go_to_scene(&mut self, index: SceneIndex) -> bool {
        if !self.sequencer.go_to(index, cx!(self)) {
            return false;
        }
        if !self.on_letter_scene() {
            self.letter.cancel(&mut self.timeline);
        }
        self.fan_out(index);
        true
    }

    pub fn next_scene(&mut self) {
        match self.sequencer.next_index() {
            Some(next) => {
                self.go_to_scene(next);
            }
            None => tracing::debug!("Already on the last scene"),
        }
    }

    pub fn previous_scene(&mut self) {
        match self.sequencer.previous_index() {
            Some(previous) => {
                self.go_to_scene(previous);
            }
            None => tracing::debug!("Already on the first scene"),
        }
    }

    pub fn first_scene(&mut self) {
        self.go_to_scene(0);
    }

    /// Follow the current scene's explicit `next` link, else the next scene
    pub fn press_scene_button(&mut self) {
        let current = self.sequencer.current();
        match self.content.scene(current).and_then(|s| s.next) {
            Some(target) => {
                self.go_to_scene(target);
            }
            None => self.next_scene(),
        }
    }

    pub fn current_scene(&self) -> SceneIndex {
        self.sequencer.current()
    }

    pub fn total_scenes(&self) -> usize {
        self.sequencer.total()
    }

    // ─── Direct controller access ───

    pub fn change_audio_scene(&mut self, index: SceneIndex) {
        self.audio.change_audio_scene(index, cx!(self));
    }

    pub fn init_thought_cycle(&mut self, index: SceneIndex) {
        self.thought.init_thought_cycle(index, cx!(self));
    }

    pub fn show_thought(&mut self, message: &str) {
        self.thought.show_thought(message, cx!(self));
    }

    pub fn video_event(&mut self, slot: &str, event: VideoEvent) {
        let request = self.video.on_event(slot, event, cx!(self));
        match request {
            Some(MusicRequest::Pause) => self.audio.pause(&mut self.stage),
            Some(MusicRequest::Resume) => self.audio.resume(&mut self.stage),
            None => {}
        }
    }

    pub fn toggle_music(&mut self) {
        self.audio.toggle(cx!(self));
    }

    /// Open the landing letter. Only works while on the letter scene.
    pub fn open_letter(&mut self) -> bool {
        if !self.on_letter_scene() {
            tracing::debug!("Not on the letter scene");
            return false;
        }
        self.letter.open(cx!(self))
    }

    pub fn on_letter_scene(&self) -> bool {
        self.content
            .letter
            .as_ref()
            .is_some_and(|l| l.scene == self.sequencer.current())
    }

    // ─── Read access ───

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn content(&self) -> &StoryContent {
        &self.content
    }

    pub fn thought(&self) -> &ThoughtSequencer {
        &self.thought
    }

    pub fn audio(&self) -> &AudioTrackManager<A> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioTrackManager<A> {
        &mut self.audio
    }

    /// Virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.timeline.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.timeline.pending()
    }

    // ─── Internals ───

    fn fan_out(&mut self, scene: SceneIndex) {
        let observers: [&mut dyn TransitionObserver<Cue>; 5] = [
            &mut self.guide,
            &mut self.thought,
            &mut self.video,
            &mut self.audio,
            &mut self.decor,
        ];
        let cx = cx!(self);
        for observer in observers {
            tracing::trace!("{} ← scene {}", observer.name(), scene);
            observer.scene_entered(scene, cx);
        }
    }

    fn dispatch(&mut self, cue: Cue) {
        match cue {
            Cue::Scene(cue) => self.sequencer.on_cue(cue, cx!(self)),
            Cue::Guide(cue) => self.guide.on_cue(cue, cx!(self)),
            Cue::Thought(cue) => self.thought.on_cue(cue, cx!(self)),
            Cue::Audio(cue) => self.audio.on_cue(cue, cx!(self)),
            Cue::Decor(cue) => self.decor.on_cue(cue, cx!(self)),
            Cue::Letter(cue) => {
                if let Some(target) = self.letter.on_cue(cue, cx!(self)) {
                    self.go_to_scene(target);
                }
            }
        }
    }
}
