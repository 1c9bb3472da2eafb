//! Story core — scene orchestration and timed animation sequencing.
//!
//! One `Presentation` owns the timeline, the stage and every controller:
//!   sequencer — current scene, scene fades, transition fan-out
//!   guide     — guide overlay show/hide
//!   thought   — the guide's typed messages (uses the typewriter)
//!   video     — placeholders, pauses music around video playback
//!   audio     — per-scene music with volume fades
//!   decor     — per-scene reveal animation restarts
//!   letter    — landing letter sequence
//!
//! Controllers never call each other. They schedule cues on the shared
//! timeline and the presentation routes fired cues back to their owner.

pub mod audio;
pub mod decor;
pub mod guide;
pub mod letter;
pub mod presentation;
pub mod sequencer;
pub mod stage;
pub mod thought;
pub mod timeline;
pub mod typewriter;
pub mod video;

use fabula_common::{SceneIndex, StoryContent};

use crate::story::stage::Stage;
use crate::story::timeline::Timeline;

pub use presentation::{Command, Cue, Presentation};

/// Everything a controller may touch while handling a call or a cue
pub struct Cx<'a, C> {
    pub timeline: &'a mut Timeline<C>,
    pub stage: &'a mut Stage,
    pub content: &'a StoryContent,
    pub notices: &'a mut Vec<StoryNotice>,
}

/// Things that happened during an update, for the host to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryNotice {
    /// A scene committed as current
    Navigated { from: SceneIndex, to: SceneIndex },
    /// A scene finished its fade-in and is marked active
    SceneActivated(SceneIndex),
    /// A directly requested thought finished typing and holding
    ThoughtFinished { message: String },
    /// A scene's thought script ran to its last message
    ThoughtCycleComplete(SceneIndex),
}

/// A controller that reacts when a scene becomes current. The sequencer's
/// fan-out calls these in a fixed order.
pub trait TransitionObserver<C> {
    fn name(&self) -> &'static str;
    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>);
}
