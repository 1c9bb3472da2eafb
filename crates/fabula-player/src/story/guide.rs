//! Guide overlay visibility
//!
//! The guide is one shared element shown on a fixed set of scenes. Showing
//! and hiding are two-step animations; a new request always cancels the step
//! still pending from the previous one.

use std::collections::HashSet;

use fabula_common::{SceneIndex, StoryContent};

use crate::story::timeline::{Generation, TimerHandle};
use crate::story::{Cx, TransitionObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideCue {
    /// Delayed show after a scene change
    Show { gen: Generation },
    /// Enter animation finished
    Entered { gen: Generation },
    /// Exit animation finished
    Exited { gen: Generation },
}

#[derive(Debug)]
pub struct GuideController {
    scenes: HashSet<SceneIndex>,
    pending: Option<TimerHandle>,
    gen: Generation,
}

impl GuideController {
    pub fn new(scenes: impl IntoIterator<Item = SceneIndex>) -> Self {
        Self {
            scenes: scenes.into_iter().collect(),
            pending: None,
            gen: Generation::default(),
        }
    }

    pub fn for_story(content: &StoryContent) -> Self {
        Self::new(content.guide_scenes())
    }

    pub fn shows_on(&self, scene: SceneIndex) -> bool {
        self.scenes.contains(&scene)
    }

    /// Show the guide (after a short delay) if `scene` has it, hide it otherwise
    pub fn update_visibility<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>)
    where
        C: From<GuideCue> + Clone,
    {
        let gen = self.restart(cx);
        if self.shows_on(scene) {
            let delay = cx.content.timings.guide_show_delay_ms;
            self.pending = Some(cx.timeline.after(delay, C::from(GuideCue::Show { gen })));
        } else {
            self.hide(cx);
        }
    }

    pub fn show<C>(&mut self, cx: &mut Cx<'_, C>)
    where
        C: From<GuideCue> + Clone,
    {
        let gen = self.restart(cx);
        let Some(guide) = cx.stage.guide.as_mut() else {
            return;
        };
        guide.hidden = false;
        guide.exiting = false;
        guide.visible = true;
        guide.entering = true;

        let enter = cx.content.timings.guide_enter_ms;
        self.pending = Some(cx.timeline.after(enter, C::from(GuideCue::Entered { gen })));
    }

    pub fn hide<C>(&mut self, cx: &mut Cx<'_, C>)
    where
        C: From<GuideCue> + Clone,
    {
        let gen = self.restart(cx);
        let Some(guide) = cx.stage.guide.as_mut() else {
            return;
        };
        guide.entering = false;
        guide.exiting = true;

        let exit = cx.content.timings.guide_exit_ms;
        self.pending = Some(cx.timeline.after(exit, C::from(GuideCue::Exited { gen })));
    }

    /// Hidden right now, no exit animation
    pub fn force_hide<C: Clone>(&mut self, cx: &mut Cx<'_, C>) {
        self.restart(cx);
        if let Some(guide) = cx.stage.guide.as_mut() {
            *guide = Default::default();
        }
    }

    pub fn on_cue<C>(&mut self, cue: GuideCue, cx: &mut Cx<'_, C>)
    where
        C: From<GuideCue> + Clone,
    {
        match cue {
            GuideCue::Show { gen } if gen == self.gen => {
                self.pending = None;
                self.show(cx);
            }
            GuideCue::Entered { gen } if gen == self.gen => {
                self.pending = None;
                if let Some(guide) = cx.stage.guide.as_mut() {
                    guide.entering = false;
                }
            }
            GuideCue::Exited { gen } if gen == self.gen => {
                self.pending = None;
                if let Some(guide) = cx.stage.guide.as_mut() {
                    guide.visible = false;
                    guide.exiting = false;
                    guide.hidden = true;
                }
            }
            _ => tracing::trace!("Dropping stale guide cue {:?}", cue),
        }
    }

    fn restart<C: Clone>(&mut self, cx: &mut Cx<'_, C>) -> Generation {
        cx.timeline.clear(&mut self.pending);
        self.gen.bump()
    }
}

impl<C> TransitionObserver<C> for GuideController
where
    C: From<GuideCue> + Clone,
{
    fn name(&self) -> &'static str {
        "guide"
    }

    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        self.update_visibility(scene, cx);
    }
}
