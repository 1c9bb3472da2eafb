//! Scene sequencer — which scene is current, and the fade between scenes.
//!
//! The current index commits as soon as a navigation is accepted; the panel
//! fades are cosmetic and trail behind. A fade-in that was overtaken by a
//! newer navigation never lands.

use std::collections::HashMap;

use fabula_common::SceneIndex;

use crate::story::timeline::{Generation, TimerHandle};
use crate::story::{Cx, StoryNotice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCue {
    /// Drop the leftover `fade_out` flag
    FadeOutDone { scene: SceneIndex },
    /// Mark the scene active after the fade-in delay
    Activate { scene: SceneIndex, gen: Generation },
}

#[derive(Debug)]
pub struct SceneSequencer {
    current: SceneIndex,
    total: usize,
    started: bool,
    gen: Generation,
    activation: Option<TimerHandle>,
    fade_outs: HashMap<SceneIndex, TimerHandle>,
}

impl SceneSequencer {
    pub fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            started: false,
            gen: Generation::default(),
            activation: None,
            fade_outs: HashMap::new(),
        }
    }

    pub fn current(&self) -> SceneIndex {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn next_index(&self) -> Option<SceneIndex> {
        let next = self.current + 1;
        (next < self.total).then_some(next)
    }

    pub fn previous_index(&self) -> Option<SceneIndex> {
        self.current.checked_sub(1)
    }

    /// Initial activation of scene 0. Returns false if already started or
    /// there is nothing to show.
    pub fn start<C>(&mut self, cx: &mut Cx<'_, C>) -> bool
    where
        C: From<SceneCue> + Clone,
    {
        if self.started || self.total == 0 {
            return false;
        }
        self.started = true;
        self.current = 0;
        self.schedule_activation(0, cx);
        true
    }

    /// Make `target` current. Returns whether the navigation was accepted;
    /// the caller fans the change out to the other controllers.
    pub fn go_to<C>(&mut self, target: SceneIndex, cx: &mut Cx<'_, C>) -> bool
    where
        C: From<SceneCue> + Clone,
    {
        if target >= self.total {
            tracing::warn!(
                "Scene {} out of range (0..{}), staying on {}",
                target,
                self.total,
                self.current
            );
            return false;
        }
        if self.started && target == self.current {
            tracing::debug!("Already on scene {}", target);
            return false;
        }
        self.started = true;

        let from = self.current;
        let fade_out_ms = cx.content.timings.scene_fade_out_ms;
        for (index, view) in cx.stage.scenes.iter_mut().enumerate() {
            if !(view.active || view.fade_in) {
                continue;
            }
            view.active = false;
            view.fade_in = false;
            view.fade_out = true;

            if let Some(old) = self.fade_outs.remove(&index) {
                cx.timeline.cancel(old);
            }
            let timer = cx
                .timeline
                .after(fade_out_ms, C::from(SceneCue::FadeOutDone { scene: index }));
            self.fade_outs.insert(index, timer);
        }

        self.current = target;
        self.schedule_activation(target, cx);

        tracing::info!("Scene {} → {}", from, target);
        cx.notices.push(StoryNotice::Navigated { from, to: target });
        true
    }

    pub fn on_cue<C: Clone>(&mut self, cue: SceneCue, cx: &mut Cx<'_, C>) {
        match cue {
            SceneCue::FadeOutDone { scene } => {
                self.fade_outs.remove(&scene);
                if let Some(view) = cx.stage.scenes.get_mut(scene) {
                    view.fade_out = false;
                }
            }
            SceneCue::Activate { scene, gen } => {
                if gen != self.gen {
                    tracing::trace!("Skipping superseded activation of scene {}", scene);
                    return;
                }
                self.activation = None;
                if let Some(timer) = self.fade_outs.remove(&scene) {
                    cx.timeline.cancel(timer);
                }
                if let Some(view) = cx.stage.scenes.get_mut(scene) {
                    view.fade_out = false;
                    view.active = true;
                    view.fade_in = true;
                }
                cx.notices.push(StoryNotice::SceneActivated(scene));
            }
        }
    }

    fn schedule_activation<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>)
    where
        C: From<SceneCue> + Clone,
    {
        // No delay when nothing is on screen yet
        let anything_shown = cx.stage.scenes.iter().any(|s| s.fade_out);
        let delay = if anything_shown {
            cx.content.timings.scene_fade_in_delay_ms
        } else {
            0
        };

        cx.timeline.clear(&mut self.activation);
        let gen = self.gen.bump();
        self.activation = Some(
            cx.timeline
                .after(delay, C::from(SceneCue::Activate { scene, gen })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::testing::Rig;
    use fabula_common::StoryContent;

    fn setup() -> (Rig<SceneCue>, SceneSequencer) {
        let content = StoryContent::demo();
        let seq = SceneSequencer::new(content.total_scenes());
        (Rig::new(content), seq)
    }

    fn run(rig: &mut Rig<SceneCue>, seq: &mut SceneSequencer, dt: u64) {
        rig.run(dt, |cue, cx| seq.on_cue(cue, cx));
    }

    #[test]
    fn start_activates_first_scene_immediately() {
        let (mut rig, mut seq) = setup();
        assert!(seq.start(&mut rig.cx()));
        assert!(!seq.start(&mut rig.cx()));
        run(&mut rig, &mut seq, 0);
        assert_eq!(rig.stage.active_scenes(), vec![0]);
        assert_eq!(rig.notices, vec![StoryNotice::SceneActivated(0)]);
    }

    #[test]
    fn go_to_commits_then_fades() {
        let (mut rig, mut seq) = setup();
        seq.start(&mut rig.cx());
        run(&mut rig, &mut seq, 0);

        assert!(seq.go_to(3, &mut rig.cx()));
        assert_eq!(seq.current(), 3);
        assert!(rig.stage.scenes[0].fade_out);
        assert!(rig.stage.active_scenes().is_empty());

        run(&mut rig, &mut seq, 299);
        assert!(!rig.stage.scenes[3].active);
        run(&mut rig, &mut seq, 1);
        assert_eq!(rig.stage.active_scenes(), vec![3]);
        assert!(rig.stage.scenes[3].fade_in);
        assert!(rig.stage.scenes[0].fade_out);

        run(&mut rig, &mut seq, 300);
        assert!(!rig.stage.scenes[0].fade_out);
        assert_eq!(rig.timeline.pending(), 0);
    }

    #[test]
    fn rejects_out_of_range_and_same_scene() {
        let (mut rig, mut seq) = setup();
        seq.start(&mut rig.cx());
        assert!(!seq.go_to(8, &mut rig.cx()));
        assert!(!seq.go_to(usize::MAX, &mut rig.cx()));
        assert!(!seq.go_to(0, &mut rig.cx()));
        assert_eq!(seq.current(), 0);
        assert!(rig.notices.is_empty());
    }

    #[test]
    fn rapid_navigation_activates_only_last() {
        let (mut rig, mut seq) = setup();
        seq.start(&mut rig.cx());
        run(&mut rig, &mut seq, 0);
        rig.notices.clear();

        seq.go_to(1, &mut rig.cx());
        run(&mut rig, &mut seq, 100);
        seq.go_to(2, &mut rig.cx());
        run(&mut rig, &mut seq, 100);
        seq.go_to(5, &mut rig.cx());
        run(&mut rig, &mut seq, 2000);

        assert_eq!(seq.current(), 5);
        assert_eq!(rig.stage.active_scenes(), vec![5]);
        let activated: Vec<_> = rig
            .notices
            .iter()
            .filter(|n| matches!(n, StoryNotice::SceneActivated(_)))
            .collect();
        assert_eq!(activated, vec![&StoryNotice::SceneActivated(5)]);
        assert!(rig.stage.scenes.iter().all(|s| !s.fade_out));
    }

    #[test]
    fn returning_to_fading_scene_cancels_its_cleanup() {
        let (mut rig, mut seq) = setup();
        seq.start(&mut rig.cx());
        run(&mut rig, &mut seq, 0);

        seq.go_to(1, &mut rig.cx());
        run(&mut rig, &mut seq, 100);
        seq.go_to(0, &mut rig.cx());
        run(&mut rig, &mut seq, 300);

        let view = &rig.stage.scenes[0];
        assert!(view.active && !view.fade_out);
        run(&mut rig, &mut seq, 2000);
        assert!(rig.stage.scenes[0].active);
        assert_eq!(rig.stage.active_scenes(), vec![0]);
    }

    #[test]
    fn boundary_indices() {
        let (mut rig, mut seq) = setup();
        assert_eq!(seq.previous_index(), None);
        assert_eq!(seq.next_index(), Some(1));
        seq.go_to(7, &mut rig.cx());
        assert_eq!(seq.next_index(), None);
        assert_eq!(seq.previous_index(), Some(6));
    }
}
