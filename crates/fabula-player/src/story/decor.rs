//! Decorative reveal animations (the flower scene).
//!
//! Entering a decor scene puts its animation back at the start frame and
//! releases it shortly after, so the reveal replays on every visit.

use std::collections::HashMap;

use fabula_common::SceneIndex;

use crate::story::timeline::{Generation, TimerHandle};
use crate::story::{Cx, TransitionObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorCue {
    Ready { scene: SceneIndex, gen: Generation },
}

#[derive(Debug, Default)]
pub struct DecorController {
    /// Outstanding release per scene
    pending: HashMap<SceneIndex, (TimerHandle, Generation)>,
    gen: Generation,
}

impl DecorController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart `scene`'s animation. Scenes without decor are ignored.
    pub fn restart<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>)
    where
        C: From<DecorCue> + Clone,
    {
        let Some(decor) = cx.stage.decor.get_mut(&scene) else {
            return;
        };
        decor.not_loaded = true;
        tracing::debug!("Restarting '{}' animation on scene {}", decor.name, scene);

        if let Some((handle, _)) = self.pending.remove(&scene) {
            cx.timeline.cancel(handle);
        }
        let gen = self.gen.bump();
        let delay = cx.content.timings.decor_reset_ms;
        let handle = cx.timeline.after(delay, C::from(DecorCue::Ready { scene, gen }));
        self.pending.insert(scene, (handle, gen));
    }

    pub fn on_cue<C>(&mut self, cue: DecorCue, cx: &mut Cx<'_, C>) {
        let DecorCue::Ready { scene, gen } = cue;
        if self.pending.get(&scene).map(|(_, g)| *g) != Some(gen) {
            return;
        }
        self.pending.remove(&scene);
        if let Some(decor) = cx.stage.decor.get_mut(&scene) {
            decor.not_loaded = false;
        }
    }
}

impl<C> TransitionObserver<C> for DecorController
where
    C: From<DecorCue> + Clone,
{
    fn name(&self) -> &'static str {
        "decor"
    }

    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        self.restart(scene, cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::stage::DecorView;
    use crate::story::testing::Rig;
    use fabula_common::StoryContent;

    #[test]
    fn decor_scene_replays_reveal() {
        let mut rig: Rig<DecorCue> = Rig::new(StoryContent::demo());
        let mut decor = DecorController::new();

        rig.run(500, |cue, cx| decor.on_cue(cue, cx));
        assert!(rig.stage.decor[&5].not_loaded);

        decor.scene_entered(5, &mut rig.cx());
        rig.run(99, |cue, cx| decor.on_cue(cue, cx));
        assert!(rig.stage.decor[&5].not_loaded);
        rig.run(1, |cue, cx| decor.on_cue(cue, cx));
        assert!(!rig.stage.decor[&5].not_loaded);

        decor.scene_entered(5, &mut rig.cx());
        assert!(rig.stage.decor[&5].not_loaded);
    }

    #[test]
    fn quick_hop_between_decor_scenes_releases_both() {
        let mut rig: Rig<DecorCue> = Rig::new(StoryContent::demo());
        rig.stage.decor.insert(
            6,
            DecorView {
                name: "stars".into(),
                not_loaded: true,
            },
        );
        let mut decor = DecorController::new();

        decor.scene_entered(5, &mut rig.cx());
        rig.run(40, |cue, cx| decor.on_cue(cue, cx));
        decor.scene_entered(6, &mut rig.cx());
        rig.run(100, |cue, cx| decor.on_cue(cue, cx));

        assert!(!rig.stage.decor[&5].not_loaded);
        assert!(!rig.stage.decor[&6].not_loaded);
        assert_eq!(rig.timeline.pending(), 0);
    }

    #[test]
    fn plain_scene_schedules_nothing() {
        let mut rig: Rig<DecorCue> = Rig::new(StoryContent::demo());
        let mut decor = DecorController::new();
        decor.scene_entered(2, &mut rig.cx());
        assert_eq!(rig.timeline.pending(), 0);
    }
}
