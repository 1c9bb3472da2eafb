//! Thought sequencer — the guide's per-scene messages, typed one at a time
//! into a thought bubble.
//!
//! Per activation:
//!   Idle → BubbleEntering → Typing → HoldingAfterType → BubbleExiting → …
//! and back to Idle after the last message. The cycle does not loop.
//!
//! Every cue carries the cycle generation that scheduled it. `start_cycle`,
//! `init_thought_cycle` and `halt` bump the generation, so callbacks from a
//! superseded cycle can never touch the bubble again.

use fabula_common::{SceneIndex, ThoughtScript};

use crate::story::stage::{BubblePose, BubbleView, Stage, TextSink, TextView};
use crate::story::timeline::{Generation, TimerHandle, Timeline};
use crate::story::typewriter::{TypeCue, TypeStep, Typewriter};
use crate::story::{Cx, StoryNotice, TransitionObserver};

/// Timer payloads owned by the thought sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThoughtCue {
    /// Scene entry delay elapsed → start the cycle
    Begin { scene: SceneIndex, cycle: Generation },
    /// Bubble reset settled → play the first message
    Settled { cycle: Generation },
    /// Previous bubble faded out → show the message at the cursor
    NextMessage { cycle: Generation },
    /// Bubble fully entered
    BubbleShown { cycle: Generation },
    /// Start the typewriter
    StartTyping { cycle: Generation },
    /// Post-typing pause over
    HoldDone { cycle: Generation },
    Type(TypeCue),
}

impl From<TypeCue> for ThoughtCue {
    fn from(cue: TypeCue) -> Self {
        ThoughtCue::Type(cue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThoughtPhase {
    Idle,
    BubbleEntering,
    Typing,
    HoldingAfterType,
    BubbleExiting,
}

/// What happens once a shown thought has been typed and held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FollowUp {
    /// Advance the scene's cycle
    NextInCycle,
    /// Report `StoryNotice::ThoughtFinished` and stop
    Notify,
}

#[derive(Debug)]
struct ActiveScript {
    scene: SceneIndex,
    script: ThoughtScript,
}

#[derive(Debug)]
pub struct ThoughtSequencer {
    active: Option<ActiveScript>,
    cursor: usize,
    phase: ThoughtPhase,
    cycle_active: bool,
    cycle: Generation,
    /// The single outstanding step timer (typing ticks live in the typewriter)
    pending: Option<TimerHandle>,
    typewriter: Typewriter,
    message: String,
    follow_up: FollowUp,
}

impl Default for ThoughtSequencer {
    fn default() -> Self {
        Self {
            active: None,
            cursor: 0,
            phase: ThoughtPhase::Idle,
            cycle_active: false,
            cycle: Generation::default(),
            pending: None,
            typewriter: Typewriter::new(),
            message: String::new(),
            follow_up: FollowUp::NextInCycle,
        }
    }
}

impl ThoughtSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_active(&self) -> bool {
        self.cycle_active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase(&self) -> ThoughtPhase {
        self.phase
    }

    pub fn cycle(&self) -> Generation {
        self.cycle
    }

    pub fn is_typing(&self) -> bool {
        self.typewriter.is_typing()
    }

    /// Scene whose script is loaded
    pub fn scene(&self) -> Option<SceneIndex> {
        self.active.as_ref().map(|a| a.scene)
    }

    /// Message currently in (or last in) the bubble
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Load `scene`'s script, show its guide pose and start the cycle after
    /// the script's entry delay. Anything still running is dropped first.
    pub fn init_thought_cycle<C>(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        let content = cx.content;
        let Some(script) = content.thought_script(scene) else {
            tracing::debug!("Scene {} has no thought script", scene);
            return;
        };

        self.halt(cx);
        self.active = Some(ActiveScript {
            scene,
            script: script.clone(),
        });
        self.update_guide_image(cx);
        if let Some(bubble) = cx.stage.bubbles.get_mut(&script.bubble_id) {
            bubble.visible = true;
        }

        let cycle = self.cycle;
        self.pending = Some(cx.timeline.after(
            script.start_delay_ms,
            C::from(ThoughtCue::Begin { scene, cycle }),
        ));
        tracing::debug!(
            "Thought cycle for scene {} starts in {}ms ({} messages)",
            scene,
            script.start_delay_ms,
            script.messages.len()
        );
    }

    /// Supersede any cycle in progress and play the script from message 0.
    /// `scene` switches scripts; `None` restarts the loaded one.
    pub fn start_cycle<C>(&mut self, scene: Option<SceneIndex>, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        self.cancel_pending(cx.timeline);
        let cycle = self.cycle.bump();

        let content = cx.content;
        if let Some(script) = scene.and_then(|s| content.thought_script(s).map(|t| (s, t))) {
            self.active = Some(ActiveScript {
                scene: script.0,
                script: script.1.clone(),
            });
            self.update_guide_image(cx);
        }
        if self.active.is_none() {
            return;
        }

        self.cursor = 0;
        self.cycle_active = false;
        self.phase = ThoughtPhase::Idle;
        self.reset_sinks(cx.stage, cycle, false);

        let settle = content.timings.thought_settle_ms;
        self.pending = Some(cx.timeline.after(settle, C::from(ThoughtCue::Settled { cycle })));
    }

    /// Show a single message in the loaded script's bubble, replacing any
    /// running cycle. Reports `StoryNotice::ThoughtFinished` once held.
    pub fn show_thought<C>(&mut self, message: &str, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        self.cycle_active = false;
        self.present(message.to_string(), FollowUp::Notify, cx);
    }

    /// Cancel all pending work and idle. Used when the new scene has no
    /// script of its own.
    pub fn halt<C: Clone>(&mut self, cx: &mut Cx<'_, C>) {
        self.cancel_pending(cx.timeline);
        let cycle = self.cycle.bump();
        self.cycle_active = false;
        self.cursor = 0;
        self.phase = ThoughtPhase::Idle;

        self.reset_sinks(cx.stage, cycle, false);
        self.active = None;
    }

    pub fn on_cue<C>(&mut self, cue: ThoughtCue, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        let content = cx.content;
        let timings = &content.timings;
        match cue {
            ThoughtCue::Type(cue) => self.on_type(cue, cx),
            ThoughtCue::Begin { scene, cycle } => {
                if self.is_current(cycle) {
                    self.pending = None;
                    self.start_cycle(Some(scene), cx);
                }
            }
            ThoughtCue::Settled { cycle } => {
                if self.is_current(cycle) {
                    self.pending = None;
                    self.cycle_active = true;
                    self.show_next(cx);
                }
            }
            ThoughtCue::NextMessage { cycle } => {
                if self.is_current(cycle) {
                    self.pending = None;
                    if let Some(message) = self.message_at_cursor() {
                        self.present(message, FollowUp::NextInCycle, cx);
                    }
                }
            }
            ThoughtCue::BubbleShown { cycle } => {
                if self.is_current(cycle) {
                    if let Some(bubble) = self.bubble(cx.stage) {
                        bubble.pose = BubblePose::Shown;
                    }
                    let delay = timings.type_delay_ms;
                    self.pending = Some(
                        cx.timeline
                            .after(delay, C::from(ThoughtCue::StartTyping { cycle })),
                    );
                }
            }
            ThoughtCue::StartTyping { cycle } => {
                if self.is_current(cycle) {
                    self.pending = None;
                    let interval = timings.char_interval_ms;
                    let Some(text) = self.text(cx.stage) else {
                        return;
                    };
                    text.shown = true;
                    self.phase = ThoughtPhase::Typing;
                    self.typewriter
                        .type_text(cx.timeline, text, &self.message, interval, cycle);
                }
            }
            ThoughtCue::HoldDone { cycle } => {
                if self.is_current(cycle) {
                    self.pending = None;
                    match self.follow_up {
                        FollowUp::NextInCycle => {
                            self.cursor += 1;
                            self.show_next(cx);
                        }
                        FollowUp::Notify => {
                            self.phase = ThoughtPhase::Idle;
                            cx.notices.push(StoryNotice::ThoughtFinished {
                                message: self.message.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn on_type<C>(&mut self, cue: TypeCue, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + Clone,
    {
        let Some(text) = self.text(cx.stage) else {
            self.typewriter.cancel(cx.timeline);
            return;
        };

        if let TypeStep::Completed { owner } = self.typewriter.on_cue(cue, cx.timeline, text) {
            if !self.is_current(owner) {
                return;
            }
            self.phase = ThoughtPhase::HoldingAfterType;
            let hold = cx.content.timings.hold_ms;
            self.pending = Some(
                cx.timeline
                    .after(hold, C::from(ThoughtCue::HoldDone { cycle: owner })),
            );
        }
    }

    /// Play the message at the cursor, or finish the cycle after the last one
    fn show_next<C>(&mut self, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        let Some(active) = &self.active else {
            return;
        };
        let scene = active.scene;

        let Some(message) = self.message_at_cursor() else {
            self.cycle_active = false;
            self.cursor = 0;
            self.phase = ThoughtPhase::Idle;
            tracing::debug!("Thought cycle for scene {} complete", scene);
            cx.notices.push(StoryNotice::ThoughtCycleComplete(scene));
            return;
        };

        if self.cursor == 0 {
            self.present(message, FollowUp::NextInCycle, cx);
            return;
        }

        if let Some(bubble) = self.bubble(cx.stage) {
            bubble.pose = BubblePose::Exiting;
        }
        self.phase = ThoughtPhase::BubbleExiting;
        let cycle = self.cycle;
        let exit = cx.content.timings.bubble_exit_ms;
        self.pending = Some(
            cx.timeline
                .after(exit, C::from(ThoughtCue::NextMessage { cycle })),
        );
    }

    /// Reset the bubble and begin entering it with `message`
    fn present<C>(&mut self, message: String, follow_up: FollowUp, cx: &mut Cx<'_, C>)
    where
        C: From<ThoughtCue> + From<TypeCue> + Clone,
    {
        let Some(active) = &self.active else {
            tracing::debug!("No thought script loaded, ignoring thought");
            return;
        };
        let script = &active.script;
        if !cx.stage.bubbles.contains_key(&script.bubble_id)
            || !cx.stage.texts.contains_key(&script.text_id)
        {
            tracing::debug!(
                "Thought bubble '{}' / text '{}' not on stage",
                script.bubble_id,
                script.text_id
            );
            self.cycle_active = false;
            self.cursor = 0;
            self.phase = ThoughtPhase::Idle;
            return;
        }

        self.cancel_pending(cx.timeline);
        let cycle = self.cycle;
        self.reset_sinks(cx.stage, cycle, true);

        self.message = message;
        self.follow_up = follow_up;
        self.phase = ThoughtPhase::BubbleEntering;

        let enter = cx.content.timings.bubble_enter_ms;
        self.pending = Some(
            cx.timeline
                .after(enter, C::from(ThoughtCue::BubbleShown { cycle })),
        );
    }

    fn update_guide_image<C>(&self, cx: &mut Cx<'_, C>) {
        let Some(active) = &self.active else {
            return;
        };
        match cx.stage.images.get_mut(&active.script.image_id) {
            Some(image) => *image = active.script.guide_image.clone(),
            None => tracing::debug!("Guide image '{}' not on stage", active.script.image_id),
        }
    }

    fn cancel_pending<C: Clone>(&mut self, timeline: &mut Timeline<C>) {
        timeline.clear(&mut self.pending);
        self.typewriter.cancel(timeline);
    }

    fn is_current(&self, cycle: Generation) -> bool {
        if cycle != self.cycle {
            tracing::trace!("Dropping stale thought cue (cycle {:?})", cycle);
            return false;
        }
        true
    }

    fn bubble<'s>(&self, stage: &'s mut Stage) -> Option<&'s mut BubbleView> {
        let active = self.active.as_ref()?;
        stage.bubbles.get_mut(&active.script.bubble_id)
    }

    fn text<'s>(&self, stage: &'s mut Stage) -> Option<&'s mut TextView> {
        let active = self.active.as_ref()?;
        stage.texts.get_mut(&active.script.text_id)
    }

    /// Empty the text (as `owner`) and put the bubble back at its reset pose
    fn reset_sinks(&self, stage: &mut Stage, owner: Generation, bubble_visible: bool) {
        if let Some(text) = self.text(stage) {
            text.clear(owner);
            text.set_typing(false);
            text.shown = false;
        }
        if let Some(bubble) = self.bubble(stage) {
            bubble.visible = bubble_visible;
            bubble.pose = BubblePose::Reset;
        }
    }

    fn message_at_cursor(&self) -> Option<String> {
        self.active
            .as_ref()
            .and_then(|a| a.script.messages.get(self.cursor).cloned())
    }
}

impl<C> TransitionObserver<C> for ThoughtSequencer
where
    C: From<ThoughtCue> + From<TypeCue> + Clone,
{
    fn name(&self) -> &'static str {
        "thought"
    }

    fn scene_entered(&mut self, scene: SceneIndex, cx: &mut Cx<'_, C>) {
        if cx.content.thought_script(scene).is_some() {
            self.init_thought_cycle(scene, cx);
        } else if self.active.is_some() || self.pending.is_some() {
            self.halt(cx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::testing::Rig;
    use fabula_common::{SceneConfig, StoryContent, Timings};

    fn script(n: usize, delay: u64, messages: &[&str]) -> ThoughtScript {
        ThoughtScript {
            guide_image: format!("pose-{}.png", n),
            messages: messages.iter().map(|m| m.to_string()).collect(),
            start_delay_ms: delay,
            bubble_id: format!("bubble-{}", n),
            text_id: format!("text-{}", n),
            image_id: format!("image-{}", n),
        }
    }

    fn story() -> StoryContent {
        let scene = |thought| SceneConfig {
            title: "s".into(),
            thought,
            ..SceneConfig::default()
        };
        StoryContent {
            title: "thoughts".into(),
            scenes: vec![
                scene(None),
                scene(Some(script(1, 1500, &["one", "two", "three", "four"]))),
                scene(Some(script(2, 1000, &["alpha", "beta"]))),
            ],
            default_track: None,
            base_address: String::new(),
            letter: None,
            timings: Timings::default(),
        }
    }

    fn run(rig: &mut Rig<ThoughtCue>, seq: &mut ThoughtSequencer, dt: u64) {
        rig.run(dt, |cue, cx| seq.on_cue(cue, cx));
    }

    #[test]
    fn four_message_cycle_ends_idle_without_looping() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.init_thought_cycle(1, &mut rig.cx());

        let t = Timings::default();
        let lengths = [3usize, 3, 5, 4];
        let total: u64 = 1500
            + t.thought_settle_ms
            + lengths.iter().map(|&n| t.thought_duration_ms(n)).sum::<u64>()
            + 3 * t.bubble_exit_ms;

        run(&mut rig, &mut seq, total - 1);
        assert!(seq.cycle_active());
        assert_eq!(seq.cursor(), 3);
        assert_eq!(seq.phase(), ThoughtPhase::HoldingAfterType);

        run(&mut rig, &mut seq, 1);
        assert!(!seq.cycle_active());
        assert_eq!(seq.cursor(), 0);
        assert_eq!(seq.phase(), ThoughtPhase::Idle);
        assert_eq!(rig.notices, vec![StoryNotice::ThoughtCycleComplete(1)]);
        assert_eq!(rig.stage.text("text-1"), Some("four"));

        run(&mut rig, &mut seq, 60_000);
        assert!(!seq.cycle_active());
        assert_eq!(rig.timeline.pending(), 0);
        assert_eq!(rig.notices.len(), 1);
    }

    #[test]
    fn first_message_types_through_phases() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.init_thought_cycle(2, &mut rig.cx());
        assert_eq!(rig.stage.images["image-2"], "pose-2.png");
        assert!(rig.stage.bubbles["bubble-2"].visible);

        // 1000 delay + 100 settle
        run(&mut rig, &mut seq, 1100);
        assert!(seq.cycle_active());
        assert_eq!(seq.phase(), ThoughtPhase::BubbleEntering);
        assert_eq!(rig.stage.bubbles["bubble-2"].pose, BubblePose::Reset);

        run(&mut rig, &mut seq, 50);
        assert_eq!(rig.stage.bubbles["bubble-2"].pose, BubblePose::Shown);

        run(&mut rig, &mut seq, 400 + 120);
        assert_eq!(seq.phase(), ThoughtPhase::Typing);
        assert_eq!(rig.stage.text("text-2"), Some("al"));
        assert!(rig.stage.texts["text-2"].typing);

        run(&mut rig, &mut seq, 4 * 60);
        assert_eq!(seq.phase(), ThoughtPhase::HoldingAfterType);
        assert_eq!(rig.stage.text("text-2"), Some("alpha"));
        assert!(!rig.stage.texts["text-2"].typing);

        run(&mut rig, &mut seq, 1500);
        assert_eq!(seq.phase(), ThoughtPhase::BubbleExiting);
        assert_eq!(rig.stage.bubbles["bubble-2"].pose, BubblePose::Exiting);
        assert_eq!(seq.cursor(), 1);
    }

    #[test]
    fn restarted_cycle_owns_every_later_write() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();

        seq.start_cycle(Some(1), &mut rig.cx());
        // Into the typing of "one"
        run(&mut rig, &mut seq, 100 + 50 + 400 + 130);
        assert!(seq.is_typing());
        let first = seq.cycle();

        seq.start_cycle(Some(1), &mut rig.cx());
        let second = seq.cycle();
        assert_ne!(first, second);

        let mut writers = Vec::new();
        let until = rig.timeline.now() + 60_000;
        while let Some((_, cue)) = rig.timeline.pop_due(until) {
            seq.on_cue(cue, &mut rig.cx());
            writers.push(rig.stage.texts["text-1"].last_writer);
        }
        assert!(!writers.is_empty());
        assert!(writers.iter().all(|w| *w == Some(second)));
        assert_eq!(rig.stage.text("text-1"), Some("four"));
        assert_eq!(rig.notices, vec![StoryNotice::ThoughtCycleComplete(1)]);
    }

    #[test]
    fn reinit_before_start_replaces_pending_cycle() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();

        seq.init_thought_cycle(1, &mut rig.cx());
        run(&mut rig, &mut seq, 500);
        seq.init_thought_cycle(2, &mut rig.cx());
        assert!(!rig.stage.bubbles["bubble-1"].visible);

        run(&mut rig, &mut seq, 60_000);
        assert_eq!(seq.scene(), Some(2));
        assert_eq!(rig.stage.text("text-1"), Some(""));
        assert_eq!(rig.stage.text("text-2"), Some("beta"));
        assert_eq!(rig.notices, vec![StoryNotice::ThoughtCycleComplete(2)]);
    }

    #[test]
    fn halt_drops_everything() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.start_cycle(Some(2), &mut rig.cx());
        run(&mut rig, &mut seq, 700);
        assert!(seq.is_typing());

        seq.halt(&mut rig.cx());
        assert_eq!(rig.timeline.pending(), 0);
        assert!(!seq.cycle_active());
        assert_eq!(seq.scene(), None);
        assert!(!rig.stage.bubbles["bubble-2"].visible);
        assert!(!rig.stage.texts["text-2"].typing);
    }

    #[test]
    fn scene_without_script_halts_running_cycle() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.scene_entered(2, &mut rig.cx());
        run(&mut rig, &mut seq, 1500);

        seq.scene_entered(0, &mut rig.cx());
        run(&mut rig, &mut seq, 60_000);
        assert_eq!(seq.phase(), ThoughtPhase::Idle);
        assert!(rig.notices.is_empty());
    }

    #[test]
    fn direct_thought_notifies() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.init_thought_cycle(2, &mut rig.cx());

        seq.show_thought("hey", &mut rig.cx());
        run(&mut rig, &mut seq, Timings::default().thought_duration_ms(3));
        assert_eq!(
            rig.notices,
            vec![StoryNotice::ThoughtFinished { message: "hey".into() }]
        );
        assert_eq!(rig.stage.text("text-2"), Some("hey"));
        assert_eq!(rig.timeline.pending(), 0);
    }

    #[test]
    fn thought_without_script_is_noop() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        let mut seq = ThoughtSequencer::new();
        seq.show_thought("nobody listens", &mut rig.cx());
        assert_eq!(rig.timeline.pending(), 0);
        assert_eq!(seq.phase(), ThoughtPhase::Idle);
    }

    #[test]
    fn missing_text_sink_is_silent() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        rig.stage.texts.remove("text-2");
        let mut seq = ThoughtSequencer::new();
        seq.start_cycle(Some(2), &mut rig.cx());
        run(&mut rig, &mut seq, 60_000);
        assert_eq!(seq.phase(), ThoughtPhase::Idle);
        assert!(!seq.is_typing());
        assert!(!seq.cycle_active());
        assert_eq!(seq.cursor(), 0);
        assert_eq!(rig.timeline.pending(), 0);
    }

    #[test]
    fn missing_bubble_ends_cycle_from_scene_entry() {
        let mut rig: Rig<ThoughtCue> = Rig::new(story());
        rig.stage.bubbles.remove("bubble-1");
        let mut seq = ThoughtSequencer::new();
        seq.scene_entered(1, &mut rig.cx());
        run(&mut rig, &mut seq, 60_000);
        assert!(!seq.cycle_active());
        assert!(rig.notices.is_empty());
        assert_eq!(rig.timeline.pending(), 0);
    }
}
