//! Typewriter — reveals a string one character per tick into a text sink.
//!
//! Only one reveal loop exists at a time: starting a new run cancels the
//! previous run's repeating timer before anything else happens.

use crate::story::stage::TextSink;
use crate::story::timeline::{Generation, TimerHandle, Timeline};

/// Timer payload for one reveal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCue {
    run: u64,
}

/// Outcome of a reveal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeStep {
    /// One more character written
    Typed,
    /// The whole text is in the sink; reported once per run
    Completed { owner: Generation },
    /// Cue from a cancelled or replaced run
    Stale,
}

#[derive(Debug)]
struct TypingRun {
    id: u64,
    chars: Vec<char>,
    index: usize,
    timer: TimerHandle,
    owner: Generation,
}

#[derive(Debug, Default)]
pub struct Typewriter {
    run: Option<TypingRun>,
    next_run: u64,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear `sink` and start revealing `text`, one character every
    /// `interval_ms`. Any run in progress is cancelled first.
    pub fn type_text<C>(
        &mut self,
        timeline: &mut Timeline<C>,
        sink: &mut dyn TextSink,
        text: &str,
        interval_ms: u64,
        owner: Generation,
    ) where
        C: From<TypeCue> + Clone,
    {
        self.cancel(timeline);

        self.next_run += 1;
        let id = self.next_run;
        sink.clear(owner);
        sink.set_typing(true);

        let timer = timeline.every(interval_ms, C::from(TypeCue { run: id }));
        self.run = Some(TypingRun {
            id,
            chars: text.chars().collect(),
            index: 0,
            timer,
            owner,
        });
    }

    /// Handle one reveal tick
    pub fn on_cue<C: Clone>(
        &mut self,
        cue: TypeCue,
        timeline: &mut Timeline<C>,
        sink: &mut dyn TextSink,
    ) -> TypeStep {
        let Some(run) = self.run.as_mut().filter(|r| r.id == cue.run) else {
            return TypeStep::Stale;
        };

        if let Some(&ch) = run.chars.get(run.index) {
            sink.append(ch, run.owner);
            run.index += 1;
            return TypeStep::Typed;
        }

        timeline.cancel(run.timer);
        let owner = run.owner;
        self.run = None;
        sink.set_typing(false);
        TypeStep::Completed { owner }
    }

    /// Stop the current run without completing it
    pub fn cancel<C: Clone>(&mut self, timeline: &mut Timeline<C>) {
        if let Some(run) = self.run.take() {
            timeline.cancel(run.timer);
        }
    }

    pub fn is_typing(&self) -> bool {
        self.run.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::stage::TextView;

    /// Run the timeline to `until`, feeding every cue to the typewriter
    fn run_until(
        tw: &mut Typewriter,
        tl: &mut Timeline<TypeCue>,
        sink: &mut TextView,
        until: u64,
    ) -> Vec<TypeStep> {
        let mut steps = Vec::new();
        while let Some((_, cue)) = tl.pop_due(until) {
            steps.push(tw.on_cue(cue, tl, sink));
        }
        tl.advance_to(until);
        steps
    }

    #[test]
    fn types_whole_text_then_completes_once() {
        let mut tw = Typewriter::new();
        let mut tl = Timeline::new();
        let mut sink = TextView::default();
        let owner = Generation::default();

        tw.type_text(&mut tl, &mut sink, "abc", 60, owner);
        assert!(sink.typing);

        let steps = run_until(&mut tw, &mut tl, &mut sink, 150);
        assert_eq!(steps, vec![TypeStep::Typed, TypeStep::Typed]);
        assert_eq!(sink.text, "ab");

        let steps = run_until(&mut tw, &mut tl, &mut sink, 10_000);
        assert_eq!(steps, vec![TypeStep::Typed, TypeStep::Completed { owner }]);
        assert_eq!(sink.text, "abc");
        assert!(!sink.typing);
        assert!(!tw.is_typing());
        assert_eq!(tl.pending(), 0);
    }

    #[test]
    fn second_run_supersedes_first() {
        let mut tw = Typewriter::new();
        let mut tl = Timeline::new();
        let mut sink = TextView::default();
        let owner = Generation::default();

        tw.type_text(&mut tl, &mut sink, "abc", 60, owner);
        run_until(&mut tw, &mut tl, &mut sink, 60);
        assert_eq!(sink.text, "a");

        tw.type_text(&mut tl, &mut sink, "xyz", 60, owner);
        let steps = run_until(&mut tw, &mut tl, &mut sink, 10_000);

        assert_eq!(sink.text, "xyz");
        assert_eq!(sink.text.chars().count(), 3);
        let completions = steps
            .iter()
            .filter(|s| matches!(s, TypeStep::Completed { .. }))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn immediate_restart_never_mixes_texts() {
        let mut tw = Typewriter::new();
        let mut tl = Timeline::new();
        let mut sink = TextView::default();

        tw.type_text(&mut tl, &mut sink, "abc", 60, Generation::default());
        tw.type_text(&mut tl, &mut sink, "xyz", 60, Generation::default());
        run_until(&mut tw, &mut tl, &mut sink, 10_000);
        assert_eq!(sink.text, "xyz");
    }

    #[test]
    fn stale_cue_is_ignored() {
        let mut tw = Typewriter::new();
        let mut tl: Timeline<TypeCue> = Timeline::new();
        let mut sink = TextView::default();

        tw.type_text(&mut tl, &mut sink, "ab", 60, Generation::default());
        let (_, old_cue) = tl.pop_due(60).unwrap();
        tw.type_text(&mut tl, &mut sink, "xy", 60, Generation::default());

        assert_eq!(tw.on_cue(old_cue, &mut tl, &mut sink), TypeStep::Stale);
        assert_eq!(sink.text, "");
    }

    #[test]
    fn cancel_stops_without_completion() {
        let mut tw = Typewriter::new();
        let mut tl = Timeline::new();
        let mut sink = TextView::default();

        tw.type_text(&mut tl, &mut sink, "hello", 60, Generation::default());
        run_until(&mut tw, &mut tl, &mut sink, 120);
        tw.cancel(&mut tl);
        let steps = run_until(&mut tw, &mut tl, &mut sink, 10_000);
        assert!(steps.is_empty());
        assert_eq!(sink.text, "he");
    }

    #[test]
    fn empty_text_completes_on_first_tick() {
        let mut tw = Typewriter::new();
        let mut tl = Timeline::new();
        let mut sink = TextView::default();
        let owner = Generation::default();

        tw.type_text(&mut tl, &mut sink, "", 60, owner);
        let steps = run_until(&mut tw, &mut tl, &mut sink, 60);
        assert_eq!(steps, vec![TypeStep::Completed { owner }]);
    }
}
