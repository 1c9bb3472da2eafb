//! Landing letter: paper folds into an envelope, the envelope is "sent",
//! then the story moves on to the first real scene. Runs at most once.

use fabula_common::SceneIndex;

use crate::story::timeline::{TimerHandle, Timeline};
use crate::story::Cx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterCue {
    Closing,
    Envelope,
    Flap,
    FadeEnvelope,
    Sending,
    Navigate,
}

#[derive(Debug, Default)]
pub struct LetterIntro {
    opened: bool,
    timers: Vec<TimerHandle>,
}

impl LetterIntro {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> bool {
        self.opened
    }

    /// Start the sequence. Returns false if it already ran or the story has
    /// no letter.
    pub fn open<C>(&mut self, cx: &mut Cx<'_, C>) -> bool
    where
        C: From<LetterCue> + Clone,
    {
        if self.opened {
            tracing::debug!("Letter already opened");
            return false;
        }
        if cx.content.letter.is_none() {
            tracing::warn!("Story has no letter to open");
            return false;
        }
        self.opened = true;
        tracing::info!("Opening letter");

        if let Some(view) = cx.stage.letter.as_mut() {
            view.paper_dimmed = true;
        }

        let content = cx.content;
        let t = &content.timings.letter;
        let steps = [
            (t.closing_ms, LetterCue::Closing),
            (t.envelope_ms, LetterCue::Envelope),
            (t.flap_ms, LetterCue::Flap),
            (t.fade_envelope_ms, LetterCue::FadeEnvelope),
            (t.sending_ms, LetterCue::Sending),
            (t.navigate_ms, LetterCue::Navigate),
        ];
        for (at, cue) in steps {
            self.timers.push(cx.timeline.after(at, C::from(cue)));
        }
        true
    }

    /// Drop the stages that have not run yet
    pub fn cancel<C: Clone>(&mut self, timeline: &mut Timeline<C>) {
        if self.timers.is_empty() {
            return;
        }
        tracing::debug!("Left the letter scene, dropping the rest of the sequence");
        for handle in self.timers.drain(..) {
            timeline.cancel(handle);
        }
    }

    /// Advance the sequence. `Navigate` yields the scene to go to.
    pub fn on_cue<C>(&mut self, cue: LetterCue, cx: &mut Cx<'_, C>) -> Option<SceneIndex> {
        if cue == LetterCue::Navigate {
            self.timers.clear();
            return cx.content.letter.as_ref().map(|l| l.next_scene);
        }

        let view = cx.stage.letter.as_mut()?;
        match cue {
            LetterCue::Closing => view.paper_closing = true,
            LetterCue::Envelope => {
                view.paper_hidden = true;
                view.envelope_visible = true;
            }
            LetterCue::Flap => view.flap_closed = true,
            LetterCue::FadeEnvelope => view.envelope_fading = true,
            LetterCue::Sending => {
                view.envelope_visible = false;
                view.sending_visible = true;
            }
            LetterCue::Navigate => {}
        }
        None
    }
}
