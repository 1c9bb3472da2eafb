//! Fixed durations for fades, transitions and pauses (milliseconds).
//!
//! Defaults match the pacing of the original web player. None of these are
//! adaptive; a story file may override any of them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// How long the outgoing scene keeps its `fade_out` marker
    pub scene_fade_out_ms: u64,
    /// Delay before the incoming scene is marked active (0 on first show)
    pub scene_fade_in_delay_ms: u64,

    /// Delay before the guide starts entering
    pub guide_show_delay_ms: u64,
    /// Guide enter animation length
    pub guide_enter_ms: u64,
    /// Guide exit animation length
    pub guide_exit_ms: u64,

    /// Pause between resetting the bubble and playing the first message
    pub thought_settle_ms: u64,
    /// Bubble reset → bubble shown
    pub bubble_enter_ms: u64,
    /// Bubble shown → typing starts
    pub type_delay_ms: u64,
    /// Typewriter speed
    pub char_interval_ms: u64,
    /// Pause after a message is fully typed
    pub hold_ms: u64,
    /// Bubble exit before the next message
    pub bubble_exit_ms: u64,

    /// Decor `not_loaded` flag lifetime on scene entry
    pub decor_reset_ms: u64,

    /// Full audio fade length (each direction)
    pub audio_fade_ms: u64,
    /// Discrete volume steps per fade
    pub audio_fade_steps: u32,
    /// Volume reached at the end of a fade-in
    pub nominal_volume: f32,

    /// Letter intro stage offsets, measured from the click
    pub letter: LetterTimings,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            scene_fade_out_ms: 600,
            scene_fade_in_delay_ms: 300,
            guide_show_delay_ms: 300,
            guide_enter_ms: 600,
            guide_exit_ms: 400,
            thought_settle_ms: 100,
            bubble_enter_ms: 50,
            type_delay_ms: 400,
            char_interval_ms: 60,
            hold_ms: 1500,
            bubble_exit_ms: 450,
            decor_reset_ms: 100,
            audio_fade_ms: 1000,
            audio_fade_steps: 10,
            nominal_volume: 0.2,
            letter: LetterTimings::default(),
        }
    }
}

impl Timings {
    /// Interval between two audio fade steps
    pub fn audio_step_ms(&self) -> u64 {
        self.audio_fade_ms / u64::from(self.audio_fade_steps.max(1))
    }

    /// Time from `show_thought` to the end of its hold, for a message of
    /// `chars` characters. Completion fires one tick after the last character.
    pub fn thought_duration_ms(&self, chars: usize) -> u64 {
        self.bubble_enter_ms
            + self.type_delay_ms
            + (chars as u64 + 1) * self.char_interval_ms
            + self.hold_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterTimings {
    pub closing_ms: u64,
    pub envelope_ms: u64,
    pub flap_ms: u64,
    pub fade_envelope_ms: u64,
    pub sending_ms: u64,
    pub navigate_ms: u64,
}

impl Default for LetterTimings {
    fn default() -> Self {
        Self {
            closing_ms: 100,
            envelope_ms: 2000,
            flap_ms: 2600,
            fade_envelope_ms: 3800,
            sending_ms: 4300,
            navigate_ms: 5500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_step_splits_fade() {
        let t = Timings::default();
        assert_eq!(t.audio_step_ms(), 100);

        let t = Timings { audio_fade_steps: 0, ..Timings::default() };
        assert_eq!(t.audio_step_ms(), 1000);
    }

    #[test]
    fn thought_duration_counts_completion_tick() {
        let t = Timings::default();
        // 50 + 400 + 4 * 60 + 1500
        assert_eq!(t.thought_duration_ms(3), 2190);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let t: Timings = serde_json::from_str(r#"{ "hold_ms": 10 }"#).unwrap();
        assert_eq!(t.hold_ms, 10);
        assert_eq!(t.char_interval_ms, 60);
        assert_eq!(t.letter.navigate_ms, 5500);
    }
}
