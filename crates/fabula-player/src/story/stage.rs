//! Stage — the presentation sink.
//!
//! The story core never draws. It only sets coarse logical flags on named
//! elements here; the engine's renderer (or a test) reads them back. An
//! element that was never registered is "missing", and controllers treat
//! that as a silent no-op.

use std::collections::HashMap;

use fabula_common::{SceneIndex, StoryContent};

use crate::story::timeline::Generation;

/// Visual state of one scene panel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneView {
    pub active: bool,
    pub fade_in: bool,
    pub fade_out: bool,
}

/// The shared guide overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideView {
    pub visible: bool,
    pub entering: bool,
    pub exiting: bool,
    pub hidden: bool,
}

impl Default for GuideView {
    fn default() -> Self {
        Self {
            visible: false,
            entering: false,
            exiting: false,
            hidden: true,
        }
    }
}

impl GuideView {
    /// Show transition finished
    pub fn settled_visible(&self) -> bool {
        self.visible && !self.entering && !self.exiting && !self.hidden
    }

    /// Hide transition finished
    pub fn settled_hidden(&self) -> bool {
        self.hidden && !self.visible && !self.exiting
    }
}

/// Thought bubble transform/opacity stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BubblePose {
    /// Transparent, slightly scaled down, ready to enter
    #[default]
    Reset,
    /// Fully shown
    Shown,
    /// Fading out upwards
    Exiting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BubbleView {
    pub visible: bool,
    pub pose: BubblePose,
}

/// A target the typewriter writes into. Writes carry the token of the
/// activation that produced them.
pub trait TextSink {
    fn clear(&mut self, owner: Generation);
    fn append(&mut self, ch: char, owner: Generation);
    fn set_typing(&mut self, typing: bool);
    fn text(&self) -> &str;
}

/// Text element inside a thought bubble
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextView {
    pub text: String,
    pub typing: bool,
    /// Text opacity 1 vs 0
    pub shown: bool,
    /// Owner of the most recent write
    pub last_writer: Option<Generation>,
}

impl TextSink for TextView {
    fn clear(&mut self, owner: Generation) {
        self.text.clear();
        self.last_writer = Some(owner);
    }

    fn append(&mut self, ch: char, owner: Generation) {
        self.text.push(ch);
        self.last_writer = Some(owner);
    }

    fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    fn text(&self) -> &str {
        &self.text
    }
}

/// Decorative reveal animation; `not_loaded` holds it at its start frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorView {
    pub name: String,
    pub not_loaded: bool,
}

/// Background music toggle button
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicToggleView {
    pub playing: bool,
    pub hidden: bool,
}

impl MusicToggleView {
    pub fn label(&self) -> &'static str {
        if self.playing {
            "Pause background music"
        } else {
            "Play background music"
        }
    }
}

/// The landing letter → envelope → sending sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LetterView {
    pub paper_dimmed: bool,
    pub paper_closing: bool,
    pub paper_hidden: bool,
    pub envelope_visible: bool,
    pub flap_closed: bool,
    pub envelope_fading: bool,
    pub sending_visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Stage {
    pub scenes: Vec<SceneView>,
    pub guide: Option<GuideView>,
    pub bubbles: HashMap<String, BubbleView>,
    pub texts: HashMap<String, TextView>,
    /// Image element id → image reference
    pub images: HashMap<String, String>,
    /// Video slot id → placeholder shown
    pub placeholders: HashMap<String, bool>,
    pub decor: HashMap<SceneIndex, DecorView>,
    pub music_toggle: Option<MusicToggleView>,
    pub letter: Option<LetterView>,
}

impl Stage {
    /// Register every element the story refers to
    pub fn for_story(content: &StoryContent) -> Self {
        let mut stage = Stage {
            scenes: vec![SceneView::default(); content.total_scenes()],
            guide: Some(GuideView::default()),
            music_toggle: Some(MusicToggleView::default()),
            letter: content.letter.as_ref().map(|_| LetterView::default()),
            ..Stage::default()
        };

        for (index, scene) in content.scenes.iter().enumerate() {
            if let Some(script) = &scene.thought {
                stage.bubbles.insert(script.bubble_id.clone(), BubbleView::default());
                stage.texts.insert(script.text_id.clone(), TextView::default());
                stage.images.insert(script.image_id.clone(), String::new());
            }
            for slot in &scene.videos {
                stage.placeholders.insert(slot.id.clone(), true);
            }
            if let Some(name) = &scene.decor {
                stage.decor.insert(index, DecorView { name: name.clone(), not_loaded: true });
            }
        }
        stage
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.texts.get(id).map(|t| t.text.as_str())
    }

    pub fn placeholder_shown(&self, slot: &str) -> Option<bool> {
        self.placeholders.get(slot).copied()
    }

    pub fn active_scenes(&self) -> Vec<SceneIndex> {
        self.scenes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_story_elements() {
        let content = StoryContent::demo();
        let stage = Stage::for_story(&content);
        assert_eq!(stage.scenes.len(), 8);
        assert!(stage.bubbles.contains_key("thought-bubble-1"));
        assert_eq!(stage.text("thought-text-6"), Some(""));
        assert_eq!(stage.placeholder_shown("story-video-1"), Some(true));
        assert!(stage.decor[&5].not_loaded);
        assert!(stage.letter.is_some());
        assert!(stage.guide.as_ref().unwrap().settled_hidden());
    }

    #[test]
    fn text_view_records_writer() {
        let mut view = TextView::default();
        let mut gen = Generation::default();
        let first = gen.bump();
        view.append('a', first);
        let second = gen.bump();
        view.clear(second);
        view.append('b', second);
        assert_eq!(view.text(), "b");
        assert_eq!(view.last_writer, Some(second));
    }

    #[test]
    fn toggle_label_follows_state() {
        let mut toggle = MusicToggleView::default();
        assert_eq!(toggle.label(), "Play background music");
        toggle.playing = true;
        assert_eq!(toggle.label(), "Pause background music");
    }
}
