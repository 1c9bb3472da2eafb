//! Story content — the static configuration a presentation plays.
//!
//! A story is a list of scenes. Each scene may show the guide character, carry
//! a thought script (the guide's typed messages), contain video slots, name a
//! background music track and a decorative reveal animation.
//!
//! Content is loaded from JSON; `StoryContent::demo()` provides a built-in
//! story so the player runs without any files.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ContentError, Result, SceneIndex, Timings};

/// Root content container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryContent {
    pub title: String,
    pub scenes: Vec<SceneConfig>,
    /// Track used when a scene's own track fails to load
    #[serde(default)]
    pub default_track: Option<String>,
    /// The presentation's own address. A video source equal to this counts
    /// as "unset".
    #[serde(default)]
    pub base_address: String,
    /// Landing letter (click to send, then move on)
    #[serde(default)]
    pub letter: Option<LetterConfig>,
    #[serde(default)]
    pub timings: Timings,
}

/// One narrative panel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    pub title: String,
    /// Whether the shared guide overlay is visible in this scene
    #[serde(default)]
    pub guide: bool,
    #[serde(default)]
    pub thought: Option<ThoughtScript>,
    #[serde(default)]
    pub videos: Vec<VideoSlotConfig>,
    #[serde(default)]
    pub music: Option<String>,
    /// Decorative reveal animation restarted on every visit
    #[serde(default)]
    pub decor: Option<String>,
    /// Target of this scene's navigation button (defaults to the next scene)
    #[serde(default)]
    pub next: Option<SceneIndex>,
    /// Background colour, "#rrggbb"
    #[serde(default)]
    pub color: Option<String>,
}

/// The guide's messages for one scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtScript {
    /// Guide pose image shown while this script plays
    pub guide_image: String,
    pub messages: Vec<String>,
    /// Wait after the scene is entered before the cycle starts
    #[serde(default = "default_start_delay")]
    pub start_delay_ms: u64,
    /// Stage element ids
    pub bubble_id: String,
    pub text_id: String,
    pub image_id: String,
}

fn default_start_delay() -> u64 {
    1500
}

/// An inline video slot with its placeholder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSlotConfig {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// The click-to-send letter on the landing scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterConfig {
    #[serde(default)]
    pub scene: SceneIndex,
    #[serde(default = "default_letter_next")]
    pub next_scene: SceneIndex,
}

fn default_letter_next() -> SceneIndex {
    1
}

impl SceneConfig {
    /// Background colour as 0xRRGGBB, falling back to a neutral paper tone
    pub fn color_rgb(&self) -> u32 {
        self.color
            .as_deref()
            .and_then(|c| u32::from_str_radix(c.trim_start_matches('#'), 16).ok())
            .unwrap_or(0xF4E9D8)
    }
}

impl StoryContent {
    /// Load and validate a story from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = Self::from_json(&text)?;
        tracing::info!(
            "Loaded story '{}' from {} ({} scenes)",
            content.title,
            path.display(),
            content.scenes.len()
        );
        Ok(content)
    }

    /// Parse and validate a story from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let content: StoryContent = serde_json::from_str(text)?;
        content.validate()?;
        Ok(content)
    }

    /// Check cross-references that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let total = self.scenes.len();
        if total == 0 {
            return Err(ContentError::Invalid("story has no scenes".into()));
        }

        let mut sink_ids = HashSet::new();
        for (index, scene) in self.scenes.iter().enumerate() {
            if let Some(next) = scene.next {
                if next >= total {
                    return Err(ContentError::Invalid(format!(
                        "scene {} button targets scene {} (only {} scenes)",
                        index, next, total
                    )));
                }
            }
            if let Some(script) = &scene.thought {
                if script.messages.is_empty() {
                    return Err(ContentError::Invalid(format!(
                        "scene {} has a thought script without messages",
                        index
                    )));
                }
                for id in [&script.bubble_id, &script.text_id, &script.image_id] {
                    if !sink_ids.insert(id.clone()) {
                        return Err(ContentError::Invalid(format!(
                            "stage element id '{}' used twice",
                            id
                        )));
                    }
                }
            }
            for slot in &scene.videos {
                if !sink_ids.insert(slot.id.clone()) {
                    return Err(ContentError::Invalid(format!(
                        "stage element id '{}' used twice",
                        slot.id
                    )));
                }
            }
        }

        if let Some(letter) = &self.letter {
            if letter.scene >= total || letter.next_scene >= total {
                return Err(ContentError::Invalid(format!(
                    "letter scenes {} → {} out of range",
                    letter.scene, letter.next_scene
                )));
            }
        }
        Ok(())
    }

    pub fn total_scenes(&self) -> usize {
        self.scenes.len()
    }

    pub fn scene(&self, index: SceneIndex) -> Option<&SceneConfig> {
        self.scenes.get(index)
    }

    /// Music track for a scene (None = silence)
    pub fn track_for(&self, index: SceneIndex) -> Option<&str> {
        self.scene(index).and_then(|s| s.music.as_deref())
    }

    pub fn thought_script(&self, index: SceneIndex) -> Option<&ThoughtScript> {
        self.scene(index).and_then(|s| s.thought.as_ref())
    }

    /// Indices of scenes where the guide overlay is visible
    pub fn guide_scenes(&self) -> Vec<SceneIndex> {
        self.scenes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.guide)
            .map(|(i, _)| i)
            .collect()
    }

    /// Built-in story used when no content file is given
    pub fn demo() -> Self {
        let script = |image: &str, delay: u64, n: usize, messages: &[&str]| ThoughtScript {
            guide_image: format!("guide/{}.png", image),
            messages: messages.iter().map(|m| m.to_string()).collect(),
            start_delay_ms: delay,
            bubble_id: format!("thought-bubble-{}", n),
            text_id: format!("thought-text-{}", n),
            image_id: format!("guide-image-{}", n),
        };

        let scenes = vec![
            SceneConfig {
                title: "A Letter for You".into(),
                music: Some("music/letter.ogg".into()),
                color: Some("#f4e9d8".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "Meet Your Little Guide".into(),
                guide: true,
                thought: Some(script("wave", 1000, 1, &[
                    "Hello there, welcome in!",
                    "I'm the little guide for this story.",
                    "I'll walk you through every page.",
                    "Let's start the journey...",
                ])),
                music: Some("music/journey.ogg".into()),
                color: Some("#e8f0e3".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "How It Began".into(),
                guide: true,
                thought: Some(script("think", 1500, 2, &[
                    "Some moments arrive quietly.",
                    "Nothing planned, nothing forced.",
                    "Take your time, we move on when you're ready.",
                ])),
                music: Some("music/journey.ogg".into()),
                color: Some("#e3ebf4".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "Things Worth Saying".into(),
                guide: true,
                thought: Some(script("smile", 1500, 3, &[
                    "Some words are meant to be simple.",
                    "Just take them as they are.",
                ])),
                music: Some("music/warm.ogg".into()),
                color: Some("#f4e3e8".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "A Wish for What's Ahead".into(),
                thought: Some(script("calm", 1500, 4, &[
                    "Comfort grows in small moments.",
                    "Take your time reading these...",
                ])),
                music: Some("music/warm.ogg".into()),
                color: Some("#f1ecd9".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "A Thought, in Bloom".into(),
                guide: true,
                thought: Some(script("point", 1500, 5, &[
                    "Look at these flowers blooming...",
                    "Each petal opens in its own time.",
                ])),
                decor: Some("flowers".into()),
                music: Some("music/bloom.ogg".into()),
                color: Some("#eaf4e3".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "Before We Continue".into(),
                thought: Some(script("hello", 1500, 6, &[
                    "We're almost at the end.",
                    "Something is waiting for you ahead...",
                    "See you next time!",
                ])),
                music: Some("music/bloom.ogg".into()),
                color: Some("#ece3f4".into()),
                ..SceneConfig::default()
            },
            SceneConfig {
                title: "Moments on Film".into(),
                videos: vec![VideoSlotConfig { id: "story-video-1".into(), source: None }],
                music: Some("music/finale.ogg".into()),
                next: Some(0),
                color: Some("#20242c".into()),
                ..SceneConfig::default()
            },
        ];

        Self {
            title: "Fabula demo".into(),
            scenes,
            default_track: Some("music/theme.ogg".into()),
            base_address: String::new(),
            letter: Some(LetterConfig { scene: 0, next_scene: 1 }),
            timings: Timings::default(),
        }
    }
}
