/// Fabula — scene-by-scene story player
///
/// Architecture:
///   story/  — scene sequencing, guide thoughts, music, video coordination
///   engine/ — minifb window, renderer, rodio sound engine
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use fabula_common::{PlayerSettings, StoryContent};
use fabula_media::{AudioChannel, MemoryChannel};
use fabula_player::engine::{self, sound_engine::SoundEngine};
use fabula_player::story::Presentation;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fabula", version)]
#[command(about = "Play an interactive story scene by scene")]
struct Args {
    /// Story content file (JSON). Plays the built-in demo when omitted.
    story: Option<PathBuf>,

    /// Player settings (TOML)
    #[arg(long, default_value = "fabula.toml")]
    settings: PathBuf,

    /// Run without an audio device
    #[arg(long)]
    no_audio: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Write the built-in demo story as JSON to this path and exit
    #[arg(long)]
    export_demo: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = PlayerSettings::load_or_default(&args.settings)
        .with_context(|| format!("Loading settings from {}", args.settings.display()))?;
    let level = args.log_level.as_deref().unwrap_or(&settings.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("fabula={}", level).parse()?)
                .add_directive(format!("fabula_player={}", level).parse()?)
                .add_directive(format!("fabula_common={}", level).parse()?)
                .add_directive(format!("fabula_media={}", level).parse()?),
        )
        .init();

    tracing::info!("Fabula Player v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &args.export_demo {
        let json = serde_json::to_string_pretty(&StoryContent::demo())?;
        std::fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;
        tracing::info!("Demo story written to {}", path.display());
        return Ok(());
    }

    let content = match &args.story {
        Some(path) => StoryContent::from_path(path)
            .with_context(|| format!("Loading story from {}", path.display()))?,
        None => {
            tracing::info!("No story given, playing the built-in demo");
            StoryContent::demo()
        }
    };
    tracing::info!(
        "Story '{}': {} scenes, guide on {:?}",
        content.title,
        content.total_scenes(),
        content.guide_scenes()
    );

    let channel = open_audio(&args, &settings);
    let story = Presentation::new(content, channel, !settings.start_muted);
    engine::run(story, &settings)
}

/// Real output device when available, silent channel otherwise
fn open_audio(args: &Args, settings: &PlayerSettings) -> Box<dyn AudioChannel> {
    if args.no_audio {
        tracing::info!("Audio disabled");
        return Box::new(MemoryChannel::new());
    }

    let root = audio_root(args.story.as_deref(), settings);
    match SoundEngine::new(root) {
        Some(engine) => Box::new(engine),
        None => {
            tracing::warn!("Continuing without sound");
            Box::new(MemoryChannel::new())
        }
    }
}

/// Tracks resolve against the settings' audio root, else the story's folder
fn audio_root(story: Option<&Path>, settings: &PlayerSettings) -> PathBuf {
    if let Some(root) = &settings.audio_root {
        return root.clone();
    }
    story
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
