//! Player engine — minifb window, input mapping and the frame loop.
//!
//! Uses a 640×480 pixel framebuffer with 32-bit ARGB pixels. The story core
//! runs on virtual time; each frame advances it by one frame interval.

pub mod render;
pub mod sound_engine;

use anyhow::Result;
use fabula_common::PlayerSettings;
use fabula_media::AudioChannel;
use minifb::{Key, KeyRepeat, MouseButton, Window, WindowOptions};

use crate::story::{Command, Presentation, StoryNotice};

pub const SCREEN_WIDTH: usize = 640;
pub const SCREEN_HEIGHT: usize = 480;
const FPS: u64 = 30;
const FRAME_MS: u64 = 1000 / FPS;

/// Map a key press to a story command
pub fn key_to_command(key: Key, on_letter_scene: bool) -> Option<Command> {
    let command = match key {
        Key::Right | Key::Down | Key::PageDown => Command::Next,
        Key::Left | Key::Up | Key::PageUp => Command::Previous,
        Key::Escape | Key::Home => Command::First,
        Key::Enter | Key::Space => click_command(on_letter_scene),
        Key::M => Command::ToggleMusic,
        _ => Command::GoTo(digit(key)?),
    };
    Some(command)
}

/// A click (or Enter) opens the letter on the landing scene, otherwise it
/// presses the scene's continue button
pub fn click_command(on_letter_scene: bool) -> Command {
    if on_letter_scene {
        Command::OpenLetter
    } else {
        Command::SceneButton
    }
}

fn digit(key: Key) -> Option<usize> {
    let n = match key {
        Key::Key0 | Key::NumPad0 => 0,
        Key::Key1 | Key::NumPad1 => 1,
        Key::Key2 | Key::NumPad2 => 2,
        Key::Key3 | Key::NumPad3 => 3,
        Key::Key4 | Key::NumPad4 => 4,
        Key::Key5 | Key::NumPad5 => 5,
        Key::Key6 | Key::NumPad6 => 6,
        Key::Key7 | Key::NumPad7 => 7,
        Key::Key8 | Key::NumPad8 => 8,
        Key::Key9 | Key::NumPad9 => 9,
        _ => return None,
    };
    Some(n)
}

/// Window title: scene position, title, music state and the typed thought
pub fn window_title<A: AudioChannel>(story: &Presentation<A>) -> String {
    let current = story.current_scene();
    let scene_title = story
        .content()
        .scene(current)
        .map(|s| s.title.as_str())
        .unwrap_or("-");
    let thought = story
        .content()
        .thought_script(current)
        .and_then(|script| story.stage().text(&script.text_id))
        .filter(|t| !t.is_empty())
        .unwrap_or("…");
    let music = if story.audio().is_playing() { "♪" } else { "-" };

    format!(
        "{} – {}/{} {} | {} | {}",
        story.content().title,
        current + 1,
        story.total_scenes(),
        scene_title,
        music,
        thought
    )
}

fn log_notice(notice: &StoryNotice) {
    match notice {
        StoryNotice::Navigated { from, to } => tracing::debug!("Navigated {} → {}", from, to),
        StoryNotice::SceneActivated(scene) => tracing::debug!("Scene {} active", scene),
        StoryNotice::ThoughtFinished { message } => tracing::debug!("Thought done: {}", message),
        StoryNotice::ThoughtCycleComplete(scene) => {
            tracing::info!("Guide finished talking on scene {}", scene)
        }
    }
}

/// Run the player until the window closes
pub fn run<A: AudioChannel>(mut story: Presentation<A>, settings: &PlayerSettings) -> Result<()> {
    let scale = settings.window_scale.clamp(1, 4);
    let mut fullscreen = false;
    let mut prev_mouse_down = false;
    let mut frame_count: u64 = 0;

    story.start();

    tracing::info!("Engine initialized, entering frame loop");
    tracing::info!("Controls: ←/→ scene | Esc first | 0-9 jump | Enter/click continue | M music | F11 fullscreen");

    // Outer loop: window (re)creation on fullscreen toggle
    loop {
        let (win_w, win_h) = if fullscreen {
            (1920usize, 1080usize)
        } else {
            (SCREEN_WIDTH * scale, SCREEN_HEIGHT * scale)
        };

        let options = WindowOptions {
            resize: !fullscreen,
            borderless: fullscreen,
            scale_mode: minifb::ScaleMode::AspectRatioStretch,
            ..Default::default()
        };

        let mut window = Window::new("Fabula", win_w, win_h, options)
            .map_err(|e| anyhow::anyhow!("Window creation failed: {}", e))?;
        window.set_target_fps(FPS as usize);

        let mut framebuffer = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
        let mut out_w = win_w;
        let mut out_h = win_h;
        let mut scaled_buf = vec![0u32; out_w * out_h];
        let mut toggle_fs = false;

        while window.is_open() {
            let (actual_w, actual_h) = window.get_size();
            if actual_w > 0 && actual_h > 0 && (actual_w != out_w || actual_h != out_h) {
                out_w = actual_w;
                out_h = actual_h;
                scaled_buf.resize(out_w * out_h, 0);
            }

            if window.is_key_pressed(Key::F11, KeyRepeat::No) {
                toggle_fs = true;
                break;
            }

            let mouse_down = window.get_mouse_down(MouseButton::Left);
            if mouse_down && !prev_mouse_down {
                story.apply(click_command(story.on_letter_scene()));
            }
            prev_mouse_down = mouse_down;

            for key in window.get_keys_pressed(KeyRepeat::No) {
                if let Some(command) = key_to_command(key, story.on_letter_scene()) {
                    story.apply(command);
                }
            }

            for notice in story.update(FRAME_MS) {
                log_notice(&notice);
            }

            render::draw_stage(
                &mut framebuffer,
                story.stage(),
                story.content(),
                story.current_scene(),
            );

            frame_count += 1;
            if frame_count % 5 == 0 {
                window.set_title(&window_title(&story));
            }

            render::scale_to_size(&framebuffer, &mut scaled_buf, out_w, out_h);
            window
                .update_with_buffer(&scaled_buf, out_w, out_h)
                .map_err(|e| anyhow::anyhow!("Display error: {}", e))?;
        }

        if toggle_fs {
            fullscreen = !fullscreen;
            tracing::info!("Fullscreen → {}", if fullscreen { "ON" } else { "OFF" });
            continue;
        }

        break; // Window was closed
    }

    tracing::info!("Engine shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_common::StoryContent;
    use fabula_media::MemoryChannel;

    #[test]
    fn navigation_keys() {
        assert_eq!(key_to_command(Key::Right, false), Some(Command::Next));
        assert_eq!(key_to_command(Key::Down, false), Some(Command::Next));
        assert_eq!(key_to_command(Key::Left, false), Some(Command::Previous));
        assert_eq!(key_to_command(Key::Up, false), Some(Command::Previous));
        assert_eq!(key_to_command(Key::Escape, false), Some(Command::First));
        assert_eq!(key_to_command(Key::M, false), Some(Command::ToggleMusic));
        assert_eq!(key_to_command(Key::Key4, false), Some(Command::GoTo(4)));
        assert_eq!(key_to_command(Key::NumPad0, false), Some(Command::GoTo(0)));
        assert_eq!(key_to_command(Key::Q, false), None);
    }

    #[test]
    fn enter_depends_on_scene() {
        assert_eq!(key_to_command(Key::Enter, true), Some(Command::OpenLetter));
        assert_eq!(key_to_command(Key::Enter, false), Some(Command::SceneButton));
    }

    #[test]
    fn title_shows_typed_thought() {
        let mut story = Presentation::new(StoryContent::demo(), MemoryChannel::new(), true);
        story.start();
        story.update(FRAME_MS);
        let title = window_title(&story);
        assert!(title.starts_with("Fabula demo – 1/8 A Letter for You"));

        story.go_to_scene(1);
        // 1000 delay + 100 settle + 50 enter + 400 delay + 5 chars
        story.update(1550 + 5 * 60);
        assert!(window_title(&story).ends_with("| Hello"));
    }
}
