//! Stage renderer — draws the story's logical state into the 640×480
//! framebuffer with flat shapes.
//!
//! There is no font: text shows up as one small block per character, which
//! is enough to watch the typewriter at work. The full text goes into the
//! window title.

use fabula_common::{SceneIndex, StoryContent};

use crate::story::stage::{BubblePose, LetterView, Stage};

use super::{SCREEN_HEIGHT, SCREEN_WIDTH};

const BLACK: u32 = 0xFF000000;
const INK: u32 = 0xFF3A3040;
const PAPER: u32 = 0xFFFFFBF2;
const GUIDE: u32 = 0xFF7FB3D5;
const PLACEHOLDER: u32 = 0xFF55585F;
const MUSIC_ON: u32 = 0xFF6BBF59;
const MUSIC_OFF: u32 = 0xFF8A8A8A;

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;
const GLYPH_ADVANCE: i32 = 7;
const LINE_ADVANCE: i32 = 11;

/// Fill a rectangle, clipped to the framebuffer
pub fn draw_rect(fb: &mut [u32], x: i32, y: i32, w: i32, h: i32, color: u32) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(SCREEN_WIDTH as i32);
    let y1 = (y + h).min(SCREEN_HEIGHT as i32);
    for py in y0..y1 {
        let row = py as usize * SCREEN_WIDTH;
        for px in x0..x1 {
            fb[row + px as usize] = color;
        }
    }
}

pub fn draw_rect_outline(fb: &mut [u32], x: i32, y: i32, w: i32, h: i32, color: u32) {
    draw_rect(fb, x, y, w, 1, color);
    draw_rect(fb, x, y + h - 1, w, 1, color);
    draw_rect(fb, x, y, 1, h, color);
    draw_rect(fb, x + w - 1, y, 1, h, color);
}

/// Mix two ARGB colors; `t` = 0 gives `a`, 255 gives `b`
pub fn blend(a: u32, b: u32, t: u32) -> u32 {
    let t = t.min(255);
    let mix = |shift: u32| {
        let ca = (a >> shift) & 0xFF;
        let cb = (b >> shift) & 0xFF;
        ((ca * (255 - t) + cb * t) / 255) << shift
    };
    BLACK | mix(16) | mix(8) | mix(0)
}

/// Draw `text` as character blocks inside a box `width` pixels wide.
/// Returns the number of lines used.
pub fn draw_blocks(fb: &mut [u32], x: i32, y: i32, width: i32, text: &str, color: u32) -> i32 {
    let per_line = (width / GLYPH_ADVANCE).max(1);
    let mut col = 0;
    let mut line = 0;
    for ch in text.chars() {
        if col >= per_line {
            col = 0;
            line += 1;
        }
        if !ch.is_whitespace() {
            draw_rect(
                fb,
                x + col * GLYPH_ADVANCE,
                y + line * LINE_ADVANCE,
                GLYPH_W,
                GLYPH_H,
                color,
            );
        }
        col += 1;
    }
    if text.is_empty() {
        0
    } else {
        line + 1
    }
}

/// Scale the 640×480 framebuffer to any target size (nearest neighbor)
pub fn scale_to_size(src: &[u32], dst: &mut [u32], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        let sy = (dy * SCREEN_HEIGHT) / dst_h;
        let dst_row = dy * dst_w;
        let src_row = sy * SCREEN_WIDTH;
        for dx in 0..dst_w {
            let sx = (dx * SCREEN_WIDTH) / dst_w;
            dst[dst_row + dx] = src[src_row + sx];
        }
    }
}

/// Draw the whole stage for `current`
pub fn draw_stage(fb: &mut [u32], stage: &Stage, content: &StoryContent, current: SceneIndex) {
    let Some(scene) = content.scene(current) else {
        fb.fill(BLACK);
        return;
    };
    let view = stage.scenes.get(current).cloned().unwrap_or_default();

    // Between fade-out and activation the background sits half-dark
    let background = BLACK | scene.color_rgb();
    let background = if view.active {
        background
    } else {
        blend(background, BLACK, 128)
    };
    fb.fill(background);

    if let Some(letter) = &stage.letter {
        if content.letter.as_ref().is_some_and(|l| l.scene == current) {
            draw_letter(fb, letter);
        }
    }

    draw_videos(fb, stage, content, current);
    draw_decor(fb, stage, current);
    draw_guide(fb, stage);
    draw_thought(fb, stage, content, current);
    draw_music_toggle(fb, stage);
    draw_progress(fb, current, content.total_scenes());
}

fn draw_guide(fb: &mut [u32], stage: &Stage) {
    let Some(guide) = &stage.guide else {
        return;
    };
    if guide.hidden || !guide.visible {
        return;
    }
    let color = if guide.entering || guide.exiting {
        blend(GUIDE, PAPER, 128)
    } else {
        GUIDE
    };
    let (x, y) = (24, SCREEN_HEIGHT as i32 - 190);
    draw_rect(fb, x, y, 110, 150, color);
    draw_rect_outline(fb, x, y, 110, 150, INK);
    // Face
    draw_rect(fb, x + 30, y + 30, 10, 10, INK);
    draw_rect(fb, x + 70, y + 30, 10, 10, INK);
    draw_rect(fb, x + 35, y + 70, 40, 6, INK);
}

fn draw_thought(fb: &mut [u32], stage: &Stage, content: &StoryContent, current: SceneIndex) {
    let Some(script) = content.thought_script(current) else {
        return;
    };
    let Some(bubble) = stage.bubbles.get(&script.bubble_id) else {
        return;
    };
    if !bubble.visible {
        return;
    }

    let (x, y, w, h) = (150, SCREEN_HEIGHT as i32 - 250, 300, 90);
    match bubble.pose {
        BubblePose::Reset => draw_rect_outline(fb, x, y, w, h, blend(INK, PAPER, 160)),
        BubblePose::Shown => {
            draw_rect(fb, x, y, w, h, PAPER);
            draw_rect_outline(fb, x, y, w, h, INK);
        }
        BubblePose::Exiting => {
            draw_rect(fb, x, y - 8, w, h, blend(PAPER, BLACK, 40));
            draw_rect_outline(fb, x, y - 8, w, h, blend(INK, PAPER, 128));
        }
    }
    // Tail towards the guide
    draw_rect(fb, x - 14, y + h - 12, 10, 10, PAPER);

    if let Some(text) = stage.texts.get(&script.text_id) {
        if text.shown {
            let lines = draw_blocks(fb, x + 12, y + 12, w - 24, &text.text, INK);
            if text.typing {
                // Caret
                draw_rect(fb, x + w - 20, y + 12 + (lines.max(1) - 1) * LINE_ADVANCE, 2, GLYPH_H, INK);
            }
        }
    }
}

fn draw_videos(fb: &mut [u32], stage: &Stage, content: &StoryContent, current: SceneIndex) {
    let Some(scene) = content.scene(current) else {
        return;
    };
    for (i, slot) in scene.videos.iter().enumerate() {
        let (x, y) = (180 + i as i32 * 30, 60 + i as i32 * 30);
        let (w, h) = (320, 180);
        match stage.placeholder_shown(&slot.id) {
            Some(true) => {
                draw_rect(fb, x, y, w, h, PLACEHOLDER);
                for d in 0..h {
                    draw_rect(fb, x + d * w / h, y + d, 2, 1, MUSIC_OFF);
                    draw_rect(fb, x + w - d * w / h, y + d, 2, 1, MUSIC_OFF);
                }
            }
            Some(false) => draw_rect(fb, x, y, w, h, BLACK),
            None => {}
        }
    }
}

fn draw_decor(fb: &mut [u32], stage: &Stage, current: SceneIndex) {
    let Some(decor) = stage.decor.get(&current) else {
        return;
    };
    let petals = [0xFFE57373, 0xFFF06292, 0xFFFFB74D, 0xFFBA68C8, 0xFFFFF176];
    let base_y = SCREEN_HEIGHT as i32 - 60;
    for (i, color) in petals.iter().enumerate() {
        let x = 420 + i as i32 * 38;
        // Stem grows once the reveal is released
        let stem = if decor.not_loaded { 6 } else { 50 + (i as i32 % 2) * 14 };
        draw_rect(fb, x + 6, base_y - stem, 3, stem, 0xFF4E8C3A);
        if !decor.not_loaded {
            draw_rect(fb, x, base_y - stem - 14, 15, 15, *color);
        }
    }
}

fn draw_letter(fb: &mut [u32], letter: &LetterView) {
    let (cx, cy) = (SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);

    if !letter.paper_hidden {
        let paper = if letter.paper_dimmed {
            blend(PAPER, INK, 40)
        } else {
            PAPER
        };
        let height = if letter.paper_closing { 120 } else { 240 };
        draw_rect(fb, cx - 100, cy - height / 2, 200, height, paper);
        draw_blocks(fb, cx - 84, cy - height / 2 + 16, 168, "Dear reader, open me", INK);
    }

    if letter.envelope_visible {
        let envelope = if letter.envelope_fading {
            blend(0xFFE8D5B0, PAPER, 160)
        } else {
            0xFFE8D5B0
        };
        draw_rect(fb, cx - 110, cy - 60, 220, 120, envelope);
        draw_rect_outline(fb, cx - 110, cy - 60, 220, 120, INK);
        let flap_h = if letter.flap_closed { 60 } else { 20 };
        for d in 0..flap_h {
            let half = 110 * (flap_h - d) / flap_h.max(1);
            draw_rect(fb, cx - half, cy - 60 + d, half * 2, 1, blend(envelope, INK, 30));
        }
    }

    if letter.sending_visible {
        draw_blocks(fb, cx - 40, cy - 4, 120, "Sending...", INK);
    }
}

fn draw_music_toggle(fb: &mut [u32], stage: &Stage) {
    let Some(toggle) = &stage.music_toggle else {
        return;
    };
    if toggle.hidden {
        return;
    }
    let color = if toggle.playing { MUSIC_ON } else { MUSIC_OFF };
    draw_rect(fb, SCREEN_WIDTH as i32 - 36, 12, 24, 24, color);
    draw_rect_outline(fb, SCREEN_WIDTH as i32 - 36, 12, 24, 24, INK);
}

fn draw_progress(fb: &mut [u32], current: SceneIndex, total: usize) {
    let y = SCREEN_HEIGHT as i32 - 16;
    let start = (SCREEN_WIDTH as i32 - total as i32 * 14) / 2;
    for i in 0..total {
        let x = start + i as i32 * 14;
        if i == current {
            draw_rect(fb, x, y, 8, 8, INK);
        } else {
            draw_rect_outline(fb, x, y, 8, 8, INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framebuffer() -> Vec<u32> {
        vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT]
    }

    #[test]
    fn rect_is_clipped() {
        let mut fb = framebuffer();
        draw_rect(&mut fb, -5, -5, 10, 10, 0xFFFFFFFF);
        assert_eq!(fb[0], 0xFFFFFFFF);
        assert_eq!(fb[4 * SCREEN_WIDTH + 4], 0xFFFFFFFF);
        assert_eq!(fb[5 * SCREEN_WIDTH + 5], 0);

        draw_rect(&mut fb, SCREEN_WIDTH as i32 - 2, SCREEN_HEIGHT as i32 - 2, 50, 50, 1);
        assert_eq!(fb[SCREEN_WIDTH * SCREEN_HEIGHT - 1], 1);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 255), 0xFFFFFFFF);
        assert_eq!(blend(0xFF000000, 0xFF0000FE, 128), 0xFF00007F);
    }

    #[test]
    fn blocks_wrap_and_skip_spaces() {
        let mut fb = framebuffer();
        assert_eq!(draw_blocks(&mut fb, 0, 0, 3 * GLYPH_ADVANCE, "ab cd", 7), 2);
        assert_eq!(fb[0], 7);
        // The space leaves its cell empty
        assert_eq!(fb[(2 * GLYPH_ADVANCE) as usize], 0);
        assert_eq!(fb[LINE_ADVANCE as usize * SCREEN_WIDTH], 7);
        assert_eq!(draw_blocks(&mut fb, 0, 0, 100, "", 7), 0);
    }

    #[test]
    fn scaling_doubles_pixels() {
        let mut src = framebuffer();
        src[0] = 9;
        src[1] = 3;
        let (w, h) = (SCREEN_WIDTH * 2, SCREEN_HEIGHT * 2);
        let mut dst = vec![0u32; w * h];
        scale_to_size(&src, &mut dst, w, h);
        assert_eq!(&dst[0..4], &[9, 9, 3, 3]);
        assert_eq!(dst[w], 9);
    }

    #[test]
    fn draws_every_demo_scene() {
        let content = StoryContent::demo();
        let mut stage = Stage::for_story(&content);
        for view in stage.scenes.iter_mut() {
            view.active = true;
        }
        let mut fb = framebuffer();
        for scene in 0..content.total_scenes() {
            draw_stage(&mut fb, &stage, &content, scene);
        }
        draw_stage(&mut fb, &stage, &content, 99);
        assert!(fb.iter().all(|&p| p == BLACK));
    }
}
