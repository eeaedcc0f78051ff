//! Text measurement and rasterization.
//!
//! Wrapping is ours — the greedy algorithm below is part of the export
//! contract and must match the preview exactly — while glyph shaping and
//! coverage come from cosmic-text. The rasterizer owns the font system and
//! glyph cache for one session; it is part of [`crate::RenderContext`], not
//! a global.

use std::path::Path;

use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache, Wrap};
use framebooth_layout_model::Color;
use image::RgbaImage;

use crate::compositor::blend_pixel;

/// Session-scoped font system and glyph cache.
pub struct TextRasterizer {
    font_system: FontSystem,
    cache: SwashCache,
}

impl TextRasterizer {
    /// Create a rasterizer backed by the system font database, optionally
    /// extended with fonts from `fonts_dir`.
    pub fn new(fonts_dir: Option<&Path>) -> Self {
        let mut font_system = FontSystem::new();
        if let Some(dir) = fonts_dir {
            font_system.db_mut().load_fonts_dir(dir);
        }
        Self {
            font_system,
            cache: SwashCache::new(),
        }
    }

    /// Advance width of a single unwrapped line at `font_size`.
    pub fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let metrics = Metrics::new(font_size, font_size);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_wrap(&mut self.font_system, Wrap::None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0, f32::max)
    }

    /// Rasterize one line of text onto `canvas`.
    ///
    /// `origin` is the top-left of the line box; pixels outside `clip`
    /// (x, y, width, height) are discarded.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &mut self,
        canvas: &mut RgbaImage,
        text: &str,
        origin_x: i32,
        origin_y: i32,
        font_size: f32,
        line_height: f32,
        color: Color,
        clip: (i32, i32, u32, u32),
    ) {
        if text.is_empty() {
            return;
        }
        let metrics = Metrics::new(font_size, line_height);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_wrap(&mut self.font_system, Wrap::None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let text_color = cosmic_text::Color::rgba(color.r, color.g, color.b, color.a);
        let (clip_x, clip_y, clip_w, clip_h) = clip;
        let (canvas_w, canvas_h) = canvas.dimensions();

        buffer.draw(
            &mut self.font_system,
            &mut self.cache,
            text_color,
            |x, y, w, h, pixel_color| {
                let alpha = pixel_color.a();
                if alpha == 0 {
                    return;
                }
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let px = origin_x + x + dx;
                        let py = origin_y + y + dy;
                        if px < clip_x
                            || py < clip_y
                            || px >= clip_x + clip_w as i32
                            || py >= clip_y + clip_h as i32
                        {
                            continue;
                        }
                        if px < 0 || py < 0 || px >= canvas_w as i32 || py >= canvas_h as i32 {
                            continue;
                        }
                        blend_pixel(
                            canvas,
                            px as u32,
                            py as u32,
                            [
                                pixel_color.r(),
                                pixel_color.g(),
                                pixel_color.b(),
                                alpha,
                            ],
                        );
                    }
                }
            },
        );
    }
}

/// Greedy word-wrap.
///
/// Lines extend while they still fit within `max_width`; explicit `\n`
/// breaks always force a new line. A single word wider than the limit gets
/// its own line rather than being broken mid-word. `measure` returns the
/// advance width of a candidate line.
pub fn wrap_text<F>(content: &str, max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    let mut lines = Vec::new();

    for raw_line in content.split('\n') {
        let words: Vec<&str> = raw_line.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            if current.is_empty() {
                current = word.to_string();
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        lines.push(current);
    }

    lines
}
