//! Layer compositing onto the canonical surface.
//!
//! One compose pass paints a normalized layout plus resolved media into a
//! single RGBA canvas. The still export runs it once; the video synthesizer
//! runs it per frame tick with each slot's current clip frame. The pass owns
//! the canvas exclusively while it runs.
//!
//! Paint order: background photos first, then everything else by z-index
//! ascending with the element list order as the stable tie-break. Overlay
//! uploads are floor-clamped into a high z band (and photo slots capped
//! below it) so decorative frames always paint above captured media, no
//! matter what the layout authored.

use std::collections::HashMap;

use framebooth_common::BoothResult;
use framebooth_compose_core::apply_filters;
use framebooth_layout_model::{
    Color, Element, FilterSettings, FitMode, Geometry, LayoutDefinition, ShapeKind, SlotShape,
    TextAlign, Transform, VerticalAlign,
};
use image::{Rgba, RgbaImage};

use crate::assets::resolve_asset;
use crate::context::RenderContext;
use crate::text::wrap_text;

/// Z band overlays are lifted into; photo slots are capped just below it.
pub const OVERLAY_Z_FLOOR: i32 = 10_000;

/// Inputs for one compose pass. Geometry must already be canonical pixels
/// and `transforms` must be a per-tick snapshot, never live shared state.
pub struct ComposePass<'a> {
    pub layout: &'a LayoutDefinition,

    /// Resolved raster per photo slot, in slot order. `None` paints the
    /// neutral placeholder.
    pub slot_images: &'a [Option<&'a RgbaImage>],

    pub filters: &'a FilterSettings,

    /// Per-slot zoom/pan snapshots keyed by element id.
    pub transforms: &'a HashMap<String, Transform>,
}

/// Paint every layout element in z order onto a fresh canvas.
pub fn compose_canvas(ctx: &mut RenderContext, pass: &ComposePass<'_>) -> BoothResult<RgbaImage> {
    let layout = pass.layout;
    let mut canvas = RgbaImage::from_pixel(
        layout.canvas_width,
        layout.canvas_height,
        layout.background.to_pixel(),
    );

    // (paint key, original index); stable sort keeps authored order on ties.
    let mut order: Vec<(i64, usize)> = layout
        .elements
        .iter()
        .enumerate()
        .map(|(index, element)| (paint_key(element), index))
        .collect();
    order.sort_by_key(|(key, _)| *key);

    let mut slot_ordinal = 0usize;
    let mut slot_ordinals: HashMap<usize, usize> = HashMap::new();
    for (index, element) in layout.elements.iter().enumerate() {
        if element.is_photo_slot() {
            slot_ordinals.insert(index, slot_ordinal);
            slot_ordinal += 1;
        }
    }

    for (_, index) in order {
        let element = &layout.elements[index];
        match element {
            Element::PhotoSlot { id, geometry, shape, .. } => {
                let Some(geometry) = geometry else { continue };
                let ordinal = slot_ordinals[&index];
                let source = pass.slot_images.get(ordinal).copied().flatten();
                let transform = pass
                    .transforms
                    .get(id.as_str())
                    .copied()
                    .unwrap_or_default()
                    .clamped();
                paint_photo_slot(
                    &mut canvas,
                    geometry,
                    source,
                    *shape,
                    transform,
                    pass.filters,
                );
            }
            Element::OverlayUpload {
                id,
                geometry,
                asset,
                fit,
                ..
            } => {
                let Some(geometry) = geometry else { continue };
                match resolve_asset(ctx, asset, None) {
                    Ok(source) => paint_overlay(&mut canvas, geometry, &source, *fit),
                    Err(err) => {
                        tracing::warn!(element = %id, error = %err, "overlay asset unavailable, skipping element");
                    }
                }
            }
            Element::Text {
                geometry,
                content,
                font_size,
                color,
                align,
                valign,
                line_height,
                padding,
                ..
            } => {
                let Some(geometry) = geometry else { continue };
                paint_text(
                    ctx,
                    &mut canvas,
                    geometry,
                    content,
                    *font_size,
                    *color,
                    *align,
                    *valign,
                    *line_height,
                    *padding,
                );
            }
            Element::Shape {
                geometry,
                kind,
                color,
                opacity,
                ..
            } => {
                let Some(geometry) = geometry else { continue };
                paint_shape(&mut canvas, geometry, *kind, *color, *opacity);
            }
            Element::BackgroundPhoto { id, geometry, asset, .. } => {
                let full = Geometry::new(
                    0.0,
                    0.0,
                    layout.canvas_width as f64,
                    layout.canvas_height as f64,
                );
                let geometry = (*geometry).unwrap_or(full);
                match resolve_asset(ctx, asset, None) {
                    Ok(source) => {
                        let tile =
                            sample_cover(&source, tile_size(&geometry), Transform::IDENTITY);
                        blit_tile(&mut canvas, &tile, &geometry);
                    }
                    Err(err) => {
                        tracing::warn!(element = %id, error = %err, "background asset unavailable, leaving backdrop fill");
                    }
                }
            }
        }
    }

    Ok(canvas)
}

/// Crop a finished canvas to `aspect` (width / height), keeping the largest
/// centered sub-rectangle. Used when an overlay graphic's own aspect ratio
/// differs from the canvas: the artifact fits the graphic and the remainder
/// is cropped away.
pub fn crop_to_aspect(canvas: &RgbaImage, aspect: f64) -> RgbaImage {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 || !aspect.is_finite() || aspect <= 0.0 {
        return canvas.clone();
    }

    let canvas_aspect = w as f64 / h as f64;
    let (crop_w, crop_h) = if aspect < canvas_aspect {
        // Fit to height, trim the sides.
        (((h as f64) * aspect).round() as u32, h)
    } else {
        // Fit to width, trim top and bottom.
        (w, ((w as f64) / aspect).round() as u32)
    };
    let crop_w = crop_w.clamp(1, w);
    let crop_h = crop_h.clamp(1, h);
    let x = (w - crop_w) / 2;
    let y = (h - crop_h) / 2;

    image::imageops::crop_imm(canvas, x, y, crop_w, crop_h).to_image()
}

fn paint_key(element: &Element) -> i64 {
    match element {
        // Background photos always paint first, whatever they authored.
        Element::BackgroundPhoto { .. } => i64::MIN,
        Element::OverlayUpload { z_index, .. } => (*z_index).max(OVERLAY_Z_FLOOR) as i64,
        Element::PhotoSlot { z_index, .. } => (*z_index).min(OVERLAY_Z_FLOOR - 1) as i64,
        Element::Text { z_index, .. } | Element::Shape { z_index, .. } => *z_index as i64,
    }
}

fn tile_size(geometry: &Geometry) -> (u32, u32) {
    (
        geometry.width.max(1.0) as u32,
        geometry.height.max(1.0) as u32,
    )
}

fn paint_photo_slot(
    canvas: &mut RgbaImage,
    geometry: &Geometry,
    source: Option<&RgbaImage>,
    shape: SlotShape,
    transform: Transform,
    filters: &FilterSettings,
) {
    let (tile_w, tile_h) = tile_size(geometry);

    let mut tile = match source {
        Some(source) => {
            let mut tile = sample_cover(source, (tile_w, tile_h), transform);
            apply_filters(&mut tile, filters);
            tile
        }
        // Unresolved slot: neutral placeholder, never an error.
        None => RgbaImage::from_pixel(tile_w, tile_h, Color::PLACEHOLDER.to_pixel()),
    };

    let coverage: Box<dyn Fn(f64, f64) -> f64> = match shape {
        SlotShape::Rounded { radius } => {
            let (w, h) = (tile_w as f64, tile_h as f64);
            Box::new(move |px, py| rounded_rect_coverage(w, h, radius, px, py))
        }
        SlotShape::Circle => {
            let (w, h) = (tile_w as f64, tile_h as f64);
            Box::new(move |px, py| ellipse_coverage(w, h, px, py))
        }
    };

    apply_coverage(&mut tile, coverage.as_ref());
    blit_tile(canvas, &tile, geometry);
}

fn paint_overlay(canvas: &mut RgbaImage, geometry: &Geometry, source: &RgbaImage, fit: FitMode) {
    let size = tile_size(geometry);
    let tile = match fit {
        FitMode::Cover => sample_cover(source, size, Transform::IDENTITY),
        FitMode::Contain => sample_contain(source, size),
    };
    blit_tile(canvas, &tile, geometry);
}

#[allow(clippy::too_many_arguments)]
fn paint_text(
    ctx: &mut RenderContext,
    canvas: &mut RgbaImage,
    geometry: &Geometry,
    content: &str,
    font_size: f64,
    color: Color,
    align: TextAlign,
    valign: VerticalAlign,
    line_height: f64,
    padding: f64,
) {
    let (tile_w, tile_h) = tile_size(geometry);
    let font_size = font_size as f32;
    let line_height_px = (font_size as f64 * line_height) as f32;
    let wrap_width = (tile_w as f64 - 2.0 * padding).max(1.0) as f32;

    let text = ctx.text_mut();
    let lines = wrap_text(content, wrap_width, |candidate| {
        text.measure_width(candidate, font_size)
    });

    let block_height = lines.len() as f32 * line_height_px;
    let top = match valign {
        VerticalAlign::Top => 0.0,
        VerticalAlign::Middle => (tile_h as f32 - block_height) / 2.0,
        VerticalAlign::Bottom => tile_h as f32 - block_height,
    };

    let mut tile = RgbaImage::new(tile_w, tile_h);
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_width = ctx.text_mut().measure_width(line, font_size);
        let x = match align {
            TextAlign::Left => padding as f32,
            TextAlign::Center => (tile_w as f32 - line_width) / 2.0,
            TextAlign::Right => tile_w as f32 - padding as f32 - line_width,
        };
        let y = top + i as f32 * line_height_px;
        ctx.text_mut().draw_line(
            &mut tile,
            line,
            x.round() as i32,
            y.round() as i32,
            font_size,
            line_height_px,
            color,
            (0, 0, tile_w, tile_h),
        );
    }

    blit_tile(canvas, &tile, geometry);
}

fn paint_shape(
    canvas: &mut RgbaImage,
    geometry: &Geometry,
    kind: ShapeKind,
    color: Color,
    opacity: f64,
) {
    let (tile_w, tile_h) = tile_size(geometry);
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    let fill = Rgba([color.r, color.g, color.b, alpha]);
    let mut tile = RgbaImage::from_pixel(tile_w, tile_h, fill);

    let (w, h) = (tile_w as f64, tile_h as f64);
    let coverage: Box<dyn Fn(f64, f64) -> f64> = match kind {
        ShapeKind::Rounded { radius } => {
            Box::new(move |px, py| rounded_rect_coverage(w, h, radius, px, py))
        }
        // Filled circle: diameter is min(width, height), centered.
        ShapeKind::Circle => Box::new(move |px, py| circle_coverage(w, h, px, py)),
    };

    apply_coverage(&mut tile, coverage.as_ref());
    blit_tile(canvas, &tile, geometry);
}

/// Multiply tile alpha by a coverage function evaluated at pixel centers.
fn apply_coverage(tile: &mut RgbaImage, coverage: &dyn Fn(f64, f64) -> f64) {
    for (x, y, pixel) in tile.enumerate_pixels_mut() {
        let c = coverage(x as f64 + 0.5, y as f64 + 0.5);
        if c >= 1.0 {
            continue;
        }
        pixel.0[3] = (pixel.0[3] as f64 * c.max(0.0)).round() as u8;
    }
}

/// Sample `source` into an `out`-sized tile with cover semantics:
/// aspect-fill, centered, then adjusted by the slot transform. Zoom narrows
/// the sampled window, pan offsets it, and the window is re-clamped into
/// the source bounds afterwards.
pub fn sample_cover(
    source: &RgbaImage,
    out: (u32, u32),
    transform: Transform,
) -> RgbaImage {
    let (out_w, out_h) = (out.0.max(1), out.1.max(1));
    let (src_w, src_h) = source.dimensions();
    let (src_w_f, src_h_f) = (src_w as f64, src_h as f64);
    let out_aspect = out_w as f64 / out_h as f64;
    let src_aspect = src_w_f / src_h_f;

    // Base cover window: the largest centered source rect with the
    // destination aspect.
    let (mut win_w, mut win_h) = if src_aspect > out_aspect {
        (src_h_f * out_aspect, src_h_f)
    } else {
        (src_w_f, src_w_f / out_aspect)
    };

    let transform = transform.clamped();
    win_w /= transform.scale;
    win_h /= transform.scale;

    let mut win_x = (src_w_f - win_w) / 2.0 + transform.pan_x * win_w;
    let mut win_y = (src_h_f - win_h) / 2.0 + transform.pan_y * win_h;

    win_x = win_x.clamp(0.0, (src_w_f - win_w).max(0.0));
    win_y = win_y.clamp(0.0, (src_h_f - win_h).max(0.0));

    let mut tile = RgbaImage::new(out_w, out_h);
    for (x, y, pixel) in tile.enumerate_pixels_mut() {
        let sx = win_x + (x as f64 + 0.5) / out_w as f64 * win_w;
        let sy = win_y + (y as f64 + 0.5) / out_h as f64 * win_h;
        *pixel = bilinear(source, sx as f32, sy as f32);
    }
    tile
}

/// Sample `source` into an `out`-sized tile with contain semantics:
/// aspect-fit, centered, transparent bands where the source does not reach.
pub fn sample_contain(source: &RgbaImage, out: (u32, u32)) -> RgbaImage {
    let (out_w, out_h) = (out.0.max(1), out.1.max(1));
    let (src_w, src_h) = source.dimensions();
    let scale = (out_w as f64 / src_w as f64).min(out_h as f64 / src_h as f64);
    let fit_w = (src_w as f64 * scale).round().max(1.0) as u32;
    let fit_h = (src_h as f64 * scale).round().max(1.0) as u32;
    let offset_x = (out_w - fit_w.min(out_w)) / 2;
    let offset_y = (out_h - fit_h.min(out_h)) / 2;

    let mut tile = RgbaImage::new(out_w, out_h);
    for y in 0..fit_h.min(out_h) {
        for x in 0..fit_w.min(out_w) {
            let sx = (x as f64 + 0.5) / scale;
            let sy = (y as f64 + 0.5) / scale;
            let pixel = bilinear(source, sx as f32, sy as f32);
            tile.put_pixel(offset_x + x, offset_y + y, pixel);
        }
    }
    tile
}

/// Paint a tile onto the canvas at its geometry, honoring rotation.
///
/// Clip coverage is already baked into the tile alpha, so the rotated path
/// can bilinear-sample the tile directly.
fn blit_tile(canvas: &mut RgbaImage, tile: &RgbaImage, geometry: &Geometry) {
    let origin_x = geometry.x.round() as i64;
    let origin_y = geometry.y.round() as i64;
    let (tile_w, tile_h) = tile.dimensions();
    let (canvas_w, canvas_h) = canvas.dimensions();

    let rotation = geometry.rotation.rem_euclid(360.0);
    if rotation.abs() < 1e-6 {
        for (tx, ty, pixel) in tile.enumerate_pixels() {
            if pixel.0[3] == 0 {
                continue;
            }
            let cx = origin_x + tx as i64;
            let cy = origin_y + ty as i64;
            if cx < 0 || cy < 0 || cx >= canvas_w as i64 || cy >= canvas_h as i64 {
                continue;
            }
            blend_pixel(canvas, cx as u32, cy as u32, pixel.0);
        }
        return;
    }

    // Rotated path: inverse-map canvas pixels in the rotated bounding box
    // back into tile space and bilinear-sample.
    let theta = rotation.to_radians();
    let (sin, cos) = theta.sin_cos();
    let center_x = origin_x as f64 + tile_w as f64 / 2.0;
    let center_y = origin_y as f64 + tile_h as f64 / 2.0;

    let half_w = tile_w as f64 / 2.0;
    let half_h = tile_h as f64 / 2.0;
    let reach_x = half_w * cos.abs() + half_h * sin.abs();
    let reach_y = half_w * sin.abs() + half_h * cos.abs();

    let min_x = ((center_x - reach_x).floor() as i64).max(0);
    let max_x = ((center_x + reach_x).ceil() as i64).min(canvas_w as i64 - 1);
    let min_y = ((center_y - reach_y).floor() as i64).max(0);
    let max_y = ((center_y + reach_y).ceil() as i64).min(canvas_h as i64 - 1);

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            let dx = cx as f64 + 0.5 - center_x;
            let dy = cy as f64 + 0.5 - center_y;
            // Rotate back by -theta.
            let tx = dx * cos + dy * sin + half_w;
            let ty = -dx * sin + dy * cos + half_h;
            if tx < 0.0 || ty < 0.0 || tx >= tile_w as f64 || ty >= tile_h as f64 {
                continue;
            }
            let rgba = bilinear(tile, tx as f32, ty as f32).0;
            if rgba[3] == 0 {
                continue;
            }
            blend_pixel(canvas, cx as u32, cy as u32, rgba);
        }
    }
}

/// Bilinear sample with edge clamping.
fn bilinear(source: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (w, h) = source.dimensions();
    let fx = (x - 0.5).clamp(0.0, w as f32 - 1.0);
    let fy = (y - 0.5).clamp(0.0, h as f32 - 1.0);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let p00 = source.get_pixel(x0, y0).0;
    let p10 = source.get_pixel(x1, y0).0;
    let p01 = source.get_pixel(x0, y1).0;
    let p11 = source.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round() as u8;
    }
    Rgba(out)
}

/// Source-over blend of a straight-alpha RGBA value onto the canvas.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, src: [u8; 4]) {
    let src_a = src[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x, y);
    if src_a >= 1.0 {
        dst.0 = src;
        return;
    }
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        dst.0 = [0, 0, 0, 0];
        return;
    }
    for c in 0..3 {
        let blended =
            (src[c] as f32 * src_a + dst.0[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst.0[c] = blended.round() as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

fn rounded_rect_coverage(w: f64, h: f64, radius: f64, px: f64, py: f64) -> f64 {
    let radius = radius.clamp(0.0, w.min(h) / 2.0);
    let qx = (px - w / 2.0).abs() - (w / 2.0 - radius);
    let qy = (py - h / 2.0).abs() - (h / 2.0 - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    let dist = outside + inside - radius;
    (0.5 - dist).clamp(0.0, 1.0)
}

fn ellipse_coverage(w: f64, h: f64, px: f64, py: f64) -> f64 {
    let rx = w / 2.0;
    let ry = h / 2.0;
    let nx = (px - rx) / rx;
    let ny = (py - ry) / ry;
    let radial = (nx * nx + ny * ny).sqrt();
    let edge_distance = (radial - 1.0) * rx.min(ry);
    (0.5 - edge_distance).clamp(0.0, 1.0)
}

fn circle_coverage(w: f64, h: f64, px: f64, py: f64) -> f64 {
    let radius = w.min(h) / 2.0;
    let dx = px - w / 2.0;
    let dy = py - h / 2.0;
    let dist = (dx * dx + dy * dy).sqrt() - radius;
    (0.5 - dist).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use framebooth_common::ExportDefaults;
    use framebooth_layout_model::AssetRef;

    fn ctx() -> RenderContext {
        RenderContext::new(ExportDefaults::default())
    }

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    fn slot(id: &str, x: f64, y: f64, w: f64, h: f64, z: i32) -> Element {
        Element::PhotoSlot {
            id: id.into(),
            geometry: Some(Geometry::new(x, y, w, h)),
            z_index: z,
            source_index: None,
            shape: SlotShape::default(),
        }
    }

    fn layout(w: u32, h: u32, elements: Vec<Element>) -> LayoutDefinition {
        LayoutDefinition {
            canvas_width: w,
            canvas_height: h,
            background: Color::BLACK,
            elements,
        }
    }

    #[test]
    fn photo_slots_paint_their_sources() {
        let mut ctx = ctx();
        let layout = layout(
            100,
            100,
            vec![
                slot("left", 0.0, 0.0, 50.0, 100.0, 100),
                slot("right", 50.0, 0.0, 50.0, 100.0, 101),
            ],
        );
        let red = solid(40, 40, [255, 0, 0, 255]);
        let blue = solid(40, 40, [0, 0, 255, 255]);
        let slot_images = vec![Some(&red), Some(&blue)];
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        assert_eq!(canvas.get_pixel(10, 50).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(90, 50).0, [0, 0, 255, 255]);
    }

    #[test]
    fn overlay_paints_above_slots_despite_low_authored_z() {
        let mut ctx = ctx();

        // Overlay asset: left half transparent, right half green.
        let mut overlay = RgbaImage::new(100, 100);
        for (x, _, pixel) in overlay.enumerate_pixels_mut() {
            *pixel = if x >= 50 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }
        ctx.cache_asset("frame", overlay);

        let layout = layout(
            100,
            100,
            vec![
                slot("left", 0.0, 0.0, 50.0, 100.0, 100),
                slot("right", 50.0, 0.0, 50.0, 100.0, 101),
                Element::OverlayUpload {
                    id: "overlay".into(),
                    geometry: Some(Geometry::new(0.0, 0.0, 100.0, 100.0)),
                    z_index: 10, // authored far below the slots
                    asset: AssetRef {
                        id: "frame".into(),
                        path: None,
                    },
                    fit: FitMode::Cover,
                },
            ],
        );

        let red = solid(10, 10, [255, 0, 0, 255]);
        let blue = solid(10, 10, [0, 0, 255, 255]);
        let slot_images = vec![Some(&red), Some(&blue)];
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        // Where the overlay is opaque it wins over the slot beneath it.
        assert_eq!(canvas.get_pixel(75, 50).0, [0, 255, 0, 255]);
        // Where the overlay is transparent the captured photo shows.
        assert_eq!(canvas.get_pixel(25, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn unresolved_slot_renders_placeholder() {
        let mut ctx = ctx();
        let layout = layout(60, 60, vec![slot("only", 10.0, 10.0, 40.0, 40.0, 0)]);
        let slot_images = vec![None];
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        let placeholder = Color::PLACEHOLDER;
        assert_eq!(
            canvas.get_pixel(30, 30).0,
            [placeholder.r, placeholder.g, placeholder.b, 255]
        );
        // Outside the slot the background shows.
        assert_eq!(canvas.get_pixel(2, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn background_photo_paints_first_regardless_of_z() {
        let mut ctx = ctx();
        ctx.cache_asset("backdrop", solid(10, 10, [10, 20, 30, 255]));

        let layout = layout(
            50,
            50,
            vec![
                Element::BackgroundPhoto {
                    id: "bg".into(),
                    geometry: None,
                    z_index: 9_999_999, // absurd z is ignored
                    asset: AssetRef {
                        id: "backdrop".into(),
                        path: None,
                    },
                },
                slot("front", 0.0, 0.0, 25.0, 25.0, 0),
            ],
        );

        let red = solid(4, 4, [255, 0, 0, 255]);
        let slot_images = vec![Some(&red)];
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        // Slot painted over the backdrop.
        assert_eq!(canvas.get_pixel(10, 10).0, [255, 0, 0, 255]);
        // Backdrop fills everywhere else.
        assert_eq!(canvas.get_pixel(40, 40).0, [10, 20, 30, 255]);
    }

    #[test]
    fn equal_z_ties_break_on_element_order() {
        let mut ctx = ctx();
        let layout = layout(
            40,
            40,
            vec![
                Element::Shape {
                    id: "under".into(),
                    geometry: Some(Geometry::new(0.0, 0.0, 40.0, 40.0)),
                    z_index: 5,
                    kind: ShapeKind::Rounded { radius: 0.0 },
                    color: Color::rgb(255, 0, 0),
                    opacity: 1.0,
                },
                Element::Shape {
                    id: "over".into(),
                    geometry: Some(Geometry::new(0.0, 0.0, 40.0, 40.0)),
                    z_index: 5,
                    kind: ShapeKind::Rounded { radius: 0.0 },
                    color: Color::rgb(0, 0, 255),
                    opacity: 1.0,
                },
            ],
        );
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &[],
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();
        assert_eq!(canvas.get_pixel(20, 20).0, [0, 0, 255, 255]);
    }

    #[test]
    fn shape_circle_uses_min_dimension_diameter() {
        let mut ctx = ctx();
        let layout = layout(
            100,
            60,
            vec![Element::Shape {
                id: "dot".into(),
                geometry: Some(Geometry::new(0.0, 0.0, 100.0, 60.0)),
                z_index: 0,
                kind: ShapeKind::Circle,
                color: Color::rgb(255, 255, 0),
                opacity: 1.0,
            }],
        );
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &[],
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        // Center is filled.
        assert_eq!(canvas.get_pixel(50, 30).0, [255, 255, 0, 255]);
        // Far left edge is outside the min-dimension circle.
        assert_eq!(canvas.get_pixel(5, 30).0, [0, 0, 0, 255]);
    }

    #[test]
    fn shape_opacity_blends_with_background() {
        let mut ctx = ctx();
        let layout = layout(
            10,
            10,
            vec![Element::Shape {
                id: "veil".into(),
                geometry: Some(Geometry::new(0.0, 0.0, 10.0, 10.0)),
                z_index: 0,
                kind: ShapeKind::Rounded { radius: 0.0 },
                color: Color::WHITE,
                opacity: 0.5,
            }],
        );
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &[],
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();
        let [r, g, b, _] = canvas.get_pixel(5, 5).0;
        for c in [r, g, b] {
            assert!((125..=130).contains(&c), "expected half blend, got {c}");
        }
    }

    #[test]
    fn filters_apply_to_slot_content() {
        let mut ctx = ctx();
        let layout = layout(20, 20, vec![slot("s", 0.0, 0.0, 20.0, 20.0, 0)]);
        let source = solid(20, 20, [200, 100, 40, 255]);
        let slot_images = vec![Some(&source)];

        let mut filters = FilterSettings::NEUTRAL;
        filters.grayscale = 100.0;
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &filters,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();
        let [r, g, b, _] = canvas.get_pixel(10, 10).0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
    }

    #[test]
    fn transform_zoom_narrows_the_sampled_window() {
        // Source: left half red, right half blue. Cover at identity shows
        // both; zoomed 4x from center shows only the middle.
        let mut source = RgbaImage::new(100, 100);
        for (x, _, pixel) in source.enumerate_pixels_mut() {
            *pixel = if x < 50 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }

        let identity = sample_cover(&source, (50, 50), Transform::IDENTITY);
        assert_eq!(identity.get_pixel(5, 25).0, [255, 0, 0, 255]);
        assert_eq!(identity.get_pixel(45, 25).0, [0, 0, 255, 255]);

        // Pan fully right while zoomed: window clamps to the blue edge.
        let panned = sample_cover(&source, (50, 50), Transform::new(4.0, 10.0, 0.0));
        assert_eq!(panned.get_pixel(25, 25).0, [0, 0, 255, 255]);
    }

    #[test]
    fn contain_letterboxes_with_transparent_bands() {
        let source = solid(100, 50, [255, 0, 0, 255]);
        let tile = sample_contain(&source, (50, 50));
        // Fitted region is 50x25 centered vertically.
        assert_eq!(tile.get_pixel(25, 25).0, [255, 0, 0, 255]);
        assert_eq!(tile.get_pixel(25, 2).0[3], 0);
        assert_eq!(tile.get_pixel(25, 48).0[3], 0);
    }

    #[test]
    fn crop_to_aspect_narrower_trims_sides() {
        let canvas = solid(100, 100, [1, 2, 3, 255]);
        let cropped = crop_to_aspect(&canvas, 0.5);
        assert_eq!(cropped.dimensions(), (50, 100));
    }

    #[test]
    fn crop_to_aspect_wider_trims_height() {
        let canvas = solid(100, 100, [1, 2, 3, 255]);
        let cropped = crop_to_aspect(&canvas, 2.0);
        assert_eq!(cropped.dimensions(), (100, 50));
    }

    #[test]
    fn crop_to_matching_aspect_is_lossless() {
        let canvas = solid(80, 40, [9, 9, 9, 255]);
        let cropped = crop_to_aspect(&canvas, 2.0);
        assert_eq!(cropped.dimensions(), (80, 40));
    }

    #[test]
    fn rotated_slot_paints_within_rotated_bounds() {
        let mut ctx = ctx();
        let mut geometry = Geometry::new(30.0, 30.0, 40.0, 20.0);
        geometry.rotation = 90.0;
        let layout = layout(
            100,
            100,
            vec![Element::PhotoSlot {
                id: "spun".into(),
                geometry: Some(geometry),
                z_index: 0,
                source_index: None,
                shape: SlotShape::default(),
            }],
        );
        let source = solid(10, 10, [255, 0, 255, 255]);
        let slot_images = vec![Some(&source)];
        let canvas = compose_canvas(
            &mut ctx,
            &ComposePass {
                layout: &layout,
                slot_images: &slot_images,
                filters: &FilterSettings::NEUTRAL,
                transforms: &HashMap::new(),
            },
        )
        .unwrap();

        // After a 90° spin around the tile center (50, 40), the painted
        // region is 20 wide and 40 tall.
        assert_eq!(canvas.get_pixel(50, 55).0, [255, 0, 255, 255]);
        // A corner of the unrotated rect is now empty.
        assert_eq!(canvas.get_pixel(32, 32).0, [0, 0, 0, 255]);
    }
}
