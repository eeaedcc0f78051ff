//! Export job orchestration.
//!
//! The two entry points — [`export_still`] and [`export_video`] — share the
//! same normalization, slot assignment, and compositor; they differ only in
//! what fills the slots and where the canonical surface goes afterwards.
//! Exactly one export runs per session: both paths claim the context's
//! export gate before touching anything.

use std::collections::HashMap;
use std::io::Cursor;

use framebooth_common::{BoothError, BoothResult, CancelFlag};
use framebooth_compose_core::{assign_sources, normalize_layout};
use framebooth_layout_model::{
    CapturedClip, CapturedPhoto, FilterSettings, LayoutDefinition, Transform,
};
use image::RgbaImage;

use crate::clips::open_all;
use crate::compositor::{compose_canvas, crop_to_aspect, ComposePass};
use crate::context::RenderContext;
use crate::encoder::EncoderSession;
use crate::synthesizer::{plan_synthesis, synthesize_video, SharedTransforms};

/// What kind of artifact a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Image,
    Video,
}

/// Still artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillFormat {
    Png,
    Jpeg { quality: u8 },
}

/// Progress callback for export jobs.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames composited so far (always 0 or 1 for stills).
    pub frames_rendered: u64,

    /// Total frames the job expects to composite.
    pub total_frames: u64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Encoding,
    Complete,
    Failed,
}

/// A finished export: opaque bytes plus enough metadata for the caller to
/// persist or share it. Created per export action, discarded after.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub kind: ExportKind,
    pub bytes: Vec<u8>,
    pub container: String,
    pub duration_secs: Option<f64>,
    pub created_at: String,
}

/// Inputs for a still export.
pub struct StillExportRequest<'a> {
    pub layout: &'a LayoutDefinition,
    pub photos: &'a [CapturedPhoto],
    pub filters: FilterSettings,

    /// Per-slot zoom/pan snapshots keyed by element id.
    pub transforms: HashMap<String, Transform>,

    pub format: StillFormat,

    /// Crop the finished canvas to this aspect ratio (width / height) when
    /// the layout's frame graphic does not match the canvas aspect.
    pub crop_aspect: Option<f64>,
}

/// Inputs for a video export.
pub struct VideoExportRequest<'a> {
    pub layout: &'a LayoutDefinition,
    pub clips: &'a [CapturedClip],
    pub filters: FilterSettings,

    /// Live per-slot transform state; snapshotted once per tick.
    pub transforms: SharedTransforms,
}

/// Flatten a layout plus captured photos into a still artifact.
pub fn export_still(
    ctx: &mut RenderContext,
    request: &StillExportRequest<'_>,
) -> BoothResult<ExportArtifact> {
    let _ticket = ctx.begin_export()?;

    request
        .layout
        .validate()
        .map_err(|e| BoothError::layout(e.to_string()))?;
    let layout = normalize_layout(request.layout);

    let assignments = assign_sources(&layout.declared_slot_sources(), request.photos.len());
    let slot_images: Vec<Option<&RgbaImage>> = assignments
        .iter()
        .map(|assignment| assignment.map(|index| request.photos[index].image.as_ref()))
        .collect();

    let canvas = compose_canvas(
        ctx,
        &ComposePass {
            layout: &layout,
            slot_images: &slot_images,
            filters: &request.filters,
            transforms: &request.transforms,
        },
    )?;

    let canvas = match request.crop_aspect {
        Some(aspect) => crop_to_aspect(&canvas, aspect),
        None => canvas,
    };

    let (bytes, container) = encode_still(&canvas, request.format)?;

    tracing::info!(
        container = %container,
        size_bytes = bytes.len(),
        slots = assignments.len(),
        photos = request.photos.len(),
        "still export finished"
    );

    Ok(ExportArtifact {
        kind: ExportKind::Image,
        bytes,
        container,
        duration_secs: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Synthesize a layout plus captured clips into a silent video artifact.
pub async fn export_video(
    ctx: &mut RenderContext,
    request: &VideoExportRequest<'_>,
    cancel: &CancelFlag,
    progress: Option<ProgressCallback>,
) -> BoothResult<ExportArtifact> {
    let _ticket = ctx.begin_export()?;

    request
        .layout
        .validate()
        .map_err(|e| BoothError::layout(e.to_string()))?;
    let layout = normalize_layout(request.layout);
    let plan = plan_synthesis(request.clips, &ctx.defaults);

    report(&progress, 0.0, 0, plan.target_frames(), ExportStage::Preparing);

    // Warm every clip in parallel; a stalled decode degrades its own slot
    // without blocking the job.
    let sources = open_all(
        request.clips,
        plan.fps,
        ctx.defaults.clip_ready_timeout_secs,
    )
    .await;

    if cancel.is_cancelled() {
        return Err(BoothError::Cancelled);
    }

    let mut encoder = EncoderSession::start(
        layout.canvas_width,
        layout.canvas_height,
        plan.fps,
        plan.duration_secs,
        ctx.defaults.device_class,
    )?;

    report(&progress, 0.0, 0, plan.target_frames(), ExportStage::Rendering);

    let synthesis = synthesize_video(
        ctx,
        &layout,
        request.clips,
        &sources,
        &request.filters,
        &request.transforms,
        &mut encoder,
        cancel,
        &plan,
    )
    .await;

    let stats = match synthesis {
        Ok(stats) => stats,
        Err(err) => {
            // Cancellation and synthesis failures both discard partial
            // output and release the encoder child.
            encoder.abort();
            report(&progress, 0.0, 0, plan.target_frames(), ExportStage::Failed);
            return Err(err);
        }
    };

    report(
        &progress,
        0.95,
        stats.frames_composited,
        plan.target_frames(),
        ExportStage::Encoding,
    );

    let video = match encoder.finish() {
        Ok(video) => video,
        Err(err) => {
            report(&progress, 0.0, 0, plan.target_frames(), ExportStage::Failed);
            return Err(err);
        }
    };

    report(
        &progress,
        1.0,
        stats.frames_composited,
        plan.target_frames(),
        ExportStage::Complete,
    );

    tracing::info!(
        frames = video.frames,
        duration_secs = video.duration_secs,
        container = %video.container,
        degraded_slots = stats.degraded_slots,
        "video export finished"
    );

    Ok(ExportArtifact {
        kind: ExportKind::Video,
        duration_secs: Some(video.duration_secs),
        container: video.container,
        bytes: video.bytes,
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}

fn report(
    progress: &Option<ProgressCallback>,
    fraction: f64,
    frames_rendered: u64,
    total_frames: u64,
    stage: ExportStage,
) {
    if let Some(callback) = progress {
        callback(ExportProgress {
            progress: fraction,
            frames_rendered,
            total_frames,
            stage,
        });
    }
}

fn encode_still(canvas: &RgbaImage, format: StillFormat) -> BoothResult<(Vec<u8>, String)> {
    let mut bytes = Vec::new();
    match format {
        StillFormat::Png => {
            image::DynamicImage::ImageRgba8(canvas.clone())
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| BoothError::encode(format!("png encode failed: {e}")))?;
            Ok((bytes, "png".to_string()))
        }
        StillFormat::Jpeg { quality } => {
            // JPEG has no alpha channel; flatten first.
            let rgb = image::DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                quality.clamp(1, 100),
            );
            rgb.write_with_encoder(encoder)
                .map_err(|e| BoothError::encode(format!("jpeg encode failed: {e}")))?;
            Ok((bytes, "jpg".to_string()))
        }
    }
}
