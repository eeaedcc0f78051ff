//! Video synthesis: the timed draw loop.
//!
//! The synthesizer walks a fixed 30 fps media timeline, re-composites the
//! full canonical frame at every tick from each slot's current clip
//! position, and forwards frames to a sink (the encoder in production, an
//! in-memory collector in tests). It shares the layout, slot assignment,
//! and filter pipeline with the still path — the two must never diverge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use framebooth_common::{BoothError, BoothResult, CancelFlag, ExportDefaults, FrameTimeline};
use framebooth_compose_core::assign_sources;
use framebooth_layout_model::{CapturedClip, FilterSettings, LayoutDefinition, Transform};
use image::RgbaImage;

use crate::clips::ClipSource;
use crate::compositor::{compose_canvas, ComposePass};
use crate::context::RenderContext;

/// Per-slot transform state shared with interactive code. The loop
/// snapshots it once per tick; it is never read mid-paint.
pub type SharedTransforms = Arc<Mutex<HashMap<String, Transform>>>;

/// Where composited frames go.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbaImage) -> BoothResult<()>;
}

impl FrameSink for crate::encoder::EncoderSession {
    fn write_frame(&mut self, frame: &RgbaImage) -> BoothResult<()> {
        crate::encoder::EncoderSession::write_frame(self, frame)
    }
}

/// Collects frames in memory. Test and preview sink.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub frames: Vec<RgbaImage>,
}

impl FrameSink for InMemorySink {
    fn write_frame(&mut self, frame: &RgbaImage) -> BoothResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Resolved timing for one synthesis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisPlan {
    pub fps: u32,

    /// Target duration: the longest clip, floored at the configured
    /// minimum.
    pub duration_secs: f64,

    /// Extra seconds the loop may run past the target before it hard-stops.
    pub stop_buffer_secs: f64,
}

impl SynthesisPlan {
    /// Frames the run produces when every clip plays to the target
    /// duration.
    pub fn target_frames(&self) -> u64 {
        (self.duration_secs * self.fps as f64).ceil() as u64
    }
}

/// Compute the synthesis plan from the captured clips.
pub fn plan_synthesis(clips: &[CapturedClip], defaults: &ExportDefaults) -> SynthesisPlan {
    let longest = clips
        .iter()
        .map(|clip| clip.duration_secs)
        .fold(0.0, f64::max);
    SynthesisPlan {
        fps: defaults.fps.max(1),
        duration_secs: longest.max(defaults.min_video_secs),
        stop_buffer_secs: defaults.stop_buffer_secs,
    }
}

/// Outcome counters for a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisStats {
    pub frames_composited: u64,
    pub degraded_slots: usize,
}

/// Run the draw loop to completion (or cancellation).
///
/// `sources` holds one entry per captured clip, `None` where the clip never
/// became playable; those slots render placeholders and synthesis
/// continues. The loop stops once the target duration is reached and every
/// playable source has ended, and hard-stops at duration plus the buffer.
#[allow(clippy::too_many_arguments)]
pub async fn synthesize_video(
    ctx: &mut RenderContext,
    layout: &LayoutDefinition,
    clips: &[CapturedClip],
    sources: &[Option<ClipSource>],
    filters: &FilterSettings,
    transforms: &SharedTransforms,
    sink: &mut dyn FrameSink,
    cancel: &CancelFlag,
    plan: &SynthesisPlan,
) -> BoothResult<SynthesisStats> {
    // The exact mapping the still path uses; divergence here is the bug
    // class this function exists to prevent.
    let declared = layout.declared_slot_sources();
    let assignments = assign_sources(&declared, clips.len());
    let playable = sources.iter().flatten().count();
    let degraded_slots = sources.len() - playable;

    if degraded_slots > 0 {
        tracing::warn!(degraded_slots, "some clips degraded to placeholders");
    }

    let mut frames_composited = 0u64;
    let timeline = FrameTimeline::new(plan.fps, plan.duration_secs + plan.stop_buffer_secs);

    for (frame_index, t_secs) in timeline {
        if cancel.is_cancelled() {
            tracing::info!(frame_index, "synthesis cancelled");
            return Err(BoothError::Cancelled);
        }

        // Target reached and nothing left to play: done. The buffer only
        // matters while some source still has frames.
        let all_ended = playable > 0
            && sources
                .iter()
                .flatten()
                .all(|source| source.has_ended(t_secs));
        if t_secs >= plan.duration_secs && (all_ended || playable == 0) {
            break;
        }

        // Snapshot shared transform state once per tick.
        let transform_snapshot: HashMap<String, Transform> = {
            let guard = transforms
                .lock()
                .map_err(|_| BoothError::synthesis("transform state poisoned"))?;
            guard
                .iter()
                .map(|(id, transform)| (id.clone(), transform.clamped()))
                .collect()
        };

        let slot_frames: Vec<Option<&RgbaImage>> = assignments
            .iter()
            .map(|assignment| {
                assignment
                    .and_then(|source_index| sources.get(source_index)?.as_ref())
                    .map(|source| source.frame_at(t_secs))
            })
            .collect();

        let frame = compose_canvas(
            ctx,
            &ComposePass {
                layout,
                slot_images: &slot_frames,
                filters,
                transforms: &transform_snapshot,
            },
        )?;
        sink.write_frame(&frame)?;
        frames_composited += 1;

        // One composite per tick, then yield to the scheduler.
        tokio::task::yield_now().await;
    }

    Ok(SynthesisStats {
        frames_composited,
        degraded_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use framebooth_layout_model::{Color, Element, Geometry, SlotShape};
    use image::Rgba;

    fn defaults() -> ExportDefaults {
        ExportDefaults::default()
    }

    fn clip(id: &str, duration_secs: f64) -> CapturedClip {
        CapturedClip {
            id: id.into(),
            path: format!("/tmp/{id}.mp4").into(),
            duration_secs,
            mirrored: false,
        }
    }

    fn solid_frames(n: usize, rgba: [u8; 4]) -> Vec<RgbaImage> {
        (0..n)
            .map(|_| RgbaImage::from_pixel(4, 4, Rgba(rgba)))
            .collect()
    }

    fn slot_layout(slot_count: usize) -> LayoutDefinition {
        let elements = (0..slot_count)
            .map(|i| Element::PhotoSlot {
                id: format!("slot-{i}"),
                geometry: Some(Geometry::new(0.0, i as f64 * 10.0, 10.0, 10.0)),
                z_index: 100 + i as i32,
                source_index: None,
                shape: SlotShape::default(),
            })
            .collect();
        LayoutDefinition {
            canvas_width: 10,
            canvas_height: 10 * slot_count as u32,
            background: Color::BLACK,
            elements,
        }
    }

    #[test]
    fn duration_is_longest_clip() {
        let plan = plan_synthesis(&[clip("a", 4.0), clip("b", 6.5)], &defaults());
        assert!((plan.duration_secs - 6.5).abs() < 1e-9);
    }

    #[test]
    fn duration_floors_at_minimum_even_when_clips_are_shorter() {
        let plan = plan_synthesis(&[clip("a", 1.0), clip("b", 0.5)], &defaults());
        assert!((plan.duration_secs - 3.0).abs() < 1e-9);

        let plan = plan_synthesis(&[], &defaults());
        assert!((plan.duration_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn one_clip_duplicates_across_four_slots() {
        // The video path must reuse the still path's assignment rule.
        let layout = slot_layout(4);
        let assignments = assign_sources(&layout.declared_slot_sources(), 1);
        assert_eq!(assignments, vec![Some(0); 4]);
    }

    #[tokio::test]
    async fn loop_stops_at_target_when_all_sources_have_ended() {
        let mut ctx = RenderContext::new(defaults());
        let layout = slot_layout(1);
        let clips = vec![clip("short", 1.0)];
        let sources = vec![Some(ClipSource::from_frames(
            "short",
            solid_frames(30, [255, 0, 0, 255]),
            30,
        ))];
        let plan = plan_synthesis(&clips, &defaults());
        let mut sink = InMemorySink::default();

        let stats = synthesize_video(
            &mut ctx,
            &layout,
            &clips,
            &sources,
            &FilterSettings::NEUTRAL,
            &SharedTransforms::default(),
            &mut sink,
            &CancelFlag::new(),
            &plan,
        )
        .await
        .unwrap();

        // A 1s clip still produces the full 3s floor, and the loop stops
        // exactly at the target without eating the stop buffer.
        assert_eq!(stats.frames_composited, plan.target_frames());
        assert_eq!(sink.frames.len() as u64, 90);
        assert_eq!(stats.degraded_slots, 0);

        // The held last frame keeps painting the slot after the clip ends.
        let last = sink.frames.last().unwrap();
        assert_eq!(last.get_pixel(5, 5).0, [255, 0, 0, 255]);
    }

    #[tokio::test]
    async fn degraded_sources_render_placeholders_and_continue() {
        let mut ctx = RenderContext::new(defaults());
        let layout = slot_layout(2);
        let clips = vec![clip("dead", 4.0), clip("live", 4.0)];
        let sources = vec![
            None,
            Some(ClipSource::from_frames(
                "live",
                solid_frames(120, [0, 0, 255, 255]),
                30,
            )),
        ];
        let plan = plan_synthesis(&clips, &defaults());
        let mut sink = InMemorySink::default();

        let stats = synthesize_video(
            &mut ctx,
            &layout,
            &clips,
            &sources,
            &FilterSettings::NEUTRAL,
            &SharedTransforms::default(),
            &mut sink,
            &CancelFlag::new(),
            &plan,
        )
        .await
        .unwrap();

        assert_eq!(stats.degraded_slots, 1);
        assert!(stats.frames_composited > 0);

        let frame = &sink.frames[0];
        // Slot 0 (declared source 0, the dead clip) shows the placeholder.
        let placeholder = Color::PLACEHOLDER;
        assert_eq!(
            frame.get_pixel(5, 5).0,
            [placeholder.r, placeholder.g, placeholder.b, 255]
        );
        // Slot 1 shows the live clip.
        assert_eq!(frame.get_pixel(5, 15).0, [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn cancellation_stops_before_any_frame() {
        let mut ctx = RenderContext::new(defaults());
        let layout = slot_layout(1);
        let clips = vec![clip("c", 4.0)];
        let sources = vec![Some(ClipSource::from_frames(
            "c",
            solid_frames(120, [1, 2, 3, 255]),
            30,
        ))];
        let plan = plan_synthesis(&clips, &defaults());
        let mut sink = InMemorySink::default();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = synthesize_video(
            &mut ctx,
            &layout,
            &clips,
            &sources,
            &FilterSettings::NEUTRAL,
            &SharedTransforms::default(),
            &mut sink,
            &cancel,
            &plan,
        )
        .await;

        assert!(matches!(result, Err(BoothError::Cancelled)));
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn no_playable_sources_still_produces_full_duration() {
        let mut ctx = RenderContext::new(defaults());
        let layout = slot_layout(1);
        let clips = vec![clip("gone", 1.0)];
        let sources = vec![None];
        let plan = plan_synthesis(&clips, &defaults());
        let mut sink = InMemorySink::default();

        let stats = synthesize_video(
            &mut ctx,
            &layout,
            &clips,
            &sources,
            &FilterSettings::NEUTRAL,
            &SharedTransforms::default(),
            &mut sink,
            &CancelFlag::new(),
            &plan,
        )
        .await
        .unwrap();

        assert_eq!(stats.frames_composited, plan.target_frames());
        assert_eq!(stats.degraded_slots, 1);
    }
}
