//! Synthesize captured clips onto a layout and export a silent video.

use std::path::PathBuf;

use framebooth_common::{AppConfig, CancelFlag, DeviceClass};
use framebooth_layout_model::{CapturedClip, FilterSettings};
use framebooth_render_engine::clips::probe_clip;
use framebooth_render_engine::synthesizer::SharedTransforms;
use framebooth_render_engine::{export_video, ExportProgress, RenderContext, VideoExportRequest};

pub async fn run(
    layout_path: PathBuf,
    clip_paths: Vec<PathBuf>,
    output: PathBuf,
    mirror: bool,
    constrained: bool,
) -> anyhow::Result<()> {
    let layout = super::render::load_layout(&layout_path)?;

    let mut clips = Vec::with_capacity(clip_paths.len());
    for (index, path) in clip_paths.iter().enumerate() {
        let probe = probe_clip(path)
            .map_err(|e| anyhow::anyhow!("failed to probe clip {}: {e}", path.display()))?;
        clips.push(CapturedClip {
            id: format!("clip-{index}"),
            path: path.clone(),
            duration_secs: probe.duration_secs,
            mirrored: mirror,
        });
    }

    let config = AppConfig::load();
    let mut defaults = config.export;
    if constrained {
        defaults.device_class = DeviceClass::Constrained;
    }

    let mut ctx = RenderContext::new(defaults);
    let progress: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        print!(
            "\r[{:?}] {:5.1}% ({}/{} frames)",
            p.stage,
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames
        );
        use std::io::Write;
        std::io::stdout().flush().ok();
    });

    let artifact = export_video(
        &mut ctx,
        &VideoExportRequest {
            layout: &layout,
            clips: &clips,
            filters: FilterSettings::NEUTRAL,
            transforms: SharedTransforms::default(),
        },
        &CancelFlag::new(),
        Some(progress),
    )
    .await?;
    println!();

    std::fs::write(&output, &artifact.bytes)?;
    println!(
        "Wrote {} ({} bytes, {} container, {:.2}s)",
        output.display(),
        artifact.bytes.len(),
        artifact.container,
        artifact.duration_secs.unwrap_or(0.0)
    );
    Ok(())
}
