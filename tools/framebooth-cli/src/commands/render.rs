//! Flatten captured photos onto a layout.

use std::collections::HashMap;
use std::path::PathBuf;

use framebooth_common::AppConfig;
use framebooth_layout_model::{CapturedPhoto, FilterSettings, LayoutDefinition};
use framebooth_render_engine::{export_still, RenderContext, StillExportRequest, StillFormat};

#[allow(clippy::too_many_arguments)]
pub fn run(
    layout_path: PathBuf,
    photo_paths: Vec<PathBuf>,
    output: PathBuf,
    jpeg_quality: Option<u8>,
    crop_aspect: Option<f64>,
    grayscale: f32,
    brightness: f32,
    sepia: f32,
) -> anyhow::Result<()> {
    let layout = load_layout(&layout_path)?;

    let mut photos = Vec::with_capacity(photo_paths.len());
    for (index, path) in photo_paths.iter().enumerate() {
        let image = image::open(path)
            .map_err(|e| anyhow::anyhow!("failed to load photo {}: {e}", path.display()))?
            .to_rgba8();
        photos.push(CapturedPhoto::new(format!("photo-{index}"), image));
    }

    let mut filters = FilterSettings::NEUTRAL;
    filters.grayscale = grayscale;
    filters.brightness = brightness;
    filters.sepia = sepia;

    let format = match jpeg_quality {
        Some(quality) => StillFormat::Jpeg { quality },
        None => StillFormat::Png,
    };

    let config = AppConfig::load();
    let mut ctx = RenderContext::new(config.export);
    let artifact = export_still(
        &mut ctx,
        &StillExportRequest {
            layout: &layout,
            photos: &photos,
            filters,
            transforms: HashMap::new(),
            format,
            crop_aspect,
        },
    )?;

    std::fs::write(&output, &artifact.bytes)?;
    println!(
        "Wrote {} ({} bytes, {})",
        output.display(),
        artifact.bytes.len(),
        artifact.container
    );
    Ok(())
}

pub(crate) fn load_layout(path: &PathBuf) -> anyhow::Result<LayoutDefinition> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read layout {}: {e}", path.display()))?;
    let layout: LayoutDefinition = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse layout {}: {e}", path.display()))?;
    Ok(layout)
}
