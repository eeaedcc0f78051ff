//! Session-scoped rendering context.
//!
//! Everything the engine used to keep in ambient module state lives here
//! instead: the decoded-asset cache, the text rasterizer, and the
//! one-export-at-a-time gate. A context is created per booth session and
//! passed into every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use framebooth_common::{BoothError, BoothResult, ExportDefaults};
use image::RgbaImage;

use crate::text::TextRasterizer;

/// Per-session rendering state.
pub struct RenderContext {
    /// Export engine parameters for this session.
    pub defaults: ExportDefaults,

    /// Decoded layout assets keyed by asset id.
    assets: HashMap<String, Arc<RgbaImage>>,

    /// Font system and glyph cache for text elements.
    text: TextRasterizer,

    /// One export at a time per session.
    gate: Arc<AtomicBool>,
}

impl RenderContext {
    pub fn new(defaults: ExportDefaults) -> Self {
        let text = TextRasterizer::new(defaults.fonts_dir.as_deref());
        Self {
            defaults,
            assets: HashMap::new(),
            text,
            gate: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Look up a previously decoded asset.
    pub fn cached_asset(&self, id: &str) -> Option<Arc<RgbaImage>> {
        self.assets.get(id).cloned()
    }

    /// Insert a decoded asset, returning the shared handle.
    pub fn cache_asset(&mut self, id: &str, image: RgbaImage) -> Arc<RgbaImage> {
        let handle = Arc::new(image);
        self.assets.insert(id.to_string(), handle.clone());
        handle
    }

    /// Drop all cached assets (end of booth session).
    pub fn clear_assets(&mut self) {
        self.assets.clear();
    }

    pub fn text_mut(&mut self) -> &mut TextRasterizer {
        &mut self.text
    }

    /// Claim the export gate.
    ///
    /// Fails with [`BoothError::Busy`] while another export holds the
    /// ticket; two passes writing the canonical surface would corrupt
    /// output, so a concurrent request is rejected rather than interleaved.
    pub fn begin_export(&self) -> BoothResult<ExportTicket> {
        if self
            .gate
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BoothError::busy(
                "an export is already running in this session",
            ));
        }
        Ok(ExportTicket {
            gate: self.gate.clone(),
        })
    }
}

/// Exclusive hold on the session's export gate; released on drop.
pub struct ExportTicket {
    gate: Arc<AtomicBool>,
}

impl Drop for ExportTicket {
    fn drop(&mut self) {
        self.gate.store(false, Ordering::SeqCst);
    }
}
