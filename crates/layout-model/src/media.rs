//! Captured media records, per-slot transforms, and filter settings.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// A single captured photo, already decoded to RGBA by the capture
/// subsystem (mirroring, if requested, has been applied there too).
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Capture-session identifier.
    pub id: String,

    /// Decoded raster, shared with the preview without copying.
    pub image: Arc<RgbaImage>,
}

impl CapturedPhoto {
    pub fn new(id: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            id: id.into(),
            image: Arc::new(image),
        }
    }
}

/// A captured video clip reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedClip {
    /// Capture-session identifier.
    pub id: String,

    /// Container file recorded by the capture subsystem.
    pub path: PathBuf,

    /// Clip duration in seconds.
    pub duration_secs: f64,

    /// Whether the capture session was mirrored. Mirrored clips are flipped
    /// horizontally frame-by-frame so they match their paired still photo.
    pub mirrored: bool,
}

/// Per-slot user zoom/pan state.
///
/// Mutable from interactive code while an export runs; export passes must
/// snapshot (and re-clamp) once per tick rather than read it live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Zoom factor, always within [1, 4].
    pub scale: f64,

    /// Horizontal pan as a fraction of the zoomed sample window.
    pub pan_x: f64,

    /// Vertical pan as a fraction of the zoomed sample window.
    pub pan_y: f64,
}

impl Transform {
    pub const MIN_SCALE: f64 = 1.0;
    pub const MAX_SCALE: f64 = 4.0;

    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        pan_x: 0.0,
        pan_y: 0.0,
    };

    /// Create a transform, clamping scale into the valid range.
    pub fn new(scale: f64, pan_x: f64, pan_y: f64) -> Self {
        Self {
            scale: scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE),
            pan_x,
            pan_y,
        }
    }

    /// Re-clamp the scale. Applied on every snapshot since the value is
    /// mutable from outside the export pass.
    pub fn clamped(self) -> Self {
        Self::new(self.scale, self.pan_x, self.pan_y)
    }

    pub fn is_identity(&self) -> bool {
        (self.scale - 1.0).abs() < 1e-9 && self.pan_x.abs() < 1e-9 && self.pan_y.abs() < 1e-9
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The seven user-facing filter channels.
///
/// Percent channels use 100 as neutral; `grayscale`/`sepia` use 0 as
/// neutral; `hue_rotate` is degrees with 0 neutral. `blur` only affects the
/// live preview and is never applied in the export pixel pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturate: f32,
    pub grayscale: f32,
    pub sepia: f32,
    pub blur: f32,
    pub hue_rotate: f32,
}

impl FilterSettings {
    pub const NEUTRAL: FilterSettings = FilterSettings {
        brightness: 100.0,
        contrast: 100.0,
        saturate: 100.0,
        grayscale: 0.0,
        sepia: 0.0,
        blur: 0.0,
        hue_rotate: 0.0,
    };

    /// Whether the pixel pass can be skipped entirely. `blur` is excluded:
    /// it never participates in the pixel pass.
    pub fn is_neutral(&self) -> bool {
        (self.brightness - 100.0).abs() < f32::EPSILON
            && (self.contrast - 100.0).abs() < f32::EPSILON
            && (self.saturate - 100.0).abs() < f32::EPSILON
            && self.grayscale.abs() < f32::EPSILON
            && self.sepia.abs() < f32::EPSILON
            && self.hue_rotate.abs() < f32::EPSILON
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
