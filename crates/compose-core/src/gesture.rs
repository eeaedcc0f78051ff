//! Pointer-agnostic gesture handling for slot zoom/pan.
//!
//! Mouse wheel, touch pinch, and trackpad gestures all reduce to the same
//! normalized delta; one function applies it to a transform so the clamping
//! rules live in exactly one place. Input adapters stay thin.

use framebooth_layout_model::Transform;

/// A normalized zoom/pan delta, independent of input modality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDelta {
    /// Multiplicative zoom change (1.0 = none).
    pub scale_factor: f64,

    /// Horizontal pan delta as a fraction of the sample window.
    pub dx: f64,

    /// Vertical pan delta as a fraction of the sample window.
    pub dy: f64,
}

impl GestureDelta {
    pub const NONE: GestureDelta = GestureDelta {
        scale_factor: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    /// Wheel adapter: each notch zooms by 5%.
    pub fn from_wheel(notches: f64) -> Self {
        Self {
            scale_factor: 1.0 + notches * 0.05,
            dx: 0.0,
            dy: 0.0,
        }
    }

    /// Pinch adapter: the gesture's span ratio is the zoom factor directly.
    pub fn from_pinch(span_ratio: f64) -> Self {
        Self {
            scale_factor: span_ratio,
            dx: 0.0,
            dy: 0.0,
        }
    }

    /// Drag adapter: pointer motion already normalized to the slot size.
    pub fn from_drag(dx: f64, dy: f64) -> Self {
        Self {
            scale_factor: 1.0,
            dx,
            dy,
        }
    }
}

/// Apply a gesture delta to a transform, re-clamping scale into [1, 4].
pub fn apply_gesture(transform: Transform, delta: GestureDelta) -> Transform {
    let scale_factor = if delta.scale_factor.is_finite() && delta.scale_factor > 0.0 {
        delta.scale_factor
    } else {
        1.0
    };
    Transform::new(
        transform.scale * scale_factor,
        transform.pan_x + delta.dx,
        transform.pan_y + delta.dy,
    )
}
