//! Layout element types.
//!
//! Elements form a discriminated union keyed by a `type` tag on the wire,
//! matching the JSON the draft subsystem emits. Every paintable thing a
//! layout can hold is one of these variants; match exhaustiveness is the
//! compile-time guarantee that new element kinds cannot slip past the
//! compositor unhandled.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Element position and size.
///
/// Until the normalizer runs, values may be in any of the three supported
/// unit systems (normalized fractions, centimeters, pixels). After
/// normalization they are integer-valued canonical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Clockwise rotation in degrees around the element center.
    #[serde(default)]
    pub rotation: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Largest of width/height, used by unit-system detection.
    pub fn max_dimension(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Clip shape for a photo slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SlotShape {
    /// Rounded rectangle; `radius` in the same units as the slot geometry.
    Rounded {
        #[serde(default)]
        radius: f64,
    },
    /// Elliptical clip filling the slot bounds.
    Circle,
}

impl Default for SlotShape {
    fn default() -> Self {
        SlotShape::Rounded { radius: 0.0 }
    }
}

/// How an overlay image is fitted into its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Aspect-fill: crop the source so it covers the whole box.
    #[default]
    Cover,
    /// Aspect-fit: letterbox the source fully inside the box.
    Contain,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical placement of the wrapped text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Geometry of a filled decorative shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ShapeKind {
    Rounded {
        #[serde(default)]
        radius: f64,
    },
    /// Filled circle with diameter `min(width, height)`, centered.
    Circle,
}

/// Reference to a layout-owned graphic (overlay or background photo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Stable identifier, also the session cache key.
    pub id: String,

    /// Optional filesystem source for the asset bytes.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A single layout element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Element {
    /// A slot bound to one captured photo or clip.
    PhotoSlot {
        id: String,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        z_index: i32,
        /// Which captured source fills this slot; assigned by position
        /// when absent.
        #[serde(default)]
        source_index: Option<usize>,
        #[serde(default)]
        shape: SlotShape,
    },

    /// A decorative image uploaded into the layout, never bound to
    /// captured media. Always paints above every photo slot.
    OverlayUpload {
        id: String,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        z_index: i32,
        asset: AssetRef,
        #[serde(default)]
        fit: FitMode,
    },

    /// Word-wrapped text block.
    Text {
        id: String,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        z_index: i32,
        content: String,
        font_size: f64,
        #[serde(default)]
        color: Color,
        #[serde(default)]
        align: TextAlign,
        #[serde(default)]
        valign: VerticalAlign,
        /// Line height as a multiple of font size.
        #[serde(default = "default_line_height")]
        line_height: f64,
        /// Horizontal inset subtracted from the wrap width, in geometry units.
        #[serde(default)]
        padding: f64,
    },

    /// Filled decorative shape.
    Shape {
        id: String,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        z_index: i32,
        kind: ShapeKind,
        color: Color,
        #[serde(default = "default_opacity")]
        opacity: f64,
    },

    /// Full-bleed photo painted beneath everything else.
    BackgroundPhoto {
        id: String,
        #[serde(default)]
        geometry: Option<Geometry>,
        #[serde(default)]
        z_index: i32,
        asset: AssetRef,
    },
}

fn default_line_height() -> f64 {
    1.2
}

fn default_opacity() -> f64 {
    1.0
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::PhotoSlot { id, .. }
            | Element::OverlayUpload { id, .. }
            | Element::Text { id, .. }
            | Element::Shape { id, .. }
            | Element::BackgroundPhoto { id, .. } => id,
        }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            Element::PhotoSlot { geometry, .. }
            | Element::OverlayUpload { geometry, .. }
            | Element::Text { geometry, .. }
            | Element::Shape { geometry, .. }
            | Element::BackgroundPhoto { geometry, .. } => geometry.as_ref(),
        }
    }

    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        match self {
            Element::PhotoSlot { geometry, .. }
            | Element::OverlayUpload { geometry, .. }
            | Element::Text { geometry, .. }
            | Element::Shape { geometry, .. }
            | Element::BackgroundPhoto { geometry, .. } => geometry.as_mut(),
        }
    }

    pub fn z_index(&self) -> i32 {
        match self {
            Element::PhotoSlot { z_index, .. }
            | Element::OverlayUpload { z_index, .. }
            | Element::Text { z_index, .. }
            | Element::Shape { z_index, .. }
            | Element::BackgroundPhoto { z_index, .. } => *z_index,
        }
    }

    pub fn is_photo_slot(&self) -> bool {
        matches!(self, Element::PhotoSlot { .. })
    }

    pub fn is_background(&self) -> bool {
        matches!(self, Element::BackgroundPhoto { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_slot_wire_format_uses_kebab_tag() {
        let json = r##"{
            "type": "photo-slot",
            "id": "slot-0",
            "geometry": { "x": 10, "y": 20, "width": 200, "height": 300 },
            "z_index": 100,
            "source_index": 1,
            "shape": { "kind": "circle" }
        }"##;
        let element: Element = serde_json::from_str(json).unwrap();
        match &element {
            Element::PhotoSlot {
                id,
                source_index,
                shape,
                ..
            } => {
                assert_eq!(id, "slot-0");
                assert_eq!(*source_index, Some(1));
                assert_eq!(*shape, SlotShape::Circle);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn overlay_upload_tag_round_trips() {
        let element = Element::OverlayUpload {
            id: "frame".into(),
            geometry: Some(Geometry::new(0.0, 0.0, 1080.0, 1920.0)),
            z_index: 10,
            asset: AssetRef {
                id: "frame-png".into(),
                path: None,
            },
            fit: FitMode::Contain,
        };
        let json = serde_json::to_string(&element).unwrap();
        assert!(json.contains("\"type\":\"overlay-upload\""));
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = r##"{ "type": "photo-slot", "id": "s" }"##;
        let element: Element = serde_json::from_str(json).unwrap();
        assert!(element.geometry().is_none());
        assert_eq!(element.z_index(), 0);
        match element {
            Element::PhotoSlot {
                source_index,
                shape,
                ..
            } => {
                assert_eq!(source_index, None);
                assert_eq!(shape, SlotShape::Rounded { radius: 0.0 });
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn text_defaults() {
        let json = r##"{
            "type": "text", "id": "caption",
            "content": "hello", "font_size": 32
        }"##;
        let element: Element = serde_json::from_str(json).unwrap();
        match element {
            Element::Text {
                align,
                valign,
                line_height,
                color,
                ..
            } => {
                assert_eq!(align, TextAlign::Left);
                assert_eq!(valign, VerticalAlign::Top);
                assert!((line_height - 1.2).abs() < 1e-9);
                assert_eq!(color, Color::WHITE);
            }
            _ => unreachable!(),
        }
    }
}
