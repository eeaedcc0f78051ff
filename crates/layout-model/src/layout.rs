//! Layout definition: the designed frame captured media is composited onto.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::element::Element;

/// A designed frame layout.
///
/// Produced by the external draft subsystem and treated as immutable for the
/// duration of one export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDefinition {
    /// Canonical canvas width in pixels.
    pub canvas_width: u32,

    /// Canonical canvas height in pixels.
    pub canvas_height: u32,

    /// Fill painted before any element.
    #[serde(default)]
    pub background: Color,

    /// Ordered element list. Order is the stable tie-break for equal
    /// z-indices.
    pub elements: Vec<Element>,
}

impl LayoutDefinition {
    /// Photo-slot elements in layout order.
    pub fn photo_slots(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_photo_slot())
    }

    /// Declared source indices of the photo slots, in layout order.
    pub fn declared_slot_sources(&self) -> Vec<Option<usize>> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::PhotoSlot { source_index, .. } => Some(*source_index),
                _ => None,
            })
            .collect()
    }

    /// Basic structural validation: nonzero canvas and unique element ids.
    pub fn validate(&self) -> Result<(), LayoutValidationError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(LayoutValidationError::EmptyCanvas);
        }
        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.id()) {
                return Err(LayoutValidationError::DuplicateId(element.id().to_string()));
            }
        }
        Ok(())
    }
}

/// Structural problems in a layout definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutValidationError {
    #[error("layout canvas has zero area")]
    EmptyCanvas,

    #[error("duplicate element id: {0}")]
    DuplicateId(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Geometry, SlotShape};

    fn slot(id: &str, source_index: Option<usize>) -> Element {
        Element::PhotoSlot {
            id: id.to_string(),
            geometry: Some(Geometry::new(0.0, 0.0, 100.0, 100.0)),
            z_index: 0,
            source_index,
            shape: SlotShape::default(),
        }
    }

    #[test]
    fn declared_slot_sources_preserve_order() {
        let layout = LayoutDefinition {
            canvas_width: 1080,
            canvas_height: 1920,
            background: Color::WHITE,
            elements: vec![slot("a", Some(2)), slot("b", None), slot("c", Some(0))],
        };
        assert_eq!(
            layout.declared_slot_sources(),
            vec![Some(2), None, Some(0)]
        );
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let layout = LayoutDefinition {
            canvas_width: 1080,
            canvas_height: 1920,
            background: Color::WHITE,
            elements: vec![slot("a", None), slot("a", None)],
        };
        assert_eq!(
            layout.validate(),
            Err(LayoutValidationError::DuplicateId("a".into()))
        );
    }

    #[test]
    fn validate_rejects_zero_canvas() {
        let layout = LayoutDefinition {
            canvas_width: 0,
            canvas_height: 1920,
            background: Color::WHITE,
            elements: vec![],
        };
        assert_eq!(layout.validate(), Err(LayoutValidationError::EmptyCanvas));
    }

    #[test]
    fn layout_json_round_trip() {
        let layout = LayoutDefinition {
            canvas_width: 1080,
            canvas_height: 1920,
            background: Color::parse_hex("#f0f0f0").unwrap(),
            elements: vec![slot("slot-1", Some(0))],
        };
        let json = serde_json::to_string(&layout).unwrap();
        let back: LayoutDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }
}
