//! Layout geometry normalization.
//!
//! Layouts arrive in one of three coordinate unit systems depending on which
//! designer tool authored them: normalized fractions of the canvas,
//! centimeters against a fixed physical print reference, or pixels. All
//! geometry must be converted to canonical pixel space before any paint
//! operation; detection keys off the largest width/height observed across
//! elements that carry geometry.

use framebooth_layout_model::{Geometry, LayoutDefinition};

/// Physical reference sheet, in centimeters, that centimeter-unit layouts
/// are authored against.
pub const CM_REFERENCE_WIDTH: f64 = 10.8;
pub const CM_REFERENCE_HEIGHT: f64 = 19.2;

/// Upper bound (exclusive) below which dimensions are read as centimeters.
const CM_DETECTION_LIMIT: f64 = 20.0;

/// Coordinate unit system a layout's geometry is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    /// Fractions of the canvas dimensions, in [0, 1].
    Normalized,
    /// Centimeters against the physical reference sheet.
    Centimeters,
    /// Already canonical pixels.
    Pixels,
}

/// Detect the unit system from element geometry.
///
/// Detection inspects the largest width/height among elements that have
/// geometry. Mid-range ambiguity (a maximum that could be either a large
/// fraction stack or a small centimeter sheet) is resolved by inspecting one
/// representative element's width. Layouts with no geometry at all are
/// unclassifiable; the lenient fallback is `Pixels`, logged loudly rather
/// than silently assumed.
pub fn detect_unit_system(elements: &[framebooth_layout_model::Element]) -> UnitSystem {
    let geometries: Vec<&Geometry> = elements.iter().filter_map(|e| e.geometry()).collect();

    let Some(max_dim) = geometries
        .iter()
        .map(|g| g.max_dimension())
        .fold(None::<f64>, |acc, d| Some(acc.map_or(d, |m| m.max(d))))
    else {
        tracing::warn!("layout has no element geometry; unit detection inconclusive, assuming pixels");
        return UnitSystem::Pixels;
    };

    if max_dim <= 1.0 {
        return UnitSystem::Normalized;
    }

    if max_dim < CM_DETECTION_LIMIT {
        // Mid-range: a layout mixing sub-1.0 fractions with a slightly
        // overshooting value lands here too. One representative element's
        // width disambiguates.
        let representative = geometries[0].width;
        if representative < 1.0 {
            tracing::warn!(
                max_dim,
                representative,
                "ambiguous mid-range geometry resolved as normalized fractions"
            );
            return UnitSystem::Normalized;
        }
        return UnitSystem::Centimeters;
    }

    UnitSystem::Pixels
}

/// Convert all element geometry in `layout` to integer-rounded canonical
/// pixels. Elements without geometry are untouched.
pub fn normalize_layout(layout: &LayoutDefinition) -> LayoutDefinition {
    let unit = detect_unit_system(&layout.elements);
    let mut normalized = layout.clone();

    let canvas_w = layout.canvas_width as f64;
    let canvas_h = layout.canvas_height as f64;

    for element in &mut normalized.elements {
        let Some(geometry) = element.geometry_mut() else {
            continue;
        };
        *geometry = convert_geometry(*geometry, unit, canvas_w, canvas_h);
    }

    tracing::debug!(?unit, elements = normalized.elements.len(), "layout normalized");
    normalized
}

fn convert_geometry(g: Geometry, unit: UnitSystem, canvas_w: f64, canvas_h: f64) -> Geometry {
    let converted = match unit {
        UnitSystem::Normalized => Geometry {
            x: g.x * canvas_w,
            y: g.y * canvas_h,
            width: g.width * canvas_w,
            height: g.height * canvas_h,
            rotation: g.rotation,
        },
        UnitSystem::Centimeters => {
            // One factor for both axes: centimeter sheets share the canvas
            // aspect, so width alone anchors the scale.
            let factor = canvas_w / CM_REFERENCE_WIDTH;
            Geometry {
                x: g.x * factor,
                y: g.y * factor,
                width: g.width * factor,
                height: g.height * factor,
                rotation: g.rotation,
            }
        }
        UnitSystem::Pixels => g,
    };

    Geometry {
        x: converted.x.round(),
        y: converted.y.round(),
        width: converted.width.round(),
        height: converted.height.round(),
        rotation: converted.rotation,
    }
}
