//! Framebooth Compose Core
//!
//! Deterministic compositing math shared by the still and video export
//! paths:
//! - **Normalization:** unit-system detection and canonical-pixel conversion
//! - **Slot assignment:** the duplication/wrap rule mapping N captured
//!   sources onto M layout slots
//! - **Filter pipeline:** the fixed 6-stage per-pixel color transform
//! - **Gestures:** pointer-agnostic zoom/pan deltas applied to transforms
//!
//! This crate is pure computation — no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod filter;
pub mod gesture;
pub mod normalize;
pub mod slots;

pub use filter::apply_filters;
pub use normalize::{detect_unit_system, normalize_layout, UnitSystem};
pub use slots::assign_sources;
