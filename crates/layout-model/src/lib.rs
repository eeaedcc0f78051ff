//! Framebooth Layout Model
//!
//! Defines the core data contracts for Framebooth exports:
//! - **Layouts:** canvas geometry, background, and the ordered element list
//! - **Elements:** exhaustive tagged union of everything a layout can paint
//! - **Media:** captured photos and clips, per-slot transforms, filter settings
//!
//! Layouts arrive as JSON from the external draft subsystem and may use any
//! of three coordinate unit systems; geometry is only trustworthy after the
//! compose-core normalizer has converted it to canonical pixels.

pub mod color;
pub mod element;
pub mod layout;
pub mod media;

pub use color::*;
pub use element::*;
pub use layout::*;
pub use media::*;
