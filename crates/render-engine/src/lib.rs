//! Framebooth Render Engine
//!
//! Composites captured media onto designed layouts and exports flattened
//! stills or silent looping videos that match the live preview exactly.
//!
//! # Pipeline Architecture
//!
//! ```text
//! layout.json ───► normalize ───► slot assignment ──┐
//!                                                   │
//! photos ────────► asset resolve ───────────────────┤
//!                                                   ├──► LayerCompositor ──► still artifact
//! clips ─────────► ClipSource decode ───────────────┤            │
//!                                                   │            ▼
//! filters / transforms ─────────────────────────────┘    VideoSynthesizer
//!                                                                │
//!                                                                ▼
//!                                                        ExportEncoder (ffmpeg)
//!                                                                │
//!                                                                ▼
//!                                                          video artifact
//! ```

pub mod assets;
pub mod clips;
pub mod compositor;
pub mod context;
pub mod encoder;
pub mod export;
pub mod synthesizer;
pub mod text;

pub use context::RenderContext;
pub use export::*;
