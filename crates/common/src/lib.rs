//! Framebooth Common Utilities
//!
//! Shared infrastructure for all Framebooth crates:
//! - Error types and result aliases
//! - Frame timeline utilities for the draw/encode loop
//! - Cooperative cancellation flag
//! - Tracing/logging initialization
//! - Configuration loading

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use cancel::*;
pub use clock::*;
pub use config::*;
pub use error::*;
