//! Layout asset resolution.
//!
//! Assets (overlay graphics, background photos) resolve through an ordered
//! strategy list evaluated first-success-wins. The order is declarative so
//! precedence is visible in one place and unit-testable, instead of being
//! buried in nested fallback branches:
//!
//! 1. session cache
//! 2. caller-provided inline bytes
//! 3. filesystem path
//!
//! Filesystem reads get a small bounded retry chain for transient failures.
//! A failed asset degrades the element to a placeholder at paint time; it
//! never aborts the job.

use std::time::Duration;

use framebooth_common::{BoothError, BoothResult};
use framebooth_layout_model::AssetRef;
use image::RgbaImage;
use std::sync::Arc;

use crate::context::RenderContext;

/// Resolution strategies in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Cache,
    InlineBytes,
    Path,
}

/// The fixed strategy order shared by every asset lookup.
pub const STRATEGY_ORDER: &[Strategy] = &[Strategy::Cache, Strategy::InlineBytes, Strategy::Path];

/// Resolve an asset to a decoded RGBA raster.
///
/// `inline` carries bytes the caller already holds (e.g. an upload still in
/// memory). Successful path/bytes resolutions are cached for the session.
pub fn resolve_asset(
    ctx: &mut RenderContext,
    asset: &AssetRef,
    inline: Option<&[u8]>,
) -> BoothResult<Arc<RgbaImage>> {
    for strategy in STRATEGY_ORDER {
        match try_strategy(ctx, asset, inline, *strategy) {
            Some(Ok(image)) => return Ok(image),
            Some(Err(err)) => {
                tracing::warn!(
                    asset = %asset.id,
                    ?strategy,
                    error = %err,
                    "asset strategy failed, trying next"
                );
            }
            None => {}
        }
    }

    Err(BoothError::asset(format!(
        "asset '{}' could not be resolved by any strategy",
        asset.id
    )))
}

fn try_strategy(
    ctx: &mut RenderContext,
    asset: &AssetRef,
    inline: Option<&[u8]>,
    strategy: Strategy,
) -> Option<BoothResult<Arc<RgbaImage>>> {
    match strategy {
        Strategy::Cache => ctx.cached_asset(&asset.id).map(Ok),
        Strategy::InlineBytes => {
            let bytes = inline?;
            Some(decode_bytes(bytes).map(|image| ctx.cache_asset(&asset.id, image)))
        }
        Strategy::Path => {
            let path = asset.path.as_ref()?;
            let retries = ctx.defaults.asset_retries;
            let backoff = Duration::from_millis(ctx.defaults.asset_retry_backoff_ms);
            Some(
                read_with_retries(path, retries, backoff)
                    .and_then(|bytes| decode_bytes(&bytes))
                    .map(|image| ctx.cache_asset(&asset.id, image)),
            )
        }
    }
}

/// Read a file, retrying transient failures with doubling backoff.
fn read_with_retries(
    path: &std::path::Path,
    retries: u32,
    initial_backoff: Duration,
) -> BoothResult<Vec<u8>> {
    let mut backoff = initial_backoff;
    let mut attempt = 0;
    loop {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                // A missing file will not appear by waiting.
                return Err(BoothError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) if attempt < retries => {
                attempt += 1;
                tracing::debug!(
                    path = %path.display(),
                    attempt,
                    error = %err,
                    "transient asset read failure, backing off"
                );
                std::thread::sleep(backoff);
                backoff *= 2;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn decode_bytes(bytes: &[u8]) -> BoothResult<RgbaImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| BoothError::asset(format!("failed to decode asset: {e}")))?;
    Ok(image.to_rgba8())
}
