//! Frame timeline utilities for the draw/encode loop.
//!
//! The synthesis loop is driven by media time, not wall time: frame N of an
//! export always maps to `N / fps` seconds regardless of how fast the host
//! renders. This keeps exported output deterministic and lets tests walk the
//! timeline without sleeping.

/// An iterator over the frame grid of a fixed-rate timeline.
///
/// Yields `(frame_index, time_secs)` pairs from zero up to (and including)
/// the last frame whose timestamp is below `end_secs`.
#[derive(Debug, Clone)]
pub struct FrameTimeline {
    fps: u32,
    end_secs: f64,
    next_frame: u64,
}

impl FrameTimeline {
    /// Create a timeline covering `[0, end_secs)` at the given frame rate.
    pub fn new(fps: u32, end_secs: f64) -> Self {
        Self {
            fps: fps.max(1),
            end_secs: end_secs.max(0.0),
            next_frame: 0,
        }
    }

    /// The frame rate this timeline ticks at.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Total number of frames this timeline will yield.
    pub fn total_frames(&self) -> u64 {
        (self.end_secs * self.fps as f64).ceil() as u64
    }

    /// Media timestamp of a given frame index.
    pub fn time_of(&self, frame: u64) -> f64 {
        frame as f64 / self.fps as f64
    }
}

impl Iterator for FrameTimeline {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<(u64, f64)> {
        let t = self.time_of(self.next_frame);
        if t >= self.end_secs {
            return None;
        }
        let frame = self.next_frame;
        self.next_frame += 1;
        Some((frame, t))
    }
}

/// Convert an elapsed nanosecond value to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Convert seconds to nanoseconds.
pub fn secs_to_ns(secs: f64) -> u64 {
    (secs * 1_000_000_000.0) as u64
}
