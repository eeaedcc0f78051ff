//! Slot-to-source assignment.
//!
//! Captured media rarely matches the layout one-to-one: a strip layout may
//! hold six slots while the session captured three photos, or four video
//! slots may share a single clip. The assignment rule below is the single
//! definition both export paths use; the still and video pipelines must
//! never diverge here.

/// Map `declared` slot source indices onto `source_count` captured sources.
///
/// Returns one entry per slot:
/// - `source_count == 0`: every slot is `None` (placeholder), never an error.
/// - `N >= M`: each slot uses its declared index (or its own position when
///   the layout declared none), wrapped modulo N.
/// - `N < M`: slots are split into `ceil(M / N)`-long consecutive runs, one
///   run per source in order, with the final source absorbing any remainder.
///
/// Deterministic and idempotent: identical inputs always produce identical
/// output.
pub fn assign_sources(declared: &[Option<usize>], source_count: usize) -> Vec<Option<usize>> {
    let slot_count = declared.len();
    if source_count == 0 {
        return vec![None; slot_count];
    }

    if source_count >= slot_count {
        return declared
            .iter()
            .enumerate()
            .map(|(position, declared_index)| {
                Some(declared_index.unwrap_or(position) % source_count)
            })
            .collect();
    }

    // Fewer sources than slots: paired/grouped duplication. Declared
    // indices are ignored so adjacent slots share a source.
    let run_length = slot_count.div_ceil(source_count);
    (0..slot_count)
        .map(|position| Some((position / run_length).min(source_count - 1)))
        .collect()
}
