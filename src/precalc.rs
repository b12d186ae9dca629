//! Feature-response precompute engine.
//!
//! Split search touches every (feature, sample) response many times per
//! tree. Two caches amortise that cost, each bounded by a byte budget:
//!
//! - a **value cache** of raw responses, `num_precalc_val` rows wide;
//! - **pre-sorted index rows** in the working buffer, `num_precalc_idx`
//!   rows wide, each an argsort of one feature's responses.
//!
//! Features outside the cached ranges fall back to the representation at
//! query time. The fill runs as three passes over disjoint feature ranges,
//! each parallel across features with no cross-feature synchronisation:
//!
//! 1. features cached by index only: responses go to per-thread scratch,
//!    the argsort is kept, the values are discarded;
//! 2. features cached by value and index: one response pass fills the value
//!    row, the argsort reads it in place;
//! 3. features cached by value only.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayViewMut1, Axis, Slice};
use rayon::prelude::*;

use crate::storage::DataSource;
use crate::training::buffer::{SampleIdx, WorkBuffer};

// ============================================================================
// Layout derivation
// ============================================================================

/// How many features each cache covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecalcLayout {
    /// Rows of the value cache: features `[0, num_precalc_val)`.
    pub num_precalc_val: usize,
    /// Pre-sorted index rows: features `[0, num_precalc_idx)`.
    pub num_precalc_idx: usize,
}

impl PrecalcLayout {
    /// Derive cache widths from MiB budgets.
    ///
    /// A value row costs `4 * num_samples` bytes; a sorted-index row costs
    /// `index_width * num_samples`. Categorical stages never pre-sort, so
    /// `categorical` forces the index cache empty.
    pub fn derive(
        num_features: usize,
        num_samples: usize,
        val_budget_mib: usize,
        idx_budget_mib: usize,
        index_width: usize,
        categorical: bool,
    ) -> Self {
        if num_samples == 0 {
            return Self {
                num_precalc_val: 0,
                num_precalc_idx: 0,
            };
        }
        let num_precalc_val =
            (val_budget_mib * (1 << 20) / (4 * num_samples)).min(num_features);
        let num_precalc_idx = if categorical {
            0
        } else {
            (idx_budget_mib * (1 << 20) / (index_width * num_samples)).min(num_features)
        };
        Self {
            num_precalc_val,
            num_precalc_idx,
        }
    }
}

// ============================================================================
// Precompute passes
// ============================================================================

/// Fill the value cache and the root slot's sorted-index rows.
///
/// `val_cache` must be `num_precalc_val x num_samples`; `buf` must carry
/// `num_precalc_idx` sorted rows. Sorted rows are written into slot 0 (the
/// root's slot) as the identity-node argsort: ascending response, ties kept
/// in original sample order.
pub fn precalculate<I: SampleIdx>(
    source: &dyn DataSource,
    layout: PrecalcLayout,
    val_cache: &mut Array2<f32>,
    buf: &mut WorkBuffer<I>,
) {
    let n = source.num_samples();
    debug_assert_eq!(val_cache.nrows(), layout.num_precalc_val);
    debug_assert_eq!(buf.num_sorted(), layout.num_precalc_idx);

    let both = layout.num_precalc_val.min(layout.num_precalc_idx);
    let (both_block, idx_only_block) = buf.sorted_block_mut(0).split_at_mut(both * n);

    // Pass 1: index-only features [num_precalc_val, num_precalc_idx).
    idx_only_block
        .par_chunks_mut(n.max(1))
        .enumerate()
        .for_each(|(i, idx_row)| {
            let feature = both + i;
            let mut scratch = vec![0.0f32; n];
            for (si, v) in scratch.iter_mut().enumerate() {
                *v = source.response(feature, si);
            }
            argsort_into(idx_row, &scratch);
        });

    // Pass 2: features with both a value row and a sorted row.
    let mut both_rows = val_cache.slice_axis_mut(Axis(0), Slice::from(0..both));
    both_rows
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(both_block.par_chunks_mut(n.max(1)))
        .enumerate()
        .for_each(|(feature, (mut val_row, idx_row))| {
            fill_responses(source, feature, &mut val_row);
            argsort_into(idx_row, val_row.as_slice().expect("value rows are contiguous"));
        });

    // Pass 3: value-only features [min, num_precalc_val).
    let mut val_only_rows =
        val_cache.slice_axis_mut(Axis(0), Slice::from(both..layout.num_precalc_val));
    val_only_rows
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut val_row)| {
            fill_responses(source, both + i, &mut val_row);
        });
}

fn fill_responses(source: &dyn DataSource, feature: usize, row: &mut ArrayViewMut1<'_, f32>) {
    for (si, v) in row.iter_mut().enumerate() {
        *v = source.response(feature, si);
    }
}

/// Write the argsort of `values` into `idx_row`: ascending response,
/// ties broken by original sample index.
fn argsort_into<I: SampleIdx>(idx_row: &mut [I], values: &[f32]) {
    for (i, v) in idx_row.iter_mut().enumerate() {
        *v = I::from_usize(i);
    }
    idx_row.sort_unstable_by(|&a, &b| {
        values[a.index()]
            .partial_cmp(&values[b.index()])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index().cmp(&b.index()))
    });
}

// ============================================================================
// Tests
// ============================================================================
