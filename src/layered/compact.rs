//! Merging pass-through layers.
//!
//! A pass-through layer has no owner and exactly one dependent. Nothing can
//! observe it except through that dependent, so its diff can be folded into
//! the dependent's and the layer spliced out of the chain. Compaction runs
//! from the layer being read down to the bottom of its chain.
//!
//! An unowned layer with two or more dependents is left alone. Merging it
//! would mean copying its diff into every branch above it, and there is no
//! obviously right policy for that, so such a layer simply stays until all
//! but one branch is gone.

use rustc_hash::FxHashMap;

use crate::arena::Id;

use super::Stack;

/// Combine a diff with the diff directly beneath it.
///
/// Entries of `upper` win. The smaller map is folded into the larger one so
/// the work done is bounded by the smaller side.
pub fn fold<T>(upper: FxHashMap<u32, T>, lower: FxHashMap<u32, T>) -> FxHashMap<u32, T> {
    if upper.len() >= lower.len() {
        let mut merged = upper;
        for (cell, value) in lower {
            merged.entry(cell).or_insert(value);
        }
        return merged;
    }
    let mut merged = lower;
    merged.extend(upper);
    return merged;
}

impl<T> Stack<T> {
    /// Merge every pass-through layer at or below `top`.
    pub(super) fn compact(&mut self, top: Id) {
        let mut current = top;
        loop {
            let Some(below) = self.layers[current].below else {
                return;
            };
            let lower = &self.layers[below];
            if lower.owners == 0 && lower.dependents.len() == 1 {
                debug_assert_eq!(lower.dependents[0], current);
                self.merge_down(current, below);
                continue;
            }
            if lower.owners == 0 {
                self.stats.splits_skipped += 1;
                tracing::debug!(
                    layer = ?below,
                    dependents = lower.dependents.len(),
                    "split below; not compacting"
                );
            }
            current = below;
        }
    }

    /// Fold `lower` into `upper` and splice `lower` out.
    fn merge_down(&mut self, upper: Id, lower: Id) {
        let removed = self.layers.remove(lower);
        let diff = std::mem::take(&mut self.layers[upper].diff);
        let layer = &mut self.layers[upper];
        layer.diff = fold(diff, removed.diff);
        layer.below = removed.below;
        if let Some(below) = removed.below {
            for dependent in self.layers[below].dependents.iter_mut() {
                if *dependent == lower {
                    *dependent = upper;
                }
            }
        }
        self.stats.merges += 1;
        tracing::trace!(into = ?upper, merged = ?lower, "merged pass-through layer");
    }
}
