//! Continuity reconciliation between two channel label sets
//!
//! A channel whose neighbourhood is dominated by the other label is moved to
//! that label: for every index of `set_a` (ascending), count the members of
//! `set_b` within `±adjacent`. When the count reaches
//! `2 * adjacent + 1 - toleration`, the index moves to `set_b`.
//!
//! The scan runs over a frozen snapshot of `set_a`, while `set_b` grows as
//! moves happen, so a channel moved early in the pass counts towards the
//! neighbourhoods of later ones.

use std::collections::BTreeSet;

use tracing::debug;

/// Adjacency-density reclassification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityReconciler {
    /// Neighbourhood half-width (channels)
    pub adjacent: usize,
    /// Neighbourhood members (the channel itself included) allowed to disagree
    pub toleration: usize,
}

impl ContinuityReconciler {
    pub const fn new(adjacent: usize, toleration: usize) -> Self {
        Self {
            adjacent,
            toleration,
        }
    }

    /// Members of the other set needed in a neighbourhood to move a channel.
    pub const fn required_neighbours(&self) -> usize {
        (2 * self.adjacent + 1).saturating_sub(self.toleration)
    }

    /// Move channels of `set_a` that sit inside dense runs of `set_b`.
    ///
    /// The two inputs must be disjoint. Returns `(set_a', set_b')`, both
    /// ascending; `set_a'.len() + set_b'.len()` equals the input total.
    pub fn reconcile(&self, set_a: &[usize], set_b: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut snapshot = set_a.to_vec();
        snapshot.sort_unstable();
        snapshot.dedup();

        let mut destination: BTreeSet<usize> = set_b.iter().copied().collect();
        debug_assert!(
            snapshot.iter().all(|c| !destination.contains(c)),
            "continuity sets must be disjoint"
        );

        let required = self.required_neighbours();
        let mut kept = Vec::with_capacity(snapshot.len());
        let mut moved = 0usize;

        for chn in snapshot {
            let lo = chn.saturating_sub(self.adjacent);
            let hi = chn.saturating_add(self.adjacent);
            let neighbours = destination.range(lo..=hi).count();
            if neighbours >= required {
                destination.insert(chn);
                moved += 1;
            } else {
                kept.push(chn);
            }
        }

        debug!(
            moved,
            adjacent = self.adjacent,
            toleration = self.toleration,
            "Continuity pass complete"
        );

        (kept, destination.into_iter().collect())
    }
}
