use ahash::HashSetExt;
use fxhash::FxHashSet;

use crate::solution::{CanonicalKey, Solution};

/// Collapses the raw solution stream to structurally distinct solutions,
/// preserving first-seen order. Two solutions are identical iff every
/// total receives exactly the same index set; which paths the search took
/// to reach them does not matter.
///
/// Must stay single-owner: the seen set is the only shared-mutable state
/// in the whole pipeline, so the collector thread holds it alone.
pub struct Canonicalizer {
    seen: FxHashSet<CanonicalKey>,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self {
            seen: FxHashSet::new(),
        }
    }

    /// Returns true the first time this solution's canonical key appears.
    pub fn admit(&mut self, solution: &Solution) -> bool {
        self.seen.insert(solution.canonical_key())
    }

    pub fn distinct_count(&self) -> usize {
        self.seen.len()
    }
}
