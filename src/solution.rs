use crate::error::SummaError;

/// One input value, identified by its position in the input list.
/// The index is the only stable identity; values may repeat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constituent {
    pub index: usize,
    pub value: f64,
}

impl Constituent {
    pub fn from_values(values: &[f64]) -> Vec<Self> {
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| Self { index, value })
            .collect()
    }
}

/// One target to satisfy, identified by its position in the input list.
/// Totals with equal targets are still distinct entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Total {
    pub index: usize,
    pub target: f64,
}

impl Total {
    pub fn from_targets(targets: &[f64]) -> Vec<Self> {
        targets
            .iter()
            .enumerate()
            .map(|(index, &target)| Self { index, target })
            .collect()
    }
}

/// Solution identity: one sorted index sequence per total, in total order.
pub type CanonicalKey = Vec<Vec<usize>>;

/// A complete assignment: for every total, the set of constituent indices
/// whose values sum to its target. Constituents absent from every bucket
/// are unused and carry no identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    buckets: Vec<Vec<usize>>,
}

impl Solution {
    /// Buckets are stored sorted so the canonical key never hashes an
    /// order-dependent collection.
    pub fn new(mut buckets: Vec<Vec<usize>>) -> Self {
        for bucket in &mut buckets {
            bucket.sort_unstable();
        }
        Self { buckets }
    }

    /// The indices assigned to one total.
    pub fn bucket(&self, total_index: usize) -> &[usize] {
        &self.buckets[total_index]
    }

    pub fn buckets(&self) -> &[Vec<usize>] {
        &self.buckets
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        self.buckets.clone()
    }

    /// Recomputes the sum of one bucket from the constituent list.
    pub fn check_sum(&self, total_index: usize, constituents: &[Constituent]) -> f64 {
        self.buckets[total_index]
            .iter()
            .map(|&i| constituents[i].value)
            .sum()
    }
}

/// Capacity pruning assumes every value can only grow a bucket's sum, so
/// negative inputs are rejected up front rather than searched incorrectly.
pub fn validate_domain(values: &[f64], targets: &[f64]) -> Result<(), SummaError> {
    for (index, &value) in values.iter().enumerate() {
        if value < 0.0 {
            return Err(SummaError::NegativeConstituent { index, value });
        }
    }
    for (index, &target) in targets.iter().enumerate() {
        if target < 0.0 {
            return Err(SummaError::NegativeTotal { index, target });
        }
    }
    Ok(())
}
