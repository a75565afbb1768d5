use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Sender, unbounded};

use crate::canon::Canonicalizer;
use crate::error::SummaError;
use crate::frontier::Frame;
use crate::solution::{Constituent, Solution, Total, validate_domain};

/// Optional operational cap on the number of search nodes visited, shared
/// across all workers. Exhaustion stops the search early; the caller must
/// report the enumeration as incomplete, never silently truncated.
pub struct NodeBudget {
    cap: u64,
    visited: AtomicU64,
}

impl NodeBudget {
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            visited: AtomicU64::new(0),
        }
    }

    /// Accounts for one node. Returns false once the cap is spent.
    #[inline]
    pub fn consume(&self) -> bool {
        self.visited.fetch_add(1, Ordering::Relaxed) < self.cap
    }

    pub fn exhausted(&self) -> bool {
        self.visited.load(Ordering::Relaxed) >= self.cap
    }
}

/// Temporary mutable state passed during the recursive search.
/// Decoupled from SearchThread so &self and &mut state can coexist across
/// the recursive calls. Mutations are push/pop restored on backtrack, so
/// sibling branches never observe each other's assignments.
struct SearchState {
    /// Per total, the amount still needed to reach its target.
    remaining: Vec<f64>,
    /// Per total, the constituent indices assigned so far.
    buckets: Vec<Vec<usize>>,
}

/// Not a real thread, a searcher object owning one subtree of the space.
/// Immutable context is shared through Arcs; results go out on the channel.
pub struct SearchThread {
    constituents: Arc<Vec<Constituent>>,
    totals: Arc<Vec<Total>>,
    /// suffix_sums[i] = sum of constituent values from i onward.
    suffix_sums: Arc<Vec<f64>>,
    tolerance: f64,
    budget: Option<Arc<NodeBudget>>,
    sender: Sender<Solution>,
}

impl SearchThread {
    pub fn new(
        constituents: Arc<Vec<Constituent>>,
        totals: Arc<Vec<Total>>,
        suffix_sums: Arc<Vec<f64>>,
        tolerance: f64,
        budget: Option<Arc<NodeBudget>>,
        sender: Sender<Solution>,
    ) -> Self {
        Self {
            constituents,
            totals,
            suffix_sums,
            tolerance,
            budget,
            sender,
        }
    }

    pub fn suffix_sums(values: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; values.len() + 1];
        for i in (0..values.len()).rev() {
            sums[i] = sums[i + 1] + values[i];
        }
        sums
    }

    /// Exhausts the subtree rooted at `frame`.
    pub fn run(&mut self, frame: &Frame) {
        let mut state = SearchState {
            remaining: frame.remaining.clone(),
            buckets: frame.buckets.clone(),
        };

        self.search(frame.next, &mut state);
    }

    /// Recursive search function. Decides the fate of one constituent per
    /// level: left unused, or assigned to any total that still admits it.
    fn search(&self, index: usize, state: &mut SearchState) {
        if let Some(budget) = &self.budget {
            if !budget.consume() {
                return;
            }
        }

        // Base case: every constituent decided
        debug_assert!(index <= self.constituents.len());
        if index == self.constituents.len() {
            if state.remaining.iter().all(|r| r.abs() <= self.tolerance) {
                let _ = self.sender.send(Solution::new(state.buckets.clone()));
            }
            return;
        }

        // Reachability pruning: the values left cannot cover what the
        // totals still need
        let needed: f64 = state.remaining.iter().sum();
        if self.suffix_sums[index] + self.tolerance < needed {
            return;
        }

        // Leave this constituent unused
        self.search(index + 1, state);

        let value = self.constituents[index].value;
        for t in 0..self.totals.len() {
            // Capacity pruning: skip satisfied totals and overshoots
            let prev = state.remaining[t];
            if prev <= self.tolerance || prev + self.tolerance < value {
                continue;
            }

            state.remaining[t] = prev - value;
            state.buckets[t].push(index);

            self.search(index + 1, state);

            // Backtracking; restore the saved value so float drift cannot
            // accumulate down long branches
            state.buckets[t].pop();
            state.remaining[t] = prev;
        }
    }
}

/// The fully collected result of one enumeration. `complete` is false only
/// when a node budget ran out before the space was covered.
#[derive(Debug)]
pub struct Enumeration {
    pub solutions: Vec<Solution>,
    pub complete: bool,
}

/// Sequential entry point: validate, search the whole space from the root,
/// canonicalize, collect in first-seen order. The search is a pure function
/// of its inputs; re-running it yields the same solution set.
pub fn enumerate(
    values: &[f64],
    targets: &[f64],
    tolerance: f64,
    max_nodes: Option<u64>,
) -> Result<Enumeration, SummaError> {
    validate_domain(values, targets)?;

    let constituents = Arc::new(Constituent::from_values(values));
    let totals = Arc::new(Total::from_targets(targets));
    let suffix_sums = Arc::new(SearchThread::suffix_sums(values));
    let budget = max_nodes.map(|cap| Arc::new(NodeBudget::new(cap)));

    let root = Frame::root(&totals);
    let (sender, receiver) = unbounded();

    let mut search_thread = SearchThread::new(
        constituents,
        totals,
        suffix_sums,
        tolerance,
        budget.clone(),
        sender,
    );
    search_thread.run(&root);
    drop(search_thread);

    let mut canon = Canonicalizer::new();
    let solutions = receiver.try_iter().filter(|s| canon.admit(s)).collect();
    let complete = budget.map_or(true, |b| !b.exhausted());

    Ok(Enumeration {
        solutions,
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::CanonicalKey;
    use std::collections::HashSet;

    const TOL: f64 = 1e-4;

    fn key_set(solutions: &[Solution]) -> HashSet<CanonicalKey> {
        solutions.iter().map(|s| s.canonical_key()).collect()
    }

    fn key(buckets: &[&[usize]]) -> CanonicalKey {
        buckets.iter().map(|b| b.to_vec()).collect()
    }

    /// Reference enumeration: every assignment is a base-(m+1) digit string
    /// over the constituents (0 = unused, t+1 = total t), filtered for
    /// exact sums. Only usable for tiny inputs.
    fn brute_force(values: &[f64], targets: &[f64], tolerance: f64) -> HashSet<CanonicalKey> {
        let n = values.len();
        let m = targets.len();
        let mut keys = HashSet::new();

        let mut assignment = vec![0usize; n];
        loop {
            let mut sums = vec![0.0; m];
            let mut buckets = vec![Vec::new(); m];
            for (i, &choice) in assignment.iter().enumerate() {
                if choice > 0 {
                    sums[choice - 1] += values[i];
                    buckets[choice - 1].push(i);
                }
            }
            if sums
                .iter()
                .zip(targets)
                .all(|(s, t)| (s - t).abs() <= tolerance)
            {
                keys.insert(buckets);
            }

            // next digit string
            let mut pos = 0;
            loop {
                if pos == n {
                    return keys;
                }
                assignment[pos] += 1;
                if assignment[pos] <= m {
                    break;
                }
                assignment[pos] = 0;
                pos += 1;
            }
        }
    }

    #[test]
    fn test_concrete_scenario_six_values_two_totals() {
        let result = enumerate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[12.0, 9.0], TOL, None).unwrap();
        assert!(result.complete);
        assert_eq!(result.solutions.len(), 5);

        let expected: HashSet<CanonicalKey> = [
            key(&[&[0, 1, 3, 4], &[2, 5]]),
            key(&[&[1, 3, 5], &[0, 2, 4]]),
            key(&[&[2, 3, 4], &[0, 1, 5]]),
            key(&[&[0, 4, 5], &[1, 2, 3]]),
            key(&[&[0, 1, 2, 5], &[3, 4]]),
        ]
        .into_iter()
        .collect();

        assert_eq!(key_set(&result.solutions), expected);
    }

    #[test]
    fn test_sum_correctness_and_disjointness() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let targets = [12.0, 9.0];
        let constituents = Constituent::from_values(&values);
        let result = enumerate(&values, &targets, TOL, None).unwrap();

        for solution in &result.solutions {
            let mut used = HashSet::new();
            for (t, target) in targets.iter().enumerate() {
                assert!((solution.check_sum(t, &constituents) - target).abs() <= TOL);
                for &i in solution.bucket(t) {
                    assert!(used.insert(i), "constituent {} used twice", i);
                }
            }
        }
    }

    #[test]
    fn test_distinctness() {
        let result = enumerate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[12.0, 9.0], TOL, None).unwrap();
        let keys = key_set(&result.solutions);
        assert_eq!(keys.len(), result.solutions.len());
    }

    #[test]
    fn test_identity_is_by_index_not_value() {
        let result = enumerate(&[5.0, 5.0], &[5.0], TOL, None).unwrap();
        let expected: HashSet<CanonicalKey> = [key(&[&[0]]), key(&[&[1]])].into_iter().collect();
        assert_eq!(key_set(&result.solutions), expected);
    }

    #[test]
    fn test_empty_totals_yields_the_empty_assignment() {
        let result = enumerate(&[1.0, 2.0, 3.0], &[], TOL, None).unwrap();
        assert_eq!(result.solutions.len(), 1);
        assert!(result.solutions[0].buckets().is_empty());
    }

    #[test]
    fn test_unreachable_total_yields_nothing() {
        let result = enumerate(&[1.0, 2.0, 3.0], &[100.0], TOL, None).unwrap();
        assert!(result.complete);
        assert!(result.solutions.is_empty());
    }

    #[test]
    fn test_no_constituents_no_solutions_unless_totals_are_zero() {
        let result = enumerate(&[], &[7.0], TOL, None).unwrap();
        assert!(result.solutions.is_empty());

        let result = enumerate(&[], &[0.0], TOL, None).unwrap();
        assert_eq!(result.solutions.len(), 1);
    }

    #[test]
    fn test_tolerance_absorbs_float_noise() {
        // 0.1 + 0.2 != 0.3 in binary; tolerance must still match it
        let result = enumerate(&[0.1, 0.2, 0.3], &[0.6], TOL, None).unwrap();
        assert_eq!(result.solutions.len(), 1);
        assert_eq!(result.solutions[0].bucket(0), &[0, 1, 2]);
    }

    #[test]
    fn test_completeness_against_brute_force() {
        let values = [2.5, 4.0, 1.5, 4.0, 3.0, 6.0, 0.5, 2.0];
        let targets = [6.5, 6.0];

        let result = enumerate(&values, &targets, TOL, None).unwrap();
        assert_eq!(
            key_set(&result.solutions),
            brute_force(&values, &targets, TOL)
        );
    }

    #[test]
    fn test_determinism_across_runs() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let targets = [10.0, 11.0];

        let first = enumerate(&values, &targets, TOL, None).unwrap();
        let second = enumerate(&values, &targets, TOL, None).unwrap();
        assert_eq!(key_set(&first.solutions), key_set(&second.solutions));
    }

    #[test]
    fn test_negative_value_is_rejected() {
        assert!(enumerate(&[1.0, -2.0], &[3.0], TOL, None).is_err());
    }

    #[test]
    fn test_node_budget_exhaustion_is_flagged() {
        let starved =
            enumerate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[12.0, 9.0], TOL, Some(1)).unwrap();
        assert!(!starved.complete);
        assert!(starved.solutions.len() < 5);

        let roomy = enumerate(
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &[12.0, 9.0],
            TOL,
            Some(1_000_000),
        )
        .unwrap();
        assert!(roomy.complete);
        assert_eq!(roomy.solutions.len(), 5);
    }
}
