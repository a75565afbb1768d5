use std::collections::VecDeque;

use crate::solution::{Constituent, Total};

/// The root of one independent search subtree: the first `next`
/// constituents have a decided fate, captured by the buckets and the
/// remaining per-total needs. Frames fixing different prefixes are
/// disjoint, so their subtrees can be searched in parallel with no
/// coordination beyond the shared result channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub next: usize,
    pub remaining: Vec<f64>,
    pub buckets: Vec<Vec<usize>>,
}

impl Frame {
    /// The whole untouched search space.
    pub fn root(totals: &[Total]) -> Self {
        Self {
            next: 0,
            remaining: totals.iter().map(|t| t.target).collect(),
            buckets: vec![Vec::new(); totals.len()],
        }
    }
}

/// Precomputed work units for the parallel driver, built by expanding the
/// root frame breadth-first until there are enough subtrees to keep the
/// workers busy. Expansion uses the same branching and capacity pruning
/// as the search itself, so no frame roots a provably dead subtree.
#[derive(Debug)]
pub struct Frontier {
    frames: Vec<Frame>,
}

impl Frontier {
    pub fn new(
        constituents: &[Constituent],
        totals: &[Total],
        tolerance: f64,
        min_frames: usize,
    ) -> Self {
        let mut queue = VecDeque::from([Frame::root(totals)]);
        let mut leaves: Vec<Frame> = Vec::new();

        while queue.len() + leaves.len() < min_frames {
            let Some(frame) = queue.pop_front() else {
                break;
            };

            // Fully decided; nothing left to split
            if frame.next == constituents.len() {
                leaves.push(frame);
                continue;
            }

            // Unused branch
            let mut child = frame.clone();
            child.next += 1;
            queue.push_back(child);

            let value = constituents[frame.next].value;
            for t in 0..totals.len() {
                let prev = frame.remaining[t];
                if prev <= tolerance || prev + tolerance < value {
                    continue;
                }

                let mut child = frame.clone();
                child.remaining[t] = prev - value;
                child.buckets[t].push(frame.next);
                child.next += 1;
                queue.push_back(child);
            }
        }

        let mut frames = leaves;
        frames.extend(queue);
        frames.shrink_to_fit();

        Self { frames }
    }

    /// Returns the number of work units.
    pub fn frames_number(&self) -> usize {
        self.frames.len()
    }

    /// Returns a reference to the i-th work unit.
    pub fn frame(&self, i: usize) -> &Frame {
        assert!(i < self.frames.len());
        &self.frames[i]
    }
}
