//! Fixed-capacity FIFO window of the most recent feature vectors.

use super::FeatureVector;
use std::collections::VecDeque;

/// Oldest-first ring of feature vectors. Insertion order defines recency;
/// once full every push evicts exactly one element from the front.
#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    capacity: usize,
    items: VecDeque<FeatureVector>,
}

impl SequenceBuffer {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, vector: FeatureVector) {
        debug_assert!(
            self.items
                .front()
                .map_or(true, |f| f.dim() == vector.dim()),
            "vector arity changed within one buffer"
        );
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(vector);
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the window, oldest first. Vectors share their channel storage
    /// with the buffer but are immutable, so callers cannot alter it.
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
