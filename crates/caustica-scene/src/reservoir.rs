//! Uniform reservoir sampling over a stream of candidates.

use rand::Rng;

/// Keeps a uniform random subset of at most `capacity` candidates from a
/// stream of unknown length.
#[derive(Debug, Clone)]
pub struct ReservoirSampler<T> {
    slots: Vec<T>,
    capacity: usize,
    seen: usize,
}

impl<T> ReservoirSampler<T> {
    /// An empty reservoir.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            seen: 0,
        }
    }

    /// Offer a candidate. Returns whether it was stored.
    pub fn observe<R: Rng + ?Sized>(&mut self, candidate: T, rng: &mut R) -> bool {
        self.seen += 1;
        if self.slots.len() < self.capacity {
            self.slots.push(candidate);
            return true;
        }
        let j = rng.gen_range(0..self.seen);
        if j < self.capacity {
            self.slots[j] = candidate;
            true
        } else {
            false
        }
    }

    /// Number of candidates offered so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Consume the reservoir, returning the kept candidates.
    pub fn into_samples(self) -> Vec<T> {
        self.slots
    }
}
