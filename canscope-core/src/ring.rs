use std::collections::VecDeque;

pub type Sample = u64;

/// Fixed-capacity FIFO store of payload magnitudes for one arbitration id.
/// Freshly created buffers are pre-filled with zeros so a newly observed id
/// immediately has a full, plottable window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut samples = VecDeque::with_capacity(capacity);
        samples.extend(std::iter::repeat(0).take(capacity));
        Self { samples, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn append(&mut self, value: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Rebuild at a new capacity, preserving order. Growth pads at the front
    /// by repeating the oldest retained value; shrinking keeps the newest
    /// entries. Bounds are the caller's responsibility.
    pub fn resize(&mut self, capacity: usize) {
        if capacity == self.capacity {
            return;
        }
        if capacity < self.samples.len() {
            let excess = self.samples.len() - capacity;
            self.samples.drain(..excess);
        } else {
            let oldest = self.samples.front().copied().unwrap_or(0);
            while self.samples.len() < capacity {
                self.samples.push_front(oldest);
            }
        }
        self.capacity = capacity;
    }

    /// The newest `n` samples in arrival order (all of them if `n` exceeds
    /// the current length).
    pub fn window(&self, n: usize) -> Vec<Sample> {
        let take = n.min(self.samples.len());
        self.samples
            .iter()
            .skip(self.samples.len() - take)
            .copied()
            .collect()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }
}
