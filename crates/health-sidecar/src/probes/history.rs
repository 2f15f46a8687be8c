use std::collections::VecDeque;

/// Sliding window over the most recent local heights.
///
/// Once full, every push evicts the oldest entry and re-evaluates whether the
/// whole window holds a single value.
#[derive(Debug, Clone)]
pub struct HeightHistory {
    window: VecDeque<i64>,
    capacity: usize,
    is_not_climbing: bool,
}

impl HeightHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            is_not_climbing: false,
        }
    }

    pub fn push(&mut self, height: i64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(height);

        if self.is_full() {
            let first = self.window[0];
            self.is_not_climbing = self.window.iter().all(|h| *h == first);
        }
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn is_not_climbing(&self) -> bool {
        self.is_not_climbing
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
