use std::collections::VecDeque;

/// Fixed-capacity FIFO of samples. Pushing into a full window evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f32>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.values.iter()
    }

    pub fn sorted(&self) -> Vec<f32> {
        let mut sorted: Vec<f32> = self.values.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }

    pub fn median(&self) -> Option<f32> {
        percentile(&self.sorted(), 0.5)
    }

    /// First and third quartile.
    pub fn quartiles(&self) -> Option<(f32, f32)> {
        let sorted = self.sorted();
        Some((percentile(&sorted, 0.25)?, percentile(&sorted, 0.75)?))
    }

    /// Mean after dropping `fraction` of the entries from each tail.
    pub fn trimmed_mean(&self, fraction: f32) -> Option<f32> {
        let sorted = self.sorted();
        let n = sorted.len();
        if n == 0 {
            return None;
        }
        let mut k = (n as f32 * fraction.max(0.0)).floor() as usize;
        if 2 * k >= n {
            k = 0;
        }
        let kept = &sorted[k..n - k];
        Some(kept.iter().sum::<f32>() / kept.len() as f32)
    }

    pub fn min(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::max)
    }
}

/// Linear-interpolated percentile of an already sorted slice.
pub fn percentile(sorted: &[f32], p: f32) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}
