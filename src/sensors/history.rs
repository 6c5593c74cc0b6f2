use std::collections::VecDeque;

use crate::types::HistoryPoint;

/// Fixed-capacity FIFO of channel samples. Pushing into a full buffer evicts
/// the oldest point.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: HistoryPoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Values of the most recent `n` points, oldest first.
    pub fn recent_values(&self, n: usize) -> Vec<f64> {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).map(|p| p.value).collect()
    }

    /// The most recent `n` points, oldest first.
    pub fn tail(&self, n: usize) -> Vec<HistoryPoint> {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(value: f64) -> HistoryPoint {
        HistoryPoint {
            timestamp: Utc::now(),
            value,
        }
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut buf = HistoryBuffer::new(3);
        for v in 1..=5 {
            buf.push(point(f64::from(v)));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.recent_values(10), vec![3.0, 4.0, 5.0]);
        assert_eq!(buf.latest().map(|p| p.value), Some(5.0));
    }

    #[test]
    fn test_recent_values_window() {
        let mut buf = HistoryBuffer::new(100);
        for v in 0..30 {
            buf.push(point(f64::from(v)));
        }
        let recent = buf.recent_values(20);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0], 10.0);
        assert_eq!(recent[19], 29.0);
    }
}
