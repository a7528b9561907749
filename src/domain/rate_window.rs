use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// Call instants inside one sliding window, oldest first, never more than `capacity`.
#[derive(Debug)]
pub struct RateWindow {
    calls: VecDeque<Instant>,
    capacity: usize,
    length: Duration,
}

impl RateWindow {
    pub fn new(capacity: usize, length: Duration) -> Self {
        RateWindow {
            calls: VecDeque::with_capacity(capacity),
            capacity,
            length,
        }
    }

    /// Drops every call that is at least `length` old.
    pub fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.calls.front() {
            if now.saturating_duration_since(*oldest) >= self.length {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn is_full(&self) -> bool {
        self.calls.len() >= self.capacity
    }

    /// How long until the oldest call leaves the window, if the window is full.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        if !self.is_full() {
            return None;
        }

        let oldest = self.calls.front()?;
        let remaining = self
            .length
            .saturating_sub(now.saturating_duration_since(*oldest));

        match remaining.is_zero() {
            true => None,
            false => Some(remaining),
        }
    }

    /// Callers must check `is_full` after evicting; a full window never grows.
    pub fn record(&mut self, now: Instant) {
        if self.is_full() {
            self.calls.pop_front();
        }
        self.calls.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_only_expired_calls() {
        let start = Instant::now();
        let mut window = RateWindow::new(3, Duration::from_secs(1));
        window.record(start);
        window.record(start + Duration::from_millis(600));

        window.evict(start + Duration::from_millis(1000));
        assert_eq!(window.len(), 1);

        window.evict(start + Duration::from_millis(1600));
        assert!(window.is_empty());
    }

    #[test]
    fn wait_time_counts_down_from_oldest_call() {
        let start = Instant::now();
        let mut window = RateWindow::new(2, Duration::from_secs(10));
        window.record(start);
        assert_eq!(window.wait_time(start), None);

        window.record(start + Duration::from_secs(4));
        assert_eq!(
            window.wait_time(start + Duration::from_secs(7)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(window.wait_time(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn never_grows_past_capacity() {
        let start = Instant::now();
        let mut window = RateWindow::new(2, Duration::from_secs(60));
        for i in 0..5 {
            window.record(start + Duration::from_secs(i));
        }
        assert_eq!(window.len(), 2);
        assert_eq!(window.capacity(), 2);
    }
}
