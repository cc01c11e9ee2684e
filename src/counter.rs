use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of metadata and node loads currently in flight.
///
/// Cloning shares the count; hand the same counter to every loader whose work
/// should be throttled together.
#[derive(Clone, Debug, Default)]
pub struct LoadCounter(Arc<AtomicUsize>);

impl LoadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Counts one load until the returned guard is dropped.
    pub fn start(&self) -> LoadGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        LoadGuard(self.clone())
    }
}

#[derive(Debug)]
pub struct LoadGuard(LoadCounter);

impl Drop for LoadGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_in_flight_loads() {
        let counter = LoadCounter::new();
        let shared = counter.clone();

        let first = counter.start();
        let second = shared.start();
        assert_eq!(counter.in_flight(), 2);

        drop(first);
        assert_eq!(shared.in_flight(), 1);

        drop(second);
        assert_eq!(counter.in_flight(), 0);
    }
}
