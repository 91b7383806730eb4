//! Queue-depth feedback for batch sizing
//!
//! After every push the dispatcher reads the external queue's depth. An
//! empty queue means the bots are keeping up and batches can grow; a
//! backlog means they are behind and batches should shrink so work spreads
//! across more of them.

use tracing::debug;

/// Size change applied per adjustment
const STEP: usize = 10;

/// Smallest batch size adaptive mode will reach
const MIN_SIZE: usize = 10;

/// Largest batch size adaptive mode will reach
const MAX_SIZE: usize = 500;

/// Batch-size controller driven by observed queue depth
#[derive(Debug)]
pub struct AdaptiveBatch {
    size: usize,
}

impl AdaptiveBatch {
    /// Start from the configured batch size
    pub fn new(start: usize) -> Self {
        Self { size: start }
    }

    /// Current batch size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Adjust for the depth observed after a push; returns the new size
    pub fn resize(&mut self, queue_depth: usize) -> usize {
        let previous = self.size;
        if queue_depth == 0 {
            let grown = self.size + STEP;
            if grown <= MAX_SIZE {
                self.size = grown;
            }
        } else {
            let shrunk = self.size.saturating_sub(STEP);
            if shrunk >= MIN_SIZE {
                self.size = shrunk;
            }
        }
        if self.size != previous {
            debug!(
                queue_depth,
                from = previous,
                to = self.size,
                "batch size adjusted"
            );
        }
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_while_queue_empty() {
        let mut a = AdaptiveBatch::new(50);
        assert_eq!(a.resize(0), 60);
        assert_eq!(a.resize(0), 70);
    }

    #[test]
    fn test_shrinks_under_backlog() {
        let mut a = AdaptiveBatch::new(50);
        assert_eq!(a.resize(25), 40);
        assert_eq!(a.resize(3), 30);
    }

    #[test]
    fn test_growth_capped() {
        let mut a = AdaptiveBatch::new(495);
        assert_eq!(a.resize(0), 495);

        let mut a = AdaptiveBatch::new(490);
        assert_eq!(a.resize(0), 500);
        assert_eq!(a.resize(0), 500);
    }

    #[test]
    fn test_shrink_floored() {
        let mut a = AdaptiveBatch::new(15);
        assert_eq!(a.resize(9), 15);

        let mut a = AdaptiveBatch::new(20);
        assert_eq!(a.resize(9), 10);
        assert_eq!(a.resize(9), 10);
    }

    #[test]
    fn test_alternating_depths() {
        let mut a = AdaptiveBatch::new(50);
        a.resize(5);
        assert_eq!(a.size(), 40);
        a.resize(0);
        assert_eq!(a.size(), 50);
    }
}
