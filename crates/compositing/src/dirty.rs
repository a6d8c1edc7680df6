//! Single-flag "redrawn since last upload" signal.
//!
//! The producer raises the flag after every draw; exactly one consumer takes
//! it on its own schedule (normally once per frame). Multiple raises between
//! takes coalesce, since only the latest raster matters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct DirtySignal(Arc<AtomicBool>);

impl DirtySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raises_coalesce_until_taken() {
        let producer = DirtySignal::new();
        let consumer = producer.clone();

        producer.raise();
        producer.raise();
        assert!(consumer.is_raised());
        assert!(consumer.take());
        assert!(!consumer.take());
    }
}
