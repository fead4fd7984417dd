//! Message id allocation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Source of message ids
///
/// Ids must never repeat for the lifetime of the source, including across
/// flow restarts. Engines that share a source share one id space.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> u64;
}

impl<T: IdSource + ?Sized> IdSource for Arc<T> {
    fn next_id(&self) -> u64 {
        (**self).next_id()
    }
}

/// Monotonic counter starting at 1
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Process-wide counter shared by every engine that does not inject its own
    #[must_use]
    pub fn global() -> Arc<SequentialIds> {
        static GLOBAL: OnceLock<Arc<SequentialIds>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SequentialIds::new())).clone()
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
