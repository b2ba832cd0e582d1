//! Shared network-activity gauge.
//!
//! One task executing anywhere in the pipeline holds the gauge; the UI layer
//! (or a test) reads it to know whether network I/O is in flight. Increments
//! and decrements are always paired through the RAII guard, so the count
//! never goes negative. The gauge is injected wherever it is needed rather
//! than living in process-wide state, which keeps it observable in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reference-counted indicator of in-flight network requests.
///
/// Cheap to clone; all clones share one counter.
#[derive(Debug, Clone, Default)]
pub struct ActivityGauge {
    active: Arc<AtomicUsize>,
}

impl ActivityGauge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one request as in flight until the returned guard drops.
    #[must_use]
    pub fn begin(&self) -> ActivityGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether any request is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active() > 0
    }
}

/// Holds one unit of the gauge; dropping it releases the unit.
#[derive(Debug)]
pub struct ActivityGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
