//! Single-flight guard for scan execution.
//!
//! At most one scan runs at a time, process-wide. The flag is an atomic
//! compare-and-swap rather than a plain shared boolean, so the invariant
//! holds even when triggers arrive on different runtime threads. Overlapping
//! triggers are rejected immediately, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "scan in progress" flag.
#[derive(Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to claim the flag. Returns a guard on success; `None` when a
    /// scan is already in flight.
    pub fn try_acquire(&self) -> Option<ScanGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| ScanGuard {
                running: self.running.clone(),
            })
    }

    /// True while a scan holds the guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// RAII claim on the single-flight flag; released on drop, including when a
/// scan aborts early.
pub struct ScanGuard {
    running: Arc<AtomicBool>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
