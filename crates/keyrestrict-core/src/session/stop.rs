// Keyrestrict Stop Signal
// Monotonic, cloneable cancellation flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag that goes from "running" to "stopped" once and never back.
///
/// Clones share the same flag. Used both for a session's internal stop and
/// for the caller's cancel handle.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Later calls are no-ops.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The raw flag, for registering with signal handlers
    pub fn as_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_untriggered() {
        assert!(!StopSignal::new().is_triggered());
    }

    #[test]
    fn test_trigger_is_shared_and_monotonic() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        clone.trigger();
        clone.trigger();
        assert!(stop.is_triggered());
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_flag_reflects_external_set() {
        let stop = StopSignal::new();
        stop.as_flag().store(true, Ordering::SeqCst);
        assert!(stop.is_triggered());
    }
}
