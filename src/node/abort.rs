use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the scheduler and a node's compute steps.
///
/// Nothing is interrupted forcibly: long computations poll [`AbortToken::is_aborted`] and
/// return early.
#[derive(Clone, Debug, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/abort.rs"]
mod tests;
