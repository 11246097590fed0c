//! Cooperative cancellation for long-running cipher passes.

use crate::error::{CryptoError, CryptoResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable flag checked between chunks of a cipher pass.
///
/// Clones share state, so one clone can be handed to another thread and
/// cancelled from there.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Irreversible.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(CryptoError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> CryptoResult<()> {
        if self.is_cancelled() {
            Err(CryptoError::Cancelled)
        } else {
            Ok(())
        }
    }
}
