//! Bounded execution slots
//!
//! Every isolated execution holds one slot for its full duration.
//! Permits are owned, so a slot is returned when the holder drops it,
//! including when the surrounding future is cancelled mid-run.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::SandboxError;

/// Fixed-capacity pool of execution slots
#[derive(Debug, Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
}

impl SlotPool {
    /// Pool with `slots` concurrent executions.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(slots.max(1))),
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, SandboxError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::PoolClosed)
    }

    /// Slots not currently held.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
