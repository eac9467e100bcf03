//! Concurrency gate bounding in-flight calls against one endpoint.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{LuisError, Result};

const TRACING_TARGET: &str = "luis_core::gate";

/// Default number of simultaneous physical calls per endpoint.
pub const DEFAULT_MAX_REQUESTS: usize = 30;

/// Permit pool shared by every call issued through one endpoint.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

/// Admission token; the permit returns to the pool when this is dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Returns the permit to the pool.
    pub fn release(self) {}
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS)
    }
}

impl ConcurrencyGate {
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    /// Waits for a permit, giving up when `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        if cancel.is_cancelled() {
            return Err(LuisError::Cancelled);
        }
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(GatePermit { _permit: permit });
        }

        tracing::trace!(
            target: TRACING_TARGET,
            permits = self.permits,
            "Concurrency budget exhausted, waiting for a permit"
        );

        // Nothing closes the semaphore; a closed one is treated as a cancelled wait.
        tokio::select! {
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit
                .map(|permit| GatePermit { _permit: permit })
                .map_err(|_| LuisError::Cancelled),
            () = cancel.cancelled() => Err(LuisError::Cancelled),
        }
    }

    /// Total permit count fixed at construction.
    pub const fn permits(&self) -> usize {
        self.permits
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
