//! Per-agent-kind worker pool, backed by a semaphore whose effective
//! capacity can shrink/grow at runtime without recreating it: shrinking
//! withholds already-acquired permits, growing releases them back.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ResizablePool {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    withheld: Mutex<Vec<OwnedSemaphorePermit>>,
}

impl ResizablePool {
    pub fn new(max_permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits: max_permits.max(1),
            withheld: Mutex::new(Vec::new()),
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }

    /// Halve this pool's effective capacity by acquiring and holding
    /// permits. No-op if already shrunk.
    pub fn shrink_to_half(&self) {
        let mut withheld = self.withheld.lock();
        if !withheld.is_empty() {
            return;
        }
        let target = (self.max_permits / 2).max(1);
        let to_withhold = self.max_permits.saturating_sub(target);
        for _ in 0..to_withhold {
            match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => withheld.push(permit),
                Err(_) => break,
            }
        }
    }

    /// Restore full capacity by releasing any withheld permits.
    pub fn restore_full(&self) {
        self.withheld.lock().clear();
    }

    pub fn is_shrunk(&self) -> bool {
        !self.withheld.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrink_halves_available_capacity() {
        let pool = ResizablePool::new(4);
        assert_eq!(pool.available(), 4);

        pool.shrink_to_half();
        assert_eq!(pool.available(), 2);

        pool.restore_full();
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn shrink_is_idempotent() {
        let pool = ResizablePool::new(4);
        pool.shrink_to_half();
        pool.shrink_to_half();
        assert_eq!(pool.available(), 2);
    }
}
