//! Bulkhead: caps concurrent executions of the protected operation.
//!
//! # Responsibilities
//! - Hand out at most `max_concurrent` slots
//! - Either reject immediately when full or wait up to `max_wait`
//! - Release the slot on every exit path, including cancellation
//!
//! # Design Decisions
//! - Slots are `tokio::sync::Semaphore` permits wrapped in an RAII guard
//! - `in_flight` is tracked separately for observability; the guard
//!   decrements it on drop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BulkheadConfig;

/// Observable bulkhead state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkheadState {
    pub in_flight: usize,
    pub max_concurrent: usize,
}

/// Concurrency limiter.
#[derive(Debug)]
pub struct Bulkhead {
    slots: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    max_concurrent: usize,
    max_wait: Duration,
}

impl Bulkhead {
    pub fn new(config: &BulkheadConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
            max_wait: Duration::from_millis(config.max_wait_ms),
        }
    }

    /// Take a slot. `None` means the bulkhead is full.
    pub async fn acquire(&self) -> Option<BulkheadPermit> {
        let permit = if self.max_wait.is_zero() {
            self.slots.clone().try_acquire_owned().ok()?
        } else {
            tokio::time::timeout(self.max_wait, self.slots.clone().acquire_owned())
                .await
                .ok()?
                .ok()?
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(BulkheadPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> BulkheadState {
        BulkheadState {
            in_flight: self.in_flight(),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// A held bulkhead slot. When dropped, the slot is released.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulkhead(max_concurrent: usize, max_wait_ms: u64) -> Bulkhead {
        Bulkhead::new(&BulkheadConfig { max_concurrent, max_wait_ms })
    }

    #[tokio::test]
    async fn test_rejects_when_full() {
        let bh = bulkhead(2, 0);
        let a = bh.acquire().await.unwrap();
        let _b = bh.acquire().await.unwrap();
        assert_eq!(bh.state(), BulkheadState { in_flight: 2, max_concurrent: 2 });
        assert!(bh.acquire().await.is_none());

        drop(a);
        assert_eq!(bh.in_flight(), 1);
        assert!(bh.acquire().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_slot() {
        let bh = Arc::new(bulkhead(1, 1_000));
        let held = bh.acquire().await.unwrap();

        let waiter = {
            let bh = bh.clone();
            tokio::spawn(async move { bh.acquire().await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(held);
        assert!(waiter.await.unwrap());
        assert_eq!(bh.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let bh = bulkhead(1, 200);
        let _held = bh.acquire().await.unwrap();
        assert!(bh.acquire().await.is_none());
        assert_eq!(bh.in_flight(), 1);
    }
}
