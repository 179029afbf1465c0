//! Bounded-parallelism admission gate.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

struct GateInner {
    available: usize,
    waiters: VecDeque<oneshot::Sender<GatePermit>>,
}

/// A counting admission primitive with strict FIFO wake order.
///
/// `acquire` returns immediately while permits remain; otherwise the caller
/// suspends at the tail of a wait list. `release` hands the freed slot
/// directly to the oldest waiter, so a late arrival can never overtake an
/// earlier one.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<Mutex<GateInner>>,
}

impl ConcurrencyGate {
    /// Creates a gate admitting up to `capacity` concurrent holders.
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateInner {
                available: capacity.max(1),
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Acquires a permit, suspending until one is available.
    pub async fn acquire(&self) -> GatePermit {
        let receiver = {
            let mut inner = self.inner.lock();
            if inner.available > 0 {
                inner.available -= 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                Some(rx)
            }
        };

        match receiver {
            None => GatePermit {
                gate: self.inner.clone(),
            },
            Some(rx) => match rx.await {
                // The releaser hands over a whole permit; if this future
                // is dropped before the handoff is claimed, the buffered
                // permit's own drop releases the slot again.
                Ok(permit) => permit,
                // A closed channel means the gate was dropped, in which
                // case admission is moot.
                Err(_) => GatePermit {
                    gate: self.inner.clone(),
                },
            },
        }
    }

    /// Permits not currently held or promised to a waiter.
    pub fn available(&self) -> usize {
        self.inner.lock().available
    }

    /// Callers currently suspended.
    pub fn waiting(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    fn release(inner: &Arc<Mutex<GateInner>>) {
        let waiter = {
            let mut guard = inner.lock();
            match guard.waiters.pop_front() {
                Some(waiter) => waiter,
                None => {
                    guard.available += 1;
                    return;
                }
            }
        };
        // Handoff outside the lock: a waiter whose acquire future was
        // already dropped rejects the permit, whose drop re-enters
        // release and moves the slot to the next waiter.
        let _ = waiter.send(GatePermit {
            gate: Arc::clone(inner),
        });
    }
}

/// Holds one admission slot; releasing happens on drop.
pub struct GatePermit {
    gate: Arc<Mutex<GateInner>>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        ConcurrencyGate::release(&self.gate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn immediate_admission_under_capacity() {
        let gate = ConcurrencyGate::new(2);
        let a = gate.acquire().await;
        let _b = gate.acquire().await;
        assert_eq!(gate.available(), 0);

        drop(a);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn waiters_wake_in_fifo_order() {
        let gate = ConcurrencyGate::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let held = gate.acquire().await;

        let mut handles = Vec::new();
        for i in 0..3 {
            let task_gate = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = task_gate.acquire().await;
                order.lock().push(i);
            }));
            // Let each waiter join the list before the next arrives
            while gate.waiting() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(gate.waiting(), 3);
        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn capacity_bounds_concurrency() {
        let gate = ConcurrencyGate::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_waiter_forfeits_its_slot() {
        let gate = ConcurrencyGate::new(1);
        let held = gate.acquire().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };
        while gate.waiting() < 1 {
            tokio::task::yield_now().await;
        }

        waiter.abort();
        let _ = waiter.await;

        // The abandoned waiter must not strand the permit
        drop(held);
        let _reacquired = gate.acquire().await;
    }

    #[tokio::test]
    async fn handed_off_slot_survives_waiter_cancellation() {
        let gate = ConcurrencyGate::new(1);
        let held = gate.acquire().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
                std::future::pending::<()>().await;
            })
        };
        while gate.waiting() < 1 {
            tokio::task::yield_now().await;
        }

        // Hand the slot to the waiter, then cancel it before it can
        // claim the permit
        drop(held);
        waiter.abort();
        let _ = waiter.await;

        assert_eq!(gate.available(), 1);
        let _reacquired = gate.acquire().await;
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let gate = ConcurrencyGate::new(0);
        let _permit = gate.acquire().await;
    }
}
