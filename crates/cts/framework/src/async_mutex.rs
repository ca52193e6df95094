//! Execution serializer.
//!
//! [`AsyncMutex`] admits one unit of asynchronous work at a time, in the
//! order [`AsyncMutex::with`] was called. State is a busy flag plus a FIFO of
//! waiters, each parked on a oneshot channel. Releasing the slot pops waiters
//! until one accepts the hand-off, or clears the busy flag when none is left.
//!
//! There is no timeout: a unit that never completes stalls every unit queued
//! behind it. Dropping a queued or running unit releases its slot.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Default)]
struct Queue {
    busy: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl Queue {
    /// Hand the slot to the first waiter still listening.
    fn release(&mut self) {
        while let Some(next) = self.waiters.pop_front() {
            if next.send(()).is_ok() {
                return;
            }
        }
        self.busy = false;
    }
}

/// One caller's place in the queue. Dropping it gives the slot back if it
/// holds the slot or has already been handed it.
struct Slot {
    queue: Arc<Mutex<Queue>>,
    grant: Option<oneshot::Receiver<()>>,
    ticket: u64,
}

impl Slot {
    async fn acquire(&mut self) {
        if let Some(grant) = self.grant.as_mut() {
            // The sender lives in the queue until it is sent on.
            let _ = grant.await;
            self.grant = None;
        }
        debug!(ticket = self.ticket, "serializer slot acquired");
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut queue = self.queue.lock();
        // The receiver is dropped under the lock so no hand-off can race it.
        let held = match self.grant.take() {
            None => true,
            Some(mut grant) => matches!(grant.try_recv(), Ok(Some(()))),
        };
        if held {
            queue.release();
            debug!(ticket = self.ticket, "serializer slot released");
        }
    }
}

/// FIFO mutual exclusion over asynchronous work.
pub struct AsyncMutex {
    queue: Arc<Mutex<Queue>>,
    tickets: AtomicU64,
}

impl AsyncMutex {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            tickets: AtomicU64::new(0),
        }
    }

    /// Queue `f` behind every earlier call and run it exclusively.
    ///
    /// The slot is taken when `with` is called, not when the returned future
    /// is first polled. The future resolves to `f`'s own output.
    pub fn with<F, Fut, T>(&self, f: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let grant = {
            let mut queue = self.queue.lock();
            if queue.busy {
                let (tx, rx) = oneshot::channel();
                queue.waiters.push_back(tx);
                Some(rx)
            } else {
                queue.busy = true;
                None
            }
        };
        let mut slot = Slot {
            queue: self.queue.clone(),
            grant,
            ticket,
        };

        async move {
            slot.acquire().await;
            let out = f().await;
            drop(slot);
            out
        }
    }

    /// Calls queued behind the current holder.
    pub fn queued(&self) -> usize {
        self.queue.lock().waiters.len()
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::new()
    }
}
