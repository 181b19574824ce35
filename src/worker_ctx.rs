//! Per-consumer job queue: the bounded-wait, single-consumer hand-off used
//! between every adjacent pair of pipeline stages.
//!
//! Each `WorkerCtx<T>` bundles a [`BoundedQueue`], a `waiting` flag, and a
//! `(Mutex, Condvar)` pair. Producers lock the *destination* context, never
//! their own; no two `WorkerCtx` mutexes are ever held at once, so the lock
//! order is trivially acyclic.
//!
//! Lock and wait attempts use `parking_lot`'s timed primitives rather than
//! `std::sync::Mutex`/`Condvar`, because the watchdog protocol requires
//! re-pinging on every timeout: a worker stretched past `T_WD` by
//! contention must not be mistaken for dead. Every `LOCK_SLICE` (a quarter
//! of `T_WD`), whether the lock was acquired or not, the calling worker
//! re-pings its own liveness bit. Because the *consumer* side uses the
//! same timed-wait loop (not an untimed blocking wait), it re-pings its
//! own slot every `LOCK_SLICE` regardless of whether any producer ever
//! sends it work. That decouples every consumer's liveness, including the
//! Logger's, from whether anyone happens to be producing for it.

use crate::{
    consts::LOCK_SLICE,
    queue::BoundedQueue,
    watchdog::{WatchdogCtx, WorkerId},
};
use parking_lot::{Condvar, Mutex};

struct State<T> {
    queue: BoundedQueue<T>,
    /// `true` iff the consumer is, or is about to be, blocked on the
    /// condvar with the mutex released.
    waiting: bool,
    /// Set by `order_termination` to release a waiting consumer even with
    /// an empty queue, so it can observe the global run flag and exit.
    terminate: bool,
}

/// A single-producer-fan-in, single-consumer job queue with watchdog-aware
/// locking.
pub struct WorkerCtx<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> Default for WorkerCtx<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkerCtx<T> {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { queue: BoundedQueue::new(), waiting: false, terminate: false }),
            condvar: Condvar::new(),
        }
    }

    /// Acquires the mutex, pinging `watchdog`'s `worker` slot before every
    /// attempt and once more after acquiring it. Never gives up.
    fn lock_and_ping(&self, watchdog: &WatchdogCtx, worker: WorkerId) -> parking_lot::MutexGuard<'_, State<T>> {
        loop {
            watchdog.ping(worker);
            if let Some(guard) = self.state.try_lock_for(LOCK_SLICE) {
                watchdog.ping(worker);
                return guard;
            }
        }
    }

    /// Enqueues `item` and wakes the consumer. `worker` is the *producer's*
    /// own id, used only for watchdog pinging while contending for this
    /// context's mutex.
    pub fn push_back(&self, item: T, watchdog: &WatchdogCtx, worker: WorkerId) {
        let mut state = self.lock_and_ping(watchdog, worker);
        state.queue.push_back(item);
        self.condvar.notify_one();
    }

    /// Releases a consumer blocked on an empty queue so it can observe
    /// `running == false` and exit, without requiring a real item. Each
    /// stage orders the next stage's termination as it exits.
    pub fn order_termination(&self, watchdog: &WatchdogCtx, worker: WorkerId) {
        let mut state = self.lock_and_ping(watchdog, worker);
        state.terminate = true;
        state.waiting = false;
        self.condvar.notify_all();
    }

    /// Blocks until an item is available or termination has been ordered,
    /// pinging `worker`'s watchdog slot throughout. Returns `None` once the
    /// queue is empty and either termination was ordered or `is_running`
    /// reports the pipeline is shutting down.
    pub fn wait_pop(
        &self,
        watchdog: &WatchdogCtx,
        worker: WorkerId,
        is_running: impl Fn() -> bool,
    ) -> Option<T> {
        let mut state = self.lock_and_ping(watchdog, worker);
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some(item);
            }
            if state.terminate || !is_running() {
                return None;
            }
            state.waiting = true;
            let _ = self.condvar.wait_for(&mut state, LOCK_SLICE);
            state.waiting = false;
            watchdog.ping(worker);
        }
    }

    /// Removes and returns every residual item, in FIFO order. Used by the
    /// post-join drain-destructors so no item leaks. Takes the mutex
    /// directly since no worker threads remain running by the time drain
    /// is called.
    pub fn drain(&self) -> Vec<T> {
        self.state.lock().queue.drain().collect()
    }

    /// Returns `true` once the consumer has observed `waiting = true` and
    /// is (or is about to be) blocked on the condvar with the mutex
    /// released. Exposed for tests of the waiting-flag invariant.
    #[cfg(test)]
    fn is_consumer_waiting(&self) -> bool {
        self.state.lock().waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Duration as StdDuration};

    #[test]
    fn push_then_pop_is_fifo() {
        let ctx: WorkerCtx<u32> = WorkerCtx::new();
        let watchdog = WatchdogCtx::new();
        for i in 0..5 {
            ctx.push_back(i, &watchdog, WorkerId::Reader);
        }
        for i in 0..5 {
            assert_eq!(ctx.wait_pop(&watchdog, WorkerId::Analyzer, || true), Some(i));
        }
    }

    #[test]
    fn order_termination_releases_an_empty_wait() {
        let ctx: Arc<WorkerCtx<u32>> = Arc::new(WorkerCtx::new());
        let watchdog = Arc::new(WatchdogCtx::new());

        let consumer = {
            let ctx = Arc::clone(&ctx);
            let watchdog = Arc::clone(&watchdog);
            thread::spawn(move || ctx.wait_pop(&watchdog, WorkerId::Analyzer, || true))
        };

        // Give the consumer a chance to start waiting before we order it to stop.
        thread::sleep(StdDuration::from_millis(50));
        ctx.order_termination(&watchdog, WorkerId::Reader);

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn drain_collects_residual_items_in_order() {
        let ctx: WorkerCtx<u32> = WorkerCtx::new();
        let watchdog = WatchdogCtx::new();
        for i in 0..3 {
            ctx.push_back(i, &watchdog, WorkerId::Reader);
        }
        assert_eq!(ctx.drain(), vec![0, 1, 2]);
        assert_eq!(ctx.wait_pop(&watchdog, WorkerId::Analyzer, || false), None);
    }

    #[test]
    fn waiting_flag_is_set_while_blocked() {
        let ctx: Arc<WorkerCtx<u32>> = Arc::new(WorkerCtx::new());
        let watchdog = Arc::new(WatchdogCtx::new());
        let ctx2 = Arc::clone(&ctx);
        let watchdog2 = Arc::clone(&watchdog);
        let consumer = thread::spawn(move || ctx2.wait_pop(&watchdog2, WorkerId::Analyzer, || true));
        thread::sleep(StdDuration::from_millis(50));
        assert!(ctx.is_consumer_waiting());
        ctx.order_termination(&watchdog, WorkerId::Reader);
        consumer.join().unwrap();
    }
}
