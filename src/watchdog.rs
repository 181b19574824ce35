//! Liveness watchdog.
//!
//! Maintains one atomic "alive" bit per pipeline worker. Every [`T_WD`]
//! window it either finds every worker has pinged since the last window
//! (and re-arms for the next one) or decides a worker is dead (stuck or
//! crashed, the watchdog cannot tell the difference and doesn't try to)
//! and kills the process.

use crate::consts::{N_WORKERS, T_WD};
use std::{
    fmt, process,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Identifies one of the four workers the watchdog supervises. Doubles as
/// an index into [`WatchdogCtx`]'s liveness array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerId {
    /// Samples `/proc/stat` and hands bundles to the Analyzer.
    Reader,
    /// Turns sample bundles into usage vectors for the Printer.
    Analyzer,
    /// Renders usage vectors to the terminal.
    Printer,
    /// Drains the fan-in log queue to its sink.
    Logger,
}

impl WorkerId {
    const ALL: [WorkerId; N_WORKERS] =
        [WorkerId::Reader, WorkerId::Analyzer, WorkerId::Printer, WorkerId::Logger];

    fn index(self) -> usize {
        match self {
            WorkerId::Reader => 0,
            WorkerId::Analyzer => 1,
            WorkerId::Printer => 2,
            WorkerId::Logger => 3,
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerId::Reader => "Reader",
            WorkerId::Analyzer => "Analyzer",
            WorkerId::Printer => "Printer",
            WorkerId::Logger => "Logger",
        };
        f.write_str(name)
    }
}

/// One process-wide liveness table, one atomic bit per worker.
pub struct WatchdogCtx {
    alive: [AtomicBool; N_WORKERS],
}

impl WatchdogCtx {
    /// Creates a watchdog context with every worker initially marked alive,
    /// so a worker that hasn't run its first loop iteration yet by the time
    /// the first window closes isn't mistaken for dead.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: [
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ],
        }
    }

    /// Pings `worker`'s liveness bit. Workers call this whenever they make
    /// progress or attempt to acquire a lock (see [`crate::worker_ctx`]).
    pub fn ping(&self, worker: WorkerId) {
        self.alive[worker.index()].store(true, Ordering::Relaxed);
    }

    /// Runs the watchdog loop forever. Call from a dedicated thread; this
    /// function only returns by terminating the process (`process::exit`)
    /// and is never joined by `main` (see [`crate::run::run`]).
    pub fn run(&self, is_running: impl Fn() -> bool) -> ! {
        loop {
            thread::sleep(T_WD);
            for worker in WorkerId::ALL {
                if !is_running() {
                    continue;
                }
                if self.alive[worker.index()].swap(false, Ordering::Relaxed) {
                    // Was alive, now re-armed for the next window.
                } else {
                    eprintln!("{}", trip_message(worker));
                    process::exit(1);
                }
            }
        }
    }
}

/// The exact line printed to stderr when a worker is found dead. The
/// wording is part of the contract (§4.5, tested in §8 scenario 6).
fn trip_message(worker: WorkerId) -> String {
    format!("[Watchdog] worker #{} ({worker}) died!", worker.index())
}
