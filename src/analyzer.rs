//! Turns a [`SampleBundle`] into a [`Usage`] vector.
//!
//! The aggregate row (index 0) is computed by the same routine as every
//! other core, gated only on its own `online` flags across the bundle.

use crate::{
    logger, log_info, proc_stat::SampleBundle, shutdown::is_running,
    watchdog::{WatchdogCtx, WorkerId}, worker_ctx::WorkerCtx,
};
use std::sync::Arc;

/// One core's utilization as computed from a bundle, or [`CoreUsage::Unknown`]
/// if the core was absent or offline in any sample of the bundle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoreUsage {
    /// A percentage in `[0.0, 100.0]`.
    Percent(f32),
    /// The core was missing or offline in at least one sample of the
    /// bundle.
    Unknown,
}

/// Per-core utilization computed from one [`SampleBundle`]. Index 0 is the
/// aggregate row.
#[derive(Clone, Debug, Default)]
pub struct Usage {
    /// Per-core utilization, aggregate first.
    pub cores: Vec<CoreUsage>,
}

fn core_usage(core: usize, bundle: &SampleBundle) -> CoreUsage {
    let unavailable = bundle
        .samples
        .iter()
        .any(|sample| sample.length() <= core || !sample.cpu_data[core].online);
    if unavailable {
        return CoreUsage::Unknown;
    }

    let totals: Vec<(u64, u64)> = bundle
        .samples
        .iter()
        .map(|sample| {
            let data = &sample.cpu_data[core];
            let idle = data.idle + data.iowait;
            let non_idle = data.user + data.nice + data.system + data.irq + data.softirq + data.steal;
            (idle, idle + non_idle)
        })
        .collect();

    let pairs = totals.len().saturating_sub(1).max(1);
    let mut average = 0.0_f32;
    for window in totals.windows(2) {
        let (idle_prev, total_prev) = window[0];
        let (idle_next, total_next) = window[1];
        let delta_total = total_next
            .checked_sub(total_prev)
            .expect("programming error: counter total went backwards between samples");
        let delta_idle = idle_next
            .checked_sub(idle_prev)
            .expect("programming error: counter idle time went backwards between samples");
        assert!(delta_total >= delta_idle, "programming error: delta_total < delta_idle for core {core}");
        assert!(delta_total > 0, "programming error: delta_total == 0 for core {core}");
        #[allow(clippy::cast_precision_loss)]
        let usage = (delta_total - delta_idle) as f32 / delta_total as f32;
        average += usage / pairs as f32;
    }
    CoreUsage::Percent(average * 100.0)
}

/// Computes the usage vector for an entire bundle.
#[must_use]
pub fn compute_usage(bundle: &SampleBundle) -> Usage {
    let max_len = bundle.samples.iter().map(super::proc_stat::Sample::length).max().unwrap_or(0);
    let cores = (0..max_len).map(|core| core_usage(core, bundle)).collect();
    Usage { cores }
}

/// Runs the Analyzer worker loop: dequeue a bundle, compute usage, hand it
/// to the Printer. Exits and orders Printer termination once the Reader
/// has shut down and the queue has drained.
pub fn run(
    ctx: &Arc<WorkerCtx<SampleBundle>>,
    printer_ctx: &Arc<WorkerCtx<Usage>>,
    logger_ctx: &Arc<WorkerCtx<logger::LogRecord>>,
    watchdog: &Arc<WatchdogCtx>,
) {
    log_info!(logger_ctx, watchdog, WorkerId::Analyzer, "[Analyzer] starting work!");
    while let Some(bundle) = ctx.wait_pop(watchdog, WorkerId::Analyzer, is_running) {
        let usage = compute_usage(&bundle);
        log_info!(logger_ctx, watchdog, WorkerId::Analyzer, "[Analyzer] computed usage!");
        printer_ctx.push_back(usage, watchdog, WorkerId::Analyzer);
    }
    log_info!(logger_ctx, watchdog, WorkerId::Analyzer, "[Analyzer] shutting down...");
    printer_ctx.order_termination(watchdog, WorkerId::Analyzer);
}

/// Drains and discards every residual bundle left in `ctx` after join: no
/// item leaks, but nothing further happens to a bundle that never reached
/// the Analyzer's main loop.
pub fn drain(ctx: &WorkerCtx<SampleBundle>) {
    let _: Vec<_> = ctx.drain();
}
