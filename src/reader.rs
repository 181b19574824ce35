//! The Reader worker: the pipeline's producer. Obtains one [`SampleBundle`]
//! per iteration and hands it to the Analyzer.

use crate::{
    log_info,
    logger::LogRecord,
    proc_stat::{self, SampleBundle},
    shutdown::is_running,
    watchdog::{WatchdogCtx, WorkerId},
    worker_ctx::WorkerCtx,
};
use std::{process, sync::Arc};

/// Runs the Reader worker loop: sample `/proc/stat` into a bundle, enqueue
/// it for the Analyzer, repeat while `running` holds. Counter acquisition
/// failures are fatal (there is no meaningful retry for a machine without
/// `/proc/stat`). Orders Analyzer termination on exit.
pub fn run(
    ctx: &Arc<WorkerCtx<SampleBundle>>,
    logger_ctx: &Arc<WorkerCtx<LogRecord>>,
    watchdog: &Arc<WatchdogCtx>,
) {
    log_info!(logger_ctx, watchdog, WorkerId::Reader, "[Reader] starting work!");
    while is_running() {
        let ping = || watchdog.ping(WorkerId::Reader);
        match proc_stat::read_bundle(ping) {
            Ok(bundle) => {
                log_info!(logger_ctx, watchdog, WorkerId::Reader, "[Reader] got new samples!");
                ctx.push_back(bundle, watchdog, WorkerId::Reader);
            }
            Err(err) => {
                // Written synchronously to stderr, not through the pipeline
                // Logger: the process is about to exit and the Logger's
                // default sink is a file, so routing a fatal through the
                // async queue risks losing the one diagnostic the operator
                // needs (§7).
                eprintln!("[Reader] fatal: {err:#}");
                process::exit(1);
            }
        }
    }
    log_info!(logger_ctx, watchdog, WorkerId::Reader, "[Reader] shutting down...");
    ctx.order_termination(watchdog, WorkerId::Reader);
}
