//! Wires the five workers together: installs the termination signal
//! handler, constructs contexts, spawns workers, joins the four pipeline
//! threads, drains residual queue items, and exits.

use crate::{
    analyzer, cli::Cli, logger, printer, proc_stat::SampleBundle, reader, shutdown,
    utils::spawn_named_thread, watchdog::WatchdogCtx, worker_ctx::WorkerCtx,
};
use eyre::Result;
use std::sync::Arc;

/// Runs the full pipeline until `SIGTERM` is received or a fatal error
/// occurs, then returns. Callers should translate the returned `Result`
/// into a process exit code (0 on `Ok`, non-zero on `Err`). The Watchdog
/// and the Reader's fatal path bypass this entirely via
/// `std::process::exit`, since neither has a meaningful fallback.
pub fn run(cli: &Cli) -> Result<()> {
    tracing::info!("starting up");
    let sink = logger::init_sink(cli.log_to_stderr, &cli.logs_dir)?;
    shutdown::install_sigterm_handler()?;

    let watchdog = Arc::new(WatchdogCtx::new());
    let logger_ctx: Arc<WorkerCtx<logger::LogRecord>> = Arc::new(WorkerCtx::new());
    let printer_ctx: Arc<WorkerCtx<analyzer::Usage>> = Arc::new(WorkerCtx::new());
    let analyzer_ctx: Arc<WorkerCtx<SampleBundle>> = Arc::new(WorkerCtx::new());

    // The Watchdog thread never joins: it either runs forever or calls
    // `process::exit` itself. Detaching it here means `main` only waits on
    // the four pipeline workers below.
    {
        let watchdog = Arc::clone(&watchdog);
        spawn_named_thread("cut-watchdog", move || watchdog.run(shutdown::is_running));
    }

    let logger_handle = {
        let ctx = Arc::clone(&logger_ctx);
        let watchdog = Arc::clone(&watchdog);
        spawn_named_thread("cut-logger", move || logger::run(&ctx, &watchdog, sink))
    };

    let printer_handle = {
        let ctx = Arc::clone(&printer_ctx);
        let logger_ctx = Arc::clone(&logger_ctx);
        let watchdog = Arc::clone(&watchdog);
        spawn_named_thread("cut-printer", move || printer::run(&ctx, &logger_ctx, &watchdog))
    };

    let analyzer_handle = {
        let ctx = Arc::clone(&analyzer_ctx);
        let printer_ctx = Arc::clone(&printer_ctx);
        let logger_ctx = Arc::clone(&logger_ctx);
        let watchdog = Arc::clone(&watchdog);
        spawn_named_thread("cut-analyzer", move || analyzer::run(&ctx, &printer_ctx, &logger_ctx, &watchdog))
    };

    let reader_handle = {
        let ctx = Arc::clone(&analyzer_ctx);
        let logger_ctx = Arc::clone(&logger_ctx);
        let watchdog = Arc::clone(&watchdog);
        spawn_named_thread("cut-reader", move || reader::run(&ctx, &logger_ctx, &watchdog))
    };

    reader_handle.join().expect("reader thread panicked");
    analyzer_handle.join().expect("analyzer thread panicked");
    printer_handle.join().expect("printer thread panicked");
    let mut sink = logger_handle.join().expect("logger thread panicked");

    // Drain-destructors: every item pushed to a queue is eventually either
    // consumed by its worker or freed here. The Logger hands its sink back
    // on exit so residual records drain into the same file it was already
    // writing to, rather than a second freshly timestamped one.
    analyzer::drain(&analyzer_ctx);
    printer::drain(&printer_ctx);
    logger::drain(&logger_ctx, &mut sink);

    tracing::info!("shut down cleanly");
    Ok(())
}
