//! The Printer worker: renders a [`Usage`] vector to the terminal.

use crate::{
    analyzer::{CoreUsage, Usage},
    log_info,
    logger::LogRecord,
    shutdown::is_running,
    watchdog::{WatchdogCtx, WorkerId},
    worker_ctx::WorkerCtx,
};
use std::{
    fmt::Write as _,
    io,
    sync::Arc,
};

/// Renders a frame: clear the screen, then one line per core (`total:`
/// for index 0, `cpu N:` for index `N + 1`), either a two-decimal
/// percentage or `UNKNOWN`.
#[must_use]
pub fn render(usage: &Usage) -> String {
    let mut frame = String::from("\x1b[2J");
    for (index, core) in usage.cores.iter().enumerate() {
        if index == 0 {
            frame.push_str("total: ");
        } else {
            let _ = write!(frame, "cpu {}: ", index - 1);
        }
        match core {
            CoreUsage::Unknown => frame.push_str("UNKNOWN\n"),
            CoreUsage::Percent(percent) => {
                let _ = writeln!(frame, "{percent:.2}%");
            }
        }
    }
    frame
}

/// Writes `frame` to stdout as a single `write(2)` syscall, so a reader
/// attached to the terminal never observes a half-written frame.
pub fn write_frame(frame: &str) -> io::Result<()> {
    let bytes = frame.as_bytes();
    let written = unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len()) };
    if written < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Runs the Printer worker loop: dequeue a usage vector, render it, write
/// it. Exits and orders Logger termination once the Analyzer has shut down
/// and the queue has drained (the Printer is the last stage in the
/// log-producing chain).
pub fn run(
    ctx: &Arc<WorkerCtx<Usage>>,
    logger_ctx: &Arc<WorkerCtx<LogRecord>>,
    watchdog: &Arc<WatchdogCtx>,
) {
    log_info!(logger_ctx, watchdog, WorkerId::Printer, "[Printer] starting work!");
    while let Some(usage) = ctx.wait_pop(watchdog, WorkerId::Printer, is_running) {
        let frame = render(&usage);
        if write_frame(&frame).is_err() {
            log_info!(logger_ctx, watchdog, WorkerId::Printer, "[Printer] failed to write frame");
        }
    }
    log_info!(logger_ctx, watchdog, WorkerId::Printer, "[Printer] shutting down...");
    logger_ctx.order_termination(watchdog, WorkerId::Printer);
}

/// Drains and discards every residual usage vector left in `ctx` after
/// join: no item leaks, nothing further is rendered.
pub fn drain(ctx: &WorkerCtx<Usage>) {
    let _: Vec<_> = ctx.drain();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{CoreUsage, Usage};

    #[test]
    fn renders_aggregate_then_cores_with_a_clear_screen_prefix() {
        let usage =
            Usage { cores: vec![CoreUsage::Percent(12.345), CoreUsage::Percent(0.0), CoreUsage::Unknown] };
        let frame = render(&usage);
        assert!(frame.starts_with("\x1b[2J"));
        assert!(frame.contains("total: 12.35%\n"));
        assert!(frame.contains("cpu 0: 0.00%\n"));
        assert!(frame.contains("cpu 1: UNKNOWN\n"));
    }
}
