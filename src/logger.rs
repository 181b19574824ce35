//! The Logger worker: a single fan-in consumer of [`LogRecord`]s from every
//! other worker, formatting and writing them to a [`Sink`].
//!
//! Line format: `[YYYY-MM-DD HH:MM:SS] LEVEL file:line: message`, colored
//! only when writing to a terminal (stderr).
//!
//! Every worker emits at least one record per loop iteration, but that
//! chattiness is not load-bearing for the Logger's own liveness: see
//! [`crate::worker_ctx`] for why a timed consumer wait already pings the
//! Logger's watchdog slot on its own schedule.

use crate::{
    shutdown::is_running,
    watchdog::{WatchdogCtx, WorkerId},
    worker_ctx::WorkerCtx,
};
use eyre::{Result, WrapErr};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::Arc,
};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Log severity, from least to most urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Fine-grained diagnostic detail.
    Trace,
    /// Diagnostic detail useful while developing.
    Debug,
    /// Routine operational detail.
    Info,
    /// Unexpected but recoverable condition.
    Warn,
    /// An operation failed.
    Error,
    /// The process is about to abort.
    Fatal,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// ANSI color escape for this level, used only on the stderr sink.
    fn color(self) -> &'static str {
        match self {
            Level::Trace => "\x1b[94m",
            Level::Debug => "\x1b[36m",
            Level::Info => "\x1b[32m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
            Level::Fatal => "\x1b[35m",
        }
    }
}

/// One formatted log line's worth of data, enqueued by any worker and
/// emitted by the Logger.
#[derive(Debug)]
pub struct LogRecord {
    timestamp: OffsetDateTime,
    level: Level,
    file: &'static str,
    line: u32,
    message: String,
}

impl LogRecord {
    /// Builds a record stamped with the current time. Prefer the
    /// `log_trace!`/`log_debug!`/`log_info!`/`log_warn!`/`log_error!`/
    /// `log_fatal!` macros, which fill in `file`/`line` for you.
    #[must_use]
    pub fn new(level: Level, file: &'static str, line: u32, message: String) -> Self {
        let timestamp = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self { timestamp, level, file, line, message }
    }
}

/// Where formatted log lines are written.
pub enum Sink {
    /// ANSI-colored, written to stderr.
    Stderr,
    /// Plain text, appended to a file under the logs directory.
    File(fs::File),
}

/// Opens the sink the CLI asked for. For file logging, creates the logs
/// directory (mode `0o777`) if absent and opens a freshly timestamped
/// `cut-YYYY-MM-DD-HH-MM-SS.log` inside it.
pub fn init_sink(log_to_stderr: bool, logs_dir: &Path) -> Result<Sink> {
    if log_to_stderr {
        return Ok(Sink::Stderr);
    }

    fs::create_dir_all(logs_dir).wrap_err("failed to create logs directory")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(logs_dir, fs::Permissions::from_mode(0o777))
            .wrap_err("failed to chmod logs directory")?;
    }

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let filename_format =
        format_description!("cut-[year]-[month]-[day]-[hour]-[minute]-[second].log");
    let filename = now.format(&filename_format).wrap_err("failed to format log filename")?;
    let path = logs_dir.join(filename);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err("failed to open log file")?;
    eprintln!("opened new log file: {}", path.display());
    Ok(Sink::File(file))
}

fn write_line(sink: &mut Sink, record: &LogRecord) {
    let timestamp = record.timestamp.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| String::from("?"));
    match sink {
        Sink::Stderr => {
            let _ = writeln!(
                io::stderr(),
                "[{timestamp}] {}{:<5}\x1b[0m \x1b[90m{}:{}:\x1b[0m {}",
                record.level.color(),
                record.level.name(),
                record.file,
                record.line,
                record.message,
            );
            let _ = io::stderr().flush();
        }
        Sink::File(file) => {
            let _ = writeln!(
                file,
                "[{timestamp}] {:<5} {}:{}: {}",
                record.level.name(),
                record.file,
                record.line,
                record.message,
            );
            let _ = file.flush();
        }
    }
}

/// Enqueues a record for the Logger worker. `worker` is the *caller's* own
/// id, used only for watchdog pinging while contending for the Logger's
/// mutex (the record's own level is independent of that).
pub fn enqueue(
    ctx: &Arc<WorkerCtx<LogRecord>>,
    watchdog: &Arc<WatchdogCtx>,
    worker: WorkerId,
    record: LogRecord,
) {
    ctx.push_back(record, watchdog, worker);
}

/// Builds a [`LogRecord`] at the call site and enqueues it. Used by the
/// `log_*!` macros; prefer those over calling this directly so `file`/
/// `line` reflect the real call site.
#[doc(hidden)]
pub fn enqueue_at(
    ctx: &Arc<WorkerCtx<LogRecord>>,
    watchdog: &Arc<WatchdogCtx>,
    worker: WorkerId,
    level: Level,
    file: &'static str,
    line: u32,
    message: String,
) {
    enqueue(ctx, watchdog, worker, LogRecord::new(level, file, line, message));
}

/// Runs the Logger worker loop: dequeue one record, format it, write it,
/// flush, repeat. Exits once termination has been ordered and the queue is
/// drained, handing the sink back to the caller so a post-join drain can
/// reuse the same open file instead of opening a second one.
pub fn run(ctx: &Arc<WorkerCtx<LogRecord>>, watchdog: &Arc<WatchdogCtx>, mut sink: Sink) -> Sink {
    while let Some(record) = ctx.wait_pop(watchdog, WorkerId::Logger, is_running) {
        write_line(&mut sink, &record);
    }
    sink
}

/// Drains every residual record left in `ctx` after join and *still prints
/// them* before freeing: records enqueued right before shutdown are not
/// silently dropped.
pub fn drain(ctx: &WorkerCtx<LogRecord>, sink: &mut Sink) {
    for record in ctx.drain() {
        write_line(sink, &record);
    }
}

/// Builds and enqueues a record at the given level and call site.
#[macro_export]
macro_rules! log_at {
    ($level:expr, $ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::logger::enqueue_at(
            $ctx,
            $watchdog,
            $worker,
            $level,
            file!(),
            line!(),
            format!($($arg)*),
        )
    };
}

/// Logs a [`Level::Trace`] record at the call site.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Trace, $ctx, $watchdog, $worker, $($arg)*)
    };
}

/// Logs a [`Level::Debug`] record at the call site.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Debug, $ctx, $watchdog, $worker, $($arg)*)
    };
}

/// Logs a [`Level::Info`] record at the call site.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Info, $ctx, $watchdog, $worker, $($arg)*)
    };
}

/// Logs a [`Level::Warn`] record at the call site.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Warn, $ctx, $watchdog, $worker, $($arg)*)
    };
}

/// Logs a [`Level::Error`] record at the call site.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Error, $ctx, $watchdog, $worker, $($arg)*)
    };
}

/// Logs a [`Level::Fatal`] record at the call site.
#[macro_export]
macro_rules! log_fatal {
    ($ctx:expr, $watchdog:expr, $worker:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::Level::Fatal, $ctx, $watchdog, $worker, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchdog::WatchdogCtx;

    #[test]
    fn file_sink_round_trips_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = init_sink(false, dir.path()).unwrap();
        let record = LogRecord::new(Level::Info, "proc_stat.rs", 42, "hello".to_string());
        write_line(&mut sink, &record);
        let path = {
            let mut entries = fs::read_dir(dir.path()).unwrap();
            entries.next().unwrap().unwrap().path()
        };
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("proc_stat.rs:42: hello"));
        assert!(!contents.contains('\x1b'), "file sink must not contain ANSI escapes");
    }

    #[test]
    fn every_enqueued_record_is_eventually_drained() {
        let ctx: Arc<WorkerCtx<LogRecord>> = Arc::new(WorkerCtx::new());
        let watchdog = Arc::new(WatchdogCtx::new());
        for i in 0..5 {
            enqueue(&ctx, &watchdog, WorkerId::Reader, LogRecord::new(Level::Info, "x.rs", i, "m".into()));
        }
        let dir = tempfile::tempdir().unwrap();
        let mut sink = init_sink(false, dir.path()).unwrap();
        drain(&ctx, &mut sink);
        let path = {
            let mut entries = fs::read_dir(dir.path()).unwrap();
            entries.next().unwrap().unwrap().path()
        };
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }
}
