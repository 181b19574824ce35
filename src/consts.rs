//! Project constants.

use std::time::Duration;

/// Number of samples in a single bundle fed to the analyzer.
pub const N_SAMPLES: usize = 10;

/// Wall-clock span a single bundle is spread across. Sub-samples are taken
/// every `SAMPLE_PERIOD = TOTAL_SAMPLING_WINDOW / N_SAMPLES`.
pub const TOTAL_SAMPLING_WINDOW: Duration = Duration::from_secs(1);

/// Number of pipeline workers the watchdog supervises: Reader, Analyzer,
/// Printer, Logger.
pub const N_WORKERS: usize = 4;

/// Watchdog observation window: a worker silent for this long is
/// considered dead.
pub const T_WD: Duration = Duration::from_secs(2);

/// Number of timed lock attempts a worker makes within one `T_WD` window
/// before the watchdog would consider it stuck. `LOCK_SLICE = T_WD /
/// PING_ATTEMPTS`, matching the timed-lock granularity of the original
/// `pthread_mutex_timedlock` call this pipeline is modeled on.
pub const PING_ATTEMPTS: u32 = 4;

/// Timeout used for every timed lock/condvar wait attempt. Each timeout
/// re-pings the watchdog and retries, so a worker can never appear dead
/// merely because contention stretched a lock attempt past `T_WD`.
pub const LOCK_SLICE: Duration =
    Duration::from_nanos((T_WD.as_nanos() / PING_ATTEMPTS as u128) as u64);

/// Directory log files are written to when file logging is enabled.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Path to the kernel counter pseudo-file this pipeline reads.
pub const PROC_STAT_PATH: &str = "/proc/stat";
