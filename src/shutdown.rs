//! Process-wide termination signal.
//!
//! A single flag written by the `SIGTERM` handler and read, without an
//! acquire fence, by every worker loop. That's safe here because every loop
//! either re-enters a mutex acquire (which provides the synchronization
//! edge, see [`crate::worker_ctx`]) or re-enters sleep (which does not need
//! freshness).

use eyre::{Result, WrapErr};
use once_cell::sync::Lazy;
use std::sync::{atomic::Ordering, Arc};

use std::sync::atomic::AtomicBool;

/// `true` once `SIGTERM` has been received. Negated by [`is_running`] to
/// match the pipeline's `running` vocabulary.
static TERMINATE: Lazy<Arc<AtomicBool>> = Lazy::new(|| Arc::new(AtomicBool::new(false)));

/// Returns `false` once a termination signal has been observed.
#[must_use]
pub fn is_running() -> bool {
    !TERMINATE.load(Ordering::Relaxed)
}

/// Installs the `SIGTERM` handler. No `SIGINT` handler is installed: the
/// default behavior (immediate termination) is intentional.
///
/// Idempotent: registering the handler twice is harmless, and receiving
/// `SIGTERM` twice leaves `TERMINATE` in the same state as receiving it
/// once.
pub fn install_sigterm_handler() -> Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&TERMINATE))
        .wrap_err("failed to install SIGTERM handler")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negates_the_raw_flag() {
        assert!(is_running());
        TERMINATE.store(true, Ordering::Relaxed);
        assert!(!is_running());
        // Restore for any other test running in this process.
        TERMINATE.store(false, Ordering::Relaxed);
    }
}
