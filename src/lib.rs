//! `cut` (CPU Usage Tracker): a multi-stage concurrent pipeline that
//! samples `/proc/stat`, computes per-core CPU utilization, renders it to
//! the terminal, and logs asynchronously, guarded by a liveness watchdog.
//!
//! # Architecture
//!
//! Five long-lived threads connected as a linear pipeline with two side
//! channels:
//!
//! ```text
//! Reader ──samples──▶ Analyzer ──usage──▶ Printer
//!                        │                   │
//!                        └──── logs ─────────┴──▶ Logger
//!                        Watchdog monitors all four
//! ```
//!
//! See [`run`] for how the pieces are wired together, and [`watchdog`] for
//! the liveness-monitoring contract that tears the process down on a
//! stuck or crashed worker.
//!
//! # Guidelines
//!
//! The code should be formatted with Rustfmt using the project-level
//! `rustfmt.toml`. The code should pass clippy lints in pedantic mode; it's
//! fine to suppress a lint locally with `#[allow(clippy::<lint>)]`.

#![warn(missing_docs, unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod analyzer;
pub mod cli;
pub mod consts;
pub mod logger;
pub mod printer;
pub mod proc_stat;
pub mod queue;
pub mod reader;
pub mod run;
pub mod shutdown;
pub mod utils;
pub mod watchdog;
pub mod worker_ctx;
