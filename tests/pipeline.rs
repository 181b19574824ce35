//! End-to-end scenarios that exercise more than one module at once:
//! logging an entire enqueue-to-drain lifecycle, and shutdown choreography
//! across two linked contexts without a real Reader/Analyzer thread.

use orb_cpu_tracker::{
    logger::{self, Level, LogRecord},
    watchdog::{WatchdogCtx, WorkerId},
    worker_ctx::WorkerCtx,
};
use std::{fs, sync::Arc, thread, time::Duration};

#[test]
fn a_consumer_thread_drains_everything_a_producer_enqueues_before_shutdown() {
    let ctx: Arc<WorkerCtx<u32>> = Arc::new(WorkerCtx::new());
    let watchdog = Arc::new(WatchdogCtx::new());

    let consumer = {
        let ctx = Arc::clone(&ctx);
        let watchdog = Arc::clone(&watchdog);
        thread::spawn(move || {
            let mut received = Vec::new();
            while let Some(item) = ctx.wait_pop(&watchdog, WorkerId::Analyzer, || true) {
                received.push(item);
            }
            received
        })
    };

    for i in 0..50 {
        ctx.push_back(i, &watchdog, WorkerId::Reader);
    }
    thread::sleep(Duration::from_millis(20));
    ctx.order_termination(&watchdog, WorkerId::Reader);

    let received = consumer.join().unwrap();
    assert_eq!(received, (0..50).collect::<Vec<_>>());
    assert!(ctx.drain().is_empty());
}

#[test]
fn shutdown_ordering_releases_a_chain_of_two_waiting_consumers() {
    let upstream: Arc<WorkerCtx<u32>> = Arc::new(WorkerCtx::new());
    let downstream: Arc<WorkerCtx<u32>> = Arc::new(WorkerCtx::new());
    let watchdog = Arc::new(WatchdogCtx::new());

    // Mimics Analyzer: pop from upstream, push to downstream, exit and
    // order downstream's termination once upstream has none left.
    let analyzer = {
        let upstream = Arc::clone(&upstream);
        let downstream = Arc::clone(&downstream);
        let watchdog = Arc::clone(&watchdog);
        thread::spawn(move || {
            while let Some(item) = upstream.wait_pop(&watchdog, WorkerId::Analyzer, || true) {
                downstream.push_back(item * 2, &watchdog, WorkerId::Analyzer);
            }
            downstream.order_termination(&watchdog, WorkerId::Analyzer);
        })
    };

    let printer = {
        let downstream = Arc::clone(&downstream);
        let watchdog = Arc::clone(&watchdog);
        thread::spawn(move || {
            let mut received = Vec::new();
            while let Some(item) = downstream.wait_pop(&watchdog, WorkerId::Printer, || true) {
                received.push(item);
            }
            received
        })
    };

    for i in 0..10 {
        upstream.push_back(i, &watchdog, WorkerId::Reader);
    }
    thread::sleep(Duration::from_millis(20));
    upstream.order_termination(&watchdog, WorkerId::Reader);

    analyzer.join().unwrap();
    let received = printer.join().unwrap();
    assert_eq!(received, (0..10).map(|i| i * 2).collect::<Vec<_>>());
}

#[test]
fn logger_round_trips_records_through_a_real_sink_after_shutdown() {
    let ctx: Arc<WorkerCtx<LogRecord>> = Arc::new(WorkerCtx::new());
    let watchdog = Arc::new(WatchdogCtx::new());
    let dir = tempfile::tempdir().unwrap();
    let sink = logger::init_sink(false, dir.path()).unwrap();

    let logger_thread = {
        let ctx = Arc::clone(&ctx);
        let watchdog = Arc::clone(&watchdog);
        thread::spawn(move || logger::run(&ctx, &watchdog, sink))
    };

    for i in 0..20 {
        logger::enqueue(
            &ctx,
            &watchdog,
            WorkerId::Reader,
            LogRecord::new(Level::Info, "pipeline.rs", i, format!("message {i}")),
        );
    }
    thread::sleep(Duration::from_millis(20));
    ctx.order_termination(&watchdog, WorkerId::Reader);
    logger_thread.join().unwrap();

    let path = {
        let mut entries = fs::read_dir(dir.path()).unwrap();
        entries.next().unwrap().unwrap().path()
    };
    let contents = fs::read_to_string(path).unwrap();
    assert_eq!(contents.lines().count(), 20);
    assert!(contents.contains("message 0"));
    assert!(contents.contains("message 19"));
}
