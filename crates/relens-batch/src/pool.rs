//! Fixed-size worker pool with FIFO job intake.
//!
//! `workers` OS threads pull [`JobDescriptor`]s from a shared channel
//! in submission order; there is no work stealing and no priority.
//! Each job runs to a terminal state on the thread that picked it up —
//! a failure is logged and counted, never propagated to siblings — and
//! the scope join blocks until every queued and running job has
//! drained. The only shared mutable state is the advisory completion
//! counter and the log stream; line interleaving across workers is
//! unspecified.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use tracing::{error, info};

use crate::job::{self, JobDescriptor};

/// Terminal-state tally of one batch run. `done + failed == total`
/// once `run_batch` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Jobs submitted.
    pub total: usize,
    /// Jobs that reached `Done` (including skips).
    pub done: usize,
    /// Jobs that reached `Failed`.
    pub failed: usize,
}

/// Run every job to a terminal state on a pool of `workers` threads
/// (clamped to at least 1). Returns once the queue has fully drained.
#[must_use]
pub fn run_batch(jobs: Vec<JobDescriptor>, workers: usize) -> BatchSummary {
    let total = jobs.len();
    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let (sender, receiver) = mpsc::channel();
    for descriptor in jobs {
        // The receiver outlives this loop, so send cannot fail; an
        // unexpected disconnect just shortens the batch.
        if sender.send(descriptor).is_err() {
            break;
        }
    }
    drop(sender);

    let receiver = Arc::new(Mutex::new(receiver));
    thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let completed = &completed;
            let failed = &failed;
            scope.spawn(move || {
                loop {
                    // Hold the lock only to pull the next descriptor.
                    let next = {
                        let Ok(guard) = receiver.lock() else {
                            return;
                        };
                        guard.recv()
                    };
                    let Ok(descriptor) = next else {
                        return; // queue drained
                    };

                    if let Err(e) = job::execute(&descriptor) {
                        failed.fetch_add(1, Ordering::Relaxed);
                        error!(input = %descriptor.input.display(), "job failed: {e}");
                    }

                    // Advisory progress only; never gates correctness.
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    let stem = descriptor
                        .input
                        .file_stem()
                        .unwrap_or(descriptor.input.as_os_str())
                        .to_string_lossy();
                    info!("{done:4} / {total:4}: {stem}");
                }
            });
        }
    });

    let failed = failed.load(Ordering::Relaxed);
    BatchSummary {
        total,
        done: completed.load(Ordering::Relaxed) - failed,
        failed,
    }
}
