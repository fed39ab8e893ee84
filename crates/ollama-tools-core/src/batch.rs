//! Bounded worker pool for independent per-model operations.
//!
//! Updates, backups and restores all run through [`run_batch`]: a fixed
//! number of scoped worker threads pull items from a bounded channel, each
//! item is processed exactly once, and a failing item never stops the
//! others. The call returns only after every item has finished.

use crate::config::AppConfig;
use crate::error::Result;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

/// Resolve the worker count from an optional user value.
///
/// `None` picks `min(4, available_parallelism)`; anything below 1 becomes 1.
pub fn resolve_jobs(value: Option<i64>) -> usize {
    let jobs = match value {
        Some(jobs) => jobs,
        None => {
            let cpus = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            i64::try_from(cpus.min(AppConfig::MAX_DEFAULT_JOBS)).unwrap_or(1)
        }
    };
    usize::try_from(jobs.max(1)).unwrap_or(usize::MAX)
}

/// An item whose unit of work failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure<T> {
    pub item: T,
    pub reason: String,
}

/// Aggregated outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    /// Items that completed, in completion order.
    pub succeeded: Vec<T>,
    /// Items that failed, in completion order.
    pub failed: Vec<BatchFailure<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failed_items(&self) -> Vec<&T> {
        self.failed.iter().map(|f| &f.item).collect()
    }

    fn merge(&mut self, other: BatchReport<T>) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Run `unit` over every item on a pool of `jobs` workers.
///
/// Errors and panics inside `unit` are recorded against their item. Every
/// input item ends up in exactly one of `succeeded` or `failed`.
pub fn run_batch<T, F>(items: Vec<T>, jobs: usize, unit: F) -> BatchReport<T>
where
    T: Send,
    F: Fn(&T) -> Result<()> + Sync,
{
    let total = items.len();
    if total == 0 {
        return BatchReport::default();
    }

    let workers = jobs.max(1).min(total);
    debug!("Running batch of {} item(s) on {} worker(s)", total, workers);

    let (tx, rx) = mpsc::sync_channel::<T>(workers);
    let rx = Mutex::new(rx);
    let unit = &unit;
    let rx = &rx;

    let report = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    let mut local = BatchReport::default();
                    loop {
                        let next = match rx.lock() {
                            Ok(guard) => guard.recv(),
                            Err(poisoned) => poisoned.into_inner().recv(),
                        };
                        let Ok(item) = next else {
                            break;
                        };
                        match run_unit(unit, &item) {
                            Ok(()) => local.succeeded.push(item),
                            Err(reason) => {
                                debug!("Worker {} item failed: {}", worker, reason);
                                local.failed.push(BatchFailure { item, reason });
                            }
                        }
                    }
                    local
                })
            })
            .collect();

        let mut report = BatchReport::default();
        for item in items {
            if let Err(mpsc::SendError(item)) = tx.send(item) {
                report.failed.push(BatchFailure {
                    item,
                    reason: "worker pool shut down before the item was scheduled".to_string(),
                });
            }
        }
        drop(tx);

        for handle in handles {
            match handle.join() {
                Ok(local) => report.merge(local),
                Err(_) => error!("Batch worker exited abnormally"),
            }
        }
        report
    });

    info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}

fn run_unit<T, F>(unit: &F, item: &T) -> std::result::Result<(), String>
where
    F: Fn(&T) -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| unit(item))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            if e.is_fatal() {
                error!("{}", e);
            }
            Err(e.to_string())
        }
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
