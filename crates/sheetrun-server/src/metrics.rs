//! Prometheus metrics collection and formatting.
//!
//! This module provides run counters in Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sheetrun_core::Category;

/// Counters of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub in_flight: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Process-wide run counters, by category.
#[derive(Debug, Default)]
pub struct RunMetrics {
    counters: Mutex<BTreeMap<Category, RunCounters>>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a run of `category` as in flight until the returned guard is
    /// finished or dropped.
    pub fn start_run(self: &Arc<Self>, category: &Category) -> RunGuard {
        self.lock().entry(category.clone()).or_default().in_flight += 1;
        RunGuard {
            metrics: Arc::clone(self),
            category: category.clone(),
            success: None,
        }
    }

    pub fn snapshot(&self, category: &Category) -> RunCounters {
        self.lock().get(category).copied().unwrap_or_default()
    }

    fn end_run(&self, category: &Category, success: Option<bool>) {
        let mut counters = self.lock();
        let entry = counters.entry(category.clone()).or_default();
        entry.in_flight = entry.in_flight.saturating_sub(1);
        match success {
            Some(true) => entry.succeeded += 1,
            Some(false) => entry.failed += 1,
            None => {}
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Category, RunCounters>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An in-flight run. Dropping it without [`RunGuard::finish`] (the request
/// was cancelled) only clears the in-flight count.
#[derive(Debug)]
pub struct RunGuard {
    metrics: Arc<RunMetrics>,
    category: Category,
    success: Option<bool>,
}

impl RunGuard {
    pub fn finish(mut self, success: bool) {
        self.success = Some(success);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.metrics.end_run(&self.category, self.success);
    }
}

/// Format all counters as Prometheus text.
pub fn collect_metrics(metrics: &RunMetrics) -> String {
    let counters = metrics.lock();
    let mut output = String::new();

    writeln!(
        output,
        "# HELP sheetrun_runs_total Number of finished runs by category and outcome"
    )
    .ok();
    writeln!(output, "# TYPE sheetrun_runs_total counter").ok();
    for (category, c) in counters.iter() {
        writeln!(
            output,
            "sheetrun_runs_total{{category=\"{category}\",outcome=\"succeeded\"}} {}",
            c.succeeded
        )
        .ok();
        writeln!(
            output,
            "sheetrun_runs_total{{category=\"{category}\",outcome=\"failed\"}} {}",
            c.failed
        )
        .ok();
    }

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP sheetrun_runs_in_flight Number of runs currently executing by category"
    )
    .ok();
    writeln!(output, "# TYPE sheetrun_runs_in_flight gauge").ok();
    for (category, c) in counters.iter() {
        writeln!(
            output,
            "sheetrun_runs_in_flight{{category=\"{category}\"}} {}",
            c.in_flight
        )
        .ok();
    }

    output
}
