//! Render statistics, passed explicitly through the driver rather than kept
//! as process-wide mutable state. See DESIGN.md for the tradeoffs behind
//! threading it explicitly instead of reaching for a static.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Min/avg/max summary of a per-thread timing or counter.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

fn summarize(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary { min: 0.0, avg: 0.0, max: 0.0 };
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Summary { min, avg, max }
}

/// Per-thread counters and timers, accumulated lock-free during the render
/// and summarized once after all workers join.
#[derive(Default)]
pub struct ThreadStats {
    pub closest_point_queries: AtomicU64,
    pub grid_queries: AtomicU64,
    total_time: AtomicU64,
    send_time: AtomicU64,
    recv_time: AtomicU64,
    cpg_time: AtomicU64,
    cpq_time: AtomicU64,
}

impl ThreadStats {
    pub fn add_total(&self, d: Duration) {
        self.total_time.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }
    pub fn add_send(&self, d: Duration) {
        self.send_time.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }
    pub fn add_recv(&self, d: Duration) {
        self.recv_time.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }
    pub fn add_cpg(&self, d: Duration) {
        self.cpg_time.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }
    pub fn add_cpq(&self, d: Duration) {
        self.cpq_time.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }
}

/// Aggregate statistics for an entire render: setup/grid-creation timing,
/// query counts, and the per-thread breakdown.
pub struct Stats {
    pub setup_closest_point_queries: AtomicU64,
    pub grid_points: AtomicU64,
    pub threads: Vec<ThreadStats>,
    pub total_time: std::sync::Mutex<Duration>,
    pub setup_time: std::sync::Mutex<Duration>,
    pub grid_creation_time: std::sync::Mutex<Duration>,
}

impl Stats {
    pub fn new(nthreads: usize) -> Stats {
        let mut threads = Vec::with_capacity(nthreads);
        threads.resize_with(nthreads, ThreadStats::default);
        Stats {
            setup_closest_point_queries: AtomicU64::new(0),
            grid_points: AtomicU64::new(0),
            threads,
            total_time: std::sync::Mutex::new(Duration::ZERO),
            setup_time: std::sync::Mutex::new(Duration::ZERO),
            grid_creation_time: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    fn thread_summary<F: Fn(&ThreadStats) -> u64>(&self, f: F) -> Summary {
        let values: Vec<f64> = self
            .threads
            .iter()
            .map(|t| f(t) as f64 / 1_000_000.0)
            .collect();
        summarize(&values)
    }

    /// Render a human-readable report of counts and timings ("Stats
    /// report (stdout)").
    pub fn report(&self) -> String {
        let total = *self.total_time.lock().unwrap();
        let setup = *self.setup_time.lock().unwrap();
        let grid_creation = *self.grid_creation_time.lock().unwrap();
        let cpq_setup = self.setup_closest_point_queries.load(Ordering::Relaxed);
        let grid_points = self.grid_points.load(Ordering::Relaxed);
        let total_cpq: u64 = self.threads.iter().map(|t| t.closest_point_queries.load(Ordering::Relaxed)).sum();
        let total_gridq: u64 = self.threads.iter().map(|t| t.grid_queries.load(Ordering::Relaxed)).sum();

        let total_ms = self.thread_summary(|t| t.total_time.load(Ordering::Relaxed));
        let send_ms = self.thread_summary(|t| t.send_time.load(Ordering::Relaxed));
        let recv_ms = self.thread_summary(|t| t.recv_time.load(Ordering::Relaxed));
        let cpg_ms = self.thread_summary(|t| t.cpg_time.load(Ordering::Relaxed));
        let cpq_ms = self.thread_summary(|t| t.cpq_time.load(Ordering::Relaxed));

        format!(
            "render stats:\n\
             \x20 closest-point queries (render): {total_cpq}\n\
             \x20 closest-point queries (setup):  {cpq_setup}\n\
             \x20 grid queries:                   {total_gridq}\n\
             \x20 grid points:                    {grid_points}\n\
             \x20 total time:        {:.2} ms\n\
             \x20 setup time:        {:.2} ms\n\
             \x20 grid creation time: {:.2} ms\n\
             \x20 per-thread total (min/avg/max ms): {:.2}/{:.2}/{:.2}\n\
             \x20 per-thread send  (min/avg/max ms): {:.2}/{:.2}/{:.2}\n\
             \x20 per-thread recv  (min/avg/max ms): {:.2}/{:.2}/{:.2}\n\
             \x20 per-thread cpg   (min/avg/max ms): {:.2}/{:.2}/{:.2}\n\
             \x20 per-thread cpq   (min/avg/max ms): {:.2}/{:.2}/{:.2}",
            total.as_secs_f64() * 1000.0,
            setup.as_secs_f64() * 1000.0,
            grid_creation.as_secs_f64() * 1000.0,
            total_ms.min, total_ms.avg, total_ms.max,
            send_ms.min, send_ms.avg, send_ms.max,
            recv_ms.min, recv_ms.avg, recv_ms.max,
            cpg_ms.min, cpg_ms.avg, cpg_ms.max,
            cpq_ms.min, cpq_ms.avg, cpq_ms.max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_empty_is_zero() {
        let s = summarize(&[]);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 0.0);
    }

    #[test]
    fn report_includes_thread_count_worth_of_data() {
        let stats = Stats::new(2);
        stats.threads[0].add_total(Duration::from_millis(10));
        stats.threads[1].add_total(Duration::from_millis(20));
        let report = stats.report();
        assert!(report.contains("per-thread total"));
    }
}
