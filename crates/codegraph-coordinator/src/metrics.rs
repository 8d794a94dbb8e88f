use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters, read out as a [`MetricsSnapshot`] by `get_metrics`.
#[derive(Default)]
pub struct Metrics {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub timed_out: AtomicU64,
    pub backpressured: AtomicU64,
    pub stuck_incidents: AtomicU64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub backpressured: u64,
    pub stuck_incidents: u64,
    pub queue_len: u64,
    pub parser_pool_shrunk: bool,
}

impl Metrics {
    pub fn snapshot(&self, queue_len: u64, parser_pool_shrunk: bool) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            backpressured: self.backpressured.load(Ordering::Relaxed),
            stuck_incidents: self.stuck_incidents.load(Ordering::Relaxed),
            queue_len,
            parser_pool_shrunk,
        }
    }
}
