//! The coordinator: one priority queue per agent kind, a fixed worker pool
//! per kind, a resource monitor that scales the parser pool, and a
//! stuck-task watchdog. Mirrors the "conductor" policy described for
//! `spec.md` §4.9 — tasks are routed to reused agent instances by type,
//! never spawned per task.

use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use codegraph_config::CoordinatorConfig;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pool::ResizablePool;
use crate::resource::ResourceMonitor;
use crate::task::{AgentKind, QueueEntry};

struct TaskRecord {
    kind: AgentKind,
    started_at: Instant,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    queues: Mutex<HashMap<AgentKind, BinaryHeap<QueueEntry>>>,
    queue_len: AtomicU64,
    running: Mutex<HashMap<Uuid, TaskRecord>>,
    pools: HashMap<AgentKind, ResizablePool>,
    resource_monitor: ResourceMonitor,
    metrics: Metrics,
    notify: Arc<Notify>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Arc<Self> {
        let mut pools = HashMap::new();
        pools.insert(AgentKind::Parser, ResizablePool::new(config.parser_workers));
        pools.insert(AgentKind::Indexer, ResizablePool::new(config.indexer_workers));
        pools.insert(AgentKind::Query, ResizablePool::new(config.query_workers));
        pools.insert(AgentKind::Semantic, ResizablePool::new(config.semantic_workers));
        pools.insert(AgentKind::Dev, ResizablePool::new(1));
        pools.insert(AgentKind::Research, ResizablePool::new(1));

        let mut queues = HashMap::new();
        for kind in AgentKind::ALL {
            queues.insert(kind, BinaryHeap::new());
        }

        let coordinator = Arc::new(Self {
            config,
            queues: Mutex::new(queues),
            queue_len: AtomicU64::new(0),
            running: Mutex::new(HashMap::new()),
            pools,
            resource_monitor: ResourceMonitor::new(),
            metrics: Metrics::default(),
            notify: Arc::new(Notify::new()),
        });

        tokio::spawn(dispatch_loop(coordinator.clone()));
        tokio::spawn(resource_watch_loop(coordinator.clone()));
        tokio::spawn(watchdog_loop(coordinator.clone()));

        coordinator
    }

    /// Enqueue `work` under `kind` at `priority`, run it once a pool slot
    /// opens, and return its result or a deadline/backpressure error.
    pub async fn submit<F, Fut, T>(&self, kind: AgentKind, priority: i32, work: F) -> CoordinatorResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.queue_len.load(Ordering::SeqCst) as usize >= self.config.queue_capacity {
            self.metrics.backpressured.fetch_add(1, Ordering::Relaxed);
            return Err(CoordinatorError::Backpressure(self.config.queue_capacity));
        }

        let id = Uuid::new_v4();
        let (ready_tx, ready_rx) = oneshot::channel();
        {
            let mut queues = self.queues.lock();
            queues.get_mut(&kind).expect("all agent kinds have a queue").push(QueueEntry {
                id,
                kind,
                priority,
                created_at: Instant::now(),
                ready_tx,
            });
        }
        self.queue_len.fetch_add(1, Ordering::SeqCst);
        self.metrics.submitted.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();

        let permit = ready_rx.await.map_err(|_| CoordinatorError::ShuttingDown)?;
        self.queue_len.fetch_sub(1, Ordering::SeqCst);

        self.running.lock().insert(id, TaskRecord { kind, started_at: Instant::now() });
        let deadline = self.deadline_for(kind);
        let result = tokio::time::timeout(deadline, work()).await;
        self.running.lock().remove(&id);
        drop(permit);
        self.notify.notify_one();

        match result {
            Ok(value) => {
                self.metrics.completed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(_) => {
                self.metrics.timed_out.fetch_add(1, Ordering::Relaxed);
                Err(CoordinatorError::DeadlineExceeded(deadline))
            }
        }
    }

    fn deadline_for(&self, kind: AgentKind) -> Duration {
        let ms = match kind {
            AgentKind::Indexer => self.config.indexing_deadline_ms,
            _ => self.config.default_deadline_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        let queue_len = self.queue_len.load(Ordering::SeqCst);
        let shrunk = self.pools[&AgentKind::Parser].is_shrunk();
        self.metrics.snapshot(queue_len, shrunk)
    }
}

async fn dispatch_loop(coordinator: Arc<Coordinator>) {
    loop {
        coordinator.notify.notified().await;
        loop {
            let mut progressed = false;
            for kind in AgentKind::ALL {
                let pool = &coordinator.pools[&kind];
                if pool.available() == 0 {
                    continue;
                }
                let entry = {
                    let mut queues = coordinator.queues.lock();
                    queues.get_mut(&kind).and_then(|heap| heap.pop())
                };
                let Some(entry) = entry else { continue };
                match pool.try_acquire() {
                    Some(permit) => {
                        let _ = entry.ready_tx.send(permit);
                        progressed = true;
                    }
                    None => {
                        // Pool was claimed between the availability check
                        // and acquire; put the task back for next round.
                        let mut queues = coordinator.queues.lock();
                        queues.get_mut(&kind).unwrap().push(entry);
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }
}

async fn resource_watch_loop(coordinator: Arc<Coordinator>) {
    let interval = Duration::from_millis(coordinator.config.resource_sample_interval_ms);
    loop {
        tokio::time::sleep(interval).await;
        let usage = coordinator.resource_monitor.memory_usage_fraction();
        let parser_pool = &coordinator.pools[&AgentKind::Parser];
        if usage >= coordinator.config.memory_high_watermark {
            if !parser_pool.is_shrunk() {
                warn!(usage, "memory high watermark crossed, shrinking parser pool");
            }
            parser_pool.shrink_to_half();
        } else if usage <= coordinator.config.memory_low_watermark && parser_pool.is_shrunk() {
            info!(usage, "memory below low watermark, restoring parser pool");
            parser_pool.restore_full();
            coordinator.notify.notify_one();
        }
    }
}

async fn watchdog_loop(coordinator: Arc<Coordinator>) {
    let threshold = Duration::from_millis(coordinator.config.stuck_task_threshold_ms);
    let mut tick = tokio::time::interval(threshold.min(Duration::from_secs(5)).max(Duration::from_millis(100)));
    loop {
        tick.tick().await;
        let stuck: Vec<(Uuid, AgentKind)> = coordinator
            .running
            .lock()
            .iter()
            .filter(|(_, record)| record.started_at.elapsed() >= threshold)
            .map(|(id, record)| (*id, record.kind))
            .collect();
        for (id, kind) in stuck {
            warn!(task_id = %id, agent_kind = kind.as_str(), "task exceeded stuck-task threshold");
            coordinator.metrics.stuck_incidents.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CoordinatorConfig {
        CoordinatorConfig {
            parser_workers: 1,
            indexer_workers: 1,
            query_workers: 1,
            semantic_workers: 1,
            queue_capacity: 2,
            default_deadline_ms: 200,
            indexing_deadline_ms: 200,
            stuck_task_threshold_ms: 60_000,
            resource_sample_interval_ms: 50,
            memory_high_watermark: 0.99,
            memory_low_watermark: 0.01,
        }
    }

    #[tokio::test]
    async fn submitted_task_runs_and_completes() {
        let coordinator = Coordinator::new(test_config());
        let result = coordinator.submit(AgentKind::Query, 1, || async { 42 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn deadline_exceeded_is_reported() {
        let coordinator = Coordinator::new(test_config());
        let result = coordinator
            .submit(AgentKind::Query, 1, || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
            })
            .await;
        assert!(matches!(result, Err(CoordinatorError::DeadlineExceeded(_))));
    }

    #[tokio::test]
    async fn metrics_track_completion() {
        let coordinator = Coordinator::new(test_config());
        coordinator.submit(AgentKind::Query, 1, || async { 1 }).await.unwrap();
        let metrics = coordinator.get_metrics();
        assert_eq!(metrics.completed, 1);
    }

    #[tokio::test]
    async fn queue_at_capacity_rejects_new_submissions() {
        let config = test_config();
        let coordinator = Coordinator::new(config.clone());

        // Occupy the single query worker so nothing behind it can dispatch.
        let held = coordinator.clone();
        tokio::spawn(async move {
            let _ = held
                .submit(AgentKind::Query, 1, || async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                })
                .await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Fill the queue behind the busy worker up to capacity.
        for _ in 0..config.queue_capacity {
            let queued = coordinator.clone();
            tokio::spawn(async move {
                let _ = queued.submit(AgentKind::Query, 1, || async { 0 }).await;
            });
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = coordinator.submit(AgentKind::Query, 1, || async { 0 }).await;
        assert!(matches!(result, Err(CoordinatorError::Backpressure(_))));

        // Once the worker frees up, the already-queued tasks still drain.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let metrics = coordinator.get_metrics();
        assert!(metrics.completed >= config.queue_capacity as u64);
    }
}
