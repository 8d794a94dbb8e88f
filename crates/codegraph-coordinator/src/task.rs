//! Agent kinds and the priority-queue entry type.
//!
//! `QueueEntry` orders by `(priority desc, created_at asc)`, the scheme
//! `llmspell-hooks::replay::scheduler::ScheduledReplay` uses for its
//! `BinaryHeap`-backed schedule, adapted here to agent dispatch instead of
//! timed replay.

use std::cmp::Ordering;
use std::time::Instant;

use tokio::sync::oneshot;
use tokio::sync::OwnedSemaphorePermit;
use uuid::Uuid;

/// Reusable agent types. Each is backed by one fixed worker pool; agents
/// are never spawned per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Parser,
    Indexer,
    Query,
    Semantic,
    Dev,
    Research,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Parser,
        AgentKind::Indexer,
        AgentKind::Query,
        AgentKind::Semantic,
        AgentKind::Dev,
        AgentKind::Research,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Indexer => "indexer",
            Self::Query => "query",
            Self::Semantic => "semantic",
            Self::Dev => "dev",
            Self::Research => "research",
        }
    }
}

pub(crate) struct QueueEntry {
    pub id: Uuid,
    pub kind: AgentKind,
    pub priority: i32,
    pub created_at: Instant,
    pub ready_tx: oneshot::Sender<OwnedSemaphorePermit>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn entry(id: u8, priority: i32, created_at: Instant) -> QueueEntry {
        let (tx, _rx) = oneshot::channel();
        QueueEntry {
            id: Uuid::from_u128(id as u128),
            kind: AgentKind::Query,
            priority,
            created_at,
            ready_tx: tx,
        }
    }

    #[test]
    fn higher_priority_pops_first() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(entry(1, 1, now));
        heap.push(entry(2, 5, now));
        heap.push(entry(3, 3, now));

        assert_eq!(heap.pop().unwrap().priority, 5);
        assert_eq!(heap.pop().unwrap().priority, 3);
        assert_eq!(heap.pop().unwrap().priority, 1);
    }

    #[test]
    fn same_priority_breaks_tie_by_earliest_created() {
        let now = Instant::now();
        let earlier = now;
        let later = now + std::time::Duration::from_millis(10);
        let mut heap = BinaryHeap::new();
        heap.push(entry(1, 1, later));
        heap.push(entry(2, 1, earlier));

        assert_eq!(heap.pop().unwrap().id, Uuid::from_u128(2));
    }
}
