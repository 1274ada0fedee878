//! Pending-task queue owned by the pool actor.

use std::collections::VecDeque;

use tokio::time::Instant;

use crate::tasks::{Task, TaskId};

/// A task waiting for a unit.
#[derive(Debug)]
pub(crate) struct QueuedTask {
    pub(crate) task: Task,
    pub(crate) enqueued_at: Instant,
    /// Runs lost to unit faults so far.
    pub(crate) attempts: u32,
}

impl QueuedTask {
    pub(crate) fn new(task: Task) -> Self {
        Self {
            task,
            enqueued_at: Instant::now(),
            attempts: 0,
        }
    }
}

/// FIFO with a front lane for requeued work.
///
/// Ordering is priority-desc then insertion order; [`take_sorted`](Self::take_sorted)
/// applies a stable sort so FIFO holds inside a band and requeued tasks stay
/// ahead of newer work of the same priority.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    items: VecDeque<QueuedTask>,
}

impl PendingQueue {
    pub(crate) fn push_back(&mut self, q: QueuedTask) {
        self.items.push_back(q);
    }

    /// Puts `batch` at the front, keeping its internal order.
    pub(crate) fn push_front_all(&mut self, batch: Vec<QueuedTask>) {
        for q in batch.into_iter().rev() {
            self.items.push_front(q);
        }
    }

    pub(crate) fn remove(&mut self, task_id: &TaskId) -> Option<QueuedTask> {
        let pos = self.items.iter().position(|q| &q.task.task_id == task_id)?;
        self.items.remove(pos)
    }

    /// Empties the queue, returning its content in placement order.
    pub(crate) fn take_sorted(&mut self) -> Vec<QueuedTask> {
        let mut all: Vec<QueuedTask> = self.items.drain(..).collect();
        all.sort_by(|a, b| b.task.priority.cmp(&a.task.priority));
        all
    }

    /// Puts back what a pass could not place (already in placement order).
    pub(crate) fn restore(&mut self, rest: Vec<QueuedTask>) {
        debug_assert!(self.items.is_empty());
        self.items.extend(rest);
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &QueuedTask> {
        self.items.iter()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = QueuedTask> + '_ {
        self.items.drain(..)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Priority, TaskType};
    use serde_json::Value;

    fn q(id: &str, p: Priority) -> QueuedTask {
        QueuedTask::new(Task::new(id.into(), TaskType::Validation, Value::Null).with_priority(p))
    }

    fn ids(v: &[QueuedTask]) -> Vec<&str> {
        v.iter().map(|q| q.task.task_id.as_str()).collect()
    }

    #[test]
    fn sorts_by_band_keeping_fifo() {
        let mut queue = PendingQueue::default();
        queue.push_back(q("l1", Priority::Low));
        queue.push_back(q("n1", Priority::Normal));
        queue.push_back(q("h1", Priority::High));
        queue.push_back(q("n2", Priority::Normal));
        queue.push_back(q("h2", Priority::High));
        assert_eq!(ids(&queue.take_sorted()), vec!["h1", "h2", "n1", "n2", "l1"]);
    }

    #[test]
    fn requeued_work_goes_first_within_its_band() {
        let mut queue = PendingQueue::default();
        queue.push_back(q("new", Priority::Normal));
        queue.push_front_all(vec![q("r1", Priority::Normal), q("r2", Priority::Normal)]);
        queue.push_back(q("hi", Priority::High));
        assert_eq!(ids(&queue.take_sorted()), vec!["hi", "r1", "r2", "new"]);
    }

    #[test]
    fn remove_by_id() {
        let mut queue = PendingQueue::default();
        queue.push_back(q("a", Priority::Normal));
        queue.push_back(q("b", Priority::Normal));
        assert!(queue.remove(&TaskId::from("a")).is_some());
        assert!(queue.remove(&TaskId::from("a")).is_none());
        assert_eq!(queue.len(), 1);
    }
}
