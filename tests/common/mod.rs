#![allow(dead_code)]

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use taskpool::{
    Entry, EventKind, ExecutionContext, HandlerFn, HandlerRef, JournalHandler, PoolConfig, Scheduler,
    Task, TaskError, TaskHandler, TaskId, TaskType,
};
use tokio::sync::broadcast;

/// Blocks handlers until opened.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn wait(&self) {
        let (open, cv) = &*self.inner;
        let mut guard = open.lock().unwrap();
        while !*guard {
            guard = cv.wait(guard).unwrap();
        }
    }

    pub fn open(&self) {
        let (open, cv) = &*self.inner;
        *open.lock().unwrap() = true;
        cv.notify_all();
    }
}

/// Journal handler that waits on `gate` and records start order.
pub fn gated(gate: Gate, started: Arc<Mutex<Vec<TaskId>>>) -> HandlerRef {
    let journal = JournalHandler::new();
    HandlerFn::arc(move |task: &Task, ctx: &ExecutionContext| -> Result<Value, TaskError> {
        started.lock().unwrap().push(task.task_id.clone());
        gate.wait();
        journal.execute(task, ctx)
    })
}

pub fn config(units: usize, slots: usize) -> PoolConfig {
    PoolConfig {
        unit_count: units,
        max_concurrent_tasks: slots,
        probe_interval: Duration::ZERO,
        ..PoolConfig::default()
    }
}

pub fn validation_task(id: &str) -> Task {
    Task::new(
        TaskId::from(id),
        TaskType::Validation,
        json!({"entries": [{"id": id, "content": "ok"}]}),
    )
}

pub fn january_entries() -> Vec<Entry> {
    vec![
        Entry::new("1", Some("2024-01-15"), "mid january"),
        Entry::new("2", Some("2024-02-01"), "february"),
        Entry::new("3", None, "undated"),
    ]
}

/// Polls the statistics snapshot until `cond` holds (5s limit).
pub async fn wait_for_stats(scheduler: &Scheduler, cond: impl Fn(&taskpool::PoolStatistics) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond(&scheduler.statistics()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("statistics condition not reached");
}

/// Waits for the first event of `kind` (5s limit).
pub async fn wait_for_event(rx: &mut broadcast::Receiver<taskpool::Event>, kind: EventKind) -> taskpool::Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event not observed")
}
