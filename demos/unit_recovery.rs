//! # Example: unit_recovery
//!
//! A handler that crashes the first time it sees a task. The unit is torn
//! down and recreated under the same id, the task goes back to the front of
//! the queue and succeeds on its second attempt.
//!
//! ## Flow
//! ```text
//! submit(flaky) ─► unit-0 (gen 0) ─► panic ─► Fault
//!     └─► UnitRecreated (gen 1) ─► TaskRequeued ─► unit-0 (gen 1) ─► result (attempt 2)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example unit_recovery
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use taskpool::{
    Callbacks, EventKind, ExecutionContext, HandlerFn, JournalHandler, PoolConfig, Scheduler, Task,
    TaskError, TaskHandler, TaskId, TaskType,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let crashed = Arc::new(AtomicBool::new(false));
    let journal = JournalHandler::new();
    let flag = Arc::clone(&crashed);
    let flaky = HandlerFn::arc(move |task: &Task, ctx: &ExecutionContext| -> Result<Value, TaskError> {
        if !flag.swap(true, Ordering::SeqCst) {
            panic!("simulated unit crash");
        }
        journal.execute(task, ctx)
    });

    let cfg = PoolConfig {
        unit_count: 1,
        ..PoolConfig::default()
    };
    let scheduler = Scheduler::builder(cfg).with_handler(flaky).build();

    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::UnitFault | EventKind::UnitRecreated | EventKind::TaskRequeued => {
                    println!("{:?} unit={:?} attempt={:?} reason={:?}", ev.kind, ev.unit, ev.attempt, ev.reason);
                }
                _ => {}
            }
        }
    });

    let task = Task::new(
        TaskId::from("flaky"),
        TaskType::Validation,
        json!({"entries": [{"id": "a", "content": "hello"}]}),
    );
    let outcome = scheduler.submit(task, Callbacks::none())?.await?;
    if let Some(result) = outcome.into_result() {
        println!(
            "result: success={} unit={:?} attempt={}",
            result.success, result.metadata.unit_id, result.metadata.attempt
        );
    }
    for unit in scheduler.unit_info() {
        println!("{} gen={} health={:?}", unit.id, unit.generation, unit.health);
    }

    scheduler.shutdown().await;
    Ok(())
}
