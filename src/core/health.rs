//! # Health & recovery of execution units.
//!
//! Recovery runs on the pool actor whenever a unit host reports a fault or its
//! inbox is found closed. Probing is purely observational.
//!
//! ## Recovery
//! ```text
//! Fault(unit)
//!   ├─► unit.health = Unhealthy
//!   ├─► spawn host (same id, generation + 1), tear down the old one
//!   ├─► for each task that was active, in assignment order:
//!   │     caller gone                → forget
//!   │     attempts + 1 > retry_count → reject (UnitFailure)
//!   │     otherwise                  → requeue at the front, attempts + 1
//!   ├─► publish UnitRecreated
//!   └─► scheduling pass
//! ```
//!
//! ## Rules
//! - The unit slot never disappears: the pool never shrinks below its configured size.
//! - Probe answers are recorded and published, never acted upon.

use tracing::{debug, info};

use crate::error::DispatchError;
use crate::events::{Event, EventKind};
use crate::protocol::{Envelope, MessageKind};
use crate::units::{UnitHealth, UnitId};

use super::queue::QueuedTask;
use super::state::PoolState;

impl PoolState {
    /// Requeues the unit's work and recreates it under the same id.
    pub(crate) fn recover_unit(&mut self, unit_id: UnitId) {
        let Some(unit) = self.units.get_mut(unit_id.index()) else {
            return;
        };
        unit.health = UnitHealth::Unhealthy;
        let link = self
            .factory
            .spawn(unit_id, unit.generation + 1, &unit.capabilities);
        let lost = unit.replace(link);
        let generation = unit.generation;

        let mut requeue = Vec::with_capacity(lost.len());
        for task_id in lost {
            let Some(flight) = self.in_flight.remove(&task_id) else {
                continue;
            };
            let waiting = self
                .pending
                .get(&task_id)
                .is_some_and(|req| !req.abandoned());
            if !waiting {
                self.pending.remove(&task_id);
                continue;
            }

            let attempts = flight.attempts + 1;
            if attempts > flight.task.options.retry_count {
                self.reject(
                    &task_id,
                    flight.task.task_type,
                    DispatchError::UnitFailure {
                        task_id: task_id.clone(),
                        attempts,
                    },
                );
                continue;
            }

            self.count_requeue();
            self.bus.publish(
                Event::new(EventKind::TaskRequeued)
                    .with_task(&task_id, flight.task.task_type)
                    .with_unit(unit_id)
                    .with_attempt(attempts + 1),
            );
            requeue.push(QueuedTask {
                task: flight.task,
                enqueued_at: flight.enqueued_at,
                attempts,
            });
        }

        info!(unit = %unit_id, generation, requeued = requeue.len(), "unit recreated");
        self.queue.push_front_all(requeue);
        self.bus.publish(
            Event::new(EventKind::UnitRecreated)
                .with_unit(unit_id)
                .with_attempt(generation),
        );
        self.schedule_pass();
    }

    /// Recovers units whose inbox was found closed during the last pass.
    pub(crate) fn recover_broken(&mut self) {
        while let Some(unit_id) = self.broken.pop() {
            debug!(unit = %unit_id, "unit inbox closed");
            self.bus.publish(
                Event::new(EventKind::UnitFault)
                    .with_unit(unit_id)
                    .with_reason("inbox closed"),
            );
            self.recover_unit(unit_id);
        }
    }

    /// Sends a health probe to every unit currently accepting work.
    pub(crate) fn probe_units(&mut self) {
        for unit in &mut self.units {
            if !unit.health.accepts_work() {
                continue;
            }
            let probe = Envelope::raw(MessageKind::HealthProbe, serde_json::Value::Null);
            if !unit.send(probe) {
                unit.health = UnitHealth::Unhealthy;
                self.broken.push(unit.id);
            }
        }
        self.recover_broken();
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::tests::{pool, result_from, submit};
    use crate::error::DispatchError;
    use crate::events::EventKind;
    use crate::tasks::{Priority, Task, TaskOptions, TaskType};
    use crate::units::{UnitEvent, UnitEventKind, UnitHealth, UnitId};
    use serde_json::Value;
    use tokio::sync::oneshot;

    fn fault(unit: UnitId, generation: u32) -> UnitEvent {
        UnitEvent {
            unit,
            generation,
            kind: UnitEventKind::Fault("handler panicked: boom".into()),
        }
    }

    #[tokio::test]
    async fn fault_requeues_active_tasks_at_the_front() {
        let (mut state, factory) = pool(1, 2);
        let _rx: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| submit(&mut state, id, Priority::Normal))
            .collect();
        assert_eq!(state.units[0].active.len(), 2);
        assert_eq!(state.queue.len(), 2);

        state.handle_unit_event(fault(UnitId(0), 0));

        let unit = &state.units[0];
        assert_eq!(unit.id, UnitId(0));
        assert_eq!(unit.generation, 1);
        assert_ne!(unit.health, UnitHealth::Unhealthy);
        // the requeued pair is placed again before the two that never ran
        let redispatched = factory.dispatched(UnitId(0), 1);
        let ids: Vec<_> = redispatched.iter().map(|r| r.task.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(redispatched.iter().all(|r| r.attempt == 2));
        let waiting: Vec<_> = state.queue.iter().map(|q| q.task.task_id.as_str()).collect();
        assert_eq!(waiting, vec!["c", "d"]);
        assert_eq!(state.statistics().requeued, 2);
        assert_eq!(
            *factory.spawned.lock().unwrap(),
            vec![(UnitId(0), 0), (UnitId(0), 1)]
        );
    }

    #[tokio::test]
    async fn results_from_the_dead_generation_are_ignored() {
        let (mut state, _factory) = pool(1, 1);
        let _rx = submit(&mut state, "a", Priority::Normal);
        state.handle_unit_event(fault(UnitId(0), 0));
        state.handle_unit_event(result_from(UnitId(0), 0, "a"));
        assert_eq!(state.in_flight.len(), 1);
        assert_eq!(state.statistics().completed, 0);

        state.handle_unit_event(result_from(UnitId(0), 1, "a"));
        assert_eq!(state.statistics().completed, 1);
    }

    #[tokio::test]
    async fn retry_budget_is_enforced() {
        let (mut state, _factory) = pool(1, 1);
        let (tx, rx) = oneshot::channel();
        let task = Task::new("fragile".into(), TaskType::Validation, Value::Null)
            .with_options(TaskOptions::default().with_retry_count(1));
        state.submit(task, crate::core::Callbacks::none(), tx);
        let mut events = state.bus.subscribe();

        state.handle_unit_event(fault(UnitId(0), 0));
        assert_eq!(state.in_flight.len(), 1);
        state.handle_unit_event(fault(UnitId(0), 1));

        assert_eq!(
            rx.await.unwrap().unwrap_err(),
            DispatchError::UnitFailure {
                task_id: "fragile".into(),
                attempts: 2
            }
        );
        assert!(state.in_flight.is_empty());
        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::TaskRejected));
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::UnitRecreated).count(),
            2
        );
    }

    #[tokio::test]
    async fn cancelled_work_is_not_requeued() {
        let (mut state, _factory) = pool(1, 1);
        let _rx = submit(&mut state, "a", Priority::Normal);
        assert!(state.cancel(&"a".into()));
        state.handle_unit_event(fault(UnitId(0), 0));
        assert!(state.in_flight.is_empty());
        assert_eq!(state.queue.len(), 0);
        assert_eq!(state.statistics().requeued, 0);
    }

    #[tokio::test]
    async fn probes_reach_accepting_units() {
        let (mut state, factory) = pool(2, 1);
        state.probe_units();
        for unit in [UnitId(0), UnitId(1)] {
            let mut inboxes = factory.inboxes.lock().unwrap();
            let rx = inboxes.get_mut(&(unit, 0)).unwrap();
            assert_eq!(rx.try_recv().unwrap().kind, crate::protocol::MessageKind::HealthProbe);
        }
    }
}
