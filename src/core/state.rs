//! # PoolState: everything the pool actor owns.
//!
//! Units, the pending queue, the pending-request map and the in-flight table
//! live here and are mutated only through `&mut self`. The actor
//! ([`actor`](super::actor)) is a thin async shell that feeds commands, unit
//! events and timer ticks into these synchronous methods, which keeps the
//! scheduling logic testable without a runtime driving real units.
//!
//! ## Scheduling pass
//! ```text
//! take_sorted(queue)                    (priority desc, FIFO inside a band)
//!   for each queued task:
//!     no unit with spare capacity?  → stop, put the rest back
//!     candidates = accepting ∧ spare ∧ supports(type)
//!     empty?                        → keep queued, continue
//!     balancer.pick(candidates)     → assign (TaskDispatch, no ack)
//!     pick not among candidates?    → warn, keep queued
//! ```
//!
//! ## Rules
//! - `unit.active.len() <= capacity` for every unit, at every point
//! - a task id is in `pending` at most once; removal resolves its caller
//! - an id still held by a unit is not accepted again, even after cancel
//! - a task is either queued or in flight, never both
//! - messages from an older generation of a unit are ignored

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::balancer::{Candidate, LoadBalancer};
use crate::error::{DispatchError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{
    CancelRequest, DispatchRequest, Envelope, HealthReport, MessageKind, TaskErrorReport,
    VersionReport,
};
use crate::subscribers::panic_message;
use crate::tasks::{Task, TaskId, TaskOutcome, TaskProgress, TaskResult, TaskType};
use crate::units::{
    ExecutionUnit, UnitCapabilities, UnitEvent, UnitEventKind, UnitFactory, UnitHealth, UnitId,
};

use super::pending::{Callbacks, PendingRequest, Reply};
use super::queue::{PendingQueue, QueuedTask};
use super::stats::{PoolStatistics, UnitInfo};

/// A task currently held by a unit.
pub(crate) struct InFlight {
    pub(crate) task: Task,
    pub(crate) unit: UnitId,
    pub(crate) attempts: u32,
    pub(crate) enqueued_at: Instant,
}

#[derive(Default)]
struct Counters {
    total: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
    requeued: u64,
    processing_ms: u64,
    timed: u64,
}

pub(crate) struct PoolState {
    pub(crate) units: Vec<ExecutionUnit>,
    pub(crate) factory: Box<dyn UnitFactory>,
    balancer: Box<dyn LoadBalancer>,
    pub(crate) queue: PendingQueue,
    pub(crate) pending: HashMap<TaskId, PendingRequest>,
    pub(crate) in_flight: HashMap<TaskId, InFlight>,
    /// Units whose inbox turned out closed during a pass; recovered after it.
    pub(crate) broken: Vec<UnitId>,
    pub(crate) expected_version: u32,
    counters: Counters,
    pub(crate) bus: Bus,
}

impl PoolState {
    /// Spawns one unit per capability entry (unit `i` gets entry `i`).
    pub(crate) fn new(
        capabilities: Vec<UnitCapabilities>,
        mut factory: Box<dyn UnitFactory>,
        balancer: Box<dyn LoadBalancer>,
        expected_version: u32,
        bus: Bus,
    ) -> Self {
        let units = capabilities
            .into_iter()
            .enumerate()
            .map(|(i, caps)| {
                let id = UnitId(i as u32);
                let link = factory.spawn(id, 0, &caps);
                bus.publish(Event::new(EventKind::UnitStarted).with_unit(id).with_attempt(0));
                ExecutionUnit::new(id, caps, link)
            })
            .collect();

        debug!(balancer = balancer.name(), "pool state initialised");
        Self {
            units,
            factory,
            balancer,
            queue: PendingQueue::default(),
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            broken: Vec::new(),
            expected_version,
            counters: Counters::default(),
            bus,
        }
    }

    /// True when at least one unit declares `task_type`.
    pub(crate) fn supports(&self, task_type: TaskType) -> bool {
        self.units.iter().any(|u| u.capabilities.supports(task_type))
    }

    /// Registers the caller, queues the task and runs a pass.
    pub(crate) fn submit(&mut self, task: Task, callbacks: Callbacks, reply: Reply) {
        let id = task.task_id.clone();
        // a cancelled run keeps its slot until the unit answers
        let rejection = if self.pending.contains_key(&id) || self.in_flight.contains_key(&id) {
            Some(DispatchError::DuplicateTaskId { task_id: id.clone() })
        } else if !self.supports(task.task_type) {
            Some(DispatchError::UnsupportedTaskType {
                task_type: task.task_type,
            })
        } else {
            None
        };
        if let Some(err) = rejection {
            self.bus.publish(
                Event::new(EventKind::TaskRejected)
                    .with_task(&id, task.task_type)
                    .with_reason(err.as_label()),
            );
            let _ = reply.send(Err(err));
            return;
        }

        self.counters.total += 1;
        self.bus.publish(
            Event::new(EventKind::TaskSubmitted)
                .with_task(&id, task.task_type)
                .with_reason(format!("{:?}", task.priority).to_lowercase()),
        );
        self.pending.insert(id, PendingRequest::new(reply, callbacks));
        self.queue.push_back(QueuedTask::new(task));
        self.schedule_pass();
    }

    /// One greedy placement pass; returns the number of tasks assigned.
    pub(crate) fn schedule_pass(&mut self) -> usize {
        let mut placed = 0;
        let mut rest = Vec::new();
        let mut queued = self.queue.take_sorted().into_iter();

        for q in queued.by_ref() {
            if !self.units.iter().any(ExecutionUnit::is_candidate) {
                rest.push(q);
                break;
            }
            match self.place(q) {
                Ok(()) => placed += 1,
                Err(q) => rest.push(q),
            }
        }
        rest.extend(queued);
        self.queue.restore(rest);

        if placed > 0 {
            trace!(placed, queue_depth = self.queue.len(), "scheduling pass");
        }
        self.recover_broken();
        placed
    }

    fn place(&mut self, q: QueuedTask) -> Result<(), QueuedTask> {
        let task_type = q.task.task_type;
        let candidates: Vec<Candidate<'_>> = self
            .units
            .iter()
            .filter(|u| u.is_candidate() && u.capabilities.supports(task_type))
            .map(|u| Candidate {
                id: u.id,
                load: u.active.len(),
                capabilities: &u.capabilities,
            })
            .collect();

        let Some(chosen) = self.balancer.pick(&candidates, &q.task) else {
            return Err(q);
        };
        if !candidates.iter().any(|c| c.id == chosen) {
            warn!(
                task = %q.task.task_id,
                unit = %chosen,
                balancer = self.balancer.name(),
                "balancer picked a unit outside the candidates; keeping task queued"
            );
            return Err(q);
        }
        self.assign(chosen, q);
        Ok(())
    }

    fn assign(&mut self, unit_id: UnitId, q: QueuedTask) {
        let QueuedTask {
            task,
            enqueued_at,
            attempts,
        } = q;
        let id = task.task_id.clone();
        let attempt = attempts + 1;

        let env = match Envelope::new(
            MessageKind::TaskDispatch,
            &DispatchRequest {
                task: task.clone(),
                attempt,
            },
        ) {
            Ok(env) => env,
            Err(err) => {
                warn!(task = %id, error = %err, "cannot encode dispatch");
                self.reject(&id, task.task_type, DispatchError::Unavailable);
                return;
            }
        };

        let Some(unit) = self.units.get_mut(unit_id.index()) else {
            self.reject(&id, task.task_type, DispatchError::Unavailable);
            return;
        };
        unit.active.push(id.clone());
        let sent = unit.send(env);
        if !sent {
            // inbox gone: the host died without reporting; recover after the pass
            unit.health = UnitHealth::Unhealthy;
            self.broken.push(unit_id);
        }

        self.bus.publish(
            Event::new(EventKind::TaskAssigned)
                .with_task(&id, task.task_type)
                .with_unit(unit_id)
                .with_attempt(attempt),
        );
        self.in_flight.insert(
            id,
            InFlight {
                task,
                unit: unit_id,
                attempts,
                enqueued_at,
            },
        );
    }

    /// Routes one message or fault from a unit host.
    pub(crate) fn handle_unit_event(&mut self, ev: UnitEvent) {
        let Some(unit) = self.units.get(ev.unit.index()) else {
            return;
        };
        if unit.generation != ev.generation {
            trace!(unit = %ev.unit, generation = ev.generation, "ignoring stale unit event");
            return;
        }

        match ev.kind {
            UnitEventKind::Fault(reason) => {
                self.bus.publish(
                    Event::new(EventKind::UnitFault)
                        .with_unit(ev.unit)
                        .with_reason(reason.as_str()),
                );
                self.recover_unit(ev.unit);
            }
            UnitEventKind::Message(env) => {
                if let Err(err) = self.handle_message(ev.unit, env) {
                    warn!(unit = %ev.unit, error = %err, "dropping malformed unit message");
                }
            }
        }
    }

    fn handle_message(
        &mut self,
        unit_id: UnitId,
        env: Envelope,
    ) -> Result<(), crate::error::ProtocolError> {
        match env.kind {
            MessageKind::TaskResult => self.complete(unit_id, env.decode()?),
            MessageKind::TaskError => self.fail(unit_id, env.decode()?),
            MessageKind::TaskProgress => self.progress(env.decode()?),
            MessageKind::CapabilityAnnouncement => {
                let announced: UnitCapabilities = env.decode()?;
                let unit = &mut self.units[unit_id.index()];
                if announced != unit.capabilities {
                    debug!(unit = %unit_id, "announced capabilities differ from declared ones");
                }
                if unit.health == UnitHealth::Starting {
                    unit.health = UnitHealth::Healthy;
                }
                self.bus
                    .publish(Event::new(EventKind::CapabilitiesAnnounced).with_unit(unit_id));
            }
            MessageKind::VersionCheck => {
                let VersionReport { protocol_version } = env.decode()?;
                self.units[unit_id.index()].protocol_version = Some(protocol_version);
                if protocol_version != self.expected_version {
                    warn!(
                        unit = %unit_id,
                        expected = self.expected_version,
                        reported = protocol_version,
                        "protocol version mismatch"
                    );
                    self.bus.publish(
                        Event::new(EventKind::VersionMismatch)
                            .with_unit(unit_id)
                            .with_reason(format!(
                                "expected={} reported={protocol_version}",
                                self.expected_version
                            )),
                    );
                }
            }
            MessageKind::HealthResponse => {
                let report: HealthReport = env.decode()?;
                self.bus.publish(
                    Event::new(EventKind::ProbeResponse)
                        .with_unit(unit_id)
                        .with_reason(format!(
                            "active_tasks={} uptime_ms={}",
                            report.active_tasks, report.uptime_ms
                        )),
                );
                self.units[unit_id.index()].last_probe = Some(report);
            }
            other => trace!(unit = %unit_id, kind = %other, "ignoring unit message"),
        }
        Ok(())
    }

    /// Frees the slot held for `task_id`; `None` when nothing was in flight.
    fn release(&mut self, unit_id: UnitId, task_id: &TaskId) -> Option<InFlight> {
        let flight = self.in_flight.remove(task_id)?;
        let holder = if flight.unit == unit_id {
            unit_id
        } else {
            flight.unit
        };
        if let Some(unit) = self.units.get_mut(holder.index()) {
            unit.release(task_id);
        }
        Some(flight)
    }

    fn complete(&mut self, unit_id: UnitId, result: TaskResult) {
        let task_id = result.task_id.clone();
        if self.release(unit_id, &task_id).is_none() {
            self.orphan(&task_id, unit_id);
            return;
        }
        let took = result.metadata.processing_time_ms;
        self.units[unit_id.index()].history.record(true, took);

        match self.pending.remove(&task_id) {
            Some(req) if !req.abandoned() => {
                self.counters.completed += 1;
                self.counters.processing_ms += took;
                self.counters.timed += 1;
                self.bus.publish(
                    Event::new(EventKind::TaskCompleted)
                        .with_task(&task_id, result.task_type)
                        .with_unit(unit_id)
                        .with_attempt(result.metadata.attempt)
                        .with_duration(std::time::Duration::from_millis(took)),
                );
                trace!(task = %task_id, waited_ms = req.submitted_at.elapsed().as_millis() as u64, "result delivered");
                req.resolve(Ok(TaskOutcome::Completed(result)));
            }
            _ => self.orphan(&task_id, unit_id),
        }
        self.schedule_pass();
    }

    fn fail(&mut self, unit_id: UnitId, report: TaskErrorReport) {
        let TaskErrorReport {
            task_id,
            task_type,
            error,
            processing_time_ms,
        } = report;
        if self.release(unit_id, &task_id).is_none() {
            self.orphan(&task_id, unit_id);
            return;
        }
        self.units[unit_id.index()]
            .history
            .record(false, processing_time_ms);

        let error = TaskError::from(error);
        match self.pending.remove(&task_id) {
            Some(req) if !req.abandoned() => {
                if error == TaskError::Canceled {
                    self.counters.cancelled += 1;
                    req.resolve(Ok(TaskOutcome::Cancelled { task_id }));
                } else {
                    self.counters.failed += 1;
                    self.bus.publish(
                        Event::new(EventKind::TaskFailed)
                            .with_task(&task_id, task_type)
                            .with_unit(unit_id)
                            .with_duration(std::time::Duration::from_millis(processing_time_ms))
                            .with_reason(error.to_string()),
                    );
                    req.resolve(Err(DispatchError::Task {
                        task_id,
                        unit: unit_id,
                        error,
                    }));
                }
            }
            _ => self.orphan(&task_id, unit_id),
        }
        self.schedule_pass();
    }

    fn progress(&mut self, report: TaskProgress) {
        let Some(cb) = self
            .pending
            .get(&report.task_id)
            .and_then(|req| req.callbacks.on_progress.clone())
        else {
            return;
        };
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| cb(&report))) {
            warn!(task = %report.task_id, reason = %panic_message(&*panic), "progress callback panicked");
        }
    }

    fn orphan(&self, task_id: &TaskId, unit_id: UnitId) {
        debug!(task = %task_id, unit = %unit_id, "dropping orphaned result");
        self.bus.publish(
            Event::new(EventKind::ResultOrphaned)
                .with_task_id(task_id)
                .with_unit(unit_id),
        );
    }

    /// Resolves the caller with `err` and forgets the task.
    pub(crate) fn reject(&mut self, task_id: &TaskId, task_type: TaskType, err: DispatchError) {
        self.bus.publish(
            Event::new(EventKind::TaskRejected)
                .with_task(task_id, task_type)
                .with_reason(err.to_string()),
        );
        if let Some(req) = self.pending.remove(task_id) {
            self.counters.failed += 1;
            req.resolve(Err(err));
        }
    }

    /// Best-effort cancellation; `false` when nobody waited for `task_id`.
    pub(crate) fn cancel(&mut self, task_id: &TaskId) -> bool {
        let Some(req) = self.pending.remove(task_id) else {
            return false;
        };

        let mut holder = None;
        if self.queue.remove(task_id).is_none() {
            if let Some(flight) = self.in_flight.get(task_id) {
                holder = Some(flight.unit);
                let notice = Envelope::new(
                    MessageKind::TaskCancel,
                    &CancelRequest {
                        task_id: task_id.clone(),
                    },
                );
                if let (Ok(env), Some(unit)) = (notice, self.units.get(flight.unit.index())) {
                    // a finished or dead unit simply never acts on it
                    let _ = unit.send(env);
                }
            }
        }

        self.counters.cancelled += 1;
        let mut ev = Event::new(EventKind::TaskCancelled).with_task_id(task_id);
        if let Some(unit) = holder {
            ev = ev.with_unit(unit);
        }
        self.bus.publish(ev);
        req.resolve(Ok(TaskOutcome::Cancelled {
            task_id: task_id.clone(),
        }));
        true
    }

    /// Resolves every waiting caller with [`DispatchError::Shutdown`] and stops all units.
    pub(crate) fn shutdown(&mut self) {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        for (_, req) in self.pending.drain() {
            req.resolve(Err(DispatchError::Shutdown));
        }
        self.queue.drain().for_each(drop);
        self.in_flight.clear();
        for unit in &mut self.units {
            unit.teardown();
            unit.active.clear();
        }
    }

    pub(crate) fn statistics(&self) -> PoolStatistics {
        let active_units = self.units.iter().filter(|u| !u.active.is_empty()).count();
        let idle_units = self
            .units
            .iter()
            .filter(|u| u.active.is_empty() && u.health.accepts_work())
            .count();
        let c = &self.counters;
        PoolStatistics {
            total_units: self.units.len(),
            active_units,
            idle_units,
            total_tasks: c.total,
            completed: c.completed,
            failed: c.failed,
            cancelled: c.cancelled,
            requeued: c.requeued,
            avg_task_time_ms: if c.timed == 0 {
                0.0
            } else {
                c.processing_ms as f64 / c.timed as f64
            },
            queue_depth: self.queue.len(),
            in_flight: self.in_flight.len(),
        }
    }

    pub(crate) fn unit_info(&self) -> Vec<UnitInfo> {
        self.units
            .iter()
            .map(|u| UnitInfo {
                id: u.id,
                generation: u.generation,
                health: u.health,
                active_tasks: u.active.len(),
                max_concurrent_tasks: u.capabilities.capacity(),
                history: u.history.clone(),
                protocol_version: u.protocol_version,
                last_probe: u.last_probe.clone(),
            })
            .collect()
    }

    pub(crate) fn count_requeue(&mut self) {
        self.counters.requeued += 1;
    }
}
