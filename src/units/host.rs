//! # Unit host: the worker side of an execution unit.
//!
//! Each unit is a tokio task that owns an inbox of [`Envelope`]s and runs the
//! shared [`TaskHandler`] for every dispatched task on the blocking pool. It
//! talks back to the pool actor only through [`UnitEvent`]s.
//!
//! ## Architecture
//! ```text
//! PoolActor ── Envelope ──► inbox ──► UnitHost::run()
//!                                        ├─ TaskDispatch → spawn_blocking(handler.execute)
//!                                        ├─ TaskCancel   → cancel that task's token
//!                                        └─ HealthProbe  → HealthResponse
//!
//! spawn_blocking joins ──► TaskResult / TaskError ──► outbox ──► PoolActor
//! handler panic        ──► Fault(reason)          ──► outbox ──► (host exits)
//! ```
//!
//! ## Rules
//! - On start the host announces capabilities and sends a version check.
//! - A panic inside a handler is a unit fault: the host reports it and exits.
//! - Teardown cancels every running task; their results are discarded.
//! - Every outgoing event carries `(unit, generation)` so stale hosts are ignored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::TaskError;
use crate::protocol::{
    CancelRequest, DispatchRequest, Envelope, HealthReport, MessageKind, PROTOCOL_VERSION,
    TaskErrorReport, VersionReport,
};
use crate::subscribers::panic_message;
use crate::tasks::{
    ExecutionContext, HandlerRef, ResultMetadata, TaskId, TaskProgress, TaskResult, TaskType,
};

use super::{UnitCapabilities, UnitId};

/// What a unit reports to the pool actor.
#[derive(Debug)]
pub(crate) struct UnitEvent {
    pub(crate) unit: UnitId,
    pub(crate) generation: u32,
    pub(crate) kind: UnitEventKind,
}

#[derive(Debug)]
pub(crate) enum UnitEventKind {
    /// A protocol message from the unit.
    Message(Envelope),
    /// Unrecoverable fault; the host is gone.
    Fault(String),
}

/// Actor-side handle to a running host.
pub(crate) struct UnitLink {
    inbox: mpsc::UnboundedSender<Envelope>,
    token: CancellationToken,
}

impl UnitLink {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Envelope>, token: CancellationToken) -> Self {
        Self { inbox, token }
    }

    /// A link with nobody behind it; the receiver shows what was sent.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, CancellationToken::new()), rx)
    }

    pub(crate) fn send(&self, env: Envelope) -> bool {
        self.inbox.send(env).is_ok()
    }

    pub(crate) fn teardown(&self) {
        self.token.cancel();
    }
}

/// Creates unit hosts. The pool actor calls it at start-up and on recovery.
pub(crate) trait UnitFactory: Send + 'static {
    fn spawn(&mut self, id: UnitId, generation: u32, caps: &UnitCapabilities) -> UnitLink;
}

/// Spawns [`UnitHost`]s as tokio tasks running one shared handler.
pub(crate) struct HostFactory {
    handler: HandlerRef,
    outbox: mpsc::UnboundedSender<UnitEvent>,
    runtime_token: CancellationToken,
}

impl HostFactory {
    pub(crate) fn new(
        handler: HandlerRef,
        outbox: mpsc::UnboundedSender<UnitEvent>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            handler,
            outbox,
            runtime_token,
        }
    }
}

impl UnitFactory for HostFactory {
    fn spawn(&mut self, id: UnitId, generation: u32, caps: &UnitCapabilities) -> UnitLink {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.runtime_token.child_token();
        let host = UnitHost {
            id,
            generation,
            caps: caps.clone(),
            handler: Arc::clone(&self.handler),
            inbox: rx,
            outbox: self.outbox.clone(),
            token: token.clone(),
            started: Instant::now(),
            cancels: HashMap::new(),
        };
        tokio::spawn(host.run());
        UnitLink::new(tx, token)
    }
}

/// Output of one blocking execution.
struct Finished {
    task_id: TaskId,
    task_type: TaskType,
    attempt: u32,
    elapsed_ms: u64,
    outcome: Result<Value, TaskError>,
}

struct UnitHost {
    id: UnitId,
    generation: u32,
    caps: UnitCapabilities,
    handler: HandlerRef,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    outbox: mpsc::UnboundedSender<UnitEvent>,
    token: CancellationToken,
    started: Instant,
    cancels: HashMap<TaskId, CancellationToken>,
}

impl UnitHost {
    async fn run(mut self) {
        debug!(unit = %self.id, generation = self.generation, "unit host started");
        self.post(MessageKind::CapabilityAnnouncement, &self.caps);
        self.post(
            MessageKind::VersionCheck,
            &VersionReport {
                protocol_version: PROTOCOL_VERSION,
            },
        );

        let mut running: JoinSet<Finished> = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                Some(joined) = running.join_next(), if !running.is_empty() => match joined {
                    Ok(done) => self.finish(done),
                    Err(err) if err.is_panic() => {
                        let reason = format!("handler panicked: {}", panic_message(&*err.into_panic()));
                        warn!(unit = %self.id, %reason, "unit fault");
                        self.emit(UnitEventKind::Fault(reason));
                        break;
                    }
                    Err(_) => {}
                },
                msg = self.inbox.recv() => match msg {
                    Some(env) => self.handle(env, &mut running),
                    None => break,
                },
            }
        }

        self.token.cancel();
        debug!(unit = %self.id, generation = self.generation, "unit host stopped");
    }

    fn handle(&mut self, env: Envelope, running: &mut JoinSet<Finished>) {
        match env.kind {
            MessageKind::TaskDispatch => match env.decode::<DispatchRequest>() {
                Ok(req) => self.dispatch(req, running),
                Err(err) => warn!(unit = %self.id, error = %err, "dropping malformed dispatch"),
            },
            MessageKind::TaskCancel => {
                if let Ok(CancelRequest { task_id }) = env.decode::<CancelRequest>() {
                    // already finished: nothing to do
                    if let Some(token) = self.cancels.get(&task_id) {
                        token.cancel();
                    }
                }
            }
            MessageKind::HealthProbe => {
                let report = HealthReport {
                    active_tasks: running.len(),
                    uptime_ms: self.started.elapsed().as_millis() as u64,
                };
                self.post(MessageKind::HealthResponse, &report);
            }
            other => trace!(unit = %self.id, kind = %other, "ignoring message"),
        }
    }

    fn dispatch(&mut self, req: DispatchRequest, running: &mut JoinSet<Finished>) {
        let DispatchRequest { task, attempt } = req;
        let cancel = self.token.child_token();
        self.cancels.insert(task.task_id.clone(), cancel.clone());

        let handler = Arc::clone(&self.handler);
        let progress = task.options.progress_reporting.then(|| {
            let outbox = self.outbox.clone();
            let (unit, generation, task_id) = (self.id, self.generation, task.task_id.clone());
            Box::new(move |processed: u64, total: u64| {
                let report = TaskProgress {
                    task_id: task_id.clone(),
                    processed,
                    total,
                };
                if let Ok(env) = Envelope::new(MessageKind::TaskProgress, &report) {
                    let _ = outbox.send(UnitEvent {
                        unit,
                        generation,
                        kind: UnitEventKind::Message(env),
                    });
                }
            }) as crate::tasks::ProgressSink
        });

        running.spawn_blocking(move || {
            let started = Instant::now();
            let mut ctx = ExecutionContext::new(&task, cancel);
            if let Some(sink) = progress {
                ctx = ctx.with_progress(sink);
            }
            let outcome = if handler.supports(task.task_type) {
                handler.execute(&task, &ctx)
            } else {
                Err(TaskError::Unsupported {
                    task_type: task.task_type,
                })
            };
            Finished {
                task_id: task.task_id,
                task_type: task.task_type,
                attempt,
                elapsed_ms: started.elapsed().as_millis() as u64,
                outcome,
            }
        });
    }

    fn finish(&mut self, done: Finished) {
        self.cancels.remove(&done.task_id);
        match done.outcome {
            Ok(payload) => {
                let meta = ResultMetadata {
                    processing_time_ms: done.elapsed_ms,
                    unit_id: Some(self.id),
                    attempt: done.attempt,
                };
                let result = TaskResult::ok(done.task_id, done.task_type, payload, meta);
                self.post(MessageKind::TaskResult, &result);
            }
            Err(err) => {
                let report = TaskErrorReport {
                    task_id: done.task_id,
                    task_type: done.task_type,
                    error: (&err).into(),
                    processing_time_ms: done.elapsed_ms,
                };
                self.post(MessageKind::TaskError, &report);
            }
        }
    }

    fn post<T: Serialize>(&self, kind: MessageKind, data: &T) {
        match Envelope::new(kind, data) {
            Ok(env) => self.emit(UnitEventKind::Message(env)),
            Err(err) => warn!(unit = %self.id, error = %err, "cannot encode outgoing message"),
        }
    }

    fn emit(&self, kind: UnitEventKind) {
        let _ = self.outbox.send(UnitEvent {
            unit: self.id,
            generation: self.generation,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{HandlerFn, Task, TaskOptions};
    use serde_json::json;
    use std::time::Duration;

    fn factory(
        handler: HandlerRef,
    ) -> (HostFactory, mpsc::UnboundedReceiver<UnitEvent>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        (HostFactory::new(handler, tx, token.clone()), rx, token)
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<UnitEvent>, kind: MessageKind) -> Envelope {
        loop {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("unit went silent")
                .expect("outbox closed");
            if let UnitEventKind::Message(env) = ev.kind {
                if env.kind == kind {
                    return env;
                }
            }
        }
    }

    fn dispatch(task: Task) -> Envelope {
        Envelope::new(MessageKind::TaskDispatch, &DispatchRequest { task, attempt: 1 }).unwrap()
    }

    #[tokio::test]
    async fn announces_then_runs_tasks() {
        let handler = HandlerFn::arc(|task: &Task, _ctx: &ExecutionContext| Ok(task.payload.clone()));
        let (mut f, mut rx, _token) = factory(handler);
        let link = f.spawn(UnitId(1), 0, &UnitCapabilities::all(2));

        let caps = next_message(&mut rx, MessageKind::CapabilityAnnouncement).await;
        assert_eq!(caps.decode::<UnitCapabilities>().unwrap().max_concurrent_tasks, 2);
        let version = next_message(&mut rx, MessageKind::VersionCheck).await;
        assert_eq!(version.decode::<VersionReport>().unwrap().protocol_version, PROTOCOL_VERSION);

        assert!(link.send(dispatch(Task::new("t".into(), TaskType::Validation, json!({"x": 1})))));
        let result = next_message(&mut rx, MessageKind::TaskResult).await;
        let result: TaskResult = result.decode().unwrap();
        assert!(result.success);
        assert_eq!(result.payload, Some(json!({"x": 1})));
        assert_eq!(result.metadata.unit_id, Some(UnitId(1)));
    }

    #[tokio::test]
    async fn handler_errors_come_back_as_task_errors() {
        let handler = HandlerFn::arc(|_: &Task, _: &ExecutionContext| Err(TaskError::invalid("nope")));
        let (mut f, mut rx, _token) = factory(handler);
        let link = f.spawn(UnitId(0), 0, &UnitCapabilities::all(1));

        link.send(dispatch(Task::new("t".into(), TaskType::Aggregation, json!(null))));
        let env = next_message(&mut rx, MessageKind::TaskError).await;
        let report: TaskErrorReport = env.decode().unwrap();
        assert_eq!(TaskError::from(report.error), TaskError::invalid("nope"));
    }

    #[tokio::test]
    async fn panics_become_faults() {
        let handler = HandlerFn::arc(|_: &Task, _: &ExecutionContext| -> Result<Value, TaskError> {
            panic!("boom")
        });
        let (mut f, mut rx, _token) = factory(handler);
        let link = f.spawn(UnitId(2), 4, &UnitCapabilities::all(1));
        link.send(dispatch(Task::new("t".into(), TaskType::Validation, json!(null))));

        loop {
            let ev = rx.recv().await.unwrap();
            if let UnitEventKind::Fault(reason) = ev.kind {
                assert_eq!(ev.unit, UnitId(2));
                assert_eq!(ev.generation, 4);
                assert!(reason.contains("boom"));
                break;
            }
        }
    }

    #[tokio::test]
    async fn progress_is_forwarded_when_requested() {
        let handler = HandlerFn::arc(|task: &Task, ctx: &ExecutionContext| {
            let items: Vec<u32> = serde_json::from_value(task.payload.clone())?;
            let doubled = ctx.map_batched(&items, |_, n| Ok(n * 2))?;
            Ok(json!(doubled))
        });
        let (mut f, mut rx, _token) = factory(handler);
        let link = f.spawn(UnitId(0), 0, &UnitCapabilities::all(1));

        let task = Task::new("p".into(), TaskType::MetricsExtraction, json!([1, 2, 3, 4]))
            .with_options(TaskOptions::default().with_batch_size(2).with_progress());
        link.send(dispatch(task));

        let first: TaskProgress = next_message(&mut rx, MessageKind::TaskProgress)
            .await
            .decode()
            .unwrap();
        assert_eq!((first.processed, first.total), (2, 4));
        let result: TaskResult = next_message(&mut rx, MessageKind::TaskResult)
            .await
            .decode()
            .unwrap();
        assert_eq!(result.payload, Some(json!([2, 4, 6, 8])));
    }

    #[tokio::test]
    async fn probes_are_answered() {
        let handler = HandlerFn::arc(|_: &Task, _: &ExecutionContext| Ok(Value::Null));
        let (mut f, mut rx, _token) = factory(handler);
        let link = f.spawn(UnitId(0), 0, &UnitCapabilities::all(1));
        link.send(Envelope::raw(MessageKind::HealthProbe, Value::Null));

        let report: HealthReport = next_message(&mut rx, MessageKind::HealthResponse)
            .await
            .decode()
            .unwrap();
        assert_eq!(report.active_tasks, 0);
    }
}
