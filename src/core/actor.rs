//! # PoolActor: the single owner of the scheduler state.
//!
//! All mutation of units, queue and pending requests happens inside
//! [`PoolActor::run`]. Callers reach it through an unbounded command channel;
//! unit hosts through their own event channel. After every step the actor
//! republishes the statistics snapshot, so reads never wait on it.
//!
//! ## Event loop
//! ```text
//! loop {
//!   select! (biased) {
//!     runtime_token.cancelled() → break
//!     commands.recv()           → Submit / Cancel
//!     unit_events.recv()        → results, errors, progress, handshakes, faults
//!     schedule tick             → scheduling pass
//!     probe tick                → HealthProbe to accepting units
//!   }
//!   publish snapshot (watch)
//! }
//! shutdown: resolve every caller with Shutdown, tear down units
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tasks::{Task, TaskId};
use crate::units::UnitEvent;

use super::pending::{Callbacks, Reply};
use super::state::PoolState;
use super::stats::{PoolStatistics, UnitInfo};

/// Requests from [`Scheduler`](crate::Scheduler) handles.
pub(crate) enum Command {
    Submit {
        task: Task,
        callbacks: Callbacks,
        reply: Reply,
    },
    Cancel {
        task_id: TaskId,
        reply: oneshot::Sender<bool>,
    },
}

pub(crate) struct Snapshots {
    pub(crate) stats: watch::Sender<PoolStatistics>,
    pub(crate) units: watch::Sender<Vec<UnitInfo>>,
}

pub(crate) struct PoolActor {
    pub(crate) state: PoolState,
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
    pub(crate) unit_events: mpsc::UnboundedReceiver<UnitEvent>,
    pub(crate) snapshots: Snapshots,
    pub(crate) schedule_every: Option<Duration>,
    pub(crate) probe_every: Option<Duration>,
}

impl PoolActor {
    /// Runs until `runtime_token` is cancelled or every handle is gone.
    ///
    /// `stopped` is cancelled once all callers were resolved.
    pub(crate) async fn run(mut self, runtime_token: CancellationToken, stopped: CancellationToken) {
        let mut schedule = self.schedule_every.map(ticker);
        let mut probe = self.probe_every.map(ticker);
        self.publish();

        loop {
            tokio::select! {
                biased;
                _ = runtime_token.cancelled() => break,
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(ev) = self.unit_events.recv() => self.state.handle_unit_event(ev),
                _ = tick(&mut schedule) => {
                    self.state.schedule_pass();
                }
                _ = tick(&mut probe) => self.state.probe_units(),
            }
            self.publish();
        }

        debug!("pool actor stopping");
        self.state.shutdown();
        self.publish();
        runtime_token.cancel();
        stopped.cancel();
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                task,
                callbacks,
                reply,
            } => self.state.submit(task, callbacks, reply),
            Command::Cancel { task_id, reply } => {
                let _ = reply.send(self.state.cancel(&task_id));
            }
        }
    }

    fn publish(&self) {
        self.snapshots.stats.send_replace(self.state.statistics());
        self.snapshots.units.send_replace(self.state.unit_info());
    }
}

/// Interval whose first tick is one period away.
fn ticker(period: Duration) -> Interval {
    let mut iv = time::interval_at(Instant::now() + period, period);
    iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    iv
}

/// Ticks `iv` or never resolves when it is disabled.
async fn tick(iv: &mut Option<Interval>) {
    match iv {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
