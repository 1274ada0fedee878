use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::balancer::LoadBalancer;
use crate::core::PoolConfig;
use crate::events::Bus;
use crate::journal::JournalHandler;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::HandlerRef;
use crate::units::HostFactory;

use super::actor::{PoolActor, Snapshots};
use super::scheduler::Scheduler;
use super::state::PoolState;

/// Builder for constructing a [`Scheduler`].
pub struct SchedulerBuilder {
    cfg: PoolConfig,
    handler: Option<HandlerRef>,
    balancer: Option<Box<dyn LoadBalancer>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: PoolConfig) -> Self {
        Self {
            cfg,
            handler: None,
            balancer: None,
            subscribers: Vec::new(),
        }
    }

    /// Task logic every unit runs (defaults to [`JournalHandler`]).
    pub fn with_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Custom placement strategy; overrides `PoolConfig::balancer`.
    pub fn with_balancer(mut self, balancer: Box<dyn LoadBalancer>) -> Self {
        self.balancer = Some(balancer);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (task lifecycle, unit faults, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Spawns the units, the pool actor and the subscriber listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Scheduler {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if !subs.is_empty() {
            subscriber_listener(bus.subscribe(), subs);
        }

        let runtime_token = CancellationToken::new();
        let stopped = CancellationToken::new();
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(JournalHandler::new()));
        let balancer = self.balancer.unwrap_or_else(|| self.cfg.balancer.build());

        let capabilities = self.cfg.capabilities();
        let supported: HashSet<_> = capabilities
            .iter()
            .flat_map(|c| c.supported_task_types.iter().copied())
            .collect();

        let (unit_tx, unit_rx) = mpsc::unbounded_channel();
        let factory = HostFactory::new(handler, unit_tx, runtime_token.clone());
        let state = PoolState::new(
            capabilities,
            Box::new(factory),
            balancer,
            self.cfg.protocol_version,
            bus.clone(),
        );

        let (stats_tx, stats_rx) = watch::channel(state.statistics());
        let (units_tx, units_rx) = watch::channel(state.unit_info());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = PoolActor {
            state,
            commands: cmd_rx,
            unit_events: unit_rx,
            snapshots: Snapshots {
                stats: stats_tx,
                units: units_tx,
            },
            schedule_every: self.cfg.schedule_tick(),
            probe_every: self.cfg.probe_tick(),
        };
        tokio::spawn(actor.run(runtime_token.clone(), stopped.clone()));

        Scheduler {
            commands: cmd_tx,
            stats: stats_rx,
            units: units_rx,
            supported: Arc::new(supported),
            bus,
            runtime_token,
            stopped,
        }
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
fn subscriber_listener(mut rx: broadcast::Receiver<crate::events::Event>, set: Arc<SubscriberSet>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
