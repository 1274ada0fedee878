//! # Pool configuration.
//!
//! Provides [`PoolConfig`], the settings the [`SchedulerBuilder`](crate::SchedulerBuilder)
//! reads once at start-up. Nothing here changes while the pool runs.
//!
//! ## Sentinel values
//! - `schedule_interval = 0s` → no periodic pass (passes still run on submit and result)
//! - `probe_interval = 0s` → no health probes
//! - `unit_count` is clamped to `1..=4`

use std::time::Duration;

use crate::balancer::BalancerKind;
use crate::protocol::PROTOCOL_VERSION;
use crate::tasks::TaskType;
use crate::units::UnitCapabilities;

/// Hard upper bound on the number of execution units.
pub const MAX_UNITS: usize = 4;

/// Configuration for the pool scheduler.
///
/// ## Field semantics
/// - `unit_count`: execution units spawned at start-up (clamped to `1..=MAX_UNITS`)
/// - `max_concurrent_tasks`: slots per unit when `unit_capabilities` is empty (min 1)
/// - `unit_capabilities`: explicit per-unit capabilities; entry `i` describes unit `i`
///   and overrides `unit_count`
/// - `balancer`: placement strategy
/// - `schedule_interval`: periodic pass catching tasks that could not be placed (`0` = off)
/// - `probe_interval`: observational health probes (`0` = off)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `protocol_version`: version the scheduler expects units to report
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub unit_count: usize,
    pub max_concurrent_tasks: usize,
    pub unit_capabilities: Vec<UnitCapabilities>,
    pub balancer: BalancerKind,
    pub schedule_interval: Duration,
    pub probe_interval: Duration,
    pub bus_capacity: usize,
    pub protocol_version: u32,
}

impl PoolConfig {
    /// Number of units actually spawned.
    #[inline]
    pub fn unit_count_clamped(&self) -> usize {
        if self.unit_capabilities.is_empty() {
            self.unit_count.clamp(1, MAX_UNITS)
        } else {
            self.unit_capabilities.len().min(MAX_UNITS)
        }
    }

    /// Capabilities of every unit, index = unit id.
    ///
    /// Without explicit capabilities each unit supports every task type and
    /// prefers the types whose position in [`TaskType::ALL`] maps to it
    /// (`position % unit_count == unit`).
    pub fn capabilities(&self) -> Vec<UnitCapabilities> {
        if !self.unit_capabilities.is_empty() {
            return self
                .unit_capabilities
                .iter()
                .take(MAX_UNITS)
                .cloned()
                .collect();
        }
        let n = self.unit_count_clamped();
        (0..n)
            .map(|unit| {
                let preferred = TaskType::ALL
                    .iter()
                    .enumerate()
                    .filter(|(pos, _)| pos % n == unit)
                    .map(|(_, t)| *t);
                UnitCapabilities::all(self.max_concurrent_tasks.max(1)).with_preferred(preferred)
            })
            .collect()
    }

    /// Periodic scheduling pass interval, `None` when disabled.
    #[inline]
    pub fn schedule_tick(&self) -> Option<Duration> {
        (!self.schedule_interval.is_zero()).then_some(self.schedule_interval)
    }

    /// Health probe interval, `None` when disabled.
    #[inline]
    pub fn probe_tick(&self) -> Option<Duration> {
        (!self.probe_interval.is_zero()).then_some(self.probe_interval)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for PoolConfig {
    /// Default configuration:
    ///
    /// - `unit_count` = available parallelism, clamped to `1..=4`
    /// - `max_concurrent_tasks = 3`
    /// - derived capabilities
    /// - `balancer = TaskAffinity`
    /// - `schedule_interval = 1s`, `probe_interval = 30s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map_or(2, |n| n.get());
        Self {
            unit_count: parallelism.clamp(1, MAX_UNITS),
            max_concurrent_tasks: 3,
            unit_capabilities: Vec::new(),
            balancer: BalancerKind::default(),
            schedule_interval: Duration::from_secs(1),
            probe_interval: Duration::from_secs(30),
            bus_capacity: 1024,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_count_is_capped() {
        let cfg = PoolConfig {
            unit_count: 16,
            ..PoolConfig::default()
        };
        assert_eq!(cfg.unit_count_clamped(), MAX_UNITS);
        assert_eq!(
            PoolConfig {
                unit_count: 0,
                ..PoolConfig::default()
            }
            .unit_count_clamped(),
            1
        );
    }

    #[test]
    fn derived_capabilities_spread_preferences() {
        let cfg = PoolConfig {
            unit_count: 4,
            max_concurrent_tasks: 3,
            ..PoolConfig::default()
        };
        let caps = cfg.capabilities();
        assert_eq!(caps.len(), 4);
        for t in TaskType::ALL {
            assert_eq!(caps.iter().filter(|c| c.prefers(t)).count(), 1);
        }
        assert!(caps.iter().all(|c| c.max_concurrent_tasks == 3));
    }

    #[test]
    fn zero_intervals_disable_ticks() {
        let cfg = PoolConfig {
            schedule_interval: Duration::ZERO,
            probe_interval: Duration::ZERO,
            ..PoolConfig::default()
        };
        assert_eq!(cfg.schedule_tick(), None);
        assert_eq!(cfg.probe_tick(), None);
    }
}
