use crate::tasks::Task;
use crate::units::UnitId;

use super::strategy::least_loaded;
use super::{Candidate, LoadBalancer};

/// Routes a task to units that list its type as preferred.
///
/// Within the preferred subset the least-loaded unit wins; with no preferred
/// candidate it degrades to [`LeastLoaded`](super::LeastLoaded) over all of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskAffinity;

impl LoadBalancer for TaskAffinity {
    fn pick(&mut self, candidates: &[Candidate<'_>], task: &Task) -> Option<UnitId> {
        least_loaded(
            candidates
                .iter()
                .filter(|c| c.capabilities.prefers(task.task_type)),
        )
        .or_else(|| least_loaded(candidates))
    }

    fn name(&self) -> &'static str {
        "task_affinity"
    }
}
