use crate::tasks::Task;
use crate::units::UnitId;

use super::strategy::least_loaded;
use super::{Candidate, LoadBalancer};

/// Picks the candidate with the fewest active tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastLoaded;

impl LoadBalancer for LeastLoaded {
    fn pick(&mut self, candidates: &[Candidate<'_>], _task: &Task) -> Option<UnitId> {
        least_loaded(candidates)
    }

    fn name(&self) -> &'static str {
        "least_loaded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskType;
    use crate::units::UnitCapabilities;
    use serde_json::Value;

    #[test]
    fn first_candidate_wins_ties() {
        let caps = UnitCapabilities::all(3);
        let cands = [
            Candidate { id: UnitId(3), load: 1, capabilities: &caps },
            Candidate { id: UnitId(1), load: 0, capabilities: &caps },
            Candidate { id: UnitId(2), load: 0, capabilities: &caps },
        ];
        let task = Task::new("t".into(), TaskType::Validation, Value::Null);
        assert_eq!(LeastLoaded.pick(&cands, &task), Some(UnitId(1)));
    }
}
