use crate::tasks::Task;
use crate::units::UnitId;

use super::{Candidate, LoadBalancer};

/// Rotating index over the candidate list (not over the whole pool).
///
/// The candidate list shrinks and grows between calls, so the cursor is taken
/// modulo its current length.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
}

impl LoadBalancer for RoundRobin {
    fn pick(&mut self, candidates: &[Candidate<'_>], _task: &Task) -> Option<UnitId> {
        if candidates.is_empty() {
            return None;
        }
        let chosen = candidates[self.next % candidates.len()].id;
        self.next = self.next.wrapping_add(1);
        Some(chosen)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskType;
    use crate::units::UnitCapabilities;
    use serde_json::Value;

    #[test]
    fn rotates_over_candidates_ignoring_load() {
        let caps = UnitCapabilities::all(3);
        let cands = [
            Candidate { id: UnitId(0), load: 2, capabilities: &caps },
            Candidate { id: UnitId(1), load: 0, capabilities: &caps },
        ];
        let task = Task::new("t".into(), TaskType::Validation, Value::Null);
        let mut rr = RoundRobin::default();
        let picks: Vec<_> = (0..3).map(|_| rr.pick(&cands, &task).unwrap()).collect();
        assert_eq!(picks, vec![UnitId(0), UnitId(1), UnitId(0)]);
        assert_eq!(rr.pick(&[], &task), None);
    }
}
