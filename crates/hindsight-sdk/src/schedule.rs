use serde::{Deserialize, Serialize};

/// Explicit consolidation trigger: counts learned trajectories and fires on
/// every `every`-th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSchedule {
    pub every: u64,
    pub learned: u64,
}

impl ConsolidationSchedule {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            learned: 0,
        }
    }

    /// Count one learned trajectory. Returns true when consolidation is due.
    pub fn record(&mut self) -> bool {
        self.learned += 1;
        self.learned % self.every.max(1) == 0
    }

    /// Trajectories left until the next consolidation.
    pub fn remaining(&self) -> u64 {
        let every = self.every.max(1);
        every - self.learned % every
    }
}

impl Default for ConsolidationSchedule {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_every_n() {
        let mut s = ConsolidationSchedule::new(3);
        let fired: Vec<bool> = (0..7).map(|_| s.record()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
        assert_eq!(s.learned, 7);
        assert_eq!(s.remaining(), 2);
    }

    #[test]
    fn test_resumes_from_injected_counter() {
        let mut s = ConsolidationSchedule { every: 4, learned: 3 };
        assert!(s.record());
    }
}
