//! Propagation Statistics.
//!
//! Counters incremented during propagation go through the trail, so a
//! failed branch restores them along with the rest of the store state.

/// Identifies one statistic for querying and trailed restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Primitive narrowing operations executed.
    NarrowingOps,
    /// Consistency failures observed.
    Failures,
    /// Constraint nodes created.
    NodesCreated,
    /// Intervals created (declared or intermediate).
    IntervalsCreated,
    /// Propagation rounds run.
    Rounds,
    /// Rounds that ended on the work throttle.
    ThrottledRounds,
    /// High-water mark of narrowing operations consumed by one round.
    MaxOpsUsed,
}

/// Counter block for the engine.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Primitive narrowing operations executed.
    pub narrowing_ops: u64,
    /// Consistency failures observed.
    pub failures: u64,
    /// Constraint nodes created.
    pub nodes_created: u64,
    /// Intervals created (declared or intermediate).
    pub intervals_created: u64,
    /// Propagation rounds run.
    pub rounds: u64,
    /// Rounds that ended on the work throttle.
    pub throttled_rounds: u64,
    /// High-water mark of narrowing operations consumed by one round; can
    /// exceed the configured budget while significant updates keep a round
    /// alive.
    pub max_ops_used: u64,
}

impl Stats {
    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        *self = Stats::default();
    }

    /// Query one counter.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> u64 {
        match kind {
            StatKind::NarrowingOps => self.narrowing_ops,
            StatKind::Failures => self.failures,
            StatKind::NodesCreated => self.nodes_created,
            StatKind::IntervalsCreated => self.intervals_created,
            StatKind::Rounds => self.rounds,
            StatKind::ThrottledRounds => self.throttled_rounds,
            StatKind::MaxOpsUsed => self.max_ops_used,
        }
    }

    /// Owned copy of every counter at this instant.
    #[must_use]
    pub fn snapshot(&self) -> Stats {
        self.clone()
    }

    pub(crate) fn bump(&mut self, kind: StatKind) {
        match kind {
            StatKind::NarrowingOps => self.narrowing_ops += 1,
            StatKind::Failures => self.failures += 1,
            StatKind::NodesCreated => self.nodes_created += 1,
            StatKind::IntervalsCreated => self.intervals_created += 1,
            StatKind::Rounds => self.rounds += 1,
            StatKind::ThrottledRounds => self.throttled_rounds += 1,
            StatKind::MaxOpsUsed => self.max_ops_used += 1,
        }
    }

    pub(crate) fn unbump(&mut self, kind: StatKind) {
        match kind {
            StatKind::NarrowingOps => self.narrowing_ops -= 1,
            StatKind::Failures => self.failures -= 1,
            StatKind::NodesCreated => self.nodes_created -= 1,
            StatKind::IntervalsCreated => self.intervals_created -= 1,
            StatKind::Rounds => self.rounds -= 1,
            StatKind::ThrottledRounds => self.throttled_rounds -= 1,
            StatKind::MaxOpsUsed => self.max_ops_used -= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_get_reset() {
        let mut s = Stats::default();
        s.bump(StatKind::NarrowingOps);
        s.bump(StatKind::NarrowingOps);
        s.bump(StatKind::Failures);
        assert_eq!(s.get(StatKind::NarrowingOps), 2);
        assert_eq!(s.get(StatKind::Failures), 1);
        s.unbump(StatKind::NarrowingOps);
        assert_eq!(s.get(StatKind::NarrowingOps), 1);
        s.reset();
        assert_eq!(s.get(StatKind::NarrowingOps), 0);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut s = Stats::default();
        s.max_ops_used = 42;
        let snap = s.snapshot();
        s.reset();
        assert_eq!(snap.get(StatKind::MaxOpsUsed), 42);
        assert_eq!(s.get(StatKind::MaxOpsUsed), 0);
    }
}
