//! Trailed Interval Store.
//!
//! Holds every interval record and constraint node, and the trail that
//! makes all mutation backtrackable. Each bound write, watcher append,
//! watcher removal, flag write, redirect, and statistics increment pushes an
//! inverse entry; [`Store::undo_to`] pops back to a [`Mark`], restoring the
//! exact pre-choice state (bounds, watcher order, counters).
//!
//! The single untrailed mutation is [`Store::nb_set_bounds`], reserved for
//! the incumbent-bound tightening of global optimisation.

use crate::config::Config;
use crate::error::{Result, SolverError};
use crate::node::{Args, IntervalId, Node, NodeId, Op};
use crate::stats::{StatKind, Stats};
use clover_math::{Ext, Interval, NumCtx};
use std::fmt;

/// Public handle to a declared interval variable.
///
/// Variables are identified with the interval they were declared with;
/// unification redirects the loser's record to the winner's, and every
/// access resolves through the redirect chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) IntervalId);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_V{}", self.0 .0)
    }
}

/// Per-interval trace action for the `watch` debugging hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchAction {
    /// No tracing.
    #[default]
    None,
    /// Emit an info-level event on every narrowing.
    Log,
    /// Emit a debug-level event on every narrowing.
    Trace,
}

/// One interval record.
#[derive(Debug, Clone)]
pub struct IntervalRec {
    /// Current enclosure.
    pub value: Interval,
    /// Nodes to re-fire when this interval narrows.
    pub watchers: Vec<NodeId>,
    /// Set when this record was merged into another by unification.
    pub redirect: Option<IntervalId>,
    /// Trace action.
    pub watch: WatchAction,
}

/// Result of an [`Store::intersect_set`] narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowed {
    /// The intersection changed nothing.
    Unchanged,
    /// The interval shrank.
    Updated {
        /// Did the relative width shrinkage exceed the progress threshold?
        significant: bool,
        /// Did the interval collapse to an exact rational point?
        collapsed: bool,
    },
}

/// Restore point for [`Store::undo_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Inverse log entry; popped on backtracking.
#[derive(Debug, Clone)]
enum TrailEntry {
    Bounds { id: IntervalId, old: Interval },
    WatcherPush { id: IntervalId },
    WatcherRemove {
        id: IntervalId,
        index: usize,
        node: NodeId,
    },
    Linked { id: NodeId, old: bool },
    Persistent { id: NodeId, old: bool },
    Redirect { id: IntervalId },
    Watch { id: IntervalId, old: WatchAction },
    NewInterval,
    NewNode,
    Stat { kind: StatKind },
    MaxOps { old: u64 },
}

/// The engine's mutable state: interval records, nodes, trail, statistics.
#[derive(Debug)]
pub struct Store {
    intervals: Vec<IntervalRec>,
    nodes: Vec<Node>,
    trail: Vec<TrailEntry>,
    /// Engine configuration.
    pub config: Config,
    /// Directed-arithmetic context derived from the configuration.
    pub ctx: NumCtx,
    /// Trailed statistics counters.
    pub stats: Stats,
}

impl Store {
    /// Create an empty store with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let ctx = NumCtx::new(config.max_rational_bits);
        Self {
            intervals: Vec::new(),
            nodes: Vec::new(),
            trail: Vec::new(),
            config,
            ctx,
            stats: Stats::default(),
        }
    }

    /// Number of live interval records.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a fresh interval record. Trailed, so a record created
    /// inside a search branch disappears on backtracking.
    pub fn new_interval(&mut self, value: Interval) -> IntervalId {
        let id = IntervalId(self.intervals.len() as u32);
        self.intervals.push(IntervalRec {
            value,
            watchers: Vec::new(),
            redirect: None,
            watch: WatchAction::None,
        });
        self.trail.push(TrailEntry::NewInterval);
        self.bump_stat(StatKind::IntervalsCreated);
        id
    }

    /// Allocate a fresh node. Trailed.
    pub fn new_node(&mut self, op: Op, args: Args) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(op, args));
        self.trail.push(TrailEntry::NewNode);
        self.bump_stat(StatKind::NodesCreated);
        id
    }

    /// Follow redirects to the representative record of `id`.
    #[must_use]
    pub fn resolve(&self, mut id: IntervalId) -> IntervalId {
        while let Some(next) = self.intervals[id.0 as usize].redirect {
            id = next;
        }
        id
    }

    /// Current enclosure of `id` (resolved).
    #[must_use]
    pub fn value(&self, id: IntervalId) -> &Interval {
        let rid = self.resolve(id);
        &self.intervals[rid.0 as usize].value
    }

    /// Record of `id` (resolved, immutable).
    #[must_use]
    pub fn record(&self, id: IntervalId) -> &IntervalRec {
        let rid = self.resolve(id);
        &self.intervals[rid.0 as usize]
    }

    /// Snapshot of the watcher list of `id` (resolved).
    #[must_use]
    pub fn watchers(&self, id: IntervalId) -> Vec<NodeId> {
        self.record(id).watchers.clone()
    }

    /// Resolved operand values of a node, in operand order.
    #[must_use]
    pub fn arg_values(&self, node: NodeId) -> Vec<Interval> {
        let args = self.nodes[node.0 as usize].args.clone();
        args.iter().map(|&a| self.value(a).clone()).collect()
    }

    /// The node behind `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Register `node` as a watcher of `id` unless already present.
    pub fn add_watcher(&mut self, id: IntervalId, node: NodeId) {
        let rid = self.resolve(id);
        let rec = &mut self.intervals[rid.0 as usize];
        if rec.watchers.contains(&node) {
            return;
        }
        rec.watchers.push(node);
        self.trail.push(TrailEntry::WatcherPush { id: rid });
    }

    /// Remove `node` from the watcher list of `id` in place (persistence
    /// trimming). Trailed; the original position is restored on undo.
    pub fn remove_watcher(&mut self, id: IntervalId, node: NodeId) {
        let rid = self.resolve(id);
        let rec = &mut self.intervals[rid.0 as usize];
        if let Some(index) = rec.watchers.iter().position(|&w| w == node) {
            rec.watchers.remove(index);
            self.trail.push(TrailEntry::WatcherRemove {
                id: rid,
                index,
                node,
            });
        }
    }

    /// Set the agenda-membership flag of a node. Trailed.
    pub fn set_linked(&mut self, id: NodeId, linked: bool) {
        let node = &mut self.nodes[id.0 as usize];
        if node.linked != linked {
            self.trail.push(TrailEntry::Linked {
                id,
                old: node.linked,
            });
            node.linked = linked;
        }
    }

    /// Mark a node persistent. Trailed.
    pub fn set_persistent(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0 as usize];
        if !node.persistent {
            self.trail.push(TrailEntry::Persistent { id, old: false });
            node.persistent = true;
        }
    }

    /// Set the trace action of an interval. Trailed.
    pub fn set_watch(&mut self, id: IntervalId, action: WatchAction) {
        let rid = self.resolve(id);
        let rec = &mut self.intervals[rid.0 as usize];
        self.trail.push(TrailEntry::Watch {
            id: rid,
            old: rec.watch,
        });
        rec.watch = action;
    }

    /// Redirect `from` to `to` after a merge. Trailed.
    pub fn set_redirect(&mut self, from: IntervalId, to: IntervalId) {
        debug_assert_ne!(self.resolve(from), self.resolve(to));
        let rec = &mut self.intervals[from.0 as usize];
        debug_assert!(rec.redirect.is_none());
        rec.redirect = Some(to);
        self.trail.push(TrailEntry::Redirect { id: from });
    }

    /// Increment a statistics counter through the trail.
    pub fn bump_stat(&mut self, kind: StatKind) {
        self.stats.bump(kind);
        self.trail.push(TrailEntry::Stat { kind });
    }

    /// Record the narrowing-op consumption of a finished round, keeping
    /// the high-water mark. Trailed.
    pub fn note_ops_used(&mut self, used: u64) {
        if used > self.stats.max_ops_used {
            self.trail.push(TrailEntry::MaxOps {
                old: self.stats.max_ops_used,
            });
            self.stats.max_ops_used = used;
        }
    }

    /// Narrow `id` to its intersection with `candidate`.
    ///
    /// Integer-kind records re-round inward through the intersection. An
    /// empty intersection counts a failure and returns
    /// [`SolverError::Inconsistent`]; an update reports whether the width
    /// shrank significantly and whether the interval collapsed to an exact
    /// rational point.
    pub fn intersect_set(
        &mut self,
        id: IntervalId,
        candidate: &Interval,
    ) -> Result<Narrowed> {
        let rid = self.resolve(id);
        let rec = &self.intervals[rid.0 as usize];
        let cur = &rec.value;
        let Some(new) = cur.intersect(candidate) else {
            self.bump_stat(StatKind::Failures);
            return Err(SolverError::Inconsistent);
        };
        if new == *cur {
            return Ok(Narrowed::Unchanged);
        }
        let significant = self.is_significant(cur, &new);
        let collapsed = new.is_point() && new.point_value().is_some();
        self.emit_watch(rid, cur, &new);
        let rec = &mut self.intervals[rid.0 as usize];
        let old = std::mem::replace(&mut rec.value, new);
        self.trail.push(TrailEntry::Bounds { id: rid, old });
        self.bump_stat(StatKind::NarrowingOps);
        Ok(Narrowed::Updated {
            significant,
            collapsed,
        })
    }

    /// Untrailed bound write for global optimisation's incumbent. The new
    /// value must be a subset of the current one; the write survives
    /// backtracking.
    pub fn nb_set_bounds(&mut self, id: IntervalId, value: Interval) {
        let rid = self.resolve(id);
        debug_assert!(value.is_subset_of(&self.intervals[rid.0 as usize].value));
        self.intervals[rid.0 as usize].value = value;
    }

    fn is_significant(&self, old: &Interval, new: &Interval) -> bool {
        let ow = old.width(&self.ctx).to_f64_hi();
        if !ow.is_finite() {
            return true;
        }
        if ow == 0.0 {
            return false;
        }
        let nw = new.width(&self.ctx).to_f64_hi();
        (ow - nw) / ow > self.config.narrowing_threshold
    }

    fn emit_watch(&self, id: IntervalId, old: &Interval, new: &Interval) {
        let rec = &self.intervals[id.0 as usize];
        match rec.watch {
            WatchAction::None => {
                if self.config.verbose {
                    tracing::trace!(interval = id.0, %old, %new, "narrow");
                }
            }
            WatchAction::Log => {
                tracing::info!(interval = id.0, %old, %new, "narrow");
            }
            WatchAction::Trace => {
                tracing::debug!(interval = id.0, %old, %new, "narrow");
            }
        }
    }

    /// Current trail position.
    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark(self.trail.len())
    }

    /// Unwind the trail to `mark`, restoring all trailed state.
    pub fn undo_to(&mut self, mark: Mark) {
        while self.trail.len() > mark.0 {
            match self.trail.pop().expect("trail underflow") {
                TrailEntry::Bounds { id, old } => {
                    self.intervals[id.0 as usize].value = old;
                }
                TrailEntry::WatcherPush { id } => {
                    self.intervals[id.0 as usize].watchers.pop();
                }
                TrailEntry::WatcherRemove { id, index, node } => {
                    self.intervals[id.0 as usize].watchers.insert(index, node);
                }
                TrailEntry::Linked { id, old } => {
                    self.nodes[id.0 as usize].linked = old;
                }
                TrailEntry::Persistent { id, old } => {
                    self.nodes[id.0 as usize].persistent = old;
                }
                TrailEntry::Redirect { id } => {
                    self.intervals[id.0 as usize].redirect = None;
                }
                TrailEntry::Watch { id, old } => {
                    self.intervals[id.0 as usize].watch = old;
                }
                TrailEntry::NewInterval => {
                    self.intervals.pop();
                }
                TrailEntry::NewNode => {
                    self.nodes.pop();
                }
                TrailEntry::Stat { kind } => {
                    self.stats.unbump(kind);
                }
                TrailEntry::MaxOps { old } => {
                    self.stats.max_ops_used = old;
                }
            }
        }
    }

    /// Width of `id` against the configured `small` precision; relative to
    /// the midpoint magnitude so large and small solutions are treated
    /// alike.
    #[must_use]
    pub fn is_small(&self, id: IntervalId) -> bool {
        let v = self.value(id);
        if v.is_point() {
            return true;
        }
        let w = v.width(&self.ctx).to_f64_hi();
        let m = v.midpoint().to_f64_hi().abs();
        w <= self.config.small_width() * (1.0 + m)
    }

    /// Convenience: current bounds of `id` as a pair.
    #[must_use]
    pub fn bounds(&self, id: IntervalId) -> (Ext, Ext) {
        let v = self.value(id);
        (v.lo.clone(), v.hi.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clover_math::DomainKind;
    use smallvec::smallvec;

    fn store() -> Store {
        Store::new(Config::default())
    }

    fn real(lo: i64, hi: i64) -> Interval {
        Interval::real(Ext::int(lo), Ext::int(hi))
    }

    #[test]
    fn test_intersect_set_updates_and_restores() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let mark = s.mark();

        let r = s.intersect_set(x, &real(2, 5)).unwrap();
        assert!(matches!(r, Narrowed::Updated { .. }));
        assert_eq!(s.bounds(x), (Ext::int(2), Ext::int(5)));
        assert_eq!(s.stats.narrowing_ops, 1);

        s.undo_to(mark);
        assert_eq!(s.bounds(x), (Ext::int(0), Ext::int(10)));
        assert_eq!(s.stats.narrowing_ops, 0);
    }

    #[test]
    fn test_intersect_set_unchanged() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let r = s.intersect_set(x, &real(-5, 20)).unwrap();
        assert_eq!(r, Narrowed::Unchanged);
        assert_eq!(s.stats.narrowing_ops, 0);
    }

    #[test]
    fn test_intersect_set_failure_counts() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let err = s.intersect_set(x, &real(20, 30)).unwrap_err();
        assert_eq!(err, SolverError::Inconsistent);
        assert_eq!(s.stats.failures, 1);
    }

    #[test]
    fn test_collapse_reported() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let r = s.intersect_set(x, &real(7, 7)).unwrap();
        assert_eq!(
            r,
            Narrowed::Updated {
                significant: true,
                collapsed: true
            }
        );
        assert!(s.value(x).is_point());
    }

    #[test]
    fn test_integer_rounding_through_intersection() {
        let mut s = store();
        let x = s
            .new_interval(Interval::integer(Ext::int(0), Ext::int(10)).unwrap());
        s.intersect_set(
            x,
            &Interval::real(Ext::Float(1.3), Ext::Float(4.9)),
        )
        .unwrap();
        assert_eq!(s.bounds(x), (Ext::int(2), Ext::int(4)));
        assert_eq!(s.value(x).kind, DomainKind::Integer);
    }

    #[test]
    fn test_new_interval_undone() {
        let mut s = store();
        let mark = s.mark();
        let _x = s.new_interval(real(0, 1));
        assert_eq!(s.interval_count(), 1);
        s.undo_to(mark);
        assert_eq!(s.interval_count(), 0);
        assert_eq!(s.stats.intervals_created, 0);
    }

    #[test]
    fn test_watcher_order_restored() {
        let mut s = store();
        let x = s.new_interval(real(0, 1));
        let n1 = s.new_node(Op::Integral, smallvec![x]);
        let n2 = s.new_node(Op::Integral, smallvec![x]);
        let n3 = s.new_node(Op::Integral, smallvec![x]);
        s.add_watcher(x, n1);
        s.add_watcher(x, n2);
        s.add_watcher(x, n3);

        let mark = s.mark();
        s.remove_watcher(x, n2);
        assert_eq!(s.watchers(x), vec![n1, n3]);
        s.undo_to(mark);
        assert_eq!(s.watchers(x), vec![n1, n2, n3]);
    }

    #[test]
    fn test_add_watcher_dedup() {
        let mut s = store();
        let x = s.new_interval(real(0, 1));
        let n = s.new_node(Op::Integral, smallvec![x]);
        s.add_watcher(x, n);
        s.add_watcher(x, n);
        assert_eq!(s.watchers(x).len(), 1);
    }

    #[test]
    fn test_redirect_resolution() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let y = s.new_interval(real(5, 20));
        s.set_redirect(y, x);
        assert_eq!(s.resolve(y), x);
        assert_eq!(s.bounds(y), (Ext::int(0), Ext::int(10)));
    }

    #[test]
    fn test_nb_set_bounds_survives_undo() {
        let mut s = store();
        let x = s.new_interval(real(0, 10));
        let mark = s.mark();
        s.nb_set_bounds(x, real(0, 5));
        s.undo_to(mark);
        assert_eq!(s.bounds(x), (Ext::int(0), Ext::int(5)));
    }

    #[test]
    fn test_note_ops_used_high_water_and_restore() {
        let mut s = store();
        s.note_ops_used(10);
        assert_eq!(s.stats.max_ops_used, 10);
        let mark = s.mark();
        s.note_ops_used(25);
        assert_eq!(s.stats.max_ops_used, 25);
        // A smaller round does not lower the mark.
        s.note_ops_used(5);
        assert_eq!(s.stats.max_ops_used, 25);
        s.undo_to(mark);
        assert_eq!(s.stats.max_ops_used, 10);
    }

    #[test]
    fn test_linked_persistent_trailed() {
        let mut s = store();
        let x = s.new_interval(real(0, 1));
        let n = s.new_node(Op::Integral, smallvec![x]);
        let mark = s.mark();
        s.set_linked(n, true);
        s.set_persistent(n);
        assert!(s.node(n).linked);
        assert!(s.node(n).persistent);
        s.undo_to(mark);
        assert!(!s.node(n).linked);
        assert!(!s.node(n).persistent);
    }
}
