//! Variable-Binding Hook.
//!
//! The explicit-API equivalent of attributed-variable unification: the host
//! substrate that would intercept unification is rendered as two entry
//! points the engine calls directly.
//!
//! - [`bind_value`]: unifying an interval variable with a number — verify
//!   membership (and integrality for integer intervals), narrow to the
//!   point, propagate.
//! - [`unify`]: unifying two interval variables — merge types (real ∧ real
//!   stays real, any integer wins), intersect bounds, union the watcher
//!   lists suppressing `(op, args)` duplicates under redirect resolution,
//!   merge trace flags, redirect the losing record, propagate.
//!
//! Any inconsistency surfaces as [`SolverError::Inconsistent`]
//! and the caller unwinds the trail.

use crate::agenda::{self, Agenda};
use crate::error::Result;
use crate::node::{Args, IntervalId, NodeId, Op};
use crate::store::{Narrowed, Store, WatchAction};
use clover_math::Interval;
use num_rational::BigRational;
use rustc_hash::FxHashSet;

/// Bind the interval `id` to the exact number `value` and propagate.
///
/// Membership and integrality checks happen through the intersection: a
/// point outside the bounds, or a non-integer against an integer-kind
/// interval, leaves an empty intersection.
pub fn bind_value(
    store: &mut Store,
    agenda: &mut Agenda,
    id: IntervalId,
    value: &BigRational,
) -> Result<()> {
    let point = Interval::rational_point(value.clone());
    if let Narrowed::Updated { .. } = store.intersect_set(id, &point)? {
        agenda.schedule_watchers(store, id);
    }
    agenda::run(store, agenda)
}

/// Unify the intervals `a` and `b` and propagate.
pub fn unify(
    store: &mut Store,
    agenda: &mut Agenda,
    a: IntervalId,
    b: IntervalId,
) -> Result<()> {
    let ra = store.resolve(a);
    let rb = store.resolve(b);
    if ra == rb {
        return Ok(());
    }

    // Merged bounds and type: intersect the loser's value into the winner.
    // The kind merge (any integer makes the result integer) and the integer
    // re-rounding both live in the intersection.
    let b_value = store.value(rb).clone();
    store.intersect_set(ra, &b_value)?;

    // Merge trace flags: an explicit action on either side survives.
    if store.record(ra).watch == WatchAction::None {
        let b_watch = store.record(rb).watch;
        if b_watch != WatchAction::None {
            store.set_watch(ra, b_watch);
        }
    }

    // Union the watcher lists, suppressing structural duplicates. The
    // redirect is installed first so argument vectors resolve through it.
    let b_watchers = store.watchers(rb);
    store.set_redirect(rb, ra);
    let mut seen: FxHashSet<(Op, Args)> = store
        .record(ra)
        .watchers
        .iter()
        .map(|&w| structural_key(store, w))
        .collect();
    for w in b_watchers {
        if seen.insert(structural_key(store, w)) {
            store.add_watcher(ra, w);
        }
    }

    // Everything hanging off the merged interval re-evaluates.
    agenda.schedule_watchers(store, ra);
    agenda::run(store, agenda)
}

/// Identity of a node up to unification: operator plus resolved operands.
fn structural_key(store: &Store, node: NodeId) -> (Op, Args) {
    let n = store.node(node);
    let args: Args = n.args.iter().map(|&a| store.resolve(a)).collect();
    (n.op, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::node::Op;
    use clover_math::{DomainKind, Ext};
    use num_bigint::BigInt;
    use smallvec::smallvec;

    fn real(lo: i64, hi: i64) -> Interval {
        Interval::real(Ext::int(lo), Ext::int(hi))
    }

    fn rat(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    #[test]
    fn test_bind_value_in_bounds() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 10));
        bind_value(&mut store, &mut agenda, x, &rat(7)).unwrap();
        assert!(store.value(x).is_point());
        assert_eq!(store.value(x).point_value(), Some(rat(7)));
    }

    #[test]
    fn test_bind_value_out_of_bounds_fails() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 10));
        assert!(bind_value(&mut store, &mut agenda, x, &rat(42)).is_err());
    }

    #[test]
    fn test_bind_non_integer_to_integer_fails() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store
            .new_interval(Interval::integer(Ext::int(0), Ext::int(10)).unwrap());
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert!(bind_value(&mut store, &mut agenda, x, &half).is_err());
    }

    #[test]
    fn test_unify_intersects_and_merges_kind() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 10));
        let y = store
            .new_interval(Interval::integer(Ext::int(5), Ext::int(20)).unwrap());
        unify(&mut store, &mut agenda, x, y).unwrap();
        assert_eq!(store.resolve(y), store.resolve(x));
        let v = store.value(x);
        assert_eq!(v.kind, DomainKind::Integer);
        assert_eq!(v.lo, Ext::int(5));
        assert_eq!(v.hi, Ext::int(10));
    }

    #[test]
    fn test_unify_disjoint_fails() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 1));
        let y = store.new_interval(real(5, 6));
        assert!(unify(&mut store, &mut agenda, x, y).is_err());
    }

    #[test]
    fn test_unify_merges_watchers_with_dedup() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 10));
        let y = store.new_interval(real(0, 10));
        let z = store.new_interval(real(0, 20));

        // Same structural constraint registered on both sides: z = x + x
        // and z = y + y become duplicates once x and y merge.
        let nx = store.new_node(Op::Add, smallvec![z, x, x]);
        store.add_watcher(x, nx);
        store.add_watcher(z, nx);
        let ny = store.new_node(Op::Add, smallvec![z, y, y]);
        store.add_watcher(y, ny);
        store.add_watcher(z, ny);

        unify(&mut store, &mut agenda, x, y).unwrap();
        // The duplicate of nx is suppressed on the merged watcher list.
        assert_eq!(store.watchers(x).len(), 1);
    }

    #[test]
    fn test_unify_undone_by_backtracking() {
        let mut store = Store::new(Config::default());
        let mut agenda = Agenda::new();
        let x = store.new_interval(real(0, 10));
        let y = store.new_interval(real(5, 20));
        let mark = store.mark();
        unify(&mut store, &mut agenda, x, y).unwrap();
        assert_eq!(store.resolve(y), x);
        store.undo_to(mark);
        assert_eq!(store.resolve(y), y);
        assert_eq!(store.bounds(x), (Ext::int(0), Ext::int(10)));
        assert_eq!(store.bounds(y), (Ext::int(5), Ext::int(20)));
    }
}
