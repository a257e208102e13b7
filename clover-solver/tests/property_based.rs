//! Property-Based Tests for Propagation Soundness
//!
//! Quantified invariants from the engine contract:
//! - Soundness: a known solution is never pruned from its enclosure.
//! - Monotonicity: posting more constraints never widens an interval.
//! - Idempotence: posting a constraint twice equals posting it once.
//! - Backtrack restoration: undoing a mark restores bounds and counters.
//! - Type consistency: integer intervals keep integral bounds.

use clover_math::Ext;
use clover_solver::{Engine, Expr, StatKind};
use num_bigint::BigInt;
use num_rational::BigRational;
use proptest::prelude::*;

fn rat(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

proptest! {
    /// x = a, y = b is a solution of `x + y == a + b`; after posting the
    /// constraint the solution must still be inside both enclosures.
    #[test]
    fn soundness_sum_solution_never_pruned(a in -1000_i64..1000, b in -1000_i64..1000) {
        let mut e = Engine::new();
        let x = e.real_var();
        let y = e.real_var();
        e.post(&(x.expr() + y.expr()).eq(Expr::int(a + b))).unwrap();
        e.post(&x.expr().ge(Expr::int(a.min(b) - 1))).unwrap();

        let (xlo, xhi) = e.range(x);
        prop_assert!(xlo <= Ext::int(a) && Ext::int(a) <= xhi);
        let (ylo, yhi) = e.range(y);
        prop_assert!(ylo <= Ext::int(b) && Ext::int(b) <= yhi);

        // And binding the solution point succeeds.
        e.bind(x, &rat(a)).unwrap();
        assert_eq!(e.value(y), Some(rat(b)));
    }

    /// Soundness through a nonlinear constraint: x = a satisfies
    /// `x² == a²`.
    #[test]
    fn soundness_square_solution_never_pruned(a in -100_i64..100) {
        let mut e = Engine::new();
        let x = e.real_var();
        e.post(&x.expr().pow(2).eq(Expr::int(a * a))).unwrap();
        let (lo, hi) = e.range(x);
        prop_assert!(lo <= Ext::int(a) && Ext::int(a) <= hi);
    }

    /// Posting an extra constraint can only shrink enclosures.
    #[test]
    fn monotonic_narrowing(lo in -1000_i64..0, hi in 1_i64..1000, cap in -500_i64..500) {
        let mut e = Engine::new();
        let x = e.real_var_in(Ext::int(lo), Ext::int(hi)).unwrap();
        let (lo1, hi1) = e.range(x);
        if e.post(&x.expr().le(Expr::int(cap))).is_ok() {
            let (lo2, hi2) = e.range(x);
            prop_assert!(lo2 >= lo1);
            prop_assert!(hi2 <= hi1);
        }
    }

    /// Posting the same constraint twice leaves the same bounds as once.
    #[test]
    fn idempotent_posting(a in -100_i64..100, b in 1_i64..100) {
        let mut e1 = Engine::new();
        let x1 = e1.real_var();
        let y1 = e1.real_var();
        let c1 = (x1.expr() * Expr::int(b) + y1.expr()).eq(Expr::int(a));
        e1.post(&c1).unwrap();
        let once = (e1.range(x1), e1.range(y1));
        e1.post(&c1).unwrap();
        prop_assert_eq!((e1.range(x1), e1.range(y1)), once);
    }

    /// A failed or completed branch restores all bounds and trailed
    /// counters on undo.
    #[test]
    fn backtrack_restoration(lo in -100_i64..0, hi in 1_i64..100, point in -100_i64..100) {
        let mut e = Engine::new();
        let x = e.int_var_in(Ext::int(lo), Ext::int(hi)).unwrap();
        let before_bounds = e.range(x);
        let before_ops = e.statistic(StatKind::NarrowingOps);
        let before_nodes = e.statistic(StatKind::NodesCreated);

        let mark = e.mark();
        let _ = e.post(&x.expr().eq(Expr::int(point)));
        e.undo_to(mark);

        prop_assert_eq!(e.range(x), before_bounds);
        prop_assert_eq!(e.statistic(StatKind::NarrowingOps), before_ops);
        prop_assert_eq!(e.statistic(StatKind::NodesCreated), before_nodes);
    }

    /// Integer intervals keep integral (or infinite) bounds through
    /// arbitrary real-valued narrowing.
    #[test]
    fn integer_type_consistency(lo in -100_i64..0, hi in 1_i64..100, num in -500_i64..500, den in 2_i64..7) {
        let mut e = Engine::new();
        let x = e.int_var_in(Ext::int(lo), Ext::int(hi)).unwrap();
        let bound = BigRational::new(BigInt::from(num), BigInt::from(den));
        let _ = e.post(&x.expr().le(Expr::Rat(bound)));
        let (xlo, xhi) = e.range(x);
        prop_assert!(xlo.is_integer() || !xlo.is_finite());
        prop_assert!(xhi.is_integer() || !xhi.is_finite());
    }

    /// Enumerated solutions of a linear integer equation are exactly the
    /// brute-force solutions, smallest first.
    #[test]
    fn enumerate_matches_brute_force(total in 2_i64..14) {
        let mut e = Engine::new();
        let x = e.int_var_in(Ext::int(0), Ext::int(9)).unwrap();
        let y = e.int_var_in(Ext::int(0), Ext::int(9)).unwrap();
        e.post(&(x.expr() + 2 * y.expr()).eq(Expr::int(total))).unwrap();

        let sols = e.enumerate_collect(&[x, y]).unwrap();
        let mut expected = Vec::new();
        for xv in 0..=9_i64 {
            for yv in 0..=9_i64 {
                if xv + 2 * yv == total {
                    expected.push(vec![rat(xv), rat(yv)]);
                }
            }
        }
        prop_assert_eq!(sols, expected);
    }

    /// The reified truth value agrees with ground truth once operands are
    /// bound.
    #[test]
    fn reified_le_agrees_with_ground_truth(a in -50_i64..50, b in -50_i64..50) {
        let mut e = Engine::new();
        let x = e.real_var();
        let y = e.real_var();
        let t = e.bool_var();
        e.post(&t.expr().eq(x.expr().le(y.expr()))).unwrap();
        e.bind(x, &rat(a)).unwrap();
        e.bind(y, &rat(b)).unwrap();
        let expected = i64::from(a <= b);
        prop_assert_eq!(e.range(t), (Ext::int(expected), Ext::int(expected)));
    }
}
