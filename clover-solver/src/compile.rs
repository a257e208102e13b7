//! Constraint Compiler.
//!
//! Recursively rewrites an [`Expr`] tree into a DAG of primitive nodes
//! sharing interval operands:
//!
//! 1. The simplifier pass normalises the tree (exact constant folding,
//!    identity elimination).
//! 2. Ground subexpressions that are *safe* — no transcendentals, no `**`
//!    with a non-integer exponent — are pre-evaluated to constant
//!    intervals with outward rounding; a float literal widens to the
//!    interval around its nearest-float error.
//! 3. Each remaining operator application allocates a fresh intermediate
//!    interval of the operator's result type and one node relating result
//!    and operands, registered on every operand's watcher list and
//!    scheduled for a first firing. Operators without primitives of their
//!    own compile to a rearranged primitive: `z = a − b` becomes
//!    `a = z + b`, `z = a / b` becomes `a = z · b`, `ln`/`asin`/`acos`/
//!    `atan` invert `exp`/`sin`/`cos`/`tan` over principal ranges.
//! 4. Operand types are coerced per operator signature: a real interval in
//!    a boolean position is intersected with (0,1) and an `integral` node
//!    is scheduled.
//!
//! Posting `{C}` compiles `C`, constrains its boolean root to 1, and runs
//! one propagation round. Compilation is deterministic, and an identical
//! `(op, args)` node is never registered twice.

use crate::agenda::{self, Agenda};
use crate::error::{Result, SolverError};
use crate::expr::{BinOp, Expr, UnOp};
use crate::node::{Args, IntervalId, NodeId, Op};
use crate::simplify::simplify;
use crate::store::{Narrowed, Store};
use clover_math::{round, DomainKind, Ext, Interval};
use smallvec::smallvec;

/// Compile and install a constraint: `expr` must be boolean-valued and is
/// constrained to be true, then propagated.
pub fn post(store: &mut Store, agenda: &mut Agenda, expr: &Expr) -> Result<()> {
    let simplified = simplify(expr);
    if !simplified.is_boolean() {
        return Err(SolverError::TypeError(
            "posted constraint is not a boolean expression".into(),
        ));
    }
    let root = compile_expr(store, agenda, &simplified)?;
    coerce_boolean(store, agenda, root)?;
    let truth = Interval {
        lo: Ext::int(1),
        hi: Ext::int(1),
        kind: DomainKind::Integer,
    };
    if let Narrowed::Updated { .. } = store.intersect_set(root, &truth)? {
        agenda.schedule_watchers(store, root);
    }
    agenda::run(store, agenda)
}

/// Compile a subexpression to the interval holding its value.
pub fn compile_expr(store: &mut Store, agenda: &mut Agenda, e: &Expr) -> Result<IntervalId> {
    if e.is_ground() {
        if let Some(constant) = eval_ground(store, e) {
            return Ok(store.new_interval(constant));
        }
    }
    match e {
        Expr::Rat(r) => Ok(store.new_interval(Interval::rational_point(r.clone()))),
        Expr::Float(f) => Ok(store.new_interval(Interval::float_constant(*f))),
        Expr::Var(v) => Ok(v.0),
        Expr::Unary(op, a) => compile_unary(store, agenda, *op, a),
        Expr::Binary(op, a, b) => compile_binary(store, agenda, *op, a, b),
    }
}

fn compile_unary(
    store: &mut Store,
    agenda: &mut Agenda,
    op: UnOp,
    a: &Expr,
) -> Result<IntervalId> {
    let aid = compile_expr(store, agenda, a)?;
    let akind = store.value(aid).kind;
    match op {
        UnOp::Neg => {
            let z = fresh(store, akind, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Minus, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Abs => {
            let z = fresh(store, akind, Ext::zero(), Ext::PosInf);
            add_node(store, agenda, Op::Abs, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Sqrt => {
            let z = fresh(store, DomainKind::Real, Ext::zero(), Ext::PosInf);
            add_node(store, agenda, Op::Sqrt, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Exp => {
            let z = fresh(store, DomainKind::Real, Ext::zero(), Ext::PosInf);
            add_node(store, agenda, Op::Exp, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Ln => {
            // z = ln a  ⇔  a = e^z
            let z = fresh(store, DomainKind::Real, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Exp, smallvec![aid, z]);
            Ok(z)
        }
        UnOp::Sin => {
            let z = fresh(store, DomainKind::Real, Ext::int(-1), Ext::int(1));
            add_node(store, agenda, Op::Sin, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Cos => {
            let z = fresh(store, DomainKind::Real, Ext::int(-1), Ext::int(1));
            add_node(store, agenda, Op::Cos, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Tan => {
            let z = fresh(store, DomainKind::Real, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Tan, smallvec![z, aid]);
            Ok(z)
        }
        UnOp::Asin => {
            // z = asin a  ⇔  a = sin z with z in the principal range.
            let z = fresh(
                store,
                DomainKind::Real,
                Ext::from_f64_lo(-round::half_pi_hi()),
                Ext::from_f64_hi(round::half_pi_hi()),
            );
            add_node(store, agenda, Op::Sin, smallvec![aid, z]);
            Ok(z)
        }
        UnOp::Acos => {
            let z = fresh(
                store,
                DomainKind::Real,
                Ext::zero(),
                Ext::from_f64_hi(round::pi_hi()),
            );
            add_node(store, agenda, Op::Cos, smallvec![aid, z]);
            Ok(z)
        }
        UnOp::Atan => {
            let z = fresh(
                store,
                DomainKind::Real,
                Ext::from_f64_lo(-round::half_pi_hi()),
                Ext::from_f64_hi(round::half_pi_hi()),
            );
            add_node(store, agenda, Op::Tan, smallvec![aid, z]);
            Ok(z)
        }
        UnOp::Not => {
            coerce_boolean(store, agenda, aid)?;
            let z = store.new_interval(Interval::boolean());
            add_node(store, agenda, Op::Not, smallvec![z, aid]);
            Ok(z)
        }
    }
}

fn compile_binary(
    store: &mut Store,
    agenda: &mut Agenda,
    op: BinOp,
    a: &Expr,
    b: &Expr,
) -> Result<IntervalId> {
    let aid = compile_expr(store, agenda, a)?;
    let bid = compile_expr(store, agenda, b)?;
    let akind = store.value(aid).kind;
    let bkind = store.value(bid).kind;
    let joined = akind.closed_join(bkind);
    match op {
        BinOp::Add => {
            let z = fresh(store, joined, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Add, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Sub => {
            // z = a − b  ⇔  a = z + b
            let z = fresh(store, joined, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Add, smallvec![aid, z, bid]);
            Ok(z)
        }
        BinOp::Mul => {
            let z = fresh(store, joined, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Mul, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Div => {
            // z = a / b  ⇔  a = z · b
            let z = fresh(store, DomainKind::Real, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Mul, smallvec![aid, z, bid]);
            Ok(z)
        }
        BinOp::Pow => {
            let kind = if joined == DomainKind::Integer
                && store.value(bid).lo.signum() >= 0
            {
                DomainKind::Integer
            } else {
                DomainKind::Real
            };
            let z = fresh(store, kind, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Pow, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Min => {
            let z = fresh(store, joined, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Min, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Max => {
            let z = fresh(store, joined, Ext::NegInf, Ext::PosInf);
            add_node(store, agenda, Op::Max, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Lt | BinOp::In => {
            let prim = match op {
                BinOp::Eq => Op::Eq,
                BinOp::Ne => Op::Ne,
                BinOp::Le => Op::Le,
                BinOp::Lt => Op::Lt,
                _ => Op::In,
            };
            let z = store.new_interval(Interval::boolean());
            add_node(store, agenda, prim, smallvec![z, aid, bid]);
            Ok(z)
        }
        BinOp::Ge => {
            // a ≥ b  ⇔  b ≤ a
            let z = store.new_interval(Interval::boolean());
            add_node(store, agenda, Op::Le, smallvec![z, bid, aid]);
            Ok(z)
        }
        BinOp::Gt => {
            let z = store.new_interval(Interval::boolean());
            add_node(store, agenda, Op::Lt, smallvec![z, bid, aid]);
            Ok(z)
        }
        BinOp::And | BinOp::Or | BinOp::Nand | BinOp::Nor | BinOp::Xor | BinOp::Imp => {
            coerce_boolean(store, agenda, aid)?;
            coerce_boolean(store, agenda, bid)?;
            let prim = match op {
                BinOp::And => Op::And,
                BinOp::Or => Op::Or,
                BinOp::Nand => Op::Nand,
                BinOp::Nor => Op::Nor,
                BinOp::Xor => Op::Xor,
                _ => Op::ImB,
            };
            let z = store.new_interval(Interval::boolean());
            add_node(store, agenda, prim, smallvec![z, aid, bid]);
            Ok(z)
        }
    }
}

/// Fresh intermediate interval.
fn fresh(store: &mut Store, kind: DomainKind, lo: Ext, hi: Ext) -> IntervalId {
    store.new_interval(Interval { lo, hi, kind })
}

/// Coerce an interval into the boolean signature position: intersect with
/// (0,1); a real-kind record additionally gets an `integral` node.
fn coerce_boolean(store: &mut Store, agenda: &mut Agenda, id: IntervalId) -> Result<()> {
    let was_real = store.value(id).kind == DomainKind::Real;
    if let Narrowed::Updated { .. } = store.intersect_set(id, &Interval::boolean())? {
        agenda.schedule_watchers(store, id);
    }
    if was_real {
        add_node(store, agenda, Op::Integral, smallvec![id]);
    }
    Ok(())
}

/// Register a node unless an identical `(op, args)` node already watches
/// the first operand; schedule it either way.
fn add_node(store: &mut Store, agenda: &mut Agenda, op: Op, args: Args) -> NodeId {
    if let Some(existing) = find_structural(store, op, &args) {
        agenda.push(store, existing);
        return existing;
    }
    let n = store.new_node(op, args.clone());
    for &arg in &args {
        store.add_watcher(arg, n);
    }
    agenda.push(store, n);
    n
}

fn find_structural(store: &Store, op: Op, args: &[IntervalId]) -> Option<NodeId> {
    let resolved: Vec<IntervalId> = args.iter().map(|&a| store.resolve(a)).collect();
    let first = *resolved.first()?;
    store
        .record(first)
        .watchers
        .iter()
        .copied()
        .find(|&w| {
            let n = store.node(w);
            n.op == op
                && n.args.len() == resolved.len()
                && n.args
                    .iter()
                    .zip(&resolved)
                    .all(|(&x, &y)| store.resolve(x) == y)
        })
}

/// Evaluate a safe ground expression to a constant interval with outward
/// rounding. Unsafe operators (transcendentals, `**` with a non-point or
/// non-integer exponent) return `None` and compile to nodes instead.
fn eval_ground(store: &Store, e: &Expr) -> Option<Interval> {
    let ctx = store.ctx.clone();
    match e {
        Expr::Rat(r) => Some(Interval::rational_point(r.clone())),
        Expr::Float(f) => Some(Interval::float_constant(*f)),
        Expr::Var(_) => None,
        Expr::Unary(op, a) => {
            let ia = eval_ground(store, a)?;
            match op {
                UnOp::Neg => Some(ia.neg()),
                UnOp::Abs => Some(ia.abs()),
                _ => None,
            }
        }
        Expr::Binary(op, a, b) => {
            let ia = eval_ground(store, a)?;
            let ib = eval_ground(store, b)?;
            match op {
                BinOp::Add => Some(ia.add(&ib, &ctx)),
                BinOp::Sub => Some(ia.sub(&ib, &ctx)),
                BinOp::Mul => Some(ia.mul(&ib, &ctx)),
                BinOp::Div => ia.div(&ib, &ctx),
                BinOp::Min => Some(ia.min_with(&ib)),
                BinOp::Max => Some(ia.max_with(&ib)),
                BinOp::Pow => {
                    let r = ib.point_value()?;
                    if !r.is_integer() {
                        return None;
                    }
                    let n = num_traits::ToPrimitive::to_i64(&r.to_integer())?;
                    ia.powi(n, &ctx)
                }
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn setup() -> (Store, Agenda) {
        (Store::new(Config::default()), Agenda::new())
    }

    #[test]
    fn test_post_requires_boolean() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let e = Expr::Var(crate::store::VarId(x)) + 1;
        let err = post(&mut store, &mut agenda, &e).unwrap_err();
        assert!(matches!(err, SolverError::TypeError(_)));
        // Raised before any state was modified.
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_post_simple_equation_narrows() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let xe = Expr::Var(crate::store::VarId(x));
        post(&mut store, &mut agenda, &xe.eq(5)).unwrap();
        assert!(store.value(x).is_point());
        assert_eq!(store.value(x).lo, Ext::int(5));
    }

    #[test]
    fn test_ground_folding_creates_no_nodes() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let xe = Expr::Var(crate::store::VarId(x));
        // (2·3 − 6) is folded by the simplifier before compilation.
        post(&mut store, &mut agenda, &xe.eq(Expr::int(2) * 3 - 6)).unwrap();
        // One Eq node; no Add/Mul nodes for the ground side.
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.value(x).lo, Ext::zero());
    }

    #[test]
    fn test_sub_compiles_to_add() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let y = store.new_interval(Interval::real_default());
        let e = (Expr::Var(crate::store::VarId(x)) - Expr::Var(crate::store::VarId(y))).eq(1);
        post(&mut store, &mut agenda, &e).unwrap();
        let mut ops: Vec<Op> = (0..store.node_count())
            .map(|i| store.node(NodeId(i as u32)).op)
            .collect();
        ops.sort_by_key(|o| format!("{o}"));
        assert_eq!(ops, vec![Op::Add, Op::Eq]);
    }

    #[test]
    fn test_duplicate_node_suppressed() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let n1 = add_node(&mut store, &mut agenda, Op::Integral, smallvec![x]);
        let n2 = add_node(&mut store, &mut agenda, Op::Integral, smallvec![x]);
        assert_eq!(n1, n2);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_boolean_coercion_of_real_var() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let y = store.new_interval(Interval::real_default());
        let e = Expr::Var(crate::store::VarId(x)).and(Expr::Var(crate::store::VarId(y)));
        post(&mut store, &mut agenda, &e).unwrap();
        // Both operands forced to true.
        assert_eq!(store.value(x).lo, Ext::int(1));
        assert_eq!(store.value(x).kind, DomainKind::Integer);
        assert_eq!(store.value(y).lo, Ext::int(1));
    }

    #[test]
    fn test_asin_bounds_principal_range() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real_default());
        let xe = Expr::Var(crate::store::VarId(x));
        // asin(x) == 0 forces x toward 0 through the sin relation.
        post(&mut store, &mut agenda, &xe.asin().eq(0)).unwrap();
        let v = store.value(x);
        assert!(v.lo >= Ext::Float(-1e-9) && v.hi <= Ext::Float(1e-9));
    }

    #[test]
    fn test_ge_swaps_to_le() {
        let (mut store, mut agenda) = setup();
        let x = store.new_interval(Interval::real(Ext::int(0), Ext::int(10)));
        let xe = Expr::Var(crate::store::VarId(x));
        post(&mut store, &mut agenda, &xe.ge(7)).unwrap();
        assert_eq!(store.value(x).lo, Ext::int(7));
    }
}
