//! Algebraic Simplifier.
//!
//! A deterministic bottom-up rewrite pass applied before graph
//! construction. It folds exact rational subexpressions, eliminates
//! identities and annihilators, and cancels double negations, reducing the
//! number of nodes the compiler emits. The pass is optional for
//! correctness: everything it removes would also be handled (more slowly)
//! by propagation.
//!
//! Float constants are never folded here: combining them soundly requires
//! outward rounding to an interval, which is the compiler's ground
//! pre-evaluation job. Rational folding is exact.

use crate::expr::{BinOp, Expr, UnOp};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Simplify an expression tree. Idempotent and deterministic.
#[must_use]
pub fn simplify(e: &Expr) -> Expr {
    match e {
        Expr::Rat(_) | Expr::Float(_) | Expr::Var(_) => e.clone(),
        Expr::Unary(op, a) => simplify_unary(*op, simplify(a)),
        Expr::Binary(op, a, b) => simplify_binary(*op, simplify(a), simplify(b)),
    }
}

fn rat(e: &Expr) -> Option<&BigRational> {
    match e {
        Expr::Rat(r) => Some(r),
        _ => None,
    }
}

fn simplify_unary(op: UnOp, a: Expr) -> Expr {
    match (op, &a) {
        // −(−x) → x, ¬(¬x) → x
        (UnOp::Neg, Expr::Unary(UnOp::Neg, inner)) => (**inner).clone(),
        (UnOp::Not, Expr::Unary(UnOp::Not, inner)) => (**inner).clone(),
        (UnOp::Neg, Expr::Rat(r)) => Expr::Rat(-r),
        (UnOp::Abs, Expr::Rat(r)) => Expr::Rat(r.abs()),
        _ => Expr::Unary(op, Box::new(a)),
    }
}

fn simplify_binary(op: BinOp, a: Expr, b: Expr) -> Expr {
    if let (Some(ra), Some(rb)) = (rat(&a), rat(&b)) {
        if let Some(folded) = fold_rationals(op, ra, rb) {
            return folded;
        }
    }
    match op {
        BinOp::Add => {
            if is_zero(&a) {
                return b;
            }
            if is_zero(&b) {
                return a;
            }
        }
        BinOp::Sub => {
            if is_zero(&b) {
                return a;
            }
            if is_zero(&a) {
                return simplify_unary(UnOp::Neg, b);
            }
        }
        BinOp::Mul => {
            if is_zero(&a) || is_zero(&b) {
                return Expr::Rat(BigRational::zero());
            }
            if is_one(&a) {
                return b;
            }
            if is_one(&b) {
                return a;
            }
        }
        BinOp::Div => {
            if is_one(&b) {
                return a;
            }
        }
        BinOp::Pow => {
            if is_one(&b) {
                return a;
            }
            if is_zero(&b) {
                return Expr::Rat(BigRational::one());
            }
        }
        _ => {}
    }
    Expr::Binary(op, Box::new(a), Box::new(b))
}

fn fold_rationals(op: BinOp, a: &BigRational, b: &BigRational) -> Option<Expr> {
    let r = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b.is_zero() {
                return None;
            }
            a / b
        }
        BinOp::Min => a.min(b).clone(),
        BinOp::Max => a.max(b).clone(),
        BinOp::Pow => {
            // Fold only small integer exponents; everything else keeps
            // its node and outward rounding.
            let n = b.is_integer().then(|| b.to_integer().to_i32()).flatten()?;
            if n.unsigned_abs() > 64 || (a.is_zero() && n < 0) {
                return None;
            }
            num_traits::pow::Pow::pow(a, n)
        }
        _ => return None,
    };
    Some(Expr::Rat(r))
}

fn is_zero(e: &Expr) -> bool {
    matches!(e, Expr::Rat(r) if r.is_zero())
}

fn is_one(e: &Expr) -> bool {
    matches!(e, Expr::Rat(r) if r.is_one())
}
