//! Symbolic Partial Differentiation.
//!
//! `partial_derivative(Expr, X)` returns the derivative of an expression
//! tree with respect to one variable, simplified by the same rewrite pass
//! the compiler uses. Meta-level code (e.g. Taylor-form contractors) builds
//! additional constraints from the result through the ordinary posting
//! interface; the engine needs no special support.

use crate::error::{Result, SolverError};
use crate::expr::{BinOp, Expr, UnOp};
use crate::simplify::simplify;
use crate::store::VarId;
use num_rational::BigRational;
use num_traits::Zero;

/// Partial derivative `∂expr/∂v`, simplified.
pub fn partial_derivative(expr: &Expr, v: VarId) -> Result<Expr> {
    let d = derive(expr, v)?;
    Ok(simplify(&d))
}

fn derive(e: &Expr, v: VarId) -> Result<Expr> {
    match e {
        Expr::Rat(_) | Expr::Float(_) => Ok(Expr::int(0)),
        Expr::Var(x) => Ok(if *x == v { Expr::int(1) } else { Expr::int(0) }),
        Expr::Unary(op, a) => {
            let da = derive(a, v)?;
            let a = (**a).clone();
            match op {
                UnOp::Neg => Ok(-da),
                UnOp::Sqrt => Ok(da / (a.sqrt() * 2)),
                UnOp::Exp => Ok(da * a.exp()),
                UnOp::Ln => Ok(da / a),
                UnOp::Sin => Ok(da * a.cos()),
                UnOp::Cos => Ok(-(da * a.sin())),
                UnOp::Tan => Ok(da / a.cos().pow(2)),
                UnOp::Asin => Ok(da / (Expr::int(1) - a.pow(2)).sqrt()),
                UnOp::Acos => Ok(-(da / (Expr::int(1) - a.pow(2)).sqrt())),
                UnOp::Atan => Ok(da / (Expr::int(1) + a.pow(2))),
                UnOp::Abs | UnOp::Not => Err(SolverError::UnsupportedOperator(format!(
                    "partial_derivative: {op:?}"
                ))),
            }
        }
        Expr::Binary(op, a, b) => {
            let da = derive(a, v)?;
            let db = derive(b, v)?;
            let a = (**a).clone();
            let b = (**b).clone();
            match op {
                BinOp::Add => Ok(da + db),
                BinOp::Sub => Ok(da - db),
                BinOp::Mul => Ok(da * b + a * db),
                BinOp::Div => Ok((da * b.clone() - a * db) / b.pow(2)),
                BinOp::Pow => derive_pow(a, b, da, db),
                _ => Err(SolverError::UnsupportedOperator(format!(
                    "partial_derivative: {op:?}"
                ))),
            }
        }
    }
}

/// d(a^b): the power rule for a constant exponent, the general
/// exponential form otherwise.
fn derive_pow(a: Expr, b: Expr, da: Expr, db: Expr) -> Result<Expr> {
    if let Expr::Rat(n) = &b {
        let n = n.clone();
        let reduced = Expr::Rat(&n - &BigRational::from_integer(1.into()));
        return Ok(Expr::Rat(n) * a.pow(reduced) * da);
    }
    if is_zero_expr(&db) {
        // Exponent free of v but not a literal: still the power rule.
        return Ok(b.clone() * a.clone().pow(b - Expr::int(1)) * da);
    }
    // a^b · (db·ln a + b·da/a)
    Ok(a.clone().pow(b.clone()) * (db * a.clone().ln() + b * (da / a)))
}

fn is_zero_expr(e: &Expr) -> bool {
    matches!(e, Expr::Rat(r) if r.is_zero())
}
