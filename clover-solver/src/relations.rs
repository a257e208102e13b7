//! Primitive Relation Contractors.
//!
//! One contractor per [`Op`]: given the current operand intervals, it
//! returns per-operand enclosures whose intersection with the current values
//! is the tightest easily-computable sound narrowing, plus a `persistent`
//! flag set when the node can never narrow anything again.
//!
//! Conventions:
//! - Ternary arithmetic is result-first (`Add(z,x,y)` relates `z = x + y`)
//!   and narrows all operands: `z ∩ (x+y)`, `x ∩ (z−y)`, `y ∩ (z−x)`.
//! - Comparisons are reified: the first operand is a boolean (0,1) interval
//!   that is decided when the relation becomes certain, and that enforces
//!   the relation on the operands when decided from outside.
//! - Boolean connectives propagate their 0/1 truth tables in all
//!   directions.
//! - An empty intersection anywhere is a consistency failure
//!   ([`SolverError::Inconsistent`]); the scheduler unwinds the trail.
//!
//! Removing a point from a real interval (decided disequality) steps the
//! touched bound by one representable float: enclosures are maintained to
//! the tolerance of representable floats.

use crate::error::{Result, SolverError};
use crate::node::Op;
use clover_math::round;
use clover_math::{DomainKind, Ext, Interval, NumCtx};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use smallvec::SmallVec;

/// Result of firing one contractor.
#[derive(Debug, Clone)]
pub struct Contraction {
    /// New value per operand index; already intersected with the current
    /// value, so the store write is a plain narrowing.
    pub updates: SmallVec<[(usize, Interval); 3]>,
    /// The node can never narrow anything again.
    pub persistent: bool,
}

/// Fire the contractor for `op` on the current operand values.
pub fn contract(op: Op, vals: &[Interval], ctx: &NumCtx) -> Result<Contraction> {
    match op {
        Op::Add => contract_add(&vals[0], &vals[1], &vals[2], ctx),
        Op::Mul => contract_mul(&vals[0], &vals[1], &vals[2], ctx),
        Op::Min => contract_min(&vals[0], &vals[1], &vals[2]),
        Op::Max => contract_max(&vals[0], &vals[1], &vals[2]),
        Op::Pow => contract_pow(&vals[0], &vals[1], &vals[2], ctx),
        Op::Eq => contract_eq(&vals[0], &vals[1], &vals[2]),
        Op::Ne => contract_ne(&vals[0], &vals[1], &vals[2]),
        Op::Le => contract_ord(&vals[0], &vals[1], &vals[2], ctx, false),
        Op::Lt => contract_ord(&vals[0], &vals[1], &vals[2], ctx, true),
        Op::In => contract_in(&vals[0], &vals[1], &vals[2]),
        Op::And | Op::Or | Op::Nand | Op::Nor | Op::Xor | Op::ImB => {
            contract_connective(op, &vals[0], &vals[1], &vals[2])
        }
        Op::Not => contract_not(&vals[0], &vals[1]),
        Op::Minus => contract_minus(&vals[0], &vals[1]),
        Op::Abs => contract_abs(&vals[0], &vals[1]),
        Op::Exp => contract_exp(&vals[0], &vals[1]),
        Op::Sqrt => contract_sqrt(&vals[0], &vals[1], ctx),
        Op::Sin | Op::Cos | Op::Tan => contract_trig(op, &vals[0], &vals[1]),
        Op::Integral => contract_integral(&vals[0]),
    }
}

fn meet(a: &Interval, b: &Interval) -> Result<Interval> {
    a.intersect(b).ok_or(SolverError::Inconsistent)
}

fn bool_point(v: bool) -> Interval {
    Interval {
        lo: Ext::int(i64::from(v)),
        hi: Ext::int(i64::from(v)),
        kind: DomainKind::Integer,
    }
}

fn known_true(b: &Interval) -> bool {
    b.lo > Ext::zero()
}

fn known_false(b: &Interval) -> bool {
    b.hi < Ext::int(1)
}

fn decided(b: &Interval) -> bool {
    known_true(b) || known_false(b)
}

/// `[b, +∞)`.
fn at_least(b: Ext) -> Interval {
    Interval {
        lo: b,
        hi: Ext::PosInf,
        kind: DomainKind::Real,
    }
}

/// `(-∞, b]`.
fn at_most(b: Ext) -> Interval {
    Interval {
        lo: Ext::NegInf,
        hi: b,
        kind: DomainKind::Real,
    }
}

/// `x ∩ (a ∪ b)`: the hull of the surviving pieces; empty is a failure.
fn meet_union(x: &Interval, a: Option<&Interval>, b: Option<&Interval>) -> Result<Interval> {
    let ia = a.and_then(|a| x.intersect(a));
    let ib = b.and_then(|b| x.intersect(b));
    match (ia, ib) {
        (None, None) => Err(SolverError::Inconsistent),
        (Some(p), None) => Ok(p),
        (None, Some(q)) => Ok(q),
        (Some(p), Some(q)) => Ok(p.hull(&q)),
    }
}

/// Remove the point `p` from `x`: only a touched bound can be trimmed.
fn remove_point(x: &Interval, p: &Ext) -> Result<Interval> {
    if !x.contains(p) {
        return Ok(x.clone());
    }
    if x.is_point() {
        return Err(SolverError::Inconsistent);
    }
    if x.lo == *p {
        let lo = match x.kind {
            DomainKind::Integer => {
                let r = p.as_rational().unwrap_or_else(BigRational::zero);
                Ext::Rat(r + BigRational::from_integer(1.into()))
            }
            DomainKind::Real => float_just_above(p),
        };
        return Interval::new(x.kind, lo, x.hi.clone()).ok_or(SolverError::Inconsistent);
    }
    if x.hi == *p {
        let hi = match x.kind {
            DomainKind::Integer => {
                let r = p.as_rational().unwrap_or_else(BigRational::zero);
                Ext::Rat(r - BigRational::from_integer(1.into()))
            }
            DomainKind::Real => float_just_below(p),
        };
        return Interval::new(x.kind, x.lo.clone(), hi).ok_or(SolverError::Inconsistent);
    }
    // Interior point: not removable from a single interval.
    Ok(x.clone())
}

fn float_just_above(p: &Ext) -> Ext {
    if !p.is_finite() {
        return p.clone();
    }
    let f = p.to_f64_hi();
    if Ext::Float(f) == *p {
        Ext::Float(round::next_up(f))
    } else {
        Ext::Float(f)
    }
}

fn float_just_below(p: &Ext) -> Ext {
    if !p.is_finite() {
        return p.clone();
    }
    let f = p.to_f64_lo();
    if Ext::Float(f) == *p {
        Ext::Float(round::next_down(f))
    } else {
        Ext::Float(f)
    }
}

fn all_points(vs: &[&Interval]) -> bool {
    vs.iter().all(|v| v.is_point())
}

fn done(updates: SmallVec<[(usize, Interval); 3]>, persistent: bool) -> Result<Contraction> {
    Ok(Contraction {
        updates,
        persistent,
    })
}

/// `z = x + y`.
fn contract_add(z: &Interval, x: &Interval, y: &Interval, ctx: &NumCtx) -> Result<Contraction> {
    let nz = meet(z, &x.add(y, ctx))?;
    let nx = meet(x, &nz.sub(y, ctx))?;
    let ny = meet(y, &nz.sub(&nx, ctx))?;
    let persistent = all_points(&[&nz, &nx, &ny]);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// `z = x · y`. Backward narrowing divides; a divisor spanning zero yields
/// the enclosing union and therefore no narrowing along that operand.
fn contract_mul(z: &Interval, x: &Interval, y: &Interval, ctx: &NumCtx) -> Result<Contraction> {
    let nz = meet(z, &x.mul(y, ctx))?;
    let nx = match nz.div(y, ctx) {
        Some(q) => meet(x, &q)?,
        None => return Err(SolverError::Inconsistent),
    };
    let ny = match nz.div(&nx, ctx) {
        Some(q) => meet(y, &q)?,
        None => return Err(SolverError::Inconsistent),
    };
    let persistent = all_points(&[&nz, &nx, &ny]);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// `z = min(x, y)`.
fn contract_min(z: &Interval, x: &Interval, y: &Interval) -> Result<Contraction> {
    let nz = meet(z, &x.min_with(y))?;
    let mut nx = meet(x, &at_least(nz.lo.clone()))?;
    let mut ny = meet(y, &at_least(nz.lo.clone()))?;
    // If one operand lies entirely above z, the other must realise z.
    if ny.lo > nz.hi {
        nx = meet(&nx, &nz)?;
    }
    if nx.lo > nz.hi {
        ny = meet(&ny, &nz)?;
    }
    let persistent = all_points(&[&nz, &nx, &ny]);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// `z = max(x, y)`.
fn contract_max(z: &Interval, x: &Interval, y: &Interval) -> Result<Contraction> {
    let nz = meet(z, &x.max_with(y))?;
    let mut nx = meet(x, &at_most(nz.hi.clone()))?;
    let mut ny = meet(y, &at_most(nz.hi.clone()))?;
    if ny.hi < nz.lo {
        nx = meet(&nx, &nz)?;
    }
    if nx.hi < nz.lo {
        ny = meet(&ny, &nz)?;
    }
    let persistent = all_points(&[&nz, &nx, &ny]);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// `z = x ** y`, distinguishing odd/even integer exponents, rational
/// exponents through roots, and general exponents through exp/ln.
fn contract_pow(z: &Interval, x: &Interval, y: &Interval, ctx: &NumCtx) -> Result<Contraction> {
    let fwd = x.pow(y, ctx).ok_or(SolverError::Inconsistent)?;
    let nz = meet(z, &fwd)?;
    let nx = if let Some(r) = y.point_value() {
        pow_backward_base(x, &nz, &r, ctx)?
    } else if x.lo.signum() >= 0 {
        // x = z^(1/y) on the non-negative base domain.
        pow_backward_base_general(x, &nz, y, ctx)?
    } else {
        x.clone()
    };
    let ny = if y.is_point() || nx.lo.signum() <= 0 {
        y.clone()
    } else {
        pow_backward_exponent(y, &nz, &nx, ctx)?
    };
    let persistent = all_points(&[&nz, &nx, &ny]);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// Narrow the base given `z = x^r` for a point rational exponent `r ≠ 0`.
fn pow_backward_base(
    x: &Interval,
    z: &Interval,
    r: &BigRational,
    ctx: &NumCtx,
) -> Result<Interval> {
    if r.is_zero() {
        return Ok(x.clone());
    }
    if r.is_negative() {
        // x^r = z  ⇔  x^(-r) = 1/z
        let inv = match Interval::point(Ext::int(1)).div(z, ctx) {
            Some(q) => q,
            None => return Err(SolverError::Inconsistent),
        };
        return pow_backward_base(x, &inv, &(-r), ctx);
    }
    let p_odd = r.numer().bit(0);
    let recip = r.recip();
    if p_odd {
        // Odd numerator: x ↦ x^r is injective where defined; invert with
        // the reciprocal exponent (odd-denominator root stays sign-aware).
        match z.pow(&Interval::rational_point(recip), ctx) {
            Some(c) => meet(x, &c),
            None => Err(SolverError::Inconsistent),
        }
    } else {
        // Even numerator: z ≥ 0 and x = ±z^(1/r).
        let zpos = z
            .intersect(&at_least(Ext::zero()))
            .ok_or(SolverError::Inconsistent)?;
        match zpos.pow(&Interval::rational_point(recip), ctx) {
            Some(w) => meet_union(x, Some(&w.neg()), Some(&w)),
            None => Err(SolverError::Inconsistent),
        }
    }
}

/// Narrow a non-negative base given `z = x^y` with an interval exponent:
/// `x = exp(ln z / y)`.
fn pow_backward_base_general(
    x: &Interval,
    z: &Interval,
    y: &Interval,
    ctx: &NumCtx,
) -> Result<Interval> {
    let Some(zpos) = z.intersect(&at_least(Ext::zero())) else {
        return Err(SolverError::Inconsistent);
    };
    let Some(lnz) = zpos.ln() else {
        // z pinned at 0: the base may be 0, nothing to conclude.
        return Ok(x.clone());
    };
    match lnz.div(y, ctx) {
        Some(q) => meet(x, &q.exp()),
        // Exponent pinned at 0: x is unconstrained by this relation.
        None => Ok(x.clone()),
    }
}

/// Narrow the exponent given `z = x^y` with `x > 0`: `y = ln z / ln x`.
fn pow_backward_exponent(
    y: &Interval,
    z: &Interval,
    x: &Interval,
    ctx: &NumCtx,
) -> Result<Interval> {
    if x.lo.signum() <= 0 {
        return Ok(y.clone());
    }
    let Some(zpos) = z.intersect(&at_least(Ext::zero())) else {
        return Err(SolverError::Inconsistent);
    };
    let Some(lnz) = zpos.ln() else {
        // z = 0 with a positive base is unsatisfiable.
        return Err(SolverError::Inconsistent);
    };
    let lnx = match x.ln() {
        Some(l) => l,
        None => return Ok(y.clone()),
    };
    match lnz.div(&lnx, ctx) {
        Some(q) => meet(y, &q),
        // Base pinned at 1: any exponent works as long as z admits 1.
        None => Ok(y.clone()),
    }
}

/// `b = (x == y)`.
fn contract_eq(b: &Interval, x: &Interval, y: &Interval) -> Result<Contraction> {
    let mut nb = b.clone();
    let mut nx = x.clone();
    let mut ny = y.clone();
    let mut persistent = false;

    if x.is_disjoint(y) {
        nb = meet(&nb, &bool_point(false))?;
        persistent = true;
    } else if x.is_point() && y.is_point() {
        nb = meet(&nb, &bool_point(true))?;
        persistent = true;
    }

    if known_true(&nb) {
        let m = meet(&nx, &ny)?;
        nx = m.clone();
        ny = m;
        persistent = persistent || (nx.is_point() && ny.is_point());
    } else if known_false(&nb) {
        if ny.is_point() {
            nx = remove_point(&nx, &ny.lo)?;
        }
        if nx.is_point() {
            ny = remove_point(&ny, &nx.lo)?;
        }
        persistent = persistent || nx.is_disjoint(&ny);
    }
    done(
        smallvec::smallvec![(0, nb), (1, nx), (2, ny)],
        persistent,
    )
}

/// `b = (x ≠ y)`.
fn contract_ne(b: &Interval, x: &Interval, y: &Interval) -> Result<Contraction> {
    let mut nb = b.clone();
    let mut nx = x.clone();
    let mut ny = y.clone();
    let mut persistent = false;

    if x.is_disjoint(y) {
        nb = meet(&nb, &bool_point(true))?;
        persistent = true;
    } else if x.is_point() && y.is_point() {
        nb = meet(&nb, &bool_point(false))?;
        persistent = true;
    }

    if known_true(&nb) {
        if ny.is_point() {
            nx = remove_point(&nx, &ny.lo)?;
        }
        if nx.is_point() {
            ny = remove_point(&ny, &nx.lo)?;
        }
        persistent = persistent || nx.is_disjoint(&ny);
    } else if known_false(&nb) {
        let m = meet(&nx, &ny)?;
        nx = m.clone();
        ny = m;
        persistent = persistent || (nx.is_point() && ny.is_point());
    }
    done(
        smallvec::smallvec![(0, nb), (1, nx), (2, ny)],
        persistent,
    )
}

/// `b = (x ≤ y)` (`strict` for `<`). Integer operands get exact ±1 strict
/// offsets; real strictness is kept to float tolerance.
fn contract_ord(
    b: &Interval,
    x: &Interval,
    y: &Interval,
    ctx: &NumCtx,
    strict: bool,
) -> Result<Contraction> {
    let mut nb = b.clone();
    let mut nx = x.clone();
    let mut ny = y.clone();

    let certainly_true = if strict { x.hi < y.lo } else { x.hi <= y.lo };
    let certainly_false = if strict { x.lo >= y.hi } else { x.lo > y.hi };
    if certainly_true {
        nb = meet(&nb, &bool_point(true))?;
    } else if certainly_false {
        nb = meet(&nb, &bool_point(false))?;
    }

    let one = Ext::int(1);
    if known_true(&nb) {
        // x ≤ y (strictly, for integers, x ≤ y − 1).
        let hi = if strict && x.kind == DomainKind::Integer && y.kind == DomainKind::Integer {
            ctx.sub_hi(&ny.hi, &one)
        } else {
            ny.hi.clone()
        };
        let lo = if strict && x.kind == DomainKind::Integer && y.kind == DomainKind::Integer {
            ctx.add_lo(&nx.lo, &one)
        } else {
            nx.lo.clone()
        };
        nx = meet(&nx, &at_most(hi))?;
        ny = meet(&ny, &at_least(lo))?;
    } else if known_false(&nb) {
        // y < x (for `≤`), or y ≤ x (for `<`).
        let negated_strict = !strict;
        let hi = if negated_strict && x.kind == DomainKind::Integer && y.kind == DomainKind::Integer
        {
            ctx.sub_hi(&nx.hi, &one)
        } else {
            nx.hi.clone()
        };
        let lo = if negated_strict && x.kind == DomainKind::Integer && y.kind == DomainKind::Integer
        {
            ctx.add_lo(&ny.lo, &one)
        } else {
            ny.lo.clone()
        };
        ny = meet(&ny, &at_most(hi))?;
        nx = meet(&nx, &at_least(lo))?;
    }

    // Persistent once certainty holds on the narrowed operands: the
    // enforcement clamps are no-ops from here on.
    let now_true = if strict { nx.hi < ny.lo } else { nx.hi <= ny.lo };
    let now_false = if strict { nx.lo >= ny.hi } else { nx.lo > ny.hi };
    let persistent = (known_true(&nb) && now_true) || (known_false(&nb) && now_false);
    done(
        smallvec::smallvec![(0, nb), (1, nx), (2, ny)],
        persistent,
    )
}

/// `b = (x ⊆ y)`: membership of x's value in the enclosure of y.
fn contract_in(b: &Interval, x: &Interval, y: &Interval) -> Result<Contraction> {
    let mut nb = b.clone();
    let mut nx = x.clone();
    let mut persistent = false;

    if x.is_disjoint(y) {
        nb = meet(&nb, &bool_point(false))?;
        persistent = true;
    } else if x.is_point() && y.is_point() {
        nb = meet(&nb, &bool_point(true))?;
        persistent = true;
    }

    if known_true(&nb) {
        nx = meet(&nx, y)?;
        persistent = persistent || nx.is_subset_of(y) && y.is_point();
    } else if known_false(&nb) {
        // x avoids y: keep the surviving side(s) of the complement.
        let below = at_most(float_just_below(&y.lo));
        let above = at_least(float_just_above(&y.hi));
        nx = meet_union(&nx, Some(&below), Some(&above))?;
        persistent = persistent || nx.is_disjoint(y);
    }
    done(
        smallvec::smallvec![(0, nb), (1, nx), (2, y.clone())],
        persistent,
    )
}

/// Truth-table propagation for the binary connectives.
fn contract_connective(
    op: Op,
    z: &Interval,
    x: &Interval,
    y: &Interval,
) -> Result<Contraction> {
    let mut nz = z.clone();
    let mut nx = x.clone();
    let mut ny = y.clone();

    let xt = known_true(&nx);
    let xf = known_false(&nx);
    let yt = known_true(&ny);
    let yf = known_false(&ny);

    // Forward: decide z from decided operands.
    let forward = match op {
        Op::And => {
            if xt && yt {
                Some(true)
            } else if xf || yf {
                Some(false)
            } else {
                None
            }
        }
        Op::Or => {
            if xt || yt {
                Some(true)
            } else if xf && yf {
                Some(false)
            } else {
                None
            }
        }
        Op::Nand => {
            if xt && yt {
                Some(false)
            } else if xf || yf {
                Some(true)
            } else {
                None
            }
        }
        Op::Nor => {
            if xt || yt {
                Some(false)
            } else if xf && yf {
                Some(true)
            } else {
                None
            }
        }
        Op::Xor => {
            if (xt || xf) && (yt || yf) {
                Some(xt != yt)
            } else {
                None
            }
        }
        Op::ImB => {
            if xf || yt {
                Some(true)
            } else if xt && yf {
                Some(false)
            } else {
                None
            }
        }
        _ => unreachable!("not a connective"),
    };
    if let Some(v) = forward {
        nz = meet(&nz, &bool_point(v))?;
    }

    // Backward: decide operands from z and the other operand.
    let zt = known_true(&nz);
    let zf = known_false(&nz);
    match op {
        Op::And => {
            if zt {
                nx = meet(&nx, &bool_point(true))?;
                ny = meet(&ny, &bool_point(true))?;
            } else if zf {
                if xt {
                    ny = meet(&ny, &bool_point(false))?;
                }
                if yt {
                    nx = meet(&nx, &bool_point(false))?;
                }
            }
        }
        Op::Or => {
            if zf {
                nx = meet(&nx, &bool_point(false))?;
                ny = meet(&ny, &bool_point(false))?;
            } else if zt {
                if xf {
                    ny = meet(&ny, &bool_point(true))?;
                }
                if yf {
                    nx = meet(&nx, &bool_point(true))?;
                }
            }
        }
        Op::Nand => {
            if zf {
                nx = meet(&nx, &bool_point(true))?;
                ny = meet(&ny, &bool_point(true))?;
            } else if zt {
                if xt {
                    ny = meet(&ny, &bool_point(false))?;
                }
                if yt {
                    nx = meet(&nx, &bool_point(false))?;
                }
            }
        }
        Op::Nor => {
            if zt {
                nx = meet(&nx, &bool_point(false))?;
                ny = meet(&ny, &bool_point(false))?;
            } else if zf {
                if xf {
                    ny = meet(&ny, &bool_point(true))?;
                }
                if yf {
                    nx = meet(&nx, &bool_point(true))?;
                }
            }
        }
        Op::Xor => {
            if zt || zf {
                if xt || xf {
                    ny = meet(&ny, &bool_point(zt != xt))?;
                }
                if yt || yf {
                    nx = meet(&nx, &bool_point(zt != yt))?;
                }
            }
        }
        Op::ImB => {
            if zf {
                nx = meet(&nx, &bool_point(true))?;
                ny = meet(&ny, &bool_point(false))?;
            } else if zt {
                if xt {
                    ny = meet(&ny, &bool_point(true))?;
                }
                if yf {
                    nx = meet(&nx, &bool_point(false))?;
                }
            }
        }
        _ => unreachable!(),
    }

    let persistent = decided(&nz) && decided(&nx) && decided(&ny);
    done(
        smallvec::smallvec![(0, nz), (1, nx), (2, ny)],
        persistent,
    )
}

/// `z = ¬x`.
fn contract_not(z: &Interval, x: &Interval) -> Result<Contraction> {
    let mut nz = z.clone();
    let mut nx = x.clone();
    if known_true(&nx) {
        nz = meet(&nz, &bool_point(false))?;
    } else if known_false(&nx) {
        nz = meet(&nz, &bool_point(true))?;
    }
    if known_true(&nz) {
        nx = meet(&nx, &bool_point(false))?;
    } else if known_false(&nz) {
        nx = meet(&nx, &bool_point(true))?;
    }
    let persistent = decided(&nz) && decided(&nx);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// `z = −x`.
fn contract_minus(z: &Interval, x: &Interval) -> Result<Contraction> {
    let nz = meet(z, &x.neg())?;
    let nx = meet(x, &nz.neg())?;
    let persistent = all_points(&[&nz, &nx]);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// `z = |x|`.
fn contract_abs(z: &Interval, x: &Interval) -> Result<Contraction> {
    let nz = meet(z, &x.abs())?;
    let nx = meet_union(x, Some(&nz.neg()), Some(&nz))?;
    let persistent = all_points(&[&nz, &nx]);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// `z = eˣ`.
fn contract_exp(z: &Interval, x: &Interval) -> Result<Contraction> {
    let nz = meet(z, &x.exp())?;
    let nx = match nz.ln() {
        Some(l) => meet(x, &l)?,
        // z pinned at 0: e^x never reaches it.
        None => return Err(SolverError::Inconsistent),
    };
    let persistent = all_points(&[&nz, &nx]);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// `z = √x` (principal branch, z ≥ 0).
fn contract_sqrt(z: &Interval, x: &Interval, ctx: &NumCtx) -> Result<Contraction> {
    let znn = meet(z, &at_least(Ext::zero()))?;
    let s = x.sqrt().ok_or(SolverError::Inconsistent)?;
    let nz = meet(&znn, &s)?;
    let sq = nz.powi(2, ctx).ok_or(SolverError::Inconsistent)?;
    let nx = meet(x, &sq)?;
    let persistent = all_points(&[&nz, &nx]);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// `z = sin x` / `cos x` / `tan x`, with inverse narrowing of `x` when its
/// span certainly lies within one monotonic branch.
fn contract_trig(op: Op, z: &Interval, x: &Interval) -> Result<Contraction> {
    let fwd = match op {
        Op::Sin => x.sin(),
        Op::Cos => x.cos(),
        Op::Tan => x.tan(),
        _ => unreachable!(),
    };
    let nz = meet(z, &fwd)?;
    let backward = match op {
        Op::Sin => sin_backward(x, &nz),
        Op::Cos => cos_backward(x, &nz),
        Op::Tan => tan_backward(x, &nz),
        _ => unreachable!(),
    };
    let nx = match backward {
        Some(c) => meet(x, &c)?,
        None => x.clone(),
    };
    let persistent = all_points(&[&nz, &nx]);
    done(smallvec::smallvec![(0, nz), (1, nx)], persistent)
}

/// Branch index k with `x ⊆ [kπ − π/2, kπ + π/2]` certain, if any.
fn half_shifted_branch(x: &Interval) -> Option<i64> {
    let lo = x.lo.to_f64_lo();
    let hi = x.hi.to_f64_hi();
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let k = (lo / round::pi_lo() + 0.5).floor() as i64;
    let lo_edge = round::step_up(round::pi_mul_hi(k) - round::half_pi_lo(), 2);
    let hi_edge = round::step_down(round::pi_mul_lo(k) + round::half_pi_lo(), 2);
    (lo >= lo_edge && hi <= hi_edge).then_some(k)
}

fn sin_backward(x: &Interval, z: &Interval) -> Option<Interval> {
    let k = half_shifted_branch(x)?;
    let zl = z.lo.to_f64_lo().max(-1.0);
    let zh = z.hi.to_f64_hi().min(1.0);
    let tl = round::asin_lo(zl);
    let th = round::asin_hi(zh);
    let (lo, hi) = if k.rem_euclid(2) == 0 {
        // sin(kπ + t) = sin t on even branches.
        (
            round::step_down(round::pi_mul_lo(k) + tl, 2),
            round::step_up(round::pi_mul_hi(k) + th, 2),
        )
    } else {
        // sin(kπ + t) = −sin t on odd branches.
        (
            round::step_down(round::pi_mul_lo(k) - th, 2),
            round::step_up(round::pi_mul_hi(k) - tl, 2),
        )
    };
    Interval::new(DomainKind::Real, Ext::from_f64_lo(lo), Ext::from_f64_hi(hi))
}

fn cos_backward(x: &Interval, z: &Interval) -> Option<Interval> {
    let lo = x.lo.to_f64_lo();
    let hi = x.hi.to_f64_hi();
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    // Branch [kπ, (k+1)π].
    let k = (lo / round::pi_lo()).floor() as i64;
    let lo_edge = round::step_up(round::pi_mul_hi(k), 2);
    let hi_edge = round::step_down(round::pi_mul_lo(k + 1), 2);
    if !(lo >= lo_edge && hi <= hi_edge) {
        return None;
    }
    let zl = z.lo.to_f64_lo().max(-1.0);
    let zh = z.hi.to_f64_hi().min(1.0);
    let (lo, hi) = if k.rem_euclid(2) == 0 {
        // cos(kπ + t) = cos t: acos is decreasing.
        (
            round::step_down(round::pi_mul_lo(k) + round::acos_lo(zh), 2),
            round::step_up(round::pi_mul_hi(k) + round::acos_hi(zl), 2),
        )
    } else {
        // cos(kπ + t) = −cos t.
        (
            round::step_down(round::pi_mul_lo(k) + round::acos_lo(-zl), 2),
            round::step_up(round::pi_mul_hi(k) + round::acos_hi(-zh), 2),
        )
    };
    Interval::new(DomainKind::Real, Ext::from_f64_lo(lo), Ext::from_f64_hi(hi))
}

fn tan_backward(x: &Interval, z: &Interval) -> Option<Interval> {
    let k = half_shifted_branch(x)?;
    let zl = z.lo.to_f64_lo();
    let zh = z.hi.to_f64_hi();
    let lo = round::step_down(round::pi_mul_lo(k) + round::atan_lo(zl), 2);
    let hi = round::step_up(round::pi_mul_hi(k) + round::atan_hi(zh), 2);
    Interval::new(DomainKind::Real, Ext::from_f64_lo(lo), Ext::from_f64_hi(hi))
}

/// Integrality coercion: round the operand's bounds inward to integers.
/// Once the record's kind has become integer, the store re-rounds every
/// later update itself and the node is spent.
fn contract_integral(x: &Interval) -> Result<Contraction> {
    let cand = Interval::new(DomainKind::Integer, x.lo.clone(), x.hi.clone())
        .ok_or(SolverError::Inconsistent)?;
    let persistent = x.kind == DomainKind::Integer;
    done(smallvec::smallvec![(0, cand)], persistent)
}
