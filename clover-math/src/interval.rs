//! Interval Values with Sound Outward-Rounded Arithmetic.
//!
//! An [`Interval`] is a pair of extended-real bounds `lo ≤ hi` with a domain
//! kind (real or integer; boolean is integer restricted to 0..1). All
//! arithmetic here is *enclosure arithmetic*: the result interval contains
//! every real obtainable by applying the operation to members of the
//! operands. Lower bounds are rounded toward −∞, upper bounds toward +∞.
//!
//! ## Division through zero
//!
//! Dividing by an interval that contains zero strictly in its interior
//! yields a union of two rays, which a single interval cannot represent;
//! the enclosing hull (the entire real line) is returned instead, so no
//! narrowing happens along that operand. Divisors touching zero at one
//! endpoint produce a single ray and do narrow.
//!
//! ## Trigonometric range reduction
//!
//! `sin`/`cos` reduce by π/2 quadrants using outward-rounded π constants:
//! an interval is tested conservatively for containing an extremum point
//! (`2kπ`, `π/2 + 2kπ`, …); uncertainty near the test boundary errs toward
//! inclusion, which only loosens the enclosure. `tan` over an interval that
//! may contain a pole is unbounded.

use crate::ext::{Ext, NumCtx};
use crate::round;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use std::fmt;

/// Domain kind of an interval. Boolean is `Integer` with bounds (0,1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    /// Continuous real domain.
    Real,
    /// Integral domain; bounds are integers or infinities.
    Integer,
}

impl DomainKind {
    /// Kind of a value derived from both operands: any integer operand
    /// forces integer only when the operation is closed over the integers,
    /// which the caller knows; this is the merge used by declarations and
    /// unification (real ∧ real = real, anything else integer).
    #[must_use]
    pub fn merge(self, other: DomainKind) -> DomainKind {
        if self == DomainKind::Integer || other == DomainKind::Integer {
            DomainKind::Integer
        } else {
            DomainKind::Real
        }
    }

    /// Kind merge for operations closed over the integers (+, −, ×, min,
    /// max, abs, neg): integer operands produce an integer result.
    #[must_use]
    pub fn closed_join(self, other: DomainKind) -> DomainKind {
        if self == DomainKind::Integer && other == DomainKind::Integer {
            DomainKind::Integer
        } else {
            DomainKind::Real
        }
    }
}

/// Default finite bound magnitude for real declarations (±10¹⁶).
#[must_use]
pub fn real_default_bound() -> Ext {
    Ext::int(10_000_000_000_000_000)
}

/// Default finite bound magnitude for integer declarations (±2⁶²).
#[must_use]
pub fn integer_default_bound() -> Ext {
    Ext::int(1_i64 << 62)
}

/// A closed interval over the extended reals with a domain kind.
///
/// Invariants: `lo ≤ hi`; `lo ≠ +∞`; `hi ≠ −∞`; integer-kind bounds are
/// integral or infinite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    /// Lower bound (inclusive).
    pub lo: Ext,
    /// Upper bound (inclusive).
    pub hi: Ext,
    /// Domain kind.
    pub kind: DomainKind,
}

impl Interval {
    /// Build an interval, re-rounding integer bounds inward. Returns `None`
    /// when the result is empty.
    #[must_use]
    pub fn new(kind: DomainKind, lo: Ext, hi: Ext) -> Option<Self> {
        if matches!(lo, Ext::PosInf) || matches!(hi, Ext::NegInf) {
            return None;
        }
        let (lo, hi) = match kind {
            DomainKind::Real => (lo, hi),
            DomainKind::Integer => (lo.ceil_int(), hi.floor_int()),
        };
        if lo > hi {
            return None;
        }
        Some(Self { lo, hi, kind })
    }

    /// A real interval with the given bounds. Panics on an empty pair;
    /// use [`Interval::new`] for fallible construction.
    #[must_use]
    pub fn real(lo: Ext, hi: Ext) -> Self {
        Self::new(DomainKind::Real, lo, hi).expect("empty real interval")
    }

    /// An integer interval with the given bounds, rounded inward.
    #[must_use]
    pub fn integer(lo: Ext, hi: Ext) -> Option<Self> {
        Self::new(DomainKind::Integer, lo, hi)
    }

    /// The boolean domain: integer (0,1).
    #[must_use]
    pub fn boolean() -> Self {
        Self {
            lo: Ext::zero(),
            hi: Ext::int(1),
            kind: DomainKind::Integer,
        }
    }

    /// The default real domain ±10¹⁶.
    #[must_use]
    pub fn real_default() -> Self {
        Self::real(real_default_bound().neg(), real_default_bound())
    }

    /// The default integer domain ±2⁶².
    #[must_use]
    pub fn integer_default() -> Self {
        Self {
            lo: integer_default_bound().neg(),
            hi: integer_default_bound(),
            kind: DomainKind::Integer,
        }
    }

    /// The entire real line.
    #[must_use]
    pub fn entire() -> Self {
        Self {
            lo: Ext::NegInf,
            hi: Ext::PosInf,
            kind: DomainKind::Real,
        }
    }

    /// A real point interval.
    #[must_use]
    pub fn point(v: Ext) -> Self {
        Self {
            lo: v.clone(),
            hi: v,
            kind: DomainKind::Real,
        }
    }

    /// A real point interval from an exact rational.
    #[must_use]
    pub fn rational_point(r: BigRational) -> Self {
        Self::point(Ext::Rat(r))
    }

    /// A point from a float constant, widened one float outward on each
    /// side: a float literal stands for some nearby real.
    #[must_use]
    pub fn float_constant(f: f64) -> Self {
        Self {
            lo: Ext::from_f64_lo(round::next_down(f)),
            hi: Ext::from_f64_hi(round::next_up(f)),
            kind: DomainKind::Real,
        }
    }

    /// Is this a single value?
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    /// The exact rational value of a collapsed interval.
    #[must_use]
    pub fn point_value(&self) -> Option<BigRational> {
        if self.is_point() {
            self.lo.as_rational()
        } else {
            None
        }
    }

    /// Is this exactly the zero point?
    #[must_use]
    pub fn is_zero_point(&self) -> bool {
        self.is_point() && self.lo.is_zero()
    }

    /// Does the interval contain `v`?
    #[must_use]
    pub fn contains(&self, v: &Ext) -> bool {
        self.lo <= *v && *v <= self.hi
    }

    /// Does the interval contain zero?
    #[must_use]
    pub fn contains_zero(&self) -> bool {
        self.contains(&Ext::zero())
    }

    /// Is `self ⊆ other` (bounds only; kinds are not compared)?
    #[must_use]
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        other.lo <= self.lo && self.hi <= other.hi
    }

    /// Are the two intervals disjoint?
    #[must_use]
    pub fn is_disjoint(&self, other: &Interval) -> bool {
        self.hi < other.lo || other.hi < self.lo
    }

    /// Intersection; the kind is the declaration merge of the operand
    /// kinds. `None` when empty.
    #[must_use]
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let kind = self.kind.merge(other.kind);
        let lo = if self.lo >= other.lo {
            self.lo.clone()
        } else {
            other.lo.clone()
        };
        let hi = if self.hi <= other.hi {
            self.hi.clone()
        } else {
            other.hi.clone()
        };
        Interval::new(kind, lo, hi)
    }

    /// Convex hull of the two intervals.
    #[must_use]
    pub fn hull(&self, other: &Interval) -> Interval {
        let lo = if self.lo <= other.lo {
            self.lo.clone()
        } else {
            other.lo.clone()
        };
        let hi = if self.hi >= other.hi {
            self.hi.clone()
        } else {
            other.hi.clone()
        };
        Interval {
            lo,
            hi,
            kind: self.kind.closed_join(other.kind),
        }
    }

    /// Interval width `hi − lo`, rounded up. Zero for a point, +∞ when a
    /// bound is infinite. Exact when both bounds are rational.
    #[must_use]
    pub fn width(&self, ctx: &NumCtx) -> Ext {
        if self.is_point() {
            return Ext::zero();
        }
        ctx.sub_hi(&self.hi, &self.lo)
    }

    /// Midpoint, safe against overflow (Goualard). A point returns its own
    /// bound; `(-∞,+∞)` returns 0; a half-line returns a finite interior
    /// representative.
    #[must_use]
    pub fn midpoint(&self) -> Ext {
        if self.is_point() {
            return self.lo.clone();
        }
        match (&self.lo, &self.hi) {
            (Ext::NegInf, Ext::PosInf) => Ext::zero(),
            (Ext::NegInf, hi) => {
                let h = hi.to_f64_lo();
                if h > 0.0 {
                    Ext::zero()
                } else {
                    // Descend geometrically below the finite bound.
                    Ext::from_f64_lo((h * 2.0 - 1.0).max(-f64::MAX))
                }
            }
            (lo, Ext::PosInf) => {
                let l = lo.to_f64_hi();
                if l < 0.0 {
                    Ext::zero()
                } else {
                    Ext::from_f64_hi((l * 2.0 + 1.0).min(f64::MAX))
                }
            }
            (Ext::Rat(a), Ext::Rat(b)) => {
                let two = BigRational::from_integer(BigInt::from(2));
                Ext::Rat((a + b) / two)
            }
            (lo, hi) => {
                let a = lo.to_f64_lo();
                let b = hi.to_f64_hi();
                let m = a / 2.0 + b / 2.0;
                Ext::Float(m.clamp(a.max(-f64::MAX), b.min(f64::MAX)))
            }
        }
    }

    /// Median split point: 0 for zero-containing intervals, otherwise the
    /// sign-appropriate geometric mean `±√(|lo|·|hi|)`. A point returns its
    /// own bound.
    #[must_use]
    pub fn median(&self) -> Ext {
        if self.is_point() {
            return self.lo.clone();
        }
        if self.contains_zero() {
            return Ext::zero();
        }
        let a = self.lo.abs().to_f64_lo().min(f64::MAX);
        let b = self.hi.abs().to_f64_lo().min(f64::MAX);
        let m = (a.ln() / 2.0 + b.ln() / 2.0).exp();
        let m = if self.lo.signum() < 0 { -m } else { m };
        // Keep the split point inside the interval.
        let lo_f = self.lo.to_f64_hi();
        let hi_f = self.hi.to_f64_lo();
        Ext::from_f64_lo(m.clamp(lo_f.min(hi_f), hi_f.max(lo_f)))
    }

    fn sign_class(&self) -> SignClass {
        if self.lo.signum() >= 0 {
            SignClass::NonNeg
        } else if self.hi.signum() <= 0 {
            SignClass::NonPos
        } else {
            SignClass::Mixed
        }
    }

    /// `self + other`.
    #[must_use]
    pub fn add(&self, other: &Interval, ctx: &NumCtx) -> Interval {
        Interval {
            lo: ctx.add_lo(&self.lo, &other.lo),
            hi: ctx.add_hi(&self.hi, &other.hi),
            kind: self.kind.closed_join(other.kind),
        }
    }

    /// `self - other`.
    #[must_use]
    pub fn sub(&self, other: &Interval, ctx: &NumCtx) -> Interval {
        Interval {
            lo: ctx.sub_lo(&self.lo, &other.hi),
            hi: ctx.sub_hi(&self.hi, &other.lo),
            kind: self.kind.closed_join(other.kind),
        }
    }

    /// `-self`, exact.
    #[must_use]
    pub fn neg(&self) -> Interval {
        Interval {
            lo: self.hi.neg(),
            hi: self.lo.neg(),
            kind: self.kind,
        }
    }

    /// `|self|`, exact.
    #[must_use]
    pub fn abs(&self) -> Interval {
        match self.sign_class() {
            SignClass::NonNeg => self.clone(),
            SignClass::NonPos => self.neg(),
            SignClass::Mixed => {
                let a = self.lo.abs();
                let b = self.hi.abs();
                Interval {
                    lo: Ext::zero(),
                    hi: if a >= b { a } else { b },
                    kind: self.kind,
                }
            }
        }
    }

    /// `self · other`, by sign-pattern case analysis.
    #[must_use]
    pub fn mul(&self, other: &Interval, ctx: &NumCtx) -> Interval {
        let kind = self.kind.closed_join(other.kind);
        if self.is_zero_point() || other.is_zero_point() {
            return Interval {
                lo: Ext::zero(),
                hi: Ext::zero(),
                kind,
            };
        }
        use SignClass::{Mixed, NonNeg, NonPos};
        let (a, b, c, d) = (&self.lo, &self.hi, &other.lo, &other.hi);
        let (lo, hi) = match (self.sign_class(), other.sign_class()) {
            (NonNeg, NonNeg) => (ctx.mul_lo(a, c), ctx.mul_hi(b, d)),
            (NonNeg, NonPos) => (ctx.mul_lo(b, c), ctx.mul_hi(a, d)),
            (NonNeg, Mixed) => (ctx.mul_lo(b, c), ctx.mul_hi(b, d)),
            (NonPos, NonNeg) => (ctx.mul_lo(a, d), ctx.mul_hi(b, c)),
            (NonPos, NonPos) => (ctx.mul_lo(b, d), ctx.mul_hi(a, c)),
            (NonPos, Mixed) => (ctx.mul_lo(a, d), ctx.mul_hi(a, c)),
            (Mixed, NonNeg) => (ctx.mul_lo(a, d), ctx.mul_hi(b, d)),
            (Mixed, NonPos) => (ctx.mul_lo(b, c), ctx.mul_hi(a, c)),
            (Mixed, Mixed) => {
                let l1 = ctx.mul_lo(a, d);
                let l2 = ctx.mul_lo(b, c);
                let h1 = ctx.mul_hi(a, c);
                let h2 = ctx.mul_hi(b, d);
                (
                    if l1 <= l2 { l1 } else { l2 },
                    if h1 >= h2 { h1 } else { h2 },
                )
            }
        };
        Interval { lo, hi, kind }
    }

    /// `self / other`. Returns `None` only when provably empty (division of
    /// a zero-free interval by the zero point). A divisor spanning zero in
    /// its interior yields the enclosing union, i.e. the entire line.
    #[must_use]
    pub fn div(&self, other: &Interval, ctx: &NumCtx) -> Option<Interval> {
        use SignClass::{Mixed, NonNeg, NonPos};
        let kind = DomainKind::Real;
        if other.is_zero_point() {
            return if self.contains_zero() {
                Some(Interval::entire())
            } else {
                None
            };
        }
        let (a, b, c, d) = (&self.lo, &self.hi, &other.lo, &other.hi);
        let zl = other.lo.is_zero();
        let zh = other.hi.is_zero();
        let (lo, hi) = match other.sign_class() {
            Mixed => {
                // Union of two rays; not representable as one interval.
                return Some(Interval::entire());
            }
            NonNeg if zl => match self.sign_class() {
                NonNeg => (ctx.div_lo(a, d), Ext::PosInf),
                NonPos => (Ext::NegInf, ctx.div_hi(b, d)),
                Mixed => return Some(Interval::entire()),
            },
            NonPos if zh => match self.sign_class() {
                NonNeg => (Ext::NegInf, ctx.div_hi(a, c)),
                NonPos => (ctx.div_lo(b, c), Ext::PosInf),
                Mixed => return Some(Interval::entire()),
            },
            NonNeg => match self.sign_class() {
                NonNeg => (ctx.div_lo(a, d), ctx.div_hi(b, c)),
                NonPos => (ctx.div_lo(a, c), ctx.div_hi(b, d)),
                Mixed => (ctx.div_lo(a, c), ctx.div_hi(b, c)),
            },
            NonPos => match self.sign_class() {
                NonNeg => (ctx.div_lo(b, d), ctx.div_hi(a, c)),
                NonPos => (ctx.div_lo(b, c), ctx.div_hi(a, d)),
                Mixed => (ctx.div_lo(b, d), ctx.div_hi(a, d)),
            },
        };
        Interval::new(kind, lo, hi)
    }

    /// Pointwise minimum of the two intervals.
    #[must_use]
    pub fn min_with(&self, other: &Interval) -> Interval {
        Interval {
            lo: if self.lo <= other.lo {
                self.lo.clone()
            } else {
                other.lo.clone()
            },
            hi: if self.hi <= other.hi {
                self.hi.clone()
            } else {
                other.hi.clone()
            },
            kind: self.kind.closed_join(other.kind),
        }
    }

    /// Pointwise maximum of the two intervals.
    #[must_use]
    pub fn max_with(&self, other: &Interval) -> Interval {
        Interval {
            lo: if self.lo >= other.lo {
                self.lo.clone()
            } else {
                other.lo.clone()
            },
            hi: if self.hi >= other.hi {
                self.hi.clone()
            } else {
                other.hi.clone()
            },
            kind: self.kind.closed_join(other.kind),
        }
    }

    /// `√self` over the non-negative part; `None` when entirely negative.
    #[must_use]
    pub fn sqrt(&self) -> Option<Interval> {
        if self.hi.signum() < 0 {
            return None;
        }
        let lo = if self.lo.signum() <= 0 {
            Ext::zero()
        } else {
            Ext::from_f64_lo(round::sqrt_lo(self.lo.to_f64_lo().max(0.0)))
        };
        let hi = match &self.hi {
            Ext::PosInf => Ext::PosInf,
            h => Ext::from_f64_hi(round::sqrt_hi(h.to_f64_hi())),
        };
        Some(Interval {
            lo,
            hi,
            kind: DomainKind::Real,
        })
    }

    /// `e^self`. Always non-negative.
    #[must_use]
    pub fn exp(&self) -> Interval {
        let lo = Ext::from_f64_lo(round::exp_lo(self.lo.to_f64_lo()));
        let hi = match &self.hi {
            Ext::PosInf => Ext::PosInf,
            h => Ext::from_f64_hi(round::exp_hi(h.to_f64_hi())),
        };
        Interval {
            lo,
            hi,
            kind: DomainKind::Real,
        }
    }

    /// `ln self` over the positive part; `None` when `hi ≤ 0`.
    #[must_use]
    pub fn ln(&self) -> Option<Interval> {
        if self.hi.signum() <= 0 {
            return None;
        }
        let lo = if self.lo.signum() <= 0 {
            Ext::NegInf
        } else {
            Ext::from_f64_lo(round::ln_lo(self.lo.to_f64_lo()))
        };
        let hi = match &self.hi {
            Ext::PosInf => Ext::PosInf,
            h => Ext::from_f64_hi(round::ln_hi(h.to_f64_hi())),
        };
        Some(Interval {
            lo,
            hi,
            kind: DomainKind::Real,
        })
    }

    /// `selfⁿ` for an integer exponent, with the odd/even sign distinction.
    #[must_use]
    pub fn powi(&self, n: i64, ctx: &NumCtx) -> Option<Interval> {
        if n == 0 {
            return Some(Interval::point(Ext::int(1)));
        }
        if n == 1 {
            return Some(self.clone());
        }
        if n < 0 {
            let pos = self.powi(-n, ctx)?;
            return Interval::point(Ext::int(1)).div(&pos, ctx);
        }
        let kind = self.kind;
        let (lo, hi) = if n % 2 == 1 {
            (
                ext_powi(&self.lo, n, ctx, false),
                ext_powi(&self.hi, n, ctx, true),
            )
        } else {
            match self.sign_class() {
                SignClass::NonNeg => (
                    ext_powi(&self.lo, n, ctx, false),
                    ext_powi(&self.hi, n, ctx, true),
                ),
                SignClass::NonPos => (
                    ext_powi(&self.hi, n, ctx, false),
                    ext_powi(&self.lo, n, ctx, true),
                ),
                SignClass::Mixed => {
                    let a = ext_powi(&self.lo, n, ctx, true);
                    let b = ext_powi(&self.hi, n, ctx, true);
                    (Ext::zero(), if a >= b { a } else { b })
                }
            }
        };
        Interval::new(kind, lo, hi)
    }

    /// Principal `n`-th root. Odd roots preserve sign; even roots take the
    /// non-negative branch over `self ∩ [0,∞)` (`None` when empty).
    #[must_use]
    pub fn root(&self, n: u32) -> Option<Interval> {
        if n == 0 {
            return None;
        }
        if n == 1 {
            return Some(self.clone());
        }
        if n % 2 == 0 && self.hi.signum() < 0 {
            return None;
        }
        let lo = if n % 2 == 0 && self.lo.signum() <= 0 {
            Ext::zero()
        } else {
            ext_root(&self.lo, n, false)
        };
        let hi = ext_root(&self.hi, n, true);
        Interval::new(DomainKind::Real, lo, hi)
    }

    /// General power `self^other` (forward). Integer point exponents take
    /// the `powi` path; rational point exponents `p/q` with odd `q` stay
    /// sign-aware through the odd root; everything else restricts the base
    /// to `[0,∞)` and routes through `exp(other · ln base)`.
    #[must_use]
    pub fn pow(&self, other: &Interval, ctx: &NumCtx) -> Option<Interval> {
        if let Some(r) = other.point_value() {
            if r.is_integer() {
                if let Some(n) = r.to_integer().to_i64() {
                    return self.powi(n, ctx);
                }
            } else if let (Some(p), Some(q)) =
                (r.numer().to_i64(), r.denom().to_u32())
            {
                if q % 2 == 1 {
                    return self.root(q)?.powi(p, ctx);
                }
            }
        }
        let base = self.intersect(&Interval {
            lo: Ext::zero(),
            hi: Ext::PosInf,
            kind: DomainKind::Real,
        })?;
        let logs = base.ln()?;
        Some(logs.mul(other, ctx).exp())
    }

    /// `sin self`, with quadrant range reduction.
    #[must_use]
    pub fn sin(&self) -> Interval {
        let a = self.lo.to_f64_lo();
        let b = self.hi.to_f64_hi();
        if !a.is_finite() || !b.is_finite() || b - a >= round::two_pi_hi() {
            return unit_interval();
        }
        // Maxima of sin at π/2 + 2kπ, minima at −π/2 + 2kπ.
        let has_max = contains_shifted_period(a, b, round::half_pi_lo(), round::half_pi_hi());
        let has_min = contains_shifted_period(a, b, -round::half_pi_hi(), -round::half_pi_lo());
        let lo = if has_min {
            -1.0
        } else {
            round::sin_lo(a).min(round::sin_lo(b))
        };
        let hi = if has_max {
            1.0
        } else {
            round::sin_hi(a).max(round::sin_hi(b))
        };
        Interval {
            lo: Ext::from_f64_lo(lo),
            hi: Ext::from_f64_hi(hi),
            kind: DomainKind::Real,
        }
    }

    /// `cos self`, with quadrant range reduction.
    #[must_use]
    pub fn cos(&self) -> Interval {
        let a = self.lo.to_f64_lo();
        let b = self.hi.to_f64_hi();
        if !a.is_finite() || !b.is_finite() || b - a >= round::two_pi_hi() {
            return unit_interval();
        }
        // Maxima of cos at 2kπ, minima at π + 2kπ.
        let has_max = contains_shifted_period(a, b, 0.0, 0.0);
        let has_min = contains_shifted_period(a, b, round::pi_lo(), round::pi_hi());
        let lo = if has_min {
            -1.0
        } else {
            round::cos_lo(a).min(round::cos_lo(b))
        };
        let hi = if has_max {
            1.0
        } else {
            round::cos_hi(a).max(round::cos_hi(b))
        };
        Interval {
            lo: Ext::from_f64_lo(lo),
            hi: Ext::from_f64_hi(hi),
            kind: DomainKind::Real,
        }
    }

    /// `tan self`. Unbounded when the interval may contain a pole
    /// `π/2 + kπ`; otherwise monotonic between the pole-free bounds.
    #[must_use]
    pub fn tan(&self) -> Interval {
        let a = self.lo.to_f64_lo();
        let b = self.hi.to_f64_hi();
        if !a.is_finite() || !b.is_finite() || b - a >= round::pi_hi() {
            return Interval::entire();
        }
        let has_pole = contains_pole(a, b);
        if has_pole {
            return Interval::entire();
        }
        Interval {
            lo: Ext::from_f64_lo(round::tan_lo(a)),
            hi: Ext::from_f64_hi(round::tan_hi(b)),
            kind: DomainKind::Real,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignClass {
    NonNeg,
    NonPos,
    Mixed,
}

/// `[-1, 1]`.
fn unit_interval() -> Interval {
    Interval {
        lo: Ext::int(-1),
        hi: Ext::int(1),
        kind: DomainKind::Real,
    }
}

/// Conservative test: does `[a,b]` contain a point `c + 2kπ` for integer k?
///
/// `c` is given as an outward pair `[c_lo, c_hi]`. The quotient range is
/// computed with rounding chosen to err toward "yes", which can only loosen
/// the trig enclosure, never unsound it.
fn contains_shifted_period(a: f64, b: f64, c_lo: f64, c_hi: f64) -> bool {
    let t1 = round::div_lo(round::sub_lo(a, c_hi), round::two_pi_lo())
        .min(round::div_lo(round::sub_lo(a, c_hi), round::two_pi_hi()));
    let t2 = round::div_hi(round::sub_hi(b, c_lo), round::two_pi_lo())
        .max(round::div_hi(round::sub_hi(b, c_lo), round::two_pi_hi()));
    t1.ceil() <= t2.floor()
}

/// Conservative test: does `[a,b]` contain a pole `π/2 + kπ`?
fn contains_pole(a: f64, b: f64) -> bool {
    let t1 = round::div_lo(round::sub_lo(a, round::half_pi_hi()), round::pi_lo())
        .min(round::div_lo(round::sub_lo(a, round::half_pi_hi()), round::pi_hi()));
    let t2 = round::div_hi(round::sub_hi(b, round::half_pi_lo()), round::pi_lo())
        .max(round::div_hi(round::sub_hi(b, round::half_pi_lo()), round::pi_hi()));
    t1.ceil() <= t2.floor()
}

/// `x^n` for `n ≥ 2`, rounded in the requested direction. Exact for small
/// rationals, float-widened otherwise.
fn ext_powi(x: &Ext, n: i64, ctx: &NumCtx, upper: bool) -> Ext {
    match x {
        Ext::NegInf => {
            if n % 2 == 1 {
                Ext::NegInf
            } else {
                Ext::PosInf
            }
        }
        Ext::PosInf => Ext::PosInf,
        Ext::Rat(r) => {
            if let Ok(e) = i32::try_from(n) {
                let approx_bits = (r.numer().bits() + r.denom().bits()) * n as u64;
                if approx_bits <= ctx.max_rational_bits {
                    return Ext::Rat(num_traits::pow::Pow::pow(r, e));
                }
            }
            float_powi(x.to_f64_side(upper), n, upper)
        }
        Ext::Float(f) => float_powi(*f, n, upper),
    }
}

fn float_powi(f: f64, n: i64, upper: bool) -> Ext {
    let mag = f.abs().powf(n as f64);
    let neg = f < 0.0 && n % 2 == 1;
    let v = if neg { -mag } else { mag };
    if upper {
        Ext::from_f64_hi(round::step_up(v, 2))
    } else {
        Ext::from_f64_lo(round::step_down(v, 2))
    }
}

/// Principal `n`-th root of a bound, rounded in the requested direction.
fn ext_root(x: &Ext, n: u32, upper: bool) -> Ext {
    match x {
        Ext::NegInf => Ext::NegInf,
        Ext::PosInf => Ext::PosInf,
        _ => {
            let f = x.to_f64_side(upper);
            if f == 0.0 {
                return Ext::zero();
            }
            let mag = f.abs().powf(1.0 / f64::from(n));
            let v = if f < 0.0 { -mag } else { mag };
            if upper {
                Ext::from_f64_hi(round::step_up(v, 4))
            } else {
                Ext::from_f64_lo(round::step_down(v, 4))
            }
        }
    }
}

impl Ext {
    /// Directed float approximation: lower for `upper = false`, upper
    /// otherwise.
    #[must_use]
    pub fn to_f64_side(&self, upper: bool) -> f64 {
        if upper {
            self.to_f64_hi()
        } else {
            self.to_f64_lo()
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DomainKind::Real => "real",
            DomainKind::Integer => "integer",
        };
        write!(f, "{}({},{})", kind, self.lo, self.hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NumCtx {
        NumCtx::default()
    }

    fn r(lo: f64, hi: f64) -> Interval {
        Interval::real(Ext::from_f64_lo(lo), Ext::from_f64_hi(hi))
    }

    #[test]
    fn test_integer_rounding_on_construction() {
        let i = Interval::integer(Ext::Float(0.5), Ext::Float(3.7)).unwrap();
        assert_eq!(i.lo, Ext::int(1));
        assert_eq!(i.hi, Ext::int(3));
        assert!(Interval::integer(Ext::Float(0.2), Ext::Float(0.8)).is_none());
    }

    #[test]
    fn test_intersect_and_hull() {
        let a = r(1.0, 5.0);
        let b = r(3.0, 7.0);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.lo, Ext::Float(3.0));
        assert_eq!(i.hi, Ext::Float(5.0));
        let h = a.hull(&b);
        assert_eq!(h.lo, Ext::Float(1.0));
        assert_eq!(h.hi, Ext::Float(7.0));
        assert!(r(1.0, 2.0).intersect(&r(3.0, 4.0)).is_none());
    }

    #[test]
    fn test_point_laws() {
        let p = Interval::rational_point(BigRational::from_integer(BigInt::from(4)));
        assert_eq!(p.width(&ctx()), Ext::zero());
        assert_eq!(p.midpoint(), Ext::int(4));
        assert_eq!(p.median(), Ext::int(4));
    }

    #[test]
    fn test_midpoint_entire_is_zero() {
        assert_eq!(Interval::entire().midpoint(), Ext::zero());
    }

    #[test]
    fn test_midpoint_exact_rational() {
        let i = Interval::real(Ext::int(1), Ext::int(2));
        assert_eq!(
            i.midpoint(),
            Ext::Rat(BigRational::new(BigInt::from(3), BigInt::from(2)))
        );
    }

    #[test]
    fn test_median_zero_containing() {
        assert_eq!(r(-2.0, 3.0).median(), Ext::zero());
        let m = r(1.0, 100.0).median();
        // Geometric mean of 1 and 100 is 10.
        assert!(m > Ext::Float(9.0) && m < Ext::Float(11.0));
        let m = r(-100.0, -1.0).median();
        assert!(m < Ext::Float(-9.0) && m > Ext::Float(-11.0));
    }

    #[test]
    fn test_add_sub_enclose() {
        let a = r(1.0, 2.0);
        let b = r(3.0, 4.0);
        let s = a.add(&b, &ctx());
        assert!(s.contains(&Ext::Float(4.0)) && s.contains(&Ext::Float(6.0)));
        let d = a.sub(&b, &ctx());
        assert!(d.contains(&Ext::Float(-3.0)) && d.contains(&Ext::Float(-1.0)));
    }

    #[test]
    fn test_mul_sign_cases() {
        let c = ctx();
        let pp = r(2.0, 3.0).mul(&r(4.0, 5.0), &c);
        assert!(pp.contains(&Ext::Float(8.0)) && pp.contains(&Ext::Float(15.0)));
        let nn = r(-3.0, -2.0).mul(&r(-5.0, -4.0), &c);
        assert!(nn.contains(&Ext::Float(8.0)) && nn.contains(&Ext::Float(15.0)));
        let mm = r(-2.0, 3.0).mul(&r(-5.0, 4.0), &c);
        assert!(mm.contains(&Ext::Float(-15.0)) && mm.contains(&Ext::Float(12.0)));
        let zero = Interval::point(Ext::zero()).mul(&Interval::entire(), &c);
        assert!(zero.is_zero_point());
    }

    #[test]
    fn test_mul_infinite_operand() {
        let c = ctx();
        let i = r(0.0, 2.0).mul(
            &Interval::real(Ext::NegInf, Ext::PosInf),
            &c,
        );
        assert_eq!(i.lo, Ext::NegInf);
        assert_eq!(i.hi, Ext::PosInf);
    }

    #[test]
    fn test_div_sign_definite() {
        let c = ctx();
        let q = r(6.0, 12.0).div(&r(2.0, 3.0), &c).unwrap();
        assert!(q.contains(&Ext::Float(2.0)) && q.contains(&Ext::Float(6.0)));
    }

    #[test]
    fn test_div_through_zero_is_entire() {
        let c = ctx();
        let q = r(1.0, 2.0).div(&r(-1.0, 1.0), &c).unwrap();
        assert_eq!(q.lo, Ext::NegInf);
        assert_eq!(q.hi, Ext::PosInf);
    }

    #[test]
    fn test_div_zero_endpoint_ray() {
        let c = ctx();
        let q = r(1.0, 2.0)
            .div(&Interval::real(Ext::zero(), Ext::int(2)), &c)
            .unwrap();
        assert_eq!(q.hi, Ext::PosInf);
        assert!(q.lo >= Ext::Float(0.4));
    }

    #[test]
    fn test_div_by_zero_point() {
        let c = ctx();
        assert!(r(1.0, 2.0)
            .div(&Interval::point(Ext::zero()), &c)
            .is_none());
        assert!(r(-1.0, 2.0)
            .div(&Interval::point(Ext::zero()), &c)
            .is_some());
    }

    #[test]
    fn test_abs_and_neg() {
        let i = r(-2.0, 3.0).abs();
        assert_eq!(i.lo, Ext::zero());
        assert_eq!(i.hi, Ext::Float(3.0));
        let n = r(1.0, 3.0).neg();
        assert_eq!(n.lo, Ext::Float(-3.0));
        assert_eq!(n.hi, Ext::Float(-1.0));
    }

    #[test]
    fn test_powi_even_odd() {
        let c = ctx();
        let sq = r(-2.0, 3.0).powi(2, &c).unwrap();
        assert_eq!(sq.lo, Ext::zero());
        assert!(sq.contains(&Ext::Float(9.0)));
        assert!(!sq.contains(&Ext::Float(-0.5)));
        let cu = r(-2.0, 3.0).powi(3, &c).unwrap();
        assert!(cu.contains(&Ext::Float(-8.0)) && cu.contains(&Ext::Float(27.0)));
        let one = r(5.0, 6.0).powi(0, &c).unwrap();
        assert!(one.is_point());
    }

    #[test]
    fn test_powi_exact_rational() {
        let c = ctx();
        let i = Interval::real(Ext::int(2), Ext::int(3)).powi(4, &c).unwrap();
        assert_eq!(i.lo, Ext::int(16));
        assert_eq!(i.hi, Ext::int(81));
    }

    #[test]
    fn test_root_brackets() {
        let i = r(4.0, 9.0).root(2).unwrap();
        assert!(i.contains(&Ext::Float(2.0)) && i.contains(&Ext::Float(3.0)));
        let o = r(-27.0, 8.0).root(3).unwrap();
        assert!(o.contains(&Ext::Float(-3.0)) && o.contains(&Ext::Float(2.0)));
        assert!(r(-4.0, -1.0).root(2).is_none());
    }

    #[test]
    fn test_sqrt_exp_ln() {
        let s = r(1.0, 4.0).sqrt().unwrap();
        assert!(s.contains(&Ext::Float(1.0)) && s.contains(&Ext::Float(2.0)));
        assert!(r(-3.0, -1.0).sqrt().is_none());
        let e = r(0.0, 1.0).exp();
        assert!(e.contains(&Ext::Float(1.0)) && e.contains(&Ext::Float(std::f64::consts::E)));
        let l = r(1.0, std::f64::consts::E).ln().unwrap();
        assert!(l.contains(&Ext::zero()) && l.contains(&Ext::Float(1.0)));
        assert!(r(-2.0, -1.0).ln().is_none());
    }

    #[test]
    fn test_pow_general_positive_base() {
        let c = ctx();
        let p = r(1.0, 4.0).pow(&r(0.5, 0.5), &c).unwrap();
        assert!(p.contains(&Ext::Float(1.0)) && p.contains(&Ext::Float(2.0)));
    }

    #[test]
    fn test_sin_cos_full_period() {
        let s = r(0.0, 10.0).sin();
        assert_eq!(s.lo, Ext::int(-1));
        assert_eq!(s.hi, Ext::int(1));
        let c = Interval::entire().cos();
        assert_eq!(c.lo, Ext::int(-1));
        assert_eq!(c.hi, Ext::int(1));
    }

    #[test]
    fn test_sin_monotone_stretch() {
        // sin over [0.1, 1.0] is increasing, no extremum inside.
        let s = r(0.1, 1.0).sin();
        assert!(s.lo > Ext::zero());
        assert!(s.hi < Ext::int(1));
        assert!(s.contains(&Ext::Float(0.1_f64.sin())));
        assert!(s.contains(&Ext::Float(1.0_f64.sin())));
    }

    #[test]
    fn test_cos_contains_maximum() {
        let c = r(-0.5, 0.5).cos();
        assert_eq!(c.hi, Ext::int(1));
        assert!(c.lo < Ext::Float(0.88));
    }

    #[test]
    fn test_tan_pole_and_branch() {
        let t = r(1.0, 2.0).tan();
        // π/2 ∈ [1,2]: unbounded.
        assert_eq!(t.lo, Ext::NegInf);
        assert_eq!(t.hi, Ext::PosInf);
        let t = r(-0.5, 0.5).tan();
        assert!(t.lo < Ext::Float(-0.54) && t.hi > Ext::Float(0.54));
        assert!(t.lo > Ext::Float(-0.6) && t.hi < Ext::Float(0.6));
    }

    #[test]
    fn test_min_max_with() {
        let a = r(1.0, 5.0);
        let b = r(3.0, 7.0);
        let mn = a.min_with(&b);
        assert_eq!(mn.lo, Ext::Float(1.0));
        assert_eq!(mn.hi, Ext::Float(5.0));
        let mx = a.max_with(&b);
        assert_eq!(mx.lo, Ext::Float(3.0));
        assert_eq!(mx.hi, Ext::Float(7.0));
    }

    #[test]
    fn test_display() {
        let i = Interval::real(Ext::int(0), Ext::int(1));
        assert_eq!(i.to_string(), "real(0,1)");
        assert_eq!(Interval::boolean().to_string(), "integer(0,1)");
    }

    #[test]
    fn test_float_constant_widens() {
        let c = Interval::float_constant(0.1);
        assert!(c.lo < c.hi);
        assert!(c.contains(&Ext::Float(0.1)));
    }
}
