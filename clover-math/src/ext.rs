//! Extended Numbers: Rationals, Finite Floats, and Signed Infinities.
//!
//! Interval bounds are extended reals. A bound is either an exact rational
//! (`BigRational`), a finite IEEE 754 double, or one of the two infinities.
//! Exact rationals are kept exact through arithmetic until their size exceeds
//! a configurable bit budget, at which point they degrade to an
//! outward-rounded float. Every finite float is exactly representable as a
//! rational, so cross-representation comparisons are exact.
//!
//! Directed arithmetic lives on [`NumCtx`], which carries the rational size
//! budget: `*_lo` methods return a bound less than or equal to the true
//! result, `*_hi` methods one greater than or equal to it.

use crate::round;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// An extended real: −∞, an exact rational, a finite float, or +∞.
#[derive(Clone, Debug)]
pub enum Ext {
    /// Negative infinity.
    NegInf,
    /// An exact rational value.
    Rat(BigRational),
    /// A finite (non-NaN) double.
    Float(f64),
    /// Positive infinity.
    PosInf,
}

impl Ext {
    /// The exact rational zero.
    #[must_use]
    pub fn zero() -> Self {
        Ext::Rat(BigRational::zero())
    }

    /// An exact integer bound.
    #[must_use]
    pub fn int(n: i64) -> Self {
        Ext::Rat(BigRational::from_integer(BigInt::from(n)))
    }

    /// An exact rational bound.
    #[must_use]
    pub fn rat(r: BigRational) -> Self {
        Ext::Rat(r)
    }

    /// Classify a float as a bound. NaN is rejected with `None`.
    #[must_use]
    pub fn from_f64(x: f64) -> Option<Self> {
        if x.is_nan() {
            None
        } else if x == f64::INFINITY {
            Some(Ext::PosInf)
        } else if x == f64::NEG_INFINITY {
            Some(Ext::NegInf)
        } else {
            Some(Ext::Float(x))
        }
    }

    /// Classify a float as a lower bound; NaN clamps to −∞.
    #[must_use]
    pub fn from_f64_lo(x: f64) -> Self {
        Ext::from_f64(x).unwrap_or(Ext::NegInf)
    }

    /// Classify a float as an upper bound; NaN clamps to +∞.
    #[must_use]
    pub fn from_f64_hi(x: f64) -> Self {
        Ext::from_f64(x).unwrap_or(Ext::PosInf)
    }

    /// Is this bound finite (rational or float)?
    #[must_use]
    pub fn is_finite(&self) -> bool {
        matches!(self, Ext::Rat(_) | Ext::Float(_))
    }

    /// Is this bound exactly zero?
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Ext::Rat(r) => r.is_zero(),
            Ext::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    /// Is this bound a mathematical integer (infinities excluded)?
    #[must_use]
    pub fn is_integer(&self) -> bool {
        match self {
            Ext::Rat(r) => r.is_integer(),
            Ext::Float(f) => f.fract() == 0.0,
            _ => false,
        }
    }

    /// The exact rational value, if finite.
    #[must_use]
    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            Ext::Rat(r) => Some(r.clone()),
            Ext::Float(f) => BigRational::from_float(*f),
            _ => None,
        }
    }

    /// A float less than or equal to this bound.
    #[must_use]
    pub fn to_f64_lo(&self) -> f64 {
        match self {
            Ext::NegInf => f64::NEG_INFINITY,
            Ext::PosInf => f64::INFINITY,
            Ext::Float(f) => *f,
            Ext::Rat(r) => rat_to_f64_lo(r),
        }
    }

    /// A float greater than or equal to this bound.
    #[must_use]
    pub fn to_f64_hi(&self) -> f64 {
        match self {
            Ext::NegInf => f64::NEG_INFINITY,
            Ext::PosInf => f64::INFINITY,
            Ext::Float(f) => *f,
            Ext::Rat(r) => rat_to_f64_hi(r),
        }
    }

    /// Exact negation.
    #[must_use]
    pub fn neg(&self) -> Ext {
        match self {
            Ext::NegInf => Ext::PosInf,
            Ext::PosInf => Ext::NegInf,
            Ext::Rat(r) => Ext::Rat(-r),
            Ext::Float(f) => Ext::Float(-f),
        }
    }

    /// Exact absolute value.
    #[must_use]
    pub fn abs(&self) -> Ext {
        match self {
            Ext::NegInf | Ext::PosInf => Ext::PosInf,
            Ext::Rat(r) => Ext::Rat(r.abs()),
            Ext::Float(f) => Ext::Float(f.abs()),
        }
    }

    /// Sign of the bound: -1, 0, or 1.
    #[must_use]
    pub fn signum(&self) -> i32 {
        match self {
            Ext::NegInf => -1,
            Ext::PosInf => 1,
            Ext::Rat(r) => {
                if r.is_zero() {
                    0
                } else if r.is_positive() {
                    1
                } else {
                    -1
                }
            }
            Ext::Float(f) => {
                if *f == 0.0 {
                    0
                } else if *f > 0.0 {
                    1
                } else {
                    -1
                }
            }
        }
    }

    /// Smallest integer bound ≥ self. Exact; infinities are fixed points.
    #[must_use]
    pub fn ceil_int(&self) -> Ext {
        match self {
            Ext::NegInf => Ext::NegInf,
            Ext::PosInf => Ext::PosInf,
            Ext::Rat(r) => Ext::Rat(r.ceil()),
            Ext::Float(f) => match BigRational::from_float(*f) {
                Some(r) => Ext::Rat(r.ceil()),
                None => Ext::PosInf,
            },
        }
    }

    /// Largest integer bound ≤ self. Exact; infinities are fixed points.
    #[must_use]
    pub fn floor_int(&self) -> Ext {
        match self {
            Ext::NegInf => Ext::NegInf,
            Ext::PosInf => Ext::PosInf,
            Ext::Rat(r) => Ext::Rat(r.floor()),
            Ext::Float(f) => match BigRational::from_float(*f) {
                Some(r) => Ext::Rat(r.floor()),
                None => Ext::NegInf,
            },
        }
    }
}

impl PartialEq for Ext {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ext {}

impl PartialOrd for Ext {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ext {
    fn cmp(&self, other: &Self) -> Ordering {
        use Ext::{Float, NegInf, PosInf, Rat};
        match (self, other) {
            (NegInf, NegInf) | (PosInf, PosInf) => Ordering::Equal,
            (NegInf, _) | (_, PosInf) => Ordering::Less,
            (_, NegInf) | (PosInf, _) => Ordering::Greater,
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Rat(a), Rat(b)) => a.cmp(b),
            // Every finite float is exactly a rational, so this is exact.
            (Rat(a), Float(b)) => match BigRational::from_float(*b) {
                Some(rb) => a.cmp(&rb),
                None => Ordering::Less,
            },
            (Float(a), Rat(b)) => match BigRational::from_float(*a) {
                Some(ra) => ra.cmp(b),
                None => Ordering::Greater,
            },
        }
    }
}

impl fmt::Display for Ext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ext::NegInf => write!(f, "-inf"),
            Ext::PosInf => write!(f, "inf"),
            Ext::Float(x) => write!(f, "{x}"),
            Ext::Rat(r) => {
                if r.is_integer() {
                    write!(f, "{}", r.numer())
                } else {
                    write!(f, "{}/{}", r.numer(), r.denom())
                }
            }
        }
    }
}

/// Convert a rational to a float ≤ it, with outward rounding when inexact.
fn rat_to_f64_lo(r: &BigRational) -> f64 {
    let mut f = r.to_f64().unwrap_or(f64::NEG_INFINITY);
    if f == f64::INFINITY {
        f = f64::MAX;
    }
    if f.is_nan() {
        return f64::NEG_INFINITY;
    }
    // Correct downward until f ≤ r, then tighten back up while still ≤ r.
    let mut guard = 0;
    while guard < 8 && float_cmp_rat(f, r) == Ordering::Greater {
        f = round::next_down(f);
        guard += 1;
    }
    if float_cmp_rat(f, r) == Ordering::Greater {
        return f64::NEG_INFINITY;
    }
    let mut guard = 0;
    while guard < 4 {
        let up = round::next_up(f);
        if up.is_finite() && float_cmp_rat(up, r) != Ordering::Greater {
            f = up;
            guard += 1;
        } else {
            break;
        }
    }
    f
}

/// Convert a rational to a float ≥ it, with outward rounding when inexact.
fn rat_to_f64_hi(r: &BigRational) -> f64 {
    let mut f = r.to_f64().unwrap_or(f64::INFINITY);
    if f == f64::NEG_INFINITY {
        f = -f64::MAX;
    }
    if f.is_nan() {
        return f64::INFINITY;
    }
    let mut guard = 0;
    while guard < 8 && float_cmp_rat(f, r) == Ordering::Less {
        f = round::next_up(f);
        guard += 1;
    }
    if float_cmp_rat(f, r) == Ordering::Less {
        return f64::INFINITY;
    }
    let mut guard = 0;
    while guard < 4 {
        let down = round::next_down(f);
        if down.is_finite() && float_cmp_rat(down, r) != Ordering::Less {
            f = down;
            guard += 1;
        } else {
            break;
        }
    }
    f
}

fn float_cmp_rat(f: f64, r: &BigRational) -> Ordering {
    if f == f64::INFINITY {
        return Ordering::Greater;
    }
    if f == f64::NEG_INFINITY {
        return Ordering::Less;
    }
    match BigRational::from_float(f) {
        Some(rf) => rf.cmp(r),
        None => Ordering::Equal,
    }
}

/// Directed arithmetic over extended numbers.
///
/// Carries the rational size budget: exact results whose numerator plus
/// denominator exceed `max_rational_bits` bits degrade to an outward-rounded
/// float in the requested direction.
#[derive(Debug, Clone)]
pub struct NumCtx {
    /// Bit budget (numerator bits + denominator bits) for exact rationals.
    pub max_rational_bits: u64,
}

impl Default for NumCtx {
    fn default() -> Self {
        Self {
            max_rational_bits: 512,
        }
    }
}

impl NumCtx {
    /// Create a context with a specific rational bit budget.
    #[must_use]
    pub fn new(max_rational_bits: u64) -> Self {
        Self { max_rational_bits }
    }

    fn demote_lo(&self, r: BigRational) -> Ext {
        if r.numer().bits() + r.denom().bits() > self.max_rational_bits {
            Ext::from_f64_lo(rat_to_f64_lo(&r))
        } else {
            Ext::Rat(r)
        }
    }

    fn demote_hi(&self, r: BigRational) -> Ext {
        if r.numer().bits() + r.denom().bits() > self.max_rational_bits {
            Ext::from_f64_hi(rat_to_f64_hi(&r))
        } else {
            Ext::Rat(r)
        }
    }

    /// Lower bound of `a + b`.
    #[must_use]
    pub fn add_lo(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::NegInf, _) | (_, Ext::NegInf) => Ext::NegInf,
            (Ext::PosInf, _) | (_, Ext::PosInf) => Ext::PosInf,
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_lo(ra + rb),
            _ => Ext::from_f64_lo(round::add_lo(a.to_f64_lo(), b.to_f64_lo())),
        }
    }

    /// Upper bound of `a + b`.
    #[must_use]
    pub fn add_hi(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::PosInf, _) | (_, Ext::PosInf) => Ext::PosInf,
            (Ext::NegInf, _) | (_, Ext::NegInf) => Ext::NegInf,
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_hi(ra + rb),
            _ => Ext::from_f64_hi(round::add_hi(a.to_f64_hi(), b.to_f64_hi())),
        }
    }

    /// Lower bound of `a - b`.
    #[must_use]
    pub fn sub_lo(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::NegInf, _) | (_, Ext::PosInf) => Ext::NegInf,
            (Ext::PosInf, _) | (_, Ext::NegInf) => Ext::PosInf,
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_lo(ra - rb),
            _ => Ext::from_f64_lo(round::sub_lo(a.to_f64_lo(), b.to_f64_hi())),
        }
    }

    /// Upper bound of `a - b`.
    #[must_use]
    pub fn sub_hi(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::PosInf, _) | (_, Ext::NegInf) => Ext::PosInf,
            (Ext::NegInf, _) | (_, Ext::PosInf) => Ext::NegInf,
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_hi(ra - rb),
            _ => Ext::from_f64_hi(round::sub_hi(a.to_f64_hi(), b.to_f64_lo())),
        }
    }

    /// Lower bound of `a · b`. `0 · ±∞` clamps to −∞ here; interval-level
    /// code resolves those corners to 0 before calling.
    #[must_use]
    pub fn mul_lo(&self, a: &Ext, b: &Ext) -> Ext {
        // Exact annihilation only when the other factor is finite.
        if (a.is_zero() && b.is_finite()) || (b.is_zero() && a.is_finite()) {
            return Ext::zero();
        }
        match (a, b) {
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_lo(ra * rb),
            _ => Ext::from_f64_lo(corner_lo(a, b, round::mul_lo)),
        }
    }

    /// Upper bound of `a · b`.
    #[must_use]
    pub fn mul_hi(&self, a: &Ext, b: &Ext) -> Ext {
        if (a.is_zero() && b.is_finite()) || (b.is_zero() && a.is_finite()) {
            return Ext::zero();
        }
        match (a, b) {
            (Ext::Rat(ra), Ext::Rat(rb)) => self.demote_hi(ra * rb),
            _ => Ext::from_f64_hi(corner_hi(a, b, round::mul_hi)),
        }
    }

    /// Lower bound of `a / b`. Division by exact zero clamps to −∞;
    /// interval-level code handles zero-spanning divisors before calling.
    #[must_use]
    pub fn div_lo(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::Rat(ra), Ext::Rat(rb)) => {
                if rb.is_zero() {
                    Ext::NegInf
                } else {
                    self.demote_lo(ra / rb)
                }
            }
            _ => Ext::from_f64_lo(corner_lo(a, b, round::div_lo)),
        }
    }

    /// Upper bound of `a / b`.
    #[must_use]
    pub fn div_hi(&self, a: &Ext, b: &Ext) -> Ext {
        match (a, b) {
            (Ext::Rat(ra), Ext::Rat(rb)) => {
                if rb.is_zero() {
                    Ext::PosInf
                } else {
                    self.demote_hi(ra / rb)
                }
            }
            _ => Ext::from_f64_hi(corner_hi(a, b, round::div_hi)),
        }
    }
}

/// Minimum of `op` over the four corners of the float brackets of `a`, `b`.
///
/// The float brackets `[to_f64_lo, to_f64_hi]` enclose each operand, so the
/// corner minimum bounds the true result from below. NaN corners (0·∞, 0/0)
/// clamp to −∞.
fn corner_lo(a: &Ext, b: &Ext, op: fn(f64, f64) -> f64) -> f64 {
    let (al, ah) = (a.to_f64_lo(), a.to_f64_hi());
    let (bl, bh) = (b.to_f64_lo(), b.to_f64_hi());
    let mut m = f64::INFINITY;
    for x in [al, ah] {
        for y in [bl, bh] {
            let v = op(x, y);
            let v = if v.is_nan() { f64::NEG_INFINITY } else { v };
            m = m.min(v);
        }
    }
    m
}

/// Maximum of `op` over the four corners; NaN corners clamp to +∞.
fn corner_hi(a: &Ext, b: &Ext, op: fn(f64, f64) -> f64) -> f64 {
    let (al, ah) = (a.to_f64_lo(), a.to_f64_hi());
    let (bl, bh) = (b.to_f64_lo(), b.to_f64_hi());
    let mut m = f64::NEG_INFINITY;
    for x in [al, ah] {
        for y in [bl, bh] {
            let v = op(x, y);
            let v = if v.is_nan() { f64::INFINITY } else { v };
            m = m.max(v);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    fn rat(n: i64, d: i64) -> Ext {
        Ext::Rat(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    #[test]
    fn test_ordering_across_representations() {
        assert_eq!(Ext::int(1), Ext::Float(1.0));
        assert!(rat(1, 3) < Ext::Float(0.34));
        assert!(rat(1, 3) > Ext::Float(0.33));
        assert!(Ext::NegInf < Ext::int(i64::MIN));
        assert!(Ext::PosInf > Ext::Float(f64::MAX));
    }

    #[test]
    fn test_exact_rational_addition() {
        let ctx = NumCtx::default();
        let third = rat(1, 3);
        let sum = ctx.add_lo(&third, &third);
        assert_eq!(sum, rat(2, 3));
        assert_eq!(ctx.add_hi(&third, &third), rat(2, 3));
    }

    #[test]
    fn test_float_addition_widens() {
        let ctx = NumCtx::default();
        let a = Ext::Float(0.1);
        let b = Ext::Float(0.2);
        let lo = ctx.add_lo(&a, &b);
        let hi = ctx.add_hi(&a, &b);
        assert!(lo < hi);
        assert!(lo <= Ext::Float(0.3));
        assert!(hi >= Ext::Float(0.3));
    }

    #[test]
    fn test_rat_to_float_outward() {
        let third = BigRational::new(BigInt::from(1), BigInt::from(3));
        let lo = rat_to_f64_lo(&third);
        let hi = rat_to_f64_hi(&third);
        assert!(lo < hi);
        assert_eq!(float_cmp_rat(lo, &third), Ordering::Less);
        assert_eq!(float_cmp_rat(hi, &third), Ordering::Greater);
        // Exactly representable rationals convert without widening.
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(rat_to_f64_lo(&half), 0.5);
        assert_eq!(rat_to_f64_hi(&half), 0.5);
    }

    #[test]
    fn test_demotion_after_budget() {
        let ctx = NumCtx::new(16);
        let big = Ext::Rat(BigRational::new(
            BigInt::from(1_000_003_i64),
            BigInt::from(999_983_i64),
        ));
        let sum = ctx.mul_lo(&big, &big);
        assert!(matches!(sum, Ext::Float(_)));
    }

    #[test]
    fn test_infinite_arithmetic() {
        let ctx = NumCtx::default();
        assert_eq!(ctx.add_lo(&Ext::NegInf, &Ext::int(5)), Ext::NegInf);
        assert_eq!(ctx.add_hi(&Ext::PosInf, &Ext::int(-5)), Ext::PosInf);
        // ∞ − ∞ is unbounded in both directions.
        assert_eq!(ctx.sub_lo(&Ext::PosInf, &Ext::PosInf), Ext::NegInf);
        assert_eq!(ctx.sub_hi(&Ext::PosInf, &Ext::PosInf), Ext::PosInf);
    }

    #[test]
    fn test_division_exact_and_by_zero() {
        let ctx = NumCtx::default();
        assert_eq!(ctx.div_lo(&Ext::int(1), &Ext::int(3)), rat(1, 3));
        assert_eq!(ctx.div_lo(&Ext::int(1), &Ext::zero()), Ext::NegInf);
        assert_eq!(ctx.div_hi(&Ext::int(1), &Ext::zero()), Ext::PosInf);
    }

    #[test]
    fn test_ceil_floor_exact() {
        assert_eq!(rat(7, 2).ceil_int(), Ext::int(4));
        assert_eq!(rat(7, 2).floor_int(), Ext::int(3));
        assert_eq!(rat(-7, 2).ceil_int(), Ext::int(-3));
        assert_eq!(rat(-7, 2).floor_int(), Ext::int(-4));
        assert_eq!(Ext::Float(2.5).ceil_int(), Ext::int(3));
        assert_eq!(Ext::PosInf.floor_int(), Ext::PosInf);
    }

    #[test]
    fn test_neg_abs_signum() {
        assert_eq!(rat(-3, 2).neg(), rat(3, 2));
        assert_eq!(rat(-3, 2).abs(), rat(3, 2));
        assert_eq!(Ext::NegInf.abs(), Ext::PosInf);
        assert_eq!(rat(-1, 2).signum(), -1);
        assert_eq!(Ext::zero().signum(), 0);
        assert_eq!(Ext::Float(0.5).signum(), 1);
    }

    #[test]
    fn test_as_rational_exact_float() {
        let r = Ext::Float(0.5).as_rational().unwrap();
        assert_eq!(r, BigRational::new(BigInt::one(), BigInt::from(2)));
        assert!(Ext::PosInf.as_rational().is_none());
    }
}
