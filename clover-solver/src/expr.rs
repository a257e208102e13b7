//! Surface Expression Trees.
//!
//! Constraints are posted as [`Expr`] trees built from numbers, declared
//! variables, and the operator surface (+, −, ×, ÷, **, min, max, abs,
//! sqrt, exp, log, trig and inverse trig, comparisons, boolean
//! connectives). `std::ops` overloads and `From` conversions give the
//! natural notation; each comparison or connective produces a boolean
//! expression suitable for posting.
//!
//! ```
//! use clover_solver::Engine;
//!
//! let mut engine = Engine::new();
//! let x = engine.real_var();
//! let y = engine.real_var();
//! engine.post(&(x.expr() + 2 * y.expr()).eq(1)).unwrap();
//! ```

use crate::store::VarId;
use num_bigint::BigInt;
use num_rational::BigRational;

/// Unary operators of the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Absolute value.
    Abs,
    /// Principal square root.
    Sqrt,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Ln,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Arc sine (principal range).
    Asin,
    /// Arc cosine (principal range).
    Acos,
    /// Arc tangent (principal range).
    Atan,
    /// Boolean negation.
    Not,
}

/// Binary operators of the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a · b`
    Mul,
    /// `a / b`
    Div,
    /// `a ** b`
    Pow,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `a == b`
    Eq,
    /// `a ≠ b`
    Ne,
    /// `a ≤ b`
    Le,
    /// `a < b`
    Lt,
    /// `a ≥ b`
    Ge,
    /// `a > b`
    Gt,
    /// `a ⊆ b`
    In,
    /// `a ∧ b`
    And,
    /// `a ∨ b`
    Or,
    /// `¬(a ∧ b)`
    Nand,
    /// `¬(a ∨ b)`
    Nor,
    /// `a ⊕ b`
    Xor,
    /// `a → b`
    Imp,
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Exact rational constant; stays exact through compilation.
    Rat(BigRational),
    /// Float constant; widened one float outward at compile time.
    Float(f64),
    /// A declared interval variable.
    Var(VarId),
    /// Unary application.
    Unary(UnOp, Box<Expr>),
    /// Binary application.
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Integer constant.
    #[must_use]
    pub fn int(n: i64) -> Expr {
        Expr::Rat(BigRational::from_integer(BigInt::from(n)))
    }

    fn unary(op: UnOp, a: Expr) -> Expr {
        Expr::Unary(op, Box::new(a))
    }

    fn binary(op: BinOp, a: Expr, b: Expr) -> Expr {
        Expr::Binary(op, Box::new(a), Box::new(b))
    }

    /// `self ** other`.
    #[must_use]
    pub fn pow(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Pow, self, other.into())
    }

    /// `min(self, other)`.
    #[must_use]
    pub fn min(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Min, self, other.into())
    }

    /// `max(self, other)`.
    #[must_use]
    pub fn max(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Max, self, other.into())
    }

    /// `|self|`.
    #[must_use]
    pub fn abs(self) -> Expr {
        Expr::unary(UnOp::Abs, self)
    }

    /// `√self`.
    #[must_use]
    pub fn sqrt(self) -> Expr {
        Expr::unary(UnOp::Sqrt, self)
    }

    /// `e^self`.
    #[must_use]
    pub fn exp(self) -> Expr {
        Expr::unary(UnOp::Exp, self)
    }

    /// `ln self`.
    #[must_use]
    pub fn ln(self) -> Expr {
        Expr::unary(UnOp::Ln, self)
    }

    /// `sin self`.
    #[must_use]
    pub fn sin(self) -> Expr {
        Expr::unary(UnOp::Sin, self)
    }

    /// `cos self`.
    #[must_use]
    pub fn cos(self) -> Expr {
        Expr::unary(UnOp::Cos, self)
    }

    /// `tan self`.
    #[must_use]
    pub fn tan(self) -> Expr {
        Expr::unary(UnOp::Tan, self)
    }

    /// `asin self`.
    #[must_use]
    pub fn asin(self) -> Expr {
        Expr::unary(UnOp::Asin, self)
    }

    /// `acos self`.
    #[must_use]
    pub fn acos(self) -> Expr {
        Expr::unary(UnOp::Acos, self)
    }

    /// `atan self`.
    #[must_use]
    pub fn atan(self) -> Expr {
        Expr::unary(UnOp::Atan, self)
    }

    /// `self == other` (boolean).
    #[must_use]
    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Eq, self, other.into())
    }

    /// `self ≠ other` (boolean).
    #[must_use]
    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Ne, self, other.into())
    }

    /// `self ≤ other` (boolean).
    #[must_use]
    pub fn le(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Le, self, other.into())
    }

    /// `self < other` (boolean).
    #[must_use]
    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Lt, self, other.into())
    }

    /// `self ≥ other` (boolean).
    #[must_use]
    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Ge, self, other.into())
    }

    /// `self > other` (boolean).
    #[must_use]
    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Gt, self, other.into())
    }

    /// `self ⊆ other` (boolean): membership in the other's enclosure.
    #[must_use]
    pub fn subset_of(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::In, self, other.into())
    }

    /// `self ∧ other`.
    #[must_use]
    pub fn and(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::And, self, other.into())
    }

    /// `self ∨ other`.
    #[must_use]
    pub fn or(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Or, self, other.into())
    }

    /// `¬(self ∧ other)`.
    #[must_use]
    pub fn nand(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Nand, self, other.into())
    }

    /// `¬(self ∨ other)`.
    #[must_use]
    pub fn nor(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Nor, self, other.into())
    }

    /// `self ⊕ other`.
    #[must_use]
    pub fn xor(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Xor, self, other.into())
    }

    /// `self → other`.
    #[must_use]
    pub fn implies(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinOp::Imp, self, other.into())
    }

    /// `¬self`.
    #[must_use]
    pub fn not(self) -> Expr {
        Expr::unary(UnOp::Not, self)
    }

    /// Does this tree mention any variable?
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Expr::Rat(_) | Expr::Float(_) => true,
            Expr::Var(_) => false,
            Expr::Unary(_, a) => a.is_ground(),
            Expr::Binary(_, a, b) => a.is_ground() && b.is_ground(),
        }
    }

    /// Is the top-level operator boolean-valued?
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        match self {
            Expr::Var(_) => true,
            Expr::Unary(UnOp::Not, _) => true,
            Expr::Binary(op, _, _) => matches!(
                op,
                BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Le
                    | BinOp::Lt
                    | BinOp::Ge
                    | BinOp::Gt
                    | BinOp::In
                    | BinOp::And
                    | BinOp::Or
                    | BinOp::Nand
                    | BinOp::Nor
                    | BinOp::Xor
                    | BinOp::Imp
            ),
            _ => false,
        }
    }
}

impl VarId {
    /// Lift this variable into an expression.
    #[must_use]
    pub fn expr(self) -> Expr {
        Expr::Var(self)
    }
}

impl From<VarId> for Expr {
    fn from(v: VarId) -> Expr {
        Expr::Var(v)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Expr {
        Expr::int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Expr {
        Expr::int(i64::from(n))
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Expr {
        Expr::Float(f)
    }
}

impl From<BigRational> for Expr {
    fn from(r: BigRational) -> Expr {
        Expr::Rat(r)
    }
}

impl<T: Into<Expr>> std::ops::Add<T> for Expr {
    type Output = Expr;
    fn add(self, rhs: T) -> Expr {
        Expr::binary(BinOp::Add, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Sub<T> for Expr {
    type Output = Expr;
    fn sub(self, rhs: T) -> Expr {
        Expr::binary(BinOp::Sub, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Mul<T> for Expr {
    type Output = Expr;
    fn mul(self, rhs: T) -> Expr {
        Expr::binary(BinOp::Mul, self, rhs.into())
    }
}

impl<T: Into<Expr>> std::ops::Div<T> for Expr {
    type Output = Expr;
    fn div(self, rhs: T) -> Expr {
        Expr::binary(BinOp::Div, self, rhs.into())
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnOp::Neg, self)
    }
}

impl std::ops::Add<Expr> for i64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Add, Expr::int(self), rhs)
    }
}

impl std::ops::Sub<Expr> for i64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Sub, Expr::int(self), rhs)
    }
}

impl std::ops::Mul<Expr> for i64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mul, Expr::int(self), rhs)
    }
}

impl std::ops::Mul<Expr> for i32 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mul, Expr::int(i64::from(self)), rhs)
    }
}
