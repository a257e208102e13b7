//! Constraint Nodes and Primitive Operators.
//!
//! A node is one primitive constraint instance: an operator plus a fixed
//! vector of 1–3 operand intervals. Nodes sit on the watcher list of each of
//! their operands; the scheduler re-fires them when an operand narrows.
//! Literal operands are compiled to constant point intervals, so the operand
//! vector is uniformly interval ids and `(op, args)` structural equality
//! doubles as the duplicate-suppression key.

use smallvec::SmallVec;
use std::fmt;

/// Index of an interval record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(pub u32);

/// Index of a constraint node in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Primitive operator of a node.
///
/// Ternary arithmetic relations are written result-first: `Add(z,x,y)`
/// relates `z = x + y`. Comparisons and connectives are reified with a
/// boolean first operand: `Eq(b,x,y)` relates `b = (x == y)`. Subtraction,
/// division, logarithms, and inverse trig have no nodes of their own — the
/// compiler rewrites them to these primitives with operands rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `z = x + y`
    Add,
    /// `z = x · y`
    Mul,
    /// `z = min(x, y)`
    Min,
    /// `z = max(x, y)`
    Max,
    /// `z = x ** y`
    Pow,
    /// `b = (x == y)`
    Eq,
    /// `b = (x ≠ y)`
    Ne,
    /// `b = (x ≤ y)`
    Le,
    /// `b = (x < y)`
    Lt,
    /// `b = (x ⊆ y)` — membership of x in the enclosure of y
    In,
    /// `z = x ∧ y`
    And,
    /// `z = x ∨ y`
    Or,
    /// `z = ¬(x ∧ y)`
    Nand,
    /// `z = ¬(x ∨ y)`
    Nor,
    /// `z = x ⊕ y`
    Xor,
    /// `z = (x → y)`
    ImB,
    /// `z = ¬x`
    Not,
    /// `z = −x`
    Minus,
    /// `z = |x|`
    Abs,
    /// `z = eˣ`
    Exp,
    /// `z = sin x`
    Sin,
    /// `z = cos x`
    Cos,
    /// `z = tan x`
    Tan,
    /// `z = √x` (principal branch)
    Sqrt,
    /// `x ∈ ℤ` — integrality coercion
    Integral,
}

impl Op {
    /// Number of operands the operator takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Op::Add
            | Op::Mul
            | Op::Min
            | Op::Max
            | Op::Pow
            | Op::Eq
            | Op::Ne
            | Op::Le
            | Op::Lt
            | Op::In
            | Op::And
            | Op::Or
            | Op::Nand
            | Op::Nor
            | Op::Xor
            | Op::ImB => 3,
            Op::Not
            | Op::Minus
            | Op::Abs
            | Op::Exp
            | Op::Sin
            | Op::Cos
            | Op::Tan
            | Op::Sqrt => 2,
            Op::Integral => 1,
        }
    }

    /// Does the first operand carry a boolean (0,1) value?
    #[must_use]
    pub fn is_reified(self) -> bool {
        matches!(self, Op::Eq | Op::Ne | Op::Le | Op::Lt | Op::In)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Add => "add",
            Op::Mul => "mul",
            Op::Min => "min",
            Op::Max => "max",
            Op::Pow => "pow",
            Op::Eq => "eq",
            Op::Ne => "ne",
            Op::Le => "le",
            Op::Lt => "lt",
            Op::In => "in",
            Op::And => "and",
            Op::Or => "or",
            Op::Nand => "nand",
            Op::Nor => "nor",
            Op::Xor => "xor",
            Op::ImB => "imB",
            Op::Not => "not",
            Op::Minus => "minus",
            Op::Abs => "abs",
            Op::Exp => "exp",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Sqrt => "sqrt",
            Op::Integral => "integral",
        };
        write!(f, "{name}")
    }
}

/// Operand vector; arity is at most 3.
pub type Args = SmallVec<[IntervalId; 3]>;

/// One primitive constraint instance.
#[derive(Debug, Clone)]
pub struct Node {
    /// The primitive operator.
    pub op: Op,
    /// Operand interval ids, result-first.
    pub args: Args,
    /// Is the node currently on the agenda?
    pub linked: bool,
    /// Can the node never narrow anything again? Set by the contractor;
    /// the node is unhooked from watcher lists on next encounter.
    pub persistent: bool,
}

impl Node {
    /// Create an unlinked, non-persistent node.
    #[must_use]
    pub fn new(op: Op, args: Args) -> Self {
        debug_assert_eq!(args.len(), op.arity());
        Self {
            op,
            args,
            linked: false,
            persistent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_arity() {
        assert_eq!(Op::Add.arity(), 3);
        assert_eq!(Op::Not.arity(), 2);
        assert_eq!(Op::Integral.arity(), 1);
    }

    #[test]
    fn test_reified() {
        assert!(Op::Eq.is_reified());
        assert!(Op::Lt.is_reified());
        assert!(!Op::Add.is_reified());
        assert!(!Op::And.is_reified());
    }

    #[test]
    fn test_node_new() {
        let n = Node::new(Op::Minus, smallvec![IntervalId(0), IntervalId(1)]);
        assert!(!n.linked);
        assert!(!n.persistent);
        assert_eq!(n.op.to_string(), "minus");
    }
}
