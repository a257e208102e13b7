//! Clover - Constraint Logic Programming over Intervals
//!
//! Clover narrows interval-valued variables (booleans, integers, reals) to
//! sound enclosures under arithmetic and logical constraints, by running an
//! AC-3-style fixed-point propagation of primitive interval relations, and
//! layers split-based search on top:
//! - Trailed interval store with full backtrack restoration ([`store`])
//! - Primitive relation contractors ([`relations`])
//! - Constraint compiler with an algebraic simplifier ([`compile`],
//!   [`simplify`])
//! - FIFO agenda with work throttling ([`agenda`])
//! - Variable-binding hook ([`bind`])
//! - Search operators: solve, splitsolve, absolve, enumerate, global
//!   optimisation ([`Engine`] methods)
//! - Symbolic partial differentiation ([`deriv`])
//!
//! The guarantee is *enclosure soundness*: no real solution of the posted
//! constraints is ever pruned from a variable's interval. Point convergence
//! is not guaranteed; fixed points are reached up to the tolerance of
//! representable floats and the configured work budget.
//!
//! # Examples
//!
//! Propagation alone solves well-conditioned linear systems:
//!
//! ```
//! use clover_solver::Engine;
//!
//! let mut engine = Engine::new();
//! let x = engine.real_var();
//! let y = engine.real_var();
//!
//! engine.post(&(x.expr() + 2 * y.expr()).eq(1)).unwrap();
//! engine.post(&(x.expr() - y.expr()).eq(1)).unwrap();
//!
//! let (lo, hi) = engine.range(x);
//! assert!(lo.to_f64_lo() > 0.999_999);
//! assert!(hi.to_f64_hi() < 1.000_001);
//! ```
//!
//! Integer domains are labelled with `enumerate`:
//!
//! ```
//! use clover_math::Ext;
//! use clover_solver::Engine;
//!
//! let mut engine = Engine::new();
//! let x = engine.int_var_in(Ext::int(1), Ext::int(4)).unwrap();
//! let y = engine.int_var_in(Ext::int(1), Ext::int(4)).unwrap();
//! engine.post(&(x.expr() * y.expr()).eq(6)).unwrap();
//!
//! let solutions = engine.enumerate_collect(&[x, y]).unwrap();
//! assert_eq!(solutions.len(), 2); // (2,3) and (3,2)
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod agenda;
pub mod bind;
pub mod compile;
pub mod config;
pub mod deriv;
pub mod engine;
pub mod error;
pub mod expr;
pub mod node;
pub mod relations;
pub mod search;
pub mod simplify;
pub mod stats;
pub mod store;

pub use config::Config;
pub use deriv::partial_derivative;
pub use engine::Engine;
pub use error::{Result, SolverError};
pub use expr::{BinOp, Expr, UnOp};
pub use node::{IntervalId, NodeId, Op};
pub use stats::{StatKind, Stats};
pub use store::{Mark, Narrowed, VarId, WatchAction};

pub use clover_math::{DomainKind, Ext, Interval, NumCtx};
