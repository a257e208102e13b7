//! Clover Math - Rounded Numerics and Interval Values
//!
//! This crate provides the numeric substrate for the Clover interval
//! constraint engine:
//! - A directed rounding kernel over IEEE 754 doubles ([`round`])
//! - Extended numbers mixing exact rationals, finite floats, and signed
//!   infinities ([`Ext`], [`NumCtx`])
//! - Interval values with sound outward-rounded arithmetic ([`Interval`])
//!
//! Everything here is pure value manipulation: no solver state, no
//! propagation. The guarantee exported to the engine is *enclosure
//! soundness* — for any operation `op` and intervals `X`, `Y`, every real
//! `op(x, y)` with `x ∈ X`, `y ∈ Y` lies in the computed result interval.
//!
//! # Examples
//!
//! ```
//! use clover_math::{Ext, Interval, NumCtx};
//!
//! let ctx = NumCtx::default();
//! let x = Interval::real(Ext::int(1), Ext::int(2));
//! let y = Interval::real(Ext::int(3), Ext::int(4));
//!
//! let sum = x.add(&y, &ctx);
//! assert!(sum.contains(&Ext::int(4)));
//! assert!(sum.contains(&Ext::int(6)));
//! ```
//!
//! Exact rationals survive arithmetic, so point intervals stay points:
//!
//! ```
//! use clover_math::{Ext, Interval, NumCtx};
//!
//! let ctx = NumCtx::default();
//! let third = Interval::point(Ext::Rat(num_rational::BigRational::new(
//!     1.into(),
//!     3.into(),
//! )));
//! let one = third.add(&third, &ctx).add(&third, &ctx);
//! assert!(one.is_point());
//! assert_eq!(one.lo, Ext::int(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ext;
pub mod interval;
pub mod round;

pub use ext::{Ext, NumCtx};
pub use interval::{integer_default_bound, real_default_bound, DomainKind, Interval};
