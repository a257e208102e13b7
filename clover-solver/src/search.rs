//! Search Layer: Splitting, Labelling, Optimisation.
//!
//! Every operator here drives explicit choice points through trail marks
//! and calls back into the propagation scheduler between steps:
//!
//! - [`Engine::enumerate`] — integer labelling, smallest value first.
//! - [`Engine::splitsolve`] — plain midpoint bisection until all targets
//!   are small.
//! - [`Engine::solve`] — bisection at a point chosen slightly off the
//!   midpoint so exact-midpoint solutions are not enumerated by both
//!   branches; integer domains split exclusively through inward rounding.
//! - [`Engine::absolve`] — bound nibbling at both ends; interior solutions
//!   are not enumerated.
//! - [`Engine::global_minimum`] / [`Engine::global_maximum`] — branch and
//!   bound on the widest target with an incumbent bound kept outside the
//!   trail (committed to the objective with the untrailed write at the
//!   end).
//!
//! Solutions are reported through a visitor (`FnMut(&Engine) -> bool`,
//! return `false` to stop the search); `*_collect` conveniences snapshot
//! the target ranges.

use crate::agenda;
use crate::engine::Engine;
use crate::error::{Result, SolverError};
use crate::expr::Expr;
use crate::store::{Narrowed, VarId};
use clover_math::{DomainKind, Ext, Interval};
use num_bigint::BigInt;
use num_rational::BigRational;

/// Deterministic off-midpoint factor for real splits: a point very
/// unlikely to coincide with a solution or with a later split of a
/// neighbouring box.
const SPLIT_JITTER: f64 = 0.543_191_010_824_239_8;

/// Did the search run to completion or stop early?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Continue,
    Stop,
}

impl Engine {
    /// `enumerate(Vs)`: label each integer variable with each value of its
    /// domain, smallest first, propagating between bindings.
    pub fn enumerate(
        &mut self,
        vars: &[VarId],
        visit: &mut dyn FnMut(&Engine) -> bool,
    ) -> Result<()> {
        for &v in vars {
            if self.domain(v).kind != DomainKind::Integer {
                return Err(SolverError::TypeError(
                    "enumerate requires integer variables".into(),
                ));
            }
        }
        self.enumerate_rec(vars, visit)?;
        Ok(())
    }

    fn enumerate_rec(
        &mut self,
        vars: &[VarId],
        visit: &mut dyn FnMut(&Engine) -> bool,
    ) -> Result<Walk> {
        let Some(&v) = vars.iter().find(|&&v| !self.domain(v).is_point()) else {
            return Ok(if visit(self) { Walk::Continue } else { Walk::Stop });
        };
        let (lo, hi) = self.range(v);
        let (Some(mut n), Some(end)) = (bound_to_int(&lo), bound_to_int(&hi)) else {
            return Err(SolverError::TypeError(
                "enumerate requires finite integer domains".into(),
            ));
        };
        while n <= end {
            let mark = self.mark();
            let value = BigRational::from_integer(n.clone());
            let attempt = self
                .bind(v, &value)
                .and_then(|()| self.enumerate_rec(vars, visit));
            match attempt {
                Ok(Walk::Stop) => {
                    self.undo_to(mark);
                    return Ok(Walk::Stop);
                }
                Ok(Walk::Continue) | Err(SolverError::Inconsistent) => {
                    self.undo_to(mark);
                }
                Err(e) => {
                    self.undo_to(mark);
                    return Err(e);
                }
            }
            n += BigInt::from(1);
        }
        Ok(Walk::Continue)
    }

    /// `splitsolve(Vs)`: plain midpoint bisection until every target is
    /// small at the configured precision.
    pub fn splitsolve(
        &mut self,
        vars: &[VarId],
        visit: &mut dyn FnMut(&Engine) -> bool,
    ) -> Result<()> {
        self.split_rec(vars, false, visit)?;
        Ok(())
    }

    /// `solve(Vs)`: bisection with the split point chosen slightly off the
    /// midpoint, so a solution sitting exactly on a midpoint is not found
    /// twice.
    pub fn solve(
        &mut self,
        vars: &[VarId],
        visit: &mut dyn FnMut(&Engine) -> bool,
    ) -> Result<()> {
        self.split_rec(vars, true, visit)?;
        Ok(())
    }

    /// Collect `solve` solutions as per-variable bound snapshots.
    pub fn solve_collect(&mut self, vars: &[VarId]) -> Result<Vec<Vec<(Ext, Ext)>>> {
        let mut out = Vec::new();
        self.solve(vars, &mut |e| {
            out.push(vars.iter().map(|&v| e.range(v)).collect());
            true
        })?;
        Ok(out)
    }

    /// Collect `enumerate` solutions as exact value vectors.
    pub fn enumerate_collect(&mut self, vars: &[VarId]) -> Result<Vec<Vec<BigRational>>> {
        let mut out = Vec::new();
        self.enumerate(vars, &mut |e| {
            out.push(
                vars.iter()
                    .filter_map(|&v| e.value(v))
                    .collect::<Vec<_>>(),
            );
            true
        })?;
        Ok(out)
    }

    fn split_rec(
        &mut self,
        vars: &[VarId],
        jitter: bool,
        visit: &mut dyn FnMut(&Engine) -> bool,
    ) -> Result<Walk> {
        let unsolved = vars.iter().copied().find(|&v| {
            let d = self.domain(v);
            match d.kind {
                DomainKind::Integer => !d.is_point(),
                DomainKind::Real => !self.store.is_small(v.0),
            }
        });
        let Some(v) = unsolved else {
            return Ok(if visit(self) { Walk::Continue } else { Walk::Stop });
        };
        let (left, right) = self.split_branches(v, jitter);
        for half in [left, right] {
            let mark = self.mark();
            let attempt = self
                .narrow_branch(v, &half)
                .and_then(|()| self.split_rec(vars, jitter, visit));
            match attempt {
                Ok(Walk::Stop) => {
                    self.undo_to(mark);
                    return Ok(Walk::Stop);
                }
                Ok(Walk::Continue) | Err(SolverError::Inconsistent) => {
                    self.undo_to(mark);
                }
                Err(e) => {
                    self.undo_to(mark);
                    return Err(e);
                }
            }
        }
        Ok(Walk::Continue)
    }

    /// The two half-domains of a split on `v`.
    fn split_branches(&self, v: VarId, jitter: bool) -> (Interval, Interval) {
        let d = self.domain(v);
        let m = match d.kind {
            // Integer midpoints split exclusively through inward rounding:
            // ≤ 9/2 becomes ≤ 4, ≥ 9/2 becomes ≥ 5.
            DomainKind::Integer => d.midpoint(),
            DomainKind::Real => {
                let lo = d.lo.to_f64_hi();
                let hi = d.hi.to_f64_lo();
                let f = if jitter { SPLIT_JITTER } else { 0.5 };
                let mut m = if lo.is_finite() && hi.is_finite() {
                    lo + (hi - lo) * f
                } else {
                    d.midpoint().to_f64_lo()
                };
                if !(m > lo && m < hi) {
                    m = d.midpoint().to_f64_lo();
                }
                Ext::Float(m.clamp(lo, hi))
            }
        };
        let left = Interval {
            lo: Ext::NegInf,
            hi: m.clone(),
            kind: DomainKind::Real,
        };
        let right = Interval {
            lo: m,
            hi: Ext::PosInf,
            kind: DomainKind::Real,
        };
        (left, right)
    }

    /// Narrow `v` into one half and propagate.
    fn narrow_branch(&mut self, v: VarId, half: &Interval) -> Result<()> {
        if let Narrowed::Updated { .. } = self.store.intersect_set(v.0, half)? {
            self.agenda.schedule_watchers(&mut self.store, v.0);
        }
        agenda::run(&mut self.store, &mut self.agenda)
    }

    /// `absolve(V)`: tighten both bounds of `V` by nibbling — test whether
    /// an outer slice can hold a solution; if not, commit its complement.
    /// Interior solutions are never enumerated.
    pub fn absolve(&mut self, v: VarId) -> Result<()> {
        self.absolve_side(v, true)?;
        self.absolve_side(v, false)
    }

    fn absolve_side(&mut self, v: VarId, lower: bool) -> Result<()> {
        // Slice fraction halves after every inconclusive probe.
        let mut denom: i64 = 2;
        let max_probes = 4 * self.config().precision.max(1);
        for _ in 0..max_probes {
            if self.store.is_small(v.0) || denom > 1_i64 << 40 {
                break;
            }
            let d = self.domain(v);
            let w = d.width(&self.store.ctx);
            if !w.is_finite() {
                break;
            }
            let ctx = self.store.ctx.clone();
            let frac = ctx.div_hi(&w, &Ext::int(denom));
            let slice = if lower {
                Interval {
                    lo: Ext::NegInf,
                    hi: ctx.add_hi(&d.lo, &frac),
                    kind: DomainKind::Real,
                }
            } else {
                Interval {
                    lo: ctx.sub_lo(&d.hi, &frac),
                    hi: Ext::PosInf,
                    kind: DomainKind::Real,
                }
            };
            let mark = self.mark();
            let feasible = self.narrow_branch(v, &slice);
            self.undo_to(mark);
            match feasible {
                Err(SolverError::Inconsistent) => {
                    // The outer slice holds no solution: commit its
                    // complement permanently (a real narrowing).
                    let complement = if lower {
                        Interval {
                            lo: slice.hi,
                            hi: Ext::PosInf,
                            kind: DomainKind::Real,
                        }
                    } else {
                        Interval {
                            lo: Ext::NegInf,
                            hi: slice.lo,
                            kind: DomainKind::Real,
                        }
                    };
                    self.narrow_branch(v, &complement)?;
                }
                Ok(()) => {
                    // Inconclusive: probe a thinner slice.
                    denom = denom.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// `global_minimum(Expr, Z)`: branch-and-bound minimisation of `expr`
    /// over `vars`. Returns the final enclosure of the minimum; the
    /// incumbent bound survives backtracking and is committed to the
    /// objective interval with the one untrailed write.
    pub fn global_minimum(&mut self, expr: &Expr, vars: &[VarId]) -> Result<(Ext, Ext)> {
        let z = self.real_var();
        self.post(&z.expr().eq(expr.clone()))?;
        let mut incumbent = Ext::PosInf;
        let mut best: Option<(Ext, Ext)> = None;
        self.branch_and_bound(z, vars, &mut incumbent, &mut best)?;
        let best = best.ok_or(SolverError::Inconsistent)?;
        // Commit the proven bound on the objective across all branches.
        if let Some(committed) = self.domain(z).intersect(&Interval {
            lo: best.0.clone(),
            hi: best.1.clone(),
            kind: DomainKind::Real,
        }) {
            self.store.nb_set_bounds(z.0, committed);
        }
        Ok(best)
    }

    /// `global_maximum(Expr, Z)`: maximise by minimising the negation.
    pub fn global_maximum(&mut self, expr: &Expr, vars: &[VarId]) -> Result<(Ext, Ext)> {
        let (lo, hi) = self.global_minimum(&(-expr.clone()), vars)?;
        Ok((hi.neg(), lo.neg()))
    }

    fn branch_and_bound(
        &mut self,
        z: VarId,
        vars: &[VarId],
        incumbent: &mut Ext,
        best: &mut Option<(Ext, Ext)>,
    ) -> Result<()> {
        // Prune against the incumbent upper bound on the minimum.
        let zd = self.domain(z);
        if zd.lo > *incumbent {
            return Ok(());
        }
        // Probe the box midpoint: a feasible point gives a proven upper
        // bound on the minimum, which drives the pruning below.
        if let Some(probe_hi) = self.probe_midpoint(z, vars) {
            if probe_hi < *incumbent {
                *incumbent = probe_hi;
            }
        }
        let widest = vars
            .iter()
            .copied()
            .filter(|&v| !self.store.is_small(v.0))
            .max_by(|&a, &b| {
                let wa = self.delta(a).to_f64_hi();
                let wb = self.delta(b).to_f64_hi();
                wa.partial_cmp(&wb).unwrap_or(std::cmp::Ordering::Equal)
            });
        let Some(v) = widest else {
            // Leaf box: its objective upper bound is a new incumbent.
            let zd = self.domain(z);
            if zd.hi < *incumbent || best.is_none() {
                if zd.hi < *incumbent {
                    *incumbent = zd.hi.clone();
                }
                *best = Some((zd.lo.clone(), zd.hi.clone()));
            }
            return Ok(());
        };
        let (left, right) = self.split_branches(v, false);
        for half in [left, right] {
            let mark = self.mark();
            let attempt = self.narrow_branch(v, &half).and_then(|()| {
                // Re-impose the incumbent bound inside the branch.
                let cap = Interval {
                    lo: Ext::NegInf,
                    hi: incumbent.clone(),
                    kind: DomainKind::Real,
                };
                self.narrow_branch(z, &cap)?;
                self.branch_and_bound(z, vars, incumbent, best)
            });
            self.undo_to(mark);
            match attempt {
                Ok(()) | Err(SolverError::Inconsistent) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Pin every search variable at its midpoint and propagate; a feasible
    /// probe returns the objective's upper bound at that point.
    fn probe_midpoint(&mut self, z: VarId, vars: &[VarId]) -> Option<Ext> {
        let mark = self.mark();
        let mut feasible = true;
        for &v in vars {
            let m = self.midpoint(v);
            if !m.is_finite() {
                feasible = false;
                break;
            }
            let point = Interval::point(m);
            if self.narrow_branch(v, &point).is_err() {
                feasible = false;
                break;
            }
        }
        let result = if feasible {
            let zd = self.domain(z);
            zd.hi.is_finite().then(|| zd.hi.clone())
        } else {
            None
        };
        self.undo_to(mark);
        result
    }
}

fn bound_to_int(b: &Ext) -> Option<BigInt> {
    let r = b.as_rational()?;
    r.is_integer().then(|| r.to_integer())
}
