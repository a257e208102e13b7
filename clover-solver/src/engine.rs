//! Engine Facade.
//!
//! [`Engine`] ties the trailed store, the agenda, configuration, and
//! statistics into the user-facing API: declarations, constraint posting,
//! the binding hook, introspection, tracing, and (in the search module)
//! the split-based search operators.
//!
//! A failed operation (`Err(Inconsistent)`) always leaves the engine in its
//! pre-call state: every entry point takes a trail mark first and unwinds
//! it on failure.

use crate::agenda::{self, Agenda};
use crate::bind;
use crate::compile;
use crate::config::Config;
use crate::error::{Result, SolverError};
use crate::expr::Expr;
use crate::stats::{StatKind, Stats};
use crate::store::{Store, VarId, WatchAction};
use clover_math::{Ext, Interval, NumCtx};
use num_rational::BigRational;

/// The interval constraint engine.
#[derive(Debug)]
pub struct Engine {
    pub(crate) store: Store,
    pub(crate) agenda: Agenda,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an engine with a specific configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            store: Store::new(config),
            agenda: Agenda::new(),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.store.config
    }

    /// Replace the configuration; takes effect for subsequent operations.
    pub fn set_config(&mut self, config: Config) {
        self.store.ctx = NumCtx::new(config.max_rational_bits);
        self.store.config = config;
    }

    /// Declare `X :: real` with the default bounds ±10¹⁶.
    pub fn real_var(&mut self) -> VarId {
        VarId(self.store.new_interval(Interval::real_default()))
    }

    /// Declare `X :: real(L, H)`.
    pub fn real_var_in(&mut self, lo: Ext, hi: Ext) -> Result<VarId> {
        let v = Interval::new(clover_math::DomainKind::Real, lo, hi)
            .ok_or_else(|| SolverError::InvalidDeclaration("empty real bounds".into()))?;
        Ok(VarId(self.store.new_interval(v)))
    }

    /// Broadcast `[X1,...,Xn] :: real`.
    pub fn real_vars(&mut self, n: usize) -> Vec<VarId> {
        (0..n).map(|_| self.real_var()).collect()
    }

    /// Declare `X :: integer` with the default bounds ±2⁶².
    pub fn int_var(&mut self) -> VarId {
        VarId(self.store.new_interval(Interval::integer_default()))
    }

    /// Declare `X :: integer(L, H)`; bounds round inward.
    pub fn int_var_in(&mut self, lo: Ext, hi: Ext) -> Result<VarId> {
        let v = Interval::integer(lo, hi)
            .ok_or_else(|| SolverError::InvalidDeclaration("empty integer bounds".into()))?;
        Ok(VarId(self.store.new_interval(v)))
    }

    /// Broadcast `[X1,...,Xn] :: integer(L, H)`.
    pub fn int_vars_in(&mut self, n: usize, lo: Ext, hi: Ext) -> Result<Vec<VarId>> {
        (0..n)
            .map(|_| self.int_var_in(lo.clone(), hi.clone()))
            .collect()
    }

    /// Declare `X :: boolean` — integer (0,1).
    pub fn bool_var(&mut self) -> VarId {
        VarId(self.store.new_interval(Interval::boolean()))
    }

    /// Post one constraint (`{C}`): compile, constrain true, propagate.
    /// On inconsistency the engine state is restored before returning.
    pub fn post(&mut self, expr: &Expr) -> Result<()> {
        let mark = self.store.mark();
        match compile::post(&mut self.store, &mut self.agenda, expr) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.store.undo_to(mark);
                Err(e)
            }
        }
    }

    /// Post several constraints (`{C1, C2, ...}`) atomically: all or none.
    pub fn post_all(&mut self, exprs: &[Expr]) -> Result<()> {
        let mark = self.store.mark();
        for e in exprs {
            if let Err(err) = compile::post(&mut self.store, &mut self.agenda, e) {
                self.store.undo_to(mark);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Host hook: unify a variable with an exact number.
    pub fn bind(&mut self, v: VarId, value: &BigRational) -> Result<()> {
        let mark = self.store.mark();
        match bind::bind_value(&mut self.store, &mut self.agenda, v.0, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.store.undo_to(mark);
                Err(e)
            }
        }
    }

    /// Host hook: unify two interval variables.
    pub fn unify(&mut self, a: VarId, b: VarId) -> Result<()> {
        let mark = self.store.mark();
        match bind::unify(&mut self.store, &mut self.agenda, a.0, b.0) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.store.undo_to(mark);
                Err(e)
            }
        }
    }

    /// `interval(X)`: does X still denote a non-collapsed interval?
    #[must_use]
    pub fn is_interval(&self, v: VarId) -> bool {
        let val = self.store.value(v.0);
        !(val.is_point() && val.point_value().is_some())
    }

    /// `domain(X, D)`: the current enclosure.
    #[must_use]
    pub fn domain(&self, v: VarId) -> Interval {
        self.store.value(v.0).clone()
    }

    /// `range(X, [L,H])`: the current bounds.
    #[must_use]
    pub fn range(&self, v: VarId) -> (Ext, Ext) {
        self.store.bounds(v.0)
    }

    /// The exact value of a collapsed variable, if any.
    #[must_use]
    pub fn value(&self, v: VarId) -> Option<BigRational> {
        self.store.value(v.0).point_value()
    }

    /// `lower_bound(X)`: narrow X to its current lower bound.
    pub fn lower_bound(&mut self, v: VarId) -> Result<()> {
        let (lo, _) = self.range(v);
        self.narrow_to_point(v, lo)
    }

    /// `upper_bound(X)`: narrow X to its current upper bound.
    pub fn upper_bound(&mut self, v: VarId) -> Result<()> {
        let (_, hi) = self.range(v);
        self.narrow_to_point(v, hi)
    }

    fn narrow_to_point(&mut self, v: VarId, b: Ext) -> Result<()> {
        if !b.is_finite() {
            return Err(SolverError::InvalidDeclaration(
                "cannot bind to an infinite bound".into(),
            ));
        }
        let mark = self.store.mark();
        let result = (|| {
            let point = Interval::point(b);
            if let crate::store::Narrowed::Updated { .. } =
                self.store.intersect_set(v.0, &point)?
            {
                self.agenda.schedule_watchers(&mut self.store, v.0);
            }
            agenda::run(&mut self.store, &mut self.agenda)
        })();
        if result.is_err() {
            self.store.undo_to(mark);
        }
        result
    }

    /// `delta(X)`: interval width, rounded up.
    #[must_use]
    pub fn delta(&self, v: VarId) -> Ext {
        self.store.value(v.0).width(&self.store.ctx)
    }

    /// `midpoint(X)`.
    #[must_use]
    pub fn midpoint(&self, v: VarId) -> Ext {
        self.store.value(v.0).midpoint()
    }

    /// `median(X)`.
    #[must_use]
    pub fn median(&self, v: VarId) -> Ext {
        self.store.value(v.0).median()
    }

    /// Is X's width small at the configured precision?
    #[must_use]
    pub fn small(&self, v: VarId) -> bool {
        self.store.is_small(v.0)
    }

    /// `watch(X, Action)`: set the per-interval trace action.
    pub fn watch(&mut self, v: VarId, action: WatchAction) {
        self.store.set_watch(v.0, action);
    }

    /// `clpStatistics/1`: all counters.
    #[must_use]
    pub fn statistics(&self) -> &Stats {
        &self.store.stats
    }

    /// `clpStatistic(S)`: one counter.
    #[must_use]
    pub fn statistic(&self, kind: StatKind) -> u64 {
        self.store.stats.get(kind)
    }

    /// Owned copy of all counters, detached from further engine activity.
    #[must_use]
    pub fn statistics_snapshot(&self) -> Stats {
        self.store.stats.snapshot()
    }

    /// `clpStatistics/0`: reset all counters.
    pub fn reset_statistics(&mut self) {
        self.store.stats.reset();
    }

    /// Run any pending propagation to a fixed point or the throttle.
    pub fn propagate(&mut self) -> Result<()> {
        let mark = self.store.mark();
        let r = agenda::run(&mut self.store, &mut self.agenda);
        if r.is_err() {
            self.store.undo_to(mark);
        }
        r
    }

    /// Take a restore point for explicit choice points.
    #[must_use]
    pub fn mark(&self) -> crate::store::Mark {
        self.store.mark()
    }

    /// Unwind to a restore point, undoing all trailed state.
    pub fn undo_to(&mut self, mark: crate::store::Mark) {
        self.store.undo_to(mark);
    }
}

/// Convenience: build an `Expr` directly from a variable reference.
impl From<&VarId> for Expr {
    fn from(v: &VarId) -> Expr {
        Expr::Var(*v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn rat(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    #[test]
    fn test_declarations() {
        let mut e = Engine::new();
        let x = e.real_var();
        let (lo, hi) = e.range(x);
        assert_eq!(lo, Ext::int(-10_000_000_000_000_000));
        assert_eq!(hi, Ext::int(10_000_000_000_000_000));

        let b = e.bool_var();
        assert_eq!(e.range(b), (Ext::int(0), Ext::int(1)));

        assert!(e.int_var_in(Ext::int(5), Ext::int(2)).is_err());
    }

    #[test]
    fn test_post_failure_restores_state() {
        let mut e = Engine::new();
        let x = e.real_var_in(Ext::int(0), Ext::int(10)).unwrap();
        let nodes_before = e.store.node_count();
        let err = e.post(&x.expr().gt(20));
        assert!(err.is_err());
        assert_eq!(e.store.node_count(), nodes_before);
        assert_eq!(e.range(x), (Ext::int(0), Ext::int(10)));
    }

    #[test]
    fn test_bind_and_is_interval() {
        let mut e = Engine::new();
        let x = e.real_var();
        assert!(e.is_interval(x));
        e.bind(x, &rat(3)).unwrap();
        assert!(!e.is_interval(x));
        assert_eq!(e.value(x), Some(rat(3)));
    }

    #[test]
    fn test_lower_bound_narrows_to_point() {
        let mut e = Engine::new();
        let x = e.real_var_in(Ext::int(2), Ext::int(9)).unwrap();
        e.lower_bound(x).unwrap();
        assert_eq!(e.value(x), Some(rat(2)));
        // An infinite bound cannot be bound to.
        let y = e.real_var_in(Ext::NegInf, Ext::int(0)).unwrap();
        assert!(e.lower_bound(y).is_err());
    }

    #[test]
    fn test_pure_functions_on_point() {
        let mut e = Engine::new();
        let x = e.real_var_in(Ext::int(4), Ext::int(4)).unwrap();
        assert_eq!(e.delta(x), Ext::zero());
        assert_eq!(e.midpoint(x), Ext::int(4));
        assert_eq!(e.median(x), Ext::int(4));
        assert!(e.small(x));
    }

    #[test]
    fn test_statistics_lifecycle() {
        let mut e = Engine::new();
        let x = e.real_var();
        e.post(&x.expr().ge(0)).unwrap();
        assert!(e.statistic(StatKind::NodesCreated) > 0);
        assert!(e.statistic(StatKind::Rounds) > 0);
        assert!(e.statistic(StatKind::MaxOpsUsed) > 0);
        let snap = e.statistics_snapshot();
        e.reset_statistics();
        assert!(snap.get(StatKind::NodesCreated) > 0);
        assert_eq!(e.statistic(StatKind::NodesCreated), 0);
        assert_eq!(e.statistic(StatKind::MaxOpsUsed), 0);
    }

    #[test]
    fn test_idempotent_posting() {
        let mut e = Engine::new();
        let x = e.real_var();
        let y = e.real_var();
        let c = (x.expr() + y.expr()).eq(10);
        e.post(&c).unwrap();
        let after_once = (e.range(x), e.range(y));
        e.post(&c).unwrap();
        assert_eq!((e.range(x), e.range(y)), after_once);
    }

    #[test]
    fn test_monotonic_posting() {
        let mut e = Engine::new();
        let x = e.real_var_in(Ext::int(0), Ext::int(100)).unwrap();
        e.post(&x.expr().le(50)).unwrap();
        let (_, hi1) = e.range(x);
        e.post(&x.expr().le(80)).unwrap();
        let (_, hi2) = e.range(x);
        assert!(hi2 <= hi1);
    }
}
