//! Crate `sat` provides the incremental SAT solver this core treats as an
//! external collaborator (`spec.md` §1, §6): variable/clause allocation,
//! `solve(assumptions, conflict_limit)`, `bookmark`/`rollback`, and
//! `proof_core` queries. [`SatSolver`] is the trait; [`ChronoSolver`] is a
//! bundled reference implementation — plain chronological-backtracking
//! DPLL with a fixpoint unit-propagation pass, grounded in the teacher's
//! `assign::AssignStack` (trail + `trail_lim` decision-level boundaries,
//! `cancel_until`) and `cdb::ClauseDB` (append-only clause storage). It
//! intentionally has no clause learning, no restarts, and no variable
//! activity heuristic — `spec.md` §1 calls SAT heuristics out of scope,
//! and §9 explicitly permits the simplest correct strategy.
mod solver;

pub use solver::ChronoSolver;

use crate::types::{ClauseId, Lit, VarId};
use std::time::Duration;

/// Outcome of a `solve` call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveStatus {
    Sat,
    Unsat,
    /// Resource limit (conflict budget or wall-clock deadline) hit before a
    /// verdict was reached.
    Undef,
}

/// An opaque resumption point created by `bookmark` and consumed by
/// `rollback`. Solvers are free to give this any internal shape; the
/// encoder never inspects it.
#[derive(Clone, Copy, Debug)]
pub struct Bookmark {
    pub(crate) vars: usize,
    pub(crate) clauses: usize,
}

/// The external SAT solver interface `spec.md` §6 lists.
pub trait SatSolver {
    fn new_var(&mut self) -> VarId;

    /// Adds an arbitrary clause, returning its (monotonically increasing,
    /// 1-based) id.
    fn add_clause(&mut self, lits: &[Lit]) -> ClauseId;

    /// Adds a unit clause forcing `lit` true.
    fn add_const_unit(&mut self, lit: Lit) -> ClauseId {
        self.add_clause(&[lit])
    }

    /// Adds the two-clause buffer equivalence `out ≡ driver ⊕ !phase`
    /// (`spec.md` §4.2's `RegOut, frame > 0` case), returning both ids.
    fn add_buffer(&mut self, out: VarId, driver: VarId, phase: bool) -> (ClauseId, ClauseId) {
        let driver_lit = Lit::of(driver, phase);
        let out_pos = Lit::pos(out);
        let c0 = self.add_clause(&[!out_pos, driver_lit]);
        let c1 = self.add_clause(&[out_pos, !driver_lit]);
        (c0, c1)
    }

    /// Unit-propagates everything derivable at the current (root-level,
    /// between-solves) state. A no-op for solvers without a simplifier.
    fn simplify(&mut self);

    fn solve(
        &mut self,
        assumptions: &[Lit],
        conflict_limit: Option<u64>,
        time_limit: Option<Duration>,
    ) -> SolveStatus;

    /// The clause ids that participated in the most recent `Unsat` result.
    /// Unspecified if the last `solve` did not return `Unsat`.
    fn proof_core(&self) -> Vec<ClauseId>;

    fn var_value(&self, v: VarId) -> Option<bool>;

    fn bookmark(&mut self) -> Bookmark;
    fn rollback(&mut self, bookmark: Bookmark);

    fn n_vars(&self) -> usize;
    fn n_clauses(&self) -> usize;
    fn n_conflicts(&self) -> u64;
}
