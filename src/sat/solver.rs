use super::{Bookmark, SatSolver, SolveStatus};
use crate::types::{ClauseId, Lit, VarId};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Clause {
    lits: Vec<Lit>,
}

/// Why a variable holds its current value: `None` for a decision or an
/// assumption, `Some(cid)` for a literal forced by unit propagation of
/// clause `cid` — mirrors the teacher's `AssignReason`.
type Reason = Option<ClauseId>;

#[derive(Clone, Debug)]
struct DecisionFrame {
    var: VarId,
    /// The polarity tried as this level's first branch.
    first_branch_positive: bool,
    /// Whether the second (opposite) branch has already been tried.
    flipped: bool,
    /// Assumption-forced levels are never flipped; exhausting one means
    /// the formula is unsatisfiable under the given assumptions.
    is_assumption: bool,
}

/// A plain chronological-backtracking DPLL solver with fixpoint unit
/// propagation, supporting incremental clause addition and
/// bookmark/rollback over both variables and clauses.
#[derive(Debug)]
pub struct ChronoSolver {
    clauses: Vec<Clause>,
    assign: Vec<Option<bool>>,
    reason: Vec<Reason>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    decisions: Vec<DecisionFrame>,
    qhead: usize,
    n_conflicts: u64,
    last_conflict: Option<ClauseId>,
}

impl Default for ChronoSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChronoSolver {
    pub fn new() -> ChronoSolver {
        ChronoSolver {
            // clause id 0 is a sentinel; real clauses start at 1.
            clauses: vec![Clause { lits: Vec::new() }],
            assign: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            decisions: Vec::new(),
            qhead: 0,
            n_conflicts: 0,
            last_conflict: None,
        }
    }

    fn value_of(&self, var: VarId) -> Option<bool> {
        self.assign[var.0 as usize]
    }

    fn lit_is_true(&self, lit: Lit) -> Option<bool> {
        self.value_of(lit.var).map(|v| v == lit.positive)
    }

    fn enqueue(&mut self, lit: Lit, reason: Reason) {
        debug_assert!(self.value_of(lit.var).is_none());
        self.assign[lit.var.0 as usize] = Some(lit.positive);
        self.reason[lit.var.0 as usize] = reason;
        self.trail.push(lit);
    }

    fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    /// Undo every assignment made at decision levels `> level`, leaving the
    /// propagation queue consistent. Does not touch `self.decisions`;
    /// callers manage that stack themselves.
    fn cancel_to_level(&mut self, level: usize) {
        if self.trail_lim.len() <= level {
            return;
        }
        let target = self.trail_lim[level];
        while self.trail.len() > target {
            let lit = self.trail.pop().unwrap();
            self.assign[lit.var.0 as usize] = None;
            self.reason[lit.var.0 as usize] = None;
        }
        self.trail_lim.truncate(level);
        self.qhead = self.trail.len();
    }

    /// Fixpoint unit propagation over every live clause. Returns the id of
    /// a falsified clause on conflict.
    fn propagate(&mut self) -> Option<ClauseId> {
        loop {
            let mut changed = false;
            'clauses: for (idx, clause) in self.clauses.iter().enumerate().skip(1) {
                let mut unassigned: Option<Lit> = None;
                let mut unassigned_count = 0;
                let mut satisfied = false;
                for &lit in &clause.lits {
                    match self.lit_is_true(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => continue,
                        None => {
                            unassigned = Some(lit);
                            unassigned_count += 1;
                        }
                    }
                }
                if satisfied {
                    continue 'clauses;
                }
                if unassigned_count == 0 {
                    return Some(ClauseId(idx as u32));
                }
                if unassigned_count == 1 {
                    let lit = unassigned.unwrap();
                    self.enqueue(lit, Some(ClauseId(idx as u32)));
                    changed = true;
                }
            }
            if !changed {
                return None;
            }
        }
    }

    fn pick_unassigned(&self) -> Option<VarId> {
        (1..self.assign.len()).find(|&i| self.assign[i].is_none()).map(|i| VarId(i as u32))
    }

    /// Backtrack after a conflict: flip the nearest unflipped decision, or
    /// pop further. Returns `false` once the search has exhausted every
    /// branch back to the assumption frontier (i.e. UNSAT).
    fn backtrack(&mut self) -> bool {
        loop {
            let Some(frame) = self.decisions.last() else { return false };
            if frame.is_assumption {
                return false;
            }
            if !frame.flipped {
                let var = frame.var;
                let first = frame.first_branch_positive;
                let level = self.trail_lim.len() - 1;
                self.cancel_to_level(level);
                self.decisions.last_mut().unwrap().flipped = true;
                self.new_decision_level();
                self.enqueue(Lit::of(var, !first), None);
                return true;
            }
            self.decisions.pop();
            let level = self.trail_lim.len() - 1;
            self.cancel_to_level(level);
        }
    }

    fn compute_core(&self, conflict: ClauseId) -> Vec<ClauseId> {
        let mut seen_clause = HashSet::new();
        let mut seen_var = HashSet::new();
        let mut queue = vec![conflict];
        seen_clause.insert(conflict);
        while let Some(cid) = queue.pop() {
            for &lit in &self.clauses[cid.0 as usize].lits {
                if seen_var.insert(lit.var) {
                    if let Some(reason_cid) = self.reason[lit.var.0 as usize] {
                        if seen_clause.insert(reason_cid) {
                            queue.push(reason_cid);
                        }
                    }
                }
            }
        }
        let mut core: Vec<ClauseId> = seen_clause.into_iter().collect();
        core.sort_by(|a, b| b.0.cmp(&a.0));
        core
    }
}

impl SatSolver for ChronoSolver {
    fn new_var(&mut self) -> VarId {
        let id = VarId(self.assign.len() as u32);
        self.assign.push(None);
        self.reason.push(None);
        id
    }

    fn add_clause(&mut self, lits: &[Lit]) -> ClauseId {
        self.clauses.push(Clause { lits: lits.to_vec() });
        ClauseId((self.clauses.len() - 1) as u32)
    }

    fn simplify(&mut self) {
        self.last_conflict = self.propagate();
    }

    fn solve(
        &mut self,
        assumptions: &[Lit],
        conflict_limit: Option<u64>,
        time_limit: Option<Duration>,
    ) -> SolveStatus {
        self.cancel_to_level(0);
        self.decisions.clear();
        let deadline = time_limit.map(|d| Instant::now() + d);

        for &lit in assumptions {
            match self.lit_is_true(lit) {
                Some(true) => continue,
                Some(false) => {
                    // Conflicting assumption: falsified immediately. There
                    // is no physical clause to blame; report an empty
                    // core, matching "RootLevelConflict" with no antecedent.
                    self.last_conflict = None;
                    return SolveStatus::Unsat;
                }
                None => {
                    self.new_decision_level();
                    self.enqueue(lit, None);
                    self.decisions.push(DecisionFrame {
                        var: lit.var,
                        first_branch_positive: lit.positive,
                        flipped: true, // assumption frames are never flipped
                        is_assumption: true,
                    });
                    if let Some(conflict) = self.propagate() {
                        self.last_conflict = Some(conflict);
                        return SolveStatus::Unsat;
                    }
                }
            }
        }

        loop {
            if let Some(limit) = conflict_limit {
                if self.n_conflicts >= limit {
                    return SolveStatus::Undef;
                }
            }
            if let Some(dl) = deadline {
                if Instant::now() >= dl {
                    return SolveStatus::Undef;
                }
            }
            match self.propagate() {
                Some(conflict) => {
                    self.n_conflicts += 1;
                    self.last_conflict = Some(conflict);
                    if !self.backtrack() {
                        return SolveStatus::Unsat;
                    }
                }
                None => match self.pick_unassigned() {
                    Some(var) => {
                        self.new_decision_level();
                        self.enqueue(Lit::pos(var), None);
                        self.decisions.push(DecisionFrame {
                            var,
                            first_branch_positive: true,
                            flipped: false,
                            is_assumption: false,
                        });
                    }
                    None => return SolveStatus::Sat,
                },
            }
        }
    }

    fn proof_core(&self) -> Vec<ClauseId> {
        match self.last_conflict {
            Some(cid) => self.compute_core(cid),
            None => Vec::new(),
        }
    }

    fn var_value(&self, v: VarId) -> Option<bool> {
        self.value_of(v)
    }

    fn bookmark(&mut self) -> Bookmark {
        Bookmark { vars: self.assign.len(), clauses: self.clauses.len() }
    }

    fn rollback(&mut self, bookmark: Bookmark) {
        self.cancel_to_level(0);
        self.decisions.clear();
        self.clauses.truncate(bookmark.clauses);
        self.assign.truncate(bookmark.vars);
        self.reason.truncate(bookmark.vars);
        self.last_conflict = None;
    }

    fn n_vars(&self) -> usize {
        self.assign.len()
    }

    fn n_clauses(&self) -> usize {
        self.clauses.len() - 1
    }

    fn n_conflicts(&self) -> u64 {
        self.n_conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_clause_forces_value() {
        let mut s = ChronoSolver::new();
        let v = s.new_var();
        s.add_const_unit(Lit::pos(v));
        assert_eq!(s.solve(&[], None, None), SolveStatus::Sat);
        assert_eq!(s.var_value(v), Some(true));
    }

    #[test]
    fn conflicting_units_are_unsat() {
        let mut s = ChronoSolver::new();
        let v = s.new_var();
        s.add_const_unit(Lit::pos(v));
        s.add_const_unit(Lit::neg(v));
        assert_eq!(s.solve(&[], None, None), SolveStatus::Unsat);
        assert!(!s.proof_core().is_empty());
    }

    #[test]
    fn and_gate_is_satisfiable() {
        let mut s = ChronoSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        let out = s.new_var();
        s.add_clause(&[Lit::pos(out), Lit::neg(a), Lit::neg(b)]);
        s.add_clause(&[Lit::neg(out), Lit::pos(a)]);
        s.add_clause(&[Lit::neg(out), Lit::pos(b)]);
        assert_eq!(s.solve(&[Lit::pos(out)], None, None), SolveStatus::Sat);
        assert_eq!(s.var_value(a), Some(true));
        assert_eq!(s.var_value(b), Some(true));
    }

    #[test]
    fn rollback_forgets_clauses_and_vars() {
        let mut s = ChronoSolver::new();
        let a = s.new_var();
        let bm = s.bookmark();
        let b = s.new_var();
        s.add_clause(&[Lit::pos(a), Lit::pos(b)]);
        s.rollback(bm);
        assert_eq!(s.n_vars(), 1);
        assert_eq!(s.n_clauses(), 0);
    }

    #[test]
    fn conflict_limit_returns_undef() {
        let mut s = ChronoSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        // unsatisfiable 2-var formula forcing repeated conflicts: (a|b) & (a|!b) & (!a|b) & (!a|!b)
        s.add_clause(&[Lit::pos(a), Lit::pos(b)]);
        s.add_clause(&[Lit::pos(a), Lit::neg(b)]);
        s.add_clause(&[Lit::neg(a), Lit::pos(b)]);
        s.add_clause(&[Lit::neg(a), Lit::neg(b)]);
        assert_eq!(s.solve(&[], Some(0), None), SolveStatus::Undef);
    }
}
