//! Crate `encoder` is the incremental encoder (`spec.md` §4.2): it lazily
//! emits CNF clauses for `(object, frame)` pairs into the SAT solver,
//! allocating SAT variables on demand, maintaining the clause→object
//! back-map (`cla2obj`), and supporting bookmarked rollback via a change
//! log — mirroring the teacher's `cdb::ClauseDB` (append-only clause
//! storage plus a `Vec` back-map) and `assign::AssignStack` (trail-style
//! undo log).
use crate::aig::NodeKind;
use crate::cnf::ObjectCnf;
use crate::object::ObjectStore;
use crate::sat::{Bookmark as SolverBookmark, SatSolver};
use crate::types::{ClauseId, GlaError, GlaResult, Lit, ObjectId, VarId};

/// One reversible mutation recorded since the last bookmark: either an
/// object entering the abstraction, or a fresh frame variable allocation
/// (`spec.md` §3's `added_new` change log).
#[derive(Clone, Copy, Debug)]
enum ChangeLogEntry {
    Abstracted(ObjectId),
    FrameVar(ObjectId, u32),
}

/// An opaque resumption point for [`Encoder::rollback`].
#[derive(Clone, Copy, Debug)]
pub struct EncoderBookmark {
    solver: SolverBookmark,
    cla2obj_len: usize,
}

/// Lazily encodes the object store into CNF over an unbounded number of
/// frames, driving a bundled [`SatSolver`].
pub struct Encoder<S: SatSolver> {
    store: ObjectStore,
    templates: Vec<ObjectCnf>,
    frame_vars: Vec<Option<VarId>>,
    stride: usize,
    /// 1-based; slot 0 is a sentinel so a live [`ClauseId`] always indexes
    /// a real entry (`spec.md` §3).
    cla2obj: Vec<ObjectId>,
    change_log: Vec<ChangeLogEntry>,
    solver: S,
}

impl<S: SatSolver> Encoder<S> {
    /// `frame_max` bounds the flat `obj * stride + frame` index space;
    /// `templates` must be the same `CnfGenerator` output the `store` was
    /// built from.
    pub fn new(store: ObjectStore, templates: Vec<ObjectCnf>, frame_max: u32, solver: S) -> Self {
        let stride = frame_max as usize + 1;
        let frame_vars = vec![None; store.n_objects() * stride];
        Encoder {
            store,
            templates,
            frame_vars,
            stride,
            cla2obj: vec![ObjectId::NULL],
            change_log: Vec::new(),
            solver,
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    /// Reads back the variable already allocated for `(obj, frame)`,
    /// without allocating one. `None` means the object has never been
    /// referenced at this frame.
    pub fn var_at(&self, obj: ObjectId, frame: u32) -> Option<VarId> {
        self.frame_vars[self.slot(obj, frame)]
    }

    fn slot(&self, obj: ObjectId, frame: u32) -> usize {
        obj.index() * self.stride + frame as usize
    }

    /// Allocates (or returns the existing) SAT variable for `(obj, frame)`.
    /// `RegIn`/`PropOut` never own a variable of their own — use
    /// [`Encoder::var_for`] for those (`spec.md` §4.2).
    pub fn get_or_alloc_var(&mut self, obj: ObjectId, frame: u32) -> VarId {
        let kind = self.store.kind(obj);
        debug_assert!(
            !matches!(kind, NodeKind::RegIn | NodeKind::PropOut),
            "RegIn/PropOut share their driver's variable"
        );
        let idx = self.slot(obj, frame);
        if let Some(v) = self.frame_vars[idx] {
            return v;
        }
        let v = self.solver.new_var();
        self.frame_vars[idx] = Some(v);
        self.change_log.push(ChangeLogEntry::FrameVar(obj, frame));
        v
    }

    /// Resolves the variable that stands for `obj` at `frame`, following
    /// the `RegIn`/`PropOut` → driver sharing rule.
    pub fn var_for(&mut self, obj: ObjectId, frame: u32) -> VarId {
        match self.store.kind(obj) {
            NodeKind::RegIn | NodeKind::PropOut => {
                let driver = self.store.fanins(obj)[0];
                self.var_for(driver, frame)
            }
            _ => self.get_or_alloc_var(obj, frame),
        }
    }

    /// Like [`Encoder::var_for`], but returns a literal in `obj`'s own
    /// positive sense rather than its underlying variable — `RegIn` and
    /// `PropOut` invert through their driver's polarity bit, since they
    /// share a variable but not necessarily a polarity (`spec.md` §3's
    /// `fanin_phase0`).
    pub fn lit_for(&mut self, obj: ObjectId, frame: u32) -> Lit {
        match self.store.kind(obj) {
            NodeKind::RegIn | NodeKind::PropOut => {
                let driver = self.store.fanins(obj)[0];
                let phase = self.store.fanin_phase0(obj);
                let inner = self.lit_for(driver, frame);
                if phase {
                    inner
                } else {
                    !inner
                }
            }
            _ => Lit::pos(self.get_or_alloc_var(obj, frame)),
        }
    }

    /// Emits `obj`'s clauses at `frame`, a no-op if already emitted
    /// (idempotent on the `frame_vars` slot). Valid only for
    /// `Const0`/`And`/`RegOut` (`spec.md` §4.2); any other kind is a
    /// caller error in this crate, never a user input error.
    pub fn emit_clauses(&mut self, obj: ObjectId, frame: u32) {
        let kind = self.store.kind(obj);
        assert!(
            matches!(kind, NodeKind::Const0 | NodeKind::And | NodeKind::RegOut),
            "emit_clauses called on a {kind:?} object"
        );
        if self.frame_vars[self.slot(obj, frame)].is_some() {
            return;
        }
        match kind {
            NodeKind::Const0 => {
                let v = self.get_or_alloc_var(obj, frame);
                let cid = self.solver.add_const_unit(Lit::neg(v));
                self.cla2obj.push(obj);
                debug_assert_eq!(cid.0 as usize, self.cla2obj.len() - 1);
            }
            NodeKind::RegOut if frame == 0 => {
                let v = self.get_or_alloc_var(obj, 0);
                self.solver.add_const_unit(Lit::neg(v));
                self.cla2obj.push(obj);
            }
            NodeKind::RegOut => {
                let v = self.get_or_alloc_var(obj, frame);
                let driver = self.store.fanins(obj)[0];
                let phase = self.store.fanin_phase0(obj);
                let driver_var = self.var_for(driver, frame - 1);
                self.solver.add_buffer(v, driver_var, phase);
                self.cla2obj.push(obj);
                self.cla2obj.push(obj);
            }
            NodeKind::And => {
                let _ = self.get_or_alloc_var(obj, frame);
                let fanins = self.store.fanins(obj).to_vec();
                let clauses = self.templates[obj.index()].clauses.clone();
                for template in &clauses {
                    let lits: Vec<Lit> = template
                        .iter()
                        .map(|&(slot, polarity)| {
                            let var = match slot {
                                None => self.var_for(obj, frame),
                                Some(i) => self.var_for(fanins[i], frame),
                            };
                            Lit::of(var, polarity)
                        })
                        .collect();
                    self.solver.add_clause(&lits);
                    self.cla2obj.push(obj);
                }
            }
            _ => unreachable!(),
        }
    }

    /// Marks each id in `ids` as abstracted, logging the transition. Does
    /// not emit clauses — callers pair this with
    /// [`Encoder::emit_cone_through_frame`] (`spec.md` §4.2).
    pub fn add_objects_to_abstraction(&mut self, ids: &[ObjectId]) {
        for &id in ids {
            if !self.store.is_abstracted(id) {
                self.store.set_abstracted(id, true);
                self.change_log.push(ChangeLogEntry::Abstracted(id));
            }
        }
    }

    /// Emits clauses for every object in `ids` over frames `0..=frame`
    /// (`spec.md` §4.2). Objects that never own clauses (`PrimaryInput`,
    /// `RegIn`, `PropOut`) are skipped.
    pub fn emit_cone_through_frame(&mut self, frame: u32, ids: &[ObjectId]) {
        for &id in ids {
            if !matches!(self.store.kind(id), NodeKind::Const0 | NodeKind::And | NodeKind::RegOut) {
                continue;
            }
            for f in 0..=frame {
                self.emit_clauses(id, f);
            }
        }
    }

    /// Delegates to the solver and clears the change log, returning a
    /// token that `rollback` can later restore to.
    pub fn bookmark(&mut self) -> EncoderBookmark {
        let mark = EncoderBookmark { solver: self.solver.bookmark(), cla2obj_len: self.cla2obj.len() };
        self.change_log.clear();
        mark
    }

    /// Reverses every change-log entry recorded since `mark` was taken,
    /// then rolls the solver and `cla2obj` back too (`spec.md` §4.2).
    pub fn rollback(&mut self, mark: EncoderBookmark) {
        for entry in self.change_log.drain(..).rev() {
            match entry {
                ChangeLogEntry::Abstracted(id) => self.store.set_abstracted(id, false),
                ChangeLogEntry::FrameVar(id, frame) => {
                    let idx = self.slot(id, frame);
                    self.frame_vars[idx] = None;
                }
            }
        }
        self.solver.rollback(mark.solver);
        self.cla2obj.truncate(mark.cla2obj_len);
    }

    /// Maps a proof core (clause ids) back to the deduplicated, descending
    /// set of objects that caused them (`spec.md` §4.4 "core-to-objects
    /// mapping").
    pub fn objects_for_core(&self, core: &[ClauseId]) -> GlaResult<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(core.len());
        for &cid in core {
            let obj = *self
                .cla2obj
                .get(cid.0 as usize)
                .ok_or(GlaError::InvariantViolation("proof core referenced an unknown clause id"))?;
            ids.push(obj);
        }
        ids.sort_by(|a, b| b.0.cmp(&a.0));
        ids.dedup();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;
    use crate::cnf::TseitinCnf;
    use crate::sat::{ChronoSolver, SolveStatus};

    fn build_and_encoder(frame_max: u32) -> (Encoder<ChronoSolver>, ObjectId, ObjectId, ObjectId) {
        let mut aig = Aig::new();
        let a = aig.add_pi();
        let b = aig.add_pi();
        let and_gate = aig.add_and((a, true), (b, true));
        let po = aig.add_po((and_gate, true));
        let templates = TseitinCnf.generate(&aig);
        let store = crate::object::ObjectStore::build(&aig, &TseitinCnf, &[po]).unwrap();
        let enc = Encoder::new(store, templates, frame_max, ChronoSolver::new());
        (enc, a, b, and_gate)
    }

    #[test]
    fn get_or_alloc_var_is_idempotent() {
        let (mut enc, a, _b, _and) = build_and_encoder(0);
        let v1 = enc.get_or_alloc_var(a, 0);
        let v2 = enc.get_or_alloc_var(a, 0);
        assert_eq!(v1, v2);
    }

    #[test]
    fn and_gate_solves_sat() {
        let (mut enc, a, b, and_gate) = build_and_encoder(0);
        enc.emit_clauses(and_gate, 0);
        let va = enc.var_for(a, 0);
        let vb = enc.var_for(b, 0);
        let vand = enc.var_for(and_gate, 0);
        let status = enc.solver_mut().solve(&[Lit::pos(va), Lit::pos(vb)], None, None);
        assert_eq!(status, SolveStatus::Sat);
        assert_eq!(enc.solver().var_value(vand), Some(true));
    }

    #[test]
    fn rollback_restores_change_log_state() {
        let (mut enc, _a, _b, and_gate) = build_and_encoder(0);
        let mark = enc.bookmark();
        enc.add_objects_to_abstraction(&[and_gate]);
        enc.emit_clauses(and_gate, 0);
        assert!(enc.store().is_abstracted(and_gate));
        enc.rollback(mark);
        assert!(!enc.store().is_abstracted(and_gate));
        assert_eq!(enc.solver().n_vars(), 0);
        assert_eq!(enc.solver().n_clauses(), 0);
    }

    #[test]
    fn proof_core_maps_back_to_objects() {
        let (mut enc, _a, _b, and_gate) = build_and_encoder(0);
        enc.emit_clauses(and_gate, 0);
        let core = vec![ClauseId(1), ClauseId(1), ClauseId(2)];
        let objs = enc.objects_for_core(&core).unwrap();
        assert_eq!(objs, vec![and_gate]);
    }
}
