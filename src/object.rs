//! Crate `object` implements the GLA object store: a compact, pointer-free
//! array of gate-level objects built once from the source AIG and the CNF
//! generator's output (`spec.md` §3, §4.1).
use crate::aig::{AigLike, NodeKind};
use crate::cnf::CnfGenerator;
use crate::types::{GlaError, GlaResult, ObjectId};

bitflags::bitflags! {
    /// Per-object attribute bits. Only one bit today; kept as a bitset
    /// (rather than a bare `bool`) so future attributes (e.g. a
    /// "frontier" cache bit for the refinement manager) cost nothing extra
    /// to add, the way the teacher's `FlagVar`/`FlagClause` are structured.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct GateFlags: u8 {
        /// Currently part of the abstraction the solver reasons about.
        const ABSTRACTED = 0b0000_0001;
    }
}

/// A gate-level object: `kind`, up to 4 ordered fanins, the first fanin's
/// polarity, and whether it is currently abstracted (`spec.md` §3).
#[derive(Clone, Debug)]
pub struct Gate {
    pub kind: NodeKind,
    fanins: [ObjectId; 4],
    fanin_count: u8,
    pub fanin_phase0: bool,
    flags: GateFlags,
}

impl Gate {
    fn abstracted(&self) -> bool {
        self.flags.contains(GateFlags::ABSTRACTED)
    }
}

/// The object store: `objects[0]` is the reserved null object; objects
/// `1..n` mirror the source AIG's nodes 1:1 (their ids double as the
/// "back-reference into the source AIG" the spec calls for), in the same
/// topological order, so every structural fanin id is `< ` its object's
/// own id except `RegOut`'s temporal fanin.
#[derive(Debug)]
pub struct ObjectStore {
    objects: Vec<Gate>,
    abstracted_count: usize,
}

impl ObjectStore {
    /// Builds the store from `aig` and seeds the abstraction with `seed`.
    /// Rejects an empty seed and a non-single-PO AIG up front, leaving no
    /// partial mutation on error (`spec.md` §7).
    pub fn build<A: AigLike, C: CnfGenerator>(
        aig: &A,
        cnf: &C,
        seed: &[ObjectId],
    ) -> GlaResult<ObjectStore> {
        if seed.is_empty() {
            return Err(GlaError::InvalidInput("initial gate classes must not be empty"));
        }
        if aig.n_objects() <= 1 {
            return Err(GlaError::InvalidInput("AIG has no objects"));
        }
        if aig.po_count() != 1 {
            return Err(GlaError::InvalidInput("AIG must have exactly one property output"));
        }
        let object_cnf = cnf.generate(aig);
        let mut objects = Vec::with_capacity(aig.n_objects());
        for idx in 0..aig.n_objects() {
            let id = ObjectId(idx as u32);
            let kind = aig.kind(id);
            let (fanins, fanin_count, fanin_phase0) = match kind {
                NodeKind::Const0 | NodeKind::PrimaryInput => ([ObjectId::NULL; 4], 0, false),
                NodeKind::And => {
                    let f = [aig.fanin0(id), aig.fanin1(id), ObjectId::NULL, ObjectId::NULL];
                    (f, 2, aig.fanin0_phase(id))
                }
                NodeKind::RegIn => {
                    let (driver, phase) = aig.reg_in_driver(id);
                    ([driver, ObjectId::NULL, ObjectId::NULL, ObjectId::NULL], 1, phase)
                }
                NodeKind::RegOut => {
                    let reg_in = aig.register_input_of(id);
                    let (driver, phase) = aig.reg_in_driver(reg_in);
                    ([driver, ObjectId::NULL, ObjectId::NULL, ObjectId::NULL], 1, phase)
                }
                NodeKind::PropOut => {
                    let (driver, phase) = aig.prop_out_driver(id);
                    ([driver, ObjectId::NULL, ObjectId::NULL, ObjectId::NULL], 1, phase)
                }
            };
            let _ = &object_cnf; // clause templates are consumed by the encoder, not the store.
            objects.push(Gate { kind, fanins, fanin_count, fanin_phase0, flags: GateFlags::empty() });
        }
        let mut store = ObjectStore { objects, abstracted_count: 0 };
        for &id in seed {
            if id.is_null() || id.index() >= store.objects.len() {
                return Err(GlaError::InvalidInput("seed references an object outside the AIG"));
            }
            store.set_abstracted(id, true);
        }
        Ok(store)
    }

    pub fn n_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn kind(&self, id: ObjectId) -> NodeKind {
        self.objects[id.index()].kind
    }

    pub fn fanins(&self, id: ObjectId) -> &[ObjectId] {
        let g = &self.objects[id.index()];
        &g.fanins[..g.fanin_count as usize]
    }

    pub fn fanin_phase0(&self, id: ObjectId) -> bool {
        self.objects[id.index()].fanin_phase0
    }

    pub fn is_abstracted(&self, id: ObjectId) -> bool {
        self.objects[id.index()].abstracted()
    }

    /// Used only by the encoder, which is the sole owner of the change log
    /// that makes this mutation reversible.
    pub(crate) fn set_abstracted(&mut self, id: ObjectId, value: bool) {
        let g = &mut self.objects[id.index()];
        let was = g.abstracted();
        if was == value {
            return;
        }
        g.flags.set(GateFlags::ABSTRACTED, value);
        if value {
            self.abstracted_count += 1;
        } else {
            self.abstracted_count -= 1;
        }
    }

    pub fn abstracted_count(&self) -> usize {
        self.abstracted_count
    }

    /// Fraction of (non-null) objects currently in the abstraction.
    pub fn abstraction_ratio(&self) -> f64 {
        let total = self.objects.len().saturating_sub(1);
        if total == 0 {
            0.0
        } else {
            self.abstracted_count as f64 / total as f64
        }
    }

    pub fn abstracted_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, g)| g.abstracted())
            .map(|(i, _)| ObjectId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;
    use crate::cnf::TseitinCnf;

    fn small_and_aig() -> Aig {
        let mut aig = Aig::new();
        let a = aig.add_pi();
        let b = aig.add_pi();
        let and_gate = aig.add_and((a, true), (b, true));
        aig.add_po((and_gate, true));
        aig
    }

    #[test]
    fn empty_seed_is_rejected() {
        let aig = small_and_aig();
        let err = ObjectStore::build(&aig, &TseitinCnf, &[]).unwrap_err();
        assert!(matches!(err, GlaError::InvalidInput(_)));
    }

    #[test]
    fn seed_marks_abstraction() {
        let aig = small_and_aig();
        let po = aig.property_output();
        let store = ObjectStore::build(&aig, &TseitinCnf, &[po]).unwrap();
        assert!(store.is_abstracted(po));
        assert_eq!(store.abstracted_count(), 1);
    }

    #[test]
    fn multi_po_is_rejected() {
        let mut aig = small_and_aig();
        let po = aig.property_output();
        let extra = aig.add_pi();
        aig.add_po((extra, true));
        let err = ObjectStore::build(&aig, &TseitinCnf, &[po]).unwrap_err();
        assert!(matches!(err, GlaError::InvalidInput(_)));
    }

    #[test]
    fn fanins_derived_from_and_gate() {
        let aig = small_and_aig();
        let po = aig.property_output();
        let store = ObjectStore::build(&aig, &TseitinCnf, &[po]).unwrap();
        let and_gate = store.fanins(po)[0];
        assert_eq!(store.kind(and_gate), NodeKind::And);
        assert_eq!(store.fanins(and_gate).len(), 2);
    }
}
