//! Crate `cnf` provides the CNF generator this core treats as an external
//! collaborator (`spec.md` §1, §4.1, §6): given an AIG, produce clause
//! templates plus a per-object `(first_clause, count)` map. [`CnfGenerator`]
//! is the trait; [`TseitinCnf`] is the bundled reference implementation,
//! the classic 3-clause Tseitin encoding of a 2-input AND.
use crate::aig::{AigLike, NodeKind};
use crate::types::ObjectId;

/// One clause template: a list of `(fanin_index, phase)` pairs, where
/// `fanin_index` is `0` for the object's first fanin, `1` for the second
/// (the object's *own* output never appears by index here — callers
/// remap each entry through [`crate::encoder::Encoder::get_or_alloc_var`]
/// and add the object's own frame literal).
///
/// Each clause is `Vec<(Option<usize>, bool)>`: `None` stands for "the
/// object's own output literal", `Some(i)` for fanin `i`.
pub type ClauseTemplate = Vec<(Option<usize>, bool)>;

/// Per-object CNF data: which clause templates encode it.
#[derive(Clone, Debug, Default)]
pub struct ObjectCnf {
    pub clauses: Vec<ClauseTemplate>,
}

/// What the encoder needs from a CNF generator.
pub trait CnfGenerator {
    /// Clause templates for every object that needs them (`Const0`, `And`,
    /// `RegOut` — `spec.md` §4.2). Indexed by `ObjectId`; index `0` and any
    /// object that never gets clauses (`PrimaryInput`, `RegIn`, `PropOut`)
    /// hold an empty `ObjectCnf`.
    fn generate<A: AigLike>(&self, aig: &A) -> Vec<ObjectCnf>;
}

/// Standard Tseitin encoding: for `out = (a OR-of-phase) AND (b OR-of-phase)`,
///
/// ```text
/// (out OR !a' OR !b')   -- forward
/// (!out OR a')          -- backward 0
/// (!out OR b')          -- backward 1
/// ```
///
/// where `a'`/`b'` are the phase-adjusted fanin literals. `Const0` gets a
/// single unit clause forcing its variable false; `RegOut` gets either a
/// reset unit clause (frame 0) or a two-clause buffer equivalence with its
/// driver (frame > 0) — both are frame-dependent and are therefore
/// templated with a single synthetic fanin slot (index `0`) standing for
/// "the driver at the previous frame", resolved by the encoder, not here.
#[derive(Clone, Copy, Debug, Default)]
pub struct TseitinCnf;

impl CnfGenerator for TseitinCnf {
    fn generate<A: AigLike>(&self, aig: &A) -> Vec<ObjectCnf> {
        let mut out = vec![ObjectCnf::default(); aig.n_objects()];
        for idx in 0..aig.n_objects() {
            let id = ObjectId(idx as u32);
            out[idx] = match aig.kind(id) {
                NodeKind::Const0 => ObjectCnf { clauses: vec![vec![(None, false)]] },
                NodeKind::And => {
                    let p0 = aig.fanin0_phase(id);
                    let p1 = aig.fanin1_phase(id);
                    ObjectCnf {
                        clauses: vec![
                            vec![(None, true), (Some(0), !p0), (Some(1), !p1)],
                            vec![(None, false), (Some(0), p0)],
                            vec![(None, false), (Some(1), p1)],
                        ],
                    }
                }
                NodeKind::RegOut => {
                    // Frame-dependent: the encoder special-cases RegOut
                    // entirely (reset at frame 0, buffer thereafter) since
                    // its "fanin" is a temporal reference to the previous
                    // frame's RegIn driver, not a same-frame object. No
                    // static template applies; leave empty and let
                    // `encoder::emit_clauses` synthesize the clauses.
                    ObjectCnf::default()
                }
                NodeKind::PrimaryInput | NodeKind::RegIn | NodeKind::PropOut => {
                    ObjectCnf::default()
                }
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;

    #[test]
    fn and_gate_gets_three_clauses() {
        let mut aig = Aig::new();
        let a = aig.add_pi();
        let b = aig.add_pi();
        let and_gate = aig.add_and((a, true), (b, false));
        let cnf = TseitinCnf.generate(&aig);
        assert_eq!(cnf[and_gate.index()].clauses.len(), 3);
    }

    #[test]
    fn const0_gets_one_unit_clause() {
        let aig = Aig::new();
        let cnf = TseitinCnf.generate(&aig);
        assert_eq!(cnf[0].clauses, vec![vec![(None, false)]]);
    }
}
