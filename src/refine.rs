//! Crate `refine` is the refinement manager (`spec.md` §4.3): given a
//! concrete counter-example over the current abstraction's input alphabet
//! (true PIs and pseudo-PIs), it decides whether the CEX is real or
//! spurious, and if spurious, computes a minimal set of pseudo-PI gates to
//! add. It works directly against [`AigLike`] (not the object store),
//! since sensitisation needs both fanin polarities of an AND gate, which
//! `spec.md` §9 allows the object store to drop.
use crate::aig::{AigLike, NodeKind};
use crate::types::ObjectId;
use std::collections::{HashMap, HashSet};

/// One bit of a counter-example's input alphabet at a single frame: either
/// a true primary input, or a pseudo-PI standing in for an unabstracted
/// gate.
#[derive(Clone, Copy, Debug)]
pub struct CexInput {
    pub object: ObjectId,
    pub value: bool,
    pub is_primary_input: bool,
}

/// A concrete counter-example over the abstraction's input alphabet:
/// `frames[f]` is the ordered input assignment at frame `f`. An input's
/// position within its frame doubles as its priority — earlier entries
/// are cheaper refinement choices (`spec.md` §4.3).
#[derive(Clone, Debug, Default)]
pub struct Cex {
    pub frames: Vec<Vec<CexInput>>,
}

impl Cex {
    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }
}

#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    /// Raw 0-based position within its frame's input list; `sensitize`
    /// turns this into a 1-based priority so `0` stays reserved for true
    /// primary inputs.
    priority: u32,
    is_primary_input: bool,
    value: bool,
}

#[derive(Clone, Copy, Debug)]
struct Sensitized {
    value: bool,
    /// `0` means "a true PI drove this", the sentinel `analyze` checks to
    /// decide a CEX is real rather than spurious.
    priority: u32,
}

/// Ternary-simulation-based analyzer. Borrowed from the `AIG` the driver
/// is running against; stateless between `analyze` calls.
pub struct RefinementManager<'a, A: AigLike> {
    aig: &'a A,
    /// When set, a justified pseudo-PI's node is marked visited across
    /// every frame, not just the frame it was reached at, trading a little
    /// extra conservatism for avoiding repeat justification work
    /// (`spec.md` §4.3).
    propagate_fanout: bool,
}

impl<'a, A: AigLike> RefinementManager<'a, A> {
    pub fn new(aig: &'a A, propagate_fanout: bool) -> Self {
        RefinementManager { aig, propagate_fanout }
    }

    fn frontier_maps(&self, cex: &Cex) -> Vec<HashMap<ObjectId, FrontierEntry>> {
        cex.frames
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .enumerate()
                    .map(|(idx, input)| {
                        (
                            input.object,
                            FrontierEntry {
                                priority: idx as u32,
                                is_primary_input: input.is_primary_input,
                                value: input.value,
                            },
                        )
                    })
                    .collect()
            })
            .collect()
    }

    fn sensitize(
        &self,
        obj: ObjectId,
        frame: u32,
        frontier: &[HashMap<ObjectId, FrontierEntry>],
        memo: &mut HashMap<(ObjectId, u32), Sensitized>,
    ) -> Sensitized {
        if let Some(s) = memo.get(&(obj, frame)) {
            return *s;
        }
        if let Some(entry) = frontier[frame as usize].get(&obj) {
            let s = Sensitized {
                value: entry.value,
                priority: if entry.is_primary_input { 0 } else { entry.priority + 1 },
            };
            memo.insert((obj, frame), s);
            return s;
        }
        let s = match self.aig.kind(obj) {
            NodeKind::Const0 => Sensitized { value: false, priority: 0 },
            NodeKind::PrimaryInput => Sensitized { value: false, priority: 0 },
            NodeKind::RegOut if frame == 0 => Sensitized { value: false, priority: 0 },
            NodeKind::RegOut => {
                let reg_in = self.aig.register_input_of(obj);
                self.sensitize(reg_in, frame - 1, frontier, memo)
            }
            NodeKind::RegIn => {
                let (driver, phase) = self.aig.reg_in_driver(obj);
                let d = self.sensitize(driver, frame, frontier, memo);
                Sensitized { value: d.value ^ !phase, priority: d.priority }
            }
            NodeKind::PropOut => {
                let (driver, phase) = self.aig.prop_out_driver(obj);
                let d = self.sensitize(driver, frame, frontier, memo);
                Sensitized { value: d.value ^ !phase, priority: d.priority }
            }
            NodeKind::And => {
                let f0 = self.aig.fanin0(obj);
                let f1 = self.aig.fanin1(obj);
                let p0 = self.aig.fanin0_phase(obj);
                let p1 = self.aig.fanin1_phase(obj);
                let s0 = self.sensitize(f0, frame, frontier, memo);
                let s1 = self.sensitize(f1, frame, frontier, memo);
                let v0 = s0.value ^ !p0;
                let v1 = s1.value ^ !p1;
                let priority = if v0 && v1 {
                    s0.priority.max(s1.priority)
                } else if !v0 && !v1 {
                    s0.priority.min(s1.priority)
                } else if !v0 {
                    s0.priority
                } else {
                    s1.priority
                };
                Sensitized { value: v0 && v1, priority }
            }
        };
        memo.insert((obj, frame), s);
        s
    }

    #[allow(clippy::too_many_arguments)]
    fn justify(
        &self,
        obj: ObjectId,
        frame: u32,
        frontier: &[HashMap<ObjectId, FrontierEntry>],
        memo: &mut HashMap<(ObjectId, u32), Sensitized>,
        visited: &mut HashSet<(ObjectId, u32)>,
        selection: &mut Vec<ObjectId>,
    ) {
        if !visited.insert((obj, frame)) {
            return;
        }
        if let Some(entry) = frontier[frame as usize].get(&obj) {
            if !entry.is_primary_input {
                selection.push(obj);
                if self.propagate_fanout {
                    for f in 0..frontier.len() as u32 {
                        visited.insert((obj, f));
                    }
                }
            }
            return;
        }
        match self.aig.kind(obj) {
            NodeKind::Const0 | NodeKind::PrimaryInput => {}
            NodeKind::RegOut if frame == 0 => {}
            NodeKind::RegOut => {
                let reg_in = self.aig.register_input_of(obj);
                self.justify(reg_in, frame - 1, frontier, memo, visited, selection);
            }
            NodeKind::RegIn => {
                let (driver, _phase) = self.aig.reg_in_driver(obj);
                self.justify(driver, frame, frontier, memo, visited, selection);
            }
            NodeKind::PropOut => {
                let (driver, _phase) = self.aig.prop_out_driver(obj);
                self.justify(driver, frame, frontier, memo, visited, selection);
            }
            NodeKind::And => {
                let f0 = self.aig.fanin0(obj);
                let f1 = self.aig.fanin1(obj);
                let p0 = self.aig.fanin0_phase(obj);
                let p1 = self.aig.fanin1_phase(obj);
                let s0 = self.sensitize(f0, frame, frontier, memo);
                let s1 = self.sensitize(f1, frame, frontier, memo);
                let v0 = s0.value ^ !p0;
                let v1 = s1.value ^ !p1;
                if v0 && v1 {
                    self.justify(f0, frame, frontier, memo, visited, selection);
                    self.justify(f1, frame, frontier, memo, visited, selection);
                } else if !v0 && !v1 {
                    if s0.priority <= s1.priority {
                        self.justify(f0, frame, frontier, memo, visited, selection);
                    } else {
                        self.justify(f1, frame, frontier, memo, visited, selection);
                    }
                } else if !v0 {
                    self.justify(f0, frame, frontier, memo, visited, selection);
                } else {
                    self.justify(f1, frame, frontier, memo, visited, selection);
                }
            }
        }
    }

    /// Analyzes `cex`, returning the pseudo-PI objects to add to the
    /// abstraction. An empty result means `cex` is a true counter-example
    /// (`spec.md` §4.3).
    pub fn analyze(&self, cex: &Cex) -> Vec<ObjectId> {
        let frontier = self.frontier_maps(cex);
        let mut memo = HashMap::new();
        let last_frame = cex.frame_count() - 1;
        let po = self.aig.property_output();
        let po_result = self.sensitize(po, last_frame, &frontier, &mut memo);
        debug_assert!(po_result.value, "a CEX's PO must sensitize to 1");
        if po_result.priority == 0 {
            return Vec::new();
        }
        let mut visited = HashSet::new();
        let mut selection = Vec::new();
        let (driver, _phase) = self.aig.prop_out_driver(po);
        self.justify(driver, last_frame, &frontier, &mut memo, &mut visited, &mut selection);
        selection.sort_by_key(|o| o.0);
        selection.dedup();
        selection
    }

    fn ternary_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
        match (a, b) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }
    }

    fn ternary_not(v: Option<bool>, phase: bool) -> Option<bool> {
        if phase {
            v
        } else {
            v.map(|b| !b)
        }
    }

    fn ternary_value(
        &self,
        obj: ObjectId,
        frame: u32,
        frontier: &[HashMap<ObjectId, bool>],
        selection: &HashSet<ObjectId>,
        memo: &mut HashMap<(ObjectId, u32), Option<bool>>,
    ) -> Option<bool> {
        if let Some(v) = memo.get(&(obj, frame)) {
            return *v;
        }
        if let Some(&value) = frontier[frame as usize].get(&obj) {
            // A frontier object carries a concrete bit only if it's a true
            // PI or was selected for refinement; callers build `frontier`
            // to reflect that (unselected pseudo-PIs are simply absent).
            let _ = selection;
            memo.insert((obj, frame), Some(value));
            return Some(value);
        }
        let v = match self.aig.kind(obj) {
            NodeKind::Const0 => Some(false),
            NodeKind::PrimaryInput => None,
            NodeKind::RegOut if frame == 0 => Some(false),
            NodeKind::RegOut => {
                let reg_in = self.aig.register_input_of(obj);
                self.ternary_value(reg_in, frame - 1, frontier, selection, memo)
            }
            NodeKind::RegIn => {
                let (driver, phase) = self.aig.reg_in_driver(obj);
                let d = self.ternary_value(driver, frame, frontier, selection, memo);
                Self::ternary_not(d, phase)
            }
            NodeKind::PropOut => {
                let (driver, phase) = self.aig.prop_out_driver(obj);
                let d = self.ternary_value(driver, frame, frontier, selection, memo);
                Self::ternary_not(d, phase)
            }
            NodeKind::And => {
                let f0 = self.aig.fanin0(obj);
                let f1 = self.aig.fanin1(obj);
                let p0 = self.aig.fanin0_phase(obj);
                let p1 = self.aig.fanin1_phase(obj);
                let v0 = Self::ternary_not(
                    self.ternary_value(f0, frame, frontier, selection, memo),
                    p0,
                );
                let v1 = Self::ternary_not(
                    self.ternary_value(f1, frame, frontier, selection, memo),
                    p1,
                );
                Self::ternary_and(v0, v1)
            }
        };
        memo.insert((obj, frame), v);
        v
    }

    /// Verifies that `selection` suffices: true PIs fixed to their CEX
    /// bits, `selection` fixed to its CEX bits, everything else X, the PO
    /// must still ternary-evaluate to 1 at the last frame (`spec.md`
    /// §4.3's optional verification pass, and testable property 5).
    pub fn verify(&self, cex: &Cex, selection: &[ObjectId]) -> bool {
        let selected: HashSet<ObjectId> = selection.iter().copied().collect();
        let frontier: Vec<HashMap<ObjectId, bool>> = cex
            .frames
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .filter(|input| input.is_primary_input || selected.contains(&input.object))
                    .map(|input| (input.object, input.value))
                    .collect()
            })
            .collect();
        let mut memo = HashMap::new();
        let last_frame = cex.frame_count() - 1;
        let po = self.aig.property_output();
        self.ternary_value(po, last_frame, &frontier, &selected, &mut memo) == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;

    /// `po = a AND b`, both pseudo-PIs (not abstracted). A CEX with both
    /// bits 1 needs both in the selection.
    #[test]
    fn and_gate_needs_both_fanins_when_true() {
        let mut aig = Aig::new();
        let a = aig.add_pi();
        let b = aig.add_pi();
        let and_gate = aig.add_and((a, true), (b, true));
        aig.add_po((and_gate, true));
        let cex = Cex {
            frames: vec![vec![
                CexInput { object: a, value: true, is_primary_input: false },
                CexInput { object: b, value: true, is_primary_input: false },
            ]],
        };
        let mgr = RefinementManager::new(&aig, true);
        let mut selection = mgr.analyze(&cex);
        selection.sort_by_key(|o| o.0);
        assert_eq!(selection, vec![a, b]);
        assert!(mgr.verify(&cex, &selection));
    }

    /// `po = a AND b`; only `a` is a true PI, `b` is a pseudo-PI forced to
    /// 0. The AND is 0 via `b` alone, so only `b` need be justified.
    #[test]
    fn and_gate_needs_only_controlling_fanin_when_false() {
        let mut aig = Aig::new();
        let a = aig.add_pi();
        let b = aig.add_pi();
        let and_gate = aig.add_and((a, true), (b, true));
        aig.add_po((and_gate, false));
        let cex = Cex {
            frames: vec![vec![
                CexInput { object: a, value: true, is_primary_input: true },
                CexInput { object: b, value: false, is_primary_input: false },
            ]],
        };
        let mgr = RefinementManager::new(&aig, false);
        let selection = mgr.analyze(&cex);
        assert_eq!(selection, vec![b]);
        assert!(mgr.verify(&cex, &selection));
    }

    #[test]
    fn real_cex_needs_no_refinement() {
        let mut aig = Aig::new();
        let pi = aig.add_pi();
        aig.add_po((pi, true));
        let cex = Cex {
            frames: vec![vec![CexInput { object: pi, value: true, is_primary_input: true }]],
        };
        let mgr = RefinementManager::new(&aig, false);
        assert!(mgr.analyze(&cex).is_empty());
    }
}
