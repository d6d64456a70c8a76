//! Crate `aig` provides the and-inverter-graph container this core treats
//! as an external collaborator (`spec.md` §1, §6): a DAG of typed nodes
//! with traversal and fanin queries. [`AigLike`] is the trait the rest of
//! the crate depends on; [`Aig`] is a small, owned, build-by-append
//! reference implementation sufficient to drive and test the core without
//! an external toolkit.
use crate::types::ObjectId;

/// The kind of an AIG node, mutually exclusive (`spec.md` §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Const0,
    PrimaryInput,
    And,
    /// Register output (aka flop output, `CO`'s dual): reads the driver of
    /// the matching `RegIn` from the *previous* frame.
    RegOut,
    /// Register input (aka flop input, a combinational output / `CI`'s
    /// dual): the value latched at the end of each frame.
    RegIn,
    PropOut,
}

/// What the rest of this crate needs to query from an AIG.
///
/// Fanins of a 2-input `And` are `(fanin0, fanin1)`; `RegOut` has exactly
/// one fanin, the id of its `RegIn`'s own driver in the previous frame
/// (a temporal edge, not a structural one — `spec.md` §3).
pub trait AigLike {
    fn n_objects(&self) -> usize;
    fn kind(&self, id: ObjectId) -> NodeKind;

    /// Structural fanins of an `And` node (panics on other kinds).
    fn fanin0(&self, id: ObjectId) -> ObjectId;
    fn fanin1(&self, id: ObjectId) -> ObjectId;
    fn fanin0_phase(&self, id: ObjectId) -> bool;
    fn fanin1_phase(&self, id: ObjectId) -> bool;

    /// For a `RegIn`, its single driving fanin and that fanin's polarity.
    fn reg_in_driver(&self, reg_in: ObjectId) -> (ObjectId, bool);
    /// For a `RegOut`, the id of its matching `RegIn`.
    fn register_input_of(&self, reg_out: ObjectId) -> ObjectId;
    /// For a `PropOut`, its single driving fanin and that fanin's polarity.
    fn prop_out_driver(&self, prop_out: ObjectId) -> (ObjectId, bool);

    /// Number of property outputs declared. The core requires exactly one
    /// (`spec.md` §6); an AIG with a different count is a valid *input*
    /// that the core must reject with `InvalidInput`, not a construction
    /// error, so the trait allows reporting any count.
    fn po_count(&self) -> usize;
    /// The property output, assuming `po_count() == 1`. Panics otherwise;
    /// callers must check `po_count` first.
    fn property_output(&self) -> ObjectId;
    fn primary_inputs(&self) -> &[ObjectId];
    fn registers(&self) -> &[ObjectId];

    /// Begin a fresh traversal pass: bumps the monotonic counter so that
    /// `mark`/`is_marked` behave as if freshly cleared, without an O(n)
    /// clear (`spec.md` §9 design note).
    fn begin_pass(&self) -> u32;
    fn mark(&self, id: ObjectId, pass: u32);
    fn is_marked(&self, id: ObjectId, pass: u32) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct Node {
    kind: NodeKind,
    fanin0: ObjectId,
    fanin1: ObjectId,
    phase0: bool,
    phase1: bool,
}

/// A flat, owned AIG built incrementally. Nodes are appended in
/// topological order; combinational fanins are checked to be `< id` at
/// construction time, so the object graph is a DAG by construction. The
/// only non-structural edge is `RegOut -> RegIn` at the previous frame,
/// which is temporal, not a cycle (`spec.md` §9).
#[derive(Debug)]
pub struct Aig {
    nodes: Vec<Node>,
    pis: Vec<ObjectId>,
    reg_outs: Vec<ObjectId>,
    /// `RegOut -> RegIn` pairing, populated by `add_register`.
    reg_in_of: Vec<ObjectId>,
    prop_outs: Vec<ObjectId>,
    trav_stamp: std::cell::RefCell<Vec<u32>>,
    trav_counter: std::cell::Cell<u32>,
}

impl Aig {
    pub fn new() -> Aig {
        let mut nodes = Vec::new();
        // object 0: reserved null/const0 sentinel.
        nodes.push(Node {
            kind: NodeKind::Const0,
            fanin0: ObjectId::NULL,
            fanin1: ObjectId::NULL,
            phase0: false,
            phase1: false,
        });
        Aig {
            nodes,
            pis: Vec::new(),
            reg_outs: Vec::new(),
            reg_in_of: vec![ObjectId::NULL],
            prop_outs: Vec::new(),
            trav_stamp: std::cell::RefCell::new(vec![0]),
            trav_counter: std::cell::Cell::new(0),
        }
    }

    pub fn const0(&self) -> ObjectId {
        ObjectId(0)
    }

    fn push(&mut self, node: Node) -> ObjectId {
        let id = ObjectId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.reg_in_of.push(ObjectId::NULL);
        self.trav_stamp.borrow_mut().push(0);
        id
    }

    pub fn add_pi(&mut self) -> ObjectId {
        let id = self.push(Node {
            kind: NodeKind::PrimaryInput,
            fanin0: ObjectId::NULL,
            fanin1: ObjectId::NULL,
            phase0: false,
            phase1: false,
        });
        self.pis.push(id);
        id
    }

    /// `a` and `b` are `(fanin, polarity)` pairs; both fanins must already
    /// exist (i.e. have an id `< ` the new node's).
    pub fn add_and(&mut self, a: (ObjectId, bool), b: (ObjectId, bool)) -> ObjectId {
        assert!(a.0.0 < self.nodes.len() as u32, "fanin0 must precede its AND");
        assert!(b.0.0 < self.nodes.len() as u32, "fanin1 must precede its AND");
        self.push(Node {
            kind: NodeKind::And,
            fanin0: a.0,
            fanin1: b.0,
            phase0: a.1,
            phase1: b.1,
        })
    }

    /// Reserves a register's output node, to be wired up later with
    /// [`Aig::close_register`]. Needed for next-state logic that reads the
    /// register's own current output (toggle flip-flops, counters) — the
    /// driver can then reference `reg_out` itself, since it already
    /// exists by the time it is added as a fanin.
    pub fn reserve_register(&mut self) -> ObjectId {
        self.push(Node {
            kind: NodeKind::RegOut,
            fanin0: ObjectId::NULL,
            fanin1: ObjectId::NULL,
            phase0: false,
            phase1: false,
        })
    }

    /// Completes a register reserved with [`Aig::reserve_register`] by
    /// attaching its driver. Returns the new `RegIn` node.
    pub fn close_register(&mut self, reg_out: ObjectId, driver: (ObjectId, bool)) -> ObjectId {
        assert!(driver.0.0 < self.nodes.len() as u32, "register driver must already exist");
        let reg_in = self.push(Node {
            kind: NodeKind::RegIn,
            fanin0: driver.0,
            fanin1: ObjectId::NULL,
            phase0: driver.1,
            phase1: false,
        });
        self.reg_in_of[reg_out.index()] = reg_in;
        self.reg_outs.push(reg_out);
        reg_in
    }

    /// Adds a register whose driver is already known and does not depend
    /// on the register's own output — the common case (shift registers,
    /// simple pipelines). Returns `(reg_out, reg_in)`. For self-referential
    /// next-state logic, use [`Aig::reserve_register`] and
    /// [`Aig::close_register`] instead.
    pub fn add_register(&mut self, driver: (ObjectId, bool)) -> (ObjectId, ObjectId) {
        let reg_out = self.reserve_register();
        let reg_in = self.close_register(reg_out, driver);
        (reg_out, reg_in)
    }

    /// Adds a property output, driven by `driver`. Callers normally add
    /// exactly one; adding more is accepted here (the AIG is a dumb
    /// container) so that tests can build the multi-PO inputs the core is
    /// required to reject (`spec.md` §6, §8 scenario 6).
    pub fn add_po(&mut self, driver: (ObjectId, bool)) -> ObjectId {
        let po = self.push(Node {
            kind: NodeKind::PropOut,
            fanin0: driver.0,
            fanin1: ObjectId::NULL,
            phase0: driver.1,
            phase1: false,
        });
        self.prop_outs.push(po);
        po
    }

    /// Simulate the AIG for `frame_count` frames under `pi_values`
    /// (`pi_values[f][i]` is the value of PI `i` at frame `f`), returning
    /// the property output's value at the final frame. Used both by
    /// `TestableProperties` checks and by `cex_remap`'s verification.
    pub fn simulate(&self, pi_values: &[Vec<bool>]) -> bool {
        let mut reg_state: Vec<bool> = vec![false; self.reg_outs.len()];
        let mut last_po = false;
        for frame in pi_values {
            let mut values = vec![false; self.nodes.len()];
            let mut pi_iter = frame.iter();
            for (idx, node) in self.nodes.iter().enumerate() {
                let id = ObjectId(idx as u32);
                values[idx] = match node.kind {
                    NodeKind::Const0 => false,
                    NodeKind::PrimaryInput => *pi_iter.next().unwrap_or(&false),
                    NodeKind::And => {
                        let v0 = values[node.fanin0.index()] ^ !node.phase0;
                        let v1 = values[node.fanin1.index()] ^ !node.phase1;
                        v0 && v1
                    }
                    NodeKind::RegIn => values[node.fanin0.index()] ^ !node.phase0,
                    NodeKind::RegOut => {
                        let slot = self.reg_outs.iter().position(|&r| r == id).unwrap();
                        reg_state[slot]
                    }
                    NodeKind::PropOut => values[node.fanin0.index()] ^ !node.phase0,
                };
            }
            // latch registers for the next frame.
            for (slot, &reg_out) in self.reg_outs.iter().enumerate() {
                let reg_in = self.reg_in_of[reg_out.index()];
                reg_state[slot] = values[reg_in.index()];
            }
            last_po = values[self.prop_outs[0].index()];
        }
        last_po
    }
}

impl Default for Aig {
    fn default() -> Aig {
        Aig::new()
    }
}

impl AigLike for Aig {
    fn n_objects(&self) -> usize {
        self.nodes.len()
    }

    fn kind(&self, id: ObjectId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    fn fanin0(&self, id: ObjectId) -> ObjectId {
        self.nodes[id.index()].fanin0
    }

    fn fanin1(&self, id: ObjectId) -> ObjectId {
        self.nodes[id.index()].fanin1
    }

    fn fanin0_phase(&self, id: ObjectId) -> bool {
        self.nodes[id.index()].phase0
    }

    fn fanin1_phase(&self, id: ObjectId) -> bool {
        self.nodes[id.index()].phase1
    }

    fn reg_in_driver(&self, reg_in: ObjectId) -> (ObjectId, bool) {
        let n = &self.nodes[reg_in.index()];
        (n.fanin0, n.phase0)
    }

    fn register_input_of(&self, reg_out: ObjectId) -> ObjectId {
        self.reg_in_of[reg_out.index()]
    }

    fn prop_out_driver(&self, prop_out: ObjectId) -> (ObjectId, bool) {
        let n = &self.nodes[prop_out.index()];
        (n.fanin0, n.phase0)
    }

    fn po_count(&self) -> usize {
        self.prop_outs.len()
    }

    fn property_output(&self) -> ObjectId {
        assert_eq!(self.prop_outs.len(), 1, "property_output requires exactly one PO");
        self.prop_outs[0]
    }

    fn primary_inputs(&self) -> &[ObjectId] {
        &self.pis
    }

    fn registers(&self) -> &[ObjectId] {
        &self.reg_outs
    }

    fn begin_pass(&self) -> u32 {
        let next = self.trav_counter.get() + 1;
        self.trav_counter.set(next);
        next
    }

    fn mark(&self, id: ObjectId, pass: u32) {
        self.trav_stamp.borrow_mut()[id.index()] = pass;
    }

    fn is_marked(&self, id: ObjectId, pass: u32) -> bool {
        self.trav_stamp.borrow()[id.index()] == pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_bit_register_po() {
        let mut aig = Aig::new();
        let (reg_out, _reg_in) = aig.add_register((ObjectId(0), true));
        aig.add_po((reg_out, true));
        assert_eq!(aig.property_output(), reg_out);
    }

    #[test]
    fn toggle_flip_flop_alternates_every_frame() {
        let mut aig = Aig::new();
        let reg_out = aig.reserve_register();
        // NOT(reg_out), expressed as the self-AND-with-both-edges-inverted
        // trick AIGs use in place of a dedicated unary inverter.
        let not_out = aig.add_and((reg_out, false), (reg_out, false));
        aig.close_register(reg_out, (not_out, true));
        aig.add_po((reg_out, true));
        assert!(!aig.simulate(&[vec![]]));
        assert!(aig.simulate(&[vec![], vec![]]));
        assert!(!aig.simulate(&[vec![], vec![], vec![]]));
    }

    #[test]
    fn traversal_marking_is_pass_scoped() {
        let aig = Aig::new();
        let p1 = aig.begin_pass();
        aig.mark(ObjectId(0), p1);
        assert!(aig.is_marked(ObjectId(0), p1));
        let p2 = aig.begin_pass();
        assert!(!aig.is_marked(ObjectId(0), p2));
    }

    #[test]
    fn simulate_not_gate() {
        let mut aig = Aig::new();
        let pi = aig.add_pi();
        aig.add_po((pi, false));
        assert!(aig.simulate(&[vec![false]]));
        assert!(!aig.simulate(&[vec![true]]));
    }
}
