//! End-to-end scenarios over the public API, one per row of the
//! concrete-scenarios table.
use gla::aig::Aig;
use gla::cnf::TseitinCnf;
use gla::config::Config;
use gla::driver::{Driver, Outcome};
use gla::sat::ChronoSolver;
use gla::types::{GlaError, ObjectId};

/// 1-bit register with reset 0, PO = register. Seeded with the register
/// itself. No PI exists that could ever set it, so every frame is UNSAT.
#[test]
fn one_bit_register_reaches_bounded_proof() {
    let mut aig = Aig::new();
    let (reg_out, _reg_in) = aig.add_register((ObjectId(0), true));
    aig.add_po((reg_out, true));

    let config = Config::to_frame(5);
    let mut driver = Driver::new(&aig, &TseitinCnf, &[reg_out], config, ChronoSolver::new()).unwrap();
    match driver.run().unwrap() {
        Outcome::BoundedProof { last_frame, abstraction } => {
            assert_eq!(last_frame, 5);
            assert!(abstraction.contains(&reg_out));
        }
        Outcome::Falsified { .. } => panic!("register reset to 0 can never set"),
    }
}

/// Two independent toggle flip-flops, both reset to 0 and both flipping
/// every frame, so they stay equal at every frame. `PO = bit0 AND bit1`
/// is therefore true on every odd frame. Seeded with only `bit0`: the
/// driver must refine `bit1` (and the gate connecting PO to both bits)
/// into the abstraction before it can find the falsification.
#[test]
fn two_toggling_registers_are_falsified_once_refined() {
    let mut aig = Aig::new();
    let bit0_out = aig.reserve_register();
    let not_bit0 = aig.add_and((bit0_out, false), (bit0_out, false));
    aig.close_register(bit0_out, (not_bit0, true));

    let bit1_out = aig.reserve_register();
    let not_bit1 = aig.add_and((bit1_out, false), (bit1_out, false));
    aig.close_register(bit1_out, (not_bit1, true));

    let both = aig.add_and((bit0_out, true), (bit1_out, true));
    aig.add_po((both, true));

    let config = Config::to_frame(3);
    let mut driver = Driver::new(&aig, &TseitinCnf, &[bit0_out], config, ChronoSolver::new()).unwrap();
    match driver.run().unwrap() {
        Outcome::Falsified { frame, cex } => {
            assert_eq!(frame % 2, 1, "both bits are only simultaneously 1 on odd frames");
            assert_eq!(cex.len(), frame as usize + 1);
        }
        Outcome::BoundedProof { .. } => panic!("both bits agree and go 1 on every odd frame"),
    }
}

/// `PO = NOT(pi)`, seeded with the PO's own driver. At frame 0, `pi = 0`
/// already falsifies the property.
#[test]
fn single_pi_not_gate_is_falsified_at_frame_zero() {
    let mut aig = Aig::new();
    let pi = aig.add_pi();
    aig.add_po((pi, false));

    let config = Config::to_frame(1);
    let mut driver = Driver::new(&aig, &TseitinCnf, &[pi], config, ChronoSolver::new()).unwrap();
    match driver.run().unwrap() {
        Outcome::Falsified { frame, cex } => {
            assert_eq!(frame, 0);
            assert_eq!(cex[0][0], false);
        }
        Outcome::BoundedProof { .. } => panic!("NOT(pi) is falsified by pi = 0"),
    }
}

/// A deep AND cone seeded only with the PO's immediate fanin and a tight
/// conflict limit: the driver must either grow the abstraction to a
/// bounded proof or surface a resource-out, never panic or silently
/// return a wrong answer.
#[test]
fn deep_and_cone_terminates_cleanly_under_conflict_limit() {
    let mut aig = Aig::new();
    let mut prev = aig.add_pi();
    for _ in 0..12 {
        let pi = aig.add_pi();
        prev = aig.add_and((prev, true), (pi, true));
    }
    aig.add_po((prev, true));

    let config = Config { frame_max: 0, conflict_limit: Some(5), ..Config::default() };
    let mut driver = Driver::new(&aig, &TseitinCnf, &[prev], config, ChronoSolver::new()).unwrap();
    match driver.run() {
        Ok(Outcome::BoundedProof { .. }) | Ok(Outcome::Falsified { .. }) => {}
        Err(GlaError::ResourceOut { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

/// An empty seed set is rejected before any SAT call is issued.
#[test]
fn empty_seed_set_is_rejected() {
    let mut aig = Aig::new();
    let pi = aig.add_pi();
    aig.add_po((pi, true));

    let config = Config::to_frame(1);
    let err = Driver::new(&aig, &TseitinCnf, &[], config, ChronoSolver::new()).unwrap_err();
    assert!(matches!(err, GlaError::InvalidInput(_)));
}

/// An AIG with two property outputs is rejected: the exactly-one-PO check
/// fires before any SAT call.
#[test]
fn two_property_outputs_are_rejected() {
    let mut aig = Aig::new();
    let pi = aig.add_pi();
    let po = aig.add_po((pi, true));
    aig.add_po((pi, false));

    let config = Config::to_frame(1);
    let err = Driver::new(&aig, &TseitinCnf, &[po], config, ChronoSolver::new()).unwrap_err();
    assert!(matches!(err, GlaError::InvalidInput(_)));
}
