/*!
# Gate-level abstraction/refinement core

A gate-level abstraction/refinement (GLA) engine for bounded hardware model
checking. Given a sequential Boolean circuit with a single safety property
output, [`driver::Driver`] proves the property bounded to some frame depth,
or returns a concrete counter-example, while maintaining an *abstraction* —
a growing subset of circuit gates the SAT solver actually reasons about.
Gates outside the abstraction behave as unconstrained pseudo primary
inputs. The abstraction is refined reactively: a spurious counter-example
on the abstract model adds gates; an UNSAT proof core prunes the
abstraction back to what was actually used.

Three collaborators are treated as pluggable externals, each behind a
small trait so a caller can swap in a production-grade implementation: an
AIG container ([`aig::AigLike`]), a CNF generator ([`cnf::CnfGenerator`]),
and an incremental SAT solver ([`sat::SatSolver`]). This crate bundles
minimal reference implementations of all three ([`aig::Aig`],
[`cnf::TseitinCnf`], [`sat::ChronoSolver`]) so the core is runnable and
testable standalone.

# Example

```
use gla::aig::Aig;
use gla::cnf::TseitinCnf;
use gla::config::Config;
use gla::driver::{Driver, Outcome};
use gla::sat::ChronoSolver;
use gla::types::ObjectId;

let mut aig = Aig::new();
let (reg_out, _reg_in) = aig.add_register((ObjectId(0), true));
aig.add_po((reg_out, true));

let config = Config::to_frame(3);
let mut driver = Driver::new(&aig, &TseitinCnf, &[reg_out], config, ChronoSolver::new())
    .expect("valid input");
match driver.run().expect("bounded run") {
    Outcome::BoundedProof { last_frame, .. } => assert_eq!(last_frame, 3),
    Outcome::Falsified { .. } => unreachable!("register reset to 0 can never set"),
}
```
*/
/// Crate `aig` provides the and-inverter-graph container this core treats
/// as an external collaborator.
pub mod aig;
/// Crate `cnf` provides the CNF generator this core treats as an external
/// collaborator.
pub mod cnf;
/// Crate `config` provides the abstraction driver's tuning knobs.
pub mod config;
/// Crate `driver` is the abstraction driver: the frame loop tying the
/// encoder, refinement manager, and SAT solver together.
pub mod driver;
/// Crate `encoder` is the incremental CNF encoder.
pub mod encoder;
/// Crate `object` implements the GLA object store.
pub mod object;
/// Crate `refine` is the refinement manager.
pub mod refine;
/// Crate `sat` provides the incremental SAT solver this core treats as an
/// external collaborator.
pub mod sat;
/// Crate `types` provides the shared identifiers and error types.
pub mod types;

pub use {
    config::Config,
    driver::{Driver, Outcome, Stats},
    types::{GlaError, GlaResult, ObjectId, ResourceOutReason},
};

/// This crate's version number.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
