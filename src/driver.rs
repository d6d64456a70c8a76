//! Crate `driver` is the abstraction driver (`spec.md` §4.4): the
//! frame-by-frame outer loop with an inner CEX-refinement loop, tying the
//! encoder, the refinement manager, and the bundled SAT solver together.
use crate::aig::AigLike;
use crate::cnf::CnfGenerator;
use crate::config::Config;
use crate::encoder::Encoder;
use crate::object::ObjectStore;
use crate::refine::{Cex, CexInput, RefinementManager};
use crate::sat::{SatSolver, SolveStatus};
use crate::types::{GlaError, GlaResult, ObjectId, ResourceOutReason};
use std::time::{Duration, Instant};

/// Counters the driver accumulates over a run, surfaced to callers instead
/// of logged — this crate has no logging collaborator (`spec.md` has none
/// in scope; see `SPEC_FULL.md`'s ambient-stack section). Mirrors
/// `Gla_Man_t`'s `nCexes`/`timeSat`/`timeUnsat`/`timeCex`/`timeOther`
/// counters (`original_source/src/aig/gia/giaAbsGla.c`).
#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub frames_completed: u32,
    pub refinement_iterations: u64,
    pub objects_added: u64,
    pub rollbacks: u64,
    pub sat_calls: u64,
    pub unsat_calls: u64,
    pub cex_count: u64,
    pub time_sat: Duration,
    pub time_unsat: Duration,
    pub time_cex: Duration,
    pub time_other: Duration,
}

impl Stats {
    /// A one-line-per-frame summary, in the spirit of the teacher's own
    /// `state::State::progress` reporting, for a caller to print or log
    /// through whatever sink it likes.
    pub fn report(&self) -> String {
        format!(
            "frame {}: {} sat / {} unsat / {} cex, {} refinements (+{} objects), {} rollbacks \
             | sat {:.3}s unsat {:.3}s cex {:.3}s other {:.3}s",
            self.frames_completed,
            self.sat_calls,
            self.unsat_calls,
            self.cex_count,
            self.refinement_iterations,
            self.objects_added,
            self.rollbacks,
            self.time_sat.as_secs_f64(),
            self.time_unsat.as_secs_f64(),
            self.time_cex.as_secs_f64(),
            self.time_other.as_secs_f64(),
        )
    }
}

/// The driver's terminal result (`spec.md` §6).
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The property holds through `last_frame`; `abstraction` is the
    /// final committed set of abstracted object ids.
    BoundedProof { last_frame: u32, abstraction: Vec<ObjectId> },
    /// A genuine counter-example: `cex[f][i]` is PI `i`'s value at frame
    /// `f`, for `f` in `0..=frame`.
    Falsified { frame: u32, cex: Vec<Vec<bool>> },
}

/// Drives `aig` through its frame loop, maintaining an [`Encoder`] and
/// invoking a [`RefinementManager`] on every spurious SAT result.
pub struct Driver<'a, A: AigLike, S: SatSolver> {
    aig: &'a A,
    config: Config,
    encoder: Encoder<S>,
    stats: Stats,
}

impl<'a, A: AigLike, S: SatSolver> Driver<'a, A, S> {
    /// Builds the object store and encoder from `aig`/`cnf`, seeding the
    /// abstraction with `seed` (`spec.md` §4.1, §7 — rejects an empty
    /// seed or a non-single-PO AIG before any SAT call).
    pub fn new<C: CnfGenerator>(
        aig: &'a A,
        cnf: &C,
        seed: &[ObjectId],
        config: Config,
        solver: S,
    ) -> GlaResult<Self> {
        let store = ObjectStore::build(aig, cnf, seed)?;
        let templates = cnf.generate(aig);
        let encoder = Encoder::new(store, templates, config.frame_max, solver);
        Ok(Driver { aig, config, encoder, stats: Stats::default() })
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn encoder(&self) -> &Encoder<S> {
        &self.encoder
    }

    fn remaining_time(&self, start: Instant) -> Option<Duration> {
        self.config.time_limit.map(|limit| limit.saturating_sub(start.elapsed()))
    }

    fn deadline_passed(&self, start: Instant) -> bool {
        matches!(self.config.time_limit, Some(limit) if start.elapsed() >= limit)
    }

    /// Collects the current abstract CEX over frames `0..=f` from the
    /// solver's last `Sat` assignment: every object with an allocated
    /// variable at a frame that is either a true primary input or an
    /// unabstracted (pseudo-PI) object (`spec.md` §4.3's input alphabet).
    fn extract_cex(&self, f: u32) -> Cex {
        let store = self.encoder.store();
        let mut frames = Vec::with_capacity(f as usize + 1);
        for frame in 0..=f {
            let mut inputs = Vec::new();
            for idx in 1..store.n_objects() {
                let id = ObjectId(idx as u32);
                let is_pi = self.aig.kind(id) == crate::aig::NodeKind::PrimaryInput;
                if !is_pi && store.is_abstracted(id) {
                    continue;
                }
                if let Some(var) = self.encoder.var_at(id, frame) {
                    let value = self.encoder.solver().var_value(var).unwrap_or(false);
                    inputs.push(CexInput { object: id, value, is_primary_input: is_pi });
                }
            }
            frames.push(inputs);
        }
        Cex { frames }
    }

    /// Translates a true abstract CEX into the full PI alphabet and
    /// verifies it by simulation against the original AIG (`spec.md`
    /// §4.4's CEX remap).
    fn cex_remap(&self, cex: &Cex, frame: u32) -> GlaResult<Vec<Vec<bool>>> {
        let pis = self.aig.primary_inputs();
        let mut full = vec![vec![false; pis.len()]; cex.frames.len()];
        for (f, inputs) in cex.frames.iter().enumerate() {
            for input in inputs {
                if !input.is_primary_input {
                    continue;
                }
                if let Some(pos) = pis.iter().position(|&pi| pi == input.object) {
                    full[f][pos] = input.value;
                }
            }
        }
        if !self.aig.simulate(&full) {
            return Err(GlaError::CexVerificationFailed { object: self.aig.property_output(), frame });
        }
        Ok(full)
    }

    /// Runs the frame loop to completion (`spec.md` §4.4).
    pub fn run(&mut self) -> GlaResult<Outcome> {
        self.run_with(None)
    }

    /// Like [`Driver::run`], but calls `on_frame` with the stats
    /// accumulated so far once every frame completes — the caller-supplied
    /// equivalent of the teacher's verbose-flag-gated `progress()` call,
    /// without this crate forcing a particular I/O sink.
    pub fn run_with(&mut self, mut on_frame: Option<&mut dyn FnMut(&Stats)>) -> GlaResult<Outcome> {
        let start = Instant::now();
        for f in self.config.frame_start..=self.config.frame_max {
            if self.deadline_passed(start) {
                let abstraction = self.encoder.store().abstracted_ids().collect();
                return Err(GlaError::ResourceOut {
                    reason: ResourceOutReason::TimeOut,
                    last_frame: f.saturating_sub(1),
                    abstraction,
                });
            }

            let other_start = Instant::now();
            let abstracted: Vec<ObjectId> = self.encoder.store().abstracted_ids().collect();
            self.encoder.emit_cone_through_frame(f, &abstracted);
            let mark = self.encoder.bookmark();
            self.stats.time_other += other_start.elapsed();

            let mut inner_iterations = 0u32;

            let core = loop {
                let po = self.aig.property_output();
                let po_lit = self.encoder.lit_for(po, f);
                let solve_start = Instant::now();
                let status = self.encoder.solver_mut().solve(
                    &[po_lit],
                    self.config.conflict_limit,
                    self.remaining_time(start),
                );
                let solve_time = solve_start.elapsed();
                match status {
                    SolveStatus::Undef => {
                        self.stats.time_other += solve_time;
                        let reason = if self.deadline_passed(start) {
                            ResourceOutReason::TimeOut
                        } else {
                            ResourceOutReason::ConflictLimit
                        };
                        let abstraction = self.encoder.store().abstracted_ids().collect();
                        return Err(GlaError::ResourceOut { reason, last_frame: f, abstraction });
                    }
                    SolveStatus::Unsat => {
                        self.stats.unsat_calls += 1;
                        self.stats.time_unsat += solve_time;
                        break self.encoder.solver().proof_core();
                    }
                    SolveStatus::Sat => {
                        self.stats.sat_calls += 1;
                        self.stats.time_sat += solve_time;
                        let cex_start = Instant::now();
                        let cex = self.extract_cex(f);
                        let refine = RefinementManager::new(self.aig, self.config.propagate_fanout);
                        let selection = refine.analyze(&cex);
                        self.stats.cex_count += 1;
                        if selection.is_empty() {
                            let full_cex = self.cex_remap(&cex, f)?;
                            self.stats.time_cex += cex_start.elapsed();
                            return Ok(Outcome::Falsified { frame: f, cex: full_cex });
                        }
                        if self.config.verify_refinements && !refine.verify(&cex, &selection) {
                            return Err(GlaError::InvariantViolation(
                                "refinement selection failed ternary verification",
                            ));
                        }
                        self.stats.time_cex += cex_start.elapsed();
                        self.stats.refinement_iterations += 1;
                        self.stats.objects_added += selection.len() as u64;
                        let other_start = Instant::now();
                        self.encoder.add_objects_to_abstraction(&selection);
                        self.encoder.emit_cone_through_frame(f, &selection);
                        self.stats.time_other += other_start.elapsed();
                        inner_iterations += 1;
                    }
                }
            };

            if inner_iterations > 0 {
                let other_start = Instant::now();
                let core_objects = self.encoder.objects_for_core(&core)?;
                self.encoder.rollback(mark);
                self.stats.rollbacks += 1;
                self.encoder.add_objects_to_abstraction(&core_objects);
                self.encoder.emit_cone_through_frame(f, &core_objects);
                self.stats.time_other += other_start.elapsed();

                let po = self.aig.property_output();
                let po_lit = self.encoder.lit_for(po, f);
                let solve_start = Instant::now();
                let status = self.encoder.solver_mut().solve(
                    &[po_lit],
                    self.config.conflict_limit,
                    self.remaining_time(start),
                );
                self.stats.unsat_calls += 1;
                self.stats.time_unsat += solve_start.elapsed();
                if status != SolveStatus::Unsat {
                    return Err(GlaError::InvariantViolation(
                        "recommitting the UNSAT core failed to reproduce UNSAT",
                    ));
                }
            }

            self.stats.frames_completed += 1;
            if let Some(cb) = on_frame.as_deref_mut() {
                cb(&self.stats);
            }
            if self.config.min_abstraction_ratio > 0.0
                && self.encoder.store().abstraction_ratio() >= 1.0 - self.config.min_abstraction_ratio
            {
                let abstraction = self.encoder.store().abstracted_ids().collect();
                return Err(GlaError::ResourceOut {
                    reason: ResourceOutReason::RatioExceeded,
                    last_frame: f,
                    abstraction,
                });
            }
        }
        Ok(Outcome::BoundedProof {
            last_frame: self.config.frame_max,
            abstraction: self.encoder.store().abstracted_ids().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;
    use crate::cnf::TseitinCnf;
    use crate::sat::ChronoSolver;

    /// 1-bit register reset to 0, PO = register output. No PI can ever
    /// drive it to 1, so every frame is UNSAT — a bounded proof.
    #[test]
    fn one_bit_register_is_a_bounded_proof() {
        let mut aig = Aig::new();
        let (reg_out, _reg_in) = aig.add_register((ObjectId(0), true));
        aig.add_po((reg_out, true));
        let seed = [reg_out];
        let config = Config { frame_max: 3, ..Config::default() };
        let mut driver = Driver::new(&aig, &TseitinCnf, &seed, config, ChronoSolver::new()).unwrap();
        let outcome = driver.run().unwrap();
        match outcome {
            Outcome::BoundedProof { last_frame, .. } => assert_eq!(last_frame, 3),
            Outcome::Falsified { .. } => panic!("expected a bounded proof"),
        }
    }

    /// `po = NOT(pi)`, seeded with the PO's own AND-equivalent driver. At
    /// frame 0, `pi = 0` falsifies the property immediately.
    #[test]
    fn single_pi_not_gate_is_falsified_at_frame_zero() {
        let mut aig = Aig::new();
        let pi = aig.add_pi();
        aig.add_po((pi, false));
        let seed = [pi];
        let config = Config { frame_max: 1, ..Config::default() };
        let mut driver = Driver::new(&aig, &TseitinCnf, &seed, config, ChronoSolver::new()).unwrap();
        let outcome = driver.run().unwrap();
        match outcome {
            Outcome::Falsified { frame, cex } => {
                assert_eq!(frame, 0);
                assert_eq!(cex[0][0], false);
            }
            Outcome::BoundedProof { .. } => panic!("expected a falsification"),
        }
    }

    #[test]
    fn empty_seed_is_rejected_before_any_solve() {
        let mut aig = Aig::new();
        let pi = aig.add_pi();
        aig.add_po((pi, false));
        let config = Config { frame_max: 1, ..Config::default() };
        let err = Driver::new(&aig, &TseitinCnf, &[], config, ChronoSolver::new()).unwrap_err();
        assert!(matches!(err, GlaError::InvalidInput(_)));
    }

    #[test]
    fn multi_po_is_rejected() {
        let mut aig = Aig::new();
        let pi = aig.add_pi();
        let po = aig.add_po((pi, false));
        aig.add_po((pi, true));
        let config = Config { frame_max: 1, ..Config::default() };
        let err = Driver::new(&aig, &TseitinCnf, &[po], config, ChronoSolver::new()).unwrap_err();
        assert!(matches!(err, GlaError::InvalidInput(_)));
    }

    #[test]
    fn conflict_limit_surfaces_as_resource_out() {
        let mut aig = Aig::new();
        let mut prev = aig.add_pi();
        for _ in 0..20 {
            let pi = aig.add_pi();
            prev = aig.add_and((prev, true), (pi, true));
        }
        aig.add_po((prev, true));
        let seed = [prev];
        let config = Config { frame_max: 0, conflict_limit: Some(0), ..Config::default() };
        let mut driver = Driver::new(&aig, &TseitinCnf, &seed, config, ChronoSolver::new()).unwrap();
        let err = driver.run().unwrap_err();
        assert!(matches!(
            err,
            GlaError::ResourceOut { reason: ResourceOutReason::ConflictLimit, .. }
                | GlaError::ResourceOut { reason: ResourceOutReason::TimeOut, .. }
        ));
    }

    #[test]
    fn resource_out_carries_the_committed_abstraction() {
        let mut aig = Aig::new();
        let mut prev = aig.add_pi();
        for _ in 0..20 {
            let pi = aig.add_pi();
            prev = aig.add_and((prev, true), (pi, true));
        }
        aig.add_po((prev, true));
        let seed = [prev];
        let config = Config { frame_max: 0, conflict_limit: Some(0), ..Config::default() };
        let mut driver = Driver::new(&aig, &TseitinCnf, &seed, config, ChronoSolver::new()).unwrap();
        let err = driver.run().unwrap_err();
        match err {
            GlaError::ResourceOut { abstraction, .. } => assert!(abstraction.contains(&prev)),
            other => panic!("expected ResourceOut, got {other:?}"),
        }
    }

    #[test]
    fn run_with_invokes_the_frame_hook_and_report_is_non_empty() {
        let mut aig = Aig::new();
        let (reg_out, _reg_in) = aig.add_register((ObjectId(0), true));
        aig.add_po((reg_out, true));
        let seed = [reg_out];
        let config = Config { frame_max: 2, ..Config::default() };
        let mut driver = Driver::new(&aig, &TseitinCnf, &seed, config, ChronoSolver::new()).unwrap();
        let mut frames_seen = 0u32;
        let mut callback = |stats: &Stats| frames_seen = stats.frames_completed;
        let outcome = driver.run_with(Some(&mut callback)).unwrap();
        match outcome {
            Outcome::BoundedProof { last_frame, .. } => assert_eq!(last_frame, 2),
            Outcome::Falsified { .. } => panic!("expected a bounded proof"),
        }
        assert_eq!(frames_seen, 3);
        assert!(driver.stats().unsat_calls >= 3);
        assert!(!driver.stats().report().is_empty());
    }
}
