//! Crate `config` provides the abstraction driver's tuning knobs.
use std::time::Duration;

/// Driver parameters: frame range, per-call SAT budget, wall-clock budget,
/// and the abstraction-to-total-object ratio at which the driver gives up
/// growing the abstraction further (`spec.md` §4.4).
#[derive(Clone, Debug)]
pub struct Config {
    /// First frame to prove, usually `0`.
    pub frame_start: u32,
    /// Last frame to reach before declaring `BoundedProof`.
    pub frame_max: u32,
    /// Conflicts a single `solve` call may spend before returning `UNDEF`.
    /// `None` means unlimited.
    pub conflict_limit: Option<u64>,
    /// Wall-clock budget for the whole run. `None` means unlimited.
    pub time_limit: Option<Duration>,
    /// Stop once `abstracted_objects / total_objects >= 1 - min_abstraction_ratio`.
    /// `0.0` disables the check (the default — the driver runs to
    /// `frame_max` or a concrete result regardless of abstraction size).
    pub min_abstraction_ratio: f64,
    /// Whether `refine::RefinementManager::propagate_fanout` eagerly marks
    /// a pseudo-PI's fanout cone visited across all frames once selected.
    pub propagate_fanout: bool,
    /// Whether every refinement selection is checked by ternary simulation
    /// before being trusted (`spec.md` §4.3 "Optional verification pass").
    pub verify_refinements: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            frame_start: 0,
            frame_max: 0,
            conflict_limit: None,
            time_limit: None,
            min_abstraction_ratio: 0.0,
            propagate_fanout: true,
            verify_refinements: true,
        }
    }
}

impl Config {
    /// Convenience constructor for the common case: prove from frame 0 up
    /// to `frame_max`, unlimited per-call resources.
    pub fn to_frame(frame_max: u32) -> Config {
        Config { frame_max, ..Config::default() }
    }

    pub fn with_conflict_limit(mut self, limit: u64) -> Config {
        self.conflict_limit = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Config {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_min_abstraction_ratio(mut self, ratio: f64) -> Config {
        self.min_abstraction_ratio = ratio;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_limits() {
        let c = Config::default();
        assert_eq!(c.frame_start, 0);
        assert!(c.conflict_limit.is_none());
        assert!(c.time_limit.is_none());
        assert_eq!(c.min_abstraction_ratio, 0.0);
    }

    #[test]
    fn builder_methods_compose() {
        let c = Config::to_frame(5)
            .with_conflict_limit(100)
            .with_time_limit(Duration::from_secs(1))
            .with_min_abstraction_ratio(0.1);
        assert_eq!(c.frame_max, 5);
        assert_eq!(c.conflict_limit, Some(100));
        assert_eq!(c.min_abstraction_ratio, 0.1);
    }
}
