//! Shared identifiers and error types used across the crate.
use std::fmt;

/// Index of a gate-level object in the [`ObjectStore`](`crate::object::ObjectStore`).
///
/// Object `0` is reserved (null); live objects start at `1`, in topological
/// order with all structural fanins `< id`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// A SAT variable identifier, as handed out by a [`SatSolver`](`crate::sat::SatSolver`).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A clause identifier. 1-based: slot `0` of `cla2obj` is a sentinel so
/// that a live `ClauseId` always indexes a real back-map entry.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClauseId(pub u32);

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A literal: a signed reference to a [`VarId`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Lit {
    pub var: VarId,
    pub positive: bool,
}

impl Lit {
    #[inline]
    pub fn pos(var: VarId) -> Lit {
        Lit { var, positive: true }
    }

    #[inline]
    pub fn neg(var: VarId) -> Lit {
        Lit { var, positive: false }
    }

    #[inline]
    pub fn of(var: VarId, positive: bool) -> Lit {
        Lit { var, positive }
    }

    /// Flip polarity if `phase` is `false`; used when remapping a fanin's
    /// own inversion bit onto a freshly allocated literal.
    #[inline]
    pub fn with_phase(var: VarId, positive: bool, phase: bool) -> Lit {
        Lit { var, positive: positive == phase }
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit { var: self.var, positive: !self.positive }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.var)
        } else {
            write!(f, "-{}", self.var)
        }
    }
}

/// Reason a `ResourceOut` result was returned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceOutReason {
    TimeOut,
    ConflictLimit,
    RatioExceeded,
}

impl fmt::Display for ResourceOutReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ResourceOutReason::TimeOut => "time out",
            ResourceOutReason::ConflictLimit => "conflict limit",
            ResourceOutReason::RatioExceeded => "abstraction ratio exceeded",
        };
        write!(f, "{s}")
    }
}

/// All errors this crate can produce.
///
/// There is no retry policy: a caller that wants to try again with relaxed
/// limits builds a new [`Config`](`crate::config::Config`) and a new
/// driver.
#[derive(Debug)]
pub enum GlaError {
    /// Rejected before any SAT call was issued: an empty seed set, a
    /// multi-PO AIG, or a PI-count mismatch on a supplied counter-example.
    InvalidInput(&'static str),
    /// Non-fatal: the solver hit `UNDEF`, the wall-clock deadline passed,
    /// or the abstraction grew past the configured ratio. The last
    /// committed abstraction and frame index are attached so the caller
    /// can resume (seed a fresh driver with `abstraction`) or persist it.
    ResourceOut { reason: ResourceOutReason, last_frame: u32, abstraction: Vec<ObjectId> },
    /// Fatal: a remapped counter-example failed simulation against the
    /// original AIG. Indicates a bug in the driver or refinement manager,
    /// not a caller error.
    CexVerificationFailed { object: ObjectId, frame: u32 },
    /// Fatal: an internal invariant was violated (stale change-log entry,
    /// clause-to-object back-map mismatch, an assertion on object kinds).
    InvariantViolation(&'static str),
}

impl fmt::Display for GlaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GlaError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            GlaError::ResourceOut { reason, last_frame, abstraction } => {
                write!(
                    f,
                    "resource out ({reason}) at frame {last_frame}, abstraction holds {} objects",
                    abstraction.len()
                )
            }
            GlaError::CexVerificationFailed { object, frame } => write!(
                f,
                "counter-example verification failed at frame {frame}, offending {object}"
            ),
            GlaError::InvariantViolation(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for GlaError {}

pub type GlaResult<T> = Result<T, GlaError>;
