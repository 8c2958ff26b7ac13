//! Advisory constraint checking.
//!
//! Declared ordering, exclusion and at-most-once rules live outside the
//! engine. The resolver and mutator ask [`ConstraintChecker::is_eligible`]
//! before choosing an operation, so rules hold by construction.

use seqforge_types::Operation;

use crate::sequence::{Sequence, VarId};

pub trait ConstraintChecker: Send + Sync {
    /// Whole-sequence check, used in debug assertions after mutation.
    fn verify(&self, _sequence: &Sequence) -> bool {
        true
    }

    /// Whether `op` may be placed at `position`, called on `receiver`.
    fn is_eligible(
        &self,
        _op: &Operation,
        _receiver: Option<VarId>,
        _sequence: &Sequence,
        _position: usize,
    ) -> bool {
        true
    }
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConstraints;

impl ConstraintChecker for NoConstraints {}
