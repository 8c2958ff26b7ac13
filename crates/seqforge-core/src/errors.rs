//! Engine error types.
//!
//! Construction failures are recoverable: the caller retries or abandons the
//! insertion, and the sequence has already been rolled back. Structural
//! violations are defects. Budget exhaustion is signaled by collaborators and
//! ends the in-flight operator.

/// Errors raised by the resolver, mutator, recombiner and minimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A type could not be satisfied within the configured bounds.
    ConstructionFailed {
        /// What could not be built and why
        reason: String,
    },

    /// Construction recursed deeper than `max_recursion`.
    RecursionLimitExceeded {
        /// Depth at which the limit was hit
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// A statement would reference a variable that is not defined before it,
    /// or some other position/dependency invariant broke.
    StructuralInvalid {
        /// Offending statement position
        position: usize,
        /// Description of the violation
        message: String,
    },

    /// An executor or oracle reported that its time budget ran out.
    BudgetExhausted {
        /// Operation that was in flight
        during: String,
    },
}

impl EngineError {
    pub fn construction(reason: impl Into<String>) -> Self {
        EngineError::ConstructionFailed {
            reason: reason.into(),
        }
    }

    pub fn structural(position: usize, message: impl Into<String>) -> Self {
        EngineError::StructuralInvalid {
            position,
            message: message.into(),
        }
    }

    pub fn budget(during: impl Into<String>) -> Self {
        EngineError::BudgetExhausted {
            during: during.into(),
        }
    }

    /// True for [`ConstructionFailed`](Self::ConstructionFailed) and its
    /// specialization [`RecursionLimitExceeded`](Self::RecursionLimitExceeded).
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            EngineError::ConstructionFailed { .. } | EngineError::RecursionLimitExceeded { .. }
        )
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, EngineError::BudgetExhausted { .. })
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, EngineError::StructuralInvalid { .. })
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ConstructionFailed { reason } => {
                write!(f, "construction failed: {}", reason)
            }
            EngineError::RecursionLimitExceeded { depth, max } => {
                write!(
                    f,
                    "construction failed: recursion depth {} exceeds maximum {}",
                    depth, max
                )
            }
            EngineError::StructuralInvalid { position, message } => {
                write!(f, "invalid sequence at statement #{}: {}", position, message)
            }
            EngineError::BudgetExhausted { during } => {
                write!(f, "budget exhausted during {}", during)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result alias used throughout the engine.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
