//! Execution results reported by the sandboxed executor.
//!
//! The engine never runs code. It only reads where the last execution of a
//! sequence threw, which bounds the mutable prefix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::EngineResult;
use crate::sequence::Sequence;

/// Outcome of executing one sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exception message per statement position.
    pub exceptions: BTreeMap<usize, String>,
    /// The executor stopped the run on its own timeout.
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: record an exception thrown at `position`.
    pub fn with_exception(mut self, position: usize, message: impl Into<String>) -> Self {
        self.exceptions.insert(position, message.into());
        self
    }

    /// Builder method: mark the run as timed out.
    pub fn with_timeout(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Position of the earliest thrown exception.
    pub fn first_exception_position(&self) -> Option<usize> {
        self.exceptions.keys().next().copied()
    }

    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }
}

/// Sandboxed executor collaborator.
///
/// Implementations report an exhausted time budget as
/// [`EngineError::BudgetExhausted`](crate::EngineError::BudgetExhausted).
pub trait Executor {
    fn execute(&mut self, sequence: &Sequence) -> EngineResult<ExecutionResult>;
}
