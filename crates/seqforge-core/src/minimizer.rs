//! Fitness-preserving statement removal.
//!
//! ## Algorithm
//!
//! ```text
//!   baseline = score(S)
//!   loop:
//!     for p = len-1 ..= 0:
//!       S' = S with p gracefully deleted      (skip on failure)
//!       if !worse(score(S'), baseline):
//!         S = S'; restart from the new end
//!     stop when a full pass removed nothing
//! ```
//!
//! The budget is checked before every deletion attempt. An oracle error
//! (including [`EngineError::BudgetExhausted`]) aborts the run and the best
//! sequence accepted so far is returned.

use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::budget::{Budget, Unlimited};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::mutation::delete_gracefully;
use crate::oracle::{Score, ScoringOracle};
use crate::sequence::Sequence;
use seqforge_types::Catalog;

static UNLIMITED: Unlimited = Unlimited;

/// Outcome of one minimization run.
#[derive(Debug, Clone)]
pub struct MinimizationReport {
    /// Shortest sequence found that scores no worse than the original.
    pub sequence: Sequence,
    pub original_len: usize,
    /// Statements removed in total.
    pub removed: usize,
    /// Baseline score of the original, `None` when scoring it failed.
    pub score: Option<Score>,
    /// Set when the budget ran out or the oracle failed.
    pub aborted: Option<EngineError>,
    /// Full passes over the sequence, including the final unchanged one.
    pub passes: usize,
}

impl MinimizationReport {
    pub fn was_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

pub struct Minimizer<'a> {
    catalog: &'a dyn Catalog,
    budget: &'a dyn Budget,
    rng: StdRng,
}

impl<'a> Minimizer<'a> {
    pub fn new(catalog: &'a dyn Catalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            budget: &UNLIMITED,
            rng: config.rng(),
        }
    }

    /// Builder method: stop early once `budget` is exhausted.
    pub fn with_budget(mut self, budget: &'a dyn Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Remove every statement whose deletion does not make `oracle` rank
    /// the sequence worse than the original.
    pub fn minimize<O: ScoringOracle + ?Sized>(&mut self, seq: &Sequence, oracle: &mut O) -> MinimizationReport {
        let original_len = seq.len();
        let mut report = MinimizationReport {
            sequence: seq.clone(),
            original_len,
            removed: 0,
            score: None,
            aborted: None,
            passes: 0,
        };

        let baseline = match oracle.score(seq) {
            Ok(score) => score,
            Err(e) => {
                warn!(error = %e, "scoring the original sequence failed, not minimizing");
                report.aborted = Some(e);
                return report;
            }
        };
        report.score = Some(baseline.clone());

        let mut best = seq.clone();
        'passes: loop {
            report.passes += 1;
            let mut position = best.len();
            let mut changed = false;
            while position > 0 {
                position -= 1;
                if self.budget.is_exhausted() {
                    debug!(len = best.len(), "minimization budget exhausted");
                    report.aborted = Some(EngineError::budget("minimization"));
                    break 'passes;
                }
                if position >= best.len() {
                    continue;
                }

                let mut candidate = best.clone();
                if let Err(e) = delete_gracefully(&mut candidate, position, self.catalog, &mut self.rng) {
                    trace!(position, error = %e, "deletion failed during minimization");
                    continue;
                }
                let score = match oracle.score(&candidate) {
                    Ok(score) => score,
                    Err(e) => {
                        warn!(position, error = %e, "oracle aborted minimization");
                        report.aborted = Some(e);
                        break 'passes;
                    }
                };
                if oracle.is_worse(&score, &baseline) {
                    trace!(position, "deletion makes the sequence worse");
                    continue;
                }

                trace!(position, len = candidate.len(), "deletion kept");
                best = candidate;
                changed = true;
                position = best.len();
            }
            if !changed {
                break;
            }
        }

        report.removed = original_len - best.len();
        debug!(
            original = original_len,
            minimized = best.len(),
            passes = report.passes,
            aborted = report.aborted.is_some(),
            "minimized sequence"
        );
        report.sequence = best;
        report
    }
}
