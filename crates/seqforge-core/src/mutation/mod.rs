//! Delete, change and insert mutation of sequences.
//!
//! ## Stages
//!
//! ```text
//!   chop      drop statements after the last mutatable position when the
//!             sequence is at max_length
//!   delete    for p = cutoff..=0, with per-statement probability
//!   change    for p = 0..=cutoff, with per-statement probability
//!   insert    while rand <= alpha^count and below max_length
//! ```
//!
//! Each stage is entered independently with probability `p_delete`,
//! `p_change` and `p_insert`. The cutoff is the position of the first
//! exception thrown in the last execution, or the last statement when
//! nothing threw; statements after an exception never run, so mutating
//! them is wasted effort.

mod change;
mod delete;
mod history;

pub use change::{change_random_call, mutate_in_place};
pub use delete::{delete_gracefully, hard_delete};
pub use history::{MutationEntry, MutationHistory, MutationKind};

use rand::Rng;
use tracing::{debug, trace};

use crate::errors::EngineResult;
use crate::executor::ExecutionResult;
use crate::resolver::Resolver;
use crate::sequence::Sequence;

/// Upper bound on insertions per mutation when `check_max_length` is off.
const MAX_INSERTIONS: usize = 100;

/// Applies the three mutation stages to a sequence in place.
pub struct Mutator<'r, 'c> {
    resolver: &'r mut Resolver<'c>,
}

impl<'r, 'c> Mutator<'r, 'c> {
    pub fn new(resolver: &'r mut Resolver<'c>) -> Self {
        Self { resolver }
    }

    /// Mutate `seq` and return what was applied.
    ///
    /// `last_execution` bounds the mutatable region; pass `None` for a
    /// sequence that has not been executed yet.
    pub fn mutate(
        &mut self,
        seq: &mut Sequence,
        last_execution: Option<&ExecutionResult>,
    ) -> EngineResult<MutationHistory> {
        let mut history = MutationHistory::new();
        let config = self.resolver.config().clone();

        if config.chop_max_length && seq.len() >= config.max_length {
            if let Some(last) = last_mutatable_position(seq, last_execution) {
                trace!(len = seq.len(), keep = last + 1, "chopping sequence");
                history.record_chop(seq.len() - (last + 1));
                seq.truncate(last + 1);
            }
        }

        if self.resolver.rng_mut().gen_bool(config.p_delete) {
            self.delete_stage(seq, last_execution, &mut history)?;
        }
        if self.resolver.rng_mut().gen_bool(config.p_change) {
            self.change_stage(seq, last_execution, &mut history)?;
        }
        if self.resolver.rng_mut().gen_bool(config.p_insert) {
            self.insert_stage(seq, last_execution, &mut history)?;
        }

        debug_assert!(seq.is_valid(), "mutation produced an invalid sequence:\n{}", seq);
        debug_assert!(self.resolver.constraints().verify(seq));
        debug!(
            len = seq.len(),
            deletions = history.count(MutationKind::Deletion),
            changes = history.count(MutationKind::Change),
            insertions = history.count(MutationKind::Insertion),
            "mutated sequence"
        );
        Ok(history)
    }

    fn statement_probability(&self, cutoff: usize) -> f64 {
        self.resolver
            .config()
            .delete_statement_probability
            .unwrap_or(1.0 / (cutoff as f64 + 1.0))
            .clamp(0.0, 1.0)
    }

    // ---- Delete ----

    fn delete_stage(
        &mut self,
        seq: &mut Sequence,
        last_execution: Option<&ExecutionResult>,
        history: &mut MutationHistory,
    ) -> EngineResult<()> {
        let Some(cutoff) = last_mutatable_position(seq, last_execution) else {
            return Ok(());
        };
        let p = self.statement_probability(cutoff);
        let catalog = self.resolver.catalog();
        let constraints = self.resolver.constraints();
        for position in (0..=cutoff).rev() {
            if position >= seq.len() {
                continue;
            }
            if !self.resolver.rng_mut().gen_bool(p) {
                continue;
            }
            let id = seq.variable_at(position).map(|v| v.id);
            let mut work = seq.clone();
            match delete_gracefully(&mut work, position, catalog, self.resolver.rng_mut()) {
                Ok(removed) if constraints.verify(&work) => {
                    trace!(position, removed = removed.len(), "deletion applied");
                    *seq = work;
                    history.record(MutationKind::Deletion, position, id);
                }
                Ok(_) => trace!(position, "deletion violates constraints"),
                Err(e) if e.is_structural() => return Err(e),
                Err(e) => trace!(position, error = %e, "deletion failed"),
            }
        }
        Ok(())
    }

    // ---- Change ----

    fn change_stage(
        &mut self,
        seq: &mut Sequence,
        last_execution: Option<&ExecutionResult>,
        history: &mut MutationHistory,
    ) -> EngineResult<()> {
        let Some(cutoff) = last_mutatable_position(seq, last_execution) else {
            return Ok(());
        };
        let p = self.statement_probability(cutoff);
        for position in 0..=cutoff.min(seq.len().saturating_sub(1)) {
            if !self.resolver.rng_mut().gen_bool(p) {
                continue;
            }
            let Some(stmt) = seq.statement(position) else {
                continue;
            };
            let id = stmt.id();
            let distance = stmt.result.distance;
            let is_assignment = stmt.is_assignment();

            let mut changed = mutate_in_place(self.resolver, seq, position)?;
            if !changed && !is_assignment {
                changed = change_random_call(self.resolver, seq, position)?;
            }
            if let Some(var) = seq.variable_mut(id) {
                var.distance = distance;
            }
            if changed {
                history.record(MutationKind::Change, position, Some(id));
            }
        }
        Ok(())
    }

    // ---- Insert ----

    fn insert_stage(
        &mut self,
        seq: &mut Sequence,
        last_execution: Option<&ExecutionResult>,
        history: &mut MutationHistory,
    ) -> EngineResult<()> {
        let alpha = self.resolver.config().insertion_alpha;
        let check_length = self.resolver.config().check_max_length;
        let max_length = self.resolver.config().max_length;
        let mut count: i32 = 0;
        loop {
            let threshold = alpha.powi(count);
            if self.resolver.rng_mut().gen::<f64>() > threshold {
                break;
            }
            if check_length && seq.len() >= max_length {
                break;
            }
            if count as usize >= MAX_INSERTIONS.max(max_length) {
                break;
            }
            count += 1;
            let last = last_mutatable_position(seq, last_execution);
            if let Some(position) = self.resolver.insert_random_statement(seq, last)? {
                let id = seq.variable_at(position).map(|v| v.id);
                trace!(position, "insertion applied");
                history.record(MutationKind::Insertion, position, id);
            }
        }
        Ok(())
    }
}

/// Last position worth mutating: the first exception position from
/// `last_execution`, else the last statement. `None` for an empty sequence.
pub fn last_mutatable_position(seq: &Sequence, last_execution: Option<&ExecutionResult>) -> Option<usize> {
    let last = seq.len().checked_sub(1)?;
    let thrown = last_execution.and_then(ExecutionResult::first_exception_position);
    Some(thrown.map_or(last, |p| p.min(last)))
}
