//! A search individual: one sequence plus what the search loop knows about it.
//!
//! The chromosome remembers the last execution result, because it bounds
//! the mutable region. It also keeps the history of mutations applied since
//! that execution, so the caller can decide whether local search on literals
//! is worth re-running.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use seqforge_core::{
    EngineResult, ExecutionResult, Executor, MutationHistory, Mutator, Recombiner, Resolver, Sequence,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceChromosome {
    sequence: Sequence,
    last_execution: Option<ExecutionResult>,
    changed: bool,
    history: MutationHistory,
}

impl SequenceChromosome {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            last_execution: None,
            changed: true,
            history: MutationHistory::new(),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn into_sequence(self) -> Sequence {
        self.sequence
    }

    pub fn size(&self) -> usize {
        self.sequence.len()
    }

    pub fn last_execution(&self) -> Option<&ExecutionResult> {
        self.last_execution.as_ref()
    }

    /// Whether the sequence changed since it was last executed.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mutations applied since the last execution.
    pub fn history(&self) -> &MutationHistory {
        &self.history
    }

    /// Store the result of executing the current sequence. Starts a new
    /// mutation history.
    pub fn set_execution_result(&mut self, result: ExecutionResult) {
        self.last_execution = Some(result);
        self.changed = false;
        self.history.clear();
    }

    /// Run `executor` on the sequence and keep its result.
    pub fn execute<E: Executor + ?Sized>(&mut self, executor: &mut E) -> EngineResult<&ExecutionResult> {
        let result = executor.execute(&self.sequence)?;
        self.changed = false;
        self.history.clear();
        Ok(self.last_execution.insert(result))
    }

    /// Mutate the sequence. Returns whether anything was applied, a chop of
    /// the dead tail included.
    ///
    /// The mutation runs on a copy; on error the chromosome is unchanged.
    pub fn mutate(&mut self, resolver: &mut Resolver<'_>) -> EngineResult<bool> {
        let mut work = self.sequence.clone();
        let history = Mutator::new(resolver).mutate(&mut work, self.last_execution.as_ref())?;
        if history.is_noop() {
            return Ok(false);
        }
        trace!(
            applied = history.len(),
            chopped = history.chopped(),
            len = work.len(),
            "chromosome mutated"
        );
        self.sequence = work;
        self.history.extend(history);
        self.changed = true;
        self.last_execution = None;
        Ok(true)
    }

    /// [`crossover_at`](Self::crossover_at) with both cut points drawn
    /// uniformly, ends included.
    pub fn crossover(&self, other: &SequenceChromosome, resolver: &mut Resolver<'_>) -> EngineResult<SequenceChromosome> {
        let cut_left = resolver.rng_mut().gen_range(0..=self.size());
        let cut_right = resolver.rng_mut().gen_range(0..=other.size());
        self.crossover_at(other, cut_left, cut_right, resolver)
    }

    /// Offspring of `self[..cut_left]` and `other[cut_right..]`.
    pub fn crossover_at(
        &self,
        other: &SequenceChromosome,
        cut_left: usize,
        cut_right: usize,
        resolver: &mut Resolver<'_>,
    ) -> EngineResult<SequenceChromosome> {
        let child = Recombiner::new(resolver).crossover(&self.sequence, &other.sequence, cut_left, cut_right)?;
        if child == self.sequence {
            return Ok(self.clone());
        }
        Ok(SequenceChromosome::new(child))
    }

    /// Whether literal local search should run again on this individual.
    pub fn local_search_needed(&self) -> bool {
        self.history.has_relevant_mutations(&self.sequence)
    }
}

impl From<Sequence> for SequenceChromosome {
    fn from(sequence: Sequence) -> Self {
        Self::new(sequence)
    }
}
