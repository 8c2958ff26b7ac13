//! Record of the mutations applied to one sequence.

use serde::{Deserialize, Serialize};

use crate::sequence::{Sequence, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Deletion,
    Change,
    Insertion,
}

/// One applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEntry {
    pub kind: MutationKind,
    /// Position the mutation was applied at.
    pub position: usize,
    /// Variable of the affected statement, when it survived the mutation
    /// (deletions record the removed one).
    pub statement: Option<VarId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationHistory {
    entries: Vec<MutationEntry>,
    /// Statements removed by chopping the dead tail.
    #[serde(default)]
    chopped: usize,
}

impl MutationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: MutationKind, position: usize, statement: Option<VarId>) {
        self.entries.push(MutationEntry {
            kind,
            position,
            statement,
        });
    }

    /// Note that `removed` statements were chopped off the end.
    pub fn record_chop(&mut self, removed: usize) {
        self.chopped += removed;
    }

    pub fn chopped(&self) -> usize {
        self.chopped
    }

    /// Whether neither a mutation nor a chop touched the sequence.
    pub fn is_noop(&self) -> bool {
        self.entries.is_empty() && self.chopped == 0
    }

    pub fn entries(&self) -> &[MutationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.chopped = 0;
    }

    /// Append all entries of `other`.
    pub fn extend(&mut self, other: MutationHistory) {
        self.entries.extend(other.entries);
        self.chopped += other.chopped;
    }

    pub fn count(&self, kind: MutationKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Positions in the order the mutations were applied.
    pub fn positions(&self, kind: MutationKind) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.position)
            .collect()
    }

    /// Whether local search on literals is worth re-running: any deletion,
    /// or a change or insertion of a literal still present in `seq`.
    pub fn has_relevant_mutations(&self, seq: &Sequence) -> bool {
        self.entries.iter().any(|e| match e.kind {
            MutationKind::Deletion => true,
            MutationKind::Change | MutationKind::Insertion => e
                .statement
                .and_then(|id| seq.definition(id))
                .is_some_and(|s| s.is_literal()),
        })
    }
}
