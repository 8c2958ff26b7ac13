//! Per-call resolution state.

use std::collections::HashSet;

use seqforge_types::{OperationId, TypeBindings};

/// State threaded through one top-level resolution.
///
/// `attempted` holds every generator already tried for an object in this
/// call. Entries are never removed while the call runs, which is what makes
/// recursive construction terminate: each generator is tried at most once,
/// and the catalog is finite.
#[derive(Debug, Default, Clone)]
pub struct ResolveContext {
    attempted: HashSet<OperationId>,
    bindings: TypeBindings,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attempted(&self, op: OperationId) -> bool {
        self.attempted.contains(&op)
    }

    pub fn mark_attempted(&mut self, op: OperationId) {
        self.attempted.insert(op);
    }

    /// Copy of the attempted set, for array cells that each start from the
    /// same state.
    pub fn snapshot_attempted(&self) -> HashSet<OperationId> {
        self.attempted.clone()
    }

    pub fn restore_attempted(&mut self, attempted: HashSet<OperationId>) {
        self.attempted = attempted;
    }

    pub fn bindings(&self) -> &TypeBindings {
        &self.bindings
    }

    /// Install `bindings` and hand back the previous set.
    pub fn replace_bindings(&mut self, bindings: TypeBindings) -> TypeBindings {
        std::mem::replace(&mut self.bindings, bindings)
    }
}
