//! Variables: typed handles to statement results.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use seqforge_types::{Operation, TypeRef};

/// Stable identity of a statement's result within one sequence.
///
/// Ids never change when statements move; a variable's position is always
/// looked up through the owning [`Sequence`](super::Sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What a variable denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Plain result of a call, a field read, an array allocation or `null`.
    Value,
    /// `array[index]`, written by an assignment statement.
    ArrayCell { array: VarId, index: usize },
    /// `source.field` (or `Owner.field` when static), written by an
    /// assignment statement.
    FieldAccess {
        source: Option<VarId>,
        field: Arc<Operation>,
    },
    /// A literal written directly into the sequence.
    Constant,
}

/// Typed result handle of exactly one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    pub ty: TypeRef,
    pub kind: VariableKind,
    /// Recursion depth at which the variable was created. Receiver selection
    /// for insertion prefers small distances.
    pub distance: usize,
}

impl Variable {
    /// The owning array or object of a cell or field access.
    ///
    /// It must be defined before the variable itself.
    pub fn back_reference(&self) -> Option<VarId> {
        match &self.kind {
            VariableKind::ArrayCell { array, .. } => Some(*array),
            VariableKind::FieldAccess { source, .. } => *source,
            _ => None,
        }
    }

    pub fn is_array_cell(&self) -> bool {
        matches!(self.kind, VariableKind::ArrayCell { .. })
    }

    pub fn is_field_access(&self) -> bool {
        matches!(self.kind, VariableKind::FieldAccess { .. })
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, VariableKind::Constant)
    }

    /// Point the back-reference at `owner`. No-op for plain values.
    pub(crate) fn set_back_reference(&mut self, owner: VarId) {
        match &mut self.kind {
            VariableKind::ArrayCell { array, .. } => *array = owner,
            VariableKind::FieldAccess { source, .. } => {
                if source.is_some() {
                    *source = Some(owner);
                }
            }
            _ => {}
        }
    }
}
