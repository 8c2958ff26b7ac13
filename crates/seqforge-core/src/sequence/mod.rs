//! The sequence model: positionally ordered statements and the dependency
//! relation derived from them.
//!
//! ## Layout
//!
//! ```text
//!   position   id    statement
//!   0          v0    Foo foo0 = new Foo();
//!   1          v1    int int0 = 5;
//!   2          v2    foo0.setX(int0);           references v0, v1
//!   3          v3    int[] intArray0 = new int[2];
//!   4          v4    intArray0[0] = int0;       references v1, back-reference v3
//! ```
//!
//! Statements refer to variables by [`VarId`]. Positions are never stored
//! inside statements, so inserting or removing a statement needs no
//! renumbering and cloning a sequence is a plain structural copy.
//!
//! ## Invariant
//!
//! Every variable a statement references (operands and the back-reference
//! of its own result) is defined at a strictly smaller position. Structural
//! edits check this and fail with [`EngineError::StructuralInvalid`].

mod statement;
mod variable;

pub use statement::{Literal, Statement, StatementKind};
pub use variable::{VarId, Variable, VariableKind};

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use seqforge_types::{Catalog, TypeRef};

use crate::errors::{EngineError, EngineResult};
use crate::render::{PseudoCodeRenderer, Renderer};

/// Marks where a speculative construction started so it can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    position: usize,
    len: usize,
}

/// An ordered list of statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    statements: Vec<Statement>,
    next_id: u32,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn statement(&self, position: usize) -> Option<&Statement> {
        self.statements.get(position)
    }

    pub(crate) fn statement_mut(&mut self, position: usize) -> Option<&mut Statement> {
        self.statements.get_mut(position)
    }

    // =========================================================================
    // Variable lookup
    // =========================================================================

    /// Position of the statement defining `id`.
    pub fn position_of(&self, id: VarId) -> Option<usize> {
        self.statements.iter().position(|s| s.id() == id)
    }

    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.statements
            .iter()
            .find(|s| s.id() == id)
            .map(|s| &s.result)
    }

    pub(crate) fn variable_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.statements
            .iter_mut()
            .find(|s| s.id() == id)
            .map(|s| &mut s.result)
    }

    pub fn variable_at(&self, position: usize) -> Option<&Variable> {
        self.statements.get(position).map(|s| &s.result)
    }

    /// Statement defining `id`.
    pub fn definition(&self, id: VarId) -> Option<&Statement> {
        self.statements.iter().find(|s| s.id() == id)
    }

    pub fn type_of(&self, id: VarId) -> Option<&TypeRef> {
        self.variable(id).map(|v| &v.ty)
    }

    pub fn is_null(&self, id: VarId) -> bool {
        self.definition(id).is_some_and(Statement::is_null)
    }

    /// Literal or null definition.
    pub fn is_primitive(&self, id: VarId) -> bool {
        self.definition(id).is_some_and(Statement::is_primitive)
    }

    /// Length of the array defined by `id`, if it is an array allocation.
    pub fn array_length(&self, id: VarId) -> Option<usize> {
        self.definition(id).and_then(Statement::array_length)
    }

    /// Variables defined before `position` whose type can be used where `ty`
    /// is expected. Void results never qualify.
    pub fn objects_before(&self, catalog: &dyn Catalog, ty: &TypeRef, position: usize) -> Vec<VarId> {
        let end = position.min(self.statements.len());
        self.statements[..end]
            .iter()
            .filter(|s| !s.result.ty.is_void())
            .filter(|s| catalog.is_assignable(&s.result.ty, ty))
            .map(Statement::id)
            .collect()
    }

    /// Like [`objects_before`](Self::objects_before) without `null` values.
    pub fn non_null_objects_before(
        &self,
        catalog: &dyn Catalog,
        ty: &TypeRef,
        position: usize,
    ) -> Vec<VarId> {
        self.objects_before(catalog, ty, position)
            .into_iter()
            .filter(|&id| !self.is_null(id))
            .collect()
    }

    pub fn has_object(&self, catalog: &dyn Catalog, ty: &TypeRef, position: usize) -> bool {
        !self.non_null_objects_before(catalog, ty, position).is_empty()
    }

    // =========================================================================
    // Dependency queries
    // =========================================================================

    /// Transitive dependencies of `id` (not including `id` itself).
    pub fn dependencies(&self, id: VarId) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        let mut pending: Vec<VarId> = self
            .definition(id)
            .map(|s| s.references().to_vec())
            .unwrap_or_default();
        while let Some(dep) = pending.pop() {
            if out.insert(dep) {
                if let Some(stmt) = self.definition(dep) {
                    pending.extend(stmt.references());
                }
            }
        }
        out
    }

    /// Positions of statements referencing `id` directly.
    pub fn direct_dependents(&self, id: VarId) -> Vec<usize> {
        self.statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.references_var(id))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// The statement at `position` plus every later statement depending on
    /// it, directly or via back-references.
    ///
    /// Dependencies always point backwards, so one forward pass suffices.
    pub fn dependent_closure(&self, position: usize) -> BTreeSet<usize> {
        let mut positions = BTreeSet::new();
        let Some(root) = self.statements.get(position) else {
            return positions;
        };
        let mut removed: HashSet<VarId> = HashSet::new();
        removed.insert(root.id());
        positions.insert(position);
        for (pos, stmt) in self.statements.iter().enumerate().skip(position + 1) {
            if stmt.references().iter().any(|r| removed.contains(r)) {
                removed.insert(stmt.id());
                positions.insert(pos);
            }
        }
        positions
    }

    /// Position of the last statement referencing `id`, or its own position
    /// when nothing uses it.
    pub fn last_use_position(&self, id: VarId) -> Option<usize> {
        let own = self.position_of(id)?;
        Some(
            self.direct_dependents(id)
                .into_iter()
                .max()
                .map_or(own, |p| p.max(own)),
        )
    }

    /// Highest cell index written for the array `array`.
    pub fn max_cell_index(&self, array: VarId) -> Option<usize> {
        self.statements
            .iter()
            .filter_map(|s| match s.result.kind {
                VariableKind::ArrayCell { array: a, index } if a == array => Some(index),
                _ => None,
            })
            .max()
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    fn fresh_id(&mut self) -> VarId {
        let id = VarId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_references(&self, stmt: &Statement, position: usize) -> EngineResult<()> {
        for r in stmt.references() {
            match self.position_of(r) {
                Some(p) if p < position => {}
                Some(p) => {
                    return Err(EngineError::structural(
                        position,
                        format!("{} is defined at #{}, after its use", r, p),
                    ))
                }
                None => {
                    return Err(EngineError::structural(
                        position,
                        format!("{} is not defined", r),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Insert a statement at `position`, allocating its result id.
    pub fn insert(
        &mut self,
        position: usize,
        kind: StatementKind,
        ty: TypeRef,
        var_kind: VariableKind,
        distance: usize,
    ) -> EngineResult<VarId> {
        if position > self.statements.len() {
            return Err(EngineError::structural(
                position,
                format!("insert past end of sequence of length {}", self.len()),
            ));
        }
        let id = VarId(self.next_id);
        let stmt = Statement::new(
            kind,
            Variable {
                id,
                ty,
                kind: var_kind,
                distance,
            },
        );
        self.check_references(&stmt, position)?;
        self.fresh_id();
        self.statements.insert(position, stmt);
        Ok(id)
    }

    /// Append a statement.
    pub fn push(
        &mut self,
        kind: StatementKind,
        ty: TypeRef,
        var_kind: VariableKind,
        distance: usize,
    ) -> EngineResult<VarId> {
        self.insert(self.len(), kind, ty, var_kind, distance)
    }

    /// Replace what the statement at `position` does, keeping its result id
    /// and type.
    pub fn replace_kind(&mut self, position: usize, kind: StatementKind) -> EngineResult<()> {
        let current = self
            .statements
            .get(position)
            .ok_or_else(|| EngineError::structural(position, "no statement to replace"))?;
        let mut result = current.result.clone();
        if matches!(kind, StatementKind::Literal(_)) {
            result.kind = VariableKind::Constant;
        } else if result.is_constant() {
            result.kind = VariableKind::Value;
        }
        let stmt = Statement::new(kind, result);
        self.check_references(&stmt, position)?;
        self.statements[position] = stmt;
        Ok(())
    }

    /// Drop every statement at or after `len`. Always structurally safe.
    pub fn truncate(&mut self, len: usize) {
        self.statements.truncate(len);
    }

    /// Hard delete: remove the statement at `position` together with the
    /// transitive closure of its dependents, highest position first.
    ///
    /// Returns the removed positions (as they were before removal).
    pub fn remove_with_dependents(&mut self, position: usize) -> EngineResult<BTreeSet<usize>> {
        if position >= self.statements.len() {
            return Err(EngineError::structural(position, "no statement to delete"));
        }
        let closure = self.dependent_closure(position);
        for &pos in closure.iter().rev() {
            self.statements.remove(pos);
        }
        Ok(closure)
    }

    /// Copy of positions `[0, cut)`.
    pub fn prefix(&self, cut: usize) -> Sequence {
        let end = cut.min(self.statements.len());
        Sequence {
            statements: self.statements[..end].to_vec(),
            next_id: self.next_id,
        }
    }

    /// Record the current state before inserting at `position`.
    pub fn checkpoint(&self, position: usize) -> Checkpoint {
        Checkpoint {
            position,
            len: self.statements.len(),
        }
    }

    /// Undo every statement added since `checkpoint`, in reverse order.
    ///
    /// All insertions made after a checkpoint land contiguously starting at
    /// its position, so the block `[position, position + added)` is exactly
    /// what was added.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let added = self.statements.len().saturating_sub(checkpoint.len);
        for offset in (0..added).rev() {
            self.statements.remove(checkpoint.position + offset);
        }
    }

    /// Number of statements added since `checkpoint`.
    pub fn added_since(&self, checkpoint: Checkpoint) -> usize {
        self.statements.len().saturating_sub(checkpoint.len)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check ids are unique and every reference precedes its use.
    pub fn validate(&self) -> EngineResult<()> {
        let mut defined: HashSet<VarId> = HashSet::with_capacity(self.statements.len());
        for (pos, stmt) in self.statements.iter().enumerate() {
            for r in stmt.references() {
                if !defined.contains(&r) {
                    return Err(EngineError::structural(
                        pos,
                        format!("{} {} references {} before its definition", stmt.label(), stmt.id(), r),
                    ));
                }
            }
            if stmt.id().0 >= self.next_id {
                return Err(EngineError::structural(
                    pos,
                    format!("{} was not allocated by this sequence", stmt.id()),
                ));
            }
            if !defined.insert(stmt.id()) {
                return Err(EngineError::structural(
                    pos,
                    format!("{} is defined twice", stmt.id()),
                ));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&PseudoCodeRenderer.render(self, &Default::default()))
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{foo_catalog, foo_set_x_sequence};
    use std::sync::Arc;

    #[test]
    fn test_insert_rejects_forward_reference() {
        let (catalog, ops) = foo_catalog();
        let mut seq = Sequence::new();
        let foo = seq
            .push(
                StatementKind::Constructor {
                    op: ops.new_foo.clone(),
                    args: vec![],
                },
                TypeRef::class("Foo"),
                VariableKind::Value,
                0,
            )
            .unwrap();
        let err = seq
            .insert(
                0,
                StatementKind::Method {
                    op: ops.set_x.clone(),
                    receiver: Some(foo),
                    args: vec![],
                },
                TypeRef::Void,
                VariableKind::Value,
                0,
            )
            .unwrap_err();
        assert!(err.is_structural(), "got {:?}", err);
        assert_eq!(seq.len(), 1, "failed insert must not change the sequence");
        assert!(seq.objects_before(&catalog, &TypeRef::class("Foo"), 1).contains(&foo));
    }

    #[test]
    fn test_dependent_closure_follows_back_references() {
        let (catalog, _) = foo_catalog();
        let mut seq = Sequence::new();
        let len = seq
            .push(
                StatementKind::Literal(Literal::Int(3)),
                TypeRef::int(),
                VariableKind::Constant,
                0,
            )
            .unwrap();
        let arr = seq
            .push(
                StatementKind::Array { length: 2 },
                TypeRef::array(TypeRef::int()),
                VariableKind::Value,
                0,
            )
            .unwrap();
        let cell = seq
            .push(
                StatementKind::Assignment { value: len },
                TypeRef::int(),
                VariableKind::ArrayCell { array: arr, index: 1 },
                0,
            )
            .unwrap();
        let other = seq
            .push(
                StatementKind::Literal(Literal::Int(4)),
                TypeRef::int(),
                VariableKind::Constant,
                0,
            )
            .unwrap();

        assert_eq!(seq.dependent_closure(1), BTreeSet::from([1, 2]));
        assert_eq!(seq.dependencies(cell), BTreeSet::from([len, arr]));
        assert_eq!(seq.max_cell_index(arr), Some(1));
        assert_eq!(seq.last_use_position(len), Some(2));
        assert_eq!(seq.last_use_position(other), Some(3));

        let removed = seq.remove_with_dependents(1).unwrap();
        assert_eq!(removed, BTreeSet::from([1, 2]));
        assert_eq!(seq.len(), 2);
        assert!(seq.is_valid());
        assert_eq!(
            seq.objects_before(&catalog, &TypeRef::int(), 2),
            vec![len, other]
        );
    }

    #[test]
    fn test_hard_delete_of_literal_removes_call() {
        let (seq, ids) = foo_set_x_sequence();
        let mut seq = seq;
        let removed = seq.remove_with_dependents(1).unwrap();
        assert_eq!(removed, BTreeSet::from([1, 2]));
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.statement(0).map(Statement::id), Some(ids[0]));
    }

    #[test]
    fn test_checkpoint_rollback_restores_exactly() {
        let (mut seq, _) = foo_set_x_sequence();
        let before = seq.clone();
        let cp = seq.checkpoint(1);
        seq.insert(
            1,
            StatementKind::Literal(Literal::Int(9)),
            TypeRef::int(),
            VariableKind::Constant,
            0,
        )
        .unwrap();
        seq.insert(
            2,
            StatementKind::Literal(Literal::Boolean(true)),
            TypeRef::Primitive(seqforge_types::Primitive::Boolean),
            VariableKind::Constant,
            0,
        )
        .unwrap();
        assert_eq!(seq.added_since(cp), 2);
        seq.rollback(cp);
        assert_eq!(seq.statements(), before.statements());
    }

    #[test]
    fn test_replace_kind_keeps_identity() {
        let (_, ops) = foo_catalog();
        let (mut seq, ids) = foo_set_x_sequence();
        seq.replace_kind(1, StatementKind::Literal(Literal::Int(-1)))
            .unwrap();
        assert_eq!(seq.statement(1).map(Statement::id), Some(ids[1]));
        let err = seq
            .replace_kind(
                0,
                StatementKind::Method {
                    op: Arc::clone(&ops.set_x),
                    receiver: Some(ids[0]),
                    args: vec![ids[1]],
                },
            )
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_validate_and_prefix() {
        let (seq, _) = foo_set_x_sequence();
        assert!(seq.validate().is_ok());
        let head = seq.prefix(2);
        assert_eq!(head.len(), 2);
        assert!(head.is_valid());
        assert!(seq.to_string().contains("setX"));
    }
}
