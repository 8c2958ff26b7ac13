//! Graceful and hard deletion.
//!
//! ```text
//!   0  Foo foo0 = new Foo();
//!   1  Foo foo1 = new Foo();        <- delete
//!   2  foo1.setX(int0);
//!
//!   graceful:  foo0 is an alternative, so #2 becomes foo0.setX(int0) and
//!              only #1 is removed
//!   hard:      #1 and every statement depending on it are removed
//! ```

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use seqforge_types::{Catalog, TypeRef};
use tracing::trace;

use crate::errors::{EngineError, EngineResult};
use crate::sequence::{Sequence, StatementKind, VarId, VariableKind};

/// Delete the statement at `position`, rewiring dependents to alternative
/// values of a compatible type where possible and hard-deleting whatever
/// still depends on it afterwards.
///
/// Atomic: on error `seq` is unchanged. Returns the removed positions
/// (before removal); `{position}` alone means every dependent was rewired.
pub fn delete_gracefully<R: Rng + ?Sized>(
    seq: &mut Sequence,
    position: usize,
    catalog: &dyn Catalog,
    rng: &mut R,
) -> EngineResult<BTreeSet<usize>> {
    let var = seq
        .variable_at(position)
        .cloned()
        .ok_or_else(|| EngineError::structural(position, "no statement to delete"))?;
    if var.is_array_cell() {
        return hard_delete(seq, position);
    }

    let mut work = seq.clone();
    let target_is_primitive = work.is_primitive(var.id);
    let alternatives: Vec<VarId> = work
        .objects_before(catalog, &var.ty, position)
        .into_iter()
        .filter(|&id| id != var.id)
        .filter(|&id| work.variable(id).and_then(|v| v.back_reference()) != Some(var.id))
        .filter(|&id| target_is_primitive || !work.is_primitive(id))
        .filter(|&id| match work.array_length(id) {
            Some(length) => work.max_cell_index(var.id).map_or(true, |max| length > max),
            None => true,
        })
        .collect();

    if !alternatives.is_empty() {
        rewire_dependents(&mut work, catalog, rng, var.id, position, &alternatives);
    }
    if var.ty.is_array() {
        rewire_cell_uses(&mut work, catalog, rng, var.id, &var.ty, position);
    }

    let removed = work.remove_with_dependents(position)?;
    work.validate()?;
    trace!(position, removed = removed.len(), "deleted statement");
    *seq = work;
    Ok(removed)
}

/// Remove the statement at `position` and the transitive closure of its
/// dependents.
pub fn hard_delete(seq: &mut Sequence, position: usize) -> EngineResult<BTreeSet<usize>> {
    seq.remove_with_dependents(position)
}

fn rewire_dependents<R: Rng + ?Sized>(
    seq: &mut Sequence,
    catalog: &dyn Catalog,
    rng: &mut R,
    target: VarId,
    position: usize,
    alternatives: &[VarId],
) {
    for pos in position + 1..seq.len() {
        let Some(stmt) = seq.statement(pos) else {
            continue;
        };
        if !stmt.references_var(target) {
            continue;
        }
        let Some(&choice) = alternatives.choose(rng) else {
            return;
        };
        let result_ty = stmt.result.ty.clone();
        let writes_value = matches!(stmt.kind, StatementKind::Assignment { value } if value == target);
        let owned_by_target = stmt.result.back_reference() == Some(target);
        let index = match stmt.result.kind {
            VariableKind::ArrayCell { index, .. } => Some(index),
            _ => None,
        };
        let field_owner = match &stmt.result.kind {
            VariableKind::FieldAccess { field, .. } => Some(field.owner.clone()),
            _ => None,
        };

        let choice_ty = seq.type_of(choice).cloned();
        let value_ok = !writes_value
            || choice_ty
                .as_ref()
                .is_some_and(|t| catalog.is_assignable(t, &result_ty));
        let owner_ok = !owned_by_target
            || match (index, &field_owner) {
                (Some(i), _) => seq.array_length(choice).is_some_and(|len| len > i),
                (None, Some(owner)) => choice_ty
                    .as_ref()
                    .is_some_and(|t| catalog.is_assignable(t, owner)),
                (None, None) => false,
            };
        if !(value_ok && owner_ok) {
            continue;
        }

        if let Some(stmt) = seq.statement_mut(pos) {
            stmt.replace_operand(target, choice);
            if owned_by_target {
                stmt.result.set_back_reference(choice);
            }
        }
    }
}

/// Uses of the deleted array's cells are redirected to other values of the
/// component type. The cell assignments themselves go with the array.
fn rewire_cell_uses<R: Rng + ?Sized>(
    seq: &mut Sequence,
    catalog: &dyn Catalog,
    rng: &mut R,
    array: VarId,
    array_ty: &TypeRef,
    position: usize,
) {
    let Some(component) = array_ty.component() else {
        return;
    };
    let cells: Vec<VarId> = seq
        .iter()
        .filter(|s| matches!(s.result.kind, VariableKind::ArrayCell { array: a, .. } if a == array))
        .map(|s| s.id())
        .collect();
    if cells.is_empty() {
        return;
    }
    let alternatives: Vec<VarId> = seq
        .objects_before(catalog, component, position)
        .into_iter()
        .filter(|id| !cells.contains(id))
        .collect();
    for pos in position + 1..seq.len() {
        for &cell in &cells {
            let uses = seq
                .statement(pos)
                .is_some_and(|s| s.operands().contains(&cell));
            if !uses {
                continue;
            }
            let Some(&choice) = alternatives.choose(rng) else {
                return;
            };
            if let Some(stmt) = seq.statement_mut(pos) {
                stmt.replace_operand(cell, choice);
            }
        }
    }
}
