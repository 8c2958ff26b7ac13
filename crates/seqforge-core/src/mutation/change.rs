//! The change stage: in-place value mutation and whole-call replacement.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use seqforge_types::{Operation, OperationKind, TypeRef};
use tracing::trace;

use crate::errors::EngineResult;
use crate::resolver::Resolver;
use crate::sequence::{Literal, Sequence, Statement, StatementKind, VarId, VariableKind};

/// Mutate the statement at `position` without changing what kind of
/// statement it is. Returns whether anything changed.
pub fn mutate_in_place(resolver: &mut Resolver<'_>, seq: &mut Sequence, position: usize) -> EngineResult<bool> {
    let Some(stmt) = seq.statement(position).cloned() else {
        return Ok(false);
    };
    let replacement = match &stmt.kind {
        StatementKind::Literal(literal) => mutate_literal(resolver, &stmt, literal).map(StatementKind::Literal),
        StatementKind::Null => None,
        StatementKind::Constructor { .. } | StatementKind::Method { .. } | StatementKind::Field { .. } => {
            let p = resolver.config().p_change_parameter;
            if !resolver.rng_mut().gen_bool(p) {
                return Ok(false);
            }
            mutate_operand(resolver, seq, &stmt, position)
        }
        StatementKind::Array { length } => {
            let needed = seq.max_cell_index(stmt.id()).map_or(1, |max| max + 1).max(1);
            let max = resolver.config().max_array_length.max(needed);
            let choices: Vec<usize> = (needed..=max).filter(|l| l != length).collect();
            choices
                .choose(resolver.rng_mut())
                .map(|&length| StatementKind::Array { length })
        }
        StatementKind::Assignment { value } => rebind_assignment(resolver, seq, &stmt, *value, position),
    };
    let Some(kind) = replacement else {
        return Ok(false);
    };
    seq.replace_kind(position, kind)?;
    trace!(position, kind = stmt.label(), "changed statement in place");
    Ok(true)
}

/// Replace the statement at `position` with a call to a different operation
/// returning exactly the same type, with arguments drawn from the prefix.
///
/// Assignments and void calls are never replaced.
pub fn change_random_call(resolver: &mut Resolver<'_>, seq: &mut Sequence, position: usize) -> EngineResult<bool> {
    let Some(stmt) = seq.statement(position).cloned() else {
        return Ok(false);
    };
    if stmt.is_assignment() || stmt.result.ty.is_void() {
        return Ok(false);
    }
    let ty = &stmt.result.ty;
    let catalog = resolver.catalog();
    let constraints = resolver.constraints();
    let current = stmt.operation().map(|op| op.id);

    let candidates: Vec<Arc<Operation>> = catalog
        .generators_for(ty)
        .into_iter()
        .filter(|op| op.returns == *ty)
        .filter(|op| !op.requires_instantiation())
        .filter(|op| !(Some(op.id) == current && !op.params.is_empty()))
        .filter(|op| dependencies_satisfied(resolver, seq, op, position))
        .filter(|op| constraints.is_eligible(op, None, seq, position))
        .collect();
    let Some(op) = candidates.choose(resolver.rng_mut()).cloned() else {
        return Ok(false);
    };

    let receiver = if op.needs_receiver() {
        let receivers = receivers_before(resolver, seq, &op.owner, position);
        match receivers.choose(resolver.rng_mut()) {
            Some(&r) => Some(r),
            None => return Ok(false),
        }
    } else {
        None
    };
    let mut args = Vec::with_capacity(op.params.len());
    for param in &op.params {
        let objects = seq.objects_before(catalog, param, position);
        match objects.choose(resolver.rng_mut()) {
            Some(&arg) => args.push(arg),
            None => return Ok(false),
        }
    }

    let kind = match op.kind {
        OperationKind::Constructor => StatementKind::Constructor {
            op: Arc::clone(&op),
            args,
        },
        OperationKind::Method => StatementKind::Method {
            op: Arc::clone(&op),
            receiver,
            args,
        },
        OperationKind::Field => StatementKind::Field {
            op: Arc::clone(&op),
            source: receiver,
        },
    };
    seq.replace_kind(position, kind)?;
    trace!(position, op = %op, "replaced call");
    Ok(true)
}

fn dependencies_satisfied(resolver: &Resolver<'_>, seq: &Sequence, op: &Operation, position: usize) -> bool {
    if op.needs_receiver() && receivers_before(resolver, seq, &op.owner, position).is_empty() {
        return false;
    }
    op.params
        .iter()
        .all(|p| !seq.objects_before(resolver.catalog(), p, position).is_empty())
}

/// Non-null, non-literal objects usable as a receiver of `owner`.
fn receivers_before(resolver: &Resolver<'_>, seq: &Sequence, owner: &TypeRef, position: usize) -> Vec<VarId> {
    seq.non_null_objects_before(resolver.catalog(), owner, position)
        .into_iter()
        .filter(|&id| !seq.is_primitive(id))
        .collect()
}

fn mutate_literal(resolver: &mut Resolver<'_>, stmt: &Statement, literal: &Literal) -> Option<Literal> {
    match literal {
        Literal::EnumConstant(current) => {
            let TypeRef::Enum(name) = &stmt.result.ty else {
                return None;
            };
            let others: Vec<String> = resolver
                .catalog()
                .enum_constants(name)
                .into_iter()
                .filter(|c| c != current)
                .collect();
            others.choose(resolver.rng_mut()).cloned().map(Literal::EnumConstant)
        }
        Literal::Type(current) => {
            let others: Vec<TypeRef> = resolver
                .type_pool()
                .types()
                .filter(|t| *t != current)
                .cloned()
                .collect();
            others.choose(resolver.rng_mut()).cloned().map(Literal::Type)
        }
        other => resolver.perturb_literal(other),
    }
}

/// Swap one receiver, source or argument for another compatible variable
/// defined before `position`.
fn mutate_operand(
    resolver: &mut Resolver<'_>,
    seq: &Sequence,
    stmt: &Statement,
    position: usize,
) -> Option<StatementKind> {
    let mut kind = stmt.kind.clone();
    let op = stmt.operation()?.clone();
    let slots = stmt.operands();
    if slots.is_empty() {
        return None;
    }
    let slot = resolver.rng_mut().gen_range(0..slots.len());
    let current = slots[slot];
    let has_receiver = op.needs_receiver();

    let alternatives: Vec<VarId> = if has_receiver && slot == 0 {
        receivers_before(resolver, seq, &op.owner, position)
    } else {
        let param_index = if has_receiver { slot - 1 } else { slot };
        let declared = op.params.get(param_index)?;
        let expected = if declared.has_type_vars() {
            seq.type_of(current)?.clone()
        } else {
            declared.clone()
        };
        seq.objects_before(resolver.catalog(), &expected, position)
    };
    // The receiver and the arguments of one call stay distinct.
    let taken: Vec<VarId> = match (has_receiver, slot) {
        (false, _) => Vec::new(),
        (true, 0) => slots.iter().skip(1).copied().collect(),
        (true, _) => vec![slots[0]],
    };
    let alternatives: Vec<VarId> = alternatives
        .into_iter()
        .filter(|&id| id != current && !taken.contains(&id))
        .collect();
    let &choice = alternatives.choose(resolver.rng_mut())?;

    match &mut kind {
        StatementKind::Constructor { args, .. } => {
            *args.get_mut(slot)? = choice;
        }
        StatementKind::Method { receiver, args, .. } => {
            if has_receiver && slot == 0 {
                *receiver = Some(choice);
            } else {
                let index = if has_receiver { slot - 1 } else { slot };
                *args.get_mut(index)? = choice;
            }
        }
        StatementKind::Field { source, .. } => {
            *source = Some(choice);
        }
        _ => return None,
    }
    Some(kind)
}

/// Point an assignment at a different value of its target's type.
fn rebind_assignment(
    resolver: &mut Resolver<'_>,
    seq: &Sequence,
    stmt: &Statement,
    current: VarId,
    position: usize,
) -> Option<StatementKind> {
    let owner = stmt.result.back_reference();
    let alternatives: Vec<VarId> = seq
        .objects_before(resolver.catalog(), &stmt.result.ty, position)
        .into_iter()
        .filter(|&id| id != current && Some(id) != owner)
        .filter(|&id| match (seq.variable(id).map(|v| &v.kind), &stmt.result.kind) {
            (
                Some(VariableKind::FieldAccess { source: a, field: f }),
                VariableKind::FieldAccess { source: b, field: g },
            ) => !(a == b && f.id == g.id),
            _ => true,
        })
        .collect();
    alternatives
        .choose(resolver.rng_mut())
        .map(|&value| StatementKind::Assignment { value })
}
