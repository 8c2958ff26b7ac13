//! Random statement insertion: the mutation insert stage and initial
//! sequence construction both grow sequences through here.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use seqforge_types::{Operation, OperationKind, TypeRef};
use tracing::{debug, trace};

use super::{check_position, ResolveContext, Resolver};
use crate::errors::{EngineError, EngineResult};
use crate::sequence::{Sequence, VarId};

impl<'c> Resolver<'c> {
    /// Insert a random call on the target type at `position`.
    ///
    /// Returns the position of the last inserted statement.
    pub fn insert_random_call(&mut self, seq: &mut Sequence, position: usize) -> EngineResult<usize> {
        check_position(seq, position)?;
        let before = seq.len();
        let checkpoint = seq.checkpoint(position);
        let mut ctx = ResolveContext::new();
        match self.random_target_call(&mut ctx, seq, position) {
            Ok(()) => Ok(position + (seq.len() - before).saturating_sub(1)),
            Err(e) => {
                seq.rollback(checkpoint);
                debug!(position, error = %e, "random call insertion failed");
                Err(e)
            }
        }
    }

    /// Insert a random call that uses `var` as receiver or source at
    /// `position`. On an array this assigns every cell instead.
    ///
    /// Returns the position of the last inserted statement.
    pub fn insert_random_call_on_object(
        &mut self,
        seq: &mut Sequence,
        var: VarId,
        position: usize,
    ) -> EngineResult<usize> {
        check_position(seq, position)?;
        let ty = seq
            .type_of(var)
            .cloned()
            .ok_or_else(|| EngineError::structural(position, format!("{} is not defined", var)))?;
        let before = seq.len();
        let checkpoint = seq.checkpoint(position);
        let mut ctx = ResolveContext::new();
        let result = if ty.is_array() {
            self.random_array_assignment(&mut ctx, seq, var, &ty, position)
        } else {
            self.random_call_on(&mut ctx, seq, var, &ty, position)
        };
        match result {
            Ok(()) => Ok(position + (seq.len() - before).saturating_sub(1)),
            Err(e) => {
                seq.rollback(checkpoint);
                debug!(var = %var, position, error = %e, "call insertion on object failed");
                Err(e)
            }
        }
    }

    /// Grow `seq` by one random call, placed no later than just after
    /// `last_position`.
    ///
    /// With probability `insertion_uut_probability` (or when no receiver is
    /// available) this is a call on the target type at a random position.
    /// Otherwise a receiver is picked by [`select_receiver_for_call`] and the
    /// call lands between its definition and its last use.
    ///
    /// Returns the position of the last inserted statement, or `None` when
    /// nothing could be inserted.
    ///
    /// [`select_receiver_for_call`]: Resolver::select_receiver_for_call
    pub fn insert_random_statement(
        &mut self,
        seq: &mut Sequence,
        last_position: Option<usize>,
    ) -> EngineResult<Option<usize>> {
        let has_targets = !self.catalog.target_calls().is_empty();
        let upper = last_position.map_or(0, |p| p + 1).min(seq.len());

        let use_target = has_targets && self.rng.gen_bool(self.config.insertion_uut_probability);
        let receiver = if use_target {
            None
        } else {
            last_position.and_then(|cutoff| self.select_receiver_for_call(seq, cutoff))
        };

        let attempt = match receiver {
            Some(var) => {
                let def = seq.position_of(var).unwrap_or(0);
                let last_use = seq.last_use_position(var).unwrap_or(def);
                let hi = last_use.max(def + 1).min(seq.len());
                let position = self.rng.gen_range(def + 1..=hi);
                trace!(var = %var, position, "inserting call on existing object");
                self.insert_random_call_on_object(seq, var, position)
            }
            None if has_targets => {
                let position = self.rng.gen_range(0..=upper);
                self.insert_random_call(seq, position)
            }
            None => return Ok(None),
        };
        match attempt {
            Ok(pos) => Ok(Some(pos)),
            Err(e) if e.is_construction_failure() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Roulette-wheel choice among non-null reference variables at or before
    /// `cutoff`, weighted `1 / (1 + distance)`.
    pub fn select_receiver_for_call(&mut self, seq: &Sequence, cutoff: usize) -> Option<VarId> {
        let candidates: Vec<(VarId, usize)> = seq
            .iter()
            .take(cutoff + 1)
            .filter(|s| !s.is_null())
            .filter(|s| !s.result.ty.is_void() && !s.result.ty.is_primitive_like())
            .map(|s| (s.id(), s.result.distance))
            .collect();
        let weights = candidates.iter().map(|(_, d)| 1.0 / (1.0 + *d as f64));
        let index = WeightedIndex::new(weights).ok()?.sample(&mut self.rng);
        candidates.get(index).map(|(id, _)| *id)
    }

    /// A fresh sequence of about `length` statements.
    ///
    /// Stops after `max_initial_attempts` insertion attempts even if the
    /// length has not been reached.
    pub fn random_sequence(&mut self, length: usize) -> EngineResult<Sequence> {
        let mut seq = Sequence::new();
        let mut attempts = 0;
        while seq.len() < length && attempts < self.config.max_initial_attempts {
            attempts += 1;
            let last = seq.len().checked_sub(1);
            self.insert_random_statement(&mut seq, last)?;
        }
        if self.config.check_max_length && seq.len() > self.config.max_length {
            seq.truncate(self.config.max_length);
        }
        if seq.len() < length {
            debug!(length, reached = seq.len(), attempts, "random sequence shorter than requested");
        }
        Ok(seq)
    }

    /// [`random_sequence`](Self::random_sequence) with a length drawn
    /// uniformly from `1..=max_length`.
    pub fn random_sequence_of_random_length(&mut self) -> EngineResult<Sequence> {
        let length = self.rng.gen_range(1..=self.config.max_length.max(1));
        self.random_sequence(length)
    }

    // ---- Internals ----

    fn random_target_call(&mut self, ctx: &mut ResolveContext, seq: &mut Sequence, position: usize) -> EngineResult<()> {
        let calls: Vec<Arc<Operation>> = self
            .catalog
            .target_calls()
            .into_iter()
            .filter(|op| self.constraints.is_eligible(op, None, seq, position))
            .collect();
        let op = calls
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| EngineError::construction("no eligible call on the target type"))?;
        trace!(op = %op, position, "inserting target call");

        match op.kind {
            OperationKind::Constructor => {
                self.add_constructor(ctx, seq, &op, None, position, 0)?;
            }
            OperationKind::Method if !op.needs_receiver() => {
                self.add_method(ctx, seq, &op, position, 0)?;
            }
            OperationKind::Method => {
                let (receiver, position) = self.acquire_receiver(ctx, seq, &op, position)?;
                let distance = seq.variable(receiver).map_or(0, |v| v.distance + 1);
                self.method_on(ctx, seq, &op, Some(receiver), position, 0, distance)?;
            }
            OperationKind::Field => {
                let (source, position) = if op.needs_receiver() {
                    let (r, p) = self.acquire_receiver(ctx, seq, &op, position)?;
                    (Some(r), p)
                } else {
                    (None, position)
                };
                if self.rng.gen_bool(0.5) {
                    self.emit_field_assignment(ctx, seq, &op, source, position, 0)?;
                } else {
                    self.emit_field_read(ctx, seq, &op, source, position, 0)?;
                }
            }
        }
        Ok(())
    }

    /// An existing non-null, non-literal receiver for `op`, or a freshly
    /// created one. Returns it with the shifted insertion position.
    fn acquire_receiver(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Operation,
        position: usize,
    ) -> EngineResult<(VarId, usize)> {
        let owner = self.concretize(ctx, &op.owner)?;
        let existing: Vec<VarId> = seq
            .non_null_objects_before(self.catalog, &owner, position)
            .into_iter()
            .filter(|&id| !seq.is_primitive(id))
            .collect();
        if let Some(&receiver) = existing.choose(&mut self.rng) {
            return Ok((receiver, position));
        }
        let before = seq.len();
        let receiver = self.create_object(ctx, seq, &owner, position, 1)?;
        Ok((receiver, position + (seq.len() - before)))
    }

    fn random_call_on(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        var: VarId,
        ty: &TypeRef,
        position: usize,
    ) -> EngineResult<()> {
        let calls: Vec<Arc<Operation>> = self
            .catalog
            .calls_for(ty)
            .into_iter()
            .filter(|op| self.constraints.is_eligible(op, Some(var), seq, position))
            .collect();
        let op = calls
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| EngineError::construction(format!("no eligible call on {}", ty)))?;
        let distance = seq.variable(var).map_or(0, |v| v.distance + 1);
        match op.kind {
            OperationKind::Field if self.rng.gen_bool(0.5) => {
                self.emit_field_assignment(ctx, seq, &op, Some(var), position, 0)?;
            }
            OperationKind::Field => {
                self.emit_field_read(ctx, seq, &op, Some(var), position, 0)?;
            }
            _ => {
                self.method_on(ctx, seq, &op, Some(var), position, 0, distance)?;
            }
        }
        Ok(())
    }

    fn random_array_assignment(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        array: VarId,
        ty: &TypeRef,
        position: usize,
    ) -> EngineResult<()> {
        let length = seq
            .array_length(array)
            .ok_or_else(|| EngineError::construction(format!("length of {} is unknown", array)))?;
        if length == 0 {
            return Err(EngineError::construction(format!("{} has no cells", array)));
        }
        let distance = seq.variable(array).map_or(0, |v| v.distance + 1);
        self.assign_cells(ctx, seq, array, ty, length, position, distance)?;
        Ok(())
    }
}
