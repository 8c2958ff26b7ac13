//! Type-directed construction of values inside a sequence.
//!
//! The resolver satisfies a requested type at a position either by reusing a
//! compatible variable already defined before that position or by emitting
//! new statements: a literal, an enum constant, an array with assigned
//! cells, or a call to a catalog operation whose own receiver and
//! parameters are resolved recursively.
//!
//! ## Recursion
//!
//! ```text
//!   resolve(Foo, depth 0)
//!     └─ create_object(Foo)           picks Foo(Bar), marks it attempted
//!          └─ satisfy_parameters      depth 1
//!               └─ resolve(Bar)       reuse, or create_object(Bar) ...
//! ```
//!
//! Every top-level call owns a fresh [`ResolveContext`]. A generator is tried
//! at most once per context and depth is bounded by `max_recursion`, so
//! construction always terminates.
//!
//! ## Atomicity
//!
//! Public entry points take a checkpoint before touching the sequence and
//! roll back on any error. Callers observe either a complete construction or
//! the sequence exactly as it was.

mod context;
mod insertion;
mod literals;
mod type_pool;

pub use context::ResolveContext;
pub use literals::LiteralGenerator;
pub use type_pool::ObservedTypePool;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use seqforge_types::{Catalog, Operation, OperationKind, Primitive, TypeBindings, TypeRef};
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::constraints::{ConstraintChecker, NoConstraints};
use crate::errors::{EngineError, EngineResult};
use crate::sequence::{Literal, Sequence, StatementKind, VarId, VariableKind};

static NO_CONSTRAINTS: NoConstraints = NoConstraints;

/// Recursion-bounded value construction against an injected catalog.
///
/// A resolver owns its random generator and observed-type pool. It borrows
/// the catalog and constraint checker for its whole lifetime, so one
/// resolver serves one thread; parallel searches create one per worker.
pub struct Resolver<'c> {
    catalog: &'c dyn Catalog,
    constraints: &'c dyn ConstraintChecker,
    config: EngineConfig,
    rng: StdRng,
    literals: LiteralGenerator,
    type_pool: ObservedTypePool,
}

impl<'c> Resolver<'c> {
    /// Create a resolver. Probabilities outside `[0, 1]` are clamped; use
    /// [`try_new`](Self::try_new) to reject such a config instead.
    pub fn new(catalog: &'c dyn Catalog, config: EngineConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "engine config out of range, clamping probabilities");
        }
        let config = config.with_clamped_probabilities();
        Self {
            catalog,
            constraints: &NO_CONSTRAINTS,
            rng: config.rng(),
            literals: LiteralGenerator::from_config(&config),
            type_pool: ObservedTypePool::new(config.observed_type_pool_capacity),
            config,
        }
    }

    /// Create a resolver from a config that passes [`EngineConfig::validate`].
    pub fn try_new(catalog: &'c dyn Catalog, config: EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::new(catalog, config))
    }

    /// Builder method: consult `constraints` before every operation choice.
    pub fn with_constraints(mut self, constraints: &'c dyn ConstraintChecker) -> Self {
        self.constraints = constraints;
        self
    }

    /// Builder method: reseed the random generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn catalog(&self) -> &'c dyn Catalog {
        self.catalog
    }

    pub fn constraints(&self) -> &'c dyn ConstraintChecker {
        self.constraints
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn type_pool(&self) -> &ObservedTypePool {
        &self.type_pool
    }

    pub fn type_pool_mut(&mut self) -> &mut ObservedTypePool {
        &mut self.type_pool
    }

    pub fn literals(&self) -> &LiteralGenerator {
        &self.literals
    }

    /// A neighboring value of `literal` drawn with this resolver's generator.
    pub fn perturb_literal(&mut self, literal: &Literal) -> Option<Literal> {
        self.literals.perturb(&mut self.rng, literal)
    }

    // =========================================================================
    // Public entry points
    // =========================================================================

    /// Satisfy `ty` at `position`, inserting zero or more statements there.
    ///
    /// Returns the variable holding the value. On failure every statement
    /// inserted during the attempt has been removed again.
    pub fn resolve(
        &mut self,
        seq: &mut Sequence,
        ty: &TypeRef,
        position: usize,
        depth: usize,
        allow_null: bool,
    ) -> EngineResult<VarId> {
        check_position(seq, position)?;
        let mut ctx = ResolveContext::new();
        let checkpoint = seq.checkpoint(position);
        match self.create_or_reuse(&mut ctx, seq, ty, position, depth, allow_null, None) {
            Ok(var) => Ok(var),
            Err(e) => {
                seq.rollback(checkpoint);
                debug!(ty = %ty, position, error = %e, "rolled back failed resolution");
                Err(e)
            }
        }
    }

    /// Resolve each of `params` in order at `position`, shifting the
    /// position past whatever each resolution inserted.
    ///
    /// `receiver` is never reused as an argument.
    pub fn satisfy_parameters(
        &mut self,
        seq: &mut Sequence,
        receiver: Option<VarId>,
        params: &[TypeRef],
        position: usize,
        depth: usize,
    ) -> EngineResult<Vec<VarId>> {
        check_position(seq, position)?;
        let mut ctx = ResolveContext::new();
        let checkpoint = seq.checkpoint(position);
        match self.satisfy_in(&mut ctx, seq, receiver, params, position, depth) {
            Ok(args) => Ok(args),
            Err(e) => {
                seq.rollback(checkpoint);
                debug!(position, error = %e, "rolled back failed parameter satisfaction");
                Err(e)
            }
        }
    }

    /// Append a call of `op` to the end of `seq`, resolving its receiver and
    /// parameters against the existing statements.
    pub fn append_operation(&mut self, seq: &mut Sequence, op: &Arc<Operation>) -> EngineResult<VarId> {
        let end = seq.len();
        self.insert_operation(seq, op, end)
    }

    /// Insert a call of `op` at `position`. Field operations are read.
    pub fn insert_operation(
        &mut self,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        position: usize,
    ) -> EngineResult<VarId> {
        check_position(seq, position)?;
        let mut ctx = ResolveContext::new();
        let checkpoint = seq.checkpoint(position);
        let result = match op.kind {
            OperationKind::Constructor => self.add_constructor(&mut ctx, seq, op, None, position, 0),
            OperationKind::Method => self.add_method(&mut ctx, seq, op, position, 0),
            OperationKind::Field => self.add_field(&mut ctx, seq, op, position, 0),
        };
        if let Err(e) = &result {
            seq.rollback(checkpoint);
            debug!(op = %op, position, error = %e, "rolled back failed operation insertion");
        }
        result
    }

    /// Insert `receiver.op(...)` at `position`.
    pub fn add_method_for(
        &mut self,
        seq: &mut Sequence,
        receiver: VarId,
        op: &Arc<Operation>,
        position: usize,
    ) -> EngineResult<VarId> {
        check_position(seq, position)?;
        let mut ctx = ResolveContext::new();
        let checkpoint = seq.checkpoint(position);
        let distance = seq.variable(receiver).map_or(0, |v| v.distance + 1);
        let result = self.method_on(&mut ctx, seq, op, Some(receiver), position, 0, distance);
        if let Err(e) = &result {
            seq.rollback(checkpoint);
            debug!(op = %op, position, error = %e, "rolled back failed call insertion");
        }
        result
    }

    /// Insert `source.field = value` at `position`, resolving a value of the
    /// field's type. `source` is `None` for static fields.
    pub fn add_field_assignment(
        &mut self,
        seq: &mut Sequence,
        source: Option<VarId>,
        field: &Arc<Operation>,
        position: usize,
    ) -> EngineResult<VarId> {
        check_position(seq, position)?;
        let mut ctx = ResolveContext::new();
        let checkpoint = seq.checkpoint(position);
        let result = self.emit_field_assignment(&mut ctx, seq, field, source, position, 0);
        if let Err(e) = &result {
            seq.rollback(checkpoint);
            debug!(field = %field, position, error = %e, "rolled back failed field assignment");
        }
        result
    }

    // =========================================================================
    // Reuse or create
    // =========================================================================

    fn check_depth(&self, depth: usize) -> EngineResult<()> {
        if depth > self.config.max_recursion {
            return Err(EngineError::RecursionLimitExceeded {
                depth,
                max: self.config.max_recursion,
            });
        }
        Ok(())
    }

    /// Substitute bound type parameters and hand the rest to the catalog.
    fn concretize(&self, ctx: &ResolveContext, ty: &TypeRef) -> EngineResult<TypeRef> {
        if !ty.has_type_vars() {
            return Ok(ty.clone());
        }
        self.catalog
            .instantiate(ty, ctx.bindings())
            .ok_or_else(|| EngineError::construction(format!("cannot instantiate {}", ty)))
    }

    /// Run `f` with `extra` merged into the context's type bindings.
    fn with_bindings<T>(
        &mut self,
        ctx: &mut ResolveContext,
        extra: TypeBindings,
        f: impl FnOnce(&mut Self, &mut ResolveContext) -> EngineResult<T>,
    ) -> EngineResult<T> {
        if extra.is_empty() {
            return f(self, ctx);
        }
        let merged = ctx.bindings().merged(&extra);
        let previous = ctx.replace_bindings(merged);
        let result = f(self, ctx);
        ctx.replace_bindings(previous);
        result
    }

    fn create_or_reuse(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        ty: &TypeRef,
        position: usize,
        depth: usize,
        allow_null: bool,
        exclude: Option<VarId>,
    ) -> EngineResult<VarId> {
        self.check_depth(depth)?;
        let ty = self.concretize(ctx, ty)?;
        if ty.is_void() {
            return Err(EngineError::construction("cannot construct a value of type void"));
        }
        if ty.is_top() {
            return self.create_or_reuse_top(ctx, seq, position, depth, allow_null, exclude);
        }

        let candidates = self.reuse_candidates(seq, &ty, position, allow_null, exclude);
        if ty.is_primitive_like() {
            if !candidates.is_empty() && self.rng.gen_bool(self.config.primitive_reuse_probability) {
                if let Some(&var) = candidates.choose(&mut self.rng) {
                    trace!(ty = %ty, var = %var, "reusing primitive value");
                    return Ok(var);
                }
            }
        } else {
            if allow_null && self.rng.gen_bool(self.config.null_probability) {
                return self.emit_null(seq, &ty, position, depth);
            }
            if !candidates.is_empty() && self.rng.gen_bool(self.config.object_reuse_probability) {
                if let Some(&var) = candidates.choose(&mut self.rng) {
                    trace!(ty = %ty, var = %var, "reusing object");
                    return Ok(var);
                }
            }
        }

        match self.attempt_generation(ctx, seq, &ty, position, depth, allow_null) {
            Ok(var) => Ok(var),
            Err(e) if e.is_construction_failure() => match candidates.choose(&mut self.rng) {
                Some(&var) => {
                    trace!(ty = %ty, var = %var, "generation failed, reusing instead");
                    Ok(var)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Compatible variables before `position` that may stand in for a new
    /// value. `exclude` and everything back-referencing it are left out.
    fn reuse_candidates(
        &self,
        seq: &Sequence,
        ty: &TypeRef,
        position: usize,
        allow_null: bool,
        exclude: Option<VarId>,
    ) -> Vec<VarId> {
        let excluded_owner = exclude.and_then(|id| seq.variable(id)).and_then(|v| v.back_reference());
        seq.objects_before(self.catalog, ty, position)
            .into_iter()
            .filter(|&id| Some(id) != exclude && Some(id) != excluded_owner)
            .filter(|&id| {
                let back = seq.variable(id).and_then(|v| v.back_reference());
                exclude.is_none() || back != exclude
            })
            .filter(|&id| allow_null || !seq.is_null(id))
            .collect()
    }

    /// Build a fresh value of `ty` at `position`. Leaves the sequence
    /// untouched on failure.
    fn attempt_generation(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        ty: &TypeRef,
        position: usize,
        depth: usize,
        allow_null: bool,
    ) -> EngineResult<VarId> {
        let checkpoint = seq.checkpoint(position);
        let null_string = ty.is_string() && allow_null && self.rng.gen_bool(self.config.null_probability);
        let result = match ty {
            TypeRef::Enum(name) => {
                let constants = self.catalog.enum_constants(name);
                match constants.choose(&mut self.rng) {
                    Some(constant) => self.emit_literal(
                        seq,
                        Literal::EnumConstant(constant.clone()),
                        ty,
                        position,
                        depth,
                    ),
                    None => self.create_object(ctx, seq, ty, position, depth),
                }
            }
            TypeRef::Primitive(Primitive::String) if null_string => self.emit_null(seq, ty, position, depth),
            TypeRef::Primitive(primitive) => {
                let literal = self.literals.generate(&mut self.rng, *primitive);
                self.emit_literal(seq, literal, ty, position, depth)
            }
            TypeRef::TypeLiteral => {
                let choices: Vec<TypeRef> = self.type_pool.types().cloned().collect();
                let chosen = choices.choose(&mut self.rng).cloned().unwrap_or(TypeRef::Top);
                self.emit_literal(seq, Literal::Type(chosen), ty, position, depth)
            }
            TypeRef::Array(_) => self.create_array(ctx, seq, ty, position, depth),
            TypeRef::Class { .. } | TypeRef::Top => self.create_object(ctx, seq, ty, position, depth),
            TypeRef::Void | TypeRef::Var(_) => Err(EngineError::construction(format!(
                "cannot generate a value of type {}",
                ty
            ))),
        };
        if result.is_err() {
            seq.rollback(checkpoint);
        }
        result
    }

    /// Values for the top type: `null`, a reused non-literal object, or a
    /// fresh value of a recently observed concrete type.
    fn create_or_reuse_top(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        position: usize,
        depth: usize,
        allow_null: bool,
        exclude: Option<VarId>,
    ) -> EngineResult<VarId> {
        if allow_null && self.rng.gen_bool(self.config.null_probability) {
            return self.emit_null(seq, &TypeRef::Top, position, depth);
        }

        let candidates: Vec<VarId> = self
            .reuse_candidates(seq, &TypeRef::Top, position, allow_null, exclude)
            .into_iter()
            .filter(|&id| {
                seq.definition(id).is_some_and(|s| {
                    !s.is_literal() && (s.result.ty.is_top() || self.type_pool.contains(&s.result.ty))
                })
            })
            .collect();
        if !candidates.is_empty() && self.rng.gen_bool(self.config.object_reuse_probability) {
            if let Some(&var) = candidates.choose(&mut self.rng) {
                return Ok(var);
            }
        }

        let mut choices: Vec<TypeRef> = self
            .type_pool
            .types()
            .filter(|ty| self.catalog.has_generator(ty))
            .cloned()
            .collect();
        choices.push(TypeRef::string());
        if self.catalog.has_generator(&TypeRef::Top) {
            choices.push(TypeRef::Top);
        }
        let chosen = choices.choose(&mut self.rng).cloned().unwrap_or_else(TypeRef::string);
        trace!(ty = %chosen, "concrete choice for top type");
        if chosen.is_top() {
            self.create_object(ctx, seq, &TypeRef::Top, position, depth)
        } else {
            self.create_or_reuse(ctx, seq, &chosen, position, depth, allow_null, exclude)
        }
    }

    // =========================================================================
    // Objects and arrays
    // =========================================================================

    /// Call a not-yet-attempted generator of `ty`. Generators that fail to
    /// construct are skipped in favor of the remaining ones.
    fn create_object(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        ty: &TypeRef,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        let mut last_error = None;
        loop {
            let generators: Vec<Arc<Operation>> = self
                .catalog
                .generators_for(ty)
                .into_iter()
                .filter(|op| !ctx.is_attempted(op.id))
                .filter(|op| self.constraints.is_eligible(op, None, seq, position))
                .collect();
            let Some(op) = generators.choose(&mut self.rng).cloned() else {
                return Err(last_error.unwrap_or_else(|| {
                    EngineError::construction(format!("no generator available for {}", ty))
                }));
            };
            ctx.mark_attempted(op.id);
            trace!(ty = %ty, op = %op, depth, "trying generator");

            let checkpoint = seq.checkpoint(position);
            let result = match op.kind {
                OperationKind::Constructor => self.add_constructor(ctx, seq, &op, Some(ty), position, depth),
                OperationKind::Method => self.add_method(ctx, seq, &op, position, depth),
                OperationKind::Field => self.add_field(ctx, seq, &op, position, depth),
            };
            match result {
                Ok(var) => {
                    if let Some(created) = seq.type_of(var) {
                        self.type_pool.observe(created);
                    }
                    return Ok(var);
                }
                Err(e) if e.is_construction_failure() => {
                    seq.rollback(checkpoint);
                    last_error = Some(e);
                }
                Err(e) => {
                    seq.rollback(checkpoint);
                    return Err(e);
                }
            }
        }
    }

    /// Allocate an array of random length and assign every cell.
    fn create_array(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        ty: &TypeRef,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        let length = self.rng.gen_range(1..=self.config.max_array_length.max(1));
        let array = seq.insert(position, StatementKind::Array { length }, ty.clone(), VariableKind::Value, depth)?;
        self.assign_cells(ctx, seq, array, ty, length, position + 1, depth)?;
        Ok(array)
    }

    /// Write `array[0..length)` starting at `position`.
    fn assign_cells(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        array: VarId,
        array_ty: &TypeRef,
        length: usize,
        position: usize,
        depth: usize,
    ) -> EngineResult<usize> {
        let element = array_ty
            .component()
            .cloned()
            .ok_or_else(|| EngineError::construction(format!("{} is not an array type", array_ty)))?;
        let reusable = self.array_element_candidates(seq, &element, array_ty, array, position);
        let attempted = ctx.snapshot_attempted();
        let mut position = position;
        for index in 0..length {
            ctx.restore_attempted(attempted.clone());
            let before = seq.len();
            let value = if !reusable.is_empty() && self.rng.gen_bool(self.config.object_reuse_probability) {
                match reusable.choose(&mut self.rng) {
                    Some(&v) => v,
                    None => continue,
                }
            } else {
                self.attempt_generation(ctx, seq, &element, position, depth + 1, false)?
            };
            position += seq.len() - before;
            seq.insert(
                position,
                StatementKind::Assignment { value },
                element.clone(),
                VariableKind::ArrayCell { array, index },
                depth,
            )?;
            position += 1;
        }
        Ok(position)
    }

    /// Values an element of `array` may reuse: never the array itself, its
    /// own cells, or cells of arrays of the same type.
    fn array_element_candidates(
        &self,
        seq: &Sequence,
        element: &TypeRef,
        array_ty: &TypeRef,
        array: VarId,
        position: usize,
    ) -> Vec<VarId> {
        seq.non_null_objects_before(self.catalog, element, position)
            .into_iter()
            .filter(|&id| id != array)
            .filter(|&id| match seq.variable(id).map(|v| &v.kind) {
                Some(VariableKind::ArrayCell { array: owner, .. }) => {
                    *owner != array && seq.type_of(*owner) != Some(array_ty)
                }
                _ => true,
            })
            .collect()
    }

    // =========================================================================
    // Operation calls
    // =========================================================================

    /// `new Owner(args)`. `exact` is the type the caller asked for; its
    /// generic arguments bind the owner's type parameters.
    fn add_constructor(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        exact: Option<&TypeRef>,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        self.check_depth(depth)?;
        let bindings = match exact {
            Some(produced) => TypeBindings::from_receiver(&op.owner, produced),
            None => TypeBindings::new(),
        };
        self.with_bindings(ctx, bindings, |this, ctx| {
            let before = seq.len();
            let args = this.satisfy_in(ctx, seq, None, &op.params, position, depth + 1)?;
            let position = position + (seq.len() - before);
            let ty = this.concretize(ctx, &op.returns)?;
            seq.insert(
                position,
                StatementKind::Constructor {
                    op: Arc::clone(op),
                    args,
                },
                ty,
                VariableKind::Value,
                depth,
            )
        })
    }

    /// Static or instance method call; the receiver of an instance method is
    /// resolved first and is never `null`.
    fn add_method(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        self.check_depth(depth)?;
        let before = seq.len();
        let receiver = if op.needs_receiver() {
            Some(self.create_or_reuse(ctx, seq, &op.owner, position, depth + 1, false, None)?)
        } else {
            None
        };
        let position = position + (seq.len() - before);
        self.method_on(ctx, seq, op, receiver, position, depth, depth)
    }

    fn method_on(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        receiver: Option<VarId>,
        position: usize,
        depth: usize,
        distance: usize,
    ) -> EngineResult<VarId> {
        if !self.constraints.is_eligible(op, receiver, seq, position) {
            return Err(EngineError::construction(format!(
                "{} is not eligible at #{}",
                op.signature(),
                position
            )));
        }
        let bindings = receiver_bindings(seq, op, receiver);
        self.with_bindings(ctx, bindings, |this, ctx| {
            let before = seq.len();
            let args = this.satisfy_in(ctx, seq, receiver, &op.params, position, depth + 1)?;
            let position = position + (seq.len() - before);
            let ty = if op.returns.is_void() {
                TypeRef::Void
            } else {
                this.concretize(ctx, &op.returns)?
            };
            seq.insert(
                position,
                StatementKind::Method {
                    op: Arc::clone(op),
                    receiver,
                    args,
                },
                ty,
                VariableKind::Value,
                distance,
            )
        })
    }

    /// Field read, resolving the source object of an instance field.
    fn add_field(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        self.check_depth(depth)?;
        let before = seq.len();
        let source = if op.needs_receiver() {
            Some(self.create_or_reuse(ctx, seq, &op.owner, position, depth + 1, false, None)?)
        } else {
            None
        };
        let position = position + (seq.len() - before);
        self.emit_field_read(ctx, seq, op, source, position, depth)
    }

    fn emit_field_read(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        op: &Arc<Operation>,
        source: Option<VarId>,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        if !self.constraints.is_eligible(op, source, seq, position) {
            return Err(EngineError::construction(format!(
                "{} is not eligible at #{}",
                op.signature(),
                position
            )));
        }
        let bindings = receiver_bindings(seq, op, source);
        self.with_bindings(ctx, bindings, |this, ctx| {
            let ty = this.concretize(ctx, &op.returns)?;
            seq.insert(
                position,
                StatementKind::Field {
                    op: Arc::clone(op),
                    source,
                },
                ty,
                VariableKind::Value,
                depth,
            )
        })
    }

    /// `source.field = value`. Writing a field back into itself is rejected.
    fn emit_field_assignment(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        field: &Arc<Operation>,
        source: Option<VarId>,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        if !self.constraints.is_eligible(field, source, seq, position) {
            return Err(EngineError::construction(format!(
                "{} is not eligible at #{}",
                field.signature(),
                position
            )));
        }
        let bindings = receiver_bindings(seq, field, source);
        self.with_bindings(ctx, bindings, |this, ctx| {
            let field_ty = this.concretize(ctx, &field.returns)?;
            let before = seq.len();
            let value = this.create_or_reuse(ctx, seq, &field_ty, position, depth + 1, true, source)?;
            let position = position + (seq.len() - before);
            if is_self_assignment(seq, value, source, field) {
                return Err(EngineError::construction(format!(
                    "self-assignment of {}",
                    field.signature()
                )));
            }
            seq.insert(
                position,
                StatementKind::Assignment { value },
                field_ty,
                VariableKind::FieldAccess {
                    source,
                    field: Arc::clone(field),
                },
                depth,
            )
        })
    }

    /// Resolve every parameter at consecutive positions.
    fn satisfy_in(
        &mut self,
        ctx: &mut ResolveContext,
        seq: &mut Sequence,
        receiver: Option<VarId>,
        params: &[TypeRef],
        position: usize,
        depth: usize,
    ) -> EngineResult<Vec<VarId>> {
        let mut position = position;
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            let before = seq.len();
            let var = self.create_or_reuse(ctx, seq, param, position, depth, true, receiver)?;
            position += seq.len() - before;
            args.push(var);
        }
        Ok(args)
    }

    // ---- Leaf statements ----

    fn emit_literal(
        &mut self,
        seq: &mut Sequence,
        literal: Literal,
        ty: &TypeRef,
        position: usize,
        depth: usize,
    ) -> EngineResult<VarId> {
        seq.insert(position, StatementKind::Literal(literal), ty.clone(), VariableKind::Constant, depth)
    }

    fn emit_null(&mut self, seq: &mut Sequence, ty: &TypeRef, position: usize, depth: usize) -> EngineResult<VarId> {
        seq.insert(position, StatementKind::Null, ty.clone(), VariableKind::Value, depth)
    }
}

fn check_position(seq: &Sequence, position: usize) -> EngineResult<()> {
    if position > seq.len() {
        return Err(EngineError::structural(
            position,
            format!("insertion point past end of sequence of length {}", seq.len()),
        ));
    }
    Ok(())
}

/// Type bindings implied by the receiver's concrete type.
fn receiver_bindings(seq: &Sequence, op: &Operation, receiver: Option<VarId>) -> TypeBindings {
    receiver
        .and_then(|r| seq.type_of(r))
        .map(|concrete| TypeBindings::from_receiver(&op.owner, concrete))
        .unwrap_or_default()
}

fn is_self_assignment(seq: &Sequence, value: VarId, source: Option<VarId>, field: &Operation) -> bool {
    match seq.variable(value).map(|v| &v.kind) {
        Some(VariableKind::FieldAccess { source: s, field: f }) => *s == source && f.id == field.id,
        _ => false,
    }
}
