//! The operation catalog: which operations can produce a type, which calls
//! exist on a receiver, and how type parameters get instantiated.
//!
//! The engine never looks a catalog up globally; a `&dyn Catalog` is passed
//! into every resolver, mutator and minimizer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::operation::{Operation, OperationId};
use crate::types::{self, TypeBindings, TypeRef};

/// Read-only registry of constructible operations for the program under test.
pub trait Catalog: Send + Sync {
    /// Operations whose result can be used where `ty` is expected.
    ///
    /// For the top type only operations declared to return exactly the top
    /// type are listed; everything else is reachable through concrete types.
    fn generators_for(&self, ty: &TypeRef) -> Vec<Arc<Operation>>;

    /// Instance methods and fields callable on a receiver of type `receiver`.
    fn calls_for(&self, receiver: &TypeRef) -> Vec<Arc<Operation>>;

    /// Operations of the primary target type (the unit under test).
    fn target_calls(&self) -> Vec<Arc<Operation>>;

    /// Declared constants of an enumeration.
    fn enum_constants(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }

    /// Direct supertypes of a class.
    fn supertypes(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }

    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        types::is_assignable(from, to, &|name| self.supertypes(name))
    }

    /// Concretize a type containing type parameters.
    ///
    /// The default substitutes `bindings` and erases whatever is left to the
    /// top type. Returning `None` means the type cannot be instantiated.
    fn instantiate(&self, ty: &TypeRef, bindings: &TypeBindings) -> Option<TypeRef> {
        Some(ty.substitute(bindings).erase_vars())
    }

    fn has_generator(&self, ty: &TypeRef) -> bool {
        !self.generators_for(ty).is_empty()
    }
}

/// Catalog held entirely in memory, built with [`CatalogBuilder`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    operations: Vec<Arc<Operation>>,
    target: Option<TypeRef>,
    enums: BTreeMap<String, Vec<String>>,
    supertypes: BTreeMap<String, Vec<String>>,
}

impl InMemoryCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    pub fn operation(&self, id: OperationId) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Look an operation up by its [`Operation::signature`].
    pub fn by_signature(&self, signature: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.signature() == signature)
    }

    pub fn target(&self) -> Option<&TypeRef> {
        self.target.as_ref()
    }

    fn owned_by(&self, op: &Operation, ty: &TypeRef) -> bool {
        match (&op.owner, ty) {
            (TypeRef::Class { name: a, .. }, TypeRef::Class { name: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn generators_for(&self, ty: &TypeRef) -> Vec<Arc<Operation>> {
        self.operations
            .iter()
            .filter(|op| !op.returns.is_void())
            .filter(|op| {
                if ty.is_top() {
                    op.returns.is_top()
                } else {
                    self.is_assignable(&op.returns, ty)
                }
            })
            .cloned()
            .collect()
    }

    fn calls_for(&self, receiver: &TypeRef) -> Vec<Arc<Operation>> {
        self.operations
            .iter()
            .filter(|op| op.needs_receiver())
            .filter(|op| self.is_assignable(receiver, &op.owner))
            .cloned()
            .collect()
    }

    fn target_calls(&self) -> Vec<Arc<Operation>> {
        let Some(target) = &self.target else {
            return Vec::new();
        };
        self.operations
            .iter()
            .filter(|op| self.owned_by(op, target))
            .cloned()
            .collect()
    }

    fn enum_constants(&self, name: &str) -> Vec<String> {
        self.enums.get(name).cloned().unwrap_or_default()
    }

    fn supertypes(&self, name: &str) -> Vec<String> {
        self.supertypes.get(name).cloned().unwrap_or_default()
    }
}

/// Incremental construction of an [`InMemoryCatalog`].
///
/// Operations receive sequential ids in insertion order.
///
/// ```
/// use seqforge_types::{Catalog, CatalogBuilder, Operation, TypeRef};
///
/// let foo = TypeRef::class("Foo");
/// let catalog = CatalogBuilder::new()
///     .target(foo.clone())
///     .operation(Operation::constructor(foo.clone(), vec![]))
///     .operation(Operation::method(foo.clone(), "setX", vec![TypeRef::int()], TypeRef::Void))
///     .build();
/// assert_eq!(catalog.generators_for(&foo).len(), 1);
/// assert_eq!(catalog.target_calls().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: InMemoryCatalog,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the primary target type.
    pub fn target(mut self, ty: TypeRef) -> Self {
        self.catalog.target = Some(ty);
        self
    }

    /// Builder method: register an operation, assigning its id.
    pub fn operation(mut self, op: Operation) -> Self {
        let id = OperationId(self.catalog.operations.len() as u32);
        self.catalog.operations.push(Arc::new(op.with_id(id)));
        self
    }

    /// Builder method: register an enumeration and its constants.
    pub fn enumeration<I, S>(mut self, name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog
            .enums
            .insert(name.into(), constants.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: declare `sub` as a direct subtype of `sup`.
    pub fn subtype(mut self, sub: impl Into<String>, sup: impl Into<String>) -> Self {
        self.catalog
            .supertypes
            .entry(sub.into())
            .or_default()
            .push(sup.into());
        self
    }

    pub fn build(self) -> InMemoryCatalog {
        self.catalog
    }
}
