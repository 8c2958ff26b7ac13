//! Operation descriptors: the constructors, methods and fields a catalog
//! exposes for the program under test.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TypeRef;

/// Catalog-assigned identity of an operation.
///
/// Two descriptors with the same id are the same operation; the resolver's
/// cycle-breaking set is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub u32);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Constructor,
    Method,
    /// Field read (or, when inserted as a call, a field write).
    Field,
}

/// A single callable entry of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    /// Method or field name; `<init>` for constructors.
    pub name: String,
    /// Declaring type. Generic owners carry their type parameters as
    /// [`TypeRef::Var`] arguments.
    pub owner: TypeRef,
    pub params: Vec<TypeRef>,
    /// Produced type: the owner for constructors, the field type for fields.
    pub returns: TypeRef,
    pub is_static: bool,
    /// Method-level type parameters.
    #[serde(default)]
    pub type_params: Vec<String>,
}

impl Operation {
    /// Id used before a catalog assigns the real one.
    pub const UNASSIGNED: OperationId = OperationId(u32::MAX);

    pub fn constructor(owner: TypeRef, params: Vec<TypeRef>) -> Self {
        Self {
            id: Self::UNASSIGNED,
            kind: OperationKind::Constructor,
            name: "<init>".to_string(),
            returns: owner.clone(),
            owner,
            params,
            is_static: false,
            type_params: Vec::new(),
        }
    }

    pub fn method(
        owner: TypeRef,
        name: impl Into<String>,
        params: Vec<TypeRef>,
        returns: TypeRef,
    ) -> Self {
        Self {
            id: Self::UNASSIGNED,
            kind: OperationKind::Method,
            name: name.into(),
            owner,
            params,
            returns,
            is_static: false,
            type_params: Vec::new(),
        }
    }

    pub fn field(owner: TypeRef, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: Self::UNASSIGNED,
            kind: OperationKind::Field,
            name: name.into(),
            owner,
            params: Vec::new(),
            returns: ty,
            is_static: false,
            type_params: Vec::new(),
        }
    }

    /// Builder method: mark as static (no receiver).
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Builder method: declare method-level type parameters.
    pub fn with_type_params(mut self, params: Vec<String>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_id(mut self, id: OperationId) -> Self {
        self.id = id;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == OperationKind::Constructor
    }

    pub fn is_method(&self) -> bool {
        self.kind == OperationKind::Method
    }

    pub fn is_field(&self) -> bool {
        self.kind == OperationKind::Field
    }

    /// Whether a receiver must be supplied when calling this operation.
    pub fn needs_receiver(&self) -> bool {
        !self.is_static && !self.is_constructor()
    }

    /// Whether unbound type parameters must be instantiated before use.
    pub fn requires_instantiation(&self) -> bool {
        !self.type_params.is_empty()
            || self.owner.has_type_vars()
            || self.returns.has_type_vars()
            || self.params.iter().any(TypeRef::has_type_vars)
    }

    /// Types that must already be available to call this operation:
    /// the receiver (if any) followed by the parameters.
    pub fn dependencies(&self) -> Vec<TypeRef> {
        let mut deps = Vec::with_capacity(self.params.len() + 1);
        if self.needs_receiver() {
            deps.push(self.owner.clone());
        }
        deps.extend(self.params.iter().cloned());
        deps
    }

    /// Human-readable signature, e.g. `Foo.setX(int)` or `Foo.<init>()`.
    pub fn signature(&self) -> String {
        match self.kind {
            OperationKind::Field => format!("{}.{}", self.owner, self.name),
            _ => {
                let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
                format!("{}.{}({})", self.owner, self.name, params.join(", "))
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_produces_owner() {
        let op = Operation::constructor(TypeRef::class("Foo"), vec![TypeRef::int()]);
        assert_eq!(op.returns, TypeRef::class("Foo"));
        assert!(!op.needs_receiver());
        assert_eq!(op.signature(), "Foo.<init>(int)");
        assert_eq!(op.dependencies(), vec![TypeRef::int()]);
    }

    #[test]
    fn test_instance_method_dependencies_start_with_receiver() {
        let op = Operation::method(
            TypeRef::class("Foo"),
            "setX",
            vec![TypeRef::int()],
            TypeRef::Void,
        );
        assert!(op.needs_receiver());
        assert_eq!(op.dependencies(), vec![TypeRef::class("Foo"), TypeRef::int()]);

        let stat = op.clone().into_static();
        assert_eq!(stat.dependencies(), vec![TypeRef::int()]);
    }

    #[test]
    fn test_requires_instantiation() {
        let owner = TypeRef::generic("Box", vec![TypeRef::var("T")]);
        let get = Operation::method(owner.clone(), "get", vec![], TypeRef::var("T"));
        assert!(get.requires_instantiation());

        let plain = Operation::method(TypeRef::class("Foo"), "size", vec![], TypeRef::int());
        assert!(!plain.requires_instantiation());
        assert!(plain
            .clone()
            .with_type_params(vec!["U".into()])
            .requires_instantiation());
    }

    #[test]
    fn test_field_signature() {
        let op = Operation::field(TypeRef::class("Foo"), "x", TypeRef::int());
        assert_eq!(op.signature(), "Foo.x");
        assert!(op.is_field());
    }
}
