//! Sequence construction, mutation and minimization engine.
//!
//! The engine turns a typed operation [`Catalog`](seqforge_types::Catalog)
//! into valid, dependency-consistent [`Sequence`]s and evolves them:
//!
//! - [`resolver`]: type-directed, recursion-bounded construction and reuse
//! - [`mutation`]: delete, change and insert stages ([`Mutator`])
//! - [`crossover`]: single-point recombination ([`Recombiner`])
//! - [`minimizer`]: fitness-preserving statement removal ([`Minimizer`])
//!
//! Execution, scoring, constraint checking and rendering are collaborators
//! supplied by the caller through the traits in [`executor`], [`oracle`],
//! [`constraints`] and [`render`].
//!
//! ## Example
//!
//! ```
//! use seqforge_core::{EngineConfig, Resolver};
//! use seqforge_types::{CatalogBuilder, Operation, TypeRef};
//!
//! let foo = TypeRef::class("Foo");
//! let catalog = CatalogBuilder::new()
//!     .target(foo.clone())
//!     .operation(Operation::constructor(foo.clone(), vec![]))
//!     .operation(Operation::method(foo.clone(), "setX", vec![TypeRef::int()], TypeRef::Void))
//!     .build();
//!
//! let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(42));
//! let seq = resolver.random_sequence(5).unwrap();
//! assert!(seq.is_valid());
//! ```

#![allow(clippy::too_many_arguments)]

pub mod budget;
pub mod config;
pub mod constraints;
pub mod crossover;
pub mod errors;
pub mod executor;
pub mod minimizer;
pub mod mutation;
pub mod oracle;
pub mod render;
pub mod resolver;
pub mod sequence;

pub use budget::{Budget, Deadline, Unlimited};
pub use config::EngineConfig;
pub use constraints::{ConstraintChecker, NoConstraints};
pub use crossover::Recombiner;
pub use errors::{EngineError, EngineResult};
pub use executor::{ExecutionResult, Executor};
pub use minimizer::{MinimizationReport, Minimizer};
pub use mutation::{MutationEntry, MutationHistory, MutationKind, Mutator};
pub use oracle::{LengthAwareOracle, Score, ScoringOracle};
pub use render::{PseudoCodeRenderer, Renderer};
pub use resolver::Resolver;
pub use sequence::{Literal, Sequence, Statement, StatementKind, VarId, Variable, VariableKind};

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::sync::Arc;

    use seqforge_types::{CatalogBuilder, InMemoryCatalog, Operation, TypeRef};

    use crate::sequence::{Literal, Sequence, StatementKind, VarId, VariableKind};

    pub struct FooOps {
        pub new_foo: Arc<Operation>,
        pub set_x: Arc<Operation>,
        pub get_x: Arc<Operation>,
    }

    /// Target `Foo` with `Foo()`, `void setX(int)` and `int getX()`.
    pub fn foo_catalog() -> (InMemoryCatalog, FooOps) {
        let foo = TypeRef::class("Foo");
        let catalog = CatalogBuilder::new()
            .target(foo.clone())
            .operation(Operation::constructor(foo.clone(), vec![]))
            .operation(Operation::method(
                foo.clone(),
                "setX",
                vec![TypeRef::int()],
                TypeRef::Void,
            ))
            .operation(Operation::method(foo, "getX", vec![], TypeRef::int()))
            .build();
        let ops = FooOps {
            new_foo: Arc::clone(&catalog.operations()[0]),
            set_x: Arc::clone(&catalog.operations()[1]),
            get_x: Arc::clone(&catalog.operations()[2]),
        };
        (catalog, ops)
    }

    /// `[foo0 = new Foo(); int0 = 5; foo0.setX(int0)]` and its variable ids.
    pub fn foo_set_x_sequence() -> (Sequence, Vec<VarId>) {
        let (_, ops) = foo_catalog();
        let mut seq = Sequence::new();
        let foo = seq
            .push(
                StatementKind::Constructor {
                    op: ops.new_foo,
                    args: vec![],
                },
                TypeRef::class("Foo"),
                VariableKind::Value,
                0,
            )
            .unwrap();
        let five = seq
            .push(
                StatementKind::Literal(Literal::Int(5)),
                TypeRef::int(),
                VariableKind::Constant,
                0,
            )
            .unwrap();
        let call = seq
            .push(
                StatementKind::Method {
                    op: ops.set_x,
                    receiver: Some(foo),
                    args: vec![five],
                },
                TypeRef::Void,
                VariableKind::Value,
                0,
            )
            .unwrap();
        (seq, vec![foo, five, call])
    }
}
