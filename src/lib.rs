//! Type-directed construction, mutation and minimization of executable
//! operation sequences.
//!
//! - **Types**: [`types`] re-exports `seqforge-types` (type model, operations, catalog)
//! - **Engine**: [`core`] re-exports `seqforge-core` (sequence model, resolver,
//!   mutator, recombiner, minimizer)
//! - **Search glue**: [`SequenceChromosome`] and [`Population`] for an
//!   external evolutionary loop
//!
//! ```
//! use seqforge::{EngineConfig, Population};
//! use seqforge::types::{CatalogBuilder, Operation, TypeRef};
//!
//! let foo = TypeRef::class("Foo");
//! let catalog = CatalogBuilder::new()
//!     .target(foo.clone())
//!     .operation(Operation::constructor(foo.clone(), vec![]))
//!     .operation(Operation::method(foo, "setX", vec![TypeRef::int()], TypeRef::Void))
//!     .build();
//!
//! let mut population = Population::new(&catalog, EngineConfig::deterministic(1));
//! let (mut individuals, _) = population.initial(4);
//! population.mutate_all(&mut individuals);
//! assert!(individuals.iter().all(|c| c.sequence().is_valid()));
//! ```

pub mod chromosome;
pub mod population;

pub use seqforge_core as core;
pub use seqforge_types as types;

pub use chromosome::SequenceChromosome;
pub use population::{Population, PopulationStats};
pub use seqforge_core::{
    EngineConfig, EngineError, EngineResult, ExecutionResult, Executor, MinimizationReport, Minimizer,
    MutationHistory, MutationKind, Mutator, Recombiner, Resolver, Score, ScoringOracle, Sequence,
};
