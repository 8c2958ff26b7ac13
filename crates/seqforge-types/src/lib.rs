//! Shared types for the seqforge workspace.
//!
//! This crate holds the vocabulary every other crate speaks:
//!
//! - [`TypeRef`] / [`Primitive`]: shallow type references with assignability
//! - [`TypeBindings`]: type-parameter bindings used for instantiation
//! - [`Operation`]: constructor, method and field descriptors
//! - [`Catalog`]: the injected operation registry, with [`InMemoryCatalog`]
//! - [`env`]: prefixed environment-variable overrides for configuration

pub mod catalog;
pub mod env;
pub mod operation;
pub mod types;

pub use catalog::{Catalog, CatalogBuilder, InMemoryCatalog};
pub use operation::{Operation, OperationId, OperationKind};
pub use types::{is_assignable, Primitive, TypeBindings, TypeRef};
