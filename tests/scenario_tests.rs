//! End-to-end engine scenarios
//!
//! Test coverage areas:
//! - Resolver termination on minimal and empty catalogs
//! - Graceful delete falling back to hard delete
//! - Delete-only mutation order and chopping of over-long sequences
//! - Crossover length bound
//! - Minimization against an oracle, with and without a budget

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use common::*;
use seqforge::core::mutation::delete_gracefully;
use seqforge::core::{Deadline, LengthAwareOracle, PseudoCodeRenderer, Renderer};
use seqforge::types::{CatalogBuilder, Operation, TypeRef};
use seqforge::{
    EngineConfig, EngineError, EngineResult, ExecutionResult, Minimizer, MutationKind, Mutator, Recombiner,
    Resolver, Score, Sequence,
};

// =============================================================================
// Resolver
// =============================================================================

/// Test that a zero-argument constructor is resolved in exactly one statement.
#[test]
fn test_resolve_with_only_zero_arg_constructor() {
    let t = TypeRef::class("T");
    let catalog = CatalogBuilder::new()
        .operation(Operation::constructor(t.clone(), vec![]))
        .build();
    let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(0));
    let mut seq = Sequence::new();
    let var = assert_ok(resolver.resolve(&mut seq, &t, 0, 0, false), "resolve T");
    assert_eq!(seq.len(), 1);
    assert_eq!(seq.position_of(var), Some(0));
}

/// Test that an empty catalog yields a construction failure and no change.
#[test]
fn test_resolve_with_empty_catalog() {
    let catalog = CatalogBuilder::new().build();
    let mut resolver = Resolver::new(&catalog, EngineConfig::no_null().with_seed(0));
    let mut seq = Sequence::new();
    let err = resolver
        .resolve(&mut seq, &TypeRef::class("T"), 0, 0, false)
        .unwrap_err();
    assert!(err.is_construction_failure());
    assert_error_contains(&err, "no generator", "construction failure reason");
    assert!(seq.is_empty());
}

/// Test that the recursion bound is enforced before anything is emitted.
#[test]
fn test_resolve_past_recursion_limit() {
    let catalog = foo_catalog();
    let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(0).with_max_recursion(3));
    let mut seq = Sequence::new();
    let err = resolver
        .resolve(&mut seq, &TypeRef::class("Foo"), 0, 4, false)
        .unwrap_err();
    assert_eq!(err, EngineError::RecursionLimitExceeded { depth: 4, max: 3 });
    assert!(seq.is_empty());
}

// =============================================================================
// Mutation
// =============================================================================

/// Test that deleting the only int falls back to removing the call too.
#[test]
fn test_graceful_delete_falls_back_to_hard_delete() {
    let catalog = foo_catalog();
    let (mut seq, ids) = foo_set_x_sequence(&catalog);
    let mut rng = StdRng::seed_from_u64(0);
    let removed = assert_ok(delete_gracefully(&mut seq, 1, &catalog, &mut rng), "delete int0");
    assert_eq!(removed, BTreeSet::from([1, 2]));
    assert_eq!(seq.len(), 1);
    assert_eq!(seq.statement(0).map(|s| s.id()), Some(ids[0]));
    let listing = PseudoCodeRenderer.render(&seq, &Default::default());
    assert!(listing.contains("new Foo()"), "{}", listing);
}

/// Test that a delete-only mutation visits every position once, highest
/// first.
#[test]
fn test_delete_only_mutation_order() {
    let catalog = foo_catalog();
    let config = EngineConfig::deterministic(9)
        .with_mutation_probabilities(1.0, 0.0, 0.0)
        .with_statement_probability(1.0);
    let mut resolver = Resolver::new(&catalog, config);
    let (mut seq, _) = foo_set_x_sequence(&catalog);
    let history = assert_ok(Mutator::new(&mut resolver).mutate(&mut seq, None), "mutate");
    assert_eq!(history.positions(MutationKind::Deletion), vec![2, 1, 0]);
    assert_eq!(history.count(MutationKind::Change), 0);
    assert_eq!(history.count(MutationKind::Insertion), 0);
    assert!(seq.is_empty());
}

/// Test that statements after the first exception are left alone.
#[test]
fn test_mutation_stays_before_exception() {
    let catalog = foo_catalog();
    let config = EngineConfig::deterministic(4)
        .with_mutation_probabilities(1.0, 0.0, 0.0)
        .with_statement_probability(1.0);
    let mut resolver = Resolver::new(&catalog, config);
    let (mut seq, _) = foo_set_x_sequence(&catalog);
    let exec = ExecutionResult::new().with_exception(0, "NullPointerException");
    let history = assert_ok(Mutator::new(&mut resolver).mutate(&mut seq, Some(&exec)), "mutate");
    assert_eq!(history.positions(MutationKind::Deletion), vec![0]);
}

/// Test that repeated mutation on a rich catalog keeps sequences valid and
/// never starts an insertion at the length limit.
#[test]
fn test_long_mutation_run_stays_valid() {
    let catalog = rich_catalog();
    let config = EngineConfig::deterministic(77).with_max_length(30);
    let mut resolver = Resolver::new(&catalog, config);
    let mut seq = assert_ok(resolver.random_sequence(12), "initial sequence");
    for round in 0..50 {
        let before = seq.len();
        let history = assert_ok(Mutator::new(&mut resolver).mutate(&mut seq, None), "mutate");
        assert_valid_sequence(&seq, &format!("round {}", round));
        if before >= 30 {
            assert_eq!(history.count(MutationKind::Insertion), 0, "round {}", round);
            assert!(seq.len() <= before, "round {}: grew from {} to {}", round, before, seq.len());
        }
    }
}

/// Test that a sequence over the limit is chopped back to its live prefix.
#[test]
fn test_chop_cuts_back_over_long_sequence() {
    let catalog = rich_catalog();
    let mut grower = Resolver::new(&catalog, EngineConfig::deterministic(78).with_max_length(40));
    let mut seq = assert_ok(grower.random_sequence(35), "long sequence");
    assert_in_range(seq.len(), 30, 40, "grown length");
    let before = seq.len();

    let config = EngineConfig::deterministic(79)
        .with_max_length(30)
        .with_mutation_probabilities(0.0, 0.0, 0.0);
    let mut resolver = Resolver::new(&catalog, config);
    let exec = ExecutionResult::new().with_exception(10, "IllegalStateException");
    let history = assert_ok(Mutator::new(&mut resolver).mutate(&mut seq, Some(&exec)), "chop");
    assert_eq!(seq.len(), 11);
    assert_eq!(history.chopped(), before - 11);
    assert_valid_sequence(&seq, "chopped sequence");
}

// =============================================================================
// Crossover
// =============================================================================

/// Test that an over-long child is discarded in favor of the left parent.
#[test]
fn test_crossover_length_bound() {
    let catalog = foo_catalog();
    let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(2).with_max_length(4));
    let (left, _) = foo_set_x_sequence(&catalog);
    let (right, _) = foo_set_x_sequence(&catalog);
    let child = assert_ok(
        Recombiner::new(&mut resolver).crossover(&left, &right, 3, 0),
        "crossover",
    );
    assert_eq!(child, left);

    let child = assert_ok(
        Recombiner::new(&mut resolver).crossover(&left, &right, 1, 2),
        "crossover",
    );
    assert!(child.len() <= 4);
    assert_valid_sequence(&child, "short crossover");
}

// =============================================================================
// Minimization
// =============================================================================

/// Test that minimization drops statements the oracle does not care about.
#[test]
fn test_minimizer_drops_irrelevant_statements() {
    let catalog = rich_catalog();
    let config = EngineConfig::deterministic(5);
    let mut resolver = Resolver::new(&catalog, config.clone());
    let (mut seq, _) = foo_set_x_sequence(&catalog);
    let original_len = seq.len();
    for _ in 0..4 {
        let end = seq.len();
        let _ = resolver.insert_random_call(&mut seq, end);
    }
    assert!(seq.len() > original_len);

    let mut oracle = LengthAwareOracle::new(|s: &Sequence| -> EngineResult<Score> {
        let calls_set_x = s
            .iter()
            .any(|st| st.operation().is_some_and(|op| op.name == "setX"));
        Ok(Score::new(if calls_set_x { 0.0 } else { 1.0 }))
    });
    let report = Minimizer::new(&catalog, &config).minimize(&seq, &mut oracle);
    assert!(!report.was_aborted());
    assert!(report.sequence.len() <= 3, "{}", report.sequence);
    assert!(report
        .sequence
        .iter()
        .any(|st| st.operation().is_some_and(|op| op.name == "setX")));
    assert_eq!(report.removed, seq.len() - report.sequence.len());
}

/// Test that an exhausted budget stops minimization with the input intact.
#[test]
fn test_minimizer_respects_budget() {
    let catalog = foo_catalog();
    let (seq, _) = foo_set_x_sequence(&catalog);
    let budget = Deadline::after(Duration::ZERO);
    let mut oracle = |_: &Sequence| -> EngineResult<Score> { Ok(Score::new(0.0)) };
    let report = Minimizer::new(&catalog, &EngineConfig::deterministic(0))
        .with_budget(&budget)
        .minimize(&seq, &mut oracle);
    assert!(report.was_aborted());
    assert_eq!(report.sequence, seq);
}
