//! Population and configuration tests
//!
//! Test coverage areas:
//! - Loading engine configuration from JSON files
//! - Parallel initial population, mutation and recombination
//! - Chromosome bookkeeping across execute and mutate

mod common;

use common::*;
use seqforge::core::ConstraintChecker;
use seqforge::types::Operation;
use seqforge::{
    EngineConfig, EngineResult, ExecutionResult, Executor, Population, Resolver, Sequence, SequenceChromosome,
};

/// Executor stub that reports an exception on every `setX` call.
struct SetXThrows;

impl Executor for SetXThrows {
    fn execute(&mut self, sequence: &Sequence) -> EngineResult<ExecutionResult> {
        let mut result = ExecutionResult::new();
        for (pos, stmt) in sequence.iter().enumerate() {
            if stmt.operation().is_some_and(|op| op.name == "setX") {
                result = result.with_exception(pos, "IllegalArgumentException");
            }
        }
        Ok(result)
    }
}

/// Forbids every field operation.
struct NoFields;

impl ConstraintChecker for NoFields {
    fn verify(&self, sequence: &Sequence) -> bool {
        sequence
            .iter()
            .all(|s| s.operation().map_or(true, |op| !op.is_field()))
    }

    fn is_eligible(
        &self,
        op: &Operation,
        _receiver: Option<seqforge::core::VarId>,
        _sequence: &Sequence,
        _position: usize,
    ) -> bool {
        !op.is_field()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Test that a partial JSON config file keeps defaults for missing keys.
#[test]
fn test_config_from_json_file() {
    let file = temp_config_file(r#"{ "max_length": 15, "seed": 3, "p_insert": 0.8 }"#);
    let config = assert_ok(EngineConfig::from_json_file(file.path()), "load config");
    assert_eq!(config.max_length, 15);
    assert_eq!(config.seed, Some(3));
    assert_eq!(config.max_recursion, EngineConfig::default().max_recursion);
    assert_ok(config.validate(), "validate loaded config");
}

/// Test that a malformed config file reports its path.
#[test]
fn test_config_file_errors_name_the_file() {
    let file = temp_config_file("{ not json");
    let err = EngineConfig::from_json_file(file.path()).unwrap_err();
    let name = file.path().file_name().unwrap().to_string_lossy().to_string();
    assert_error_contains(format!("{:#}", err), &name, "config parse error");
}

// =============================================================================
// Population
// =============================================================================

/// Test that initial individuals are valid and within the length bound.
#[test]
fn test_initial_population_is_valid() {
    let catalog = rich_catalog();
    let config = EngineConfig::deterministic(11).with_max_length(20);
    let mut population = Population::new(&catalog, config);
    let (individuals, stats) = population.initial(16);
    assert_eq!(individuals.len(), 16);
    assert_eq!(stats.failed, 0);
    for (i, chromosome) in individuals.iter().enumerate() {
        assert_valid_sequence(chromosome.sequence(), &format!("individual {}", i));
        assert_in_range(chromosome.size(), 0, 20, "individual length");
    }
}

/// Test that several generations of mutation and crossover stay valid.
#[test]
fn test_generations_stay_valid() {
    let catalog = rich_catalog();
    let config = EngineConfig::deterministic(29).with_max_length(25);
    let mut population = Population::new(&catalog, config);
    let (mut individuals, _) = population.initial(10);
    for generation in 0..5 {
        let stats = population.mutate_all(&mut individuals);
        assert_eq!(stats.individuals, 10);
        let (offspring, _) = population.crossover_pairs(&individuals);
        individuals = offspring;
        for chromosome in &individuals {
            assert_valid_sequence(chromosome.sequence(), &format!("generation {}", generation));
            assert!(chromosome.size() <= 25);
        }
    }
}

/// Test that the constraint checker keeps field operations out entirely.
#[test]
fn test_constraints_apply_to_every_worker() {
    let catalog = rich_catalog();
    let checker = NoFields;
    let config = EngineConfig::deterministic(8).with_max_length(20);
    let mut population = Population::new(&catalog, config).with_constraints(&checker);
    let (mut individuals, _) = population.initial(8);
    population.mutate_all(&mut individuals);
    for chromosome in &individuals {
        assert!(checker.verify(chromosome.sequence()), "{}", chromosome.sequence());
    }
}

// =============================================================================
// Chromosome
// =============================================================================

/// Test that mutation after an execution only touches the live prefix.
#[test]
fn test_chromosome_mutation_after_execution() {
    let catalog = foo_catalog();
    let (seq, _) = foo_set_x_sequence(&catalog);
    let mut chromosome = SequenceChromosome::new(seq);
    let result = assert_ok(chromosome.execute(&mut SetXThrows), "execute");
    assert_eq!(result.first_exception_position(), Some(2));
    assert!(!chromosome.is_changed());

    let config = EngineConfig::deterministic(6)
        .with_mutation_probabilities(0.0, 0.0, 1.0)
        .with_max_length(10);
    let mut resolver = Resolver::new(&catalog, config);
    let mutated = assert_ok(chromosome.mutate(&mut resolver), "mutate");
    if mutated {
        assert!(chromosome.is_changed());
        assert!(chromosome.last_execution().is_none());
        assert_valid_sequence(chromosome.sequence(), "mutated chromosome");
    } else {
        assert_eq!(chromosome.size(), 3);
    }
}
