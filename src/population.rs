//! Parallel population helpers.
//!
//! Each individual gets its own [`Resolver`] seeded from `seed`, the generation
//! and its index, so a run with a fixed seed is reproducible regardless of how
//! rayon schedules the work. Individuals never share a sequence across threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use seqforge_core::{ConstraintChecker, EngineConfig, NoConstraints, Resolver};
use seqforge_types::Catalog;

use crate::chromosome::SequenceChromosome;

static NO_CONSTRAINTS: NoConstraints = NoConstraints;

/// Summary of one parallel pass over a population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub individuals: usize,
    /// Individuals that were built or changed.
    pub changed: usize,
    /// Individuals whose operator returned an error and were left as is.
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// Runs engine operators over many chromosomes at once.
pub struct Population<'c> {
    catalog: &'c dyn Catalog,
    constraints: &'c dyn ConstraintChecker,
    config: EngineConfig,
    generation: u64,
}

impl<'c> Population<'c> {
    pub fn new(catalog: &'c dyn Catalog, config: EngineConfig) -> Self {
        Self {
            catalog,
            constraints: &NO_CONSTRAINTS,
            config,
            generation: 0,
        }
    }

    /// Builder method: constraint checker handed to every resolver.
    pub fn with_constraints(mut self, constraints: &'c dyn ConstraintChecker) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolver for the `index`-th individual of the current generation.
    fn resolver_for(&self, index: usize) -> Resolver<'c> {
        let resolver = Resolver::new(self.catalog, self.config.clone()).with_constraints(self.constraints);
        match self.config.seed {
            Some(seed) => {
                let offset = self.generation.wrapping_mul(1 << 32).wrapping_add(index as u64);
                resolver.with_seed(seed.wrapping_add(offset))
            }
            None => resolver,
        }
    }

    /// Build `size` random individuals of random length.
    ///
    /// Individuals whose construction fails come back empty.
    pub fn initial(&mut self, size: usize) -> (Vec<SequenceChromosome>, PopulationStats) {
        let start = Instant::now();
        let failed = AtomicUsize::new(0);
        let individuals: Vec<SequenceChromosome> = (0..size)
            .into_par_iter()
            .map(|index| {
                let mut resolver = self.resolver_for(index);
                match resolver.random_sequence_of_random_length() {
                    Ok(seq) => SequenceChromosome::new(seq),
                    Err(e) => {
                        warn!(index, error = %e, "initial individual construction failed");
                        failed.fetch_add(1, Ordering::Relaxed);
                        SequenceChromosome::default()
                    }
                }
            })
            .collect();
        self.generation += 1;

        let failed = failed.into_inner();
        let stats = PopulationStats {
            individuals: size,
            changed: size - failed,
            failed,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        debug!(size, failed = stats.failed, elapsed_ms = stats.elapsed_ms, "built initial population");
        (individuals, stats)
    }

    /// Mutate every individual in place.
    pub fn mutate_all(&mut self, individuals: &mut [SequenceChromosome]) -> PopulationStats {
        let start = Instant::now();
        let changed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        individuals
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, chromosome)| {
                let mut resolver = self.resolver_for(index);
                match chromosome.mutate(&mut resolver) {
                    Ok(true) => {
                        changed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(index, error = %e, "mutation failed, individual kept");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        self.generation += 1;

        let stats = PopulationStats {
            individuals: individuals.len(),
            changed: changed.into_inner(),
            failed: failed.into_inner(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            size = stats.individuals,
            changed = stats.changed,
            failed = stats.failed,
            "mutated population"
        );
        stats
    }

    /// Recombine consecutive pairs `(0, 1), (2, 3), ...` into two offspring
    /// each. A trailing odd individual is copied.
    pub fn crossover_pairs(&mut self, individuals: &[SequenceChromosome]) -> (Vec<SequenceChromosome>, PopulationStats) {
        let start = Instant::now();
        let failed = AtomicUsize::new(0);
        let offspring: Vec<SequenceChromosome> = individuals
            .par_chunks(2)
            .enumerate()
            .flat_map_iter(|(index, pair)| {
                let mut resolver = self.resolver_for(index);
                match pair {
                    [left, right] => {
                        let mut breed = |a: &SequenceChromosome, b: &SequenceChromosome| {
                            a.crossover(b, &mut resolver).unwrap_or_else(|e| {
                                warn!(index, error = %e, "crossover failed, parent kept");
                                failed.fetch_add(1, Ordering::Relaxed);
                                a.clone()
                            })
                        };
                        let first = breed(left, right);
                        let second = breed(right, left);
                        vec![first, second]
                    }
                    _ => pair.to_vec(),
                }
            })
            .collect();
        self.generation += 1;

        let stats = PopulationStats {
            individuals: offspring.len(),
            changed: offspring
                .iter()
                .zip(individuals)
                .filter(|(child, parent)| child.sequence() != parent.sequence())
                .count(),
            failed: failed.into_inner(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        debug!(size = stats.individuals, failed = stats.failed, "recombined population");
        (offspring, stats)
    }
}
