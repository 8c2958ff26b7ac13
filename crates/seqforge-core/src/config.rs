//! Engine configuration.
//!
//! All probabilities are in `[0, 1]`. Defaults match a typical whole-sequence
//! search: short sequences, mostly reuse, occasional nulls.
//!
//! ```
//! use seqforge_core::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_max_length(20)
//!     .with_mutation_probabilities(1.0, 0.0, 0.0)
//!     .with_seed(7);
//! assert!(config.validate().is_ok());
//! ```

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use seqforge_types::env::EnvOverrides;

/// Default maximum construction recursion depth.
pub const DEFAULT_MAX_RECURSION: usize = 10;

/// Default maximum sequence length.
pub const DEFAULT_MAX_LENGTH: usize = 40;

/// Default probability of choosing `null` for a nullable request.
pub const DEFAULT_NULL_PROBABILITY: f64 = 0.1;

/// Default probability of reusing an existing reference-typed variable.
pub const DEFAULT_OBJECT_REUSE_PROBABILITY: f64 = 0.9;

/// Default probability of reusing an existing primitive-like variable.
pub const DEFAULT_PRIMITIVE_REUSE_PROBABILITY: f64 = 0.5;

/// Default probability for each of the three mutation stages.
pub const DEFAULT_STAGE_PROBABILITY: f64 = 1.0 / 3.0;

/// Default probability that a call's in-place mutation swaps one argument.
pub const DEFAULT_CHANGE_PARAMETER_PROBABILITY: f64 = 0.1;

/// Default geometric decay of repeated insertions.
pub const DEFAULT_INSERTION_ALPHA: f64 = 0.5;

/// Default probability that an insertion targets the unit under test.
pub const DEFAULT_INSERTION_UUT_PROBABILITY: f64 = 0.5;

pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 10;
pub const DEFAULT_MAX_INT: i64 = 2048;
pub const DEFAULT_MAX_DELTA: i64 = 20;
pub const DEFAULT_MAX_STRING_LENGTH: usize = 12;
pub const DEFAULT_OBSERVED_TYPE_POOL_CAPACITY: usize = 16;
pub const DEFAULT_MAX_INITIAL_ATTEMPTS: usize = 1000;

/// Prefix of environment overrides read by [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "SEQFORGE";

/// Configuration shared by the resolver, mutator, recombiner and minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum construction recursion depth (default: 10).
    pub max_recursion: usize,

    /// Maximum sequence length (default: 40).
    ///
    /// Insertion stops at this length and recombination discards longer
    /// offspring when `check_max_length` is set.
    pub max_length: usize,

    /// Enforce `max_length` during insertion and recombination (default: true).
    pub check_max_length: bool,

    /// Chop statements after the last mutatable position before mutating a
    /// sequence that reached `max_length` (default: true).
    pub chop_max_length: bool,

    /// Probability of `null` for nullable requests (default: 0.1).
    pub null_probability: f64,

    /// Probability of reusing a compatible reference-typed variable (default: 0.9).
    pub object_reuse_probability: f64,

    /// Probability of reusing a compatible primitive-like variable (default: 0.5).
    pub primitive_reuse_probability: f64,

    /// Probability that the delete stage runs (default: 1/3).
    pub p_delete: f64,

    /// Probability that the change stage runs (default: 1/3).
    pub p_change: f64,

    /// Probability that the insert stage runs (default: 1/3).
    pub p_insert: f64,

    /// Probability that in-place mutation of a call swaps one argument or
    /// the receiver (default: 0.1).
    pub p_change_parameter: f64,

    /// Per-statement probability used by the delete and change stages.
    ///
    /// `None` (default) uses `1 / (cutoff + 1)`.
    pub delete_statement_probability: Option<f64>,

    /// Geometric decay rate of repeated insertions (default: 0.5).
    ///
    /// The n-th insertion in one mutation happens with probability `alpha^n`.
    pub insertion_alpha: f64,

    /// Probability that an insertion calls the unit under test rather than
    /// a method on an existing variable (default: 0.5).
    pub insertion_uut_probability: f64,

    /// Largest array created by the resolver (default: 10).
    pub max_array_length: usize,

    /// Bound of uniformly generated integer literals (default: 2048).
    pub max_int: i64,

    /// Largest step when perturbing a numeric literal (default: 20).
    pub max_delta: i64,

    /// Longest generated string literal (default: 12).
    pub max_string_length: usize,

    /// Capacity of the observed concrete type pool used for top-type
    /// requests (default: 16).
    pub observed_type_pool_capacity: usize,

    /// Insertion attempts when building an initial sequence (default: 1000).
    pub max_initial_attempts: usize,

    /// Seed for the random generators (default: None, seeded from entropy).
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion: DEFAULT_MAX_RECURSION,
            max_length: DEFAULT_MAX_LENGTH,
            check_max_length: true,
            chop_max_length: true,
            null_probability: DEFAULT_NULL_PROBABILITY,
            object_reuse_probability: DEFAULT_OBJECT_REUSE_PROBABILITY,
            primitive_reuse_probability: DEFAULT_PRIMITIVE_REUSE_PROBABILITY,
            p_delete: DEFAULT_STAGE_PROBABILITY,
            p_change: DEFAULT_STAGE_PROBABILITY,
            p_insert: DEFAULT_STAGE_PROBABILITY,
            p_change_parameter: DEFAULT_CHANGE_PARAMETER_PROBABILITY,
            delete_statement_probability: None,
            insertion_alpha: DEFAULT_INSERTION_ALPHA,
            insertion_uut_probability: DEFAULT_INSERTION_UUT_PROBABILITY,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_int: DEFAULT_MAX_INT,
            max_delta: DEFAULT_MAX_DELTA,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            observed_type_pool_capacity: DEFAULT_OBSERVED_TYPE_POOL_CAPACITY,
            max_initial_attempts: DEFAULT_MAX_INITIAL_ATTEMPTS,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with a fixed seed, for reproducible runs.
    pub fn deterministic(seed: u64) -> Self {
        Self::default().with_seed(seed)
    }

    /// Defaults that never choose `null`.
    pub fn no_null() -> Self {
        Self::default().with_null_probability(0.0)
    }

    /// Builder method: set the maximum recursion depth.
    pub fn with_max_recursion(mut self, depth: usize) -> Self {
        self.max_recursion = depth;
        self
    }

    /// Builder method: set the maximum sequence length.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    /// Builder method: set the delete, change and insert stage probabilities.
    pub fn with_mutation_probabilities(mut self, delete: f64, change: f64, insert: f64) -> Self {
        self.p_delete = delete;
        self.p_change = change;
        self.p_insert = insert;
        self
    }

    /// Builder method: override the per-statement delete/change probability.
    pub fn with_statement_probability(mut self, p: f64) -> Self {
        self.delete_statement_probability = Some(p);
        self
    }

    /// Builder method: set the null probability.
    pub fn with_null_probability(mut self, p: f64) -> Self {
        self.null_probability = p;
        self
    }

    /// Builder method: set object and primitive reuse probabilities.
    pub fn with_reuse_probabilities(mut self, object: f64, primitive: f64) -> Self {
        self.object_reuse_probability = object;
        self.primitive_reuse_probability = primitive;
        self
    }

    /// Builder method: set the insertion decay rate.
    pub fn with_insertion_alpha(mut self, alpha: f64) -> Self {
        self.insertion_alpha = alpha;
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the largest array the resolver creates.
    pub fn with_max_array_length(mut self, length: usize) -> Self {
        self.max_array_length = length;
        self
    }

    /// Fresh random generator honoring `seed`.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Random generator for the `index`-th independent worker.
    pub fn rng_for(&self, index: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index)),
            None => StdRng::from_entropy(),
        }
    }

    /// Check ranges; returns the first violation.
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("null_probability", self.null_probability),
            ("object_reuse_probability", self.object_reuse_probability),
            ("primitive_reuse_probability", self.primitive_reuse_probability),
            ("p_delete", self.p_delete),
            ("p_change", self.p_change),
            ("p_insert", self.p_insert),
            ("p_change_parameter", self.p_change_parameter),
            ("insertion_uut_probability", self.insertion_uut_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, p));
            }
        }
        if let Some(p) = self.delete_statement_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(anyhow!(
                    "delete_statement_probability must be within [0, 1], got {}",
                    p
                ));
            }
        }
        if !(0.0..1.0).contains(&self.insertion_alpha) {
            return Err(anyhow!(
                "insertion_alpha must be within [0, 1), got {}",
                self.insertion_alpha
            ));
        }
        if self.max_length == 0 {
            return Err(anyhow!("max_length must be positive"));
        }
        if self.max_int <= 0 || self.max_delta <= 0 {
            return Err(anyhow!("max_int and max_delta must be positive"));
        }
        Ok(())
    }

    /// Copy with every probability forced into `[0, 1]`. NaN becomes 0.
    pub fn with_clamped_probabilities(mut self) -> Self {
        for p in [
            &mut self.null_probability,
            &mut self.object_reuse_probability,
            &mut self.primitive_reuse_probability,
            &mut self.p_delete,
            &mut self.p_change,
            &mut self.p_insert,
            &mut self.p_change_parameter,
            &mut self.insertion_uut_probability,
        ] {
            *p = clamp_probability(*p);
        }
        self.delete_statement_probability = self.delete_statement_probability.map(clamp_probability);
        self
    }

    /// Parse a (possibly partial) JSON document; missing fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults overridden by `SEQFORGE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(&EnvOverrides::new(ENV_PREFIX))
    }

    /// Apply overrides from `env` on top of `self`.
    pub fn with_env_overrides(mut self, env: &EnvOverrides) -> Self {
        env.apply("MAX_RECURSION", &mut self.max_recursion);
        env.apply("MAX_LENGTH", &mut self.max_length);
        env.apply_flag("CHECK_MAX_LENGTH", &mut self.check_max_length);
        env.apply_flag("CHOP_MAX_LENGTH", &mut self.chop_max_length);
        env.apply("NULL_PROBABILITY", &mut self.null_probability);
        env.apply("OBJECT_REUSE_PROBABILITY", &mut self.object_reuse_probability);
        env.apply(
            "PRIMITIVE_REUSE_PROBABILITY",
            &mut self.primitive_reuse_probability,
        );
        env.apply("P_DELETE", &mut self.p_delete);
        env.apply("P_CHANGE", &mut self.p_change);
        env.apply("P_INSERT", &mut self.p_insert);
        env.apply("P_CHANGE_PARAMETER", &mut self.p_change_parameter);
        env.apply("INSERTION_ALPHA", &mut self.insertion_alpha);
        env.apply("INSERTION_UUT_PROBABILITY", &mut self.insertion_uut_probability);
        env.apply("MAX_ARRAY_LENGTH", &mut self.max_array_length);
        env.apply("MAX_INT", &mut self.max_int);
        env.apply("MAX_DELTA", &mut self.max_delta);
        env.apply("MAX_STRING_LENGTH", &mut self.max_string_length);
        if let Some(seed) = env.get::<u64>("SEED") {
            self.seed = Some(seed);
        }
        self
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_recursion, DEFAULT_MAX_RECURSION);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::no_null()
            .with_max_recursion(3)
            .with_mutation_probabilities(1.0, 0.0, 0.0)
            .with_statement_probability(1.0);
        assert_eq!(config.null_probability, 0.0);
        assert_eq!(config.max_recursion, 3);
        assert_eq!(config.p_delete, 1.0);
        assert_eq!(config.delete_statement_probability, Some(1.0));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let err = EngineConfig::default()
            .with_null_probability(1.5)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("null_probability"));

        assert!(EngineConfig::default()
            .with_insertion_alpha(1.0)
            .validate()
            .is_err());
        assert!(EngineConfig::default().with_max_length(0).validate().is_err());
    }

    #[test]
    fn test_clamped_probabilities_validate() {
        let config = EngineConfig::default()
            .with_mutation_probabilities(1.5, -0.2, f64::NAN)
            .with_statement_probability(3.0)
            .with_clamped_probabilities();
        assert_eq!(config.p_delete, 1.0);
        assert_eq!(config.p_change, 0.0);
        assert_eq!(config.p_insert, 0.0);
        assert_eq!(config.delete_statement_probability, Some(1.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"max_length": 12, "seed": 9}"#).unwrap();
        assert_eq!(config.max_length, 12);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_recursion, DEFAULT_MAX_RECURSION);
    }

    #[test]
    fn test_json_file_errors_carry_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"p_delete\": 2.0}}").unwrap();
        let err = EngineConfig::from_json_file(file.path()).unwrap_err();
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("p_delete"), "got: {}", rendered);
        assert!(rendered.contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvOverrides::new("SEQFORGE_CORE_TEST_CONFIG");
        std::env::set_var(env.key("MAX_RECURSION"), "4");
        std::env::set_var(env.key("CHOP_MAX_LENGTH"), "false");
        std::env::set_var(env.key("SEED"), "42");

        let config = EngineConfig::default().with_env_overrides(&env);
        assert_eq!(config.max_recursion, 4);
        assert!(!config.chop_max_length);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = EngineConfig::deterministic(11);
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
        let c: u64 = config.rng_for(1).gen();
        assert_ne!(a, c);
    }
}
