//! Environment-variable overrides with a shared prefix.
//!
//! Configuration structs read optional overrides such as
//! `SEQFORGE_MAX_RECURSION=6` on top of their defaults:
//!
//! ```
//! use seqforge_types::env::EnvOverrides;
//!
//! let env = EnvOverrides::new("SEQFORGE");
//! let depth: usize = env.get_or("MAX_RECURSION", 10);
//! assert!(depth > 0);
//! ```

use std::str::FromStr;

/// Typed reader for `<PREFIX>_<KEY>` environment variables.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    prefix: String,
}

impl EnvOverrides {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Full variable name for `key`.
    pub fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}_{}", self.prefix, key)
        }
    }

    /// Parsed value, or `None` when unset or unparsable.
    pub fn get<T: FromStr>(&self, key: &str) -> Option<T> {
        std::env::var(self.key(key))
            .ok()
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Boolean flag: `1`, `true`, `yes` and `on` (any case) are true,
    /// `0`, `false`, `no` and `off` are false, anything else is unset.
    pub fn flag(&self, key: &str) -> Option<bool> {
        let raw = std::env::var(self.key(key)).ok()?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    /// Overwrite `slot` when the variable is set and parses.
    pub fn apply<T: FromStr>(&self, key: &str, slot: &mut T) {
        if let Some(v) = self.get(key) {
            *slot = v;
        }
    }

    /// Like [`apply`](Self::apply) for boolean flags.
    pub fn apply_flag(&self, key: &str, slot: &mut bool) {
        if let Some(v) = self.flag(key) {
            *slot = v;
        }
    }
}
