//! Engine configuration.
//!
//! The only knob is the seed of the process-wide random generator. It is read
//! once, the first time a thread draws a random value, from the
//! [`SEED_ENV_VAR`] environment variable.

/// Environment variable holding an optional integer seed.
pub const SEED_ENV_VAR: &str = "FATHOM_SEED";

/// Configuration for a fathom process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Seed for the random generator; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// A missing seed yields `None`; so does a value that does not parse as an
    /// unsigned integer, which is logged rather than treated as an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let seed = lookup(SEED_ENV_VAR).and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    variable = SEED_ENV_VAR,
                    value = %raw,
                    error = %_e,
                    "ignoring unparsable seed, using an entropy-seeded generator"
                );
                None
            }
        });
        Self { seed }
    }

    /// Returns a copy with the seed replaced.
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        Self { seed }
    }
}
