//! Workflow configuration
//!
//! Every field has a default, so a configuration document only needs to
//! name what it overrides. A run never starts before [`WorkflowConfig::validate`]
//! has accepted the configuration.

use crate::elo::{DEFAULT_INITIAL_RATING, DEFAULT_K_FACTOR};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Elo constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Magnitude of rating change per match
    pub k_factor: f64,
    /// Rating assigned at creation
    pub initial_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            initial_rating: DEFAULT_INITIAL_RATING,
        }
    }
}

/// Tournament sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    /// Average number of matches each active hypothesis plays per pass
    pub matches_per_hypothesis: u32,
}

impl TournamentConfig {
    /// Largest accepted `matches_per_hypothesis`
    pub const MAX_MATCHES_PER_HYPOTHESIS: u32 = 64;
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            matches_per_hypothesis: 3,
        }
    }
}

/// Review strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Largest target count reviewed in one comparative batch call
    pub comparative_batch_threshold: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            comparative_batch_threshold: 5,
        }
    }
}

/// Proximity deduplication settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Similarity above which two hypotheses are near-identical
    pub duplicate_threshold: f64,
    /// Similarity above which two hypotheses share a cluster
    pub proximity_threshold: f64,
    /// Active members kept per proximity cluster
    pub max_per_cluster: usize,
    /// Largest population scored on every pair
    pub max_full_comparison: usize,
    /// Rank-order neighbours compared per hypothesis above `max_full_comparison`
    pub comparison_window: usize,
    /// Concurrent similarity calls
    pub concurrency: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.95,
            proximity_threshold: 0.80,
            max_per_cluster: 2,
            max_full_comparison: 64,
            comparison_window: 16,
            concurrency: 8,
        }
    }
}

/// Literature grounding settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteratureConfig {
    /// Consult the literature source before generation
    pub enabled: bool,
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Retry schedule for capability adapters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Backoff growth factor
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

/// Full workflow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of refinement iterations after the initial ranking
    pub max_iterations: u32,
    /// Hypotheses requested from generation
    pub initial_hypotheses_count: usize,
    /// Top hypotheses evolved per iteration
    pub evolution_max_count: usize,
    /// Bound on any single capability call
    pub call_timeout_ms: u64,
    /// Active population limit applied after deduplication
    pub population_cap: Option<usize>,
    /// Elo constants
    pub elo: EloConfig,
    /// Tournament sizing
    pub tournament: TournamentConfig,
    /// Review strategy
    pub review: ReviewConfig,
    /// Deduplication
    pub proximity: ProximityConfig,
    /// Literature grounding
    pub literature: LiteratureConfig,
    /// Capability retry schedule
    pub retry: RetryConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1,
            initial_hypotheses_count: 6,
            evolution_max_count: 3,
            call_timeout_ms: 120_000,
            population_cap: None,
            elo: EloConfig::default(),
            tournament: TournamentConfig::default(),
            review: ReviewConfig::default(),
            proximity: ProximityConfig::default(),
            literature: LiteratureConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With iteration bound
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// With initial hypothesis count
    #[inline]
    #[must_use]
    pub fn with_initial_hypotheses(mut self, count: usize) -> Self {
        self.initial_hypotheses_count = count;
        self
    }

    /// With evolution count
    #[inline]
    #[must_use]
    pub fn with_evolution_max_count(mut self, count: usize) -> Self {
        self.evolution_max_count = count;
        self
    }

    /// With K-factor
    #[inline]
    #[must_use]
    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.elo.k_factor = k_factor;
        self
    }

    /// With similarity thresholds
    #[inline]
    #[must_use]
    pub fn with_thresholds(mut self, duplicate: f64, proximity: f64) -> Self {
        self.proximity.duplicate_threshold = duplicate;
        self.proximity.proximity_threshold = proximity;
        self
    }

    /// With matches per hypothesis
    #[inline]
    #[must_use]
    pub fn with_matches_per_hypothesis(mut self, matches: u32) -> Self {
        self.tournament.matches_per_hypothesis = matches;
        self
    }

    /// With call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With active population cap
    #[inline]
    #[must_use]
    pub fn with_population_cap(mut self, cap: usize) -> Self {
        self.population_cap = Some(cap);
        self
    }

    /// Capability call bound
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_hypotheses_count == 0 {
            return Err(ConfigError::invalid("initial_hypotheses_count", "must be at least 1"));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::invalid("call_timeout_ms", "must be positive"));
        }
        if self.population_cap == Some(0) {
            return Err(ConfigError::invalid("population_cap", "must be at least 1 when set"));
        }

        if !self.elo.k_factor.is_finite() || self.elo.k_factor <= 0.0 {
            return Err(ConfigError::invalid(
                "elo.k_factor",
                format!("must be finite and positive, got {}", self.elo.k_factor),
            ));
        }
        if !self.elo.initial_rating.is_finite() {
            return Err(ConfigError::invalid("elo.initial_rating", "must be finite"));
        }

        let matches = self.tournament.matches_per_hypothesis;
        if matches == 0 || matches > TournamentConfig::MAX_MATCHES_PER_HYPOTHESIS {
            return Err(ConfigError::invalid(
                "tournament.matches_per_hypothesis",
                format!(
                    "must lie in 1..={}, got {matches}",
                    TournamentConfig::MAX_MATCHES_PER_HYPOTHESIS
                ),
            ));
        }

        let proximity = &self.proximity;
        check_unit_interval("proximity.duplicate_threshold", proximity.duplicate_threshold)?;
        check_unit_interval("proximity.proximity_threshold", proximity.proximity_threshold)?;
        if proximity.duplicate_threshold <= proximity.proximity_threshold {
            return Err(ConfigError::ThresholdOrder {
                duplicate: proximity.duplicate_threshold,
                proximity: proximity.proximity_threshold,
            });
        }
        if proximity.max_per_cluster == 0 {
            return Err(ConfigError::invalid("proximity.max_per_cluster", "must be at least 1"));
        }
        if proximity.comparison_window == 0 {
            return Err(ConfigError::invalid("proximity.comparison_window", "must be at least 1"));
        }
        if proximity.concurrency == 0 {
            return Err(ConfigError::invalid("proximity.concurrency", "must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::invalid("retry.multiplier", "must be finite and at least 1.0"));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed input, or any validation error.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed input, or any validation error.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, choosing the format by extension
    ///
    /// `.yaml`/`.yml` are parsed as YAML, everything else as TOML.
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as the parsers.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&input)
        } else {
            Self::from_toml_str(&input)
        }
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must lie in [0, 1], got {value}")))
    }
}
