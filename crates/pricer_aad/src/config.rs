//! Engine configuration.
//!
//! Loaded from TOML, built with [`AadConfigBuilder`], or left at its
//! defaults; environment variables can override selected fields.
//!
//! ```toml
//! max_nodes = 5_000_000
//! initial_capacity = 4096
//! retain_leaves_only = true
//! evict_propagated = false
//! deterministic_adjoints = "sum"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`AadConfig::max_nodes`].
pub const ENV_MAX_NODES: &str = "AAD_MAX_NODES";
/// Environment variable overriding [`AadConfig::deterministic_adjoints`].
pub const ENV_DETERMINISTIC_ADJOINTS: &str = "AAD_DETERMINISTIC_ADJOINTS";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`AadConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// One or more fields hold invalid values.
    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// How the adjoint of a deterministic leaf is reported when the root is
/// per-path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjointReduction {
    /// One adjoint per path, shaped like the root.
    #[default]
    Pathwise,
    /// Adjoint summed over paths into a deterministic value.
    Sum,
}

impl FromStr for AdjointReduction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pathwise" => Ok(AdjointReduction::Pathwise),
            "sum" => Ok(AdjointReduction::Sum),
            _ => Err(ConfigError::Validation(vec![format!(
                "deterministic_adjoints must be `pathwise` or `sum`, got `{}`",
                s
            )])),
        }
    }
}

impl fmt::Display for AdjointReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjointReduction::Pathwise => f.write_str("pathwise"),
            AdjointReduction::Sum => f.write_str("sum"),
        }
    }
}

/// Tape and sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AadConfig {
    /// Maximum number of nodes per tape; `None` is unbounded.
    pub max_nodes: Option<usize>,
    /// Node storage reserved when a tape is created.
    pub initial_capacity: usize,
    /// Keep only free-variable leaves in the gradient.
    pub retain_leaves_only: bool,
    /// Drop each adjoint as soon as it has been propagated.
    pub evict_propagated: bool,
    /// Reporting of deterministic-leaf adjoints.
    pub deterministic_adjoints: AdjointReduction,
}

impl Default for AadConfig {
    fn default() -> Self {
        Self {
            max_nodes: None,
            initial_capacity: 1024,
            retain_leaves_only: true,
            evict_propagated: false,
            deterministic_adjoints: AdjointReduction::Pathwise,
        }
    }
}

impl AadConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> AadConfigBuilder {
        AadConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AadConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks field consistency, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if let Some(limit) = self.max_nodes {
            if limit == 0 {
                problems.push("max_nodes must be positive".to_string());
            } else if self.initial_capacity > limit {
                problems.push(format!(
                    "initial_capacity ({}) exceeds max_nodes ({})",
                    self.initial_capacity, limit
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Applies `AAD_MAX_NODES` and `AAD_DETERMINISTIC_ADJOINTS` from the
    /// process environment.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up by variable name.
    ///
    /// `AAD_MAX_NODES=none` (or an empty value) removes the limit.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_NODES) {
            let raw = raw.trim();
            self.max_nodes = if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                None
            } else {
                let limit = raw.parse::<usize>().map_err(|_| {
                    ConfigError::Validation(vec![format!(
                        "{} must be a node count, got `{}`",
                        ENV_MAX_NODES, raw
                    )])
                })?;
                Some(limit)
            };
        }
        if let Some(raw) = lookup(ENV_DETERMINISTIC_ADJOINTS) {
            self.deterministic_adjoints = raw.parse()?;
        }
        self.validate()?;
        Ok(self)
    }
}

/// Fluent builder for [`AadConfig`].
#[derive(Debug, Clone, Default)]
pub struct AadConfigBuilder {
    config: AadConfig,
}

impl AadConfigBuilder {
    /// Caps the number of nodes per tape.
    pub fn max_nodes(mut self, limit: usize) -> Self {
        self.config.max_nodes = Some(limit);
        self
    }

    /// Removes the node cap.
    pub fn unbounded(mut self) -> Self {
        self.config.max_nodes = None;
        self
    }

    /// Sets the node storage reserved up front.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Sets whether only variable leaves are kept in the gradient.
    pub fn retain_leaves_only(mut self, retain: bool) -> Self {
        self.config.retain_leaves_only = retain;
        self
    }

    /// Sets whether adjoints are dropped once propagated.
    pub fn evict_propagated(mut self, evict: bool) -> Self {
        self.config.evict_propagated = evict;
        self
    }

    /// Sets how deterministic-leaf adjoints are reported.
    pub fn deterministic_adjoints(mut self, reduction: AdjointReduction) -> Self {
        self.config.deterministic_adjoints = reduction;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<AadConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
