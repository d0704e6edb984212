//! Optimizer configuration (opt.toml)
//!
//! Selects which analyses and passes run and how many propagation rounds
//! are attempted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A consumer pass is enabled while the analysis it reads is not
    #[error("{pass} requires {requires}, which is disabled")]
    MissingPrerequisite { pass: PassKind, requires: PassKind },

    /// Pass name not recognized
    #[error("unknown pass `{0}`")]
    UnknownPass(String),

    /// `propagation.rounds` must allow at least one round
    #[error("propagation rounds must be at least 1")]
    ZeroRounds,

    /// Failed to read config file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The analyses and passes the optimizer knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    Liveness,
    ReachingDefinitions,
    DeadCode,
    ConstantPropagation,
}

impl PassKind {
    /// Every pass, in the order the optimizer runs them
    pub const ALL: [PassKind; 4] = [
        PassKind::Liveness,
        PassKind::DeadCode,
        PassKind::ReachingDefinitions,
        PassKind::ConstantPropagation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassKind::Liveness => "liveness",
            PassKind::ReachingDefinitions => "reaching-definitions",
            PassKind::DeadCode => "dead-code",
            PassKind::ConstantPropagation => "constant-propagation",
        }
    }

    /// The analysis a consumer pass reads
    pub fn requires(self) -> Option<PassKind> {
        match self {
            PassKind::DeadCode => Some(PassKind::Liveness),
            PassKind::ConstantPropagation => Some(PassKind::ReachingDefinitions),
            PassKind::Liveness | PassKind::ReachingDefinitions => None,
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PassKind {
    type Err = ConfigError;

    /// Accepts the kebab-case names and the dotted `cfg.*` switch names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "liveness" | "cfg.liveness" => Ok(PassKind::Liveness),
            "reaching-definitions" | "reaching" | "cfg.reaching" => {
                Ok(PassKind::ReachingDefinitions)
            }
            "dead-code" | "cfg.deadCode" => Ok(PassKind::DeadCode),
            "constant-propagation" | "const-prop" | "cfg.constProp" => {
                Ok(PassKind::ConstantPropagation)
            }
            other => Err(ConfigError::UnknownPass(other.to_string())),
        }
    }
}

/// `[passes]` table: one switch per pass, all on by default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PassToggles {
    #[serde(default = "enabled")]
    pub liveness: bool,
    #[serde(default = "enabled")]
    pub reaching_definitions: bool,
    #[serde(default = "enabled")]
    pub dead_code: bool,
    #[serde(default = "enabled")]
    pub constant_propagation: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PassToggles {
    fn default() -> Self {
        PassToggles {
            liveness: true,
            reaching_definitions: true,
            dead_code: true,
            constant_propagation: true,
        }
    }
}

/// `[propagation]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PropagationConfig {
    /// Reaching-definitions + propagation rounds (default: 1)
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    /// Repeat until a round rewrites nothing, up to [`MAX_STABLE_ROUNDS`]
    #[serde(default)]
    pub until_stable: bool,
}

/// Round cap when `until-stable` is set
pub const MAX_STABLE_ROUNDS: usize = 64;

fn default_rounds() -> usize {
    1
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig { rounds: default_rounds(), until_stable: false }
    }
}

impl PropagationConfig {
    /// Upper bound on the number of rounds to run
    pub fn max_rounds(&self) -> usize {
        if self.until_stable {
            MAX_STABLE_ROUNDS
        } else {
            self.rounds
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptConfig {
    #[serde(default)]
    pub passes: PassToggles,

    #[serde(default)]
    pub propagation: PropagationConfig,
}

impl OptConfig {
    /// Everything enabled, one propagation round
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything disabled
    pub fn none() -> Self {
        let mut config = Self::default();
        for pass in PassKind::ALL {
            config.set(pass, false);
        }
        config
    }

    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: OptConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn is_enabled(&self, pass: PassKind) -> bool {
        match pass {
            PassKind::Liveness => self.passes.liveness,
            PassKind::ReachingDefinitions => self.passes.reaching_definitions,
            PassKind::DeadCode => self.passes.dead_code,
            PassKind::ConstantPropagation => self.passes.constant_propagation,
        }
    }

    pub fn set(&mut self, pass: PassKind, on: bool) {
        let slot = match pass {
            PassKind::Liveness => &mut self.passes.liveness,
            PassKind::ReachingDefinitions => &mut self.passes.reaching_definitions,
            PassKind::DeadCode => &mut self.passes.dead_code,
            PassKind::ConstantPropagation => &mut self.passes.constant_propagation,
        };
        *slot = on;
    }

    pub fn enable(mut self, pass: PassKind) -> Self {
        self.set(pass, true);
        self
    }

    pub fn skip(mut self, pass: PassKind) -> Self {
        self.set(pass, false);
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.propagation.rounds = rounds;
        self
    }

    pub fn until_stable(mut self, on: bool) -> Self {
        self.propagation.until_stable = on;
        self
    }

    /// Enabled passes, in pipeline order
    pub fn enabled_passes(&self) -> Vec<PassKind> {
        PassKind::ALL.into_iter().filter(|p| self.is_enabled(*p)).collect()
    }

    /// Reject configurations that would run a pass without its analysis
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pass in PassKind::ALL {
            if let Some(requires) = pass.requires() {
                if self.is_enabled(pass) && !self.is_enabled(requires) {
                    return Err(ConfigError::MissingPrerequisite { pass, requires });
                }
            }
        }
        if self.propagation.rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        Ok(())
    }
}
