//! Service configuration.
//!
//! # Responsibility
//! - Supply the default page size used by list queries.
//! - Load overrides from the process environment.
//!
//! # Invariants
//! - `default_limit` is always at least 1.
//! - Configuration is read once, when a service is constructed.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable overriding the default page size.
pub const DEFAULT_LIMIT_ENV: &str = "POKEDEX_DEFAULT_LIMIT";

const DEFAULT_PAGE_SIZE: u32 = 10;

/// Configuration consumed by `PokemonService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PokedexConfig {
    /// Page size applied when a list query carries no `limit`.
    pub default_limit: u32,
}

impl Default for PokedexConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PokedexConfig {
    /// Builds a config with an explicit default page size.
    pub fn with_default_limit(default_limit: u32) -> Result<Self, ConfigError> {
        if default_limit == 0 {
            return Err(ConfigError::InvalidDefaultLimit("0".to_string()));
        }
        Ok(Self { default_limit })
    }

    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let Some(raw) = lookup(DEFAULT_LIMIT_ENV).filter(|value| !value.trim().is_empty()) else {
            return Ok(Self::default());
        };

        let default_limit = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidDefaultLimit(raw.clone()))?;
        Self::with_default_limit(default_limit)
            .map_err(|_| ConfigError::InvalidDefaultLimit(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidDefaultLimit(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDefaultLimit(value) => write!(
                f,
                "{DEFAULT_LIMIT_ENV} must be a positive integer, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}
