//! # Kernel Configuration
//!
//! Limits and logging settings for the kernel.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     POS_KERNEL_MAX_LINES=500                                           │
//! │     POS_KERNEL_LOG=debug                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, or                                                  │
//! │     ~/.config/kernel/kernel.toml (Linux)                               │
//! │     ~/Library/Application Support/com.pos.kernel/kernel.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     10000 lines, 1000 tenders, 256-byte identifiers                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kernel.toml
//! [limits]
//! max_lines_per_transaction = 10000
//! max_tenders_per_transaction = 1000
//! max_identifier_bytes = 256
//!
//! [logging]
//! filter = "info,pos_kernel=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pos_core::Limits;

use crate::error::{KernelError, KernelResult};

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,pos_kernel=debug";

pub const ENV_MAX_LINES: &str = "POS_KERNEL_MAX_LINES";
pub const ENV_MAX_TENDERS: &str = "POS_KERNEL_MAX_TENDERS";
pub const ENV_MAX_IDENTIFIER_BYTES: &str = "POS_KERNEL_MAX_IDENTIFIER_BYTES";
pub const ENV_LOG: &str = "POS_KERNEL_LOG";

// =============================================================================
// Logging Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `"warn,pos_kernel=info"`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Kernel Configuration
// =============================================================================

/// Complete kernel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KernelConfig {
    /// Parses and validates a TOML document. Environment overrides are not
    /// applied: the document is taken as the complete configuration.
    pub fn from_toml_str(contents: &str) -> KernelResult<Self> {
        let config: KernelConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from TOML file if it exists
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> KernelResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading kernel config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load kernel config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> KernelResult<()> {
        let limits = &self.limits;
        if limits.max_lines_per_transaction == 0 {
            return Err(KernelError::Config(
                "max_lines_per_transaction must be greater than 0".into(),
            ));
        }
        // Line counts cross the boundary as u32.
        if u32::try_from(limits.max_lines_per_transaction).is_err() {
            return Err(KernelError::Config(format!(
                "max_lines_per_transaction must not exceed {}",
                u32::MAX
            )));
        }
        if limits.max_tenders_per_transaction == 0 {
            return Err(KernelError::Config(
                "max_tenders_per_transaction must be greater than 0".into(),
            ));
        }
        if limits.max_identifier_bytes == 0 {
            return Err(KernelError::Config(
                "max_identifier_bytes must be greater than 0".into(),
            ));
        }

        EnvFilter::try_new(&self.logging.filter).map_err(|e| {
            KernelError::Config(format!(
                "invalid logging filter {:?}: {}",
                self.logging.filter, e
            ))
        })?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup. Unparseable numbers
    /// are ignored with a warning.
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let numeric = |key: &str, target: &mut usize| {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<usize>() {
                    Ok(value) => {
                        debug!(key, value, "Overriding limit from environment");
                        *target = value;
                    }
                    Err(_) => warn!(key, value = %raw, "Ignoring non-numeric override"),
                }
            }
        };

        numeric(ENV_MAX_LINES, &mut self.limits.max_lines_per_transaction);
        numeric(ENV_MAX_TENDERS, &mut self.limits.max_tenders_per_transaction);
        numeric(
            ENV_MAX_IDENTIFIER_BYTES,
            &mut self.limits.max_identifier_bytes,
        );

        if let Some(filter) = lookup(ENV_LOG) {
            debug!(filter = %filter, "Overriding log filter from environment");
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pos", "kernel")
            .map(|dirs| dirs.config_dir().join("kernel.toml"))
    }
}
