//! # Sync Configuration
//!
//! Configuration for the reconciliation engine and write-through sync.
//!
//! ## Configuration Sources
//! ```text
//! 1. Environment variables (highest priority)   MERIDIAN_STANDARD_TAX_RATE=18
//! 2. TOML config file                           ~/.config/meridian-pos/sync.toml
//! 3. Default values (lowest priority)
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [tenant]
//! default_branch_id = "default-branch"
//! standard_tax_rate = 10.0
//! fallback_category_name = "General"
//!
//! [push]
//! quiet_period_ms = 800
//! allow_list = ["products", "categories", "sales"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use meridian_core::{DEFAULT_BRANCH_ID, FALLBACK_CATEGORY_NAME};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Tenant Defaults
// =============================================================================

/// Per-tenant default values applied at record creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDefaults {
    /// Sentinel branch id stamped on records submitted without one.
    #[serde(default = "default_branch_id")]
    pub default_branch_id: String,

    /// Standard tax rate applied when a record omits one. Stored as
    /// provided - the engine is currency- and unit-agnostic.
    #[serde(default = "default_tax_rate")]
    pub standard_tax_rate: f64,

    /// Display name of the auto-created fallback category.
    #[serde(default = "default_fallback_category")]
    pub fallback_category_name: String,
}

fn default_branch_id() -> String {
    DEFAULT_BRANCH_ID.to_string()
}

fn default_tax_rate() -> f64 {
    10.0
}

fn default_fallback_category() -> String {
    FALLBACK_CATEGORY_NAME.to_string()
}

impl Default for TenantDefaults {
    fn default() -> Self {
        TenantDefaults {
            default_branch_id: default_branch_id(),
            standard_tax_rate: default_tax_rate(),
            fallback_category_name: default_fallback_category(),
        }
    }
}

// =============================================================================
// Push Settings
// =============================================================================

/// Write-through sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    /// Quiet period before a changed collection is pushed (milliseconds).
    /// A change within the window supersedes the pending push.
    #[serde(default = "default_quiet_period")]
    pub quiet_period_ms: u64,

    /// Collections eligible for write-through sync. Changes to collections
    /// outside this list are never pushed.
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,
}

fn default_quiet_period() -> u64 {
    800
}

fn default_allow_list() -> Vec<String> {
    ["products", "categories", "sales", "employees", "customer_accounts"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for PushSettings {
    fn default() -> Self {
        PushSettings {
            quiet_period_ms: default_quiet_period(),
            allow_list: default_allow_list(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Per-tenant default values.
    #[serde(default)]
    pub tenant: TenantDefaults,

    /// Write-through sync settings.
    #[serde(default)]
    pub push: PushSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
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

    /// Loads config or falls back to defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("no config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.tenant.default_branch_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "default_branch_id must not be empty".into(),
            ));
        }

        if self.tenant.fallback_category_name.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "fallback_category_name must not be empty".into(),
            ));
        }

        if self.tenant.standard_tax_rate < 0.0 {
            return Err(SyncError::InvalidConfig(
                "standard_tax_rate must not be negative".into(),
            ));
        }

        if self.push.quiet_period_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "quiet_period_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(branch) = std::env::var("MERIDIAN_DEFAULT_BRANCH_ID") {
            debug!(branch = %branch, "Overriding default branch from environment");
            self.tenant.default_branch_id = branch;
        }

        if let Ok(rate) = std::env::var("MERIDIAN_STANDARD_TAX_RATE") {
            if let Ok(parsed) = rate.parse::<f64>() {
                self.tenant.standard_tax_rate = parsed;
            }
        }

        if let Ok(name) = std::env::var("MERIDIAN_FALLBACK_CATEGORY") {
            self.tenant.fallback_category_name = name;
        }

        if let Ok(quiet) = std::env::var("MERIDIAN_PUSH_QUIET_MS") {
            if let Ok(parsed) = quiet.parse::<u64>() {
                self.push.quiet_period_ms = parsed;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "meridian", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.tenant.default_branch_id, DEFAULT_BRANCH_ID);
        assert_eq!(config.tenant.fallback_category_name, "General");
        assert_eq!(config.push.quiet_period_ms, 800);
        assert!(config.push.allow_list.contains(&"products".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = SyncConfig::default();
        config.push.quiet_period_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.tenant.default_branch_id = "  ".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.tenant.standard_tax_rate = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tenant]"));
        assert!(toml_str.contains("[push]"));

        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tenant.standard_tax_rate, 10.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: SyncConfig = toml::from_str(
            r#"
            [tenant]
            standard_tax_rate = 18.0
            "#,
        )
        .unwrap();

        assert_eq!(parsed.tenant.standard_tax_rate, 18.0);
        assert_eq!(parsed.tenant.default_branch_id, DEFAULT_BRANCH_ID);
        assert_eq!(parsed.push.quiet_period_ms, 800);
    }
}
