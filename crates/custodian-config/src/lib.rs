//! Configuration management for Custodian
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (CUSTODIAN_* prefix, `__` between section and key)
//! 2. An explicit file passed to [`ConfigLoader::with_file`]
//! 3. custodian.local.toml (gitignored, local overrides)
//! 4. custodian.toml (git-tracked, project config)
//! 5. ~/.config/custodian/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [engine]
//! super_role = "ADMIN"
//! store_timeout_ms = 2000
//!
//! [rules]
//! default_effect = "allow"
//! work_start_hour = 8
//! work_end_hour = 18
//!
//! [attributes]
//! fail_open_on_error = true
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Largest accepted UTC offset, exclusive, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60;

/// Main Custodian configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodianConfig {
    pub engine: EngineConfig,
    pub rules: RulesConfig,
    pub network: NetworkConfig,
    pub attributes: AttributesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role name that bypasses RBAC checks and may reclassify resources.
    pub super_role: String,
    /// Upper bound on each gate's store work.
    pub store_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            super_role: "ADMIN".to_string(),
            store_timeout_ms: 2000,
        }
    }
}

impl EngineConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Outcome of rule evaluation when no active rule matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultEffect {
    Allow,
    Deny,
}

impl fmt::Display for DefaultEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefaultEffect::Allow => "allow",
            DefaultEffect::Deny => "deny",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub default_effect: DefaultEffect,
    /// First working hour, inclusive.
    pub work_start_hour: u32,
    /// Last working hour, exclusive.
    pub work_end_hour: u32,
    /// Offset of local time from UTC.
    pub utc_offset_minutes: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_effect: DefaultEffect::Allow,
            work_start_hour: 8,
            work_end_hour: 18,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address prefixes on the company network.
    pub company_prefixes: Vec<String>,
    /// Individual addresses on the company network.
    pub company_hosts: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            company_prefixes: vec!["10.".to_string(), "192.168.".to_string()],
            company_hosts: vec!["127.0.0.1".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesConfig {
    /// Skip the attribute gate, rather than fail, when attributes can't be fetched.
    pub fail_open_on_error: bool,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            fail_open_on_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CustodianConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Create a configuration where both availability defaults deny
    pub fn strict() -> Self {
        Self {
            rules: RulesConfig {
                default_effect: DefaultEffect::Deny,
                ..Default::default()
            },
            attributes: AttributesConfig {
                fail_open_on_error: false,
            },
            ..Default::default()
        }
    }

    /// Check invariants the type system can't express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.super_role.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.super_role must not be empty".to_string(),
            ));
        }
        if self.engine.store_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "engine.store_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let RulesConfig {
            work_start_hour: start,
            work_end_hour: end,
            utc_offset_minutes: offset,
            ..
        } = self.rules;
        if start >= end || end > 24 {
            return Err(ConfigError::ValidationError(format!(
                "working hours must satisfy start < end <= 24, got {start}..{end}"
            )));
        }
        if offset.abs() >= MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::ValidationError(format!(
                "rules.utc_offset_minutes out of range: {offset}"
            )));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CustodianConfig::default();
        assert_eq!(config.engine.super_role, "ADMIN");
        assert_eq!(config.engine.store_timeout(), Duration::from_secs(2));
        assert_eq!(config.rules.default_effect, DefaultEffect::Allow);
        assert_eq!(config.rules.work_start_hour, 8);
        assert_eq!(config.rules.work_end_hour, 18);
        assert_eq!(config.network.company_prefixes, ["10.", "192.168."]);
        assert!(config.attributes.fail_open_on_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = CustodianConfig::strict();
        assert_eq!(config.rules.default_effect, DefaultEffect::Deny);
        assert!(!config.attributes.fail_open_on_error);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = CustodianConfig::default();
        config.rules.work_start_hour = 18;
        config.rules.work_end_hour = 8;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = CustodianConfig::default();
        config.engine.super_role = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = CustodianConfig::default();
        config.engine.store_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CustodianConfig::default();
        config.rules.utc_offset_minutes = -24 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CustodianConfig::strict();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("default_effect = \"deny\""));

        let parsed: CustodianConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: CustodianConfig = toml::from_str(
            r#"
[rules]
work_end_hour = 17
"#,
        )
        .unwrap();
        assert_eq!(parsed.rules.work_start_hour, 8);
        assert_eq!(parsed.rules.work_end_hour, 17);
        assert_eq!(parsed.engine.super_role, "ADMIN");
    }
}
