//! Configuration loader with multi-source merging

use crate::{ConfigError, CustodianConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

/// Git-tracked project settings.
const PROJECT_FILE: &str = "custodian.toml";
/// Gitignored per-checkout overrides.
const LOCAL_FILE: &str = "custodian.local.toml";

/// `~/.config/custodian/config.toml` on Linux, when the platform has a
/// config directory at all.
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("com", "Custodian", "custodian")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn toml_layer(
    path: PathBuf,
    required: bool,
) -> config::File<config::FileSourceFile, config::FileFormat> {
    config::File::from(path)
        .required(required)
        .format(config::FileFormat::Toml)
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    explicit_file: Option<PathBuf>,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "CUSTODIAN".to_string(),
            explicit_file: None,
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "CUSTODIAN")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Layer a specific file above the project files. The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skip ~/.config/custodian/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<CustodianConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = CustodianConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/custodian/config.toml)
        if self.user_config {
            if let Some(file) = user_config_file().filter(|f| f.exists()) {
                builder = builder.add_source(toml_layer(file, false));
            }
        }

        // 3. Project config, then 4. local overrides
        for name in [PROJECT_FILE, LOCAL_FILE] {
            let file = self.project_dir.join(name);
            if file.exists() {
                builder = builder.add_source(toml_layer(file, false));
            }
        }

        // 5. Explicit file (--config)
        if let Some(path) = self.explicit_file {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path).into());
            }
            builder = builder.add_source(toml_layer(path, true));
        }

        // 6. Environment variables (CUSTODIAN_ENGINE__SUPER_ROLE=...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("network.company_prefixes")
                .with_list_parse_key("network.company_hosts"),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let custodian_config: CustodianConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        custodian_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(custodian_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> CustodianConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
