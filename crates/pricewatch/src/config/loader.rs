use std::path::Path;

use crate::config::schema::PricewatchConfig;
use crate::error::ConfigError;

/// Environment variable that overrides `module_root`.
pub const ROOT_ENV_VAR: &str = "PRICEWATCH_ROOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PricewatchConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content, format)?;

    // A relative module root is relative to the config file, not the cwd.
    if config.module_root.is_relative() {
        if let Some(parent) = path.parent() {
            config.module_root = parent.join(&config.module_root);
        }
    }

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

pub fn load_config_from_str(
    content: &str,
    format: ConfigFormat,
) -> Result<PricewatchConfig, ConfigError> {
    let config: PricewatchConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => {
            if content.trim().is_empty() {
                PricewatchConfig::default()
            } else {
                serde_yaml::from_str(content)?
            }
        }
    };

    validate_config(&config)?;

    Ok(config)
}

pub fn apply_env_overrides(config: &mut PricewatchConfig) {
    if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
        if !root.trim().is_empty() {
            log::debug!("Module root overridden by {}: {}", ROOT_ENV_VAR, root);
            config.module_root = root.into();
        }
    }
}

fn validate_config(config: &PricewatchConfig) -> Result<(), ConfigError> {
    let required = [
        ("python_executable", &config.python_executable),
        ("run_script", &config.run_script),
        ("analyze_script", &config.analyze_script),
        ("config_manager_script", &config.config_manager_script),
        ("hotels_file", &config.hotels_file),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("'{}' must not be empty", name),
            });
        }
    }

    if config.log_retention == 0 {
        return Err(ConfigError::Validation {
            message: "'log_retention' must be at least 1".to_string(),
        });
    }

    if config.total_properties == Some(0) {
        return Err(ConfigError::Validation {
            message: "'total_properties' must be greater than 0 when set".to_string(),
        });
    }

    Ok(())
}
