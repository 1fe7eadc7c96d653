//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::WalletConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "RSK_CLI_CONFIG";

/// Environment variable overriding the data directory.
pub const HOME_ENV_VAR: &str = "RSK_CLI_HOME";

/// Config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<WalletConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WalletConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Default data directory: `$RSK_CLI_HOME`, else `$HOME/.rsk-cli`, else
/// `./.rsk-cli`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR) {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rsk-cli")
}

/// Resolve and load the effective configuration.
///
/// Lookup order: explicit path, `$RSK_CLI_CONFIG`, `<data_dir>/config.toml`.
/// An explicit or env-provided path must exist; the data-dir file is
/// optional and defaults apply when it is missing. `data_dir` is always
/// filled in on the returned config.
pub fn resolve_config(explicit: Option<&Path>) -> Result<WalletConfig, ConfigError> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let mut config = match requested {
        Some(path) => load_config(&path)?,
        None => {
            let path = default_data_dir().join(CONFIG_FILE_NAME);
            if path.exists() {
                load_config(&path)?
            } else {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                WalletConfig::default()
            }
        }
    };

    if config.data_dir.is_none() {
        config.data_dir = Some(default_data_dir());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            data_dir = "/tmp/rsk-wallets"

            [transactions]
            gas_price_multiplier = 1.1
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/rsk-wallets")));
        assert_eq!(config.transactions.gas_price_multiplier, 1.1);
    }

    #[test]
    fn test_load_config_reports_validation_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[broadcast]\nmax_attempts = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("broadcast.max_attempts"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[status\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = resolve_config(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
