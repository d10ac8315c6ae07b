//! User configuration loaded from `config.toml`.
//!
//! The file is optional. A missing file yields defaults; a malformed one is
//! reported to the caller, which logs it and falls back to defaults too, so a
//! typo never prevents startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default number of diff characters sent to the generator.
pub const DEFAULT_MAX_DIFF_CHARS: usize = 60_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level `config.toml` contents.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `"dark"` or `"catppuccin-mocha"`.
    pub theme: String,
    pub generator: Option<GeneratorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "dark".to_owned(),
            generator: None,
        }
    }
}

/// Settings for the remote text-completion endpoint.
///
/// Built once per process from the config file and handed to
/// `GeneratorClient::new`; nothing reads it from global state.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token. The token
    /// itself never lives in the config file.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,
}

fn default_model() -> String {
    "default".to_owned()
}

fn default_max_diff_chars() -> usize {
    DEFAULT_MAX_DIFF_CHARS
}

/// Returns the path to the streamrev config file.
///
/// Prefers `$XDG_CONFIG_HOME/streamrev/config.toml`; falls back to
/// `~/.config/streamrev/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("streamrev").join("config.toml")
}

/// Loads the config at `path`. A missing file is not an error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            })
        }
    };
    parse_config(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn parse_config(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn generator_section_applies_field_defaults() {
        let config = parse_config(
            r#"
            theme = "catppuccin-mocha"

            [generator]
            endpoint = "http://localhost:8080/v1/completions"
            api_key_env = "REVIEW_API_KEY"
            "#,
        )
        .unwrap();
        assert_eq!(config.theme, "catppuccin-mocha");
        assert_eq!(
            config.generator,
            Some(GeneratorConfig {
                endpoint: "http://localhost:8080/v1/completions".to_owned(),
                model: "default".to_owned(),
                api_key_env: Some("REVIEW_API_KEY".to_owned()),
                max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
            })
        );
    }

    #[test]
    fn generator_requires_endpoint() {
        assert!(parse_config("[generator]\nmodel = \"x\"\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("colour = \"blue\"\n").is_err());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = [").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
