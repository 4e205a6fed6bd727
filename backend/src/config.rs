use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Tunables read from `config/analyzer.yaml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub inference: InferenceSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl AnalyzerSettings {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: Url,
    pub port: u16,
    pub frontend_dir: String,
    pub settings: AnalyzerSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from a variable lookup. Environment values
    /// take precedence over the YAML file.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let base_url = parse_base_url(
            &lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                reason: format!("'{}' is not a port number", raw),
            })?,
            None => DEFAULT_PORT,
        };

        let frontend_dir = lookup("FRONTEND_DIR").unwrap_or_else(|| {
            match lookup("CARGO_MANIFEST_DIR") {
                Some(manifest_dir) => format!("{}/../frontend/dist", manifest_dir),
                None => "/usr/src/app/frontend/dist".to_string(),
            }
        });

        let mut settings = match settings_path(&lookup) {
            Some((path, required)) if required || path.exists() => AnalyzerSettings::load(&path)?,
            _ => AnalyzerSettings::default(),
        };

        if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.trim().is_empty()) {
            settings.inference.model = model;
        }
        if let Some(raw) = lookup("OPENAI_MAX_TOKENS") {
            settings.inference.max_tokens = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "OPENAI_MAX_TOKENS",
                reason: format!("'{}' is not a token count", raw),
            })?;
        }

        Ok(Self {
            api_key,
            base_url,
            port,
            frontend_dir,
            settings,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Explicit `ANALYZER_CONFIG` paths must exist; the default location is optional.
fn settings_path<F>(lookup: &F) -> Option<(PathBuf, bool)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("ANALYZER_CONFIG") {
        return Some((PathBuf::from(path), true));
    }
    lookup("CARGO_MANIFEST_DIR")
        .map(|dir| (PathBuf::from(format!("{}/../config/analyzer.yaml", dir)), false))
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidValue {
        key: "OPENAI_BASE_URL",
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue {
            key: "OPENAI_BASE_URL",
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url.as_str(), "https://api.openai.com/v1/");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.settings, AnalyzerSettings::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("OPENAI_API_KEY")));
    }

    #[test]
    fn environment_overrides_model_and_tokens() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_MAX_TOKENS", "1500"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.settings.inference.model, "gpt-4o-mini");
        assert_eq!(config.settings.inference.max_tokens, 1500);
        assert_eq!(config.base_url.as_str(), "http://localhost:11434/v1/");
    }

    #[test]
    fn rejects_bad_port_and_scheme() {
        let port = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "k"), ("PORT", "http")]));
        assert!(matches!(port, Err(ConfigError::InvalidValue { key: "PORT", .. })));

        let scheme = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_BASE_URL", "ftp://example.com"),
        ]));
        assert!(matches!(
            scheme,
            Err(ConfigError::InvalidValue { key: "OPENAI_BASE_URL", .. })
        ));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "k"),
            ("ANALYZER_CONFIG", "/nonexistent/analyzer.yaml"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings = AnalyzerSettings::from_yaml("inference:\n  max_tokens: 1500\n").unwrap();
        assert_eq!(settings.inference.max_tokens, 1500);
        assert_eq!(settings.inference.model, DEFAULT_MODEL);
        assert_eq!(settings.upload, UploadSettings::default());
    }
}
