use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default config location: `<platform config dir>/docustack/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("docustack").join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads `path` if it exists, otherwise returns the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        let config = Config::default();
        validate_config(&config)?;
        return Ok(config);
    }
    load_config(path)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let extractor = &config.extractor;
    if !extractor.endpoint.starts_with("http://") && !extractor.endpoint.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!(
                "Extractor endpoint must be an http(s) URL: {}",
                extractor.endpoint
            ),
        });
    }

    if extractor.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "Extractor model must not be empty".to_string(),
        });
    }

    if extractor.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Extractor timeoutSecs must be greater than 0".to_string(),
        });
    }

    if config.pipeline.max_concurrency == Some(0) {
        return Err(ConfigError::Validation {
            message: "Pipeline maxConcurrency must be greater than 0".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DEFAULT_API_KEY_ENV_VAR, DEFAULT_ENDPOINT, DEFAULT_MODEL};

    #[test]
    fn test_load_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.extractor.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.extractor.model, DEFAULT_MODEL);
        assert_eq!(
            config.extractor.api_key_env_var.as_deref(),
            Some(DEFAULT_API_KEY_ENV_VAR)
        );
        assert_eq!(config.extractor.timeout_secs, 120);
        assert!(config.pipeline.max_concurrency.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "extractor": {
                "endpoint": "http://localhost:8080/v1beta",
                "model": "gemini-test",
                "apiKeyFile": "/run/secrets/gemini",
                "apiKeyEnvVar": null,
                "timeoutSecs": 30,
                "prompt": "Extract everything."
            },
            "pipeline": { "maxConcurrency": 4 }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.extractor.endpoint, "http://localhost:8080/v1beta");
        assert_eq!(config.extractor.model, "gemini-test");
        assert_eq!(
            config.extractor.api_key_file.as_deref(),
            Some("/run/secrets/gemini")
        );
        assert!(config.extractor.api_key_env_var.is_none());
        assert_eq!(config.extractor.timeout_secs, 30);
        assert_eq!(config.extractor.prompt.as_deref(), Some("Extract everything."));
        assert_eq!(config.pipeline.max_concurrency, Some(4));
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = load_config_from_str(r#"{"extractor": {"endpoint": "ftp://x"}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = load_config_from_str(r#"{"extractor": {"timeoutSecs": 0}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = load_config_from_str(r#"{"pipeline": {"maxConcurrency": 0}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_misspelled_key_rejected() {
        let result = load_config_from_str(r#"{"pipeline": {"maxConcurency": 2}}"#);
        match result {
            Err(ConfigError::ParseJson(e)) => assert!(e.to_string().contains("maxConcurency")),
            other => panic!("expected ParseJson error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = load_config_from_str(r#"{"extractor": {"modle": "x"}, "worker": {}}"#);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let result = load_config("/nonexistent/docustack/config.json");
        match result {
            Err(ConfigError::ReadFile { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/docustack/config.json"));
            }
            other => panic!("expected ReadFile error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = load_config_or_default("/nonexistent/docustack/config.json").unwrap();
        assert_eq!(config.extractor.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = load_config_from_str(r#"{"extractor": {"apiKey": "secret-value"}}"#).unwrap();
        assert_eq!(config.extractor.api_key.as_deref(), Some("secret-value"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-value"));
    }
}
