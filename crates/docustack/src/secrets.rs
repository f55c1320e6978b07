//! API key resolution for the extraction service.
//!
//! Sources are tried in priority order:
//!
//! 1. **Direct value** - `apiKey`, for quick local testing
//! 2. **Key file** - `apiKeyFile`, e.g. a mounted secret at `/run/secrets/gemini`
//! 3. **Env var** - `apiKeyEnvVar`, `GEMINI_API_KEY` by default
//!
//! Empty values count as "not provided" and fall through to the next source.

use std::fs;

use secrecy::SecretString;

use crate::config::ExtractorConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key source configured (set apiKey, apiKeyFile or apiKeyEnvVar)")]
    NoSourceProvided,

    #[error("Cannot read API key file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API key variable '{name}' is not set")]
    EnvVarNotSet { name: String },

    #[error("API key variable '{name}' is not valid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Where a resolved key came from. Logged, never the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Direct,
    File,
    EnvVar,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Direct => "config value",
            SecretSource::File => "key file",
            SecretSource::EnvVar => "environment variable",
        }
    }
}

/// Resolves a secret from a direct value, then a file, then an env var.
///
/// File contents and env values are trimmed, so a trailing newline in a key
/// file does not end up in request headers.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    resolve_with_source(direct, file_path, env_var).map(|(secret, _)| secret)
}

fn resolve_with_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<(SecretString, SecretSource), SecretError> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok((SecretString::from(value.to_string()), SecretSource::Direct));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let path = expand_home(path);
        let content = fs::read_to_string(&path)
            .map_err(|source| SecretError::FileReadError { path, source })?;
        return Ok((SecretString::from(content.trim().to_string()), SecretSource::File));
    }

    let Some(name) = env_var.filter(|n| !n.is_empty()) else {
        return Err(SecretError::NoSourceProvided);
    };
    match std::env::var(name) {
        Ok(value) => Ok((SecretString::from(value.trim().to_string()), SecretSource::EnvVar)),
        Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Resolves the API key configured for the extraction service.
pub fn resolve_api_key(config: &ExtractorConfig) -> Result<SecretString, SecretError> {
    let (key, source) = resolve_with_source(
        config.api_key.as_deref(),
        config.api_key_file.as_deref(),
        config.api_key_env_var.as_deref(),
    )?;
    log::debug!("Extraction API key taken from {}", source.as_str());
    Ok(key)
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };
    match path.strip_prefix('~') {
        Some("") => home.to_string_lossy().into_owned(),
        Some(rest) if rest.starts_with('/') => format!("{}{}", home.to_string_lossy(), rest),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use tempfile::TempDir;

    fn key_file(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("gemini.key");
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    #[serial]
    fn test_config_value_wins() {
        std::env::set_var("DOCUSTACK_KEY_A", "from-env");
        let dir = TempDir::new().unwrap();
        let file = key_file(&dir, "from-file");

        let (key, source) =
            resolve_with_source(Some("from-config"), Some(&file), Some("DOCUSTACK_KEY_A")).unwrap();
        assert_eq!(key.expose_secret(), "from-config");
        assert_eq!(source, SecretSource::Direct);
        std::env::remove_var("DOCUSTACK_KEY_A");
    }

    #[test]
    #[serial]
    fn test_key_file_before_env_var() {
        std::env::set_var("DOCUSTACK_KEY_B", "from-env");
        let dir = TempDir::new().unwrap();
        let file = key_file(&dir, "from-file\n");

        let (key, source) = resolve_with_source(None, Some(&file), Some("DOCUSTACK_KEY_B")).unwrap();
        assert_eq!(key.expose_secret(), "from-file");
        assert_eq!(source, SecretSource::File);
        std::env::remove_var("DOCUSTACK_KEY_B");
    }

    #[test]
    #[serial]
    fn test_empty_values_fall_through_to_env() {
        std::env::set_var("DOCUSTACK_KEY_C", "  from-env\n");
        let key = resolve_secret(Some(""), Some(""), Some("DOCUSTACK_KEY_C")).unwrap();
        assert_eq!(key.expose_secret(), "from-env");
        std::env::remove_var("DOCUSTACK_KEY_C");
    }

    #[test]
    #[serial]
    fn test_unset_env_var() {
        std::env::remove_var("DOCUSTACK_KEY_D");
        let err = resolve_secret(None, None, Some("DOCUSTACK_KEY_D")).unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { ref name } if name == "DOCUSTACK_KEY_D"));
    }

    #[test]
    fn test_nothing_configured() {
        assert!(matches!(
            resolve_secret(None, Some(""), None),
            Err(SecretError::NoSourceProvided)
        ));
    }

    #[test]
    fn test_unreadable_key_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.key");
        let err = resolve_secret(None, missing.to_str(), None).unwrap_err();
        assert!(matches!(err, SecretError::FileReadError { .. }));
        assert!(err.to_string().contains("absent.key"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/key"), "/etc/key");
        assert_eq!(expand_home("~user/key"), "~user/key");
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy().into_owned();
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/keys/gemini"), format!("{}/keys/gemini", home));
        }
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let config = ExtractorConfig {
            api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&config).unwrap().expose_secret(), "abc123");
    }
}
