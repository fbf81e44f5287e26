//! API key resolution.
//!
//! The key comes from a YAML secrets file when one is configured, otherwise
//! from the `GROQ_API_KEY` environment variable. Failing to find one is a
//! configuration error, fatal at startup.

use serde::Deserialize;
use utf8path::Path;

use crate::error::{Error, Result};

/// Environment variable consulted when no secrets file supplies a key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Layout of the secrets file.
///
/// ```yaml
/// GROQ_API_KEY: gsk_...
/// ```
#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    #[serde(rename = "GROQ_API_KEY", default)]
    groq_api_key: Option<String>,
}

/// Resolves the API key from `secrets_path`, falling back to the environment.
pub fn resolve_api_key(secrets_path: Option<&Path>) -> Result<String> {
    resolve_api_key_with(secrets_path, std::env::var(API_KEY_ENV).ok())
}

/// Resolves the API key with an explicit environment value.
///
/// A secrets file that exists but cannot be read or parsed is an error even
/// when the environment holds a key.
pub fn resolve_api_key_with(
    secrets_path: Option<&Path>,
    env_value: Option<String>,
) -> Result<String> {
    if let Some(path) = secrets_path {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::config(
                format!("failed to read secrets file {}", path.as_str()),
                Some(Box::new(err)),
            )
        })?;
        let secrets: SecretsFile = serde_yaml::from_str(&content).map_err(|err| {
            Error::config(
                format!("malformed secrets file {}: {err}", path.as_str()),
                Some(Box::new(err)),
            )
        })?;
        if let Some(key) = non_empty(secrets.groq_api_key) {
            return Ok(key);
        }
    }
    non_empty(env_value).ok_or_else(|| {
        Error::config(
            format!("no API key: set {API_KEY_ENV} or provide it in a secrets file"),
            None,
        )
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_secrets(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "dataeng-chat-{name}-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn secrets_file_wins_over_environment() {
        let file = write_secrets("wins", "GROQ_API_KEY: gsk_file\n");
        let path = Path::try_from(file.clone()).unwrap();
        let key = resolve_api_key_with(Some(&path), Some("gsk_env".to_string())).unwrap();
        assert_eq!(key, "gsk_file");
        let _ = std::fs::remove_file(file);
    }

    #[test]
    fn falls_back_to_environment() {
        let file = write_secrets("fallback", "OTHER_KEY: value\n");
        let path = Path::try_from(file.clone()).unwrap();
        let key = resolve_api_key_with(Some(&path), Some("gsk_env".to_string())).unwrap();
        assert_eq!(key, "gsk_env");
        let _ = std::fs::remove_file(file);

        let key = resolve_api_key_with(None, Some(" gsk_env \n".to_string())).unwrap();
        assert_eq!(key, "gsk_env");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = resolve_api_key_with(None, None).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(API_KEY_ENV));
        let err = resolve_api_key_with(None, Some("   ".to_string())).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn unreadable_secrets_file_is_config_error() {
        let path = Path::from("/nonexistent/dataeng-chat/secrets.yaml");
        let err = resolve_api_key_with(Some(&path), Some("gsk_env".to_string())).unwrap_err();
        assert!(err.is_config());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn malformed_secrets_file_is_config_error() {
        let file = write_secrets("malformed", "GROQ_API_KEY: [unterminated\n");
        let path = Path::try_from(file.clone()).unwrap();
        let err = resolve_api_key_with(Some(&path), None).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("malformed secrets file"));
        let _ = std::fs::remove_file(file);
    }
}
