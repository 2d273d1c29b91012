//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::{Credential, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the upstream API key.
pub const CREDENTIAL_VAR: &str = "OPENAI_API_KEY";
/// Port variables, checked in order.
pub const PORT_VARS: [&str; 2] = ["PORT", "PROXY_PORT"];
/// Overrides `upstream.model`.
pub const MODEL_VAR: &str = "REALTIME_MODEL";
/// Overrides `upstream.url`.
pub const UPSTREAM_URL_VAR: &str = "REALTIME_UPSTREAM_URL";
/// Dotenv file read from the working directory at startup.
pub const DOTENV_FILE: &str = ".env";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Dotenv error: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("{name} is not a valid port: '{value}'")]
    Port { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load variables from a dotenv file into the process environment.
///
/// Variables already present in the environment keep their values. Returns
/// `false` when the file does not exist.
pub fn load_dotenv(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Load and validate configuration from an optional TOML file overlaid with
/// the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Arc<ProxyConfig>, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`], reading variables through `env`.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<Arc<ProxyConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(Arc::new(config))
}

/// Overlay environment variables on top of file/default values.
fn apply_env<F>(config: &mut ProxyConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(secret) = non_empty(CREDENTIAL_VAR) {
        config.credential = Some(Credential::new(secret));
    }

    if let Some((name, value)) = PORT_VARS
        .iter()
        .find_map(|name| non_empty(*name).map(|v| (*name, v)))
    {
        config.listener.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Port { name, value })?;
    }

    if let Some(model) = non_empty(MODEL_VAR) {
        config.upstream.model = model;
    }

    if let Some(url) = non_empty(UPSTREAM_URL_VAR) {
        config.upstream.url = url;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = load_config_with(None, env_from(&[("PORT", "9000")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::MissingCredential]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn port_prefers_port_over_proxy_port() {
        let config = load_config_with(
            None,
            env_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("PORT", "10000"),
                ("PROXY_PORT", "9000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.listener.port, 10000);
    }

    #[test]
    fn port_falls_back_to_proxy_port_then_default() {
        let config = load_config_with(
            None,
            env_from(&[("OPENAI_API_KEY", "sk-test"), ("PROXY_PORT", "9000")]),
        )
        .unwrap();
        assert_eq!(config.listener.port, 9000);

        let config = load_config_with(None, env_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn bad_port_is_reported() {
        let err = load_config_with(
            None,
            env_from(&[("OPENAI_API_KEY", "sk-test"), ("PORT", "http")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Port { name: "PORT", .. }));
    }

    fn scratch_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("realtime-proxy-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn process_env_wins_over_dotenv() {
        let dir = scratch_dir();
        let path = dir.join(".env");
        fs::write(
            &path,
            "REALTIME_PROXY_TEST_PRESET=from-file\nREALTIME_PROXY_TEST_FILE_ONLY=from-file\n",
        )
        .unwrap();

        std::env::set_var("REALTIME_PROXY_TEST_PRESET", "from-process");
        assert!(load_dotenv(&path).unwrap());

        assert_eq!(
            std::env::var("REALTIME_PROXY_TEST_PRESET").unwrap(),
            "from-process"
        );
        assert_eq!(
            std::env::var("REALTIME_PROXY_TEST_FILE_ONLY").unwrap(),
            "from-file"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_dotenv_is_not_an_error() {
        let dir = scratch_dir();
        assert!(!load_dotenv(&dir.join(".env")).unwrap());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dotenv_credential_reaches_config() {
        let dir = scratch_dir();
        let path = dir.join(".env");
        fs::write(&path, "REALTIME_PROXY_TEST_KEY=sk-from-dotenv\n").unwrap();
        load_dotenv(&path).unwrap();

        let config = load_config_with(None, |name: &str| match name {
            CREDENTIAL_VAR => std::env::var("REALTIME_PROXY_TEST_KEY").ok(),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            config.credential.as_ref().map(|c| c.bearer()),
            Some("Bearer sk-from-dotenv".to_string())
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = scratch_dir();
        let path = dir.join("proxy.toml");
        fs::write(
            &path,
            "[listener]\nport = 7000\n\n[upstream]\nmodel = \"from-file\"\n",
        )
        .unwrap();

        let config = load_config_with(
            Some(&path),
            env_from(&[("OPENAI_API_KEY", "sk-test"), ("REALTIME_MODEL", "from-env")]),
        )
        .unwrap();
        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.upstream.model, "from-env");

        fs::remove_dir_all(&dir).unwrap();
    }
}
