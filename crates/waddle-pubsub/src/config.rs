use serde::Deserialize;
use std::path::{Path, PathBuf};

use jid::Jid;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid TOML at line {line}, column {column}: {message}")]
    InvalidToml {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// PubSub client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    pub client: ClientConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Session JID used when an operation does not name one.
    pub jid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Compare the sender of event messages by bare JID.
    #[serde(default = "default_true")]
    pub match_bare_service: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            match_bare_service: true,
        }
    }
}

impl PubSubConfig {
    /// Build a configuration in code.
    pub fn new(jid: impl Into<String>) -> Self {
        Self {
            client: ClientConfig {
                jid: jid.into(),
            },
            notifications: NotificationsConfig::default(),
        }
    }

    /// Enable or disable bare-JID matching of event senders.
    pub fn with_match_bare_service(mut self, enabled: bool) -> Self {
        self.notifications.match_bare_service = enabled;
        self
    }

    /// Check the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self)
    }
}

#[derive(Debug, Default, Clone)]
struct ConfigOverrides {
    jid: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Load configuration from a specific path, merging environment variable
/// overrides.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<PubSubConfig, ConfigError> {
    load_config_from_with_overrides(path.as_ref(), config_overrides_from_env())
}

/// Parse configuration from a TOML string, merging environment variable
/// overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<PubSubConfig, ConfigError> {
    load_config_from_str_with_overrides(toml_str, config_overrides_from_env())
}

fn load_config_from_with_overrides(
    path: &Path,
    overrides: ConfigOverrides,
) -> Result<PubSubConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    load_config_from_str_with_overrides(&contents, overrides)
}

fn load_config_from_str_with_overrides(
    toml_str: &str,
    overrides: ConfigOverrides,
) -> Result<PubSubConfig, ConfigError> {
    let mut config: PubSubConfig = toml::from_str(toml_str).map_err(|e| {
        let (line, column) = e.span().map_or((0, 0), |span| {
            let before = &toml_str[..span.start];
            let line = before.chars().filter(|&c| c == '\n').count() + 1;
            let column = before
                .rfind('\n')
                .map_or(span.start + 1, |nl| span.start - nl);
            (line, column)
        });
        ConfigError::InvalidToml {
            line,
            column,
            message: e.message().to_string(),
        }
    })?;

    apply_overrides(&mut config, overrides);
    validate(&config)?;

    Ok(config)
}

fn config_overrides_from_env() -> ConfigOverrides {
    ConfigOverrides {
        jid: std::env::var("WADDLE_PUBSUB_JID").ok(),
    }
}

fn apply_overrides(config: &mut PubSubConfig, overrides: ConfigOverrides) {
    if let Some(jid) = overrides.jid {
        config.client.jid = jid;
    }
}

fn validate(config: &PubSubConfig) -> Result<(), ConfigError> {
    if config.client.jid.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "client.jid".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if let Err(e) = config.client.jid.parse::<Jid>() {
        return Err(ConfigError::InvalidValue {
            field: "client.jid".to_string(),
            message: e.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_without_env(toml_str: &str) -> Result<PubSubConfig, ConfigError> {
        load_config_from_str_with_overrides(toml_str, ConfigOverrides::default())
    }

    fn minimal_toml() -> &'static str {
        r#"
[client]
jid = "alice@example.com/desk"
"#
    }

    #[test]
    fn test_parses_full_config() {
        let toml = r#"
[client]
jid = "alice@example.com/desk"

[notifications]
match_bare_service = false
"#;
        let config = parse_without_env(toml).unwrap();
        assert_eq!(config.client.jid, "alice@example.com/desk");
        assert!(!config.notifications.match_bare_service);
    }

    #[test]
    fn test_parses_minimal_config_with_defaults() {
        let config = parse_without_env(minimal_toml()).unwrap();
        assert!(config.notifications.match_bare_service);
    }

    #[test]
    fn test_rejects_empty_jid() {
        let err = parse_without_env("[client]\njid = \"\"\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "client.jid"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unparsable_jid() {
        let err = parse_without_env("[client]\njid = \"@example.com\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_missing_client_section() {
        let err = parse_without_env("[notifications]\nmatch_bare_service = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToml { .. }));
    }

    #[test]
    fn test_invalid_toml_reports_position() {
        let toml = "[client]\njid = \"alice@example.com\"\n[notifications\n";
        let err = parse_without_env(toml).unwrap_err();
        match err {
            ConfigError::InvalidToml { line, .. } => assert_eq!(line, 3),
            other => panic!("expected InvalidToml, got {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let overrides = ConfigOverrides {
            jid: Some("bob@example.com".to_string()),
        };
        let config = load_config_from_str_with_overrides(minimal_toml(), overrides).unwrap();
        assert_eq!(config.client.jid, "bob@example.com");
    }

    #[test]
    fn test_builder() {
        let config = PubSubConfig::new("alice@example.com").with_match_bare_service(false);
        assert!(config.validate().is_ok());
        assert!(!config.notifications.match_bare_service);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pubsub.toml");
        std::fs::write(&path, minimal_toml()).unwrap();

        let config = load_config_from_with_overrides(&path, ConfigOverrides::default()).unwrap();
        assert_eq!(config.client.jid, "alice@example.com/desk");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config_from_with_overrides(&path, ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
