//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wa_core::{Policy, UserId, WeeklyBaseline};

/// Default connector deadline, in seconds.
const DEFAULT_CONNECTOR_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Whose baseline and audit trail this is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Expected working hours.
    #[serde(default)]
    pub baseline: WeeklyBaseline,

    /// Durations, keywords and thresholds for the pipeline.
    #[serde(default)]
    pub policy: Policy,

    /// Evidence sources queried by `collect`, `reconstruct` and `prefill`.
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,

    /// Per-connector deadline.
    #[serde(default = "default_connector_timeout_secs")]
    pub connector_timeout_secs: u64,
}

/// One configured evidence source.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectorConfig {
    /// A JSON export on disk.
    File { name: String, path: PathBuf },
    /// A JSON endpoint queried by date range.
    Http {
        name: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl ConnectorConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Http { name, .. } => name,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Http { .. } => "http",
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { name, path } => f
                .debug_struct("File")
                .field("name", name)
                .field("path", path)
                .finish(),
            Self::Http { name, url, token } => f
                .debug_struct("Http")
                .field("name", name)
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "[REDACTED]"))
                .finish(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("user_id", &self.user_id)
            .field("baseline", &self.baseline)
            .field("policy", &self.policy)
            .field("connectors", &self.connectors)
            .field("connector_timeout_secs", &self.connector_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("wa.db"),
            user_id: None,
            baseline: WeeklyBaseline {
                hours_per_day: 8.0,
                ..WeeklyBaseline::default()
            },
            policy: Policy::default(),
            connectors: Vec::new(),
            connector_timeout_secs: DEFAULT_CONNECTOR_TIMEOUT_SECS,
        }
    }
}

const fn default_connector_timeout_secs() -> u64 {
    DEFAULT_CONNECTOR_TIMEOUT_SECS
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WA_*)
        figment = figment.merge(Env::prefixed("WA_"));

        figment.extract()
    }

    pub const fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }
}

/// Returns the platform-specific config directory for wa.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wa"))
}

/// Returns the platform-specific data directory for wa.
///
/// On Linux: `~/.local/share/wa`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wa"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_dirs_data_path_ends_with_wa() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "wa");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("wa.db"));
        assert!((config.baseline.hours_per_day - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.connector_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
database_path = "/tmp/wa-test.db"
user_id = "jdoe"
connector_timeout_secs = 5

[baseline]
hours_per_day = 6.5
off_days = ["2025-01-01"]

[policy.durations]
email_minutes_each = 10

[[connectors]]
kind = "file"
name = "export"
path = "/tmp/artifacts.json"

[[connectors]]
kind = "http"
name = "crm"
url = "https://crm.example.com/artifacts"
token = "secret-token"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/wa-test.db"));
        assert_eq!(config.user_id.as_ref().map(UserId::as_str), Some("jdoe"));
        assert!((config.baseline.hours_per_day - 6.5).abs() < f64::EPSILON);
        assert_eq!(config.baseline.off_days.len(), 1);
        assert_eq!(config.policy.durations.email_minutes_each, 10);
        // Untouched policy fields keep their defaults.
        assert_eq!(config.policy.durations.document_minutes, 120);
        assert_eq!(config.connectors.len(), 2);
        assert_eq!(config.connectors[1].kind(), "http");
        assert_eq!(config.connector_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_connector_token() {
        let config = Config {
            connectors: vec![ConnectorConfig::Http {
                name: "crm".to_string(),
                url: "https://crm.example.com".to_string(),
                token: Some("secret-token".to_string()),
            }],
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
