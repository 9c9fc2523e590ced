//! Configuration resolution for webgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (<config dir>/webgate/settings.json)
//! 3. Project config (.webgate/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete webgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub handshake: HandshakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What happens to a decision the host never answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Stay pending until the host answers, the page navigates away, or the
    /// component is torn down.
    #[default]
    UntilTeardown,
    /// Apply the restrictive default once `pending_timeout_secs` elapse.
    Timeout,
}

impl FromStr for DefaultPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "until_teardown" | "until-teardown" => Ok(Self::UntilTeardown),
            "timeout" => Ok(Self::Timeout),
            other => Err(Error::Config(format!("Unknown default policy: {other}"))),
        }
    }
}

impl fmt::Display for DefaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UntilTeardown => "until_teardown",
            Self::Timeout => "timeout",
        })
    }
}

/// How grants outside the offered set are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// Grant the intersection with what was offered; deny if it is empty.
    #[default]
    Clamp,
    /// Deny the whole request.
    Reject,
}

impl FromStr for GrantPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Config(format!("Unknown grant policy: {other}"))),
        }
    }
}

impl fmt::Display for GrantPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clamp => "clamp",
            Self::Reject => "reject",
        })
    }
}

/// Handshake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    pub default_policy: DefaultPolicy,
    /// Deadline for host answers under [`DefaultPolicy::Timeout`] (seconds).
    pub pending_timeout_secs: u64,
    /// How often the expiry sweeper runs (seconds).
    pub sweep_interval_secs: u64,
    pub grant_policy: GrantPolicy,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            default_policy: DefaultPolicy::UntilTeardown,
            pending_timeout_secs: 60,
            sweep_interval_secs: 1,
            grant_policy: GrantPolicy::Clamp,
        }
    }
}

impl HandshakeConfig {
    /// Pending deadline, `None` when decisions wait for teardown.
    pub const fn pending_timeout(&self) -> Option<Duration> {
        match self.default_policy {
            DefaultPolicy::UntilTeardown => None,
            DefaultPolicy::Timeout => Some(Duration::from_secs(self.pending_timeout_secs)),
        }
    }

    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = load_config_files(global_config_path().as_deref(), project_dir)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("webgate").join("settings.json"))
}

fn load_config_files(global_path: Option<&Path>, project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = global_path
        && path.exists()
    {
        let global = load_config_file(path)?;
        merge_config(&mut config, global);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".webgate").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.handshake = overlay.handshake;
    base.logging = overlay.logging;
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("WEBGATE_DEFAULT_POLICY") {
        match val.parse() {
            Ok(policy) => config.handshake.default_policy = policy,
            Err(e) => tracing::warn!(%e, "Ignoring WEBGATE_DEFAULT_POLICY"),
        }
    }
    if let Some(val) = var("WEBGATE_PENDING_TIMEOUT_SECS")
        && let Ok(n) = val.parse()
    {
        config.handshake.pending_timeout_secs = n;
    }
    if let Some(val) = var("WEBGATE_SWEEP_INTERVAL_SECS")
        && let Ok(n) = val.parse()
    {
        config.handshake.sweep_interval_secs = n;
    }
    if let Some(val) = var("WEBGATE_GRANT_POLICY") {
        match val.parse() {
            Ok(policy) => config.handshake.grant_policy = policy,
            Err(e) => tracing::warn!(%e, "Ignoring WEBGATE_GRANT_POLICY"),
        }
    }
    if let Some(val) = var("WEBGATE_LOG_LEVEL") {
        config.logging.level = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_waits_for_teardown() {
        let config = Config::default();
        assert_eq!(config.handshake.default_policy, DefaultPolicy::UntilTeardown);
        assert_eq!(config.handshake.pending_timeout(), None);
        assert_eq!(config.handshake.grant_policy, GrantPolicy::Clamp);
    }

    #[test]
    fn timeout_policy_exposes_deadline() {
        let config = HandshakeConfig {
            default_policy: DefaultPolicy::Timeout,
            pending_timeout_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.pending_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn project_config_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        std::fs::write(
            &global,
            r#"{"handshake":{"grant_policy":"reject"},"logging":{"level":"debug"}}"#,
        )
        .unwrap();

        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join(".webgate")).unwrap();
        std::fs::write(
            project.join(".webgate").join("settings.json"),
            r#"{"handshake":{"default_policy":"timeout","pending_timeout_secs":3}}"#,
        )
        .unwrap();

        let config = load_config_files(Some(&global), Some(&project)).unwrap();
        assert_eq!(config.handshake.default_policy, DefaultPolicy::Timeout);
        assert_eq!(config.handshake.pending_timeout_secs, 3);
        // Sections are replaced wholesale by the higher layer.
        assert_eq!(config.handshake.grant_policy, GrantPolicy::Clamp);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("settings.json");
        std::fs::write(&global, "{ not json").unwrap();

        let err = load_config_files(Some(&global), None).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("Failed to parse")));
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "WEBGATE_DEFAULT_POLICY" => Some("timeout".into()),
            "WEBGATE_PENDING_TIMEOUT_SECS" => Some("10".into()),
            "WEBGATE_GRANT_POLICY" => Some("sometimes".into()),
            "WEBGATE_LOG_LEVEL" => Some("trace".into()),
            _ => None,
        });
        assert_eq!(config.handshake.default_policy, DefaultPolicy::Timeout);
        assert_eq!(config.handshake.pending_timeout_secs, 10);
        assert_eq!(config.handshake.grant_policy, GrantPolicy::Clamp);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn policies_parse_from_cli_spelling() {
        assert_eq!(
            "until-teardown".parse::<DefaultPolicy>().unwrap(),
            DefaultPolicy::UntilTeardown
        );
        assert_eq!("reject".parse::<GrantPolicy>().unwrap(), GrantPolicy::Reject);
        assert!("never".parse::<GrantPolicy>().is_err());
    }
}
