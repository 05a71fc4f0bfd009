//! Layered configuration: built-in defaults → YAML file → `GATEWAY__`-
//! prefixed environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub spec: SpecConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS whitelist (`ORIGINS`). Empty means CORS is disabled rather than
    /// wide open, so an operator has to opt a gateway into cross-origin use.
    #[serde(default)]
    pub origins: Vec<String>,
    /// Overrides the host/scheme used to build pagination URLs (`BASE_URL`).
    /// When absent, the handler derives it from the request's `Host` header
    /// and forces `https`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            origins: Vec::new(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpecConfig {
    /// Path to the OpenAPI document this gateway serves.
    pub path: String,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            path: "openapi.yaml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    KeyStore,
    CollectionStore,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::KeyStore,
        }
    }
}

/// Mirrors `KMS_KEY_INFO`: presence (any field set) enables cursor sealing.
/// The real KMS encrypt/decrypt call is an external collaborator (§6); this
/// gateway seals cursors locally with AES-256-GCM as a dev/test stand-in,
/// keyed off the same three coordinates a managed KMS key is named by.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CursorConfig {
    #[serde(default)]
    pub kms: Option<KmsKeyInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KmsKeyInfo {
    pub keyring: String,
    pub key: String,
    pub location: String,
    pub project: String,
}

/// `AUDIT_LOGS_NAME`: a non-empty table name enables audit logging.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    #[serde(default)]
    pub logs_name: Option<String>,
}

impl AuditConfig {
    pub fn is_enabled(&self) -> bool {
        self.logs_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

pub type LoggingConfig = std::collections::HashMap<String, LogSection>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSection {
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            spec: SpecConfig::default(),
            storage: StorageConfig::default(),
            cursor: CursorConfig::default(),
            audit: AuditConfig::default(),
            logging: default_logging_config(),
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = LoggingConfig::new();
    logging.insert(
        "default".to_string(),
        LogSection {
            level: "info".to_string(),
        },
    );
    logging
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub spec_path: Option<String>,
    pub verbose: u8,
}

impl AppConfig {
    /// Loads defaults, layers a YAML file over them if present, then layers
    /// `GATEWAY__SERVER__PORT`-style environment variables on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        use figment::providers::{Env, Format, Serialized, Yaml};
        use figment::Figment;

        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("GATEWAY__").split("__"));

        figment
            .extract()
            .context("failed to assemble gateway configuration")
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(spec_path) = &overrides.spec_path {
            self.spec.path = spec_path.clone();
        }
        if overrides.verbose > 0 {
            let level = if overrides.verbose == 1 { "debug" } else { "trace" };
            self.logging
                .entry("default".to_string())
                .or_insert_with(|| LogSection { level: level.to_string() })
                .level = level.to_string();
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize configuration to YAML")
    }

    pub fn spec_path(&self) -> PathBuf {
        PathBuf::from(&self.spec.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::KeyStore);
        assert!(config.server.origins.is_empty());
        assert!(config.server.base_url.is_none());
        assert!(config.cursor.kms.is_none());
        assert!(!config.audit.is_enabled());
    }

    #[test]
    fn audit_enabled_requires_non_empty_name() {
        let mut audit = AuditConfig::default();
        assert!(!audit.is_enabled());
        audit.logs_name = Some(String::new());
        assert!(!audit.is_enabled());
        audit.logs_name = Some("GatewayAudit".to_string());
        assert!(audit.is_enabled());
    }

    #[test]
    fn cli_override_replaces_port_and_verbosity() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliOverrides {
            port: Some(9090),
            spec_path: None,
            verbose: 2,
        });
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging["default"].level, "trace");
    }
}
