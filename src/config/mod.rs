//! Loading of the `kubeauditConfig` override-policy file.
//!
//! The file is read once at startup. A malformed file is fatal: callers
//! get a [`ConfigError`] before any audit runs.

pub mod types;

pub use types::{
    CapabilityPolicy, ConfigSpec, DEFAULT_DROP_CAPABILITIES, KubeauditConfig, OverrideField,
    OverridePolicy, Overrides,
};

use log::debug;
use std::path::Path;

/// Errors raised while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl KubeauditConfig {
    /// Load configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::load_from_str(&content)?;
        debug!("Loaded kubeaudit config from {}", path.display());
        Ok(config)
    }
}

/// Load the config file when a path was given.
pub fn load_config(path: Option<&Path>) -> Result<Option<KubeauditConfig>, ConfigError> {
    path.map(KubeauditConfig::load_from_file).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
apiVersion: v1
kind: kubeauditConfig
audit: true
spec:
  capabilities:
    NET_RAW: drop
    CHOWN: keep
    SYS_ADMIN: drop
  overrides:
    run-as-root: allow
    privileged: deny
"#;

    #[test]
    fn test_load_from_str() {
        let config = KubeauditConfig::load_from_str(SAMPLE).unwrap();
        assert_eq!(config.kind, "kubeauditConfig");
        assert!(config.audit);
        assert_eq!(
            config.override_policy(OverrideField::RunAsRoot),
            Some(OverridePolicy::Allow)
        );
        assert_eq!(
            config.override_policy(OverrideField::Privileged),
            Some(OverridePolicy::Deny)
        );
        assert_eq!(config.override_policy(OverrideField::AutomountServiceAccountToken), None);
        assert_eq!(config.drop_capabilities(), vec!["NET_RAW", "SYS_ADMIN"]);
    }

    #[test]
    fn test_missing_sections() {
        let config = KubeauditConfig::load_from_str("apiVersion: v1\nkind: kubeauditConfig\n").unwrap();
        assert!(config.spec.is_none());
        assert_eq!(config.override_policy(OverrideField::RunAsRoot), None);
        assert_eq!(config.drop_capabilities().len(), DEFAULT_DROP_CAPABILITIES.len());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(KubeauditConfig::load_from_str("spec: [unclosed").is_err());
        assert!(KubeauditConfig::load_from_str("spec:\n  overrides:\n    run-as-root: maybe\n").is_err());
        assert!(KubeauditConfig::load_from_str("spec:\n  overrides:\n    no-such-key: allow\n").is_err());
    }

    #[test]
    fn test_override_field_mapping() {
        assert_eq!(
            OverrideField::from_override_key("allow-run-as-root"),
            Some(OverrideField::RunAsRoot)
        );
        assert_eq!(
            OverrideField::from_override_key("non-default-deny-egress-network-policy"),
            Some(OverrideField::NonDefaultDenyEgressNetworkPolicy)
        );
        assert_eq!(OverrideField::from_override_key("allow-capability-NET-RAW"), None);
        assert_eq!(OverrideField::RunAsRoot.field_name(), "RunAsRoot");
        assert_eq!(
            OverrideField::AutomountServiceAccountToken.field_name(),
            "AutomountServiceAccountToken"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(Some(file.path())).unwrap().unwrap();
        assert!(config.audit);

        assert!(load_config(None).unwrap().is_none());
        assert!(matches!(
            load_config(Some(Path::new("/nonexistent/kubeaudit.yaml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}
