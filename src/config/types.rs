use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capabilities every container is expected to drop when the config file
/// does not list its own.
pub const DEFAULT_DROP_CAPABILITIES: &[&str] = &[
    "AUDIT_WRITE",
    "CHOWN",
    "DAC_OVERRIDE",
    "FOWNER",
    "FSETID",
    "KILL",
    "MKNOD",
    "NET_BIND_SERVICE",
    "NET_RAW",
    "SETFCAP",
    "SETGID",
    "SETPCAP",
    "SETUID",
    "SYS_CHROOT",
];

/// The `kubeauditConfig` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeauditConfig {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub audit: bool,
    #[serde(default)]
    pub spec: Option<ConfigSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSpec {
    #[serde(default)]
    pub capabilities: Option<BTreeMap<String, CapabilityPolicy>>,
    #[serde(default)]
    pub overrides: Option<Overrides>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityPolicy {
    Drop,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverridePolicy {
    Allow,
    Deny,
}

/// Global override policies, keyed by kebab-case override key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Overrides {
    pub privilege_escalation: Option<OverridePolicy>,
    pub privileged: Option<OverridePolicy>,
    pub run_as_root: Option<OverridePolicy>,
    pub automount_service_account_token: Option<OverridePolicy>,
    pub read_only_root_filesystem_false: Option<OverridePolicy>,
    pub non_default_deny_ingress_network_policy: Option<OverridePolicy>,
    pub non_default_deny_egress_network_policy: Option<OverridePolicy>,
}

impl Overrides {
    pub fn get(&self, field: OverrideField) -> Option<OverridePolicy> {
        match field {
            OverrideField::PrivilegeEscalation => self.privilege_escalation,
            OverrideField::Privileged => self.privileged,
            OverrideField::RunAsRoot => self.run_as_root,
            OverrideField::AutomountServiceAccountToken => self.automount_service_account_token,
            OverrideField::ReadOnlyRootFilesystemFalse => self.read_only_root_filesystem_false,
            OverrideField::NonDefaultDenyIngressNetworkPolicy => {
                self.non_default_deny_ingress_network_policy
            }
            OverrideField::NonDefaultDenyEgressNetworkPolicy => {
                self.non_default_deny_egress_network_policy
            }
        }
    }
}

/// A field of [`Overrides`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideField {
    PrivilegeEscalation,
    Privileged,
    RunAsRoot,
    AutomountServiceAccountToken,
    ReadOnlyRootFilesystemFalse,
    NonDefaultDenyIngressNetworkPolicy,
    NonDefaultDenyEgressNetworkPolicy,
}

impl OverrideField {
    pub const ALL: [OverrideField; 7] = [
        Self::PrivilegeEscalation,
        Self::Privileged,
        Self::RunAsRoot,
        Self::AutomountServiceAccountToken,
        Self::ReadOnlyRootFilesystemFalse,
        Self::NonDefaultDenyIngressNetworkPolicy,
        Self::NonDefaultDenyEgressNetworkPolicy,
    ];

    /// Map an override label key (`allow-run-as-root`) to its config field.
    pub fn from_override_key(key: &str) -> Option<Self> {
        let key = key.strip_prefix("allow-").unwrap_or(key);
        Self::ALL.into_iter().find(|f| f.config_key() == key)
    }

    /// The kebab-case key used in the config file.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::PrivilegeEscalation => "privilege-escalation",
            Self::Privileged => "privileged",
            Self::RunAsRoot => "run-as-root",
            Self::AutomountServiceAccountToken => "automount-service-account-token",
            Self::ReadOnlyRootFilesystemFalse => "read-only-root-filesystem-false",
            Self::NonDefaultDenyIngressNetworkPolicy => "non-default-deny-ingress-network-policy",
            Self::NonDefaultDenyEgressNetworkPolicy => "non-default-deny-egress-network-policy",
        }
    }

    /// The capitalised-concatenated field identifier, e.g. `RunAsRoot`.
    pub fn field_name(&self) -> String {
        self.config_key()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

impl KubeauditConfig {
    /// The global override policy for `field`, if one is configured.
    pub fn override_policy(&self, field: OverrideField) -> Option<OverridePolicy> {
        self.spec.as_ref()?.overrides.as_ref()?.get(field)
    }

    /// Capabilities the policy expects to be dropped, sorted.
    pub fn drop_capabilities(&self) -> Vec<String> {
        match self.spec.as_ref().and_then(|s| s.capabilities.as_ref()) {
            Some(caps) => caps
                .iter()
                .filter(|(_, policy)| **policy == CapabilityPolicy::Drop)
                .map(|(cap, _)| cap.clone())
                .collect(),
            None => DEFAULT_DROP_CAPABILITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}
