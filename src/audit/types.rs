//! Core types for audit results.
//!
//! - `Severity` - How serious an occurrence is
//! - `KubeType` - Discriminator for the audited object kind
//! - `FindingCode` - Identifier of a single finding
//! - `Occurrence` - One finding raised by a rule
//! - `AuditResult` - Findings about one audit target

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Severity levels for occurrences.
///
/// Ordered from most severe to least severe:
/// `Error > Warning > Info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A finding that stands.
    Error,
    /// A finding that was overridden, or a missing recommended setting.
    #[default]
    Warning,
    /// Informational, nothing to fix.
    Info,
}

impl Severity {
    /// Parse a severity from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Error => 2,
            Self::Warning => 1,
            Self::Info => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The kind of object an audit result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KubeType {
    Pod,
    Deployment,
    DaemonSet,
    StatefulSet,
    ReplicationController,
    #[serde(rename = "cronjob")]
    CronJob,
    Namespace,
}

impl KubeType {
    /// The discriminator string used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::DaemonSet => "daemonSet",
            Self::StatefulSet => "statefulSet",
            Self::ReplicationController => "replicationController",
            Self::CronJob => "cronjob",
            Self::Namespace => "namespace",
        }
    }
}

impl fmt::Display for KubeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of a finding raised by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingCode {
    // automount-token
    ServiceAccountTokenDeprecated,
    AutomountServiceAccountTokenTrueAndNoName,
    AutomountServiceAccountTokenNilAndNoName,
    AutomountServiceAccountTokenAllowed,

    // non-root
    RunAsNonRootNil,
    RunAsNonRootFalse,
    RunAsNonRootPodFalse,
    RunAsNonRootAllowed,

    // privileged
    PrivilegedTrue,
    PrivilegedNil,
    PrivilegedTrueAllowed,

    // privilege-escalation
    AllowPrivilegeEscalationNil,
    AllowPrivilegeEscalationTrue,
    AllowPrivilegeEscalationAllowed,

    // read-only-root-filesystem
    ReadOnlyRootFilesystemNil,
    ReadOnlyRootFilesystemFalse,
    ReadOnlyRootFilesystemFalseAllowed,

    // capabilities
    CapabilityAdded,
    CapabilityNotDropped,
    CapabilityAllowed,

    // image
    ImageTagMissing,
    ImageTagIncorrect,
    ImageCorrect,

    // limits
    ResourcesLimitsNotSet,
    ResourcesLimitsCpuNotSet,
    ResourcesLimitsMemoryNotSet,
    ResourcesLimitsCpuExceeded,
    ResourcesLimitsMemoryExceeded,

    // network-policies
    MissingDefaultDenyIngressNetworkPolicy,
    MissingDefaultDenyEgressNetworkPolicy,
    MissingDefaultDenyIngressNetworkPolicyAllowed,
    MissingDefaultDenyEgressNetworkPolicyAllowed,
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single finding raised by a rule about an audit target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// The container the finding is about, if it is container-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub code: FindingCode,
    pub severity: Severity,
    pub message: String,
    /// Extra key/value context (e.g. `Reason`, `Capability`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Occurrence {
    pub fn new(code: FindingCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            container: None,
            code,
            severity,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn error(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn warning(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    pub fn info(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    /// Attach the container name.
    pub fn in_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Findings about one audit target.
///
/// Created from an `AuditTarget` with its identity and labels filled in,
/// enriched by a rule, and handed to the reporter once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditResult {
    pub kube_type: KubeType,
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Service account name.
    #[serde(rename = "SA", default, skip_serializing_if = "String::is_empty")]
    pub sa: String,
    /// Deprecated service account name.
    #[serde(rename = "DSA", default, skip_serializing_if = "String::is_empty")]
    pub dsa: String,
    /// Automount service account token flag; `None` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<bool>,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

impl AuditResult {
    pub fn new(
        kube_type: KubeType,
        name: impl Into<String>,
        namespace: impl Into<String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kube_type,
            name: name.into(),
            namespace: namespace.into(),
            labels,
            sa: String::new(),
            dsa: String::new(),
            token: None,
            occurrences: Vec::new(),
        }
    }

    pub fn push(&mut self, occurrence: Occurrence) {
        self.occurrences.push(occurrence);
    }

    pub fn has_occurrences(&self) -> bool {
        !self.occurrences.is_empty()
    }

    /// Highest severity among the occurrences.
    pub fn max_severity(&self) -> Option<Severity> {
        self.occurrences.iter().map(|o| o.severity).max()
    }

    /// Get a full identifier for the object (namespace/name or just name).
    pub fn object_identifier(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    /// Drop occurrences below `threshold`.
    pub fn retain_at_least(&mut self, threshold: Severity) {
        self.occurrences.retain(|o| o.severity >= threshold);
    }

    /// Report order: namespace, then kind, then name. Results for the same
    /// object compare equal so a stable sort keeps rule order.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.kube_type.cmp(&other.kube_type))
            .then_with(|| self.name.cmp(&other.name))
    }

    /// Wrap into a single-element result list, or nothing when the rule
    /// found nothing to report.
    pub fn into_results(self) -> Vec<AuditResult> {
        if self.has_occurrences() {
            vec![self]
        } else {
            Vec::new()
        }
    }
}
