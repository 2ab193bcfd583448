//! Raw Kubernetes objects as decoded from a manifest or the cluster API.
//!
//! Each supported (kind, group/version) pair is its own variant so that a
//! schema revision is never confused with another; the variants share the
//! data shapes below because the audited fields did not change between
//! those revisions.

use std::collections::BTreeMap;
use std::fmt;

/// A Kubernetes group/version/kind triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionKind {
    /// API group, empty for the core group.
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Build from an `apiVersion` string (`apps/v1`, `v1`) and a kind.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` string for this triple.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Enum of every object shape the auditor decodes.
///
/// Objects of any other kind decode to `Other` and are skipped by the
/// normalizer.
#[derive(Debug, Clone)]
pub enum K8sObject {
    CronJobV1Beta1(Box<CronJobData>),
    CronJobV1(Box<CronJobData>),
    DaemonSetV1(Box<WorkloadData>),
    DaemonSetV1Beta2(Box<WorkloadData>),
    DaemonSetExtensionsV1Beta1(Box<WorkloadData>),
    DeploymentV1(Box<WorkloadData>),
    DeploymentV1Beta1(Box<WorkloadData>),
    DeploymentV1Beta2(Box<WorkloadData>),
    DeploymentExtensionsV1Beta1(Box<WorkloadData>),
    PodV1(Box<PodData>),
    ReplicationControllerV1(Box<WorkloadData>),
    StatefulSetV1(Box<WorkloadData>),
    StatefulSetV1Beta1(Box<WorkloadData>),
    NamespaceV1(Box<NamespaceData>),

    // Decoded for the network policy rule, never audited directly.
    NetworkPolicyV1(Box<NetworkPolicyData>),

    Other(Box<UnknownObject>),
}

impl K8sObject {
    /// The group/version/kind this object was decoded as.
    pub fn gvk(&self) -> GroupVersionKind {
        match self {
            Self::CronJobV1Beta1(_) => GroupVersionKind::new("batch", "v1beta1", "CronJob"),
            Self::CronJobV1(_) => GroupVersionKind::new("batch", "v1", "CronJob"),
            Self::DaemonSetV1(_) => GroupVersionKind::new("apps", "v1", "DaemonSet"),
            Self::DaemonSetV1Beta2(_) => GroupVersionKind::new("apps", "v1beta2", "DaemonSet"),
            Self::DaemonSetExtensionsV1Beta1(_) => {
                GroupVersionKind::new("extensions", "v1beta1", "DaemonSet")
            }
            Self::DeploymentV1(_) => GroupVersionKind::new("apps", "v1", "Deployment"),
            Self::DeploymentV1Beta1(_) => GroupVersionKind::new("apps", "v1beta1", "Deployment"),
            Self::DeploymentV1Beta2(_) => GroupVersionKind::new("apps", "v1beta2", "Deployment"),
            Self::DeploymentExtensionsV1Beta1(_) => {
                GroupVersionKind::new("extensions", "v1beta1", "Deployment")
            }
            Self::PodV1(_) => GroupVersionKind::new("", "v1", "Pod"),
            Self::ReplicationControllerV1(_) => {
                GroupVersionKind::new("", "v1", "ReplicationController")
            }
            Self::StatefulSetV1(_) => GroupVersionKind::new("apps", "v1", "StatefulSet"),
            Self::StatefulSetV1Beta1(_) => GroupVersionKind::new("apps", "v1beta1", "StatefulSet"),
            Self::NamespaceV1(_) => GroupVersionKind::new("", "v1", "Namespace"),
            Self::NetworkPolicyV1(_) => {
                GroupVersionKind::new("networking.k8s.io", "v1", "NetworkPolicy")
            }
            Self::Other(o) => o.gvk.clone(),
        }
    }

    /// Object metadata (name, namespace, labels).
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::CronJobV1Beta1(d) | Self::CronJobV1(d) => &d.metadata,
            Self::DaemonSetV1(d)
            | Self::DaemonSetV1Beta2(d)
            | Self::DaemonSetExtensionsV1Beta1(d)
            | Self::DeploymentV1(d)
            | Self::DeploymentV1Beta1(d)
            | Self::DeploymentV1Beta2(d)
            | Self::DeploymentExtensionsV1Beta1(d)
            | Self::ReplicationControllerV1(d)
            | Self::StatefulSetV1(d)
            | Self::StatefulSetV1Beta1(d) => &d.metadata,
            Self::PodV1(d) => &d.metadata,
            Self::NamespaceV1(d) => &d.metadata,
            Self::NetworkPolicyV1(d) => &d.metadata,
            Self::Other(d) => &d.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    /// Whether this object belongs to `namespace`; an empty namespace
    /// selects everything. Namespaces match on their own name.
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        if namespace.is_empty() {
            return true;
        }
        match self {
            Self::NamespaceV1(d) => d.metadata.name == namespace,
            _ => self.namespace() == namespace,
        }
    }
}

// ============================================================================
// Data structures shared by the object variants
// ============================================================================

/// Common metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    /// Empty for cluster-scoped objects or when unset.
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

/// Pod template embedded in a controller.
#[derive(Debug, Clone, Default)]
pub struct PodTemplate {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

/// Deployments, DaemonSets, StatefulSets and ReplicationControllers.
#[derive(Debug, Clone, Default)]
pub struct WorkloadData {
    pub metadata: ObjectMeta,
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Default)]
pub struct JobTemplate {
    pub metadata: ObjectMeta,
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Default)]
pub struct CronJobData {
    pub metadata: ObjectMeta,
    pub job_template: JobTemplate,
}

#[derive(Debug, Clone, Default)]
pub struct PodData {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceData {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
    pub match_expressions: usize,
}

impl LabelSelector {
    /// An empty selector selects every pod in the namespace.
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkPolicyData {
    pub metadata: ObjectMeta,
    pub pod_selector: LabelSelector,
    pub policy_types: Vec<String>,
    pub ingress_rules: usize,
    pub egress_rules: usize,
}

#[derive(Debug, Clone)]
pub struct UnknownObject {
    pub gvk: GroupVersionKind,
    pub metadata: ObjectMeta,
}

/// The security-relevant part of a pod spec.
#[derive(Debug, Clone, Default)]
pub struct PodSpec {
    pub containers: Vec<ContainerSpec>,
    pub init_containers: Vec<ContainerSpec>,
    pub security_context: Option<PodSecurityContext>,
    pub service_account_name: Option<String>,
    /// The deprecated `serviceAccount` alias.
    pub deprecated_service_account: Option<String>,
    pub automount_service_account_token: Option<bool>,
}

impl PodSpec {
    /// Regular containers followed by init containers.
    pub fn all_containers(&self) -> impl Iterator<Item = &ContainerSpec> {
        self.containers.iter().chain(self.init_containers.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: Option<String>,
    pub security_context: Option<SecurityContext>,
    pub resources: Option<ResourceRequirements>,
}

/// Container-level security context.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    pub privileged: Option<bool>,
    pub allow_privilege_escalation: Option<bool>,
    pub run_as_non_root: Option<bool>,
    pub read_only_root_filesystem: Option<bool>,
    pub capabilities: Option<Capabilities>,
}

#[derive(Debug, Clone, Default)]
pub struct PodSecurityContext {
    pub run_as_non_root: Option<bool>,
}

/// Linux capabilities.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub add: Vec<String>,
    pub drop: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceRequirements {
    pub limits: BTreeMap<String, String>,
}
