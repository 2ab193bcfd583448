//! Normalization of raw objects into audit targets.
//!
//! Every supported object shape implements [`AuditSource`] once; the
//! normalizer turns any of them into the same [`AuditTarget`], which is
//! all a rule ever sees.

use crate::audit::context::object::{CronJobData, NamespaceData, PodData, WorkloadData};
use crate::audit::context::{GroupVersionKind, K8sObject, PodSpec};
use crate::audit::registry::TypeRegistry;
use crate::audit::types::{AuditResult, KubeType};
use log::warn;
use std::collections::BTreeMap;

/// The uniform view of an object shape.
pub trait AuditSource {
    /// Object name and namespace.
    fn identity(&self) -> (&str, &str);

    /// Labels that carry overrides for this object.
    fn labels(&self) -> &BTreeMap<String, String>;

    /// The pod spec, for workload shapes.
    fn pod_spec(&self) -> Option<&PodSpec>;
}

impl AuditSource for WorkloadData {
    fn identity(&self) -> (&str, &str) {
        (&self.metadata.name, &self.metadata.namespace)
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.template.metadata.labels
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        Some(&self.template.spec)
    }
}

impl AuditSource for CronJobData {
    fn identity(&self) -> (&str, &str) {
        (&self.metadata.name, &self.metadata.namespace)
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.job_template.metadata.labels
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        Some(&self.job_template.template.spec)
    }
}

impl AuditSource for PodData {
    fn identity(&self) -> (&str, &str) {
        (&self.metadata.name, &self.metadata.namespace)
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        Some(&self.spec)
    }
}

impl AuditSource for NamespaceData {
    fn identity(&self) -> (&str, &str) {
        (&self.metadata.name, &self.metadata.namespace)
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        None
    }
}

impl K8sObject {
    /// The auditable view of this object, if it has one.
    pub fn audit_source(&self) -> Option<(KubeType, &dyn AuditSource)> {
        let source: (KubeType, &dyn AuditSource) = match self {
            Self::CronJobV1Beta1(d) | Self::CronJobV1(d) => (KubeType::CronJob, &**d),
            Self::DaemonSetV1(d)
            | Self::DaemonSetV1Beta2(d)
            | Self::DaemonSetExtensionsV1Beta1(d) => (KubeType::DaemonSet, &**d),
            Self::DeploymentV1(d)
            | Self::DeploymentV1Beta1(d)
            | Self::DeploymentV1Beta2(d)
            | Self::DeploymentExtensionsV1Beta1(d) => (KubeType::Deployment, &**d),
            Self::PodV1(d) => (KubeType::Pod, &**d),
            Self::ReplicationControllerV1(d) => (KubeType::ReplicationController, &**d),
            Self::StatefulSetV1(d) | Self::StatefulSetV1Beta1(d) => {
                (KubeType::StatefulSet, &**d)
            }
            Self::NamespaceV1(d) => (KubeType::Namespace, &**d),
            Self::NetworkPolicyV1(_) | Self::Other(_) => return None,
        };
        Some(source)
    }
}

/// Normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Not an auditable kind; skip it and carry on.
    #[error("skipping unsupported resource type {0}")]
    Unsupported(GroupVersionKind),

    /// A registered kind the normalizer has no case for.
    #[error("resource type {0} not supported")]
    Fatal(GroupVersionKind),
}

impl NormalizeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// A workload or namespace, independent of its schema revision.
#[derive(Debug, Clone)]
pub struct AuditTarget {
    kube_type: KubeType,
    gvk: GroupVersionKind,
    name: String,
    namespace: String,
    labels: BTreeMap<String, String>,
    pod_spec: Option<PodSpec>,
}

impl AuditTarget {
    pub fn kube_type(&self) -> KubeType {
        self.kube_type
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// The pod spec; `None` for namespaces.
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.pod_spec.as_ref()
    }

    /// A result shell carrying this target's identity and labels.
    pub fn new_result(&self) -> AuditResult {
        AuditResult::new(
            self.kube_type,
            self.name.clone(),
            self.namespace.clone(),
            self.labels.clone(),
        )
    }

    /// A result shell with the service account fields filled in.
    ///
    /// Namespaces get an explicit `false` token so that the automount
    /// rule never fires for them.
    pub fn new_result_with_service_account_info(&self) -> AuditResult {
        let mut result = self.new_result();
        match &self.pod_spec {
            Some(spec) => {
                result.sa = spec.service_account_name.clone().unwrap_or_default();
                result.dsa = spec.deprecated_service_account.clone().unwrap_or_default();
                result.token = spec.automount_service_account_token;
            }
            None => result.token = Some(false),
        }
        result
    }
}

/// Map a raw object to its audit target.
pub fn normalize(object: &K8sObject, registry: &TypeRegistry) -> Result<AuditTarget, NormalizeError> {
    let Some((kube_type, source)) = object.audit_source() else {
        let gvk = object.gvk();
        if registry.is_supported(&gvk) {
            return Err(NormalizeError::Fatal(gvk));
        }
        return Err(NormalizeError::Unsupported(gvk));
    };

    let (name, namespace) = source.identity();
    Ok(AuditTarget {
        kube_type,
        gvk: object.gvk(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        labels: source.labels().clone(),
        pod_spec: source.pod_spec().cloned(),
    })
}

/// Normalize and build the result shell with service account info.
pub fn normalize_with_service_account_info(
    object: &K8sObject,
    registry: &TypeRegistry,
) -> Result<AuditResult, NormalizeError> {
    normalize(object, registry).map(|target| target.new_result_with_service_account_info())
}

/// Normalize every object, skipping unsupported ones with a warning.
///
/// Stops at the first fatal error.
pub fn normalize_all(
    objects: &[K8sObject],
    registry: &TypeRegistry,
) -> Result<Vec<AuditTarget>, NormalizeError> {
    let mut targets = Vec::with_capacity(objects.len());
    for object in objects {
        match normalize(object, registry) {
            Ok(target) => targets.push(target),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => warn!("{}", err),
        }
    }
    Ok(targets)
}
