//! YAML decoding of Kubernetes manifests.

use crate::audit::context::object::*;
use crate::audit::context::ResourceSet;
use crate::error::{AuditError, Result};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Parse a manifest containing one or more `---`-separated documents.
///
/// Empty and comment-only documents are skipped. Any other document must
/// be YAML with `apiVersion` and `kind`, or the whole manifest is rejected.
pub fn parse_manifest(content: &str) -> Result<ResourceSet> {
    let mut resources = ResourceSet::new();

    for (index, doc) in split_documents(content).into_iter().enumerate() {
        let document = index + 1;
        if is_blank_or_comment(&doc) {
            debug!("Skipping empty document {}", document);
            continue;
        }

        let value: serde_yaml::Value =
            serde_yaml::from_str(&doc).map_err(|e| AuditError::InvalidManifest {
                document,
                reason: e.to_string(),
            })?;
        let object = decode_object(&value).ok_or_else(|| AuditError::InvalidManifest {
            document,
            reason: "missing apiVersion or kind".to_string(),
        })?;
        resources.add_object(object);
    }

    Ok(resources)
}

/// Parse a manifest file.
pub fn parse_manifest_file(path: &Path) -> Result<ResourceSet> {
    if !path.exists() {
        return Err(AuditError::ManifestNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let resources = parse_manifest(&content)?;
    debug!("Decoded {} objects from {}", resources.len(), path.display());
    Ok(resources)
}

fn split_documents(content: &str) -> Vec<String> {
    let mut docs = vec![String::new()];
    for line in content.lines() {
        if line.starts_with("---") {
            docs.push(String::new());
            continue;
        }
        if let Some(current) = docs.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    docs
}

fn is_blank_or_comment(doc: &str) -> bool {
    doc.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

/// Decode a single object. Returns `None` without `apiVersion`/`kind`.
///
/// Kinds outside the audited family decode to [`K8sObject::Other`].
pub fn decode_object(value: &serde_yaml::Value) -> Option<K8sObject> {
    let api_version = value.get("apiVersion")?.as_str()?;
    let kind = value.get("kind")?.as_str()?;

    let object = match (api_version, kind) {
        ("batch/v1beta1", "CronJob") => K8sObject::CronJobV1Beta1(Box::new(parse_cronjob(value))),
        ("batch/v1", "CronJob") => K8sObject::CronJobV1(Box::new(parse_cronjob(value))),
        ("apps/v1", "DaemonSet") => K8sObject::DaemonSetV1(Box::new(parse_workload(value))),
        ("apps/v1beta2", "DaemonSet") => {
            K8sObject::DaemonSetV1Beta2(Box::new(parse_workload(value)))
        }
        ("extensions/v1beta1", "DaemonSet") => {
            K8sObject::DaemonSetExtensionsV1Beta1(Box::new(parse_workload(value)))
        }
        ("apps/v1", "Deployment") => K8sObject::DeploymentV1(Box::new(parse_workload(value))),
        ("apps/v1beta1", "Deployment") => {
            K8sObject::DeploymentV1Beta1(Box::new(parse_workload(value)))
        }
        ("apps/v1beta2", "Deployment") => {
            K8sObject::DeploymentV1Beta2(Box::new(parse_workload(value)))
        }
        ("extensions/v1beta1", "Deployment") => {
            K8sObject::DeploymentExtensionsV1Beta1(Box::new(parse_workload(value)))
        }
        ("v1", "Pod") => K8sObject::PodV1(Box::new(parse_pod(value))),
        ("v1", "ReplicationController") => {
            K8sObject::ReplicationControllerV1(Box::new(parse_workload(value)))
        }
        ("apps/v1", "StatefulSet") => K8sObject::StatefulSetV1(Box::new(parse_workload(value))),
        ("apps/v1beta1", "StatefulSet") => {
            K8sObject::StatefulSetV1Beta1(Box::new(parse_workload(value)))
        }
        ("v1", "Namespace") => K8sObject::NamespaceV1(Box::new(NamespaceData {
            metadata: parse_metadata(value.get("metadata")),
        })),
        ("networking.k8s.io/v1", "NetworkPolicy") => {
            K8sObject::NetworkPolicyV1(Box::new(parse_network_policy(value)))
        }
        _ => K8sObject::Other(Box::new(UnknownObject {
            gvk: GroupVersionKind::from_api_version(api_version, kind),
            metadata: parse_metadata(value.get("metadata")),
        })),
    };

    Some(object)
}

// ============================================================================
// Parse helper functions
// ============================================================================

fn get_string(value: &serde_yaml::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(|s| s.to_string())
}

fn get_bool(value: &serde_yaml::Value, key: &str) -> Option<bool> {
    value.get(key)?.as_bool()
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Label values and quantities are sometimes written unquoted.
fn get_string_map(value: &serde_yaml::Value, key: &str) -> BTreeMap<String, String> {
    let Some(mapping) = value.get(key).and_then(|v| v.as_mapping()) else {
        return BTreeMap::new();
    };
    mapping
        .iter()
        .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_to_string(v)?)))
        .collect()
}

fn sequence_len(value: &serde_yaml::Value, key: &str) -> usize {
    value
        .get(key)
        .and_then(|v| v.as_sequence())
        .map(|s| s.len())
        .unwrap_or(0)
}

fn parse_string_array(value: Option<&serde_yaml::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_sequence())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_metadata(metadata: Option<&serde_yaml::Value>) -> ObjectMeta {
    let Some(metadata) = metadata else {
        return ObjectMeta::default();
    };
    ObjectMeta {
        name: get_string(metadata, "name").unwrap_or_default(),
        namespace: get_string(metadata, "namespace").unwrap_or_default(),
        labels: get_string_map(metadata, "labels"),
    }
}

fn parse_pod_template(template: Option<&serde_yaml::Value>) -> PodTemplate {
    let Some(template) = template else {
        return PodTemplate::default();
    };
    PodTemplate {
        metadata: parse_metadata(template.get("metadata")),
        spec: template.get("spec").map(parse_pod_spec).unwrap_or_default(),
    }
}

fn parse_workload(value: &serde_yaml::Value) -> WorkloadData {
    WorkloadData {
        metadata: parse_metadata(value.get("metadata")),
        template: parse_pod_template(value.get("spec").and_then(|s| s.get("template"))),
    }
}

fn parse_cronjob(value: &serde_yaml::Value) -> CronJobData {
    let job_template = value.get("spec").and_then(|s| s.get("jobTemplate"));
    CronJobData {
        metadata: parse_metadata(value.get("metadata")),
        job_template: JobTemplate {
            metadata: parse_metadata(job_template.and_then(|j| j.get("metadata"))),
            template: parse_pod_template(
                job_template
                    .and_then(|j| j.get("spec"))
                    .and_then(|s| s.get("template")),
            ),
        },
    }
}

fn parse_pod(value: &serde_yaml::Value) -> PodData {
    PodData {
        metadata: parse_metadata(value.get("metadata")),
        spec: value.get("spec").map(parse_pod_spec).unwrap_or_default(),
    }
}

fn parse_network_policy(value: &serde_yaml::Value) -> NetworkPolicyData {
    let metadata = parse_metadata(value.get("metadata"));
    let Some(spec) = value.get("spec") else {
        return NetworkPolicyData {
            metadata,
            ..Default::default()
        };
    };
    let pod_selector = spec
        .get("podSelector")
        .map(|s| LabelSelector {
            match_labels: get_string_map(s, "matchLabels"),
            match_expressions: sequence_len(s, "matchExpressions"),
        })
        .unwrap_or_default();

    NetworkPolicyData {
        metadata,
        pod_selector,
        policy_types: parse_string_array(spec.get("policyTypes")),
        ingress_rules: sequence_len(spec, "ingress"),
        egress_rules: sequence_len(spec, "egress"),
    }
}

fn parse_pod_spec(spec: &serde_yaml::Value) -> PodSpec {
    PodSpec {
        containers: parse_containers(spec.get("containers")),
        init_containers: parse_containers(spec.get("initContainers")),
        security_context: spec.get("securityContext").map(|sc| PodSecurityContext {
            run_as_non_root: get_bool(sc, "runAsNonRoot"),
        }),
        service_account_name: get_string(spec, "serviceAccountName"),
        deprecated_service_account: get_string(spec, "serviceAccount"),
        automount_service_account_token: get_bool(spec, "automountServiceAccountToken"),
    }
}

fn parse_containers(containers: Option<&serde_yaml::Value>) -> Vec<ContainerSpec> {
    let Some(arr) = containers.and_then(|c| c.as_sequence()) else {
        return Vec::new();
    };
    arr.iter().map(parse_container).collect()
}

fn parse_container(c: &serde_yaml::Value) -> ContainerSpec {
    ContainerSpec {
        name: get_string(c, "name").unwrap_or_default(),
        image: get_string(c, "image"),
        security_context: c.get("securityContext").map(parse_security_context),
        resources: c.get("resources").map(|res| ResourceRequirements {
            limits: get_string_map(res, "limits"),
        }),
    }
}

fn parse_security_context(sc: &serde_yaml::Value) -> SecurityContext {
    SecurityContext {
        privileged: get_bool(sc, "privileged"),
        allow_privilege_escalation: get_bool(sc, "allowPrivilegeEscalation"),
        run_as_non_root: get_bool(sc, "runAsNonRoot"),
        read_only_root_filesystem: get_bool(sc, "readOnlyRootFilesystem"),
        capabilities: sc.get("capabilities").map(|caps| Capabilities {
            add: parse_string_array(caps.get("add")),
            drop: parse_string_array(caps.get("drop")),
        }),
    }
}
