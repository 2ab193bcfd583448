//! Resource limits rule.

use crate::audit::normalize::AuditTarget;
use crate::audit::overrides::OverrideResolver;
use crate::audit::params::{LimitParams, parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::audit::types::{AuditResult, FindingCode, Occurrence};

pub const NAME: &str = "limits";

/// Flags containers without CPU/memory limits, or with limits above the
/// configured maximum.
pub fn audit_limits(
    _resolver: &OverrideResolver,
    target: &AuditTarget,
    params: &LimitParams,
) -> Vec<AuditResult> {
    let Some(pod_spec) = target.pod_spec() else {
        return Vec::new();
    };
    let mut result = target.new_result();

    for container in pod_spec.all_containers() {
        let name = container.name.as_str();
        let limits = container
            .resources
            .as_ref()
            .map(|r| &r.limits)
            .filter(|limits| !limits.is_empty());
        let Some(limits) = limits else {
            result.push(
                Occurrence::warning(FindingCode::ResourcesLimitsNotSet, "Resource limits not set")
                    .in_container(name),
            );
            continue;
        };

        match limits.get("cpu") {
            None => result.push(
                Occurrence::warning(FindingCode::ResourcesLimitsCpuNotSet, "CPU limit not set")
                    .in_container(name),
            ),
            Some(cpu) => {
                if let (Some(max), Some(value)) =
                    (params.cpu_millicores(), parse_cpu_to_millicores(cpu))
                    && value > max
                {
                    result.push(
                        Occurrence::error(
                            FindingCode::ResourcesLimitsCpuExceeded,
                            format!("CPU limit {} exceeds the maximum of {}m", cpu, max),
                        )
                        .in_container(name)
                        .with_metadata("ContainerCpuLimit", cpu.as_str()),
                    );
                }
            }
        }

        match limits.get("memory") {
            None => result.push(
                Occurrence::warning(
                    FindingCode::ResourcesLimitsMemoryNotSet,
                    "Memory limit not set",
                )
                .in_container(name),
            ),
            Some(memory) => {
                if let (Some(max), Some(value)) =
                    (params.memory_bytes(), parse_memory_to_bytes(memory))
                    && value > max
                {
                    result.push(
                        Occurrence::error(
                            FindingCode::ResourcesLimitsMemoryExceeded,
                            format!("Memory limit {} exceeds the maximum of {} bytes", memory, max),
                        )
                        .in_container(name)
                        .with_metadata("ContainerMemoryLimit", memory.as_str()),
                    );
                }
            }
        }
    }

    result.into_results()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::rules::test_support::targets;
    use crate::audit::types::Severity;

    const MANIFEST: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: p
spec:
  containers:
    - name: none
    - name: cpu-only
      resources:
        limits:
          cpu: 250m
    - name: big
      resources:
        limits:
          cpu: 2
          memory: 1Gi
    - name: fine
      resources:
        limits:
          cpu: 100m
          memory: 64Mi
"#;

    fn findings(params: &LimitParams) -> Vec<(String, FindingCode, Severity)> {
        targets(MANIFEST)
            .iter()
            .flat_map(|t| audit_limits(&OverrideResolver::default(), t, params))
            .flat_map(|r| r.occurrences)
            .map(|o| (o.container.unwrap_or_default(), o.code, o.severity))
            .collect()
    }

    #[test]
    fn test_missing_limits() {
        let found = findings(&LimitParams::default());
        assert_eq!(
            found,
            vec![
                (
                    "none".to_string(),
                    FindingCode::ResourcesLimitsNotSet,
                    Severity::Warning
                ),
                (
                    "cpu-only".to_string(),
                    FindingCode::ResourcesLimitsMemoryNotSet,
                    Severity::Warning
                ),
            ]
        );
    }

    #[test]
    fn test_exceeded_limits() {
        let params = LimitParams::new(Some("500m".to_string()), Some("512Mi".to_string()));
        let exceeded: Vec<FindingCode> = findings(&params)
            .into_iter()
            .filter(|(container, _, _)| container == "big")
            .map(|(_, code, _)| code)
            .collect();
        assert_eq!(
            exceeded,
            vec![
                FindingCode::ResourcesLimitsCpuExceeded,
                FindingCode::ResourcesLimitsMemoryExceeded
            ]
        );
    }
}
