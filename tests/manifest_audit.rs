use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kubeaudit::audit::{
    AuditResult, Auditor, FindingCode, ImageParams, LimitParams, RuleName, RuleSelection,
    Severity, Source, parse_manifest_file, run_audit,
};
use kubeaudit::config::KubeauditConfig;
use kubeaudit::AuditError;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn manifest(name: &str) -> PathBuf {
    fixture("manifests").join(name)
}

fn config() -> Arc<KubeauditConfig> {
    Arc::new(KubeauditConfig::load_from_file(&fixture("kubeaudit-config.yaml")).unwrap())
}

fn codes(results: &[AuditResult]) -> Vec<FindingCode> {
    results
        .iter()
        .flat_map(|r| r.occurrences.iter().map(|o| o.code))
        .collect()
}

#[test]
fn test_mixed_manifest_skips_unsupported_kinds() {
    let resources = parse_manifest_file(&manifest("mixed.yaml")).unwrap();
    assert_eq!(resources.len(), 3);

    let report = Auditor::new(None).audit(&resources).unwrap();
    assert_eq!(report.summary.targets_audited, 2);
    assert_eq!(report.summary.objects_skipped, 1);

    // The compliant pod produces nothing; the deployment gets one result
    // per rule that found something.
    assert!(report.results.iter().all(|r| r.name == "web"));
    assert_eq!(report.results.len(), 7);

    let found = codes(&report.results);
    assert!(found.contains(&FindingCode::AutomountServiceAccountTokenNilAndNoName));
    assert!(found.contains(&FindingCode::RunAsNonRootNil));
    assert!(found.contains(&FindingCode::PrivilegedNil));
    assert!(found.contains(&FindingCode::AllowPrivilegeEscalationNil));
    assert!(found.contains(&FindingCode::ReadOnlyRootFilesystemNil));
    assert!(found.contains(&FindingCode::CapabilityAdded));
    assert!(found.contains(&FindingCode::ResourcesLimitsNotSet));
}

#[test]
fn test_capabilities_are_reported_sorted() {
    let resources = parse_manifest_file(&manifest("mixed.yaml")).unwrap();
    let report = Auditor::new(None)
        .select(RuleSelection::One(RuleName::Capabilities))
        .audit(&resources)
        .unwrap();
    assert_eq!(report.results.len(), 1);

    let caps: Vec<&str> = report.results[0]
        .occurrences
        .iter()
        .filter_map(|o| o.metadata.get("Capability").map(String::as_str))
        .collect();
    let mut sorted = caps.clone();
    sorted.sort();
    assert_eq!(caps, sorted);
    assert!(caps.contains(&"NET_ADMIN"));
    assert!(caps.contains(&"NET_RAW"));
}

#[test]
fn test_repeated_runs_return_the_same_results() {
    let resources = parse_manifest_file(&manifest("mixed.yaml")).unwrap();
    let auditor = Auditor::new(None);

    let canonical = |results: Vec<AuditResult>| {
        let mut keyed: Vec<(String, Vec<String>)> = results
            .into_iter()
            .map(|r| {
                let codes = r.occurrences.iter().map(|o| o.code.to_string()).collect();
                (r.object_identifier(), codes)
            })
            .collect();
        keyed.sort();
        keyed
    };

    let first = canonical(auditor.audit(&resources).unwrap().results);
    for _ in 0..10 {
        assert_eq!(canonical(auditor.audit(&resources).unwrap().results), first);
    }
}

#[test]
fn test_container_label_takes_precedence() {
    let resources = parse_manifest_file(&manifest("overrides.yaml")).unwrap();
    let report = Auditor::new(Some(config()))
        .select(RuleSelection::One(RuleName::NonRoot))
        .audit(&resources)
        .unwrap();
    assert_eq!(report.results.len(), 1);

    let reasons: BTreeMap<String, (String, String)> = report.results[0]
        .occurrences
        .iter()
        .map(|o| {
            assert_eq!(o.severity, Severity::Warning);
            assert_eq!(o.code, FindingCode::RunAsNonRootAllowed);
            (
                o.container.clone().unwrap_or_default(),
                (o.metadata["Reason"].clone(), o.metadata["OverrideScope"].clone()),
            )
        })
        .collect();

    assert_eq!(
        reasons["db"],
        ("postgres image needs root".to_string(), "container".to_string())
    );
    assert_eq!(
        reasons["exporter"],
        ("Unspecified".to_string(), "pod".to_string())
    );
}

#[test]
fn test_global_config_overrides() {
    let resources = parse_manifest_file(&manifest("mixed.yaml")).unwrap();
    let report = Auditor::new(Some(config()))
        .select(RuleSelection::One(RuleName::AutomountToken))
        .audit(&resources)
        .unwrap();
    let occurrence = &report.results[0].occurrences[0];
    assert_eq!(occurrence.code, FindingCode::AutomountServiceAccountTokenAllowed);
    assert_eq!(
        occurrence.metadata["Reason"],
        "Allowed allow-automount-service-account-token in kubeauditConfig"
    );

    // The capability policy from the config replaces the default list.
    let report = Auditor::new(Some(config()))
        .select(RuleSelection::One(RuleName::Capabilities))
        .audit(&resources)
        .unwrap();
    let caps: Vec<&str> = report.results[0]
        .occurrences
        .iter()
        .filter_map(|o| o.metadata.get("Capability").map(String::as_str))
        .collect();
    assert_eq!(caps, vec!["NET_ADMIN", "NET_RAW"]);
}

#[test]
fn test_privileged_container_findings() {
    let resources = parse_manifest_file(&manifest("privileged.yaml")).unwrap();
    let report = Auditor::new(None).audit(&resources).unwrap();
    let found = codes(&report.results);
    assert_eq!(
        found,
        vec![
            FindingCode::PrivilegedTrue,
            FindingCode::AllowPrivilegeEscalationTrue,
            FindingCode::ReadOnlyRootFilesystemFalse,
        ]
    );
    assert!(report
        .results
        .iter()
        .flat_map(|r| &r.occurrences)
        .all(|o| o.severity == Severity::Error && o.container.as_deref() == Some("agent")));

    let config = KubeauditConfig::load_from_str(
        "spec:\n  overrides:\n    privileged: allow\n    privilege-escalation: allow\n    read-only-root-filesystem-false: allow\n",
    )
    .unwrap();
    let report = Auditor::new(Some(Arc::new(config)))
        .audit(&resources)
        .unwrap();
    assert_eq!(
        codes(&report.results),
        vec![
            FindingCode::PrivilegedTrueAllowed,
            FindingCode::AllowPrivilegeEscalationAllowed,
            FindingCode::ReadOnlyRootFilesystemFalseAllowed,
        ]
    );
    assert!(report
        .results
        .iter()
        .flat_map(|r| &r.occurrences)
        .all(|o| o.severity == Severity::Warning));
}

#[test]
fn test_network_policies() {
    let resources = parse_manifest_file(&manifest("namespaces.yaml")).unwrap();
    let auditor = Auditor::new(None).select(RuleSelection::One(RuleName::NetworkPolicies));
    let report = auditor.audit(&resources).unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].name, "open");
    assert_eq!(
        codes(&report.results),
        vec![
            FindingCode::MissingDefaultDenyIngressNetworkPolicy,
            FindingCode::MissingDefaultDenyEgressNetworkPolicy,
        ]
    );

    let report = Auditor::new(Some(config()))
        .select(RuleSelection::One(RuleName::NetworkPolicies))
        .audit(&resources)
        .unwrap();
    let severities: Vec<Severity> = report.results[0]
        .occurrences
        .iter()
        .map(|o| o.severity)
        .collect();
    assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
}

#[test]
fn test_image_and_limits_parameters() {
    let resources = parse_manifest_file(&manifest("mixed.yaml")).unwrap();
    let report = Auditor::new(None)
        .with_image(ImageParams::new("nginx:1.25"))
        .select(RuleSelection::One(RuleName::Image))
        .audit(&resources)
        .unwrap();
    assert_eq!(codes(&report.results), vec![FindingCode::ImageTagIncorrect]);

    let report = Auditor::new(None)
        .with_limits(LimitParams::new(Some("50m".to_string()), None))
        .select(RuleSelection::One(RuleName::Limits))
        .audit(&resources)
        .unwrap();
    let worker = report.results.iter().find(|r| r.name == "worker").unwrap();
    assert_eq!(codes(std::slice::from_ref(worker)), vec![FindingCode::ResourcesLimitsCpuExceeded]);
}

#[test]
fn test_invalid_manifest_is_rejected() {
    let err = parse_manifest_file(&manifest("invalid.yaml")).unwrap_err();
    assert!(matches!(err, AuditError::InvalidManifest { document: 2, .. }));
}

#[tokio::test]
async fn test_run_audit_from_manifest_source() {
    let source = Source::Manifest(manifest("mixed.yaml"));
    let report = run_audit(&Auditor::new(None), &source, "other-namespace")
        .await
        .unwrap();
    assert_eq!(report.summary.objects_loaded, 0);
    assert!(report.results.is_empty());

    let missing = Source::Manifest(manifest("does-not-exist.yaml"));
    let err = run_audit(&Auditor::new(None), &missing, "").await.unwrap_err();
    assert!(matches!(err, AuditError::ManifestNotFound(_)));
}
