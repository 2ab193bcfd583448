//! Top-level audit operation.
//!
//! Parameters are validated before anything is loaded; resources are then
//! loaded from the selected source, normalized and dispatched.

use crate::audit::context::ResourceSet;
use crate::audit::dispatch::{AuditDispatcher, AuditRule};
use crate::audit::normalize::{NormalizeError, normalize_all};
use crate::audit::overrides::OverrideResolver;
use crate::audit::params::{ImageParams, LimitParams};
use crate::audit::parser::{ClusterProvider, parse_manifest_file};
use crate::audit::registry::TypeRegistry;
use crate::audit::rules::{RuleCatalog, RuleName};
use crate::audit::types::AuditResult;
use crate::config::KubeauditConfig;
use crate::error::{AuditError, Result};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Where audited objects come from.
#[derive(Debug, Clone)]
pub enum Source {
    Manifest(PathBuf),
    Cluster { context: Option<String> },
}

/// Which rules a run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleSelection {
    #[default]
    All,
    One(RuleName),
}

/// Summary of an audit run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub objects_loaded: usize,
    pub targets_audited: usize,
    pub objects_skipped: usize,
    pub rules_run: usize,
}

/// Findings of one audit run.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub results: Vec<AuditResult>,
    pub summary: AuditSummary,
}

/// Configured audit run.
#[derive(Debug, Clone)]
pub struct Auditor {
    dispatcher: AuditDispatcher,
    registry: TypeRegistry,
    selection: RuleSelection,
    include_image: bool,
}

impl Auditor {
    pub fn new(config: Option<Arc<KubeauditConfig>>) -> Self {
        Self {
            dispatcher: AuditDispatcher::new(OverrideResolver::new(config)),
            registry: TypeRegistry::default(),
            selection: RuleSelection::All,
            include_image: false,
        }
    }

    /// Set the expected image; this also adds the image rule to `all`.
    pub fn with_image(mut self, image: ImageParams) -> Self {
        self.dispatcher = self.dispatcher.with_image(image);
        self.include_image = true;
        self
    }

    pub fn with_limits(mut self, limits: LimitParams) -> Self {
        self.dispatcher = self.dispatcher.with_limits(limits);
        self
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn select(mut self, selection: RuleSelection) -> Self {
        self.selection = selection;
        self
    }

    fn rules(&self, catalog: &RuleCatalog) -> Vec<AuditRule> {
        match self.selection {
            RuleSelection::All => catalog.all(self.include_image),
            RuleSelection::One(name) => vec![catalog.rule(name)],
        }
    }

    /// Validate the selected rules' parameters.
    pub fn check_params(&self) -> Result<()> {
        for rule in self.rules(&RuleCatalog::default()) {
            self.dispatcher.check_params(&rule)?;
        }
        Ok(())
    }

    /// Audit an already loaded resource set.
    pub fn audit(&self, resources: &ResourceSet) -> Result<AuditReport> {
        self.check_params()?;

        let targets = normalize_all(resources.objects(), &self.registry).map_err(|e| match e {
            NormalizeError::Fatal(gvk) | NormalizeError::Unsupported(gvk) => {
                AuditError::UnsupportedResource(gvk)
            }
        })?;

        let catalog = RuleCatalog::new(resources);
        let rules = self.rules(&catalog);
        let results = match self.selection {
            RuleSelection::All => self.dispatcher.run_all(&targets, &rules)?,
            RuleSelection::One(_) => {
                let mut results = Vec::new();
                for rule in &rules {
                    results.extend(self.dispatcher.run_checked(&targets, rule)?);
                }
                results
            }
        };

        let summary = AuditSummary {
            objects_loaded: resources.len(),
            targets_audited: targets.len(),
            objects_skipped: resources.len() - targets.len(),
            rules_run: rules.len(),
        };
        info!(
            "Audited {} targets with {} rules, {} results",
            summary.targets_audited,
            summary.rules_run,
            results.len()
        );
        Ok(AuditReport { results, summary })
    }
}

/// Load objects from `source`, restricted to `namespace` (empty for all).
pub async fn load_resources(source: &Source, namespace: &str) -> Result<ResourceSet> {
    match source {
        Source::Manifest(path) => {
            let mut resources = parse_manifest_file(path)?;
            resources.retain_namespace(namespace);
            Ok(resources)
        }
        Source::Cluster { context } => {
            let provider = ClusterProvider::connect(context.as_deref()).await?;
            provider.fetch(namespace).await
        }
    }
}

/// Validate, load, then audit.
pub async fn run_audit(auditor: &Auditor, source: &Source, namespace: &str) -> Result<AuditReport> {
    auditor.check_params()?;
    let resources = load_resources(source, namespace).await?;
    auditor.audit(&resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::context::GroupVersionKind;
    use crate::audit::parser::parse_manifest;

    const MANIFEST: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
spec:
  template:
    spec:
      containers:
        - name: web
          image: nginx:1.19
---
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: prod
---
apiVersion: v1
kind: Pod
metadata:
  name: debug
  namespace: prod
spec:
  serviceAccountName: debug
  automountServiceAccountToken: false
  securityContext:
    runAsNonRoot: true
  containers:
    - name: shell
      image: busybox:1.36
      securityContext:
        privileged: false
        allowPrivilegeEscalation: false
        readOnlyRootFilesystem: true
        capabilities:
          drop: ["ALL"]
      resources:
        limits:
          cpu: 100m
          memory: 64Mi
"#;

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let resources = parse_manifest(MANIFEST).unwrap();
        let report = Auditor::new(None).audit(&resources).unwrap();
        assert_eq!(report.summary.objects_loaded, 3);
        assert_eq!(report.summary.targets_audited, 2);
        assert_eq!(report.summary.objects_skipped, 1);
        assert_eq!(report.summary.rules_run, 8);
        assert!(report.results.iter().all(|r| r.name == "web"));
    }

    #[test]
    fn test_single_rule() {
        let resources = parse_manifest(MANIFEST).unwrap();
        let report = Auditor::new(None)
            .with_image(ImageParams::new("nginx:1.25"))
            .select(RuleSelection::One(RuleName::Image))
            .audit(&resources)
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.summary.rules_run, 1);
    }

    #[test]
    fn test_parameters_checked_before_loading() {
        let auditor = Auditor::new(None).select(RuleSelection::One(RuleName::Image));
        assert!(matches!(auditor.check_params(), Err(AuditError::MissingImageName)));

        let auditor = Auditor::new(None)
            .with_limits(LimitParams::new(Some("lots".to_string()), None))
            .select(RuleSelection::All);
        assert!(matches!(
            auditor.check_params(),
            Err(AuditError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn test_registry_gap_is_fatal() {
        let resources = parse_manifest(MANIFEST).unwrap();
        let registry = TypeRegistry::default().with(GroupVersionKind::new("", "v1", "Service"));
        let err = Auditor::new(None)
            .with_registry(registry)
            .audit(&resources)
            .unwrap_err();
        assert_eq!(err.to_string(), "resource type v1, Kind=Service not supported");
    }
}
