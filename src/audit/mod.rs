//! Security auditing of Kubernetes workloads.
//!
//! Objects come from a manifest file or a live cluster, are normalized
//! into [`normalize::AuditTarget`]s, and are checked by the rules in
//! [`rules`] through the concurrent [`dispatch::AuditDispatcher`].
//! Findings can be suppressed by labels or the config file, see
//! [`overrides`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kubeaudit::audit::{Auditor, parse_manifest};
//!
//! let resources = parse_manifest(yaml)?;
//! let report = Auditor::new(None).audit(&resources)?;
//! for result in &report.results {
//!     println!("{}: {} findings", result.object_identifier(), result.occurrences.len());
//! }
//! ```

pub mod capabilities;
pub mod context;
pub mod dispatch;
pub mod formatter;
pub mod normalize;
pub mod overrides;
pub mod params;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod runner;
pub mod types;

pub use capabilities::CapabilitySet;
pub use context::{K8sObject, ResourceSet};
pub use dispatch::{AuditDispatcher, AuditFn, AuditRule};
pub use formatter::{OutputFormat, format_report, format_report_to_string};
pub use normalize::{AuditTarget, NormalizeError, normalize, normalize_all};
pub use overrides::{OverrideResolver, prettify_reason};
pub use params::{ImageParams, LimitParams};
pub use parser::{parse_manifest, parse_manifest_file};
pub use registry::TypeRegistry;
pub use rules::{RuleCatalog, RuleName};
pub use runner::{AuditReport, AuditSummary, Auditor, RuleSelection, Source, run_audit};
pub use types::{AuditResult, FindingCode, KubeType, Occurrence, Severity};
